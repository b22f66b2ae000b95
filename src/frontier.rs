use crate::pathing_grid::PathingGrid;
use fxhash::FxBuildHasher;
use indexmap::IndexMap;
use std::cmp::Ordering;
use std::collections::BinaryHeap;

type FxIndexMap<K, V> = IndexMap<K, V, FxBuildHasher>;

struct SmallestCostHolder {
    estimated_cost: f64,
    cost: f64,
    discovery: usize,
    index: usize,
}

impl Eq for SmallestCostHolder {}

impl PartialEq for SmallestCostHolder {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl PartialOrd for SmallestCostHolder {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SmallestCostHolder {
    fn cmp(&self, other: &Self) -> Ordering {
        // Smallest estimated cost first, ties go to the node that was discovered first
        match other.estimated_cost.total_cmp(&self.estimated_cost) {
            Ordering::Equal => other.discovery.cmp(&self.discovery),
            s => s,
        }
    }
}

/// The open set. Nodes are ranked by `f = g + h` and ties are broken by the order in which
/// nodes were first inserted, which keeps traces reproducible. Cost decreases push a fresh
/// heap entry that keeps the node's original discovery number; outdated entries are skipped
/// lazily when they surface.
pub struct Frontier {
    to_see: BinaryHeap<SmallestCostHolder>,
    /// Open nodes in discovery order, mapped to their discovery number.
    open: FxIndexMap<usize, usize>,
    discovered: usize,
}

impl Default for Frontier {
    fn default() -> Frontier {
        Frontier {
            to_see: BinaryHeap::new(),
            open: FxIndexMap::default(),
            discovered: 0,
        }
    }
}

impl Frontier {
    pub fn new() -> Frontier {
        Frontier::default()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.open.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.open.is_empty()
    }

    pub fn contains(&self, ix: usize) -> bool {
        self.open.contains_key(&ix)
    }

    /// Open node indices in discovery order.
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.open.keys().copied()
    }

    /// Adds node `ix` with its current `g` value. Inserting a node that is already open is a
    /// no-op; use [update_if_better](Self::update_if_better) to lower its cost.
    pub fn insert(&mut self, grid: &PathingGrid, ix: usize) {
        if self.open.contains_key(&ix) {
            return;
        }
        let discovery = self.discovered;
        self.discovered += 1;
        self.open.insert(ix, discovery);
        self.push(grid, ix, discovery);
    }

    /// Removes and returns the open node with the smallest `f`.
    pub fn extract_min(&mut self, grid: &PathingGrid) -> Option<usize> {
        while let Some(SmallestCostHolder { cost, index, .. }) = self.to_see.pop() {
            // A node may sit in the heap several times if a cheaper way to reach it was
            // found after it was inserted. Only the entry matching its current cost counts.
            if !self.open.contains_key(&index) || cost > grid.nodes[index].g {
                continue;
            }
            self.open.shift_remove(&index);
            return Some(index);
        }
        None
    }

    /// Lowers the cost of open node `ix` to `new_g` via `previous`, but only if `new_g` is
    /// strictly smaller than its current `g`. Returns whether the node changed.
    pub fn update_if_better(
        &mut self,
        grid: &mut PathingGrid,
        ix: usize,
        new_g: f64,
        previous: usize,
    ) -> bool {
        let Some(&discovery) = self.open.get(&ix) else {
            return false;
        };
        let node = &mut grid.nodes[ix];
        if new_g >= node.g {
            return false;
        }
        node.g = new_g;
        node.previous = Some(previous);
        self.push(grid, ix, discovery);
        true
    }

    fn push(&mut self, grid: &PathingGrid, ix: usize, discovery: usize) {
        let node = &grid.nodes[ix];
        self.to_see.push(SmallestCostHolder {
            estimated_cost: node.f(),
            cost: node.g,
            discovery,
            index: ix,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use grid_util::point::Point;

    fn open_grid() -> PathingGrid {
        PathingGrid::with_obstacles(5, 1, Point::new(0, 0), Point::new(4, 0), vec![]).unwrap()
    }

    fn discover(grid: &mut PathingGrid, frontier: &mut Frontier, x: i32, g: f64) -> usize {
        let ix = grid.index_of(&Point::new(x, 0)).unwrap();
        grid.nodes[ix].g = g;
        frontier.insert(grid, ix);
        ix
    }

    #[test]
    fn extracts_smallest_f() {
        let mut grid = open_grid();
        let mut frontier = Frontier::new();
        // f = g + (4 - x)
        let a = discover(&mut grid, &mut frontier, 1, 5.0);
        let b = discover(&mut grid, &mut frontier, 2, 1.0);
        let c = discover(&mut grid, &mut frontier, 3, 4.0);
        assert_eq!(frontier.len(), 3);
        assert_eq!(frontier.extract_min(&grid), Some(b));
        assert_eq!(frontier.extract_min(&grid), Some(c));
        assert_eq!(frontier.extract_min(&grid), Some(a));
        assert_eq!(frontier.extract_min(&grid), None);
        assert!(frontier.is_empty());
    }

    #[test]
    fn ties_go_to_first_inserted() {
        let mut grid = open_grid();
        let mut frontier = Frontier::new();
        // All three have f = 4
        let first = discover(&mut grid, &mut frontier, 3, 3.0);
        let second = discover(&mut grid, &mut frontier, 1, 1.0);
        let third = discover(&mut grid, &mut frontier, 2, 2.0);
        assert_eq!(frontier.extract_min(&grid), Some(first));
        assert_eq!(frontier.extract_min(&grid), Some(second));
        assert_eq!(frontier.extract_min(&grid), Some(third));
    }

    #[test]
    fn update_keeps_discovery_order() {
        let mut grid = open_grid();
        let mut frontier = Frontier::new();
        let start = grid.index_of(&Point::new(0, 0)).unwrap();
        let first = discover(&mut grid, &mut frontier, 1, 10.0);
        let second = discover(&mut grid, &mut frontier, 3, 2.0);
        // first drops to f = 3, equal to second, and still wins the tie
        assert!(frontier.update_if_better(&mut grid, first, 0.0, start));
        assert_eq!(grid.nodes[first].previous, Some(start));
        assert_eq!(frontier.extract_min(&grid), Some(first));
        assert_eq!(frontier.extract_min(&grid), Some(second));
        // The outdated entry for first is skipped
        assert_eq!(frontier.extract_min(&grid), None);
    }

    #[test]
    fn update_requires_strict_decrease() {
        let mut grid = open_grid();
        let mut frontier = Frontier::new();
        let start = grid.index_of(&Point::new(0, 0)).unwrap();
        let ix = discover(&mut grid, &mut frontier, 2, 2.0);
        assert!(!frontier.update_if_better(&mut grid, ix, 2.0, start));
        assert!(!frontier.update_if_better(&mut grid, ix, 3.0, start));
        assert_eq!(grid.nodes[ix].previous, None);
        assert_eq!(grid.nodes[ix].g, 2.0);
        let closed = grid.index_of(&Point::new(4, 0)).unwrap();
        assert!(!frontier.update_if_better(&mut grid, closed, 0.0, start));
    }

    #[test]
    fn iterates_in_discovery_order() {
        let mut grid = open_grid();
        let mut frontier = Frontier::new();
        let a = discover(&mut grid, &mut frontier, 3, 0.0);
        let b = discover(&mut grid, &mut frontier, 1, 9.0);
        let c = discover(&mut grid, &mut frontier, 2, 9.0);
        frontier.insert(&grid, a);
        assert_eq!(frontier.iter().collect::<Vec<_>>(), vec![a, b, c]);
        assert_eq!(frontier.extract_min(&grid), Some(a));
        assert_eq!(frontier.iter().collect::<Vec<_>>(), vec![b, c]);
        assert!(frontier.contains(b) && !frontier.contains(a));
    }
}
