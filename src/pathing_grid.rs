use crate::error::{Result, SearchError};
use crate::{N_SMALLVEC_SIZE, NEIGHBOUR_OFFSETS};
use core::fmt;
use grid_util::grid::{BoolGrid, ValueGrid};
use grid_util::point::Point;
use log::debug;
use petgraph::unionfind::UnionFind;
use rand::Rng;
use smallvec::SmallVec;

pub(crate) type NeighbourList = SmallVec<[usize; N_SMALLVEC_SIZE]>;

/// Search bookkeeping for a single cell. Nodes refer to each other by their index in
/// [PathingGrid::nodes], so the `previous` links form a tree rooted at the start without
/// any shared ownership.
#[derive(Clone, Debug)]
pub(crate) struct Node {
    pub(crate) position: Point,
    pub(crate) blocked: bool,
    pub(crate) g: f64,
    pub(crate) h: f64,
    pub(crate) previous: Option<usize>,
    /// Filled in the first time the node is expanded.
    pub(crate) neighbours: Option<NeighbourList>,
}

impl Node {
    pub(crate) fn f(&self) -> f64 {
        self.g + self.h
    }
}

/// Read-only snapshot of a node, returned by [PathingGrid::get_node].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NodeView {
    pub position: Point,
    pub blocked: bool,
    /// Best known cost from the start, [f64::INFINITY] while undiscovered.
    pub g: f64,
    pub h: f64,
    pub f: f64,
    pub previous: Option<Point>,
}

/// [PathingGrid] holds the obstacle layout of a single search in a [BoolGrid] where [true]
/// marks a blocked cell, together with per-node search state and the connected components
/// of the free cells in a [UnionFind] structure. A grid is built once per search and is never
/// resized or re-randomised afterwards.
#[derive(Clone, Debug)]
pub struct PathingGrid {
    pub grid: BoolGrid,
    pub(crate) nodes: Vec<Node>,
    start: Point,
    goal: Point,
    components: UnionFind<usize>,
}

impl PathingGrid {
    /// Builds a grid where every cell is blocked with probability `block_probability`, drawn from
    /// `rng` column by column. The start and goal cells are always left free. Every node gets the
    /// Euclidean distance to `goal` as its heuristic value.
    pub fn random<R: Rng + ?Sized>(
        width: usize,
        height: usize,
        block_probability: f64,
        start: Point,
        goal: Point,
        rng: &mut R,
    ) -> Result<PathingGrid> {
        check_block_probability(block_probability)?;
        check_dimensions(width, height)?;
        check_point(width, height, start)?;
        check_point(width, height, goal)?;
        let mut grid = BoolGrid::new(width, height, false);
        for x in 0..width as i32 {
            for y in 0..height as i32 {
                grid.set(x, y, rng.gen_bool(block_probability));
            }
        }
        Ok(PathingGrid::from_layout(grid, start, goal))
    }

    /// Builds a grid with exactly the given obstacles. Obstacles placed on the start or goal are
    /// ignored, just like random draws are.
    pub fn with_obstacles<I>(
        width: usize,
        height: usize,
        start: Point,
        goal: Point,
        obstacles: I,
    ) -> Result<PathingGrid>
    where
        I: IntoIterator<Item = Point>,
    {
        check_dimensions(width, height)?;
        check_point(width, height, start)?;
        check_point(width, height, goal)?;
        let mut grid = BoolGrid::new(width, height, false);
        for obstacle in obstacles {
            check_point(width, height, obstacle)?;
            grid.set(obstacle.x, obstacle.y, true);
        }
        Ok(PathingGrid::from_layout(grid, start, goal))
    }

    fn from_layout(mut grid: BoolGrid, start: Point, goal: Point) -> PathingGrid {
        grid.set(start.x, start.y, false);
        grid.set(goal.x, goal.y, false);
        let (width, height) = (grid.width(), grid.height());
        let mut nodes = Vec::with_capacity(width * height);
        for y in 0..height as i32 {
            for x in 0..width as i32 {
                let position = Point::new(x, y);
                nodes.push(Node {
                    position,
                    blocked: grid.get(x, y),
                    g: f64::INFINITY,
                    h: euclidean_distance(&position, &goal),
                    previous: None,
                    neighbours: None,
                });
            }
        }
        let mut pathing_grid = PathingGrid {
            grid,
            nodes,
            start,
            goal,
            components: UnionFind::new(width * height),
        };
        pathing_grid.generate_components();
        debug!(
            "Built {}x{} grid with {} blocked cells",
            width,
            height,
            pathing_grid.blocked_count()
        );
        pathing_grid
    }

    pub fn width(&self) -> usize {
        self.grid.width()
    }
    pub fn height(&self) -> usize {
        self.grid.height()
    }
    pub fn start(&self) -> Point {
        self.start
    }
    pub fn goal(&self) -> Point {
        self.goal
    }

    pub fn is_in_grid(&self, point: &Point) -> bool {
        point.x >= 0
            && point.y >= 0
            && (point.x as usize) < self.width()
            && (point.y as usize) < self.height()
    }

    /// Returns [None] for positions outside the grid.
    pub fn is_blocked(&self, point: &Point) -> Option<bool> {
        self.index_of(point).map(|ix| self.nodes[ix].blocked)
    }

    pub fn blocked_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.blocked).count()
    }

    /// The heuristic value assigned to `point` when the grid was built.
    pub fn heuristic(&self, point: &Point) -> Option<f64> {
        self.index_of(point).map(|ix| self.nodes[ix].h)
    }

    /// Snapshot of the node at `point`, or [None] if it lies outside the grid.
    pub fn get_node(&self, point: &Point) -> Option<NodeView> {
        self.index_of(point).map(|ix| {
            let node = &self.nodes[ix];
            NodeView {
                position: node.position,
                blocked: node.blocked,
                g: node.g,
                h: node.h,
                f: node.f(),
                previous: node.previous.map(|p| self.nodes[p].position),
            }
        })
    }

    pub(crate) fn index_of(&self, point: &Point) -> Option<usize> {
        if self.is_in_grid(point) {
            Some(point.y as usize * self.width() + point.x as usize)
        } else {
            None
        }
    }

    pub(crate) fn start_ix(&self) -> usize {
        self.start.y as usize * self.width() + self.start.x as usize
    }

    pub(crate) fn goal_ix(&self) -> usize {
        self.goal.y as usize * self.width() + self.goal.x as usize
    }

    pub(crate) fn position(&self, ix: usize) -> Point {
        self.nodes[ix].position
    }

    /// Free in-bounds neighbours of `position`, in [NEIGHBOUR_OFFSETS] order.
    fn free_neighbours(&self, position: Point) -> NeighbourList {
        NEIGHBOUR_OFFSETS
            .iter()
            .map(|(dx, dy)| Point::new(position.x + dx, position.y + dy))
            .filter_map(|p| self.index_of(&p))
            .filter(|&ix| !self.nodes[ix].blocked)
            .collect()
    }

    /// Returns the neighbour list of node `ix`, computing and caching it on first use.
    pub(crate) fn neighbours(&mut self, ix: usize) -> NeighbourList {
        if let Some(neighbours) = &self.nodes[ix].neighbours {
            return neighbours.clone();
        }
        let neighbours = self.free_neighbours(self.nodes[ix].position);
        self.nodes[ix].neighbours = Some(neighbours.clone());
        neighbours
    }

    /// Retrieves the component id a given [Point] belongs to.
    pub fn get_component(&self, point: &Point) -> Option<usize> {
        self.index_of(point).map(|ix| self.components.find(ix))
    }

    /// Checks if a free path between `start` and `goal` exists at all. This does not run a
    /// search and ignores the step-by-step bookkeeping.
    pub fn reachable(&self, start: &Point, goal: &Point) -> bool {
        match (self.index_of(start), self.index_of(goal)) {
            (Some(start_ix), Some(goal_ix)) => {
                !self.nodes[start_ix].blocked
                    && !self.nodes[goal_ix].blocked
                    && self.components.equiv(start_ix, goal_ix)
            }
            _ => false,
        }
    }

    /// Links up free grid neighbours into the same components. Only the forward half of the
    /// neighbourhood is visited, since unions are symmetric.
    fn generate_components(&mut self) {
        for ix in 0..self.nodes.len() {
            if self.nodes[ix].blocked {
                continue;
            }
            let point = self.nodes[ix].position;
            let linked = [
                Point::new(point.x, point.y + 1),
                Point::new(point.x + 1, point.y - 1),
                Point::new(point.x + 1, point.y),
                Point::new(point.x + 1, point.y + 1),
            ]
            .iter()
            .filter_map(|p| self.index_of(p))
            .filter(|&n| !self.nodes[n].blocked)
            .collect::<SmallVec<[usize; 4]>>();
            for n in linked {
                self.components.union(ix, n);
            }
        }
    }
}

pub(crate) fn euclidean_distance(p1: &Point, p2: &Point) -> f64 {
    let dx = (p1.x - p2.x) as f64;
    let dy = (p1.y - p2.y) as f64;
    (dx * dx + dy * dy).sqrt()
}

pub(crate) fn check_dimensions(width: usize, height: usize) -> Result<()> {
    if width == 0 || height == 0 {
        return Err(SearchError::EmptyGrid { width, height });
    }
    Ok(())
}

pub(crate) fn check_point(width: usize, height: usize, point: Point) -> Result<()> {
    let inside = point.x >= 0
        && point.y >= 0
        && (point.x as usize) < width
        && (point.y as usize) < height;
    if inside {
        Ok(())
    } else {
        Err(SearchError::OutOfBounds {
            point,
            width,
            height,
        })
    }
}

pub(crate) fn check_block_probability(probability: f64) -> Result<()> {
    if (0.0..=1.0).contains(&probability) {
        Ok(())
    } else {
        Err(SearchError::InvalidBlockProbability(probability))
    }
}

impl fmt::Display for PathingGrid {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for y in 0..self.height() as i32 {
            let row = (0..self.width() as i32)
                .map(|x| {
                    let p = Point::new(x, y);
                    if p == self.start {
                        'S'
                    } else if p == self.goal {
                        'G'
                    } else if self.grid.get(x, y) {
                        '#'
                    } else {
                        '.'
                    }
                })
                .collect::<String>();
            writeln!(f, "{}", row)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn start_and_goal_are_never_blocked() {
        let mut rng = StdRng::seed_from_u64(3);
        let start = Point::new(0, 0);
        let goal = Point::new(4, 4);
        let grid = PathingGrid::random(5, 5, 1.0, start, goal, &mut rng).unwrap();
        assert_eq!(grid.is_blocked(&start), Some(false));
        assert_eq!(grid.is_blocked(&goal), Some(false));
        assert_eq!(grid.blocked_count(), 23);
    }

    #[test]
    fn zero_probability_blocks_nothing() {
        let mut rng = StdRng::seed_from_u64(3);
        let grid =
            PathingGrid::random(6, 4, 0.0, Point::new(0, 0), Point::new(5, 3), &mut rng).unwrap();
        assert_eq!(grid.blocked_count(), 0);
    }

    #[test]
    fn same_seed_same_layout() {
        let build = |seed| {
            let mut rng = StdRng::seed_from_u64(seed);
            PathingGrid::random(12, 9, 0.3, Point::new(0, 0), Point::new(11, 8), &mut rng)
                .unwrap()
                .to_string()
        };
        assert_eq!(build(7), build(7));
    }

    #[test]
    fn out_of_bounds_is_rejected() {
        let mut rng = StdRng::seed_from_u64(0);
        let result =
            PathingGrid::random(3, 3, 0.2, Point::new(0, 0), Point::new(3, 1), &mut rng);
        assert!(matches!(
            result,
            Err(SearchError::OutOfBounds { width: 3, height: 3, .. })
        ));
        let result =
            PathingGrid::with_obstacles(3, 3, Point::new(-1, 0), Point::new(2, 2), vec![]);
        assert!(matches!(result, Err(SearchError::OutOfBounds { .. })));
    }

    #[test]
    fn heuristic_is_euclidean_to_goal() {
        let grid =
            PathingGrid::with_obstacles(5, 5, Point::new(0, 0), Point::new(3, 4), vec![])
                .unwrap();
        assert_eq!(grid.heuristic(&Point::new(0, 0)), Some(5.0));
        assert_eq!(grid.heuristic(&Point::new(3, 4)), Some(0.0));
        assert_eq!(grid.heuristic(&Point::new(3, 0)), Some(4.0));
        assert_eq!(grid.heuristic(&Point::new(5, 0)), None);
    }

    /// Corresponds to the following 3x3 grid:
    ///  ___
    /// |S# |
    /// | # |
    /// |  G|
    ///  ___
    #[test]
    fn neighbours_skip_blocked_and_out_of_bounds() {
        let mut grid = PathingGrid::with_obstacles(
            3,
            3,
            Point::new(0, 0),
            Point::new(2, 2),
            vec![Point::new(1, 0), Point::new(1, 1)],
        )
        .unwrap();
        let ix = grid.index_of(&Point::new(0, 0)).unwrap();
        let neighbours = grid
            .neighbours(ix)
            .iter()
            .map(|&n| grid.position(n))
            .collect::<Vec<_>>();
        assert_eq!(neighbours, vec![Point::new(0, 1)]);

        let centre = grid.index_of(&Point::new(1, 2)).unwrap();
        let neighbours = grid
            .neighbours(centre)
            .iter()
            .map(|&n| grid.position(n))
            .collect::<Vec<_>>();
        // Only offsets (-1, 0), (1, 0), (-1, -1) and (1, -1) land on free cells
        assert_eq!(
            neighbours,
            vec![Point::new(0, 2), Point::new(2, 2), Point::new(0, 1), Point::new(2, 1)]
        );
    }

    #[test]
    fn components_follow_diagonals() {
        //  __
        // |S#|
        // |#G|
        //  __
        let grid = PathingGrid::with_obstacles(
            2,
            2,
            Point::new(0, 0),
            Point::new(1, 1),
            vec![Point::new(1, 0), Point::new(0, 1)],
        )
        .unwrap();
        assert!(grid.reachable(&Point::new(0, 0), &Point::new(1, 1)));
        assert!(!grid.reachable(&Point::new(0, 0), &Point::new(1, 0)));
        assert!(!grid.reachable(&Point::new(0, 0), &Point::new(2, 0)));
    }

    #[test]
    fn walled_off_goal_is_unreachable() {
        let wall = (0..4).map(|y| Point::new(2, y));
        let grid =
            PathingGrid::with_obstacles(4, 4, Point::new(0, 0), Point::new(3, 3), wall).unwrap();
        assert!(!grid.reachable(&Point::new(0, 0), &Point::new(3, 3)));
        assert_ne!(
            grid.get_component(&Point::new(0, 0)),
            grid.get_component(&Point::new(3, 3))
        );
    }

    #[test]
    fn fresh_nodes_are_undiscovered() {
        let grid =
            PathingGrid::with_obstacles(2, 2, Point::new(0, 0), Point::new(1, 1), vec![])
                .unwrap();
        let view = grid.get_node(&Point::new(1, 0)).unwrap();
        assert!(view.g.is_infinite());
        assert!(view.f.is_infinite());
        assert_eq!(view.h, 1.0);
        assert_eq!(view.previous, None);
        assert!(grid.get_node(&Point::new(2, 0)).is_none());
    }

    #[test]
    fn display_marks_cells() {
        let grid = PathingGrid::with_obstacles(
            3,
            2,
            Point::new(0, 0),
            Point::new(2, 1),
            vec![Point::new(1, 0)],
        )
        .unwrap();
        assert_eq!(grid.to_string(), "S#.\n..G\n");
    }
}
