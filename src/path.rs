//! Path reconstruction and costing. Reconstruction only reads the `previous` links, so it can be
//! called at any point of a run to obtain the best known route to any discovered node.
use crate::pathing_grid::PathingGrid;
use crate::{CARDINAL_COST, DIAGONAL_COST};
use grid_util::point::Point;
use itertools::Itertools;

/// Walks the `previous` links from node `ix` back to the start and returns the positions in
/// start-to-node order. For the start itself this is `[start]`.
pub(crate) fn reverse_path(grid: &PathingGrid, ix: usize) -> Vec<Point> {
    let mut path: Vec<Point> = std::iter::successors(Some(ix), |&i| grid.nodes[i].previous)
        .map(|i| grid.position(i))
        .collect();
    path.reverse();
    path
}

/// Best known route from the start to `point`, following the back-pointers recorded so far.
/// Returns [None] for positions outside the grid. An undiscovered node yields just itself.
pub fn reconstruct_path(grid: &PathingGrid, point: &Point) -> Option<Vec<Point>> {
    grid.index_of(point).map(|ix| reverse_path(grid, ix))
}

/// Cost of moving between two adjacent cells: [CARDINAL_COST] for straight moves and
/// [DIAGONAL_COST] for diagonal ones.
pub fn edge_cost(p1: &Point, p2: &Point) -> f64 {
    if p1.x != p2.x && p1.y != p2.y {
        DIAGONAL_COST
    } else {
        CARDINAL_COST
    }
}

/// Whether two cells touch under the 8-connected neighbourhood. A cell is not adjacent to itself.
pub fn is_adjacent(p1: &Point, p2: &Point) -> bool {
    let delta_x = (p1.x - p2.x).abs();
    let delta_y = (p1.y - p2.y).abs();
    delta_x <= 1 && delta_y <= 1 && (delta_x, delta_y) != (0, 0)
}

/// Sums the edge costs along `path`.
pub fn path_cost(path: &[Point]) -> f64 {
    path.iter()
        .tuple_windows()
        .map(|(p1, p2)| edge_cost(p1, p2))
        .sum()
}
