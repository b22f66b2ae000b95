//! # stepwise_astar
//!
//! A* search on a grid with randomly placed obstacles whose progress can be watched one
//! expansion at a time. The search is driven either directly through [SearchEngine::step]
//! (or its [Iterator] implementation), or by a [Scheduler] which paces the engine to a fixed
//! number of steps per second on a background thread and publishes [SearchEvent]s over a
//! channel. Starting a new search always supersedes the previous one.
//!
//! Moves are 8-connected. Cardinal moves cost [CARDINAL_COST] and diagonal moves cost
//! [DIAGONAL_COST], which is deliberately not `√2`. The heuristic is the
//! [Euclidean distance](https://en.wikipedia.org/wiki/Euclidean_distance) to the goal.
//! Frontier ties are broken by discovery order so that traces are reproducible for a
//! given seed.
pub mod engine;
pub mod error;
mod frontier;
pub mod path;
pub mod pathing_grid;
pub mod request;
pub mod scheduler;

pub use engine::{
    Observation, SearchEngine, SearchEvent, SearchResult, SearchState, StepOutcome,
    UnsolvableReason,
};
pub use error::{Result, SearchError};
pub use grid_util::point::Point;
pub use path::{is_adjacent, path_cost, reconstruct_path};
pub use pathing_grid::{NodeView, PathingGrid};
pub use request::SearchRequest;
pub use scheduler::{Pacer, Scheduler, SearchHandle, SearchId};

/// Cost of a horizontal or vertical move.
pub const CARDINAL_COST: f64 = 1.0;
/// Cost of a diagonal move. An approximation of `√2` kept for compatibility with existing traces.
pub const DIAGONAL_COST: f64 = 1.1;
/// Neighbour enumeration order. Changing it changes discovery order and thus tie-breaking.
pub const NEIGHBOUR_OFFSETS: [(i32, i32); 8] = [
    (-1, 0),
    (1, 0),
    (0, -1),
    (0, 1),
    (1, 1),
    (-1, -1),
    (-1, 1),
    (1, -1),
];
pub(crate) const N_SMALLVEC_SIZE: usize = 8;
