//! Error types for search requests.

use grid_util::point::Point;
use thiserror::Error;

/// Everything that can make a search request fail before or outside of the search itself.
/// An unsolvable grid is not an error, see [crate::SearchResult::Unsolvable].
#[derive(Error, Debug)]
pub enum SearchError {
    #[error("{point} lies outside the {width}x{height} grid")]
    OutOfBounds {
        point: Point,
        width: usize,
        height: usize,
    },

    #[error("block probability {0} is not within [0, 1]")]
    InvalidBlockProbability(f64),

    #[error("steps per second must be greater than zero")]
    InvalidStepRate,

    #[error("grid must be at least 1x1, got {width}x{height}")]
    EmptyGrid { width: usize, height: usize },

    #[error("no search is running")]
    NotRunning,

    #[error("could not spawn search thread: {0}")]
    Spawn(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SearchError>;
