use crate::error::{Result, SearchError};
use crate::pathing_grid::{check_block_probability, check_dimensions, check_point, PathingGrid};
use grid_util::point::Point;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::time::Duration;

/// Everything needed to start a search: the grid to generate, where to search from and to, how
/// fast to step and, optionally, the seed that fixes the obstacle layout.
#[derive(Clone, Debug, PartialEq)]
pub struct SearchRequest {
    pub width: usize,
    pub height: usize,
    /// Probability in `[0, 1]` with which each cell is blocked.
    pub block_probability: f64,
    pub start: Point,
    pub goal: Point,
    pub steps_per_second: u32,
    /// Seed for the obstacle layout. Without one the layout is drawn from entropy.
    pub seed: Option<u64>,
}

impl Default for SearchRequest {
    fn default() -> SearchRequest {
        SearchRequest::new(10, 10)
    }
}

impl SearchRequest {
    /// A request for a `width` by `height` grid from the top left to the bottom right corner.
    pub fn new(width: usize, height: usize) -> SearchRequest {
        SearchRequest {
            width,
            height,
            block_probability: 0.2,
            start: Point::new(0, 0),
            goal: Point::new(width as i32 - 1, height as i32 - 1),
            steps_per_second: 10,
            seed: None,
        }
    }

    pub fn with_block_probability(mut self, block_probability: f64) -> Self {
        self.block_probability = block_probability;
        self
    }

    pub fn with_start(mut self, start: Point) -> Self {
        self.start = start;
        self
    }

    pub fn with_goal(mut self, goal: Point) -> Self {
        self.goal = goal;
        self
    }

    pub fn with_steps_per_second(mut self, steps_per_second: u32) -> Self {
        self.steps_per_second = steps_per_second;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Checks the request without building anything.
    pub fn validate(&self) -> Result<()> {
        check_dimensions(self.width, self.height)?;
        check_point(self.width, self.height, self.start)?;
        check_point(self.width, self.height, self.goal)?;
        check_block_probability(self.block_probability)?;
        if self.steps_per_second == 0 {
            return Err(SearchError::InvalidStepRate);
        }
        Ok(())
    }

    /// Minimal time between two steps.
    pub fn step_interval(&self) -> Duration {
        Duration::from_secs(1) / self.steps_per_second.max(1)
    }

    pub fn rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }

    /// Validates the request and generates its grid.
    pub fn build_grid(&self) -> Result<PathingGrid> {
        self.validate()?;
        PathingGrid::random(
            self.width,
            self.height,
            self.block_probability,
            self.start,
            self.goal,
            &mut self.rng(),
        )
    }
}
