//! The A* state machine. A [SearchEngine] owns the grid, open set and closed set of at most one
//! run at a time and advances it one expansion per [step](SearchEngine::step).
use crate::error::{Result, SearchError};
use crate::frontier::Frontier;
use crate::path::{edge_cost, reverse_path};
use crate::pathing_grid::{NodeView, PathingGrid};
use crate::request::SearchRequest;
use fxhash::FxBuildHasher;
use grid_util::point::Point;
use indexmap::IndexSet;
use log::{info, trace, warn};

type FxIndexSet<K> = IndexSet<K, FxBuildHasher>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SearchState {
    Idle,
    Running,
    Solved,
    Unsolvable,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnsolvableReason {
    /// The start or the goal had no free neighbour when the grid was built.
    Isolated,
    /// Every node reachable from the start was expanded without meeting the goal.
    Exhausted,
}

/// Terminal result of a run.
#[derive(Clone, Debug, PartialEq)]
pub enum SearchResult {
    Solved { path: Vec<Point>, cost: f64 },
    Unsolvable(UnsolvableReason),
}

impl SearchResult {
    pub fn is_solved(&self) -> bool {
        matches!(self, SearchResult::Solved { .. })
    }

    pub fn path(&self) -> Option<&[Point]> {
        match self {
            SearchResult::Solved { path, .. } => Some(path),
            SearchResult::Unsolvable(_) => None,
        }
    }
}

/// What an observer sees after one step. The open and closed sets reflect the state at the end
/// of the step, listed in the order in which nodes entered them.
#[derive(Clone, Debug, PartialEq)]
pub struct Observation {
    /// 1-based number of the step that produced this observation.
    pub iteration: usize,
    pub current: Point,
    pub open: Vec<Point>,
    pub closed: Vec<Point>,
    /// Best known route from the start to `current`.
    pub best_path: Vec<Point>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum SearchEvent {
    Observation(Observation),
    Finished(SearchResult),
}

/// Outcome of a single [SearchEngine::step].
#[derive(Clone, Debug, PartialEq)]
pub enum StepOutcome {
    Continue(Observation),
    /// The run terminated. Reaching the goal still produces a last observation, an exhausted
    /// frontier does not.
    Finished {
        observation: Option<Observation>,
        result: SearchResult,
    },
}

struct Run {
    grid: PathingGrid,
    frontier: Frontier,
    closed: FxIndexSet<usize>,
    goal: usize,
    iterations: usize,
    result: Option<SearchResult>,
    /// Set once the result has been handed out as a [SearchEvent::Finished].
    reported: bool,
    pending: Option<SearchEvent>,
}

/// Explicit search context. Create one per host and call [start](Self::start) or
/// [start_search](Self::start_search) whenever a new search should replace the current one.
pub struct SearchEngine {
    run: Option<Run>,
    state: SearchState,
}

impl Default for SearchEngine {
    fn default() -> SearchEngine {
        SearchEngine {
            run: None,
            state: SearchState::Idle,
        }
    }
}

impl SearchEngine {
    pub fn new() -> SearchEngine {
        SearchEngine::default()
    }

    pub fn state(&self) -> SearchState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == SearchState::Running
    }

    /// Number of steps executed in the current run.
    pub fn iterations(&self) -> usize {
        self.run.as_ref().map_or(0, |run| run.iterations)
    }

    /// The terminal result of the current run, once it has one.
    pub fn result(&self) -> Option<&SearchResult> {
        self.run.as_ref().and_then(|run| run.result.as_ref())
    }

    /// The grid of the current run. It stays available after termination until the engine is
    /// reset or a new search is started.
    pub fn grid(&self) -> Option<&PathingGrid> {
        self.run.as_ref().map(|run| &run.grid)
    }

    pub fn is_in_grid(&self, point: &Point) -> bool {
        self.grid().is_some_and(|grid| grid.is_in_grid(point))
    }

    pub fn get_node(&self, point: &Point) -> Option<NodeView> {
        self.grid().and_then(|grid| grid.get_node(point))
    }

    pub fn open_positions(&self) -> Vec<Point> {
        self.run.as_ref().map_or_else(Vec::new, |run| run.open_positions())
    }

    pub fn closed_positions(&self) -> Vec<Point> {
        self.run.as_ref().map_or_else(Vec::new, |run| run.closed_positions())
    }

    /// Validates `request`, builds a fresh random grid for it and starts searching on it.
    /// An invalid request leaves the engine untouched.
    pub fn start_search(&mut self, request: &SearchRequest) -> Result<SearchState> {
        let grid = request.build_grid()?;
        Ok(self.start(grid))
    }

    /// Starts a search from the grid's start to its goal, discarding any previous run. If the
    /// start or goal has no free neighbour the run is unsolvable right away and no step is ever
    /// executed.
    pub fn start(&mut self, mut grid: PathingGrid) -> SearchState {
        if self.run.is_some() {
            info!("Discarding previous search in state {:?}", self.state);
        }
        self.reset();
        let start = grid.start_ix();
        let goal = grid.goal_ix();
        let isolated = start != goal
            && (grid.neighbours(start).is_empty() || grid.neighbours(goal).is_empty());
        let mut frontier = Frontier::new();
        let result = if isolated {
            info!(
                "{} or {} has no free neighbours, search is unsolvable",
                grid.start(),
                grid.goal()
            );
            Some(SearchResult::Unsolvable(UnsolvableReason::Isolated))
        } else {
            info!("Searching a path from {} to {}", grid.start(), grid.goal());
            grid.nodes[start].g = 0.0;
            frontier.insert(&grid, start);
            None
        };
        self.state = if result.is_some() {
            SearchState::Unsolvable
        } else {
            SearchState::Running
        };
        self.run = Some(Run {
            grid,
            frontier,
            closed: FxIndexSet::default(),
            goal,
            iterations: 0,
            result,
            reported: false,
            pending: None,
        });
        self.state
    }

    /// Executes one iteration: expand the cheapest open node, report the route to it and relax
    /// its neighbours. Fails with [SearchError::NotRunning] unless the engine is running.
    pub fn step(&mut self) -> Result<StepOutcome> {
        if self.state != SearchState::Running {
            return Err(SearchError::NotRunning);
        }
        let run = self.run.as_mut().ok_or(SearchError::NotRunning)?;
        let Some(current) = run.frontier.extract_min(&run.grid) else {
            warn!(
                "Frontier exhausted after {} iterations, goal is unreachable",
                run.iterations
            );
            let result = SearchResult::Unsolvable(UnsolvableReason::Exhausted);
            run.result = Some(result.clone());
            self.state = SearchState::Unsolvable;
            return Ok(StepOutcome::Finished {
                observation: None,
                result,
            });
        };
        run.closed.insert(current);
        run.iterations += 1;
        let best_path = reverse_path(&run.grid, current);
        trace!(
            "Expanding {} (g = {}, f = {})",
            run.grid.position(current),
            run.grid.nodes[current].g,
            run.grid.nodes[current].f()
        );

        if current == run.goal {
            let cost = run.grid.nodes[current].g;
            info!(
                "Found a path of {} steps with cost {:.2} after {} iterations",
                best_path.len() - 1,
                cost,
                run.iterations
            );
            let result = SearchResult::Solved {
                path: best_path.clone(),
                cost,
            };
            run.result = Some(result.clone());
            let observation = run.observe(current, best_path);
            self.state = SearchState::Solved;
            return Ok(StepOutcome::Finished {
                observation: Some(observation),
                result,
            });
        }

        run.expand(current);
        Ok(StepOutcome::Continue(run.observe(current, best_path)))
    }

    /// Steps until the run terminates and returns its result, without any pacing.
    pub fn run_to_completion(&mut self) -> Result<SearchResult> {
        loop {
            match self.state {
                SearchState::Idle => return Err(SearchError::NotRunning),
                SearchState::Running => {
                    if let StepOutcome::Finished { result, .. } = self.step()? {
                        return Ok(result);
                    }
                }
                SearchState::Solved | SearchState::Unsolvable => {
                    return self.result().cloned().ok_or(SearchError::NotRunning);
                }
            }
        }
    }

    /// Drops the grid, open set and closed set of the current run and returns to
    /// [SearchState::Idle].
    pub fn reset(&mut self) {
        if self.state == SearchState::Running {
            info!("Cancelling running search");
        }
        self.run = None;
        self.state = SearchState::Idle;
    }
}

impl Run {
    fn expand(&mut self, current: usize) {
        let current_g = self.grid.nodes[current].g;
        let current_point = self.grid.position(current);
        for neighbour in self.grid.neighbours(current) {
            if self.closed.contains(&neighbour) {
                continue;
            }
            let tentative_g =
                current_g + edge_cost(&current_point, &self.grid.position(neighbour));
            if !self.frontier.contains(neighbour) {
                let node = &mut self.grid.nodes[neighbour];
                node.g = tentative_g;
                node.previous = Some(current);
                self.frontier.insert(&self.grid, neighbour);
            } else {
                self.frontier
                    .update_if_better(&mut self.grid, neighbour, tentative_g, current);
            }
        }
    }

    fn observe(&self, current: usize, best_path: Vec<Point>) -> Observation {
        Observation {
            iteration: self.iterations,
            current: self.grid.position(current),
            open: self.open_positions(),
            closed: self.closed_positions(),
            best_path,
        }
    }

    fn open_positions(&self) -> Vec<Point> {
        self.frontier.iter().map(|ix| self.grid.position(ix)).collect()
    }

    fn closed_positions(&self) -> Vec<Point> {
        self.closed.iter().map(|&ix| self.grid.position(ix)).collect()
    }
}

/// Resumable form of the search: yields one [SearchEvent::Observation] per step followed by a
/// single [SearchEvent::Finished], then [None]. An idle engine yields nothing.
impl Iterator for SearchEngine {
    type Item = SearchEvent;

    fn next(&mut self) -> Option<SearchEvent> {
        if let Some(event) = self.run.as_mut().and_then(|run| run.pending.take()) {
            return Some(event);
        }
        match self.state {
            SearchState::Idle => None,
            SearchState::Running => match self.step().ok()? {
                StepOutcome::Continue(observation) => Some(SearchEvent::Observation(observation)),
                StepOutcome::Finished {
                    observation,
                    result,
                } => {
                    let run = self.run.as_mut()?;
                    run.reported = true;
                    match observation {
                        Some(observation) => {
                            run.pending = Some(SearchEvent::Finished(result));
                            Some(SearchEvent::Observation(observation))
                        }
                        None => Some(SearchEvent::Finished(result)),
                    }
                }
            },
            SearchState::Solved | SearchState::Unsolvable => {
                let run = self.run.as_mut()?;
                if run.reported {
                    return None;
                }
                run.reported = true;
                run.result.clone().map(SearchEvent::Finished)
            }
        }
    }
}
