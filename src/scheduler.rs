//! Paced execution of searches.
//!
//! A [Scheduler] runs every search on its own thread which:
//! - builds a fresh [SearchEngine] and grid for the request
//! - executes at most one step per `1 / steps_per_second`
//! - publishes a [SearchEvent] per step over a channel, then the terminal result
//! - checks its cancellation flag at every step boundary
//!
//! Only one search is active per scheduler. Starting another one cancels the active run and
//! waits for its thread to exit before the new one begins, so nothing of the old run survives.
//! Hosts that drive their own clock can skip the scheduler and combine [SearchEngine::step] with
//! a [Pacer] instead.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use log::{debug, info, warn};

use crate::engine::{SearchEngine, SearchEvent};
use crate::error::Result;
use crate::request::SearchRequest;

/// Identifies one search started by a [Scheduler].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SearchId(u64);

impl fmt::Display for SearchId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Limits how often something may happen. The first tick is due immediately; after that ticks
/// are at least `interval` apart.
#[derive(Clone, Debug)]
pub struct Pacer {
    interval: Duration,
    next_tick: Instant,
}

impl Pacer {
    pub fn new(interval: Duration, now: Instant) -> Pacer {
        Pacer {
            interval,
            next_tick: now,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Returns [true] and schedules the next tick if a tick is due at `now`.
    pub fn ready(&mut self, now: Instant) -> bool {
        if now >= self.next_tick {
            self.next_tick = now + self.interval;
            true
        } else {
            false
        }
    }

    pub fn time_until_ready(&self, now: Instant) -> Duration {
        self.next_tick.saturating_duration_since(now)
    }
}

/// Receiving end of one search. Once the search has been cancelled, either explicitly or by a
/// newer search, the handle yields nothing more, even if events were still queued.
pub struct SearchHandle {
    id: SearchId,
    events: Receiver<SearchEvent>,
    cancelled: Arc<AtomicBool>,
}

impl SearchHandle {
    pub fn id(&self) -> SearchId {
        self.id
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    fn filter(&self, event: SearchEvent) -> Option<SearchEvent> {
        if self.is_cancelled() {
            None
        } else {
            Some(event)
        }
    }

    /// Blocks until the next event. Returns [None] once the search is over or cancelled.
    pub fn recv(&self) -> Option<SearchEvent> {
        if self.is_cancelled() {
            return None;
        }
        self.events.recv().ok().and_then(|e| self.filter(e))
    }

    /// Returns the next event if one is already available.
    pub fn try_recv(&self) -> Option<SearchEvent> {
        if self.is_cancelled() {
            return None;
        }
        match self.events.try_recv() {
            Ok(event) => self.filter(event),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<SearchEvent> {
        if self.is_cancelled() {
            return None;
        }
        match self.events.recv_timeout(timeout) {
            Ok(event) => self.filter(event),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }
}

impl Iterator for SearchHandle {
    type Item = SearchEvent;

    fn next(&mut self) -> Option<SearchEvent> {
        self.recv()
    }
}

struct ActiveRun {
    id: SearchId,
    cancelled: Arc<AtomicBool>,
    /// Set by the search thread once it will take no more steps.
    done: Arc<AtomicBool>,
    thread: JoinHandle<()>,
}

impl ActiveRun {
    fn is_done(&self) -> bool {
        self.done.load(Ordering::Acquire) || self.thread.is_finished()
    }

    fn cancel(self) {
        self.cancelled.store(true, Ordering::Release);
        self.thread.thread().unpark();
        if self.thread.join().is_err() {
            warn!("Search thread {} panicked", self.id);
        }
    }
}

/// Starts, paces and cancels searches. At most one search is active at a time.
#[derive(Default)]
pub struct Scheduler {
    active: Option<ActiveRun>,
    next_id: u64,
}

impl Scheduler {
    pub fn new() -> Scheduler {
        Scheduler::default()
    }

    /// Validates `request` and starts it on a new thread, cancelling the active search first.
    /// An invalid request is rejected before anything else happens, so the active search keeps
    /// running in that case.
    pub fn start_search(&mut self, request: SearchRequest) -> Result<SearchHandle> {
        request.validate()?;
        self.cancel_active();

        let id = SearchId(self.next_id);
        self.next_id += 1;
        let (tx, rx) = mpsc::channel();
        let cancelled = Arc::new(AtomicBool::new(false));
        let flag = cancelled.clone();
        let done = Arc::new(AtomicBool::new(false));
        let finished = done.clone();
        debug!(
            "Starting search {} at {} steps per second",
            id, request.steps_per_second
        );
        let thread = thread::Builder::new()
            .name(format!("search-{}", id.0))
            .spawn(move || {
                run_paced(id, request, tx, flag, &finished);
                finished.store(true, Ordering::Release);
            })?;
        self.active = Some(ActiveRun {
            id,
            cancelled: cancelled.clone(),
            done,
            thread,
        });
        Ok(SearchHandle {
            id,
            events: rx,
            cancelled,
        })
    }

    /// Stops the search behind `handle`. Its thread is joined, which drops its grid, open set
    /// and closed set; no further events are delivered for it.
    pub fn cancel(&mut self, handle: SearchHandle) {
        handle.cancelled.store(true, Ordering::Release);
        if self.active.as_ref().is_some_and(|run| run.id == handle.id) {
            self.cancel_active();
        }
    }

    /// Whether a search thread is still stepping. Turns [false] before the terminal event of a
    /// run is delivered, so a drained handle always sees an inactive scheduler.
    pub fn is_active(&self) -> bool {
        self.active.as_ref().is_some_and(|run| !run.is_done())
    }

    pub fn active_id(&self) -> Option<SearchId> {
        self.active.as_ref().map(|run| run.id)
    }

    fn cancel_active(&mut self) {
        if let Some(run) = self.active.take() {
            if !run.is_done() {
                info!("Cancelling search {}", run.id);
            }
            run.cancel();
        }
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.cancel_active();
    }
}

/// Body of a search thread. Sleeps between steps, waking early when unparked by a cancel.
fn run_paced(
    id: SearchId,
    request: SearchRequest,
    events: Sender<SearchEvent>,
    cancelled: Arc<AtomicBool>,
    done: &AtomicBool,
) {
    let mut engine = SearchEngine::new();
    if let Err(e) = engine.start_search(&request) {
        warn!("Search {} could not start: {}", id, e);
        done.store(true, Ordering::Release);
        return;
    }
    let mut pacer = Pacer::new(request.step_interval(), Instant::now());
    loop {
        if engine.is_running() {
            loop {
                if cancelled.load(Ordering::Acquire) {
                    debug!("Search {} stopped after {} steps", id, engine.iterations());
                    return;
                }
                let now = Instant::now();
                if pacer.ready(now) {
                    break;
                }
                thread::park_timeout(pacer.time_until_ready(now));
            }
        }
        let Some(event) = engine.next() else {
            return;
        };
        let finished = matches!(event, SearchEvent::Finished(_));
        if finished {
            done.store(true, Ordering::Release);
        }
        if cancelled.load(Ordering::Acquire) || events.send(event).is_err() {
            // Cancelled, or nobody is listening anymore
            return;
        }
        if finished {
            return;
        }
    }
}
