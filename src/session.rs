//! Solver sessions: one search run at a time on its own thread.
//!
//! A run owns its search state outright and talks to its consumer through a
//! bounded crossbeam channel. Sending is the only place a run can block, and
//! it polls the cancel token while blocked so `cancel()` and `reset()` always
//! get through.

use crossbeam_channel::{Receiver, RecvTimeoutError, SendTimeoutError, Sender, TryRecvError};
use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::algorithms::{Algorithm, FailureReason};
use crate::config::EngineConfig;
use crate::cost::Weather;
use crate::error::{Result, SolveError};
use crate::events::{check_endpoints, CancelToken, SearchEvent, SearchEvents, SearchSpec};
use crate::grid::{Grid, Position};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct SessionId(pub u32);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle of a session. Terminal states fall back to `Idle` on the next
/// `start()` or `reset()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Idle,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl SessionState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            1 => SessionState::Running,
            2 => SessionState::Completed,
            3 => SessionState::Failed,
            4 => SessionState::Cancelled,
            _ => SessionState::Idle,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            SessionState::Idle => 0,
            SessionState::Running => 1,
            SessionState::Completed => 2,
            SessionState::Failed => 3,
            SessionState::Cancelled => 4,
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Idle => "idle",
            SessionState::Running => "running",
            SessionState::Completed => "completed",
            SessionState::Failed => "failed",
            SessionState::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Default)]
struct StateCell(AtomicU8);

impl StateCell {
    fn load(&self) -> SessionState {
        SessionState::from_u8(self.0.load(Ordering::Acquire))
    }

    fn store(&self, state: SessionState) {
        self.0.store(state.as_u8(), Ordering::Release);
    }
}

/// An event tagged with where and when it was emitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StampedEvent {
    pub session: SessionId,
    /// Monotonic per session, starting at 0 for each run.
    pub seq: u64,
    /// Microseconds since the run epoch.
    pub at_us: u64,
    pub event: SearchEvent,
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    Found,
    Failed(FailureReason),
    Cancelled,
    /// The consumer went away before the run finished.
    Disconnected,
}

/// What a finished run produced, kept by its session until the next reset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub session: SessionId,
    pub algorithm: Algorithm,
    pub outcome: RunOutcome,
    /// Positions reported in `visited_batch` events.
    pub visited: usize,
    pub path: Vec<Position>,
    pub cost: Option<u32>,
    #[serde(skip)]
    pub elapsed: Duration,
}

/// The consumer's end of one run.
///
/// Iterating blocks until the next event and ends after the terminal one.
/// Dropping the stream before then cancels the run.
pub struct EventStream {
    session: SessionId,
    rx: Receiver<StampedEvent>,
    cancel: CancelToken,
    detached: CancelToken,
    done: bool,
}

impl EventStream {
    pub fn session(&self) -> SessionId {
        self.session
    }

    /// Asks the run to stop. The stream still delivers the `cancelled`
    /// acknowledgment.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Blocks for the next event, with its stamp.
    pub fn next_stamped(&mut self) -> Option<StampedEvent> {
        if self.done {
            return None;
        }
        let stamped = self.rx.recv().ok();
        self.observe(stamped.as_ref());
        stamped
    }

    /// Returns an event if one is already buffered.
    pub fn try_next(&mut self) -> Option<SearchEvent> {
        if self.done {
            return None;
        }
        let stamped = match self.rx.try_recv() {
            Ok(stamped) => Some(stamped),
            Err(TryRecvError::Empty) => return None,
            Err(TryRecvError::Disconnected) => None,
        };
        self.observe(stamped.as_ref());
        stamped.map(|s| s.event)
    }

    /// Waits up to `timeout` for the next event.
    pub fn next_timeout(&mut self, timeout: Duration) -> Option<SearchEvent> {
        if self.done {
            return None;
        }
        let stamped = match self.rx.recv_timeout(timeout) {
            Ok(stamped) => Some(stamped),
            Err(RecvTimeoutError::Timeout) => return None,
            Err(RecvTimeoutError::Disconnected) => None,
        };
        self.observe(stamped.as_ref());
        stamped.map(|s| s.event)
    }

    /// All remaining events with their stamps.
    pub fn stamped(mut self) -> impl Iterator<Item = StampedEvent> {
        std::iter::from_fn(move || self.next_stamped())
    }

    pub fn is_finished(&self) -> bool {
        self.done
    }

    pub(crate) fn receiver(&self) -> &Receiver<StampedEvent> {
        &self.rx
    }

    /// Records a received item; `None` means the run is gone.
    pub(crate) fn observe(&mut self, stamped: Option<&StampedEvent>) {
        match stamped {
            Some(s) if !s.event.is_terminal() => {}
            _ => self.done = true,
        }
    }
}

impl Iterator for EventStream {
    type Item = SearchEvent;

    fn next(&mut self) -> Option<SearchEvent> {
        self.next_stamped().map(|s| s.event)
    }
}

impl Drop for EventStream {
    fn drop(&mut self) {
        if !self.done {
            self.cancel.cancel();
            self.detached.cancel();
        }
    }
}

enum Delivery {
    Sent,
    /// Dropped because the run was cancelled while the channel was full.
    Skipped,
    Detached,
}

/// Hands one event to the consumer, waiting while the channel is full.
///
/// Progress events are abandoned once cancellation is raised; the terminal
/// event waits for room until the consumer goes away.
fn deliver(
    tx: &Sender<StampedEvent>,
    mut stamped: StampedEvent,
    cancel: &CancelToken,
    detached: &CancelToken,
    poll: Duration,
) -> Delivery {
    loop {
        if detached.is_cancelled() {
            return Delivery::Detached;
        }
        match tx.send_timeout(stamped, poll) {
            Ok(()) => return Delivery::Sent,
            Err(SendTimeoutError::Disconnected(_)) => return Delivery::Detached,
            Err(SendTimeoutError::Timeout(back)) => {
                if !back.event.is_terminal() && cancel.is_cancelled() {
                    return Delivery::Skipped;
                }
                stamped = back;
            }
        }
    }
}

fn final_state(outcome: RunOutcome) -> SessionState {
    match outcome {
        RunOutcome::Found => SessionState::Completed,
        RunOutcome::Failed(_) => SessionState::Failed,
        RunOutcome::Cancelled | RunOutcome::Disconnected => SessionState::Cancelled,
    }
}

struct Worker {
    id: SessionId,
    tx: Sender<StampedEvent>,
    detached: CancelToken,
    state: Arc<StateCell>,
    poll: Duration,
    epoch: Instant,
}

impl Worker {
    fn run(self, events: SearchEvents) -> RunSummary {
        let started = Instant::now();
        let cancel = events.cancel_token().clone();
        let mut summary = RunSummary {
            session: self.id,
            algorithm: events.algorithm(),
            outcome: RunOutcome::Disconnected,
            visited: 0,
            path: Vec::new(),
            cost: None,
            elapsed: Duration::ZERO,
        };

        let mut seq = 0u64;
        for event in events {
            // nothing but the acknowledgment goes out once cancellation is raised
            if !event.is_terminal() && cancel.is_cancelled() {
                continue;
            }
            let visited = match &event {
                SearchEvent::VisitedBatch { nodes } => nodes.len(),
                _ => 0,
            };
            let found = match &event {
                SearchEvent::PathFound { path, cost, .. } => Some((path.clone(), *cost)),
                _ => None,
            };
            let outcome = match &event {
                SearchEvent::Complete => Some(RunOutcome::Found),
                SearchEvent::Failed { reason } => Some(RunOutcome::Failed(*reason)),
                SearchEvent::Cancelled => Some(RunOutcome::Cancelled),
                _ => None,
            };
            // observers see the final state no later than the terminal event
            if let Some(outcome) = outcome {
                self.state.store(final_state(outcome));
            }
            let stamped = StampedEvent {
                session: self.id,
                seq,
                at_us: self.epoch.elapsed().as_micros() as u64,
                event,
            };

            match deliver(&self.tx, stamped, &cancel, &self.detached, self.poll) {
                Delivery::Sent => {
                    seq += 1;
                    summary.visited += visited;
                    if let Some((path, cost)) = found {
                        summary.path = path;
                        summary.cost = Some(cost);
                    }
                    if let Some(outcome) = outcome {
                        summary.outcome = outcome;
                    }
                }
                Delivery::Skipped => {}
                Delivery::Detached => {
                    tracing::debug!("session {}: consumer gone, stopping run", self.id);
                    summary.outcome = if cancel.is_cancelled() {
                        RunOutcome::Cancelled
                    } else {
                        RunOutcome::Disconnected
                    };
                    break;
                }
            }
        }

        summary.elapsed = started.elapsed();
        let state = final_state(summary.outcome);
        self.state.store(state);
        tracing::debug!(
            "session {}: {} finished as {} after {} visited in {:.2?}",
            self.id,
            summary.algorithm,
            state,
            summary.visited,
            summary.elapsed
        );
        summary
    }
}

struct Launched {
    stream: EventStream,
    rx: Receiver<StampedEvent>,
    cancel: CancelToken,
    worker: JoinHandle<RunSummary>,
}

fn launch(
    id: SessionId,
    grid: Arc<Grid>,
    spec: SearchSpec,
    config: &EngineConfig,
    state: Arc<StateCell>,
    epoch: Instant,
) -> Result<Launched> {
    let cancel = CancelToken::new();
    let events = SearchEvents::new(
        grid,
        spec,
        &config.search_options(),
        config.batch_size,
        cancel.clone(),
    )?;
    let (tx, rx) = crossbeam_channel::bounded(config.channel_capacity.max(1));
    let poll = config.poll_interval();

    let detached = CancelToken::new();

    state.store(SessionState::Running);
    let worker = Worker {
        id,
        tx,
        detached: detached.clone(),
        state: Arc::clone(&state),
        poll,
        epoch,
    };
    let spawned = thread::Builder::new()
        .name(format!("solver-{}", id))
        .spawn(move || worker.run(events));
    let worker = match spawned {
        Ok(worker) => worker,
        Err(e) => {
            state.store(SessionState::Idle);
            return Err(SolveError::Spawn(e));
        }
    };

    tracing::debug!(
        "session {}: started {} from {} to {}",
        id,
        spec.algorithm,
        spec.start,
        spec.end
    );
    Ok(Launched {
        stream: EventStream {
            session: id,
            rx: rx.clone(),
            cancel: cancel.clone(),
            detached,
            done: false,
        },
        rx,
        cancel,
        worker,
    })
}

/// One-off run outside any registry.
///
/// Rejects bad endpoints synchronously; otherwise the search runs on its own
/// thread until it finishes or the returned stream is cancelled or dropped.
pub fn solve(
    grid: &Grid,
    start: Option<Position>,
    end: Option<Position>,
    algorithm: Algorithm,
    weather: Weather,
) -> Result<EventStream> {
    solve_with(&EngineConfig::default(), grid, start, end, algorithm, weather)
}

pub fn solve_with(
    config: &EngineConfig,
    grid: &Grid,
    start: Option<Position>,
    end: Option<Position>,
    algorithm: Algorithm,
    weather: Weather,
) -> Result<EventStream> {
    let (start, end) = check_endpoints(grid, start, end)?;
    let spec = SearchSpec {
        algorithm,
        start,
        end,
        weather,
    };
    let launched = launch(
        SessionId(0),
        Arc::new(grid.clone()),
        spec,
        config,
        Arc::new(StateCell::default()),
        Instant::now(),
    )?;
    Ok(launched.stream)
}

/// A reusable slot that runs one search at a time.
pub struct SolverSession {
    id: SessionId,
    algorithm: Algorithm,
    config: EngineConfig,
    state: Arc<StateCell>,
    cancel: Option<CancelToken>,
    events: Option<Receiver<StampedEvent>>,
    worker: Option<JoinHandle<RunSummary>>,
    summary: Option<RunSummary>,
}

impl SolverSession {
    pub fn new(id: SessionId, algorithm: Algorithm, config: EngineConfig) -> Self {
        SolverSession {
            id,
            algorithm,
            config,
            state: Arc::new(StateCell::default()),
            cancel: None,
            events: None,
            worker: None,
            summary: None,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    /// Takes effect on the next `start()`.
    pub fn set_algorithm(&mut self, algorithm: Algorithm) {
        self.algorithm = algorithm;
    }

    pub fn state(&self) -> SessionState {
        self.state.load()
    }

    /// Starts a run of this session's algorithm against `grid`.
    ///
    /// The grid is shared read-only with the run; callers pass a snapshot
    /// they will not mutate. Fails without side effects when the session is
    /// running or the endpoints are invalid.
    pub fn start(
        &mut self,
        grid: Arc<Grid>,
        start: Position,
        end: Position,
        weather: Weather,
    ) -> Result<EventStream> {
        self.start_at(grid, start, end, weather, Instant::now())
    }

    pub(crate) fn start_at(
        &mut self,
        grid: Arc<Grid>,
        start: Position,
        end: Position,
        weather: Weather,
        epoch: Instant,
    ) -> Result<EventStream> {
        if self.state() == SessionState::Running {
            return Err(SolveError::SessionBusy(self.id));
        }
        check_endpoints(&grid, Some(start), Some(end))?;
        self.reset();

        let spec = SearchSpec {
            algorithm: self.algorithm,
            start,
            end,
            weather,
        };
        let launched = launch(
            self.id,
            grid,
            spec,
            &self.config,
            Arc::clone(&self.state),
            epoch,
        )?;
        self.cancel = Some(launched.cancel);
        self.events = Some(launched.rx);
        self.worker = Some(launched.worker);
        Ok(launched.stream)
    }

    /// Raises the cancel flag of the current run, if any.
    pub fn cancel(&self) {
        if let Some(cancel) = &self.cancel {
            cancel.cancel();
        }
    }

    /// Stops any run, discards its buffered events and summary, and returns
    /// to `Idle`. Valid in every state.
    pub fn reset(&mut self) {
        self.cancel();
        let mut dropped = 0;
        if let Some(worker) = self.worker.take() {
            // the acknowledgment may be waiting for room in the channel
            if let Some(rx) = &self.events {
                while !worker.is_finished() {
                    if rx.recv_timeout(self.config.poll_interval()).is_ok() {
                        dropped += 1;
                    }
                }
            }
            if worker.join().is_err() {
                tracing::warn!("session {}: solver thread panicked", self.id);
            }
        }
        if let Some(rx) = self.events.take() {
            dropped += rx.try_iter().count();
        }
        if dropped > 0 {
            tracing::debug!("session {}: dropped {} buffered events", self.id, dropped);
        }
        self.cancel = None;
        self.summary = None;
        self.state.store(SessionState::Idle);
    }

    /// Summary of the last run once its thread has finished.
    pub fn summary(&mut self) -> Option<&RunSummary> {
        if self.worker.as_ref().is_some_and(JoinHandle::is_finished) {
            self.collect_worker();
        }
        self.summary.as_ref()
    }

    /// Blocks until the current run's thread exits and returns its summary.
    ///
    /// The run only exits once its events are consumed, cancelled, or its
    /// stream is dropped.
    pub fn wait(&mut self) -> Option<&RunSummary> {
        self.collect_worker();
        self.summary.as_ref()
    }

    fn collect_worker(&mut self) {
        if let Some(worker) = self.worker.take() {
            match worker.join() {
                Ok(summary) => self.summary = Some(summary),
                Err(_) => tracing::warn!("session {}: solver thread panicked", self.id),
            }
        }
    }
}

impl Drop for SolverSession {
    fn drop(&mut self) {
        self.reset();
    }
}
