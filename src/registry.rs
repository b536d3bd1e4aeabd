//! Side-by-side sessions over one grid snapshot.

use crossbeam_channel::Select;
use std::sync::Arc;
use std::time::Instant;

use crate::algorithms::Algorithm;
use crate::config::EngineConfig;
use crate::cost::Weather;
use crate::error::{Result, SolveError};
use crate::events::check_endpoints;
use crate::grid::{Grid, Position};
use crate::session::{EventStream, RunSummary, SessionId, SessionState, SolverSession, StampedEvent};

pub const MAX_SESSIONS: usize = 3;

struct Slot {
    session: SolverSession,
    active: bool,
}

/// Up to [`MAX_SESSIONS`] sessions, each with its own algorithm.
pub struct SessionRegistry {
    config: EngineConfig,
    slots: Vec<Slot>,
    next_id: u32,
}

impl SessionRegistry {
    pub fn new(config: EngineConfig) -> Self {
        SessionRegistry {
            config,
            slots: Vec::with_capacity(MAX_SESSIONS),
            next_id: 1,
        }
    }

    /// A registry with one active session per algorithm.
    pub fn with_algorithms(config: EngineConfig, algorithms: &[Algorithm]) -> Result<Self> {
        let mut registry = SessionRegistry::new(config);
        for &algorithm in algorithms {
            registry.add_session(algorithm)?;
        }
        Ok(registry)
    }

    pub fn add_session(&mut self, algorithm: Algorithm) -> Result<SessionId> {
        if self.slots.len() >= MAX_SESSIONS {
            return Err(SolveError::TooManySessions(MAX_SESSIONS));
        }
        let id = SessionId(self.next_id);
        self.next_id += 1;
        self.slots.push(Slot {
            session: SolverSession::new(id, algorithm, self.config.clone()),
            active: true,
        });
        tracing::debug!("added session {} running {}", id, algorithm);
        Ok(id)
    }

    /// Stops the session's run, if any, and forgets it.
    pub fn remove_session(&mut self, id: SessionId) -> Result<()> {
        let index = self.index(id)?;
        let mut slot = self.slots.remove(index);
        slot.session.reset();
        Ok(())
    }

    pub fn set_algorithm(&mut self, id: SessionId, algorithm: Algorithm) -> Result<()> {
        let slot = self.slot_mut(id)?;
        if slot.session.state() == SessionState::Running {
            return Err(SolveError::SessionBusy(id));
        }
        slot.session.set_algorithm(algorithm);
        Ok(())
    }

    /// Inactive sessions are skipped by [`run_all`](Self::run_all).
    pub fn set_active(&mut self, id: SessionId, active: bool) -> Result<()> {
        self.slot_mut(id)?.active = active;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn ids(&self) -> Vec<SessionId> {
        self.slots.iter().map(|slot| slot.session.id()).collect()
    }

    pub fn algorithm(&self, id: SessionId) -> Result<Algorithm> {
        Ok(self.slot(id)?.session.algorithm())
    }

    pub fn is_active(&self, id: SessionId) -> Result<bool> {
        Ok(self.slot(id)?.active)
    }

    pub fn state(&self, id: SessionId) -> Result<SessionState> {
        Ok(self.slot(id)?.session.state())
    }

    /// The last finished run of a session, if its thread has exited.
    pub fn summary(&mut self, id: SessionId) -> Result<Option<RunSummary>> {
        Ok(self.slot_mut(id)?.session.summary().cloned())
    }

    /// Blocks until the session's current run exits.
    pub fn wait(&mut self, id: SessionId) -> Result<Option<RunSummary>> {
        Ok(self.slot_mut(id)?.session.wait().cloned())
    }

    /// Starts every active session on one shared snapshot of `grid`.
    ///
    /// Endpoints are validated once before any session starts, and no
    /// session starts while another is still running.
    pub fn run_all(
        &mut self,
        grid: &Grid,
        start: Option<Position>,
        end: Option<Position>,
        weather: Weather,
    ) -> Result<Vec<(SessionId, EventStream)>> {
        let (start, end) = check_endpoints(grid, start, end)?;
        if let Some(busy) = self
            .slots
            .iter()
            .find(|slot| slot.session.state() == SessionState::Running)
        {
            return Err(SolveError::SessionBusy(busy.session.id()));
        }

        let snapshot = Arc::new(grid.clone());
        let epoch = Instant::now();
        let mut streams = Vec::with_capacity(self.slots.len());
        for slot in self.slots.iter_mut().filter(|slot| slot.active) {
            let id = slot.session.id();
            let stream = slot
                .session
                .start_at(Arc::clone(&snapshot), start, end, weather, epoch)?;
            streams.push((id, stream));
        }
        tracing::info!(
            "started {} session(s) from {} to {} in {} weather",
            streams.len(),
            start,
            end,
            weather
        );
        Ok(streams)
    }

    /// Starts a single session on its own snapshot of `grid`.
    pub fn start(
        &mut self,
        id: SessionId,
        grid: &Grid,
        start: Option<Position>,
        end: Option<Position>,
        weather: Weather,
    ) -> Result<EventStream> {
        let (start, end) = check_endpoints(grid, start, end)?;
        let snapshot = Arc::new(grid.clone());
        self.slot_mut(id)?.session.start(snapshot, start, end, weather)
    }

    pub fn cancel(&self, id: SessionId) -> Result<()> {
        self.slot(id)?.session.cancel();
        Ok(())
    }

    pub fn reset(&mut self, id: SessionId) -> Result<()> {
        self.slot_mut(id)?.session.reset();
        Ok(())
    }

    pub fn cancel_all(&self) {
        for slot in &self.slots {
            slot.session.cancel();
        }
    }

    pub fn reset_all(&mut self) {
        for slot in &mut self.slots {
            slot.session.reset();
        }
    }

    fn index(&self, id: SessionId) -> Result<usize> {
        self.slots
            .iter()
            .position(|slot| slot.session.id() == id)
            .ok_or(SolveError::SessionNotFound(id))
    }

    fn slot(&self, id: SessionId) -> Result<&Slot> {
        let index = self.index(id)?;
        Ok(&self.slots[index])
    }

    fn slot_mut(&mut self, id: SessionId) -> Result<&mut Slot> {
        let index = self.index(id)?;
        Ok(&mut self.slots[index])
    }
}

/// Interleaves several event streams as their events arrive.
///
/// Events from one session keep their order; across sessions the order is
/// whatever the threads produced.
pub struct MergedEvents {
    streams: Vec<EventStream>,
}

impl MergedEvents {
    pub fn new(streams: impl IntoIterator<Item = EventStream>) -> Self {
        MergedEvents {
            streams: streams.into_iter().collect(),
        }
    }

    pub fn cancel(&self) {
        for stream in &self.streams {
            stream.cancel();
        }
    }

    /// Drains every stream and orders the result by `(at_us, session, seq)`.
    pub fn collect_sorted(self) -> Vec<StampedEvent> {
        let mut events: Vec<StampedEvent> = self.collect();
        events.sort_by_key(|e| (e.at_us, e.session, e.seq));
        events
    }
}

impl Iterator for MergedEvents {
    type Item = StampedEvent;

    fn next(&mut self) -> Option<StampedEvent> {
        loop {
            let live: Vec<usize> = (0..self.streams.len())
                .filter(|&i| !self.streams[i].is_finished())
                .collect();
            if live.is_empty() {
                return None;
            }

            let (index, received) = {
                let mut select = Select::new();
                for &i in &live {
                    select.recv(self.streams[i].receiver());
                }
                let op = select.select();
                let index = live[op.index()];
                (index, op.recv(self.streams[index].receiver()).ok())
            };

            self.streams[index].observe(received.as_ref());
            if received.is_some() {
                return received;
            }
        }
    }
}
