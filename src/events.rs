//! The event stream one search run produces.
//!
//! [`SearchEvents`] drives a [`Search`] lazily and turns its steps into the
//! records a caller sees: batches of visited positions, then either
//! `path_found` + `complete` or a single `error`. It is single-threaded; the
//! session module moves it onto a worker thread.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::algorithms::{Algorithm, FailureReason, Search, SearchOptions, Step};
use crate::cost::{path_cost, Weather};
use crate::error::{Result, SolveError};
use crate::grid::{Grid, Position};

/// One streamed record. Serializes to the tagged JSON shape the UI reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SearchEvent {
    VisitedBatch {
        nodes: Vec<Position>,
    },
    PathFound {
        path: Vec<Position>,
        cost: u32,
        /// Predecessor links the run recorded.
        complexity: usize,
    },
    Complete,
    #[serde(rename = "error")]
    Failed {
        #[serde(rename = "error")]
        reason: FailureReason,
    },
    Cancelled,
}

impl SearchEvent {
    /// `complete`, `error` and `cancelled` end a run.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SearchEvent::Complete | SearchEvent::Failed { .. } | SearchEvent::Cancelled
        )
    }
}

/// Cooperative cancellation flag shared between a run and its owner.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// What to search for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchSpec {
    pub algorithm: Algorithm,
    pub start: Position,
    pub end: Position,
    pub weather: Weather,
}

/// Rejects endpoints that make a search meaningless.
///
/// Runs before any search state exists, so a rejected request never emits
/// an event.
pub fn check_endpoints(
    grid: &Grid,
    start: Option<Position>,
    end: Option<Position>,
) -> Result<(Position, Position)> {
    let start = start.ok_or(SolveError::MissingStart)?;
    let end = end.ok_or(SolveError::MissingEnd)?;
    for pos in [start, end] {
        if !grid.in_bounds(pos) {
            return Err(SolveError::OutOfBounds {
                pos,
                width: grid.width(),
                height: grid.height(),
            });
        }
    }
    if start == end {
        return Err(SolveError::SameEndpoints(start));
    }
    for pos in [start, end] {
        match grid.cell(pos) {
            Some(cell) if !cell.is_traversable() => {
                return Err(SolveError::NotTraversable { pos, cell });
            }
            _ => {}
        }
    }
    Ok((start, end))
}

/// Lazy, finite sequence of events for one run.
pub struct SearchEvents {
    grid: Arc<Grid>,
    search: Box<dyn Search>,
    weather: Weather,
    batch_size: usize,
    pending: Vec<Position>,
    queued: VecDeque<SearchEvent>,
    cancel: CancelToken,
    exhausted: bool,
    terminated: bool,
}

impl SearchEvents {
    pub fn new(
        grid: Arc<Grid>,
        spec: SearchSpec,
        options: &SearchOptions,
        batch_size: usize,
        cancel: CancelToken,
    ) -> Result<Self> {
        let (start, end) = check_endpoints(&grid, Some(spec.start), Some(spec.end))?;
        let search = spec.algorithm.create(&grid, start, end, options);
        Ok(SearchEvents {
            grid,
            search,
            weather: spec.weather,
            batch_size: batch_size.max(1),
            pending: Vec::new(),
            queued: VecDeque::new(),
            cancel,
            exhausted: false,
            terminated: false,
        })
    }

    pub fn algorithm(&self) -> Algorithm {
        self.search.algorithm()
    }

    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    fn queue_pending(&mut self) {
        for chunk in self.pending.chunks(self.batch_size) {
            self.queued.push_back(SearchEvent::VisitedBatch {
                nodes: chunk.to_vec(),
            });
        }
        self.pending.clear();
    }

    /// Expands until there is something to emit.
    fn advance(&mut self) {
        while self.queued.is_empty() && !self.exhausted {
            if self.cancel.is_cancelled() {
                return;
            }
            match self.search.step(&self.grid) {
                Step::Expanded(Some(pos)) => {
                    self.pending.push(pos);
                    if self.pending.len() >= self.batch_size {
                        self.queue_pending();
                    }
                }
                Step::Expanded(None) => {}
                Step::Reached {
                    examined,
                    path,
                    complexity,
                } => {
                    self.exhausted = true;
                    self.pending.extend(examined);
                    self.queue_pending();
                    // the only place cost is computed
                    let cost = path_cost(path.len(), self.weather);
                    self.queued.push_back(SearchEvent::PathFound {
                        path,
                        cost,
                        complexity,
                    });
                    self.queued.push_back(SearchEvent::Complete);
                }
                Step::Exhausted(reason) => {
                    self.exhausted = true;
                    self.queue_pending();
                    self.queued.push_back(SearchEvent::Failed { reason });
                }
            }
        }
    }
}

impl Iterator for SearchEvents {
    type Item = SearchEvent;

    fn next(&mut self) -> Option<SearchEvent> {
        if self.terminated {
            return None;
        }
        self.advance();
        if self.cancel.is_cancelled() {
            self.pending.clear();
            self.queued.clear();
            self.terminated = true;
            return Some(SearchEvent::Cancelled);
        }
        let event = self.queued.pop_front()?;
        if event.is_terminal() {
            self.terminated = true;
        }
        Some(event)
    }
}
