//! Streaming shortest-path search over city grids.
//!
//! A search runs on its own thread and reports progress as a stream of
//! [`SearchEvent`]s: batches of visited cells, then the path or the reason
//! there is none. Up to [`MAX_SESSIONS`] searches can run side by side over
//! one grid snapshot through a [`SessionRegistry`].

pub mod algorithms;
pub mod comparison;
pub mod config;
pub mod cost;
pub mod error;
pub mod events;
pub mod grid;
pub mod protocol;
pub mod registry;
pub mod session;
pub mod statistics;

pub use algorithms::{Algorithm, FailureReason};
pub use config::EngineConfig;
pub use cost::{path_cost, Weather};
pub use error::{GridError, ProtocolError, SolveError};
pub use events::{CancelToken, SearchEvent};
pub use grid::{CellType, Grid, Position};
pub use registry::{MergedEvents, SessionRegistry, MAX_SESSIONS};
pub use session::{
    solve, solve_with, EventStream, RunOutcome, RunSummary, SessionId, SessionState,
    SolverSession, StampedEvent,
};
