//! Error types for the solver

use thiserror::Error;

use crate::grid::{CellType, Position};
use crate::session::SessionId;

/// A grid snapshot that cannot be turned into a [`Grid`](crate::grid::Grid).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GridError {
    #[error("grid snapshot is empty")]
    Empty,

    #[error("row {row} has {found} cells, expected {expected}")]
    Ragged {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("cell record {found} stored at {expected}")]
    Misplaced { expected: Position, found: Position },
}

/// Precondition failures, reported before a search emits anything.
#[derive(Error, Debug)]
pub enum SolveError {
    #[error("no start position set")]
    MissingStart,

    #[error("no end position set")]
    MissingEnd,

    #[error("start and end are both {0}")]
    SameEndpoints(Position),

    #[error("{pos} is outside the {width}x{height} grid")]
    OutOfBounds {
        pos: Position,
        width: usize,
        height: usize,
    },

    #[error("{pos} is a {cell} cell")]
    NotTraversable { pos: Position, cell: CellType },

    #[error("unknown algorithm '{0}'")]
    UnknownAlgorithm(String),

    #[error("session {0} is already running")]
    SessionBusy(SessionId),

    #[error("no session with id {0}")]
    SessionNotFound(SessionId),

    #[error("at most {0} sessions can be registered")]
    TooManySessions(usize),

    #[error("invalid grid: {0}")]
    Grid(#[from] GridError),

    #[error("failed to spawn solver thread: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Failures of the line-oriented wire adapter.
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("invalid data: {0}")]
    Json(#[from] serde_json::Error),

    #[error("connection error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Solve(#[from] SolveError),
}

/// An engine config file that could not be read.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SolveError>;
