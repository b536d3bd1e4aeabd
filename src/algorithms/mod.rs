pub mod a_star;
pub mod beam;
pub mod bfs;
pub mod bidirectional;
pub mod common;
pub mod dfs;
pub mod greedy;
pub mod iddfs;
pub mod ucs;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::SolveError;
use crate::grid::{Grid, Position};

pub use common::{FailureReason, Search, SearchOptions, Step};

/// The search strategies a session can run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Algorithm {
    Bfs,
    Dfs,
    Ucs,
    AStar,
    Greedy,
    Bidirectional,
    Beam,
    Iddfs,
}

impl Algorithm {
    pub const ALL: [Algorithm; 8] = [
        Algorithm::Bfs,
        Algorithm::Dfs,
        Algorithm::Ucs,
        Algorithm::AStar,
        Algorithm::Greedy,
        Algorithm::Bidirectional,
        Algorithm::Beam,
        Algorithm::Iddfs,
    ];

    /// Name used by the UI and on the wire.
    pub fn name(self) -> &'static str {
        match self {
            Algorithm::Bfs => "bfs",
            Algorithm::Dfs => "dfs",
            Algorithm::Ucs => "ucs",
            Algorithm::AStar => "astar",
            Algorithm::Greedy => "greedy",
            Algorithm::Bidirectional => "bidirectional",
            Algorithm::Beam => "beam",
            Algorithm::Iddfs => "iddfs",
        }
    }

    /// Creates a fresh run of this algorithm from `start` to `goal`.
    pub fn create(
        self,
        grid: &Grid,
        start: Position,
        goal: Position,
        options: &SearchOptions,
    ) -> Box<dyn Search> {
        match self {
            Algorithm::Bfs => Box::new(bfs::BreadthFirst::new(start, goal)),
            Algorithm::Dfs => Box::new(dfs::DepthFirst::new(start, goal)),
            Algorithm::Ucs => Box::new(ucs::UniformCost::new(start, goal)),
            Algorithm::AStar => Box::new(a_star::AStar::new(start, goal)),
            Algorithm::Greedy => Box::new(greedy::GreedyBestFirst::new(start, goal)),
            Algorithm::Bidirectional => Box::new(bidirectional::Bidirectional::new(start, goal)),
            Algorithm::Beam => Box::new(beam::Beam::new(start, goal, options.beam_width)),
            Algorithm::Iddfs => {
                let max_depth = options
                    .max_depth
                    .unwrap_or_else(|| grid.traversable_count());
                Box::new(iddfs::IterativeDeepening::new(start, goal, max_depth))
            }
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Algorithm {
    type Err = SolveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bfs" => Ok(Algorithm::Bfs),
            "dfs" => Ok(Algorithm::Dfs),
            "ucs" | "dijkstra" => Ok(Algorithm::Ucs),
            "astar" | "a_star" | "a*" => Ok(Algorithm::AStar),
            "greedy" => Ok(Algorithm::Greedy),
            "bidirectional" | "bi-dir" => Ok(Algorithm::Bidirectional),
            "beam" => Ok(Algorithm::Beam),
            "iddfs" => Ok(Algorithm::Iddfs),
            _ => Err(SolveError::UnknownAlgorithm(s.to_string())),
        }
    }
}
