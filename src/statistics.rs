use pathfinding::prelude::bfs;
use std::fmt;
use std::time::Duration;

use crate::algorithms::Algorithm;
use crate::grid::{Grid, Position};
use crate::session::{RunOutcome, RunSummary};

/// Per-run figures shown after a search and in the comparison table.
#[derive(Debug, Clone)]
pub struct Statistics {
    pub algorithm: Algorithm,
    pub outcome: RunOutcome,
    pub visited: usize,
    /// Edges in the returned path, 0 when none was found.
    pub path_length: usize,
    pub optimal_path_length: Option<usize>,
    /// Path length over optimal length; 1.0 is a shortest path.
    pub route_efficiency: f64,
    pub cost: Option<u32>,
    pub elapsed: Duration,
}

/// Fewest edges between `start` and `end`, if they are connected.
pub fn optimal_path_length(grid: &Grid, start: Position, end: Position) -> Option<usize> {
    bfs(&start, |&pos| grid.neighbors(pos), |&pos| pos == end).map(|path| path.len() - 1)
}

impl Statistics {
    pub fn from_summary(summary: &RunSummary, optimal_path_length: Option<usize>) -> Self {
        let mut stats = Statistics {
            algorithm: summary.algorithm,
            outcome: summary.outcome,
            visited: summary.visited,
            path_length: summary.path.len().saturating_sub(1),
            optimal_path_length,
            route_efficiency: 0.0,
            cost: summary.cost,
            elapsed: summary.elapsed,
        };
        stats.calculate_efficiency();
        stats
    }

    pub fn calculate_efficiency(&mut self) {
        self.route_efficiency = match self.optimal_path_length {
            Some(optimal) if optimal > 0 && self.path_length > 0 => {
                self.path_length as f64 / optimal as f64
            }
            _ => 0.0,
        };
    }

    pub fn found(&self) -> bool {
        self.outcome == RunOutcome::Found
    }
}

impl fmt::Display for Statistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Algorithm: {}", self.algorithm)?;
        match self.outcome {
            RunOutcome::Found => writeln!(f, "Outcome: path found")?,
            RunOutcome::Failed(reason) => writeln!(f, "Outcome: failed ({})", reason)?,
            RunOutcome::Cancelled => writeln!(f, "Outcome: cancelled")?,
            RunOutcome::Disconnected => writeln!(f, "Outcome: disconnected")?,
        }
        writeln!(f, "Visited Nodes: {}", self.visited)?;
        writeln!(f, "Path Length: {}", self.path_length)?;
        match self.optimal_path_length {
            Some(optimal) => writeln!(f, "Optimal Path Length: {}", optimal)?,
            None => writeln!(f, "Optimal Path Length: unreachable")?,
        }
        if let Some(cost) = self.cost {
            writeln!(f, "Path Cost: {}", cost)?;
        }
        writeln!(f, "Route Efficiency: {:.3}", self.route_efficiency)?;
        if self.route_efficiency > 1.0 {
            let extra = self.path_length - self.optimal_path_length.unwrap_or(self.path_length);
            writeln!(f, "Note: {} moves longer than the shortest route", extra)?;
        }
        writeln!(f, "Search Time: {:.2?}", self.elapsed)?;
        Ok(())
    }
}
