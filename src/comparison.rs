use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;

use crate::algorithms::Algorithm;
use crate::config::EngineConfig;
use crate::cost::Weather;
use crate::error::{Result, SolveError};
use crate::events::SearchEvent;
use crate::grid::{Grid, Position};
use crate::session::{SessionId, SolverSession};
use crate::statistics::{optimal_path_length, Statistics};

/// One generated city shared by every algorithm in a comparison.
#[derive(Debug, Clone)]
pub struct Environment {
    pub seed: u64,
    pub grid: Grid,
    pub start: Position,
    pub end: Position,
}

impl Environment {
    /// Generates a city grid; the same seed always yields the same layout.
    pub fn generate(
        size: usize,
        density: f64,
        seed: Option<u64>,
        start: Option<Position>,
        end: Option<Position>,
    ) -> Result<Self> {
        let seed = seed.unwrap_or_else(rand::random);
        let mut rng = StdRng::seed_from_u64(seed);
        let grid = Grid::city(size, density, &mut rng);
        let (default_start, default_end) = grid.default_endpoints();
        let start = start.or(default_start).ok_or(SolveError::MissingStart)?;
        let end = end.or(default_end).ok_or(SolveError::MissingEnd)?;
        Ok(Environment {
            seed,
            grid,
            start,
            end,
        })
    }
}

#[derive(Debug, Clone)]
pub struct AlgorithmResult {
    pub statistics: Statistics,
    pub visited: Vec<Position>,
    pub path: Vec<Position>,
}

/// Runs every algorithm, one after another, on the same environment.
pub fn run_all_algorithms(
    environment: &Environment,
    config: &EngineConfig,
    weather: Weather,
) -> Result<Vec<AlgorithmResult>> {
    let optimal = optimal_path_length(&environment.grid, environment.start, environment.end);
    let snapshot = Arc::new(environment.grid.clone());

    tracing::info!(
        "comparing {} algorithms on a {}x{} grid (seed {})",
        Algorithm::ALL.len(),
        environment.grid.width(),
        environment.grid.height(),
        environment.seed
    );

    let mut results = Vec::with_capacity(Algorithm::ALL.len());
    for (i, algorithm) in Algorithm::ALL.into_iter().enumerate() {
        tracing::info!("running algorithm {} of {}: {}", i + 1, Algorithm::ALL.len(), algorithm);
        let mut session = SolverSession::new(SessionId(i as u32 + 1), algorithm, config.clone());
        let stream = session.start(
            Arc::clone(&snapshot),
            environment.start,
            environment.end,
            weather,
        )?;

        let mut visited = Vec::new();
        for event in stream {
            if let SearchEvent::VisitedBatch { nodes } = event {
                visited.extend(nodes);
            }
        }

        let Some(summary) = session.wait().cloned() else {
            tracing::warn!("{} produced no summary, skipping", algorithm);
            continue;
        };
        results.push(AlgorithmResult {
            statistics: Statistics::from_summary(&summary, optimal),
            visited,
            path: summary.path,
        });
    }
    Ok(results)
}

pub fn print_comparison_results(results: &[AlgorithmResult]) {
    println!("\n=== ALGORITHM COMPARISON RESULTS ===");
    println!();
    println!(
        "{:<15} {:<8} {:<10} {:<8} {:<8} {:<8} {:<12} {:<12}",
        "Algorithm", "Success", "Visited", "Length", "Optimal", "Cost", "Efficiency", "Time"
    );
    println!("{}", "-".repeat(87));

    for result in results {
        let stats = &result.statistics;
        let success = if stats.found() { "✓" } else { "✗" };
        let optimal = stats
            .optimal_path_length
            .map_or_else(|| "-".to_string(), |n| n.to_string());
        let cost = stats.cost.map_or_else(|| "-".to_string(), |c| c.to_string());
        println!(
            "{:<15} {:<8} {:<10} {:<8} {:<8} {:<8} {:<12} {:<12}",
            stats.algorithm.to_string(),
            success,
            stats.visited,
            stats.path_length,
            optimal,
            cost,
            format!("{:.3}", stats.route_efficiency),
            format!("{:.2?}", stats.elapsed)
        );
    }
    println!();

    let successful: Vec<&Statistics> = results
        .iter()
        .map(|r| &r.statistics)
        .filter(|s| s.found())
        .collect();
    if successful.is_empty() {
        println!("No algorithm found a path.");
        return;
    }

    println!("=== PERFORMANCE ANALYSIS ===");
    if let Some(best) = successful.iter().min_by_key(|s| s.visited) {
        println!("Fewest nodes visited: {} ({})", best.algorithm, best.visited);
    }
    if let Some(best) = successful.iter().min_by_key(|s| s.path_length) {
        println!("Shortest path: {} ({} moves)", best.algorithm, best.path_length);
    }
    if let Some(best) = successful.iter().min_by_key(|s| s.elapsed) {
        println!("Fastest: {} ({:.2?})", best.algorithm, best.elapsed);
    }
    let optimal: Vec<String> = successful
        .iter()
        .filter(|s| Some(s.path_length) == s.optimal_path_length)
        .map(|s| s.algorithm.to_string())
        .collect();
    println!("Optimal routes: {}", optimal.join(", "));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::RunOutcome;

    #[test]
    fn same_seed_same_environment() {
        let a = Environment::generate(15, 0.5, Some(42), None, None).unwrap();
        let b = Environment::generate(15, 0.5, Some(42), None, None).unwrap();
        assert_eq!(a.grid, b.grid);
        assert_eq!(a.start, Position::new(0, 0));
        assert_eq!(a.end, Position::new(14, 14));
    }

    #[test]
    fn every_algorithm_runs_on_the_shared_grid() {
        let environment = Environment::generate(20, 0.4, Some(7), None, None).unwrap();
        let results =
            run_all_algorithms(&environment, &EngineConfig::default(), Weather::Clear).unwrap();
        assert_eq!(results.len(), Algorithm::ALL.len());

        let optimal = results[0].statistics.optimal_path_length.unwrap();
        for result in &results {
            let stats = &result.statistics;
            match stats.algorithm {
                Algorithm::Bfs | Algorithm::Ucs | Algorithm::AStar | Algorithm::Iddfs => {
                    assert_eq!(stats.outcome, RunOutcome::Found);
                    assert_eq!(stats.path_length, optimal);
                }
                Algorithm::Beam => {}
                _ => assert!(stats.found()),
            }
            assert_eq!(stats.visited, result.visited.len());
        }
    }
}
