use clap::Parser;
use rustc_hash::FxHashMap;
use std::error::Error;

use grid_solver::comparison::{print_comparison_results, run_all_algorithms, Environment};
use grid_solver::config::{AlgorithmSelection, Config, EngineConfig};
use grid_solver::protocol::serve_tcp;
use grid_solver::statistics::{optimal_path_length, Statistics};
use grid_solver::{Algorithm, MergedEvents, Position, SearchEvent, SessionId, SessionRegistry};

fn main() {
    let config = Config::parse();

    let directive = if config.quiet {
        "grid_solver=warn"
    } else {
        "grid_solver=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(directive)),
        )
        .init();

    if let Err(e) = run(config) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(config: Config) -> Result<(), Box<dyn Error>> {
    let engine = config.engine()?;

    if let Some(addr) = &config.serve {
        serve_tcp(addr.as_str(), engine)?;
        return Ok(());
    }

    let selection = config.selection()?;
    let environment = Environment::generate(
        config.grid_size,
        config.building_density,
        config.seed,
        config.start,
        config.end,
    )?;

    println!("Grid size: {}x{}", config.grid_size, config.grid_size);
    println!("Environment seed: {} (for reproducibility)", environment.seed);
    println!("Start: {}, Goal: {}", environment.start, environment.end);
    println!("Weather: {}", config.weather);
    println!();

    match selection {
        AlgorithmSelection::Compare => {
            let results = run_all_algorithms(&environment, &engine, config.weather)?;
            print_comparison_results(&results);
            if config.show_grid {
                for result in &results {
                    println!("\n=== {} ===", result.statistics.algorithm);
                    print!(
                        "{}",
                        environment.grid.render(
                            Some(environment.start),
                            Some(environment.end),
                            &result.visited,
                            &result.path,
                        )
                    );
                }
            }
        }
        AlgorithmSelection::Sessions(algorithms) => {
            run_sessions(&config, engine, &environment, &algorithms)?;
        }
    }
    Ok(())
}

/// Runs the chosen algorithms side by side and reports each one.
fn run_sessions(
    config: &Config,
    engine: EngineConfig,
    environment: &Environment,
    algorithms: &[Algorithm],
) -> Result<(), Box<dyn Error>> {
    let mut registry = SessionRegistry::with_algorithms(engine, algorithms)?;
    let streams = registry.run_all(
        &environment.grid,
        Some(environment.start),
        Some(environment.end),
        config.weather,
    )?;

    let mut visited: FxHashMap<SessionId, Vec<Position>> = FxHashMap::default();
    for stamped in MergedEvents::new(streams.into_iter().map(|(_, stream)| stream)) {
        match stamped.event {
            SearchEvent::VisitedBatch { nodes } => {
                visited.entry(stamped.session).or_default().extend(nodes);
            }
            SearchEvent::PathFound { path, cost, .. } if !config.quiet => {
                println!(
                    "[{:>8}us] session {}: path of {} moves, cost {}",
                    stamped.at_us,
                    stamped.session,
                    path.len().saturating_sub(1),
                    cost
                );
            }
            SearchEvent::Failed { reason } if !config.quiet => {
                println!(
                    "[{:>8}us] session {}: no path ({})",
                    stamped.at_us, stamped.session, reason
                );
            }
            _ => {}
        }
    }

    let optimal = optimal_path_length(&environment.grid, environment.start, environment.end);
    for id in registry.ids() {
        let Some(summary) = registry.wait(id)? else {
            continue;
        };
        let stats = Statistics::from_summary(&summary, optimal);
        println!("\n=== SESSION {} RESULTS ===", id);
        println!("{}", stats);
        if config.show_grid {
            let seen = visited.get(&id).map(Vec::as_slice).unwrap_or(&[]);
            print!(
                "{}",
                environment.grid.render(
                    Some(environment.start),
                    Some(environment.end),
                    seen,
                    &summary.path,
                )
            );
        }
    }
    Ok(())
}
