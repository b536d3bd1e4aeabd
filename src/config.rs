use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::algorithms::common::{SearchOptions, DEFAULT_BEAM_WIDTH};
use crate::algorithms::Algorithm;
use crate::cost::Weather;
use crate::error::{ConfigError, SolveError};
use crate::grid::{Position, DEFAULT_GRID_SIZE};
use crate::registry::MAX_SESSIONS;

/// Engine knobs shared by every session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Visited positions per `visited_batch` event.
    pub batch_size: usize,
    /// Events buffered per session before the solver blocks on its consumer.
    pub channel_capacity: usize,
    /// Candidates kept per beam search layer.
    pub beam_width: usize,
    /// Deepest IDDFS cutoff; defaults to the traversable cell count.
    pub max_depth: Option<usize>,
    /// How often a solver blocked on a full channel rechecks cancellation.
    pub poll_interval_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            batch_size: 5,
            channel_capacity: 64,
            beam_width: DEFAULT_BEAM_WIDTH,
            max_depth: None,
            poll_interval_ms: 20,
        }
    }
}

impl EngineConfig {
    /// Reads a JSON config file. Missing keys keep their defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: EngineConfig = serde_json::from_str(&contents)?;
        Ok(config.sanitized())
    }

    /// Clamps values that would stall the engine.
    pub fn sanitized(mut self) -> Self {
        self.batch_size = self.batch_size.max(1);
        self.channel_capacity = self.channel_capacity.max(1);
        self.beam_width = self.beam_width.max(1);
        self.poll_interval_ms = self.poll_interval_ms.max(1);
        self
    }

    pub fn search_options(&self) -> SearchOptions {
        SearchOptions {
            beam_width: self.beam_width,
            max_depth: self.max_depth,
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Config {
    #[arg(long, default_value_t = DEFAULT_GRID_SIZE)]
    pub grid_size: usize,

    /// Chance that a block interior cell becomes a building.
    #[arg(long, default_value_t = 0.4)]
    pub building_density: f64,

    #[arg(long)]
    pub seed: Option<u64>,

    /// Comma separated algorithms run side by side (at most three), or `all`
    /// to compare every algorithm.
    #[arg(long, default_value = "astar")]
    pub algorithm: String,

    #[arg(long, value_enum, default_value_t = Weather::Clear)]
    pub weather: Weather,

    /// Start cell as `x,y`; defaults to the first open cell.
    #[arg(long, value_parser = parse_position)]
    pub start: Option<Position>,

    /// End cell as `x,y`; defaults to the last open cell.
    #[arg(long, value_parser = parse_position)]
    pub end: Option<Position>,

    #[arg(long, default_value_t = 5)]
    pub batch_size: usize,

    #[arg(long, default_value_t = 64)]
    pub channel_capacity: usize,

    #[arg(long, default_value_t = DEFAULT_BEAM_WIDTH)]
    pub beam_width: usize,

    #[arg(long)]
    pub max_depth: Option<usize>,

    /// JSON engine config; replaces the engine flags above.
    #[arg(long)]
    pub engine_config: Option<String>,

    /// Serve the line-delimited JSON protocol on this address instead of
    /// running a local search.
    #[arg(long)]
    pub serve: Option<String>,

    #[arg(long, default_value_t = false)]
    pub show_grid: bool,

    #[arg(long, default_value_t = false)]
    pub quiet: bool,
}

/// What the `--algorithm` flag asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AlgorithmSelection {
    /// Run these side by side as concurrent sessions.
    Sessions(Vec<Algorithm>),
    /// Compare every algorithm on one environment.
    Compare,
}

impl Config {
    pub fn engine(&self) -> Result<EngineConfig, ConfigError> {
        if let Some(path) = &self.engine_config {
            return EngineConfig::load(Path::new(path));
        }
        Ok(EngineConfig {
            batch_size: self.batch_size,
            channel_capacity: self.channel_capacity,
            beam_width: self.beam_width,
            max_depth: self.max_depth,
            ..EngineConfig::default()
        }
        .sanitized())
    }

    pub fn selection(&self) -> Result<AlgorithmSelection, SolveError> {
        if self.algorithm.trim().eq_ignore_ascii_case("all") {
            return Ok(AlgorithmSelection::Compare);
        }
        let algorithms = self
            .algorithm
            .split(',')
            .filter(|name| !name.trim().is_empty())
            .map(str::parse)
            .collect::<Result<Vec<Algorithm>, _>>()?;
        if algorithms.is_empty() {
            return Err(SolveError::UnknownAlgorithm(self.algorithm.clone()));
        }
        if algorithms.len() > MAX_SESSIONS {
            return Err(SolveError::TooManySessions(MAX_SESSIONS));
        }
        Ok(AlgorithmSelection::Sessions(algorithms))
    }
}

fn parse_position(s: &str) -> Result<Position, String> {
    let (x, y) = s
        .split_once(',')
        .ok_or_else(|| format!("expected x,y but got '{}'", s))?;
    let x = x.trim().parse().map_err(|e| format!("bad x in '{}': {}", s, e))?;
    let y = y.trim().parse().map_err(|e| format!("bad y in '{}': {}", s, e))?;
    Ok(Position::new(x, y))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Config {
        Config::parse_from(std::iter::once("grid_solver").chain(args.iter().copied()))
    }

    #[test]
    fn defaults_match_the_ui() {
        let config = parse(&[]);
        assert_eq!(config.grid_size, 20);
        assert_eq!(config.weather, Weather::Clear);
        assert_eq!(
            config.selection().unwrap(),
            AlgorithmSelection::Sessions(vec![Algorithm::AStar])
        );
        assert_eq!(config.engine().unwrap(), EngineConfig::default());
    }

    #[test]
    fn parses_side_by_side_sessions() {
        let config = parse(&["--algorithm", "bfs, dfs,astar", "--weather", "snow"]);
        assert_eq!(
            config.selection().unwrap(),
            AlgorithmSelection::Sessions(vec![Algorithm::Bfs, Algorithm::Dfs, Algorithm::AStar])
        );
        assert_eq!(config.weather, Weather::Snow);
    }

    #[test]
    fn caps_session_count() {
        let config = parse(&["--algorithm", "bfs,dfs,ucs,beam"]);
        assert!(matches!(
            config.selection(),
            Err(SolveError::TooManySessions(3))
        ));
        assert_eq!(
            parse(&["--algorithm", "ALL"]).selection().unwrap(),
            AlgorithmSelection::Compare
        );
    }

    #[test]
    fn parses_positions() {
        let config = parse(&["--start", "1,2", "--end", " 19 , 0"]);
        assert_eq!(config.start, Some(Position::new(1, 2)));
        assert_eq!(config.end, Some(Position::new(19, 0)));
        assert!(parse_position("3").is_err());
    }

    #[test]
    fn engine_config_fills_missing_keys() {
        let config: EngineConfig = serde_json::from_str(r#"{"batch_size": 0}"#).unwrap();
        let config = config.sanitized();
        assert_eq!(config.batch_size, 1);
        assert_eq!(config.channel_capacity, 64);
    }
}
