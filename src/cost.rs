use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Weight of a single move before any environmental penalty.
pub const BASE_EDGE_COST: u32 = 1;

/// Environment-wide weather applied uniformly to every edge of a path.
///
/// Weather never changes which cells can be entered, only what a path costs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Weather {
    #[default]
    Clear,
    Rain,
    Snow,
}

impl Weather {
    /// Additive per-edge penalty.
    pub fn penalty(self) -> u32 {
        match self {
            Weather::Clear => 0,
            Weather::Rain => 2,
            Weather::Snow => 4,
        }
    }
}

impl fmt::Display for Weather {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Weather::Clear => "clear",
            Weather::Rain => "rain",
            Weather::Snow => "snow",
        };
        f.write_str(name)
    }
}

pub fn edge_cost(weather: Weather) -> u32 {
    BASE_EDGE_COST + weather.penalty()
}

/// Total cost of a path of `path_len` positions (start and end inclusive).
///
/// Computed from the finished path only, never from an algorithm's own
/// g-values, so every algorithm is charged the same way.
pub fn path_cost(path_len: usize, weather: Weather) -> u32 {
    if path_len <= 1 {
        return 0;
    }
    (path_len as u32 - 1) * edge_cost(weather)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edge_cost_adds_weather_penalty() {
        assert_eq!(edge_cost(Weather::Clear), 1);
        assert_eq!(edge_cost(Weather::Rain), 3);
        assert_eq!(edge_cost(Weather::Snow), 5);
    }

    #[test]
    fn trivial_paths_cost_nothing() {
        assert_eq!(path_cost(0, Weather::Snow), 0);
        assert_eq!(path_cost(1, Weather::Rain), 0);
    }

    #[test]
    fn cost_scales_with_edges() {
        // five positions, four edges
        assert_eq!(path_cost(5, Weather::Clear), 4);
        assert_eq!(path_cost(5, Weather::Rain), 12);
        assert_eq!(path_cost(5, Weather::Snow), 20);
    }

    #[test]
    fn worse_weather_never_costs_less() {
        for len in 0..50 {
            let clear = path_cost(len, Weather::Clear);
            let rain = path_cost(len, Weather::Rain);
            let snow = path_cost(len, Weather::Snow);
            assert!(clear <= rain && rain <= snow);
            assert_eq!(clear, path_cost(len, Weather::Clear));
        }
    }

    #[test]
    fn weather_uses_lowercase_names_on_the_wire() {
        assert_eq!(serde_json::to_string(&Weather::Snow).unwrap(), "\"snow\"");
        let parsed: Weather = serde_json::from_str("\"rain\"").unwrap();
        assert_eq!(parsed, Weather::Rain);
    }
}
