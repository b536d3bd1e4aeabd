use pathfinding::prelude::{bfs, dijkstra};
use proptest::prelude::*;
use rustc_hash::FxHashSet;

use grid_solver::cost::edge_cost;
use grid_solver::{path_cost, solve, Algorithm, CellType, Grid, Position, SearchEvent, Weather};

#[derive(Debug, Clone)]
struct Case {
    grid: Grid,
    start: Position,
    end: Position,
}

fn case() -> impl Strategy<Value = Case> {
    (3usize..8, 3usize..8)
        .prop_flat_map(|(w, h)| {
            (
                Just(w),
                Just(h),
                prop::collection::vec(prop::bool::weighted(0.3), w * h),
                0..w * h,
                0..w * h,
            )
        })
        .prop_filter("distinct endpoints", |(_, _, _, s, e)| s != e)
        .prop_map(|(w, h, blocked, s, e)| {
            let mut grid = Grid::with_dimensions(w, h);
            for (i, &b) in blocked.iter().enumerate() {
                if b {
                    grid.set(Position::new(i % w, i / w), CellType::Building);
                }
            }
            let start = Position::new(s % w, s / w);
            let end = Position::new(e % w, e / w);
            grid.set(start, CellType::Start);
            grid.set(end, CellType::End);
            Case { grid, start, end }
        })
}

struct Outcome {
    visited: Vec<Position>,
    path: Option<(Vec<Position>, u32)>,
}

fn run(case: &Case, algorithm: Algorithm, weather: Weather) -> Outcome {
    let events: Vec<SearchEvent> = solve(&case.grid, Some(case.start), Some(case.end), algorithm, weather)
        .unwrap()
        .collect();
    let mut visited = Vec::new();
    let mut path = None;
    for event in events {
        match event {
            SearchEvent::VisitedBatch { nodes } => visited.extend(nodes),
            SearchEvent::PathFound { path: p, cost, .. } => path = Some((p, cost)),
            _ => {}
        }
    }
    Outcome { visited, path }
}

fn shortest_edges(case: &Case) -> Option<usize> {
    bfs(&case.start, |&p| case.grid.neighbors(p), |&p| p == case.end).map(|p| p.len() - 1)
}

fn cheapest(case: &Case, weather: Weather) -> Option<u32> {
    dijkstra(
        &case.start,
        |&p| {
            case.grid
                .neighbors(p)
                .into_iter()
                .map(move |n| (n, edge_cost(weather)))
        },
        |&p| p == case.end,
    )
    .map(|(_, cost)| cost)
}

fn assert_walkable(case: &Case, path: &[Position]) {
    assert_eq!(path.first(), Some(&case.start));
    assert_eq!(path.last(), Some(&case.end));
    for pair in path.windows(2) {
        assert_eq!(pair[0].manhattan(&pair[1]), 1, "jump in {path:?}");
    }
    assert!(path.iter().all(|&p| case.grid.is_traversable(p)));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn bfs_and_iddfs_find_fewest_edges(case in case()) {
        let expected = shortest_edges(&case);
        for algorithm in [Algorithm::Bfs, Algorithm::Iddfs] {
            let outcome = run(&case, algorithm, Weather::Clear);
            let found = outcome.path.as_ref().map(|(p, _)| p.len() - 1);
            prop_assert_eq!(found, expected, "{}", algorithm);
        }
    }

    #[test]
    fn astar_and_ucs_find_the_cheapest_path(case in case(), snow in any::<bool>()) {
        let weather = if snow { Weather::Snow } else { Weather::Clear };
        let expected = cheapest(&case, weather);
        for algorithm in [Algorithm::AStar, Algorithm::Ucs] {
            let outcome = run(&case, algorithm, weather);
            prop_assert_eq!(outcome.path.map(|(_, cost)| cost), expected, "{}", algorithm);
        }
    }

    #[test]
    fn complete_searches_agree_on_reachability(case in case()) {
        let reachable = shortest_edges(&case).is_some();
        for algorithm in [Algorithm::Dfs, Algorithm::Greedy, Algorithm::Bidirectional] {
            let outcome = run(&case, algorithm, Weather::Clear);
            prop_assert_eq!(outcome.path.is_some(), reachable, "{}", algorithm);
        }
    }

    #[test]
    fn visited_covers_the_path_without_repeats(case in case()) {
        for algorithm in Algorithm::ALL {
            let outcome = run(&case, algorithm, Weather::Rain);
            let seen: FxHashSet<Position> = outcome.visited.iter().copied().collect();
            prop_assert_eq!(seen.len(), outcome.visited.len(), "{} repeated a position", algorithm);
            if let Some((path, cost)) = &outcome.path {
                assert_walkable(&case, path);
                prop_assert!(path.iter().all(|p| seen.contains(p)), "{} path not visited", algorithm);
                prop_assert_eq!(*cost, path_cost(path.len(), Weather::Rain));
            }
        }
    }

    #[test]
    fn cost_is_monotone_in_weather(len in 0usize..500) {
        let clear = path_cost(len, Weather::Clear);
        let rain = path_cost(len, Weather::Rain);
        let snow = path_cost(len, Weather::Snow);
        prop_assert!(clear <= rain && rain <= snow);
        prop_assert_eq!(path_cost(len, Weather::Rain), rain);
    }
}
