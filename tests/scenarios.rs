use grid_solver::{
    solve, Algorithm, CellType, EngineConfig, Grid, Position, SearchEvent, SessionRegistry,
    SolveError, Weather,
};

fn run(grid: &Grid, start: Position, end: Position, algorithm: Algorithm, weather: Weather) -> Vec<SearchEvent> {
    solve(grid, Some(start), Some(end), algorithm, weather)
        .expect("valid request")
        .collect()
}

fn found_path(events: &[SearchEvent]) -> Option<(&[Position], u32)> {
    events.iter().find_map(|event| match event {
        SearchEvent::PathFound { path, cost, .. } => Some((path.as_slice(), *cost)),
        _ => None,
    })
}

fn visited(events: &[SearchEvent]) -> Vec<Position> {
    events
        .iter()
        .flat_map(|event| match event {
            SearchEvent::VisitedBatch { nodes } => nodes.clone(),
            _ => Vec::new(),
        })
        .collect()
}

#[test]
fn bfs_detours_around_a_wall() {
    let mut grid = Grid::new(5);
    for x in 1..4 {
        grid.set(Position::new(x, 2), CellType::Obstacle);
    }
    let (start, end) = (Position::new(0, 0), Position::new(4, 4));
    let events = run(&grid, start, end, Algorithm::Bfs, Weather::Clear);

    let (path, cost) = found_path(&events).expect("a path exists");
    assert_eq!(path.len(), 9);
    assert_eq!(cost, 8);
    assert_eq!(path.first(), Some(&start));
    assert_eq!(path.last(), Some(&end));
    assert!(visited(&events).len() < 25);
    assert_eq!(events.last(), Some(&SearchEvent::Complete));
}

#[test]
fn astar_cost_follows_weather() {
    let grid = Grid::new(3);
    let (start, end) = (Position::new(0, 0), Position::new(2, 2));

    let clear = run(&grid, start, end, Algorithm::AStar, Weather::Clear);
    let (path, cost) = found_path(&clear).unwrap();
    assert_eq!(path.len() - 1, 4);
    assert_eq!(cost, 4);

    let rain = run(&grid, start, end, Algorithm::AStar, Weather::Rain);
    assert_eq!(found_path(&rain).unwrap().1, 12);

    let snow = run(&grid, start, end, Algorithm::AStar, Weather::Snow);
    assert_eq!(found_path(&snow).unwrap().1, 20);
}

#[test]
fn same_start_and_end_is_rejected() {
    let grid = Grid::new(4);
    let pos = Position::new(1, 1);
    for algorithm in Algorithm::ALL {
        assert!(matches!(
            solve(&grid, Some(pos), Some(pos), algorithm, Weather::Clear),
            Err(SolveError::SameEndpoints(p)) if p == pos
        ));
    }
}

#[test]
fn blocked_end_is_rejected() {
    let mut grid = Grid::new(4);
    let end = Position::new(3, 3);
    grid.set(end, CellType::Obstacle);
    for algorithm in Algorithm::ALL {
        let err = solve(&grid, Some(Position::new(0, 0)), Some(end), algorithm, Weather::Clear)
            .err()
            .expect("rejected");
        assert!(matches!(
            err,
            SolveError::NotTraversable {
                cell: CellType::Obstacle,
                ..
            }
        ));
    }
}

#[test]
fn concurrent_sessions_match_solo_runs() {
    let grid = Grid::parse(
        "
        S....#....
        .###.#.##.
        .#...#..#.
        .#.###.##.
        ...#......
        ##.#.####.
        ...#....#.
        .#####..#.
        .......##G
        ",
    )
    .unwrap();
    let (start, end) = (Position::new(0, 0), Position::new(9, 8));
    let algorithms = [Algorithm::Bfs, Algorithm::Dfs, Algorithm::AStar];

    let mut registry = SessionRegistry::with_algorithms(EngineConfig::default(), &algorithms).unwrap();
    let streams = registry
        .run_all(&grid, Some(start), Some(end), Weather::Rain)
        .unwrap();
    let handles: Vec<_> = streams
        .into_iter()
        .map(|(id, stream)| std::thread::spawn(move || (id, stream.collect::<Vec<_>>())))
        .collect();

    for (handle, algorithm) in handles.into_iter().zip(algorithms) {
        let (id, together) = handle.join().unwrap();
        assert_eq!(registry.algorithm(id).unwrap(), algorithm);

        let alone = run(&grid, start, end, algorithm, Weather::Rain);
        assert_eq!(together, alone, "{algorithm} diverged when run alongside others");
    }
}
