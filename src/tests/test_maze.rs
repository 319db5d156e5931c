use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::config::TrainingConfig;
use crate::error::MazeError;
use crate::maze::{CellProbabilities, Maze, StartStats, StartStatsMap, REWARD_BLOCKED, REWARD_GOAL, REWARD_STEP};
use crate::types::{Action, CellKind, Region};

fn five_by_five() -> Maze {
    Maze::from_rows(&[".....", ".....", "..#..", ".....", "....C"]).unwrap()
}

#[test]
fn test_reward_scenario() {
    let maze = five_by_five();

    assert_eq!(maze.perform_action((3, 4), Action::South).unwrap(), ((4, 4), REWARD_GOAL));
    assert_eq!(maze.perform_action((0, 0), Action::North).unwrap(), ((0, 0), REWARD_BLOCKED));
    assert_eq!(maze.perform_action((0, 0), Action::East).unwrap(), ((0, 1), REWARD_STEP));
    assert_eq!(maze.perform_action((3, 3), Action::SouthEast).unwrap(), ((4, 4), REWARD_GOAL));
}

#[test]
fn test_obstacle_rejects_move() {
    let maze = five_by_five();
    assert_eq!(maze.perform_action((1, 1), Action::SouthEast).unwrap(), ((1, 1), REWARD_BLOCKED));
    assert_eq!(maze.perform_action((2, 3), Action::West).unwrap(), ((2, 3), REWARD_BLOCKED));
}

#[test]
fn test_rejected_move_on_station_still_pays_goal() {
    let maze = five_by_five();
    assert_eq!(maze.perform_action((4, 4), Action::South).unwrap(), ((4, 4), REWARD_GOAL));
}

#[test]
fn test_perform_action_out_of_bounds_start() {
    let maze = five_by_five();
    let err = maze.perform_action((5, 0), Action::North).unwrap_err();
    assert!(matches!(err, MazeError::OutOfBounds { row: 5, col: 0, .. }));
}

#[test]
fn test_get_and_set() {
    let mut maze = five_by_five();
    assert_eq!(maze.get((2, 2)).unwrap(), CellKind::Obstacle);
    maze.set((2, 2), CellKind::Free).unwrap();
    assert_eq!(maze.get((2, 2)).unwrap(), CellKind::Free);
    assert!(maze.get((0, 9)).is_err());
}

#[test]
fn test_set_code_rejects_unknown_kind() {
    let mut maze = five_by_five();
    assert_eq!(maze.set_code((0, 0), 7), Err(MazeError::InvalidCellKind(7)));
    maze.set_code((0, 0), 0).unwrap();
    assert_eq!(maze.get((0, 0)).unwrap(), CellKind::Obstacle);
}

#[test]
fn test_last_station_cannot_be_removed() {
    let mut maze = five_by_five();
    assert!(maze.set((4, 4), CellKind::Free).is_err());
    maze.set((0, 0), CellKind::ChargingStation).unwrap();
    maze.set((4, 4), CellKind::Free).unwrap();
    assert_eq!(maze.station_count(&maze.region()), 1);
}

#[test]
fn test_from_rows_requires_station() {
    assert!(Maze::from_rows(&["...", "..."]).is_err());
    assert!(Maze::from_rows(&["..C", ".."]).is_err());
    assert_eq!(Maze::from_rows(&["..X"]).unwrap_err(), MazeError::InvalidCellKind('X' as i32));
}

#[test]
fn test_generate_rejects_bad_probabilities() {
    let mut rng = StdRng::seed_from_u64(0);
    let err = Maze::generate(5, 5, CellProbabilities::new(0.5, 0.3, 0.3), &mut rng).unwrap_err();
    assert!(matches!(err, MazeError::InvalidProbabilities { .. }));
}

#[test]
fn test_generate_forces_station() {
    let mut rng = StdRng::seed_from_u64(3);
    let maze = Maze::generate(8, 6, CellProbabilities::new(1.0, 0.0, 0.0), &mut rng).unwrap();
    assert_eq!(maze.dims(), (8, 6));
    assert_eq!(maze.station_count(&maze.region()), 1);
    assert!(maze.obstacle_positions().is_empty());
}

#[test]
fn test_generate_is_reproducible() {
    let probabilities = CellProbabilities::new(0.7, 0.2, 0.1);
    let a = Maze::generate(12, 12, probabilities, &mut StdRng::seed_from_u64(11)).unwrap();
    let b = Maze::generate(12, 12, probabilities, &mut StdRng::seed_from_u64(11)).unwrap();
    assert_eq!(a, b);
}

#[test]
fn test_display() {
    let maze = Maze::from_rows(&[".#", "C."]).unwrap();
    assert_eq!(maze.to_string(), ".#\nC.\n");
}

#[test]
fn test_sample_start_stays_in_region() {
    let maze = five_by_five();
    let config = TrainingConfig::default();
    let region = Region::new(1, 1, 3, 3);
    let mut rng = StdRng::seed_from_u64(5);

    let mut stats = StartStatsMap::new();
    stats.insert((1, 1), StartStats::new());
    stats.get_mut(&(1, 1)).unwrap().record(true);

    for draws in 0..50 {
        let pos = maze.sample_start(&region, draws, &stats, &config, &mut rng).unwrap();
        assert!(region.contains(pos));
        assert!(maze.is_passable(pos));
    }
}

#[test]
fn test_sample_start_prefers_failing_cells() {
    let maze = Maze::from_rows(&["..C"]).unwrap();
    let config = TrainingConfig::default();
    let region = Region::new(0, 0, 0, 1);
    let mut stats = StartStatsMap::new();
    for _ in 0..10 {
        stats.entry((0, 0)).or_default().record(true);
        stats.entry((0, 1)).or_default().record(false);
    }

    let mut rng = StdRng::seed_from_u64(9);
    let picks = (0..2000)
        .map(|_| maze.sample_start(&region, 100, &stats, &config, &mut rng).unwrap())
        .filter(|&pos| pos == (0, 1))
        .count();
    // weights 0.1 vs 1.1
    assert!(picks > 1600, "failing cell drawn {} times", picks);
}

#[test]
fn test_sample_start_blocked_region() {
    let maze = Maze::from_rows(&["##", ".C"]).unwrap();
    let config = TrainingConfig::default();
    let mut rng = StdRng::seed_from_u64(1);
    let err = maze
        .sample_start(&Region::new(0, 0, 0, 1), 0, &StartStatsMap::new(), &config, &mut rng)
        .unwrap_err();
    assert!(matches!(err, MazeError::NoStartCell { .. }));
}

#[test]
fn test_start_stats_rate() {
    let mut stats = StartStats::new();
    assert_eq!(stats.success_rate(), 0.0);
    stats.record(true);
    stats.record(false);
    stats.increment_attempts();
    assert_eq!(stats.attempts(), 3);
    assert_eq!(stats.successes(), 1);
    assert!((stats.success_rate() - 1.0 / 3.0).abs() < 1e-12);
}
