use ndarray::Array3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::agent::{select_action, trainer_for, Aggregation, FederatedTrainer, NodeTrainer, SingleAgentTrainer};
use crate::config::{TrainingConfig, TrainingMode};
use crate::maze::Maze;
use crate::qtable::QTable;
use crate::tree::PartitionTree;
use crate::types::{Action, Region};

fn three_by_three() -> Maze {
    Maze::from_rows(&["...", "...", "..C"]).unwrap()
}

fn random_table(region: Region, seed: u64) -> QTable {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut table = QTable::new(region);
    for pos in region.cells() {
        for action in Action::ALL {
            table.set(pos, action, rng.gen_range(-10.0..10.0)).unwrap();
        }
    }
    table
}

#[test]
fn test_select_action_stays_in_region() {
    let region = Region::new(0, 0, 1, 1);
    let table = QTable::new(region);
    let mut rng = StdRng::seed_from_u64(0);
    for _ in 0..100 {
        let action = select_action(&table, &region, (0, 0), 1.0, &mut rng).unwrap().unwrap();
        assert!(matches!(action, Action::East | Action::SouthEast | Action::South));
    }

    let single = Region::new(3, 3, 3, 3);
    assert_eq!(select_action(&QTable::new(single), &single, (3, 3), 0.5, &mut rng).unwrap(), None);
}

#[test]
fn test_select_action_greedy() {
    let region = Region::new(0, 0, 2, 2);
    let mut table = QTable::new(region);
    table.set((0, 0), Action::North, 50.0).unwrap();
    table.set((0, 0), Action::South, 5.0).unwrap();
    let mut rng = StdRng::seed_from_u64(0);
    // North leaves the region and is never considered
    let action = select_action(&table, &region, (0, 0), 0.0, &mut rng).unwrap();
    assert_eq!(action, Some(Action::South));
}

#[test]
fn test_single_agent_learns_trivial_grid() {
    let maze = three_by_three();
    let config = TrainingConfig {
        max_episodes: 3000,
        ..TrainingConfig::default()
    };
    let trainer = SingleAgentTrainer::new(config);
    let mut rng = StdRng::seed_from_u64(0);
    let outcome = trainer.train(&maze, QTable::new(maze.region()), &mut rng).unwrap();

    assert!(outcome.converged, "stopped at the cap after {} episodes", outcome.episodes);
    assert!(outcome.episodes > 500 && outcome.episodes < 3000);
    assert!(*outcome.metrics.q_deltas.back().unwrap() < 5e-4);
    assert!(outcome.final_epsilon < 1.0);
    assert!(!outcome.metrics.q_deltas.is_empty());

    let mut tree = PartitionTree::new(maze.clone(), 20).unwrap();
    tree.install_q_table(tree.root(), outcome.table).unwrap();
    for start in maze.passable_cells(&maze.region()) {
        let path = tree.greedy_path(start, 6).unwrap();
        assert!(path.is_some(), "greedy policy is stuck from {:?}", start);
        assert_eq!(path.unwrap().len() - 1, crate::astar::chebyshev(start, (2, 2)));
    }
}

#[test]
fn test_single_agent_respects_episode_cap() {
    let maze = three_by_three();
    let config = TrainingConfig {
        max_episodes: 40,
        ..TrainingConfig::default()
    };
    let trainer = SingleAgentTrainer::new(config);
    let mut rng = StdRng::seed_from_u64(1);
    let outcome = trainer.train(&maze, QTable::new(maze.region()), &mut rng).unwrap();
    assert_eq!(outcome.episodes, 40);
    assert!(!outcome.converged);
    assert_eq!(outcome.metrics.episode_rewards.len(), 40);
    assert!((outcome.final_epsilon - 0.999f64.powi(40)).abs() < 1e-12);
}

#[test]
fn test_single_agent_trains_sub_region_only() {
    let maze = Maze::from_rows(&["....", "....", "...C", "...."]).unwrap();
    let region = Region::new(2, 2, 3, 3);
    let config = TrainingConfig {
        max_episodes: 200,
        ..TrainingConfig::default()
    };
    let mut rng = StdRng::seed_from_u64(4);
    let outcome = SingleAgentTrainer::new(config)
        .train(&maze, QTable::new(region), &mut rng)
        .unwrap();
    assert_eq!(outcome.table.region(), &region);
    assert!(outcome.table.get((3, 2), Action::NorthEast).unwrap() > 0.0);
}

#[test]
fn test_equal_averaging_idempotent() {
    let region = Region::new(0, 0, 3, 4);
    let table = random_table(region, 99);
    let visits: Vec<Array3<u32>> = (0..12)
        .map(|k| Array3::from_elem((4, 5, 8), k as u32))
        .collect();
    let members: Vec<(&QTable, &Array3<u32>)> = visits.iter().map(|v| (&table, v)).collect();

    for aggregation in [Aggregation::Equal, Aggregation::Importance] {
        let trainer = FederatedTrainer::new(TrainingConfig::default(), aggregation);
        let aggregate = trainer.aggregate(region, &members).unwrap();
        assert_eq!(aggregate, table);
    }
}

#[test]
fn test_equal_averaging_mean() {
    let region = Region::new(0, 0, 1, 1);
    let a = random_table(region, 1);
    let b = random_table(region, 2);
    let visits = Array3::zeros((2, 2, 8));
    let trainer = FederatedTrainer::new(TrainingConfig::default(), Aggregation::Equal);
    let mean = trainer.aggregate(region, &[(&a, &visits), (&b, &visits)]).unwrap();
    for ((m, x), y) in mean.as_array().iter().zip(a.as_array()).zip(b.as_array()) {
        assert!((m - (x + y) / 2.0).abs() < 1e-12);
    }
}

#[test]
fn test_importance_weights_favour_visits() {
    let region = Region::new(0, 0, 0, 0);
    let mut a = QTable::new(region);
    let mut b = QTable::new(region);
    b.set((0, 0), Action::North, 1.0).unwrap();
    a.set((0, 0), Action::East, 1.0).unwrap();

    let mut visits_a = Array3::zeros((1, 1, 8));
    let mut visits_b = Array3::zeros((1, 1, 8));
    visits_b[[0, 0, Action::North.index()]] = 1;
    visits_a[[0, 0, Action::East.index()]] = 2000;

    let trainer = FederatedTrainer::new(TrainingConfig::default(), Aggregation::Importance);
    let merged = trainer.aggregate(region, &[(&a, &visits_a), (&b, &visits_b)]).unwrap();

    // weights 1 and 1/0.6 for North
    assert!((merged.get((0, 0), Action::North).unwrap() - 0.625).abs() < 1e-12);
    // an overwhelming visit count stays finite
    assert!((merged.get((0, 0), Action::East).unwrap() - 1.0).abs() < 1e-12);
    assert_eq!(merged.get((0, 0), Action::South).unwrap(), 0.0);
}

#[test]
fn test_federated_round_counts() {
    let maze = three_by_three();
    let config = TrainingConfig {
        agents: 4,
        sync_interval: 400,
        ..TrainingConfig::default()
    };
    // budget = 9 cells * 200 = 1800 steps
    let cases = [(Aggregation::Equal, 4), (Aggregation::Importance, 5)];
    for (aggregation, rounds) in cases {
        let trainer = FederatedTrainer::new(config.clone(), aggregation);
        let mut rng = StdRng::seed_from_u64(8);
        let outcome = trainer.train(&maze, QTable::new(maze.region()), &mut rng).unwrap();
        assert_eq!(outcome.episodes, rounds);
        assert_eq!(outcome.metrics.q_deltas.len(), rounds);
        assert!(outcome.table.max_value((1, 1)).unwrap() > 0.0);
    }
}

#[test]
fn test_federated_without_rounds_keeps_table() {
    let maze = three_by_three();
    let config = TrainingConfig {
        sync_interval: 5000,
        ..TrainingConfig::default()
    };
    let table = random_table(maze.region(), 3);
    let trainer = FederatedTrainer::new(config, Aggregation::Equal);
    let mut rng = StdRng::seed_from_u64(2);
    let outcome = trainer.train(&maze, table.clone(), &mut rng).unwrap();
    assert_eq!(outcome.episodes, 0);
    assert_eq!(outcome.table, table);
}

#[test]
fn test_federated_is_reproducible() {
    let maze = three_by_three();
    let config = TrainingConfig {
        agents: 6,
        sync_interval: 300,
        ..TrainingConfig::default()
    };
    let trainer = FederatedTrainer::new(config, Aggregation::Importance);
    let a = trainer
        .train(&maze, QTable::new(maze.region()), &mut StdRng::seed_from_u64(5))
        .unwrap();
    let b = trainer
        .train(&maze, QTable::new(maze.region()), &mut StdRng::seed_from_u64(5))
        .unwrap();
    assert_eq!(a.table, b.table);
}

#[test]
fn test_first_resample_is_uniform() {
    // budget 9 * 20 = 180 steps: two rounds of 90, so only the resample
    // after the first round shapes the returned table
    let maze = three_by_three();
    let base = TrainingConfig {
        agents: 3,
        sync_interval: 90,
        steps_per_cell: 20,
        ..TrainingConfig::default()
    };
    let weighted_after_first = TrainingConfig {
        uniform_start_samples: 90,
        ..base.clone()
    };
    let always_uniform = TrainingConfig {
        uniform_start_samples: 1_000_000,
        ..base
    };

    let mut tables = Vec::new();
    for config in [weighted_after_first, always_uniform] {
        let trainer = FederatedTrainer::new(config, Aggregation::Equal);
        let outcome = trainer
            .train(&maze, QTable::new(maze.region()), &mut StdRng::seed_from_u64(12))
            .unwrap();
        assert_eq!(outcome.episodes, 2);
        tables.push(outcome.table);
    }
    assert_eq!(tables[0], tables[1]);
}

#[test]
fn test_trainer_for_modes() {
    let config = TrainingConfig::default();
    assert_eq!(trainer_for(TrainingMode::SingleAgent, &config).name(), "single_agent");
    assert_eq!(trainer_for(TrainingMode::FederatedEqual, &config).name(), "federated_equal");
    assert_eq!(
        trainer_for(TrainingMode::FederatedImportance, &config).name(),
        "federated_importance"
    );
}
