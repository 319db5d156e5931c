//! # Partition trainers
//!
//! Tabular Q-learning over the region of one partition node. Two trainers
//! implement [`NodeTrainer`]:
//!
//! - [`SingleAgentTrainer`]: one agent, decaying epsilon-greedy exploration,
//!   experience replay and a convergence check on the change of the table.
//! - [`FederatedTrainer`]: K agents explore concurrently on private copies
//!   of the table and are averaged every τ steps, either with equal weights
//!   or weighted by how often each agent visited a state-action pair.
//!
//! Agents only choose moves that keep them inside the node's region; moves
//! into obstacles are still allowed and are rejected by the maze.
//!
//! ## Example
//!
//! ```rust
//! use mazeq::agent::{NodeTrainer, SingleAgentTrainer};
//! use mazeq::config::TrainingConfig;
//! use mazeq::maze::Maze;
//! use mazeq::qtable::QTable;
//! use rand::{rngs::StdRng, SeedableRng};
//!
//! let maze = Maze::from_rows(&["...", "...", "..C"]).unwrap();
//! let config = TrainingConfig { max_episodes: 200, ..TrainingConfig::default() };
//! let trainer = SingleAgentTrainer::new(config);
//! let mut rng = StdRng::seed_from_u64(7);
//! let outcome = trainer.train(&maze, QTable::new(maze.region()), &mut rng).unwrap();
//! assert!(outcome.episodes > 0);
//! ```

pub mod traits;

mod federated;
mod single;

pub use federated::{Aggregation, FederatedTrainer};
pub use single::SingleAgentTrainer;
pub use traits::NodeTrainer;

use rand::seq::SliceRandom;
use rand::Rng;

use crate::config::{TrainingConfig, TrainingMode};
use crate::error::Result;
use crate::metrics::TrainingMetrics;
use crate::qtable::QTable;
use crate::types::{Action, Position, Region};

/// Result of training one node
#[derive(Debug, Clone)]
pub struct TrainOutcome {
    /// The trained table, same region as the input
    pub table: QTable,
    /// Episodes (single agent) or synchronisation rounds (federated) run
    pub episodes: usize,
    pub converged: bool,
    pub final_epsilon: f64,
    pub metrics: TrainingMetrics,
}

/// Epsilon-greedy choice among the moves that stay inside `region`.
///
/// Returns `None` when no such move exists (a 1x1 region).
pub(crate) fn select_action<R: Rng + ?Sized>(
    table: &QTable,
    region: &Region,
    pos: Position,
    epsilon: f64,
    rng: &mut R,
) -> Result<Option<Action>> {
    let valid = region.valid_actions(pos);
    if valid.is_empty() {
        return Ok(None);
    }
    if rng.gen::<f64>() < epsilon {
        return Ok(valid.choose(rng).copied());
    }
    table.best_action(pos, &valid)
}

/// Trainer for `mode`
pub fn trainer_for(mode: TrainingMode, config: &TrainingConfig) -> Box<dyn NodeTrainer> {
    match mode {
        TrainingMode::SingleAgent => Box::new(SingleAgentTrainer::new(config.clone())),
        TrainingMode::FederatedEqual => {
            Box::new(FederatedTrainer::new(config.clone(), Aggregation::Equal))
        }
        TrainingMode::FederatedImportance => {
            Box::new(FederatedTrainer::new(config.clone(), Aggregation::Importance))
        }
    }
}
