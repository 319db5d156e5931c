//! Configuration for training, evaluation and adaptation.
//!
//! Every tunable that used to be a hard-coded constant lives in
//! [`TrainingConfig`]. `Default` reproduces the reference values:
//! 8 actions, learning rate 0.4, discount 0.9, 10000 episodes, 20x20 leaves,
//! retraining below 0.9 success or after a drop of more than 0.01.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{MazeError, Result};

/// Which trainer the controller dispatches a node to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrainingMode {
    /// One agent with experience replay until convergence
    SingleAgent,
    /// Federated Q-learning, every agent weighted 1/K
    FederatedEqual,
    /// Federated Q-learning, weights grow with local visit counts
    FederatedImportance,
}

impl TrainingMode {
    pub fn name(self) -> &'static str {
        match self {
            TrainingMode::SingleAgent => "single_agent",
            TrainingMode::FederatedEqual => "federated_equal",
            TrainingMode::FederatedImportance => "federated_importance",
        }
    }
}

/// Configuration for the training engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    // --- Temporal-difference update ---
    /// Step size α.
    pub learning_rate: f64,
    /// Discount factor γ.
    pub discount_factor: f64,

    // --- Exploration ---
    /// Initial ε for the single-agent trainer.
    pub epsilon_start: f64,
    /// Multiplicative ε decay applied after each episode.
    pub epsilon_decay: f64,
    /// Lower bound for ε.
    pub epsilon_min: f64,
    /// Fixed ε used by every federated agent.
    pub federated_epsilon: f64,

    // --- Single-agent episodes and convergence ---
    /// Hard episode ceiling.
    pub max_episodes: usize,
    /// Episodes before the first convergence check and before replay starts.
    pub min_episodes: usize,
    /// Episodes between convergence checks.
    pub convergence_interval: usize,
    /// Max |ΔQ| below which a check counts as stable.
    pub convergence_threshold: f64,
    /// Consecutive stable checks required before stopping.
    pub patience: usize,

    // --- Experience replay ---
    pub replay_capacity: usize,
    pub replay_batch_size: usize,

    // --- Start sampling ---
    /// Draws before success-weighted sampling kicks in.
    pub uniform_start_samples: usize,
    /// Added to `1 - success_rate` so every cell keeps a non-zero weight.
    pub start_weight_epsilon: f64,

    // --- Federated ---
    /// Agents per node (K).
    pub agents: usize,
    /// Local steps between synchronisations (τ).
    pub sync_interval: usize,
    /// Step budget per region cell; T = area × this.
    pub steps_per_cell: usize,

    // --- Partitioning ---
    /// Regions at most this many rows and cols are leaves.
    pub leaf_size: usize,

    // --- Adaptation ---
    /// Success rate below which a node is retrained and its parent escalated.
    pub success_threshold: f64,
    /// Drop from baseline that triggers retraining.
    pub retrain_delta: f64,
    /// Branching factor of the policy BFS.
    pub policy_branching: usize,

    // --- Execution ---
    /// Cells per evaluation task.
    pub chunk_size: usize,
    /// Train the nodes of a batch concurrently.
    pub parallel_nodes: bool,
    /// Worker threads; `None` lets rayon pick.
    pub worker_threads: Option<usize>,
    /// Seed for every random source; `None` seeds from entropy.
    pub seed: Option<u64>,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            learning_rate: 0.4,
            discount_factor: 0.9,
            epsilon_start: 1.0,
            epsilon_decay: 0.999,
            epsilon_min: 0.01,
            federated_epsilon: 1.0,
            max_episodes: 10_000,
            min_episodes: 500,
            convergence_interval: 50,
            convergence_threshold: 5e-4,
            patience: 20,
            replay_capacity: 1000,
            replay_batch_size: 64,
            uniform_start_samples: 10,
            start_weight_epsilon: 0.1,
            agents: 12,
            sync_interval: 1000,
            steps_per_cell: 200,
            leaf_size: 20,
            success_threshold: 0.9,
            retrain_delta: 0.01,
            policy_branching: 2,
            chunk_size: 100,
            parallel_nodes: true,
            worker_threads: None,
            seed: None,
        }
    }
}

impl TrainingConfig {
    /// Parse a JSON document; missing fields fall back to defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: TrainingConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Total federated step budget for a region of `area` cells
    pub fn step_budget(&self, area: usize) -> usize {
        area * self.steps_per_cell
    }

    pub fn validate(&self) -> Result<()> {
        fn unit(name: &str, value: f64) -> Result<()> {
            if !(0.0..=1.0).contains(&value) {
                return Err(MazeError::invalid_parameter(name, "must lie in [0, 1]"));
            }
            Ok(())
        }
        fn positive(name: &str, value: usize) -> Result<()> {
            if value == 0 {
                return Err(MazeError::invalid_parameter(name, "must be greater than 0"));
            }
            Ok(())
        }

        if !(self.learning_rate > 0.0 && self.learning_rate < 1.0) {
            return Err(MazeError::invalid_parameter("learning_rate", "must lie in (0, 1)"));
        }
        unit("discount_factor", self.discount_factor)?;
        unit("epsilon_start", self.epsilon_start)?;
        unit("epsilon_decay", self.epsilon_decay)?;
        unit("epsilon_min", self.epsilon_min)?;
        unit("federated_epsilon", self.federated_epsilon)?;
        unit("success_threshold", self.success_threshold)?;
        positive("convergence_interval", self.convergence_interval)?;
        positive("replay_capacity", self.replay_capacity)?;
        positive("agents", self.agents)?;
        positive("sync_interval", self.sync_interval)?;
        positive("leaf_size", self.leaf_size)?;
        positive("policy_branching", self.policy_branching)?;
        positive("chunk_size", self.chunk_size)?;
        if self.worker_threads == Some(0) {
            return Err(MazeError::invalid_parameter("worker_threads", "must be greater than 0"));
        }
        Ok(())
    }
}
