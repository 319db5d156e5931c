use crate::config::TrainingConfig;
use crate::error::Result;

/// Builder for [`TrainingConfig`]; unset fields keep their defaults and
/// `build` validates the result.
pub struct TrainingConfigBuilder {
    config: TrainingConfig,
}

impl TrainingConfigBuilder {
    pub fn new() -> Self {
        TrainingConfigBuilder {
            config: TrainingConfig::default(),
        }
    }

    /// Set learning rate α and discount γ
    pub fn learning(mut self, learning_rate: f64, discount_factor: f64) -> Self {
        self.config.learning_rate = learning_rate;
        self.config.discount_factor = discount_factor;
        self
    }

    /// Set the single-agent exploration schedule
    pub fn exploration(mut self, start: f64, decay: f64, min: f64) -> Self {
        self.config.epsilon_start = start;
        self.config.epsilon_decay = decay;
        self.config.epsilon_min = min;
        self
    }

    pub fn max_episodes(mut self, episodes: usize) -> Self {
        self.config.max_episodes = episodes;
        self
    }

    pub fn min_episodes(mut self, episodes: usize) -> Self {
        self.config.min_episodes = episodes;
        self
    }

    /// Set check interval, threshold on max |ΔQ| and number of quiet checks
    pub fn convergence(mut self, interval: usize, threshold: f64, patience: usize) -> Self {
        self.config.convergence_interval = interval;
        self.config.convergence_threshold = threshold;
        self.config.patience = patience;
        self
    }

    pub fn replay(mut self, capacity: usize, batch_size: usize) -> Self {
        self.config.replay_capacity = capacity;
        self.config.replay_batch_size = batch_size;
        self
    }

    /// Set K agents, sync interval τ and the per-cell step budget factor
    pub fn federated(mut self, agents: usize, sync_interval: usize, steps_per_cell: usize) -> Self {
        self.config.agents = agents;
        self.config.sync_interval = sync_interval;
        self.config.steps_per_cell = steps_per_cell;
        self
    }

    pub fn federated_epsilon(mut self, epsilon: f64) -> Self {
        self.config.federated_epsilon = epsilon;
        self
    }

    pub fn leaf_size(mut self, leaf_size: usize) -> Self {
        self.config.leaf_size = leaf_size;
        self
    }

    pub fn retraining(mut self, success_threshold: f64, retrain_delta: f64) -> Self {
        self.config.success_threshold = success_threshold;
        self.config.retrain_delta = retrain_delta;
        self
    }

    pub fn chunk_size(mut self, chunk_size: usize) -> Self {
        self.config.chunk_size = chunk_size;
        self
    }

    pub fn parallel_nodes(mut self, parallel: bool) -> Self {
        self.config.parallel_nodes = parallel;
        self
    }

    pub fn worker_threads(mut self, threads: usize) -> Self {
        self.config.worker_threads = Some(threads);
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.config.seed = Some(seed);
        self
    }

    pub fn build(self) -> Result<TrainingConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

impl Default for TrainingConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
