use ndarray::Array3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;

use super::{select_action, NodeTrainer, TrainOutcome};
use crate::config::TrainingConfig;
use crate::error::{MazeError, Result};
use crate::maze::{Maze, StartStatsMap};
use crate::metrics::MetricsTracker;
use crate::parallel::barrier_round;
use crate::qtable::QTable;
use crate::types::{Position, Region, ACTION_COUNT};

/// How agent tables are combined at a synchronisation point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Aggregation {
    /// Plain mean over agents
    Equal,
    /// Per state-action weights `(1 - α)^(-n)`, n = visits since the last sync
    Importance,
}

/// One federated participant
struct Participant {
    table: QTable,
    visits: Array3<u32>,
    pos: Position,
    rng: StdRng,
    block_reward: f64,
    block_steps: usize,
    block_arrivals: usize,
}

impl Participant {
    fn new(table: QTable, pos: Position, rng: StdRng) -> Self {
        let visits = Array3::zeros(table.as_array().dim());
        Participant {
            table,
            visits,
            pos,
            rng,
            block_reward: 0.0,
            block_steps: 0,
            block_arrivals: 0,
        }
    }

    /// Runs `steps` local TD updates continuing from the current position.
    fn run_block(
        &mut self,
        maze: &Maze,
        region: &Region,
        steps: usize,
        config: &TrainingConfig,
        start_stats: &Mutex<StartStatsMap>,
    ) -> Result<()> {
        self.block_reward = 0.0;
        self.block_steps = 0;
        self.block_arrivals = 0;

        for step in 0..steps {
            let state = self.pos;
            let Some(action) =
                select_action(&self.table, region, state, config.federated_epsilon, &mut self.rng)?
            else {
                log::warn!("no valid action at {:?} in {}, agent idles", state, region);
                break;
            };
            let (next_state, reward) = maze.perform_action(state, action)?;
            self.table.td_update(
                state,
                action,
                reward,
                next_state,
                config.learning_rate,
                config.discount_factor,
            )?;
            if let Some((r, c)) = region.local(state) {
                self.visits[[r, c, action.index()]] += 1;
            }

            let arrived = maze.is_station(next_state);
            if step == 0 {
                start_stats
                    .lock()
                    .map_err(|_| MazeError::ThreadPool("start statistics lock poisoned".to_string()))?
                    .entry(state)
                    .or_default()
                    .record(arrived);
            }

            self.block_reward += reward;
            self.block_steps += 1;
            if arrived {
                self.block_arrivals += 1;
            }
            self.pos = next_state;
        }
        Ok(())
    }
}

/// Federated Q-learning: K agents, synchronised every τ steps.
pub struct FederatedTrainer {
    config: TrainingConfig,
    aggregation: Aggregation,
}

impl FederatedTrainer {
    pub fn new(config: TrainingConfig, aggregation: Aggregation) -> Self {
        FederatedTrainer { config, aggregation }
    }

    pub fn aggregation(&self) -> Aggregation {
        self.aggregation
    }

    /// Whether another round starting at step `t` fits the budget.
    ///
    /// Equal averaging only starts rounds that finish within the budget;
    /// importance averaging starts one whenever budget remains.
    fn continue_round(&self, t: usize, budget: usize) -> bool {
        match self.aggregation {
            Aggregation::Equal => t + self.config.sync_interval <= budget,
            Aggregation::Importance => t < budget,
        }
    }

    /// Combines agent tables into one.
    ///
    /// Every entry is a weighted mean computed incrementally, so agents that
    /// agree on a value reproduce it exactly.
    pub(crate) fn aggregate(&self, region: Region, members: &[(&QTable, &Array3<u32>)]) -> Result<QTable> {
        if members.is_empty() {
            return Err(MazeError::invalid_parameter("members", "nothing to aggregate"));
        }
        let mut out = QTable::new(region);
        let (h, w, _) = out.as_array().dim();
        let log_gain = -(1.0 - self.config.learning_rate).ln();
        let mut log_weights = vec![0.0; members.len()];

        for r in 0..h {
            for c in 0..w {
                for a in 0..ACTION_COUNT {
                    if self.aggregation == Aggregation::Importance {
                        for (lw, (_, visits)) in log_weights.iter_mut().zip(members) {
                            *lw = visits[[r, c, a]] as f64 * log_gain;
                        }
                        let max = log_weights.iter().copied().fold(f64::NEG_INFINITY, f64::max);
                        for lw in log_weights.iter_mut() {
                            *lw -= max;
                        }
                    }

                    let mut mean = 0.0;
                    let mut total = 0.0;
                    for (lw, (table, _)) in log_weights.iter().zip(members) {
                        let weight = lw.exp();
                        total += weight;
                        mean += weight / total * (table.as_array()[[r, c, a]] - mean);
                    }
                    out.as_array_mut()[[r, c, a]] = mean;
                }
            }
        }
        Ok(out)
    }
}

impl NodeTrainer for FederatedTrainer {
    fn name(&self) -> &'static str {
        match self.aggregation {
            Aggregation::Equal => "federated_equal",
            Aggregation::Importance => "federated_importance",
        }
    }

    fn train(&self, maze: &Maze, table: QTable, rng: &mut StdRng) -> Result<TrainOutcome> {
        let cfg = &self.config;
        let region = *table.region();
        let budget = cfg.step_budget(region.area());
        let start_stats = Mutex::new(StartStatsMap::new());

        let mut agents = Vec::with_capacity(cfg.agents);
        for _ in 0..cfg.agents {
            let pos = maze.sample_start(&region, 0, &StartStatsMap::new(), cfg, rng)?;
            agents.push(Participant::new(table.clone(), pos, StdRng::seed_from_u64(rng.gen())));
        }

        let mut global = table;
        let mut tracker = MetricsTracker::default();
        let mut t = 0;
        let mut rounds = 0;

        while self.continue_round(t, budget) {
            barrier_round(&mut agents, |_, agent| {
                agent.run_block(maze, &region, cfg.sync_interval, cfg, &start_stats)
            })?;

            let members: Vec<(&QTable, &Array3<u32>)> =
                agents.iter().map(|agent| (&agent.table, &agent.visits)).collect();
            let aggregate = self.aggregate(region, &members)?;
            tracker.record_q_delta(aggregate.max_abs_diff(&global)?);
            tracker.record_episode(
                agents.iter().map(|agent| agent.block_reward).sum(),
                agents.iter().map(|agent| agent.block_steps).sum(),
                agents.iter().any(|agent| agent.block_arrivals > 0),
            );
            tracker.record_epsilon(cfg.federated_epsilon);
            global = aggregate;

            rounds += 1;

            // draws counted from the start of the finished round
            let stats = start_stats
                .lock()
                .map_err(|_| MazeError::ThreadPool("start statistics lock poisoned".to_string()))?;
            for agent in agents.iter_mut() {
                agent.table.clone_from(&global);
                agent.visits.fill(0);
                agent.pos = maze.sample_start(&region, t, &stats, cfg, rng)?;
            }
            t += cfg.sync_interval;
        }

        log::debug!(
            "{}: {} rounds of {} agents ({} aggregation), budget {} steps",
            region,
            rounds,
            cfg.agents,
            self.name(),
            budget
        );

        Ok(TrainOutcome {
            table: global,
            episodes: rounds,
            converged: false,
            final_epsilon: cfg.federated_epsilon,
            metrics: tracker.into_metrics(),
        })
    }
}
