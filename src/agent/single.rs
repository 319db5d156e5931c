use rand::rngs::StdRng;

use super::{select_action, NodeTrainer, TrainOutcome};
use crate::config::TrainingConfig;
use crate::error::Result;
use crate::maze::{Maze, StartStatsMap};
use crate::metrics::MetricsTracker;
use crate::qtable::QTable;
use crate::replay_buffer::{Experience, ReplayBuffer};

/// Episodic Q-learning with experience replay.
///
/// Each episode starts from a sampled cell of the region and lasts until a
/// station is reached or `height + width` steps were taken. Training stops
/// once the table has stopped moving for `patience` consecutive checks, or
/// after `max_episodes`.
pub struct SingleAgentTrainer {
    config: TrainingConfig,
}

impl SingleAgentTrainer {
    pub fn new(config: TrainingConfig) -> Self {
        SingleAgentTrainer { config }
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }
}

impl NodeTrainer for SingleAgentTrainer {
    fn name(&self) -> &'static str {
        "single_agent"
    }

    fn train(&self, maze: &Maze, mut table: QTable, rng: &mut StdRng) -> Result<TrainOutcome> {
        let cfg = &self.config;
        let region = *table.region();
        let max_steps = region.height() + region.width();

        let mut buffer = ReplayBuffer::new(cfg.replay_capacity);
        let mut stats = StartStatsMap::new();
        let mut tracker = MetricsTracker::default();
        let mut snapshot = table.clone();
        let mut epsilon = cfg.epsilon_start;
        let mut stable_checks = 0;
        let mut converged = false;
        let mut episode = 0;

        while episode < cfg.max_episodes {
            let start = maze.sample_start(&region, episode, &stats, cfg, rng)?;
            let mut state = start;
            let mut arrived = false;
            let mut step = 1;
            tracker.start_episode();

            while !arrived && step < max_steps {
                let Some(action) = select_action(&table, &region, state, epsilon, rng)? else {
                    log::warn!("no valid action at {:?} in {}, ending episode", state, region);
                    break;
                };
                let (next_state, reward) = maze.perform_action(state, action)?;
                buffer.add(Experience {
                    state,
                    action,
                    reward,
                    next_state,
                });
                table.td_update(
                    state,
                    action,
                    reward,
                    next_state,
                    cfg.learning_rate,
                    cfg.discount_factor,
                )?;

                if buffer.len() >= cfg.replay_batch_size && episode > cfg.min_episodes {
                    for exp in buffer.sample_with_replacement(cfg.replay_batch_size, rng) {
                        table.td_update(
                            exp.state,
                            exp.action,
                            exp.reward,
                            exp.next_state,
                            cfg.learning_rate,
                            cfg.discount_factor,
                        )?;
                    }
                }

                tracker.step(reward);
                arrived = maze.is_station(next_state);
                state = next_state;
                step += 1;
            }

            stats.entry(start).or_default().record(arrived);
            tracker.end_episode(arrived);
            epsilon = (epsilon * cfg.epsilon_decay).max(cfg.epsilon_min);
            tracker.record_epsilon(epsilon);

            if episode % cfg.convergence_interval == 0 && episode >= cfg.min_episodes {
                let delta = table.max_abs_diff(&snapshot)?;
                tracker.record_q_delta(delta);
                if delta < cfg.convergence_threshold {
                    if stable_checks >= cfg.patience {
                        converged = true;
                    } else {
                        stable_checks += 1;
                    }
                } else {
                    stable_checks = 0;
                }
                snapshot = table.clone();
            }

            episode += 1;
            if converged {
                log::debug!("{}: converged after {} episodes", region, episode);
                break;
            }
        }

        if !converged {
            log::debug!("{}: stopped at episode cap {}", region, episode);
        }
        let returns = tracker.reward_statistics();
        log::debug!(
            "{}: mean return {:.2} (std {:.2}), {} of {} episodes reached a station",
            region,
            returns.mean,
            returns.std,
            tracker.success_count(),
            tracker.episode_count()
        );

        Ok(TrainOutcome {
            table,
            episodes: episode,
            converged,
            final_epsilon: epsilon,
            metrics: tracker.into_metrics(),
        })
    }
}
