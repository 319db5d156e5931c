use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use super::statistics::{RunningStats, Statistics};

/// Bounded history of one trainer invocation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainingMetrics {
    /// Return of each episode (or federated round)
    pub episode_rewards: VecDeque<f64>,

    /// Steps taken in each episode
    pub episode_lengths: VecDeque<usize>,

    /// Exploration rate after each episode
    pub epsilons: VecDeque<f64>,

    /// Max |ΔQ| measured at each convergence check or sync
    pub q_deltas: VecDeque<f64>,
}

impl TrainingMetrics {
    pub fn new(history_size: usize) -> Self {
        TrainingMetrics {
            episode_rewards: VecDeque::with_capacity(history_size),
            episode_lengths: VecDeque::with_capacity(history_size),
            epsilons: VecDeque::with_capacity(history_size),
            q_deltas: VecDeque::with_capacity(history_size),
        }
    }
}

fn push_bounded<T>(queue: &mut VecDeque<T>, value: T, limit: usize) {
    if limit == 0 {
        return;
    }
    if queue.len() >= limit {
        queue.pop_front();
    }
    queue.push_back(value);
}

/// Tracks metrics during training
#[derive(Debug, Clone)]
pub struct MetricsTracker {
    metrics: TrainingMetrics,
    history_size: usize,

    current_episode_reward: f64,
    current_episode_length: usize,
    episode_count: usize,
    success_count: usize,
    total_steps: usize,
    reward_stats: RunningStats,
}

impl MetricsTracker {
    pub fn new(history_size: usize) -> Self {
        MetricsTracker {
            metrics: TrainingMetrics::new(history_size),
            history_size,
            current_episode_reward: 0.0,
            current_episode_length: 0,
            episode_count: 0,
            success_count: 0,
            total_steps: 0,
            reward_stats: RunningStats::new(),
        }
    }

    pub fn record_epsilon(&mut self, epsilon: f64) {
        push_bounded(&mut self.metrics.epsilons, epsilon, self.history_size);
    }

    pub fn record_q_delta(&mut self, delta: f64) {
        push_bounded(&mut self.metrics.q_deltas, delta, self.history_size);
    }

    pub fn start_episode(&mut self) {
        self.current_episode_reward = 0.0;
        self.current_episode_length = 0;
    }

    /// Record a step within an episode
    pub fn step(&mut self, reward: f64) {
        self.current_episode_reward += reward;
        self.current_episode_length += 1;
        self.total_steps += 1;
    }

    pub fn end_episode(&mut self, reached_station: bool) {
        push_bounded(
            &mut self.metrics.episode_rewards,
            self.current_episode_reward,
            self.history_size,
        );
        push_bounded(
            &mut self.metrics.episode_lengths,
            self.current_episode_length,
            self.history_size,
        );
        self.reward_stats.update(self.current_episode_reward);
        self.episode_count += 1;
        if reached_station {
            self.success_count += 1;
        }
    }

    /// Records a whole episode at once (used for federated rounds)
    pub fn record_episode(&mut self, reward: f64, length: usize, reached_station: bool) {
        self.current_episode_reward = reward;
        self.current_episode_length = length;
        self.total_steps += length;
        self.end_episode(reached_station);
    }

    pub fn metrics(&self) -> &TrainingMetrics {
        &self.metrics
    }

    pub fn episode_count(&self) -> usize {
        self.episode_count
    }

    pub fn success_count(&self) -> usize {
        self.success_count
    }

    pub fn total_steps(&self) -> usize {
        self.total_steps
    }

    /// Statistics over every episode return, not just the retained history
    pub fn reward_statistics(&self) -> Statistics {
        self.reward_stats.to_statistics()
    }

    /// Mean return over the last `window` episodes
    pub fn avg_episode_reward(&self, window: usize) -> Option<f64> {
        if self.metrics.episode_rewards.is_empty() || window == 0 {
            return None;
        }
        let n = window.min(self.metrics.episode_rewards.len());
        let sum: f64 = self.metrics.episode_rewards.iter().rev().take(n).sum();
        Some(sum / n as f64)
    }

    pub fn last_q_delta(&self) -> Option<f64> {
        self.metrics.q_deltas.back().copied()
    }

    pub fn into_metrics(self) -> TrainingMetrics {
        self.metrics
    }
}

impl Default for MetricsTracker {
    fn default() -> Self {
        Self::new(1000)
    }
}
