//! Training and evaluation metrics.
//!
//! [`EvaluationReport`] is the common result of scoring either the A*
//! baseline or a learned policy over every non-obstacle cell; it carries the
//! scalars handed to reporting (success rate, average successful path length,
//! average planning time). [`MetricsTracker`] keeps a bounded history of one
//! trainer invocation.

pub mod statistics;
pub mod tracker;

pub use statistics::{RunningStats, Statistics};
pub use tracker::{MetricsTracker, TrainingMetrics};

use serde::{Deserialize, Serialize};
use std::ops::Add;
use std::time::Duration;

/// Partial result of one evaluation chunk; summed after the join.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ChunkTally {
    pub planning_time: f64,
    pub successful_paths: usize,
    pub total_steps: usize,
}

impl ChunkTally {
    /// Adds one evaluated cell; `steps` is `None` when no path was found.
    pub fn record(&mut self, planning_time: f64, steps: Option<usize>) {
        self.planning_time += planning_time;
        if let Some(steps) = steps {
            self.successful_paths += 1;
            self.total_steps += steps;
        }
    }
}

impl Add for ChunkTally {
    type Output = ChunkTally;

    fn add(self, other: ChunkTally) -> ChunkTally {
        ChunkTally {
            planning_time: self.planning_time + other.planning_time,
            successful_paths: self.successful_paths + other.successful_paths,
            total_steps: self.total_steps + other.total_steps,
        }
    }
}

/// Aggregate score of a path source over a set of start cells.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    /// Mean seconds spent per start cell
    pub avg_planning_time: f64,
    /// Fraction of start cells with a valid path
    pub success_rate: f64,
    /// Mean moves over successful paths
    pub avg_path_length: f64,
}

impl EvaluationReport {
    pub fn from_tally(tally: &ChunkTally, total_positions: usize) -> Self {
        let total = total_positions as f64;
        EvaluationReport {
            avg_planning_time: if total_positions > 0 {
                tally.planning_time / total
            } else {
                0.0
            },
            success_rate: if total_positions > 0 {
                tally.successful_paths as f64 / total
            } else {
                0.0
            },
            avg_path_length: if tally.successful_paths > 0 {
                tally.total_steps as f64 / tally.successful_paths as f64
            } else {
                0.0
            },
        }
    }
}

/// What the reporting side receives for one training invocation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub elapsed: Duration,
    pub success_rate: f64,
    pub avg_path_length: f64,
}

impl RunReport {
    pub fn new(elapsed: Duration, evaluation: &EvaluationReport) -> Self {
        RunReport {
            elapsed,
            success_rate: evaluation.success_rate,
            avg_path_length: evaluation.avg_path_length,
        }
    }
}
