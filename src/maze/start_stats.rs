use std::collections::HashMap;

use crate::types::Position;

/// Attempt/success counters for one start cell.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StartStats {
    attempts: u32,
    successes: u32,
}

impl StartStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// successes / attempts, or 0 when the cell was never tried
    pub fn success_rate(&self) -> f64 {
        if self.attempts > 0 {
            self.successes as f64 / self.attempts as f64
        } else {
            0.0
        }
    }

    pub fn increment_attempts(&mut self) {
        self.attempts += 1;
    }

    pub fn increment_successes(&mut self) {
        self.successes += 1;
    }

    pub fn record(&mut self, success: bool) {
        self.increment_attempts();
        if success {
            self.increment_successes();
        }
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn successes(&self) -> u32 {
        self.successes
    }
}

/// Per-cell start statistics for one training run
pub type StartStatsMap = HashMap<Position, StartStats>;
