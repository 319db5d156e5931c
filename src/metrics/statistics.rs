use serde::{Deserialize, Serialize};

/// Mean, sample standard deviation and range of a set of values
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Statistics {
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    pub max: f64,
    pub count: usize,
}

impl Statistics {
    /// All zero for an empty slice
    pub fn from_slice(values: &[f64]) -> Self {
        let mut stats = RunningStats::new();
        for &value in values {
            stats.update(value);
        }
        stats.to_statistics()
    }
}

/// Welford accumulator
#[derive(Debug, Clone)]
pub struct RunningStats {
    count: usize,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    pub fn new() -> Self {
        RunningStats {
            count: 0,
            mean: 0.0,
            m2: 0.0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
        }
    }

    pub fn update(&mut self, value: f64) {
        self.count += 1;
        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (value - self.mean);
        self.min = self.min.min(value);
        self.max = self.max.max(value);
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn to_statistics(&self) -> Statistics {
        if self.count == 0 {
            return Statistics::default();
        }
        let variance = if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        };
        Statistics {
            mean: self.mean,
            std: variance.sqrt(),
            min: self.min,
            max: self.max,
            count: self.count,
        }
    }
}

impl Default for RunningStats {
    fn default() -> Self {
        Self::new()
    }
}
