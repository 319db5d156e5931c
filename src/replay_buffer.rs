use rand::Rng;
use std::collections::VecDeque;

use crate::types::{Action, Position};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Experience {
    pub state: Position,
    pub action: Action,
    pub reward: f64,
    pub next_state: Position,
}

/// Bounded FIFO of past transitions; the oldest entry is evicted first.
#[derive(Clone, Debug)]
pub struct ReplayBuffer {
    buffer: VecDeque<Experience>,
    capacity: usize,
}

impl ReplayBuffer {
    pub fn new(capacity: usize) -> Self {
        ReplayBuffer {
            buffer: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn add(&mut self, experience: Experience) {
        if self.capacity == 0 {
            return;
        }
        if self.buffer.len() == self.capacity {
            self.buffer.pop_front();
        }
        self.buffer.push_back(experience);
    }

    /// Exactly `batch_size` experiences drawn independently (repeats allowed).
    pub fn sample_with_replacement<R: Rng + ?Sized>(&self, batch_size: usize, rng: &mut R) -> Vec<Experience> {
        if self.buffer.is_empty() {
            return Vec::new();
        }
        (0..batch_size)
            .map(|_| self.buffer[rng.gen_range(0..self.buffer.len())])
            .collect()
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}
