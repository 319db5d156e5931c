use rand::rngs::StdRng;

use super::TrainOutcome;
use crate::error::Result;
use crate::maze::Maze;
use crate::qtable::QTable;

/// Something that can learn a Q-table for one partition.
///
/// Trainers take ownership of the node's current table and hand back the
/// trained one, so several nodes can be trained concurrently against the
/// same read-only maze.
pub trait NodeTrainer: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// Trains `table` over its own region of `maze`.
    fn train(&self, maze: &Maze, table: QTable, rng: &mut StdRng) -> Result<TrainOutcome>;
}
