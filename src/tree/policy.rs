//! Scoring the learned policy.
//!
//! The root table holds every value that was propagated upwards, so policy
//! queries always read it. A path search follows the best `branching`
//! in-grid actions of every visited cell breadth-first, which tolerates a
//! single poor argmax without exploring the whole grid.

use std::collections::{HashSet, VecDeque};
use std::time::Instant;

use super::{NodeId, PartitionTree};
use crate::error::{MazeError, Result};
use crate::metrics::{ChunkTally, EvaluationReport};
use crate::parallel::try_fork_join_chunks;
use crate::types::{Action, Path, Position, Region};

struct Visit {
    pos: Position,
    steps: usize,
    parent: Option<usize>,
}

fn unwind(visits: &[Visit], mut index: usize) -> Path {
    let mut path = vec![visits[index].pos];
    while let Some(parent) = visits[index].parent {
        path.push(visits[parent].pos);
        index = parent;
    }
    path.reverse();
    path
}

impl PartitionTree {
    /// Step cap for a policy walk over the whole grid
    pub fn policy_step_limit(&self) -> usize {
        self.maze.rows() + self.maze.cols()
    }

    fn in_grid_actions(&self, pos: Position) -> Vec<Action> {
        let (rows, cols) = self.maze.dims();
        Action::ALL
            .iter()
            .copied()
            .filter(|action| action.apply(pos, rows, cols).is_some())
            .collect()
    }

    /// Breadth-first search from `start` that only follows the `branching`
    /// highest-valued actions of each cell.
    ///
    /// Returns the number of moves and the cells visited, start and station
    /// included, or `None` if no station is reached within `max_steps`.
    pub fn find_valid_path(
        &self,
        start: Position,
        max_steps: usize,
        branching: usize,
    ) -> Result<Option<(usize, Path)>> {
        let table = self
            .node(Self::ROOT)?
            .q_table()
            .ok_or(MazeError::UnknownNode(Self::ROOT.index()))?;
        if !self.maze.is_passable(start) {
            self.maze.get(start)?;
            return Ok(None);
        }

        let (rows, cols) = self.maze.dims();
        let mut visits = vec![Visit {
            pos: start,
            steps: 0,
            parent: None,
        }];
        let mut visited = HashSet::from([start]);
        let mut queue = VecDeque::from([0usize]);

        while let Some(index) = queue.pop_front() {
            let Visit { pos, steps, .. } = visits[index];
            if steps >= max_steps {
                continue;
            }
            if self.maze.is_station(pos) {
                return Ok(Some((steps, unwind(&visits, index))));
            }

            for action in table.top_actions(pos, &self.in_grid_actions(pos), branching)? {
                let Some(next) = action.apply(pos, rows, cols) else {
                    continue;
                };
                if !self.maze.is_passable(next) || !visited.insert(next) {
                    continue;
                }
                visits.push(Visit {
                    pos: next,
                    steps: steps + 1,
                    parent: Some(index),
                });
                queue.push_back(visits.len() - 1);
            }
        }
        Ok(None)
    }

    /// Follows the single best in-grid action of the root table.
    ///
    /// Gives up on a blocked move, a revisited cell or after `max_steps` moves.
    pub fn greedy_path(&self, start: Position, max_steps: usize) -> Result<Option<Path>> {
        let table = self
            .node(Self::ROOT)?
            .q_table()
            .ok_or(MazeError::UnknownNode(Self::ROOT.index()))?;
        if !self.maze.is_passable(start) {
            self.maze.get(start)?;
            return Ok(None);
        }

        let (rows, cols) = self.maze.dims();
        let mut path = vec![start];
        let mut visited = HashSet::from([start]);
        let mut pos = start;
        while !self.maze.is_station(pos) {
            if path.len() > max_steps {
                return Ok(None);
            }
            let next = table
                .best_action(pos, &self.in_grid_actions(pos))?
                .and_then(|action| action.apply(pos, rows, cols))
                .filter(|&next| self.maze.is_passable(next));
            match next {
                Some(next) if visited.insert(next) => {
                    path.push(next);
                    pos = next;
                }
                _ => return Ok(None),
            }
        }
        Ok(Some(path))
    }

    fn evaluate_cells(&self, cells: &[Position], chunk_size: usize, branching: usize) -> Result<EvaluationReport> {
        let max_steps = self.policy_step_limit();
        let tally = try_fork_join_chunks(cells, chunk_size, |chunk| {
            let mut tally = ChunkTally::default();
            for &start in chunk {
                let started = Instant::now();
                let found = self.find_valid_path(start, max_steps, branching)?;
                tally.record(started.elapsed().as_secs_f64(), found.map(|(steps, _)| steps));
            }
            Ok(tally)
        })?;
        Ok(EvaluationReport::from_tally(&tally, cells.len()))
    }

    /// Fraction of non-obstacle cells in `region` from which the policy
    /// reaches a station; 0 for a region without such cells.
    pub fn region_success_rate(&self, region: &Region, chunk_size: usize, branching: usize) -> Result<f64> {
        let cells = self.maze.passable_cells(region);
        if cells.is_empty() {
            return Ok(0.0);
        }
        Ok(self.evaluate_cells(&cells, chunk_size, branching)?.success_rate)
    }

    /// Policy success rate over the node's region
    pub fn success_rate(&self, id: NodeId, chunk_size: usize, branching: usize) -> Result<f64> {
        let region = *self.node(id)?.region();
        self.region_success_rate(&region, chunk_size, branching)
    }

    /// Scores the policy from every non-obstacle cell of the grid.
    pub fn evaluate_policy(&self, chunk_size: usize, branching: usize) -> Result<EvaluationReport> {
        let cells = self.maze.passable_cells(&self.maze.region());
        self.evaluate_cells(&cells, chunk_size, branching)
    }
}
