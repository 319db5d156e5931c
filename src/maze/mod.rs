//! # Grid environment
//!
//! A [`Maze`] is a fixed-size grid of [`CellKind`]s with at least one
//! charging station. It validates and executes moves, hands out rewards and
//! samples start cells for training episodes.
//!
//! ```rust
//! use mazeq::maze::Maze;
//! use mazeq::types::Action;
//!
//! let maze = Maze::from_rows(&["...", "...", "..C"]).unwrap();
//! let (next, reward) = maze.perform_action((1, 2), Action::South).unwrap();
//! assert_eq!(next, (2, 2));
//! assert_eq!(reward, 100.0);
//! ```

mod changes;
mod start_stats;

pub use changes::move_obstacles;
pub use start_stats::{StartStats, StartStatsMap};

use ndarray::Array2;
use rand::seq::SliceRandom;
use rand::Rng;
use rand_distr::{Distribution, WeightedIndex};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::TrainingConfig;
use crate::error::{MazeError, Result};
use crate::types::{Action, CellKind, Position, Region};

/// Reward for ending a move on a charging station
pub const REWARD_GOAL: f64 = 100.0;
/// Reward for a move that was rejected (wall or obstacle)
pub const REWARD_BLOCKED: f64 = -10.0;
/// Reward for any other successful move
pub const REWARD_STEP: f64 = -1.0;

/// Probabilities used when generating a random maze.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CellProbabilities {
    pub free: f64,
    pub obstacle: f64,
    pub station: f64,
}

impl CellProbabilities {
    pub fn new(free: f64, obstacle: f64, station: f64) -> Self {
        CellProbabilities { free, obstacle, station }
    }

    pub fn validate(&self) -> Result<()> {
        let sum = self.free + self.obstacle + self.station;
        let in_range = [self.free, self.obstacle, self.station]
            .iter()
            .all(|p| (0.0..=1.0).contains(p));
        if !in_range || (sum - 1.0).abs() > 1e-6 {
            return Err(MazeError::InvalidProbabilities { sum });
        }
        Ok(())
    }
}

/// Grid of cells with at least one charging station.
#[derive(Debug, Clone, PartialEq)]
pub struct Maze {
    cells: Array2<CellKind>,
}

impl Maze {
    /// Wraps an existing grid. Fails on an empty grid or one without stations.
    pub fn from_cells(cells: Array2<CellKind>) -> Result<Self> {
        let (rows, cols) = cells.dim();
        if rows == 0 || cols == 0 {
            return Err(MazeError::invalid_parameter("cells", "grid must not be empty"));
        }
        if !cells.iter().any(|&kind| kind == CellKind::ChargingStation) {
            return Err(MazeError::invalid_parameter(
                "cells",
                "grid must contain at least one charging station",
            ));
        }
        Ok(Maze { cells })
    }

    /// Parses rows of `.` (free), `#` (obstacle) and `C` (charging station).
    pub fn from_rows<S: AsRef<str>>(rows: &[S]) -> Result<Self> {
        let height = rows.len();
        let width = rows.first().map(|row| row.as_ref().chars().count()).unwrap_or(0);
        let mut cells = Vec::with_capacity(height * width);
        for row in rows {
            let row = row.as_ref();
            if row.chars().count() != width {
                return Err(MazeError::invalid_parameter("rows", "rows must have equal length"));
            }
            for ch in row.chars() {
                cells.push(match ch {
                    '.' => CellKind::Free,
                    '#' => CellKind::Obstacle,
                    'C' => CellKind::ChargingStation,
                    other => return Err(MazeError::InvalidCellKind(other as i32)),
                });
            }
        }
        let cells = Array2::from_shape_vec((height, width), cells)
            .map_err(|e| MazeError::invalid_parameter("rows".to_string(), e.to_string()))?;
        Self::from_cells(cells)
    }

    /// Random maze; a station is forced at a random cell if none was drawn.
    pub fn generate<R: Rng + ?Sized>(
        rows: usize,
        cols: usize,
        probabilities: CellProbabilities,
        rng: &mut R,
    ) -> Result<Self> {
        probabilities.validate()?;
        if rows == 0 || cols == 0 {
            return Err(MazeError::invalid_parameter("dimensions", "rows and cols must be positive"));
        }

        let mut cells = Array2::from_shape_simple_fn((rows, cols), || {
            let value: f64 = rng.gen();
            if value < probabilities.free {
                CellKind::Free
            } else if value < probabilities.free + probabilities.obstacle {
                CellKind::Obstacle
            } else {
                CellKind::ChargingStation
            }
        });

        if !cells.iter().any(|&kind| kind == CellKind::ChargingStation) {
            let row = rng.gen_range(0..rows);
            let col = rng.gen_range(0..cols);
            cells[[row, col]] = CellKind::ChargingStation;
        }
        Ok(Maze { cells })
    }

    pub fn rows(&self) -> usize {
        self.cells.nrows()
    }

    pub fn cols(&self) -> usize {
        self.cells.ncols()
    }

    pub fn dims(&self) -> (usize, usize) {
        self.cells.dim()
    }

    /// Region spanning the whole grid
    pub fn region(&self) -> Region {
        Region::full(self.rows(), self.cols())
    }

    pub fn cells(&self) -> &Array2<CellKind> {
        &self.cells
    }

    /// Kind of the cell at `pos`
    pub fn get(&self, pos: Position) -> Result<CellKind> {
        self.cells
            .get(pos)
            .copied()
            .ok_or_else(|| MazeError::out_of_bounds(pos, self.dims()))
    }

    /// Overwrite a cell. Removing the last charging station is rejected.
    pub fn set(&mut self, pos: Position, kind: CellKind) -> Result<()> {
        let dims = self.dims();
        let current = self.get(pos)?;
        if current == CellKind::ChargingStation
            && kind != CellKind::ChargingStation
            && self.station_count(&self.region()) == 1
        {
            return Err(MazeError::invalid_parameter(
                "kind",
                "cannot remove the last charging station",
            ));
        }
        let cell = self
            .cells
            .get_mut(pos)
            .ok_or_else(|| MazeError::out_of_bounds(pos, dims))?;
        *cell = kind;
        Ok(())
    }

    /// Overwrite a cell from its raw numeric code.
    pub fn set_code(&mut self, pos: Position, code: i32) -> Result<()> {
        let kind = CellKind::try_from(code)?;
        self.set(pos, kind)
    }

    pub fn is_station(&self, pos: Position) -> bool {
        self.cells.get(pos) == Some(&CellKind::ChargingStation)
    }

    pub fn is_passable(&self, pos: Position) -> bool {
        self.cells.get(pos).is_some_and(|kind| kind.is_passable())
    }

    /// Executes one move from `pos`.
    ///
    /// Moves off the grid or into an obstacle are rejected and leave the agent
    /// where it was. Returns the resulting position and the reward:
    /// [`REWARD_GOAL`] if that position is a station, [`REWARD_BLOCKED`] for a
    /// rejected move, [`REWARD_STEP`] otherwise.
    pub fn perform_action(&self, pos: Position, action: Action) -> Result<(Position, f64)> {
        self.get(pos)?;
        let target = action
            .apply(pos, self.rows(), self.cols())
            .filter(|&next| self.is_passable(next));

        let next = target.unwrap_or(pos);
        let reward = if self.is_station(next) {
            REWARD_GOAL
        } else if target.is_none() {
            REWARD_BLOCKED
        } else {
            REWARD_STEP
        };
        Ok((next, reward))
    }

    /// Non-obstacle cells of `region`, row-major
    pub fn passable_cells(&self, region: &Region) -> Vec<Position> {
        region.cells().filter(|&pos| self.is_passable(pos)).collect()
    }

    pub fn station_count(&self, region: &Region) -> usize {
        region.cells().filter(|&pos| self.is_station(pos)).count()
    }

    pub fn obstacle_positions(&self) -> Vec<Position> {
        self.cells
            .indexed_iter()
            .filter(|(_, &kind)| kind == CellKind::Obstacle)
            .map(|(pos, _)| pos)
            .collect()
    }

    /// Picks a start cell inside `region`.
    ///
    /// The first `uniform_start_samples` draws (or any draw while `stats` is
    /// empty) are uniform over non-obstacle cells. Afterwards each cell is
    /// weighted by `1 - success_rate + start_weight_epsilon` so that cells
    /// which rarely lead to a station are tried more often.
    pub fn sample_start<R: Rng + ?Sized>(
        &self,
        region: &Region,
        draws: usize,
        stats: &StartStatsMap,
        config: &TrainingConfig,
        rng: &mut R,
    ) -> Result<Position> {
        let positions = self.passable_cells(region);
        if positions.is_empty() {
            return Err(MazeError::NoStartCell {
                region: region.to_string(),
            });
        }

        if draws >= config.uniform_start_samples && !stats.is_empty() {
            let weights: Vec<f64> = positions
                .iter()
                .map(|pos| {
                    let rate = stats.get(pos).map(|s| s.success_rate()).unwrap_or(0.0);
                    1.0 - rate + config.start_weight_epsilon
                })
                .collect();
            if let Ok(dist) = WeightedIndex::new(&weights) {
                return Ok(positions[dist.sample(rng)]);
            }
        }

        positions
            .choose(rng)
            .copied()
            .ok_or_else(|| MazeError::NoStartCell {
                region: region.to_string(),
            })
    }
}

impl fmt::Display for Maze {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in self.cells.rows() {
            for kind in row.iter() {
                write!(f, "{}", kind.symbol())?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
