use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{MazeError, Result};

/// Number of discrete moves available to an agent
pub const ACTION_COUNT: usize = 8;

/// Grid coordinate as (row, col)
pub type Position = (usize, usize);

/// An ordered sequence of coordinates, start first
pub type Path = Vec<Position>;

/// The eight compass moves, numbered clockwise from north.
///
/// ```text
///  7 | 0 | 1
///  6 | X | 2
///  5 | 4 | 3
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    North,
    NorthEast,
    East,
    SouthEast,
    South,
    SouthWest,
    West,
    NorthWest,
}

impl Action {
    pub const ALL: [Action; ACTION_COUNT] = [
        Action::North,
        Action::NorthEast,
        Action::East,
        Action::SouthEast,
        Action::South,
        Action::SouthWest,
        Action::West,
        Action::NorthWest,
    ];

    /// Position of this action in a Q-value vector
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Result<Self> {
        Action::ALL
            .get(index)
            .copied()
            .ok_or(MazeError::InvalidAction(index))
    }

    /// (row, col) displacement
    pub fn delta(self) -> (isize, isize) {
        match self {
            Action::North => (-1, 0),
            Action::NorthEast => (-1, 1),
            Action::East => (0, 1),
            Action::SouthEast => (1, 1),
            Action::South => (1, 0),
            Action::SouthWest => (1, -1),
            Action::West => (0, -1),
            Action::NorthWest => (-1, -1),
        }
    }

    /// Target cell of this move if it stays inside `rows` x `cols`.
    pub fn apply(self, pos: Position, rows: usize, cols: usize) -> Option<Position> {
        let (dr, dc) = self.delta();
        let row = pos.0.checked_add_signed(dr)?;
        let col = pos.1.checked_add_signed(dc)?;
        (row < rows && col < cols).then_some((row, col))
    }

    /// Arrow glyph used when rendering a policy
    pub fn arrow(self) -> char {
        match self {
            Action::North => '↑',
            Action::NorthEast => '↗',
            Action::East => '→',
            Action::SouthEast => '↘',
            Action::South => '↓',
            Action::SouthWest => '↙',
            Action::West => '←',
            Action::NorthWest => '↖',
        }
    }
}

/// Classification of a single grid cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CellKind {
    Obstacle,
    #[default]
    Free,
    ChargingStation,
}

impl CellKind {
    pub fn is_passable(self) -> bool {
        self != CellKind::Obstacle
    }

    pub fn symbol(self) -> char {
        match self {
            CellKind::Obstacle => '#',
            CellKind::Free => '.',
            CellKind::ChargingStation => 'C',
        }
    }
}

impl TryFrom<i32> for CellKind {
    type Error = MazeError;

    fn try_from(code: i32) -> Result<Self> {
        match code {
            0 => Ok(CellKind::Obstacle),
            1 => Ok(CellKind::Free),
            2 => Ok(CellKind::ChargingStation),
            other => Err(MazeError::InvalidCellKind(other)),
        }
    }
}

impl From<CellKind> for i32 {
    fn from(kind: CellKind) -> i32 {
        match kind {
            CellKind::Obstacle => 0,
            CellKind::Free => 1,
            CellKind::ChargingStation => 2,
        }
    }
}

/// Inclusive rectangle of grid cells
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Region {
    pub start_row: usize,
    pub start_col: usize,
    pub end_row: usize,
    pub end_col: usize,
}

impl Region {
    pub fn new(start_row: usize, start_col: usize, end_row: usize, end_col: usize) -> Self {
        debug_assert!(start_row <= end_row && start_col <= end_col);
        Region {
            start_row,
            start_col,
            end_row,
            end_col,
        }
    }

    /// Region covering a whole `rows` x `cols` grid
    pub fn full(rows: usize, cols: usize) -> Self {
        Region::new(0, 0, rows - 1, cols - 1)
    }

    pub fn height(&self) -> usize {
        self.end_row - self.start_row + 1
    }

    pub fn width(&self) -> usize {
        self.end_col - self.start_col + 1
    }

    pub fn area(&self) -> usize {
        self.height() * self.width()
    }

    pub fn contains(&self, pos: Position) -> bool {
        pos.0 >= self.start_row && pos.0 <= self.end_row && pos.1 >= self.start_col && pos.1 <= self.end_col
    }

    pub fn contains_region(&self, other: &Region) -> bool {
        self.contains((other.start_row, other.start_col)) && self.contains((other.end_row, other.end_col))
    }

    /// Offset of a global position inside this region
    pub fn local(&self, pos: Position) -> Option<(usize, usize)> {
        self.contains(pos)
            .then(|| (pos.0 - self.start_row, pos.1 - self.start_col))
    }

    /// All cells, row-major
    pub fn cells(&self) -> impl Iterator<Item = Position> + '_ {
        (self.start_row..=self.end_row)
            .flat_map(move |row| (self.start_col..=self.end_col).map(move |col| (row, col)))
    }

    /// Actions whose target cell stays inside this region
    pub fn valid_actions(&self, pos: Position) -> Vec<Action> {
        Action::ALL
            .iter()
            .copied()
            .filter(|action| {
                let (dr, dc) = action.delta();
                match (pos.0.checked_add_signed(dr), pos.1.checked_add_signed(dc)) {
                    (Some(row), Some(col)) => self.contains((row, col)),
                    _ => false,
                }
            })
            .collect()
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}, {}) -> ({}, {})",
            self.start_row, self.start_col, self.end_row, self.end_col
        )
    }
}
