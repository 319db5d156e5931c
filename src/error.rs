use std::fmt;

/// Result type for mazeq operations
pub type Result<T> = std::result::Result<T, MazeError>;

/// Main error type for the mazeq library
#[derive(Debug, Clone, PartialEq)]
pub enum MazeError {
    /// Coordinates outside the grid (or outside a table's region)
    OutOfBounds {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },

    /// Raw cell code that is not one of the known kinds
    InvalidCellKind(i32),

    /// Generation probabilities do not sum to 1
    InvalidProbabilities {
        sum: f64,
    },

    /// Invalid parameter value
    InvalidParameter {
        name: String,
        reason: String,
    },

    /// Action code outside 0..8
    InvalidAction(usize),

    /// A region without a single non-obstacle cell to start from
    NoStartCell {
        region: String,
    },

    /// Node id not present in the partition tree
    UnknownNode(usize),

    /// Worker pool could not be created
    ThreadPool(String),

    /// Configuration could not be read or parsed
    Config(String),
}

impl fmt::Display for MazeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MazeError::OutOfBounds { row, col, rows, cols } => {
                write!(f, "Index ({}, {}) out of bounds for {}x{} grid", row, col, rows, cols)
            }
            MazeError::InvalidCellKind(code) => write!(f, "Invalid cell kind code {}", code),
            MazeError::InvalidProbabilities { sum } => {
                write!(f, "Cell probabilities must sum to 1, got {}", sum)
            }
            MazeError::InvalidParameter { name, reason } => {
                write!(f, "Invalid parameter '{}': {}", name, reason)
            }
            MazeError::InvalidAction(action) => {
                write!(f, "Invalid action {}: must be less than {}", action, crate::types::ACTION_COUNT)
            }
            MazeError::NoStartCell { region } => {
                write!(f, "No non-obstacle start cell in region {}", region)
            }
            MazeError::UnknownNode(id) => write!(f, "Unknown partition node {}", id),
            MazeError::ThreadPool(msg) => write!(f, "Thread pool error: {}", msg),
            MazeError::Config(msg) => write!(f, "Configuration error: {}", msg),
        }
    }
}

impl std::error::Error for MazeError {}

impl From<std::io::Error> for MazeError {
    fn from(err: std::io::Error) -> Self {
        MazeError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for MazeError {
    fn from(err: serde_json::Error) -> Self {
        MazeError::Config(err.to_string())
    }
}

impl From<rayon::ThreadPoolBuildError> for MazeError {
    fn from(err: rayon::ThreadPoolBuildError) -> Self {
        MazeError::ThreadPool(err.to_string())
    }
}

// Helper functions for common error patterns
impl MazeError {
    pub fn out_of_bounds(pos: (usize, usize), dims: (usize, usize)) -> Self {
        MazeError::OutOfBounds {
            row: pos.0,
            col: pos.1,
            rows: dims.0,
            cols: dims.1,
        }
    }

    pub fn invalid_parameter<S: Into<String>>(name: S, reason: S) -> Self {
        MazeError::InvalidParameter {
            name: name.into(),
            reason: reason.into(),
        }
    }
}
