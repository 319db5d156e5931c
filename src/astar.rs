//! # Shortest-path oracle
//!
//! [`ShortestPaths::compute`] finds, for every non-obstacle cell, a shortest
//! 8-connected path to the nearest reachable charging station.
//!
//! Cells are used as A* sources in row-major order. Whenever a search
//! succeeds, every suffix of the resulting path is itself a shortest path
//! from that intermediate cell to its nearest station, so all cells on the
//! path are assigned at once and never searched from again. Unreachable
//! cells get an empty path.
//!
//! [`ShortestPaths::evaluate`] scores the cached paths against the current
//! maze in parallel chunks, giving the baseline the learned policies are
//! compared with.

use ndarray::Array2;
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, HashSet};
use std::time::Instant;

use crate::maze::Maze;
use crate::metrics::{ChunkTally, EvaluationReport};
use crate::parallel::fork_join_chunks;
use crate::types::{Action, Path, Position};

/// Chebyshev distance between two cells
pub fn chebyshev(a: Position, b: Position) -> usize {
    a.0.abs_diff(b.0).max(a.1.abs_diff(b.1))
}

/// Chebyshev distance from every cell to its nearest charging station,
/// ignoring obstacles. Two-pass chessboard distance transform.
pub fn station_distance_field(maze: &Maze) -> Array2<usize> {
    let (rows, cols) = maze.dims();
    let mut field = Array2::from_shape_fn((rows, cols), |pos| {
        if maze.is_station(pos) {
            0
        } else {
            usize::MAX
        }
    });

    let relax = |field: &mut Array2<usize>, pos: Position, from: Option<Position>| {
        if let Some(from) = from {
            let candidate = field[from].saturating_add(1);
            if candidate < field[pos] {
                field[pos] = candidate;
            }
        }
    };

    for r in 0..rows {
        for c in 0..cols {
            for action in [Action::NorthWest, Action::North, Action::NorthEast, Action::West] {
                relax(&mut field, (r, c), action.apply((r, c), rows, cols));
            }
        }
    }
    for r in (0..rows).rev() {
        for c in (0..cols).rev() {
            for action in [Action::SouthEast, Action::South, Action::SouthWest, Action::East] {
                relax(&mut field, (r, c), action.apply((r, c), rows, cols));
            }
        }
    }
    field
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct OpenNode {
    f: usize,
    g: usize,
    pos: Position,
}

impl Ord for OpenNode {
    fn cmp(&self, other: &Self) -> Ordering {
        // Min-heap on f, then on g
        other
            .f
            .cmp(&self.f)
            .then_with(|| other.g.cmp(&self.g))
            .then_with(|| other.pos.cmp(&self.pos))
    }
}

impl PartialOrd for OpenNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// A* from `start` to the nearest charging station.
///
/// `heuristic` must hold each cell's Chebyshev distance to the nearest station.
pub fn search(maze: &Maze, start: Position, heuristic: &Array2<usize>) -> Option<Path> {
    if !maze.is_passable(start) {
        return None;
    }
    let (rows, cols) = maze.dims();
    let mut open = BinaryHeap::new();
    let mut g_score: HashMap<Position, usize> = HashMap::new();
    let mut came_from: HashMap<Position, Position> = HashMap::new();

    g_score.insert(start, 0);
    open.push(OpenNode {
        f: heuristic[start],
        g: 0,
        pos: start,
    });

    while let Some(current) = open.pop() {
        if g_score.get(&current.pos).is_some_and(|&g| current.g > g) {
            continue;
        }
        if maze.is_station(current.pos) {
            return Some(reconstruct_path(&came_from, start, current.pos));
        }
        for action in Action::ALL {
            let Some(next) = action.apply(current.pos, rows, cols) else {
                continue;
            };
            if !maze.is_passable(next) {
                continue;
            }
            let tentative = current.g + 1;
            if g_score.get(&next).map_or(true, |&g| tentative < g) {
                g_score.insert(next, tentative);
                came_from.insert(next, current.pos);
                open.push(OpenNode {
                    f: tentative.saturating_add(heuristic[next]),
                    g: tentative,
                    pos: next,
                });
            }
        }
    }
    None
}

fn reconstruct_path(came_from: &HashMap<Position, Position>, start: Position, goal: Position) -> Path {
    let mut path = vec![goal];
    let mut current = goal;
    while current != start {
        match came_from.get(&current) {
            Some(&previous) => {
                path.push(previous);
                current = previous;
            }
            None => break,
        }
    }
    path.reverse();
    path
}

/// Cached shortest path from every non-obstacle cell to its nearest station.
#[derive(Debug, Clone, Default)]
pub struct ShortestPaths {
    paths: HashMap<Position, Path>,
}

impl ShortestPaths {
    pub fn compute(maze: &Maze) -> Self {
        let started = Instant::now();
        let heuristic = station_distance_field(maze);
        let mut paths: HashMap<Position, Path> = HashMap::new();
        let mut processed: HashSet<Position> = HashSet::new();
        let mut searches = 0usize;

        for start in maze.region().cells() {
            if !maze.is_passable(start) || processed.contains(&start) {
                continue;
            }
            searches += 1;
            match search(maze, start, &heuristic) {
                Some(path) => {
                    for (i, &pos) in path.iter().enumerate() {
                        let suffix = &path[i..];
                        let shorter = paths.get(&pos).map_or(true, |existing| suffix.len() < existing.len());
                        if shorter {
                            paths.insert(pos, suffix.to_vec());
                        }
                        processed.insert(pos);
                    }
                }
                None => {
                    paths.insert(start, Vec::new());
                    processed.insert(start);
                }
            }
        }

        log::debug!(
            "shortest paths: {} cells covered by {} searches in {:.3}s",
            paths.len(),
            searches,
            started.elapsed().as_secs_f64()
        );
        ShortestPaths { paths }
    }

    /// Cached path from `pos`; empty when no station is reachable
    pub fn get(&self, pos: Position) -> Option<&Path> {
        self.paths.get(&pos)
    }

    /// Number of moves on the cached path, `None` if unreachable
    pub fn distance(&self, pos: Position) -> Option<usize> {
        self.paths
            .get(&pos)
            .filter(|path| !path.is_empty())
            .map(|path| path.len() - 1)
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Position, &Path)> {
        self.paths.iter()
    }

    /// Scores the cached paths against `maze`, which may have changed since
    /// they were computed. A path only counts if none of its cells is now an
    /// obstacle.
    pub fn evaluate(&self, maze: &Maze, chunk_size: usize) -> EvaluationReport {
        let positions = maze.passable_cells(&maze.region());
        let tally = fork_join_chunks(&positions, chunk_size, |chunk| {
            let mut tally = ChunkTally::default();
            for &pos in chunk {
                let started = Instant::now();
                let steps = self
                    .paths
                    .get(&pos)
                    .filter(|path| !path.is_empty() && path.iter().all(|&cell| maze.is_passable(cell)))
                    .map(|path| path.len() - 1);
                tally.record(started.elapsed().as_secs_f64(), steps);
            }
            tally
        });
        EvaluationReport::from_tally(&tally, positions.len())
    }
}
