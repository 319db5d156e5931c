use rand::seq::SliceRandom;
use rand::Rng;

use super::Maze;
use crate::types::{Action, CellKind, Position};

/// Moves `moves` randomly chosen obstacles one step each onto a free
/// neighbouring cell.
///
/// Obstacles without a free neighbour stay put. Returns every cell whose
/// kind changed, old and new position of each move in order.
pub fn move_obstacles<R: Rng + ?Sized>(maze: &mut Maze, moves: usize, rng: &mut R) -> Vec<Position> {
    let mut obstacles = maze.obstacle_positions();
    let mut changed = Vec::with_capacity(moves * 2);
    if obstacles.is_empty() {
        return changed;
    }

    let (rows, cols) = maze.dims();
    for _ in 0..moves {
        let index = rng.gen_range(0..obstacles.len());
        let from = obstacles[index];
        let targets: Vec<Position> = Action::ALL
            .iter()
            .filter_map(|action| action.apply(from, rows, cols))
            .filter(|&pos| maze.cells()[pos] == CellKind::Free)
            .collect();
        let Some(&to) = targets.choose(rng) else {
            continue;
        };

        maze.cells[from] = CellKind::Free;
        maze.cells[to] = CellKind::Obstacle;
        obstacles[index] = to;
        changed.push(from);
        changed.push(to);
    }
    changed
}
