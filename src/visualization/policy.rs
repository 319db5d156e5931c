use crate::error::Result;
use crate::tree::{NodeId, PartitionTree};
use crate::types::CellKind;

/// Renders the greedy action of `node` for every free cell of its region.
///
/// Obstacles and stations keep their maze symbols; free cells outside the
/// node's table (or of a node without one) are shown as `.`.
pub fn render_policy(tree: &PartitionTree, node: NodeId) -> Result<String> {
    let maze = tree.maze();
    let region = *tree.node(node)?.region();
    let mut output = String::with_capacity(maze.rows() * (maze.cols() + 1) * 3);

    for row in 0..maze.rows() {
        for col in 0..maze.cols() {
            let pos = (row, col);
            let kind = maze.get(pos)?;
            let glyph = match kind {
                CellKind::Free if region.contains(pos) => tree
                    .best_action(node, pos)?
                    .map(|action| action.arrow())
                    .unwrap_or_else(|| kind.symbol()),
                _ => kind.symbol(),
            };
            output.push(glyph);
        }
        output.push('\n');
    }
    Ok(output)
}

/// Marks `path` on the maze with `*`, start as `S`.
pub fn render_path(tree: &PartitionTree, path: &[(usize, usize)]) -> String {
    let maze = tree.maze();
    let mut grid: Vec<Vec<char>> = maze
        .cells()
        .rows()
        .into_iter()
        .map(|row| row.iter().map(|kind| kind.symbol()).collect())
        .collect();

    for (i, &(row, col)) in path.iter().enumerate() {
        if maze.is_station((row, col)) {
            continue;
        }
        if let Some(cell) = grid.get_mut(row).and_then(|r| r.get_mut(col)) {
            *cell = if i == 0 { 'S' } else { '*' };
        }
    }

    grid.into_iter()
        .map(|row| row.into_iter().collect::<String>() + "\n")
        .collect()
}
