//! # Partition tree
//!
//! The grid is recursively split into quadrants until every region is at most
//! `leaf_size` x `leaf_size`. Nodes live in an arena and refer to each other
//! by [`NodeId`]; the root (id 0) owns the maze and a Q-table covering the
//! whole grid. Every other node allocates its table lazily.
//!
//! Learned values move through the tree in two directions:
//!
//! - [`PartitionTree::propagate_upwards`] copies a node's region into every
//!   strict ancestor that owns a table (the root always does).
//! - [`PartitionTree::propagate_downwards`] copies a node's values into all
//!   of its descendants, allocating their tables if needed.
//!
//! ```rust
//! use mazeq::maze::Maze;
//! use mazeq::tree::PartitionTree;
//!
//! let rows: Vec<String> = (0..30).map(|r| if r == 0 { format!("C{}", ".".repeat(29)) } else { ".".repeat(30) }).collect();
//! let tree = PartitionTree::new(Maze::from_rows(&rows).unwrap(), 20).unwrap();
//! assert_eq!(tree.leaves().len(), 4);
//! ```

mod policy;

use ndarray::ArrayView1;
use std::collections::HashSet;
use std::fmt;

use crate::error::{MazeError, Result};
use crate::maze::Maze;
use crate::qtable::QTable;
use crate::types::{Action, CellKind, Position, Region};

/// Stable index of a node in the tree arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Baseline value of a node that has never been trained
pub const UNTRAINED: f64 = -1.0;

#[derive(Debug, Clone)]
pub struct PartitionNode {
    region: Region,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    depth: usize,
    q_table: Option<QTable>,
    station_count: usize,
    baseline_success_rate: f64,
}

impl PartitionNode {
    fn new(region: Region, parent: Option<NodeId>, depth: usize, maze: &Maze) -> Self {
        PartitionNode {
            region,
            parent,
            children: Vec::new(),
            depth,
            q_table: None,
            station_count: maze.station_count(&region),
            baseline_success_rate: UNTRAINED,
        }
    }

    pub fn region(&self) -> &Region {
        &self.region
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    pub fn q_table(&self) -> Option<&QTable> {
        self.q_table.as_ref()
    }

    pub fn station_count(&self) -> usize {
        self.station_count
    }

    /// Last recorded success rate, [`UNTRAINED`] if never trained
    pub fn baseline_success_rate(&self) -> f64 {
        self.baseline_success_rate
    }

    pub fn is_trained(&self) -> bool {
        self.baseline_success_rate >= 0.0
    }
}

/// Splits a region that is too large into its children.
///
/// Regions with at least two rows and two columns become four quadrants;
/// a single row or column is halved instead.
fn split_region(region: &Region) -> Vec<Region> {
    let mid_row = (region.start_row + region.end_row) / 2;
    let mid_col = (region.start_col + region.end_col) / 2;
    let (r0, c0, r1, c1) = (region.start_row, region.start_col, region.end_row, region.end_col);

    match (region.height() > 1, region.width() > 1) {
        (true, true) => vec![
            Region::new(r0, c0, mid_row, mid_col),
            Region::new(r0, mid_col + 1, mid_row, c1),
            Region::new(mid_row + 1, c0, r1, mid_col),
            Region::new(mid_row + 1, mid_col + 1, r1, c1),
        ],
        (false, true) => vec![Region::new(r0, c0, r1, mid_col), Region::new(r0, mid_col + 1, r1, c1)],
        (true, false) => vec![Region::new(r0, c0, mid_row, c1), Region::new(mid_row + 1, c0, r1, c1)],
        (false, false) => Vec::new(),
    }
}

/// Arena-backed quadtree over a maze.
#[derive(Debug, Clone)]
pub struct PartitionTree {
    maze: Maze,
    nodes: Vec<PartitionNode>,
    leaf_size: usize,
    total_episodes: usize,
}

impl PartitionTree {
    pub const ROOT: NodeId = NodeId(0);

    /// Builds the full tree for `maze`; regions larger than
    /// `leaf_size` x `leaf_size` are split.
    pub fn new(maze: Maze, leaf_size: usize) -> Result<Self> {
        if leaf_size == 0 {
            return Err(MazeError::invalid_parameter("leaf_size", "must be greater than 0"));
        }
        let region = maze.region();
        let mut root = PartitionNode::new(region, None, 0, &maze);
        root.q_table = Some(QTable::new(region));

        let mut tree = PartitionTree {
            maze,
            nodes: vec![root],
            leaf_size,
            total_episodes: 0,
        };

        let mut pending = vec![Self::ROOT];
        while let Some(id) = pending.pop() {
            let (region, depth) = {
                let node = &tree.nodes[id.0];
                (node.region, node.depth)
            };
            if region.height() <= leaf_size && region.width() <= leaf_size {
                continue;
            }
            for child_region in split_region(&region) {
                let child_id = NodeId(tree.nodes.len());
                tree.nodes
                    .push(PartitionNode::new(child_region, Some(id), depth + 1, &tree.maze));
                tree.nodes[id.0].children.push(child_id);
                pending.push(child_id);
            }
        }

        log::debug!(
            "partition tree: {} nodes, {} leaves over {}x{} grid",
            tree.nodes.len(),
            tree.leaves().len(),
            tree.maze.rows(),
            tree.maze.cols()
        );
        Ok(tree)
    }

    pub fn root(&self) -> NodeId {
        Self::ROOT
    }

    pub fn maze(&self) -> &Maze {
        &self.maze
    }

    pub fn leaf_size(&self) -> usize {
        self.leaf_size
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: NodeId) -> Result<&PartitionNode> {
        self.nodes.get(id.0).ok_or(MazeError::UnknownNode(id.0))
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut PartitionNode> {
        self.nodes.get_mut(id.0).ok_or(MazeError::UnknownNode(id.0))
    }

    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> {
        (0..self.nodes.len()).map(NodeId)
    }

    /// Episodes run by every trainer since the tree was built
    pub fn total_episodes(&self) -> usize {
        self.total_episodes
    }

    pub(crate) fn add_episodes(&mut self, episodes: usize) {
        self.total_episodes += episodes;
    }

    /// Overwrites one cell and refreshes station counts along its branch.
    pub fn set_cell(&mut self, pos: Position, kind: CellKind) -> Result<()> {
        self.maze.set(pos, kind)?;
        let mut current = self.find_leaf(pos);
        while let Some(id) = current {
            let region = self.nodes[id.0].region;
            self.nodes[id.0].station_count = self.maze.station_count(&region);
            current = self.nodes[id.0].parent;
        }
        Ok(())
    }

    /// Swaps in an updated maze of the same dimensions.
    pub fn replace_maze(&mut self, maze: Maze) -> Result<()> {
        if maze.dims() != self.maze.dims() {
            return Err(MazeError::invalid_parameter(
                "maze".to_string(),
                format!("expected {:?}, got {:?}", self.maze.dims(), maze.dims()),
            ));
        }
        self.maze = maze;
        for node in &mut self.nodes {
            node.station_count = self.maze.station_count(&node.region);
        }
        Ok(())
    }

    /// Leaves in depth-first order
    pub fn leaves(&self) -> Vec<NodeId> {
        let mut leaves = Vec::new();
        let mut stack = vec![Self::ROOT];
        while let Some(id) = stack.pop() {
            let node = &self.nodes[id.0];
            if node.is_leaf() {
                leaves.push(id);
            } else {
                stack.extend(node.children.iter().rev());
            }
        }
        leaves
    }

    /// Deepest node containing `pos`
    pub fn find_leaf(&self, pos: Position) -> Option<NodeId> {
        let mut current = Self::ROOT;
        if !self.nodes[current.0].region.contains(pos) {
            return None;
        }
        loop {
            let node = &self.nodes[current.0];
            match node
                .children
                .iter()
                .find(|child| self.nodes[child.0].region.contains(pos))
            {
                Some(&child) => current = child,
                None => return Some(current),
            }
        }
    }

    /// Distinct leaves containing any of `cells`, first occurrence first
    pub fn changed_leaves(&self, cells: &[Position]) -> Vec<NodeId> {
        let mut seen = HashSet::new();
        cells
            .iter()
            .filter_map(|&pos| self.find_leaf(pos))
            .filter(|id| seen.insert(*id))
            .collect()
    }

    /// Strict ancestors, nearest first
    pub fn ancestors(&self, id: NodeId) -> Result<Vec<NodeId>> {
        let mut ancestors = Vec::new();
        let mut current = self.node(id)?.parent;
        while let Some(parent) = current {
            ancestors.push(parent);
            current = self.nodes[parent.0].parent;
        }
        Ok(ancestors)
    }

    /// Strict descendants in depth-first order
    pub fn descendants(&self, id: NodeId) -> Result<Vec<NodeId>> {
        let mut descendants = Vec::new();
        let mut stack: Vec<NodeId> = self.node(id)?.children.iter().rev().copied().collect();
        while let Some(current) = stack.pop() {
            descendants.push(current);
            stack.extend(self.nodes[current.0].children.iter().rev());
        }
        Ok(descendants)
    }

    /// `nodes` without those lying inside another listed node, order kept.
    pub fn outermost(&self, nodes: &[NodeId]) -> Result<Vec<NodeId>> {
        let mut kept = Vec::with_capacity(nodes.len());
        for &id in nodes {
            if !self.ancestors(id)?.iter().any(|ancestor| nodes.contains(ancestor)) {
                kept.push(id);
            }
        }
        Ok(kept)
    }

    /// Allocates the node's table if it does not have one yet
    pub fn init_q_table(&mut self, id: NodeId) -> Result<()> {
        let node = self.node_mut(id)?;
        if node.q_table.is_none() {
            node.q_table = Some(QTable::new(node.region));
        }
        Ok(())
    }

    /// Copy of the node's table, allocating it first if needed
    pub(crate) fn snapshot_q_table(&mut self, id: NodeId) -> Result<QTable> {
        self.init_q_table(id)?;
        let node = self.node(id)?;
        Ok(node.q_table.clone().unwrap_or_else(|| QTable::new(node.region)))
    }

    /// Replaces the node's table with a trained one for the same region
    pub(crate) fn install_q_table(&mut self, id: NodeId, table: QTable) -> Result<()> {
        let node = self.node_mut(id)?;
        if table.region() != &node.region {
            return Err(MazeError::invalid_parameter(
                "table".to_string(),
                format!("region {} does not match node region {}", table.region(), node.region),
            ));
        }
        node.q_table = Some(table);
        Ok(())
    }

    pub fn q_table(&self, id: NodeId) -> Result<Option<&QTable>> {
        Ok(self.node(id)?.q_table.as_ref())
    }

    /// Action-values of `pos` in the node's table
    pub fn q_values(&self, id: NodeId, pos: Position) -> Result<Option<ArrayView1<'_, f64>>> {
        match self.node(id)?.q_table.as_ref() {
            Some(table) => Ok(Some(table.values(pos)?)),
            None => Ok(None),
        }
    }

    /// Highest-valued of all eight actions at `pos`; `None` for a node
    /// without a table.
    pub fn best_action(&self, id: NodeId, pos: Position) -> Result<Option<Action>> {
        match self.node(id)?.q_table.as_ref() {
            Some(table) => table.best_action(pos, &Action::ALL),
            None => Ok(None),
        }
    }

    pub fn set_baseline(&mut self, id: NodeId, success_rate: f64) -> Result<()> {
        self.node_mut(id)?.baseline_success_rate = success_rate;
        Ok(())
    }

    /// Copies the node's values into every strict ancestor that has a table.
    pub fn propagate_upwards(&mut self, id: NodeId) -> Result<()> {
        let node = self.node(id)?;
        let (Some(source), Some(_)) = (node.q_table.clone(), node.parent) else {
            return Ok(());
        };
        let region = node.region;
        for ancestor in self.ancestors(id)? {
            if let Some(table) = self.nodes[ancestor.0].q_table.as_mut() {
                table.copy_region_from(&source, &region)?;
            }
        }
        Ok(())
    }

    /// Copies the node's values into all of its descendants.
    pub fn propagate_downwards(&mut self, id: NodeId) -> Result<()> {
        let Some(source) = self.node(id)?.q_table.clone() else {
            return Ok(());
        };
        for descendant in self.descendants(id)? {
            let node = &mut self.nodes[descendant.0];
            let region = node.region;
            node.q_table
                .get_or_insert_with(|| QTable::new(region))
                .copy_region_from(&source, &region)?;
        }
        Ok(())
    }

    /// Indented dump of every node: bounds, size and station count.
    pub fn dump(&self) -> String {
        let mut out = String::new();
        self.dump_node(Self::ROOT, "", true, true, &mut out);
        out
    }

    fn dump_node(&self, id: NodeId, prefix: &str, is_last: bool, is_root: bool, out: &mut String) {
        let node = &self.nodes[id.0];
        let branch = if is_root {
            String::new()
        } else {
            format!("{}{}", prefix, if is_last { "└─ " } else { "├─ " })
        };
        out.push_str(&format!(
            "{}Node: Start({}, {}), End({}, {}), Size({}x{}), Charging Stations: {}\n",
            branch,
            node.region.start_row,
            node.region.start_col,
            node.region.end_row,
            node.region.end_col,
            node.region.height(),
            node.region.width(),
            node.station_count
        ));

        let child_prefix = if is_root {
            " ".to_string()
        } else {
            format!("{}{}", prefix, if is_last { "    " } else { "│   " })
        };
        for (i, &child) in node.children.iter().enumerate() {
            self.dump_node(child, &child_prefix, i + 1 == node.children.len(), false, out);
        }
    }
}

impl fmt::Display for PartitionTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.dump())
    }
}
