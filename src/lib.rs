//! # mazeq - Hierarchical Q-learning for dynamic grid mazes
//!
//! mazeq trains charging-station navigation policies on a 2-D grid that
//! changes over time. The grid is split into a quadtree of partitions; each
//! partition learns a tabular Q-function with a single agent or with
//! several federated agents, and learned values are merged up and copied
//! down the tree. After the grid changes, only the partitions whose policy
//! degraded are retrained, escalating to larger partitions when needed.
//!
//! ## Key Features
//!
//! - **Grid environment**: eight-way moves, obstacle and boundary handling,
//!   adaptive start-cell sampling
//! - **Q-learning**: episodic single-agent training with experience replay
//!   and a convergence check
//! - **Federated training**: equal or importance-weighted averaging of K
//!   concurrently trained agents
//! - **Adaptive hierarchy**: change-driven retraining with escalation
//! - **A* oracle**: exact shortest paths used as a reference
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use mazeq::builders::TrainingConfigBuilder;
//! use mazeq::config::TrainingMode;
//! use mazeq::maze::{CellProbabilities, Maze};
//! use mazeq::strategy::HierarchyController;
//! use mazeq::tree::PartitionTree;
//! use rand::{rngs::StdRng, SeedableRng};
//!
//! let config = TrainingConfigBuilder::new().seed(42).build().unwrap();
//! let mut rng = StdRng::seed_from_u64(42);
//! let maze = Maze::generate(50, 50, CellProbabilities::new(0.8, 0.15, 0.05), &mut rng).unwrap();
//!
//! let mut tree = PartitionTree::new(maze, config.leaf_size).unwrap();
//! let mut controller = HierarchyController::new(config).unwrap();
//! controller.smart_hierarchy(&mut tree, &[], TrainingMode::FederatedEqual).unwrap();
//!
//! let report = tree.evaluate_policy(100, 2).unwrap();
//! println!("success rate {:.1}%", report.success_rate * 100.0);
//! ```
//!
//! ## Module Organization
//!
//! - [`agent`] - Single-agent and federated partition trainers
//! - [`astar`] - A* shortest-path oracle
//! - [`builders`] - Builder for the training configuration
//! - [`config`] - Training configuration and modes
//! - [`error`] - Error types and result handling
//! - [`maze`] - Grid environment
//! - [`metrics`] - Evaluation reports and training metrics
//! - [`parallel`] - Thread pool, chunked fork-join and join barrier
//! - [`qtable`] - Region-local Q-tables
//! - [`replay_buffer`] - Experience replay
//! - [`strategy`] - Adaptive hierarchy controller
//! - [`tree`] - Partition quadtree and policy evaluation
//! - [`types`] - Actions, cell kinds, regions
//! - [`visualization`] - Text rendering of policies and metrics

pub mod agent;
pub mod astar;
pub mod builders;
pub mod config;
pub mod error;
pub mod maze;
pub mod metrics;
pub mod parallel;
pub mod qtable;
pub mod replay_buffer;
pub mod strategy;
pub mod tree;
pub mod types;
pub mod visualization;

#[cfg(test)]
mod tests;
