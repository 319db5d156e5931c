//! # Adaptive hierarchy controller
//!
//! Decides which partitions to (re)train after the maze changed, trains
//! them, merges the results through the tree and escalates towards the
//! root while trained nodes stay below the success threshold.
//!
//! Training a batch happens in two phases. First every selected node is
//! trained on an owned copy of its table, concurrently unless
//! `parallel_nodes` is off. Then, in batch order, each trained table is
//! installed and propagated upwards and downwards, after which the success
//! rate of every touched node is recomputed and stored as its baseline.
//!
//! ```rust,no_run
//! use mazeq::config::{TrainingConfig, TrainingMode};
//! use mazeq::maze::{CellProbabilities, Maze};
//! use mazeq::strategy::HierarchyController;
//! use mazeq::tree::PartitionTree;
//! use mazeq::types::CellKind;
//! use rand::{rngs::StdRng, SeedableRng};
//!
//! let mut rng = StdRng::seed_from_u64(1);
//! let maze = Maze::generate(40, 40, CellProbabilities::new(0.8, 0.15, 0.05), &mut rng).unwrap();
//! let mut tree = PartitionTree::new(maze, 20).unwrap();
//! let mut controller = HierarchyController::new(TrainingConfig::default()).unwrap();
//!
//! controller.smart_hierarchy(&mut tree, &[], TrainingMode::SingleAgent).unwrap();
//!
//! tree.set_cell((3, 7), CellKind::Obstacle).unwrap();
//! let changed = tree.changed_leaves(&[(3, 7)]);
//! let report = controller.smart_hierarchy(&mut tree, &changed, TrainingMode::SingleAgent).unwrap();
//! println!("retrained {} nodes in {:?}", report.trained.len(), report.elapsed);
//! ```

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::time::{Duration, Instant};

use crate::agent::{trainer_for, TrainOutcome};
use crate::config::{TrainingConfig, TrainingMode};
use crate::error::Result;
use crate::parallel::Executor;
use crate::tree::{NodeId, PartitionTree};

/// `true` if a node whose success rate went from `baseline` to `current`
/// has to be retrained.
pub fn needs_retraining(baseline: f64, current: f64, config: &TrainingConfig) -> bool {
    baseline - current > config.retrain_delta || current < config.success_threshold
}

/// Which nodes an adaptation call trains
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdaptationStrategy {
    /// Leaves first, escalating to parents while success stays low
    SmartHierarchy(TrainingMode),
    /// Single-agent training of exactly the changed leaves
    LeavesOnly,
}

/// Summary of one adaptation call
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AdaptationReport {
    pub elapsed: Duration,
    /// Node indices in the order they were trained
    pub trained: Vec<usize>,
    /// Escalation levels above the leaves that trained at least one node
    pub levels: usize,
    /// Episodes (or federated rounds) run during this call
    pub episodes: usize,
}

pub struct HierarchyController {
    config: TrainingConfig,
    executor: Executor,
    rng: StdRng,
}

impl HierarchyController {
    pub fn new(config: TrainingConfig) -> Result<Self> {
        config.validate()?;
        let executor = Executor::new(config.worker_threads)?;
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Ok(HierarchyController { config, executor, rng })
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    pub fn executor(&self) -> &Executor {
        &self.executor
    }

    /// Runs `strategy` for the given changed leaves (empty = initial training).
    pub fn adapt(
        &mut self,
        tree: &mut PartitionTree,
        changed: &[NodeId],
        strategy: AdaptationStrategy,
    ) -> Result<AdaptationReport> {
        match strategy {
            AdaptationStrategy::SmartHierarchy(mode) => self.smart_hierarchy(tree, changed, mode),
            AdaptationStrategy::LeavesOnly => self.only_train_leaves(tree, changed),
        }
    }

    /// Current policy success rate of `id`
    pub fn success_rate(&self, tree: &PartitionTree, id: NodeId) -> Result<f64> {
        let (chunk, branching) = (self.config.chunk_size, self.config.policy_branching);
        self.executor.install(|| tree.success_rate(id, chunk, branching))
    }

    /// Trains `nodes` as one batch, merges the results into the tree and
    /// refreshes the baseline of every trained node and its descendants.
    pub fn train_nodes(
        &mut self,
        tree: &mut PartitionTree,
        nodes: &[NodeId],
        mode: TrainingMode,
    ) -> Result<usize> {
        if nodes.is_empty() {
            return Ok(0);
        }
        let trainer = trainer_for(mode, &self.config);
        log::info!("training {} node(s) with {}", nodes.len(), trainer.name());

        let mut jobs = Vec::with_capacity(nodes.len());
        for &id in nodes {
            jobs.push((tree.snapshot_q_table(id)?, StdRng::seed_from_u64(self.rng.gen())));
        }

        let maze = tree.maze();
        let trainer = trainer.as_ref();
        let outcomes: Vec<TrainOutcome> = if self.config.parallel_nodes {
            self.executor.install(|| {
                jobs.into_par_iter()
                    .map(|(table, mut rng)| trainer.train(maze, table, &mut rng))
                    .collect::<Result<Vec<_>>>()
            })?
        } else {
            jobs.into_iter()
                .map(|(table, mut rng)| trainer.train(maze, table, &mut rng))
                .collect::<Result<Vec<_>>>()?
        };

        let mut episodes = 0;
        for (&id, outcome) in nodes.iter().zip(outcomes) {
            log::debug!(
                "node {}: {} episodes, converged: {}, final epsilon {:.3}",
                id,
                outcome.episodes,
                outcome.converged,
                outcome.final_epsilon
            );
            episodes += outcome.episodes;
            tree.install_q_table(id, outcome.table)?;
            tree.propagate_upwards(id)?;
            tree.propagate_downwards(id)?;
        }
        tree.add_episodes(episodes);

        self.refresh_success_rates(tree, nodes)?;
        Ok(episodes)
    }

    /// Recomputes the baseline of each node in `nodes` and of all their
    /// descendants that own a table.
    fn refresh_success_rates(&self, tree: &mut PartitionTree, nodes: &[NodeId]) -> Result<()> {
        let mut visited = HashSet::new();
        for &id in nodes {
            let mut stack = vec![id];
            while let Some(current) = stack.pop() {
                if !visited.insert(current) {
                    continue;
                }
                let node = tree.node(current)?;
                stack.extend(node.children().iter().copied());
                if node.q_table().is_none() {
                    continue;
                }
                let region = *node.region();
                let rate = self.success_rate(tree, current)?;
                tree.set_baseline(current, rate)?;
                log::info!("node {} {}: success rate {:.2}%", current, region, rate * 100.0);
            }
        }
        Ok(())
    }

    fn has_passable_cell(tree: &PartitionTree, id: NodeId) -> Result<bool> {
        let region = *tree.node(id)?.region();
        let found = region.cells().any(|pos| tree.maze().is_passable(pos));
        Ok(found)
    }

    /// Drops nodes whose region is entirely blocked; nothing can start there.
    fn trainable(tree: &PartitionTree, nodes: Vec<NodeId>) -> Result<Vec<NodeId>> {
        let mut kept = Vec::with_capacity(nodes.len());
        for id in nodes {
            if Self::has_passable_cell(tree, id)? {
                kept.push(id);
            } else {
                log::warn!("skipping node {}: no passable cell in {}", id, tree.node(id)?.region());
            }
        }
        Ok(kept)
    }

    /// Applies the retraining rule to a trained node; raises its baseline
    /// when the policy improved.
    fn check_trained(&self, tree: &mut PartitionTree, id: NodeId) -> Result<bool> {
        let baseline = tree.node(id)?.baseline_success_rate();
        let current = self.success_rate(tree, id)?;
        log::info!(
            "node {} {}: success rate {:.2}% (baseline {:.2}%)",
            id,
            tree.node(id)?.region(),
            current * 100.0,
            baseline * 100.0
        );
        if needs_retraining(baseline, current, &self.config) {
            return Ok(true);
        }
        if current > baseline {
            tree.set_baseline(id, current)?;
        }
        Ok(false)
    }

    /// Parents of trained nodes that stayed below the success threshold.
    fn weak_parents(&self, tree: &PartitionTree, trained: &[NodeId]) -> Result<BTreeSet<NodeId>> {
        let mut parents = BTreeSet::new();
        for &id in trained {
            let node = tree.node(id)?;
            if node.baseline_success_rate() < self.config.success_threshold {
                if let Some(parent) = node.parent() {
                    parents.insert(parent);
                }
            }
        }
        Ok(parents)
    }

    /// Hierarchical adaptation.
    ///
    /// With no changed leaves every leaf is trained. Otherwise only changed
    /// leaves whose policy degraded are retrained. Parents of trained nodes
    /// that remain below the success threshold are then examined level by
    /// level up to the root.
    pub fn smart_hierarchy(
        &mut self,
        tree: &mut PartitionTree,
        changed: &[NodeId],
        mode: TrainingMode,
    ) -> Result<AdaptationReport> {
        let started = Instant::now();
        let mut report = AdaptationReport::default();

        let to_train: Vec<NodeId> = if changed.is_empty() {
            log::info!("initial training of all leaves ({})", mode.name());
            Self::trainable(tree, tree.leaves())?
        } else {
            let mut selected = Vec::new();
            for &leaf in changed {
                if tree.node(leaf)?.is_trained() {
                    if self.check_trained(tree, leaf)? {
                        selected.push(leaf);
                    }
                } else if Self::has_passable_cell(tree, leaf)? {
                    selected.push(leaf);
                }
            }
            selected
        };

        if to_train.is_empty() {
            log::info!("no partition needs retraining");
            report.elapsed = started.elapsed();
            return Ok(report);
        }

        report.episodes += self.train_nodes(tree, &to_train, mode)?;
        report.trained.extend(to_train.iter().map(|id| id.index()));

        let mut level = self.weak_parents(tree, &to_train)?;
        while !level.is_empty() {
            let mut batch = Vec::new();
            for &id in &level {
                if !tree.node(id)?.is_trained() {
                    if Self::has_passable_cell(tree, id)? {
                        batch.push(id);
                    }
                } else if self.check_trained(tree, id)? {
                    batch.push(id);
                }
            }
            if batch.is_empty() {
                break;
            }
            // leaves at different depths can put a node and its ancestor in
            // the same level; the ancestor covers it
            let outer = tree.outermost(&batch)?;
            if outer.len() < batch.len() {
                log::debug!(
                    "escalation level {}: {} node(s) covered by an ancestor in the batch",
                    report.levels + 1,
                    batch.len() - outer.len()
                );
            }
            let batch = outer;

            report.levels += 1;
            log::info!("escalation level {}: training {} node(s)", report.levels, batch.len());
            report.episodes += self.train_nodes(tree, &batch, mode)?;
            report.trained.extend(batch.iter().map(|id| id.index()));
            level = self.weak_parents(tree, &batch)?;
        }

        report.elapsed = started.elapsed();
        log::info!(
            "adaptation finished in {:.2?}: {} node(s) trained over {} escalation level(s)",
            report.elapsed,
            report.trained.len(),
            report.levels
        );
        Ok(report)
    }

    /// Leaf-only baseline: trains every leaf initially, afterwards exactly
    /// the changed leaves, always with the single-agent trainer.
    pub fn only_train_leaves(
        &mut self,
        tree: &mut PartitionTree,
        changed: &[NodeId],
    ) -> Result<AdaptationReport> {
        let started = Instant::now();
        let nodes = if changed.is_empty() {
            Self::trainable(tree, tree.leaves())?
        } else {
            Self::trainable(tree, changed.to_vec())?
        };

        let episodes = self.train_nodes(tree, &nodes, TrainingMode::SingleAgent)?;
        Ok(AdaptationReport {
            elapsed: started.elapsed(),
            trained: nodes.iter().map(|id| id.index()).collect(),
            levels: 0,
            episodes,
        })
    }
}
