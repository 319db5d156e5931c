//! Benchmark comparison of adaptation strategies on changing mazes
//!
//! Each approach starts from the same maze and replays the same sequence of
//! obstacle moves:
//! - A* Static (paths computed once)
//! - A* Oracle (paths recomputed after every change)
//! - Leaves only
//! - Smart hierarchy with the single-agent trainer
//! - Smart hierarchy with federated equal / importance averaging

use mazeq::astar::ShortestPaths;
use mazeq::builders::TrainingConfigBuilder;
use mazeq::config::{TrainingConfig, TrainingMode};
use mazeq::maze::{move_obstacles, CellProbabilities, Maze};
use mazeq::metrics::{EvaluationReport, RunReport, Statistics};
use mazeq::strategy::{AdaptationStrategy, HierarchyController};
use mazeq::tree::PartitionTree;
use mazeq::types::Position;
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::fs::File;
use std::io::Write;
use std::time::{Duration, Instant};

const CHUNK_SIZE: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Approach {
    AStarStatic,
    AStarOracle,
    Learned(AdaptationStrategy),
}

impl Approach {
    fn all() -> Vec<(&'static str, Approach)> {
        vec![
            ("A* Static", Approach::AStarStatic),
            ("A* Oracle", Approach::AStarOracle),
            ("Leaves Only", Approach::Learned(AdaptationStrategy::LeavesOnly)),
            (
                "Single Agent",
                Approach::Learned(AdaptationStrategy::SmartHierarchy(TrainingMode::SingleAgent)),
            ),
            (
                "Fed Equal",
                Approach::Learned(AdaptationStrategy::SmartHierarchy(TrainingMode::FederatedEqual)),
            ),
            (
                "Fed Importance",
                Approach::Learned(AdaptationStrategy::SmartHierarchy(TrainingMode::FederatedImportance)),
            ),
        ]
    }
}

struct BenchmarkResult {
    approach: &'static str,
    size: usize,
    difficulty: &'static str,
    initial_time: Duration,
    adapt_times: Vec<f64>,
    steps: Vec<RunReport>,
}

impl BenchmarkResult {
    fn success(&self) -> Statistics {
        let rates: Vec<f64> = self.steps.iter().map(|s| s.success_rate).collect();
        Statistics::from_slice(&rates)
    }

    fn path_length(&self) -> Statistics {
        let lengths: Vec<f64> = self.steps.iter().map(|s| s.avg_path_length).collect();
        Statistics::from_slice(&lengths)
    }

    fn adapt_time(&self) -> Statistics {
        Statistics::from_slice(&self.adapt_times)
    }
}

/// Number of obstacles moved at one time step; mostly a single move
fn draw_change_count(rng: &mut StdRng) -> usize {
    match rng.gen_range(0..1000) {
        0..=899 => 1,
        900..=959 => 2,
        960..=979 => 3,
        980..=989 => 4,
        990..=994 => 5,
        995..=996 => 6,
        997 => 7,
        998 => 8,
        _ => 9,
    }
}

/// Pre-computes the obstacle moves of every time step so all approaches see
/// the same sequence. Each entry holds the full maze after the step and the
/// changed cells.
fn change_sequence(initial: &Maze, steps: usize, rng: &mut StdRng) -> Vec<(Maze, Vec<Position>)> {
    let mut maze = initial.clone();
    (0..steps)
        .map(|_| {
            let count = draw_change_count(rng);
            let changed = move_obstacles(&mut maze, count, rng);
            (maze.clone(), changed)
        })
        .collect()
}

fn bench_config(seed: u64) -> mazeq::error::Result<TrainingConfig> {
    TrainingConfigBuilder::new()
        .max_episodes(1500)
        .federated(6, 300, 60)
        .leaf_size(10)
        .seed(seed)
        .build()
}

fn run_approach(
    name: &'static str,
    approach: Approach,
    initial: &Maze,
    sequence: &[(Maze, Vec<Position>)],
    size: usize,
    difficulty: &'static str,
    config: &TrainingConfig,
) -> Result<BenchmarkResult, Box<dyn std::error::Error>> {
    println!("\nTesting {}", name);
    let mut tree = PartitionTree::new(initial.clone(), config.leaf_size)?;
    let mut controller = HierarchyController::new(config.clone())?;
    let mut paths = ShortestPaths::default();

    let evaluate = |tree: &PartitionTree, paths: &ShortestPaths| -> mazeq::error::Result<EvaluationReport> {
        match approach {
            Approach::Learned(_) => tree.evaluate_policy(CHUNK_SIZE, config.policy_branching),
            _ => Ok(paths.evaluate(tree.maze(), CHUNK_SIZE)),
        }
    };

    let start = Instant::now();
    match approach {
        Approach::Learned(strategy) => {
            controller.adapt(&mut tree, &[], strategy)?;
        }
        _ => paths = ShortestPaths::compute(tree.maze()),
    }
    let initial_time = start.elapsed();

    let mut steps = vec![RunReport::new(initial_time, &evaluate(&tree, &paths)?)];
    let mut adapt_times = Vec::with_capacity(sequence.len());

    for (maze, changed_cells) in sequence {
        tree.replace_maze(maze.clone())?;
        let changed = tree.changed_leaves(changed_cells);

        let start = Instant::now();
        match approach {
            Approach::AStarStatic => {}
            Approach::AStarOracle => paths = ShortestPaths::compute(tree.maze()),
            Approach::Learned(strategy) => {
                controller.adapt(&mut tree, &changed, strategy)?;
            }
        }
        let elapsed = start.elapsed();
        adapt_times.push(elapsed.as_secs_f64());
        steps.push(RunReport::new(elapsed, &evaluate(&tree, &paths)?));
    }

    let result = BenchmarkResult {
        approach: name,
        size,
        difficulty,
        initial_time,
        adapt_times,
        steps,
    };
    println!(
        "{}: initial {:.3}s, success {:.2}%, avg path {:.2}",
        name,
        result.initial_time.as_secs_f64(),
        result.success().mean * 100.0,
        result.path_length().mean
    );
    Ok(result)
}

fn generate_report(results: &[BenchmarkResult]) -> std::io::Result<()> {
    let mut file = File::create("strategy_results.md")?;

    writeln!(file, "# Adaptation Strategy Benchmark Results\n")?;
    writeln!(file, "Environment: grid maze with moving obstacles")?;
    writeln!(file, "Threads: {}\n", rayon::current_num_threads())?;

    writeln!(file, "## Policy Quality\n")?;
    writeln!(file, "| Approach | Size | Difficulty | Success Rate (%) | Min Success (%) | Avg Path Length |")?;
    writeln!(file, "|----------|------|------------|------------------|-----------------|-----------------|")?;
    for result in results {
        let success = result.success();
        writeln!(
            file,
            "| {} | {} | {} | {:.2} | {:.2} | {:.2} |",
            result.approach,
            result.size,
            result.difficulty,
            success.mean * 100.0,
            success.min * 100.0,
            result.path_length().mean
        )?;
    }

    writeln!(file, "\n## Timing\n")?;
    writeln!(file, "| Approach | Size | Difficulty | Initial (s) | Avg Adapt (ms) | Max Adapt (ms) |")?;
    writeln!(file, "|----------|------|------------|-------------|----------------|----------------|")?;
    for result in results {
        let adapt = result.adapt_time();
        writeln!(
            file,
            "| {} | {} | {} | {:.3} | {:.2} | {:.2} |",
            result.approach,
            result.size,
            result.difficulty,
            result.initial_time.as_secs_f64(),
            adapt.mean * 1000.0,
            adapt.max * 1000.0
        )?;
    }

    writeln!(file, "\n## Success Rate Chart\n")?;
    writeln!(file, "```")?;
    for result in results {
        let bar = (result.success().mean * 50.0).round() as usize;
        writeln!(
            file,
            "{:14} {:3} {:6} |{}{}| {:.1}%",
            result.approach,
            result.size,
            result.difficulty,
            "#".repeat(bar),
            " ".repeat(50 - bar.min(50)),
            result.success().mean * 100.0
        )?;
    }
    writeln!(file, "```")?;

    writeln!(file, "\n## Per-step Results\n")?;
    writeln!(file, "```")?;
    writeln!(file, "approach,size,difficulty,step,time,success_rate,avg_path_length")?;
    for result in results {
        for (step, report) in result.steps.iter().enumerate() {
            writeln!(
                file,
                "{},{},{},{},{:.6},{:.4},{:.4}",
                result.approach,
                result.size,
                result.difficulty,
                step,
                report.elapsed.as_secs_f64(),
                report.success_rate,
                report.avg_path_length
            )?;
        }
    }
    writeln!(file, "```")?;

    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("Starting Adaptation Strategy Benchmark");
    println!("======================================\n");

    let sizes = [20, 30];
    let difficulties = [
        ("Easy", CellProbabilities::new(0.8, 0.18, 0.02)),
        ("Medium", CellProbabilities::new(0.7, 0.29, 0.01)),
        ("Hard", CellProbabilities::new(0.6, 0.395, 0.005)),
    ];

    let mut results = Vec::new();
    for &size in &sizes {
        for (d, &(difficulty, probabilities)) in difficulties.iter().enumerate() {
            let seed = 50 + d as u64;
            let mut rng = StdRng::seed_from_u64(seed);
            // time steps scale with the maze size
            let time_steps = 2 * size;
            println!("\nSize {}x{}, difficulty {} ({} time steps)", size, size, difficulty, time_steps);

            let initial = Maze::generate(size, size, probabilities, &mut rng)?;
            let sequence = change_sequence(&initial, time_steps, &mut rng);
            let config = bench_config(seed)?;

            for (name, approach) in Approach::all() {
                results.push(run_approach(
                    name, approach, &initial, &sequence, size, difficulty, &config,
                )?);
            }
        }
    }

    generate_report(&results)?;

    println!("\n======================================");
    println!("Benchmark complete! Results saved to strategy_results.md");

    println!("\nSummary:");
    for result in &results {
        println!(
            "{} ({}x{}, {}): {:.2}% success, {:.2} ms avg adaptation",
            result.approach,
            result.size,
            result.size,
            result.difficulty,
            result.success().mean * 100.0,
            result.adapt_time().mean * 1000.0
        );
    }

    Ok(())
}
