//! Parallel execution utilities on top of rayon
//!
//! Three patterns are used throughout the crate:
//!
//! - [`fork_join_chunks`]: split a read-only list into fixed-size chunks,
//!   process each chunk as an independent task and sum the results.
//! - [`Executor::install`]: run a batch (e.g. several partition trainers)
//!   inside a dedicated worker pool.
//! - [`barrier_round`]: run one unit of work per participant concurrently and
//!   return only after every participant has finished. This is the join
//!   barrier between federated blocks and their aggregation.

use rayon::prelude::*;
use std::ops::Add;

use crate::error::Result;

/// Worker pool used for node-level and evaluation parallelism.
pub struct Executor {
    pool: Option<rayon::ThreadPool>,
}

impl Executor {
    /// Dedicated pool with `threads` workers, or the global rayon pool for `None`.
    pub fn new(threads: Option<usize>) -> Result<Self> {
        let pool = match threads {
            Some(n) => Some(
                rayon::ThreadPoolBuilder::new()
                    .num_threads(n)
                    .thread_name(|i| format!("mazeq-worker-{}", i))
                    .build()?,
            ),
            None => None,
        };
        Ok(Executor { pool })
    }

    /// Executor backed by the global rayon pool
    pub fn global() -> Self {
        Executor { pool: None }
    }

    /// Runs `op` with this executor's workers available to nested parallel calls.
    pub fn install<OP, R>(&self, op: OP) -> R
    where
        OP: FnOnce() -> R + Send,
        R: Send,
    {
        match &self.pool {
            Some(pool) => pool.install(op),
            None => op(),
        }
    }

    pub fn num_threads(&self) -> usize {
        match &self.pool {
            Some(pool) => pool.current_num_threads(),
            None => rayon::current_num_threads(),
        }
    }
}

impl Default for Executor {
    fn default() -> Self {
        Self::global()
    }
}

/// Processes `items` in chunks of `chunk_size` concurrently and sums the per-chunk results.
pub fn fork_join_chunks<T, A, F>(items: &[T], chunk_size: usize, process: F) -> A
where
    T: Sync,
    A: Default + Send + Add<Output = A>,
    F: Fn(&[T]) -> A + Sync + Send,
{
    items
        .par_chunks(chunk_size.max(1))
        .map(process)
        .reduce(A::default, |a, b| a + b)
}

/// Fallible [`fork_join_chunks`]; the first error in chunk order is returned.
pub fn try_fork_join_chunks<T, A, F>(items: &[T], chunk_size: usize, process: F) -> Result<A>
where
    T: Sync,
    A: Default + Send + Add<Output = A>,
    F: Fn(&[T]) -> Result<A> + Sync + Send,
{
    let partials = items
        .par_chunks(chunk_size.max(1))
        .map(process)
        .collect::<Result<Vec<A>>>()?;
    Ok(partials.into_iter().fold(A::default(), |a, b| a + b))
}

/// Runs `work` once per participant concurrently; returns after all have finished.
///
/// Stops at the first error, but still only after every started task returned.
pub fn barrier_round<P, F>(participants: &mut [P], work: F) -> Result<()>
where
    P: Send,
    F: Fn(usize, &mut P) -> Result<()> + Sync + Send,
{
    participants
        .par_iter_mut()
        .enumerate()
        .try_for_each(|(index, participant)| work(index, participant))
}
