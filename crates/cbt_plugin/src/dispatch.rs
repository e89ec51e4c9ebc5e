//! Parallel dispatch substrate.
//!
//! The core never spawns threads itself. Every phase (split/merge pass,
//! reduction level) is expressed as "run this kernel once for each index in
//! `0..count`", and the return of [`Dispatcher::dispatch`] is the barrier
//! between phases: all writes of phase N are visible before phase N + 1
//! starts.
//!
//! - [`RayonDispatcher`]: rayon's thread pool (global or dedicated)
//! - [`SerialDispatcher`]: in-order loop on the calling thread, for
//!   deterministic tests and tiny trees

use std::sync::Arc;

use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuildError, ThreadPoolBuilder};

/// Executes one kernel invocation per index, then returns.
pub trait Dispatcher: Sync {
  /// Run `kernel(i)` for every `i` in `0..count`. Blocks until all
  /// invocations have finished.
  fn dispatch(&self, count: usize, kernel: &(dyn Fn(usize) + Sync));

  /// Number of workers that may run concurrently.
  fn worker_count(&self) -> usize;
}

/// Runs kernels on rayon's thread pool.
#[derive(Clone, Default)]
pub struct RayonDispatcher {
  /// Dedicated pool; `None` uses rayon's global pool.
  pool: Option<Arc<ThreadPool>>,
  /// Minimum indices per rayon task (0 = let rayon decide).
  min_len: usize,
}

impl RayonDispatcher {
  /// Dispatch on rayon's global pool.
  pub fn new() -> Self {
    Self::default()
  }

  /// Dispatch on a dedicated pool of `num_threads` workers.
  pub fn with_threads(num_threads: usize) -> Result<Self, ThreadPoolBuildError> {
    let pool = ThreadPoolBuilder::new()
      .num_threads(num_threads)
      .thread_name(|i| format!("cbt-worker-{}", i))
      .build()?;
    Ok(Self {
      pool: Some(Arc::new(pool)),
      min_len: 0,
    })
  }

  /// Group at least `min_len` indices into each rayon task, the CPU analog
  /// of a GPU workgroup size.
  pub fn with_min_len(mut self, min_len: usize) -> Self {
    self.min_len = min_len;
    self
  }

  fn run(&self, count: usize, kernel: &(dyn Fn(usize) + Sync)) {
    let min_len = self.min_len.max(1);
    (0..count)
      .into_par_iter()
      .with_min_len(min_len)
      .for_each(|i| kernel(i));
  }
}

impl Dispatcher for RayonDispatcher {
  fn dispatch(&self, count: usize, kernel: &(dyn Fn(usize) + Sync)) {
    if count == 0 {
      return;
    }
    match &self.pool {
      Some(pool) => pool.install(|| self.run(count, kernel)),
      None => self.run(count, kernel),
    }
  }

  fn worker_count(&self) -> usize {
    match &self.pool {
      Some(pool) => pool.current_num_threads(),
      None => rayon::current_num_threads(),
    }
  }
}

/// Runs kernels in index order on the calling thread.
#[derive(Clone, Copy, Debug, Default)]
pub struct SerialDispatcher;

impl Dispatcher for SerialDispatcher {
  fn dispatch(&self, count: usize, kernel: &(dyn Fn(usize) + Sync)) {
    for i in 0..count {
      kernel(i);
    }
  }

  fn worker_count(&self) -> usize {
    1
  }
}

// =============================================================================
// Tests
// =============================================================================
