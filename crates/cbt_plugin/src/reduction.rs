//! SumReducer - bottom-up rebuild of every internal sum.
//!
//! After a split/merge pass only the leaf bits of a heap are reliable. The
//! reducer recomputes each internal node as the sum of its two children,
//! from depth `D - 1` up to the root.
//!
//! Within a level all nodes are independent (one worker per node). Across
//! levels the order is strict: level `k + 1` must be committed before level
//! `k` is read. Each level is one dispatch, so the dispatch barrier is the
//! only synchronization point.
//!
//! # Strategies
//!
//! - [`ReductionStrategy::LevelByLevel`]: one dispatch per level.
//! - [`ReductionStrategy::Prepass`]: one wide dispatch where each worker
//!   folds the 32 leaf bits of a depth `D - 5` subtree into the five levels
//!   above them with popcounts, then one dispatch per remaining level. Same
//!   result, fewer barriers.

use crate::dispatch::Dispatcher;
use crate::heap::BitHeap;
use crate::node::CbtNode;

/// Levels folded by one prepass worker.
pub const PREPASS_LEVELS: u32 = 5;

/// Leaf bits read by one prepass worker.
const PREPASS_LEAVES: u32 = 1 << PREPASS_LEVELS;

/// How the reduction distributes its work.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ReductionStrategy {
  /// One dispatch per level, deepest first.
  #[default]
  LevelByLevel,
  /// Wide popcount prepass over the bottom five levels, then one dispatch
  /// per level. Falls back to level-by-level for trees shallower than five.
  Prepass,
}

/// Rebuilds internal sums of a [`BitHeap`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SumReducer {
  pub strategy: ReductionStrategy,
}

impl SumReducer {
  pub fn new(strategy: ReductionStrategy) -> Self {
    Self { strategy }
  }

  /// Recompute every internal node and return the active element count.
  #[cfg_attr(feature = "profiling", tracing::instrument(skip_all, name = "cbt::reduce"))]
  pub fn reduce<D: Dispatcher + ?Sized>(&self, heap: &BitHeap, dispatcher: &D) -> u64 {
    let max_depth = heap.max_depth();

    let first_level = match self.strategy {
      ReductionStrategy::Prepass if max_depth >= PREPASS_LEVELS => {
        prepass(heap, dispatcher);
        max_depth - PREPASS_LEVELS
      }
      _ => max_depth,
    };

    for depth in (0..first_level).rev() {
      reduce_level(heap, depth, dispatcher);
    }

    let active_count = heap.active_count();
    tracing::trace!(max_depth, active_count, "sum reduction complete");
    active_count
  }
}

/// Recompute every node at `depth` from its two children.
pub fn reduce_level<D: Dispatcher + ?Sized>(heap: &BitHeap, depth: u32, dispatcher: &D) {
  let first = 1u64 << depth;
  dispatcher.dispatch(first as usize, &|i| {
    let node = CbtNode::new(first + i as u64, depth);
    let sum = heap.read(node.left_child()) + heap.read(node.right_child());
    heap.write(node, sum);
  });
}

/// Reduce the bottom five levels in one dispatch.
///
/// Worker `j` owns the subtree rooted at node `2^(D-5) + j` and only writes
/// fields inside it.
fn prepass<D: Dispatcher + ?Sized>(heap: &BitHeap, dispatcher: &D) {
  let max_depth = heap.max_depth();
  let subtree_depth = max_depth - PREPASS_LEVELS;
  let subtree_count = 1u64 << subtree_depth;
  let leaf_base = 1u64 << max_depth;

  dispatcher.dispatch(subtree_count as usize, &|j| {
    let j = j as u64;
    let first_leaf = CbtNode::new(leaf_base + j * PREPASS_LEAVES as u64, max_depth);
    let bits = heap.read_leaf_bits(first_leaf, PREPASS_LEAVES);

    for level in 1..=PREPASS_LEVELS {
      let depth = max_depth - level;
      let node_count = PREPASS_LEAVES >> level;
      let span = 1u32 << level;
      let span_mask = (1u64 << span) - 1;
      let level_base = (1u64 << depth) + j * node_count as u64;

      for n in 0..node_count {
        let sum = (bits >> (n * span)) & span_mask;
        heap.write(CbtNode::new(level_base + n as u64, depth), sum.count_ones() as u64);
      }
    }
  });
}

#[cfg(test)]
#[path = "reduction_test.rs"]
mod reduction_test;
