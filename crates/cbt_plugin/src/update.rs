//! SplitMergeKernel - one data-parallel split or merge pass.
//!
//! One worker per active element of the snapshot heap. Workers read only
//! the snapshot and write only leaf bits of the target heap, so the pass is
//! free of read/write races: every target write is an idempotent atomic bit
//! set (split) or bit clear (merge), and no worker observes another's writes
//! until the next reduction.
//!
//! # Passes
//!
//! Splits and merges alternate by epoch parity. A single pass never mixes
//! them, so a bit set by one worker is never cleared by another.
//!
//! # Conformity
//!
//! A split walks the chain of hypotenuse neighbors and splits each of them
//! and its parent until the chain leaves the base shape, so no element ever
//! gets a vertex in the middle of its neighbor's edge.
//!
//! A merge collapses a whole diamond (the children of two parents sharing a
//! hypotenuse) at once, and only when both parents hold exactly two leaves.

use std::sync::atomic::{AtomicU64, Ordering};

use smallvec::SmallVec;

use crate::dispatch::Dispatcher;
use crate::heap::BitHeap;
use crate::leb::neighbors::hypotenuse_neighbor_id;
use crate::leb::{decode_diamond_parent, decode_element, BaseShape, DiamondParent, ElementTemplate};
use crate::lod::{LodCriterion, LodDecision};
use crate::node::CbtNode;

/// Which operation a pass performs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum UpdatePass {
  Split,
  Merge,
}

impl UpdatePass {
  /// Even epochs split, odd epochs merge.
  #[inline]
  pub fn for_epoch(epoch: u64) -> Self {
    if epoch & 1 == 0 {
      UpdatePass::Split
    } else {
      UpdatePass::Merge
    }
  }

  /// The pass that follows this one.
  #[inline]
  pub fn next(self) -> Self {
    match self {
      UpdatePass::Split => UpdatePass::Merge,
      UpdatePass::Merge => UpdatePass::Split,
    }
  }
}

/// Counters of one pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PassStats {
  /// Elements whose criterion asked for a split.
  pub split_requests: u64,
  /// Extra splits along hypotenuse chains to keep the mesh conforming.
  pub neighbor_splits: u64,
  /// Split requests ignored because the element is at max depth.
  pub clamped_splits: u64,
  /// Leaf bits cleared by diamond merges.
  pub merged_leaves: u64,
}

impl PassStats {
  /// Split operations issued, requested or enforced.
  #[inline]
  pub fn total_splits(&self) -> u64 {
    self.split_requests - self.clamped_splits + self.neighbor_splits
  }

  /// True when the pass changed nothing.
  #[inline]
  pub fn is_idle(&self) -> bool {
    self.total_splits() == 0 && self.merged_leaves == 0
  }
}

/// Shared counters updated by workers.
#[derive(Default)]
struct PassCounters {
  split_requests: AtomicU64,
  neighbor_splits: AtomicU64,
  clamped_splits: AtomicU64,
  merged_leaves: AtomicU64,
}

impl PassCounters {
  #[inline]
  fn add(counter: &AtomicU64, value: u64) {
    if value > 0 {
      counter.fetch_add(value, Ordering::Relaxed);
    }
  }

  fn into_stats(self) -> PassStats {
    PassStats {
      split_requests: self.split_requests.into_inner(),
      neighbor_splits: self.neighbor_splits.into_inner(),
      clamped_splits: self.clamped_splits.into_inner(),
      merged_leaves: self.merged_leaves.into_inner(),
    }
  }
}

/// Result of a conforming split.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SplitOutcome {
  /// The element is at max depth; nothing was written.
  Clamped,
  /// The element and `neighbor_splits` chain nodes were split.
  Split { neighbor_splits: u64 },
}

/// Activate the right child of `node`. Returns false at max depth.
#[inline]
pub fn split_node(heap: &BitHeap, node: CbtNode) -> bool {
  if node.depth >= heap.max_depth() {
    return false;
  }
  heap.set_leaf_bit(node.right_child(), true);
  true
}

/// Deactivate the right sibling of `node`, folding it into the left one.
#[inline]
pub fn merge_node(heap: &BitHeap, node: CbtNode) {
  debug_assert!(!node.is_root() && !node.is_null());
  heap.set_leaf_bit(node.right_sibling(), false);
}

/// Split `node` and every element along its hypotenuse chain.
pub fn split_node_conforming(heap: &BitHeap, node: CbtNode, shape: BaseShape) -> SplitOutcome {
  if !split_node(heap, node) {
    return SplitOutcome::Clamped;
  }

  // The root is split whenever any element exists below it.
  let min_id = shape.min_id();
  let walkable = |iter: CbtNode| iter.id >= min_id && !iter.is_root();
  let mut neighbor_splits = 0;
  let mut iter = hypotenuse_neighbor(node, shape);

  while walkable(iter) {
    split_node(heap, iter);
    neighbor_splits += 1;

    iter = iter.parent();
    if walkable(iter) {
      split_node(heap, iter);
      neighbor_splits += 1;
      iter = hypotenuse_neighbor(iter, shape);
    }
  }

  SplitOutcome::Split { neighbor_splits }
}

/// Collapse the diamond of `node` if both its parents hold two leaves in
/// the snapshot. Returns the number of leaf bits cleared in `target`.
pub fn merge_node_conforming(
  snapshot: &BitHeap,
  target: &BitHeap,
  node: CbtNode,
  shape: BaseShape,
) -> u64 {
  if node.depth <= shape.min_depth() {
    return 0;
  }

  let diamond = decode_diamond_parent(node, shape);
  if !is_mergeable(snapshot, &diamond) {
    return 0;
  }

  merge_node(target, diamond.base.right_child());
  if diamond.is_boundary() {
    return 1;
  }
  merge_node(target, diamond.top.right_child());
  2
}

/// Run one split or merge pass over every active element of `snapshot`.
///
/// `target` must hold a copy of `snapshot` on entry; its internal sums are
/// stale on return until the next reduction.
pub fn run_update_pass<C, D>(
  snapshot: &BitHeap,
  target: &BitHeap,
  pass: UpdatePass,
  shape: BaseShape,
  template: &ElementTemplate,
  criterion: &C,
  dispatcher: &D,
) -> PassStats
where
  C: LodCriterion + ?Sized,
  D: Dispatcher + ?Sized,
{
  debug_assert_eq!(snapshot.max_depth(), target.max_depth());
  debug_assert!(!std::ptr::eq(snapshot, target), "snapshot and target must differ");

  #[cfg(feature = "profiling")]
  let _span = tracing::info_span!("update_pass", ?pass).entered();

  let active_count = snapshot.active_count();
  let counters = PassCounters::default();

  match pass {
    UpdatePass::Split => dispatcher.dispatch(active_count as usize, &|rank| {
      let node = snapshot.decode_node(rank as u64);
      let element = decode_element(node, shape, template);
      if criterion.evaluate(&element) != LodDecision::Split {
        return;
      }

      PassCounters::add(&counters.split_requests, 1);
      match split_node_conforming(target, node, shape) {
        SplitOutcome::Clamped => PassCounters::add(&counters.clamped_splits, 1),
        SplitOutcome::Split { neighbor_splits } => {
          PassCounters::add(&counters.neighbor_splits, neighbor_splits)
        }
      }
    }),
    UpdatePass::Merge => dispatcher.dispatch(active_count as usize, &|rank| {
      let node = snapshot.decode_node(rank as u64);
      if node.depth <= shape.min_depth() {
        return;
      }

      let diamond = decode_diamond_parent(node, shape);
      if !is_diamond_representative(node, &diamond)
        || !is_mergeable(snapshot, &diamond)
        || !diamond_wants_merge(&diamond, shape, template, criterion)
      {
        return;
      }

      let cleared = merge_node_conforming(snapshot, target, node, shape);
      PassCounters::add(&counters.merged_leaves, cleared);
    }),
  }

  let stats = counters.into_stats();
  if stats.clamped_splits > 0 {
    tracing::debug!(
      clamped = stats.clamped_splits,
      max_depth = snapshot.max_depth(),
      "split requests clamped at max depth"
    );
  }
  tracing::trace!(?pass, active_count, ?stats, "update pass complete");
  stats
}

/// Hypotenuse neighbor of `node`, or `CbtNode::NULL` at the boundary.
#[inline]
fn hypotenuse_neighbor(node: CbtNode, shape: BaseShape) -> CbtNode {
  match hypotenuse_neighbor_id(node, shape) {
    0 => CbtNode::NULL,
    id => CbtNode::new(id, node.depth),
  }
}

/// Both diamond parents hold exactly their two children.
#[inline]
fn is_mergeable(snapshot: &BitHeap, diamond: &DiamondParent) -> bool {
  snapshot.read(diamond.base) <= 2 && snapshot.read(diamond.top) <= 2
}

/// One worker acts for the whole diamond: the left child of the parent with
/// the smaller id.
#[inline]
fn is_diamond_representative(node: CbtNode, diamond: &DiamondParent) -> bool {
  !node.is_right_child() && diamond.base.id <= diamond.top.id
}

/// Every leaf of the diamond asks to merge and neither parent would split
/// again right away.
fn diamond_wants_merge<C: LodCriterion + ?Sized>(
  diamond: &DiamondParent,
  shape: BaseShape,
  template: &ElementTemplate,
  criterion: &C,
) -> bool {
  let mut parents: SmallVec<[CbtNode; 2]> = SmallVec::new();
  parents.push(diamond.base);
  if !diamond.is_boundary() {
    parents.push(diamond.top);
  }

  let leaves: SmallVec<[CbtNode; 4]> = parents
    .iter()
    .flat_map(|parent| [parent.left_child(), parent.right_child()])
    .collect();

  let decide = |node: CbtNode| criterion.evaluate(&decode_element(node, shape, template));

  leaves.iter().all(|&leaf| decide(leaf) == LodDecision::Merge)
    && parents.iter().all(|&parent| decide(parent) != LodDecision::Split)
}

#[cfg(test)]
#[path = "update_test.rs"]
mod update_test;
