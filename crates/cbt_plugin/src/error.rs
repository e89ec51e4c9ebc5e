//! Construction-time errors.
//!
//! Only heap and session construction can fail. Everything that happens
//! per frame (clamped splits, boundary neighbor queries) is handled in-band.

use thiserror::Error;

use crate::leb::BaseShape;

/// The requested tree does not fit the heap.
///
/// Fatal at construction time. There is no recovery mid-session: a heap is
/// never resized.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CapacityError {
  /// Max depth above what node indices and the bit layout can address.
  #[error("max depth {requested} exceeds the supported maximum of {supported}")]
  MaxDepth { requested: u32, supported: u32 },

  /// More initial leaves than the deepest level holds.
  #[error("initial active count {requested} exceeds capacity {capacity}")]
  InitialCount { requested: u64, capacity: u64 },

  /// Initial depth deeper than the tree.
  #[error("initial depth {requested} exceeds max depth {max_depth}")]
  InitialDepth { requested: u32, max_depth: u32 },

  /// The base shape cannot be represented at the requested depth.
  #[error("{shape:?} base shape needs depth {min_depth}, got {requested}")]
  ShapeDepth {
    shape: BaseShape,
    min_depth: u32,
    requested: u32,
  },

  /// Zero elements per workgroup.
  #[error("workgroup size must be at least 1")]
  WorkgroupSize,

  /// The heap words could not be allocated.
  #[error("failed to allocate {bytes} bytes of heap")]
  Allocation { bytes: usize },
}
