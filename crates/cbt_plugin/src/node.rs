//! CbtNode - immutable value type representing a position in the heap.
//!
//! Nodes are identified by their 1-based heap index. The root is 1 and the
//! children of `i` are `2i` and `2i + 1`. Depth is recoverable from the
//! index (position of the highest set bit) but is carried alongside it so
//! hot paths never recompute it.

/// Concurrent binary tree node - immutable value type.
///
/// A node is not an allocated object: it is a position into the shared
/// [`BitHeap`](crate::heap::BitHeap), which owns all node state.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
pub struct CbtNode {
  /// Heap index (1-based, 0 = no node).
  pub id: u64,
  /// Depth in the tree (0 = root).
  pub depth: u32,
}

impl CbtNode {
  /// Sentinel meaning "no node" (boundary neighbor, parent of the root).
  pub const NULL: Self = Self { id: 0, depth: 0 };

  /// The root node.
  pub const ROOT: Self = Self { id: 1, depth: 0 };

  /// Create a node from an index and its depth.
  #[inline]
  pub fn new(id: u64, depth: u32) -> Self {
    debug_assert!(
      id == 0 || depth == find_msb(id),
      "node {} cannot live at depth {}",
      id,
      depth
    );
    Self { id, depth }
  }

  /// Create a node from an index, deriving the depth from its highest set
  /// bit. Index 0 yields [`CbtNode::NULL`].
  #[inline]
  pub fn from_id(id: u64) -> Self {
    if id == 0 {
      return Self::NULL;
    }
    Self {
      id,
      depth: find_msb(id),
    }
  }

  /// True for the "no node" sentinel.
  #[inline]
  pub fn is_null(&self) -> bool {
    self.id == 0
  }

  /// True for the root node.
  #[inline]
  pub fn is_root(&self) -> bool {
    self.id == 1
  }

  /// Parent node (coarser: depth - 1). The parent of the root is NULL.
  #[inline]
  pub fn parent(&self) -> Self {
    Self {
      id: self.id >> 1,
      depth: self.depth.saturating_sub(1),
    }
  }

  /// Child node selected by `bit` (0 = left, 1 = right).
  #[inline]
  pub fn child(&self, bit: u64) -> Self {
    debug_assert!(bit <= 1);
    Self {
      id: (self.id << 1) | bit,
      depth: self.depth + 1,
    }
  }

  /// Left child (finer detail: depth + 1).
  #[inline]
  pub fn left_child(&self) -> Self {
    self.child(0)
  }

  /// Right child (finer detail: depth + 1).
  #[inline]
  pub fn right_child(&self) -> Self {
    self.child(1)
  }

  /// The other child of this node's parent.
  #[inline]
  pub fn sibling(&self) -> Self {
    Self {
      id: self.id ^ 1,
      depth: self.depth,
    }
  }

  /// Left child of this node's parent (may be `self`).
  #[inline]
  pub fn left_sibling(&self) -> Self {
    Self {
      id: self.id & !1,
      depth: self.depth,
    }
  }

  /// Right child of this node's parent (may be `self`).
  #[inline]
  pub fn right_sibling(&self) -> Self {
    Self {
      id: self.id | 1,
      depth: self.depth,
    }
  }

  /// True if this node is the right child of its parent.
  #[inline]
  pub fn is_right_child(&self) -> bool {
    self.id & 1 == 1
  }

  /// Leftmost descendant at `max_depth`.
  ///
  /// An active element is stored as the leaf bit of its ceil node.
  #[inline]
  pub fn ceil(&self, max_depth: u32) -> Self {
    debug_assert!(self.depth <= max_depth);
    Self {
      id: self.id << (max_depth - self.depth),
      depth: max_depth,
    }
  }

  /// Value of bit `bit_id` of the index (0 or 1).
  #[inline]
  pub fn bit(&self, bit_id: u32) -> u64 {
    (self.id >> bit_id) & 1
  }
}

/// Position of the highest set bit. `id` must be non-zero.
#[inline]
fn find_msb(id: u64) -> u32 {
  63 - id.leading_zeros()
}

#[cfg(test)]
#[path = "node_test.rs"]
mod node_test;
