//! BitHeap - packed sum-reduction heap over a perfect binary tree.
//!
//! Every node of a tree of fixed max depth `D` owns a bit field in one flat
//! array of `AtomicU64` words. Leaves (depth `D`) store a single activity bit,
//! internal nodes store the number of active leaf bits below them.
//!
//! # Layout
//!
//! ```text
//! total bits          = 2^(D+2)
//! field width(depth)  = D - depth + 1
//! field offset(node)  = 2^(depth+1) + id * width(depth)
//! ```
//!
//! Fields are packed level after level with no padding, so a field may
//! straddle two words.
//!
//! # Encoding of active elements
//!
//! An active element at depth `d < D` is the leaf bit of its ceil node (its
//! leftmost descendant at depth `D`). All other leaf bits of its subtree are
//! zero. Internal sums are only meaningful after a reduction pass; writing a
//! leaf bit never touches its ancestors.
//!
//! # Concurrency
//!
//! All accesses are atomic. Workers in the same phase either write disjoint
//! fields or perform idempotent bit sets/clears, and phases are separated by
//! the dispatch barrier, so `Relaxed` ordering is sufficient.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::dispatch::SerialDispatcher;
use crate::error::CapacityError;
use crate::node::CbtNode;
use crate::reduction::SumReducer;

/// Bits of `usize` kept in reserve when bounding the max depth.
pub const DEPTH_SAFETY_MARGIN: u32 = 6;

/// Deepest tree a heap can be created for on this platform.
pub const MAX_SUPPORTED_DEPTH: u32 = usize::BITS - DEPTH_SAFETY_MARGIN;

const WORD_BITS: u64 = u64::BITS as u64;

/// Initial configuration of a heap.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum HeapInit {
  /// No active element.
  #[default]
  Empty,
  /// A single maximal element (the root).
  Root,
  /// Every node at the given depth is active.
  Depth(u32),
}

/// Packed heap of leaf bits and subtree sums.
pub struct BitHeap {
  max_depth: u32,
  words: Box<[AtomicU64]>,
}

impl BitHeap {
  /// Allocate a heap for a tree of `max_depth` and initialize it.
  ///
  /// The returned heap is already reduced: `active_count()` is valid.
  pub fn new(max_depth: u32, init: HeapInit) -> Result<Self, CapacityError> {
    if max_depth > MAX_SUPPORTED_DEPTH {
      return Err(CapacityError::MaxDepth {
        requested: max_depth,
        supported: MAX_SUPPORTED_DEPTH,
      });
    }
    if let HeapInit::Depth(depth) = init {
      if depth > max_depth {
        return Err(CapacityError::InitialDepth {
          requested: depth,
          max_depth,
        });
      }
    }

    let word_count = word_count_for(max_depth);
    let mut words = Vec::new();
    words
      .try_reserve_exact(word_count)
      .map_err(|_| CapacityError::Allocation {
        bytes: word_count * std::mem::size_of::<u64>(),
      })?;
    words.resize_with(word_count, || AtomicU64::new(0));

    let heap = Self {
      max_depth,
      words: words.into_boxed_slice(),
    };
    heap.initialize(init);
    Ok(heap)
  }

  /// Allocate a heap with `initial_active_count` contiguous active leaves
  /// at max depth, starting from the leftmost one.
  ///
  /// 0 yields an empty heap. A count above `2^max_depth` is rejected.
  pub fn create(max_depth: u32, initial_active_count: u64) -> Result<Self, CapacityError> {
    if max_depth > MAX_SUPPORTED_DEPTH {
      return Err(CapacityError::MaxDepth {
        requested: max_depth,
        supported: MAX_SUPPORTED_DEPTH,
      });
    }

    let capacity = 1u64 << max_depth;
    if initial_active_count > capacity {
      return Err(CapacityError::InitialCount {
        requested: initial_active_count,
        capacity,
      });
    }

    let heap = Self::new(max_depth, HeapInit::Empty)?;
    if initial_active_count == 0 {
      return Ok(heap);
    }

    for id in capacity..capacity + initial_active_count {
      heap.set_leaf_bit(CbtNode::new(id, max_depth), true);
    }
    SumReducer::default().reduce(&heap, &SerialDispatcher);
    Ok(heap)
  }

  /// Max depth of the tree.
  #[inline]
  pub fn max_depth(&self) -> u32 {
    self.max_depth
  }

  /// Number of leaf bits (elements at max depth the heap can hold).
  #[inline]
  pub fn capacity(&self) -> u64 {
    1u64 << self.max_depth
  }

  /// Size of the packed heap in bytes.
  #[inline]
  pub fn byte_size(&self) -> usize {
    self.words.len() * std::mem::size_of::<u64>()
  }

  /// Stored value of a node: leaf bit at max depth, subtree sum above.
  #[inline]
  pub fn read(&self, node: CbtNode) -> u64 {
    debug_assert!(!node.is_null() && node.depth <= self.max_depth);
    self.read_field(self.field_offset(node), self.field_width(node))
  }

  /// Total number of active elements (the root sum).
  #[inline]
  pub fn active_count(&self) -> u64 {
    self.read(CbtNode::ROOT)
  }

  /// Activity bit of the element rooted at `node` (its ceil leaf bit).
  #[inline]
  pub fn leaf_bit(&self, node: CbtNode) -> bool {
    let ceil = node.ceil(self.max_depth);
    self.read_field(self.field_offset(ceil), 1) == 1
  }

  /// Set or clear the activity bit of the element rooted at `node`.
  ///
  /// Mutates only the leaf bit; ancestors are recomputed by the next
  /// reduction. Safe to call concurrently: the write is a single atomic
  /// read-modify-write on one bit.
  #[inline]
  pub fn set_leaf_bit(&self, node: CbtNode, active: bool) {
    let ceil = node.ceil(self.max_depth);
    let offset = self.field_offset(ceil);
    let word = &self.words[(offset / WORD_BITS) as usize];
    let mask = 1u64 << (offset % WORD_BITS);
    if active {
      word.fetch_or(mask, Ordering::Relaxed);
    } else {
      word.fetch_and(!mask, Ordering::Relaxed);
    }
  }

  /// True if `node` is an active element in the reduced heap.
  ///
  /// The element is the shallowest node of its subtree chain whose sum is 1.
  pub fn is_leaf(&self, node: CbtNode) -> bool {
    self.read(node) == 1 && (node.is_root() || self.read(node.parent()) > 1)
  }

  /// Heap node of the `rank`-th active element, `0 <= rank < active_count()`.
  ///
  /// Descends from the root, going left while `rank` is below the left
  /// child's sum. O(depth), no side table.
  pub fn decode_node(&self, rank: u64) -> CbtNode {
    debug_assert!(
      rank < self.active_count(),
      "rank {} out of range for {} active elements",
      rank,
      self.active_count()
    );

    let mut node = CbtNode::ROOT;
    let mut rank = rank;
    while node.depth < self.max_depth && self.read(node) > 1 {
      let left = node.left_child();
      let left_count = self.read(left);
      if rank < left_count {
        node = left;
      } else {
        rank -= left_count;
        node = node.right_child();
      }
    }
    node
  }

  /// Rank of the active element `node` (inverse of [`decode_node`]).
  ///
  /// [`decode_node`]: BitHeap::decode_node
  pub fn encode_node(&self, node: CbtNode) -> u64 {
    let mut rank = 0;
    let mut iter = node;
    while iter.id > 1 {
      if iter.is_right_child() {
        rank += self.read(iter.left_sibling());
      }
      iter = iter.parent();
    }
    rank
  }

  /// Clear the heap and re-initialize it.
  pub fn reset(&self, init: HeapInit) {
    for word in self.words.iter() {
      word.store(0, Ordering::Relaxed);
    }
    self.initialize(init);
  }

  /// Overwrite this heap with the contents of `other`.
  ///
  /// Both heaps must share the same max depth.
  pub fn copy_from(&self, other: &BitHeap) {
    debug_assert_eq!(self.max_depth, other.max_depth);
    for (dst, src) in self.words.iter().zip(other.words.iter()) {
      dst.store(src.load(Ordering::Relaxed), Ordering::Relaxed);
    }
  }

  /// Snapshot of the packed words.
  pub fn to_words(&self) -> Vec<u64> {
    self.words.iter().map(|w| w.load(Ordering::Relaxed)).collect()
  }

  /// Snapshot of the packed heap as bytes, ready for a GPU buffer upload.
  pub fn to_bytes(&self) -> Vec<u8> {
    bytemuck::cast_slice(&self.to_words()).to_vec()
  }

  /// Store a subtree sum. Reduction only.
  #[inline]
  pub(crate) fn write(&self, node: CbtNode, value: u64) {
    self.write_field(self.field_offset(node), self.field_width(node), value);
  }

  /// Read `count` consecutive leaf bits starting at leaf `first`.
  ///
  /// Bit `i` of the result is the bit of leaf `first.id + i`.
  #[inline]
  pub(crate) fn read_leaf_bits(&self, first: CbtNode, count: u32) -> u64 {
    debug_assert_eq!(first.depth, self.max_depth);
    self.read_field(self.field_offset(first), count)
  }

  fn initialize(&self, init: HeapInit) {
    let depth = match init {
      HeapInit::Empty => return,
      HeapInit::Root => 0,
      HeapInit::Depth(depth) => depth,
    };

    let first = 1u64 << depth;
    for id in first..(first << 1) {
      self.set_leaf_bit(CbtNode::new(id, depth), true);
    }
    SumReducer::default().reduce(self, &SerialDispatcher);
  }

  #[inline]
  fn field_width(&self, node: CbtNode) -> u32 {
    self.max_depth - node.depth + 1
  }

  #[inline]
  fn field_offset(&self, node: CbtNode) -> u64 {
    (2u64 << node.depth) + node.id * self.field_width(node) as u64
  }

  fn read_field(&self, offset: u64, count: u32) -> u64 {
    let word = (offset / WORD_BITS) as usize;
    let shift = (offset % WORD_BITS) as u32;
    let lsb_count = count.min(u64::BITS - shift);
    let msb_count = count - lsb_count;

    let lsb = (self.words[word].load(Ordering::Relaxed) >> shift) & bit_mask(lsb_count);
    if msb_count == 0 {
      return lsb;
    }
    let msb = self.words[word + 1].load(Ordering::Relaxed) & bit_mask(msb_count);
    lsb | (msb << lsb_count)
  }

  fn write_field(&self, offset: u64, count: u32, value: u64) {
    debug_assert!(value <= bit_mask(count), "{} does not fit {} bits", value, count);
    let word = (offset / WORD_BITS) as usize;
    let shift = (offset % WORD_BITS) as u32;
    let lsb_count = count.min(u64::BITS - shift);
    let msb_count = count - lsb_count;

    write_bits(&self.words[word], shift, lsb_count, value & bit_mask(lsb_count));
    if msb_count > 0 {
      write_bits(&self.words[word + 1], 0, msb_count, value >> lsb_count);
    }
  }
}

impl fmt::Debug for BitHeap {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("BitHeap")
      .field("max_depth", &self.max_depth)
      .field("active_count", &self.active_count())
      .field("byte_size", &self.byte_size())
      .finish()
  }
}

/// Number of 64-bit words backing a heap of `max_depth`.
fn word_count_for(max_depth: u32) -> usize {
  ((1u64 << (max_depth + 2)) / WORD_BITS).max(1) as usize
}

#[inline]
fn bit_mask(count: u32) -> u64 {
  if count >= u64::BITS {
    u64::MAX
  } else {
    (1u64 << count) - 1
  }
}

/// Replace `count` bits at `shift` in one atomic step.
#[inline]
fn write_bits(word: &AtomicU64, shift: u32, count: u32, value: u64) {
  let mask = bit_mask(count) << shift;
  let bits = (value << shift) & mask;
  // The closure never declines, so the update always succeeds.
  let _ = word.fetch_update(Ordering::Relaxed, Ordering::Relaxed, |current| {
    Some((current & !mask) | bits)
  });
}

#[cfg(test)]
#[path = "heap_test.rs"]
mod heap_test;
