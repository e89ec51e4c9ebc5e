//! LEB codec - geometry and topology from tree position alone.
//!
//! Longest edge bisection splits a triangle through the midpoint of its
//! hypotenuse. Applied recursively, every heap node maps to exactly one
//! triangle: the bits of its index below the most significant one are the
//! sequence of bisection choices from the base shape.
//!
//! # Conventions
//!
//! ```text
//!          v1 (apex)
//!          /\
//!   Left  /  \  Right
//!        /    \
//!      v0------v2
//!      Hypotenuse
//! ```
//!
//! Bisecting with bit 0 yields `(v0, m, v1)`, with bit 1 `(v1, m, v2)`,
//! where `m` is the hypotenuse midpoint.
//!
//! # Module Structure
//!
//! - [`neighbors`]: same-depth neighbor ids and diamond parents
//! - [`geometry`]: decode matrices, attribute arrays, element triangles
//! - [`meshlet`]: instanced sub-triangulation built with the codec

pub mod geometry;
pub mod meshlet;
pub mod neighbors;

pub use geometry::{
  decode_attribute_array, decode_element, decode_transform, ElementTemplate, Triangle,
};
pub use meshlet::Meshlet;
pub use neighbors::{
  decode_diamond_parent, decode_same_depth_neighbors, edge_neighbor, DiamondParent,
  SameDepthNeighbors,
};

/// Base polygon the tree subdivides.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum BaseShape {
  /// The root is the template triangle.
  Triangle,
  /// The root is a parallelogram made of two template triangles sharing
  /// their hypotenuse. Only depth >= 1 nodes are elements.
  #[default]
  Square,
}

impl BaseShape {
  /// Shallowest depth at which a node is an element.
  #[inline]
  pub fn min_depth(self) -> u32 {
    match self {
      BaseShape::Triangle => 0,
      BaseShape::Square => 1,
    }
  }

  /// Smallest node id at [`min_depth`](BaseShape::min_depth).
  #[inline]
  pub fn min_id(self) -> u64 {
    1u64 << self.min_depth()
  }
}

/// Edge of an element, named relative to its apex `v1`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Edge {
  /// `v0 - v1`.
  Left,
  /// `v1 - v2`.
  Right,
  /// `v0 - v2`, the longest edge.
  Hypotenuse,
}

impl Edge {
  pub const ALL: [Edge; 3] = [Edge::Left, Edge::Right, Edge::Hypotenuse];

  /// Edge through which a same-depth neighbor sees this element.
  ///
  /// Neighbor winding is mirrored, so left and right swap.
  #[inline]
  pub fn opposite(self) -> Self {
    match self {
      Edge::Left => Edge::Right,
      Edge::Right => Edge::Left,
      Edge::Hypotenuse => Edge::Hypotenuse,
    }
  }

  /// Indices of the two template vertices bounding this edge.
  #[inline]
  pub fn vertex_indices(self) -> [usize; 2] {
    match self {
      Edge::Left => [0, 1],
      Edge::Right => [1, 2],
      Edge::Hypotenuse => [0, 2],
    }
  }
}
