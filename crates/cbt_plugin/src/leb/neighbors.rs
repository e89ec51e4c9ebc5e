//! Same-depth neighbor ids and diamond parents.
//!
//! Neighbor ids are folded from the root one bisection bit at a time, most
//! significant first, with no lookup tables and no access to the heap. A
//! neighbor id of 0 means the edge lies on the boundary of the base shape.

use super::{BaseShape, Edge};
use crate::node::CbtNode;

/// Ids of the same-depth elements across each edge of a decoded element.
///
/// Edges are named in the frame of the decoded (winding-corrected)
/// triangle, so `left` is the neighbor across `v0 - v1`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct SameDepthNeighbors {
  pub left: u64,
  pub right: u64,
  pub edge: u64,
  pub node: u64,
}

impl SameDepthNeighbors {
  /// Neighbor id across `edge` (0 at the boundary).
  #[inline]
  pub fn across(&self, edge: Edge) -> u64 {
    match edge {
      Edge::Left => self.left,
      Edge::Right => self.right,
      Edge::Hypotenuse => self.edge,
    }
  }

  /// Neighbors of the child selected by `bit`, in unwound order.
  #[inline]
  fn split(self, bit: u64) -> Self {
    let Self {
      left,
      right,
      edge,
      node,
    } = self;
    if bit == 0 {
      Self {
        left: (edge << 1) | (edge != 0) as u64,
        right: (node << 1) | 1,
        edge: (left << 1) | (left != 0) as u64,
        node: node << 1,
      }
    } else {
      Self {
        left: node << 1,
        right: edge << 1,
        edge: right << 1,
        node: (node << 1) | 1,
      }
    }
  }
}

/// The two nodes whose children form the diamond containing an element.
///
/// `base` is the element's parent. `top` is the parent's hypotenuse
/// neighbor, or `base` itself when the parent lies on the boundary.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct DiamondParent {
  pub base: CbtNode,
  pub top: CbtNode,
}

impl DiamondParent {
  /// True when the diamond is a boundary half-diamond.
  #[inline]
  pub fn is_boundary(&self) -> bool {
    self.base == self.top
  }
}

/// Neighbor ids of `node` at its own depth.
///
/// Nodes shallower than the shape's minimum depth are not elements and have
/// no neighbors.
pub fn decode_same_depth_neighbors(node: CbtNode, shape: BaseShape) -> SameDepthNeighbors {
  let min_depth = shape.min_depth();
  if node.depth < min_depth {
    return SameDepthNeighbors {
      node: node.id,
      ..Default::default()
    };
  }

  let mut neighbors = match shape {
    BaseShape::Triangle => SameDepthNeighbors {
      node: 1,
      ..Default::default()
    },
    BaseShape::Square => {
      let b = node.bit(node.depth - 1);
      SameDepthNeighbors {
        left: 0,
        right: 0,
        edge: 3 - b,
        node: 2 + b,
      }
    }
  };

  let relative_depth = node.depth - min_depth;
  for bit_id in (0..relative_depth).rev() {
    neighbors = neighbors.split(node.bit(bit_id));
  }

  // Odd relative depths are decoded with v0 and v2 swapped.
  if relative_depth & 1 == 1 {
    std::mem::swap(&mut neighbors.left, &mut neighbors.right);
  }
  neighbors
}

/// Same-depth neighbor of `node` across `edge`, `None` at the boundary.
#[inline]
pub fn edge_neighbor(node: CbtNode, edge: Edge, shape: BaseShape) -> Option<CbtNode> {
  match decode_same_depth_neighbors(node, shape).across(edge) {
    0 => None,
    id => Some(CbtNode::new(id, node.depth)),
  }
}

/// Hypotenuse neighbor id of `node`, 0 at the boundary.
#[inline]
pub(crate) fn hypotenuse_neighbor_id(node: CbtNode, shape: BaseShape) -> u64 {
  decode_same_depth_neighbors(node, shape).edge
}

/// Diamond parent of `node`.
pub fn decode_diamond_parent(node: CbtNode, shape: BaseShape) -> DiamondParent {
  let base = node.parent();
  let top = match hypotenuse_neighbor_id(base, shape) {
    0 => base,
    id => CbtNode::new(id, base.depth),
  };
  DiamondParent { base, top }
}

#[cfg(test)]
#[path = "neighbors_test.rs"]
mod neighbors_test;
