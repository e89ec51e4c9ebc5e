//! Element geometry from tree position.
//!
//! Each bisection bit is a 3x3 matrix acting on the three vertex values of
//! a triangle. The product of those matrices, from the base shape down to
//! the node, maps the template's vertex values to the element's. Any
//! per-vertex attribute (position component, texture coordinate, height)
//! can be pushed through the same matrix.

use glam::{Mat3, Vec3};

use super::{BaseShape, Edge};
use crate::node::CbtNode;

/// Base triangle the tree subdivides.
///
/// `v1` is the apex, `v0 - v2` the hypotenuse. For [`BaseShape::Square`]
/// the base is the parallelogram `v0, v1, v2, v0 + v2 - v1`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ElementTemplate {
  pub vertices: [Vec3; 3],
}

impl Default for ElementTemplate {
  /// Unit right triangle in the XZ plane, facing +Y. As a square base it
  /// covers `[0, 1]` on X and Z.
  fn default() -> Self {
    Self {
      vertices: [Vec3::X, Vec3::ZERO, Vec3::Z],
    }
  }
}

impl ElementTemplate {
  pub fn new(v0: Vec3, v1: Vec3, v2: Vec3) -> Self {
    Self {
      vertices: [v0, v1, v2],
    }
  }

  /// Default template scaled to cover `[0, extent]` on X and Z.
  pub fn with_extent(extent: f32) -> Self {
    let [v0, v1, v2] = Self::default().vertices;
    Self::new(v0 * extent, v1 * extent, v2 * extent)
  }

  /// Attribute array of one coordinate axis over the three vertices.
  #[inline]
  pub fn axis(&self, axis: usize) -> Vec3 {
    Vec3::new(
      self.vertices[0][axis],
      self.vertices[1][axis],
      self.vertices[2][axis],
    )
  }
}

/// One decoded element.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Triangle {
  pub vertices: [Vec3; 3],
}

impl Triangle {
  pub fn new(v0: Vec3, v1: Vec3, v2: Vec3) -> Self {
    Self {
      vertices: [v0, v1, v2],
    }
  }

  /// Endpoints of `edge`.
  #[inline]
  pub fn edge(&self, edge: Edge) -> [Vec3; 2] {
    let [a, b] = edge.vertex_indices();
    [self.vertices[a], self.vertices[b]]
  }

  /// Midpoint of `v0 - v2`, the vertex a bisection inserts.
  #[inline]
  pub fn hypotenuse_midpoint(&self) -> Vec3 {
    (self.vertices[0] + self.vertices[2]) * 0.5
  }

  #[inline]
  pub fn centroid(&self) -> Vec3 {
    (self.vertices[0] + self.vertices[1] + self.vertices[2]) / 3.0
  }

  /// Unnormalized face normal `(v1 - v0) x (v2 - v0)`. Its direction
  /// encodes the winding.
  #[inline]
  pub fn normal(&self) -> Vec3 {
    (self.vertices[1] - self.vertices[0]).cross(self.vertices[2] - self.vertices[0])
  }

  #[inline]
  pub fn area(&self) -> f32 {
    0.5 * self.normal().length()
  }

  /// Axis-aligned bounds as `(min, max)`.
  pub fn bounds(&self) -> (Vec3, Vec3) {
    let [a, b, c] = self.vertices;
    (a.min(b).min(c), a.max(b).max(c))
  }

  /// Apply `f` to every vertex.
  pub fn map(&self, f: impl Fn(Vec3) -> Vec3) -> Self {
    let [a, b, c] = self.vertices;
    Self::new(f(a), f(b), f(c))
  }
}

/// Matrix from three rows.
#[inline]
fn from_rows(r0: Vec3, r1: Vec3, r2: Vec3) -> Mat3 {
  Mat3::from_cols(r0, r1, r2).transpose()
}

/// Bisection with `bit`: 0 keeps `(v0, m, v1)`, 1 keeps `(v1, m, v2)`.
#[inline]
fn split_matrix(bit: u64) -> Mat3 {
  let b = bit as f32;
  let c = 1.0 - b;
  from_rows(
    Vec3::new(c, b, 0.0),
    Vec3::new(0.5, 0.0, 0.5),
    Vec3::new(0.0, c, b),
  )
}

/// Depth-1 half of the square base. Half 1 is the parallelogram completion
/// `(v2, v0 + v2 - v1, v0)`.
#[inline]
fn square_matrix(bit: u64) -> Mat3 {
  let b = bit as f32;
  let c = 1.0 - b;
  from_rows(
    Vec3::new(c, 0.0, b),
    Vec3::new(b, c - b, b),
    Vec3::new(b, 0.0, c),
  )
}

/// Swaps `v0` and `v2` when `parity` is 1.
#[inline]
fn winding_matrix(parity: u32) -> Mat3 {
  let b = parity as f32;
  let c = 1.0 - b;
  from_rows(
    Vec3::new(c, 0.0, b),
    Vec3::Y,
    Vec3::new(b, 0.0, c),
  )
}

/// Matrix mapping the template's vertex values to those of `node`.
///
/// Nodes shallower than the shape's minimum depth are not elements and map
/// to the identity.
pub fn decode_transform(node: CbtNode, shape: BaseShape) -> Mat3 {
  let min_depth = shape.min_depth();
  if node.depth < min_depth || node.is_null() {
    return Mat3::IDENTITY;
  }

  let (mut m, bit_count) = match shape {
    BaseShape::Triangle => (Mat3::IDENTITY, node.depth),
    BaseShape::Square => (square_matrix(node.bit(node.depth - 1)), node.depth - 1),
  };
  for bit_id in (0..bit_count).rev() {
    m = split_matrix(node.bit(bit_id)) * m;
  }

  winding_matrix((node.depth - min_depth) & 1) * m
}

/// Decode per-vertex attributes in place.
///
/// Each entry holds one attribute's values at `v0`, `v1` and `v2` of the
/// template and is replaced by its values at the element's vertices.
pub fn decode_attribute_array(node: CbtNode, shape: BaseShape, attributes: &mut [Vec3]) {
  let m = decode_transform(node, shape);
  for attribute in attributes.iter_mut() {
    *attribute = m * *attribute;
  }
}

/// Triangle of `node` for the given base template.
pub fn decode_element(node: CbtNode, shape: BaseShape, template: &ElementTemplate) -> Triangle {
  let m = decode_transform(node, shape);
  let [v0, v1, v2] = template.vertices;
  let vertex = |row: Vec3| v0 * row.x + v1 * row.y + v2 * row.z;
  Triangle::new(vertex(m.row(0)), vertex(m.row(1)), vertex(m.row(2)))
}

#[cfg(test)]
#[path = "geometry_test.rs"]
mod geometry_test;
