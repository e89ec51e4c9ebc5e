//! Meshlet - instanced sub-triangulation of one element.
//!
//! Every active element is drawn as one instance of the same small indexed
//! mesh: the unit right triangle subdivided `2 * level` times with the codec
//! itself. Vertices are barycentric-like `(u, v)` weights in the element's
//! frame, so one upload serves every element at every depth.

use std::collections::HashMap;

use glam::{Vec2, Vec3};

use super::geometry::{decode_attribute_array, Triangle};
use super::BaseShape;
use crate::node::CbtNode;

/// Deepest level whose welded vertices fit `u16` indices.
pub const MAX_MESHLET_LEVEL: u32 = 8;

/// Indexed triangle list shared by all instances.
#[derive(Clone, Debug, PartialEq)]
pub struct Meshlet {
  /// Subdivision level: each instance holds `4^level` triangles.
  pub level: u32,
  /// `(u, v)` with `v0 = (0, 1)`, `v1 = (0, 0)`, `v2 = (1, 0)`.
  pub vertices: Vec<Vec2>,
  /// Three indices per triangle, in element winding.
  pub indices: Vec<u16>,
}

impl Meshlet {
  /// Subdivide the unit triangle to depth `2 * level` and weld the result.
  ///
  /// Levels above [`MAX_MESHLET_LEVEL`] are clamped.
  pub fn tessellate(level: u32) -> Self {
    let level = level.min(MAX_MESHLET_LEVEL);
    let depth = 2 * level;
    let resolution = (1u32 << level) as f32;
    let first = 1u64 << depth;

    let mut welded: HashMap<(i32, i32), u16> = HashMap::new();
    let mut vertices = Vec::new();
    let mut indices = Vec::with_capacity(3 * first as usize);

    for id in first..(first << 1) {
      let mut attributes = [Vec3::new(0.0, 0.0, 1.0), Vec3::new(1.0, 0.0, 0.0)];
      decode_attribute_array(CbtNode::new(id, depth), BaseShape::Triangle, &mut attributes);
      let [u, v] = attributes;

      for corner in 0..3 {
        let position = Vec2::new(u[corner], v[corner]);
        let key = (
          (position.x * resolution).round() as i32,
          (position.y * resolution).round() as i32,
        );
        let index = *welded.entry(key).or_insert_with(|| {
          vertices.push(position);
          (vertices.len() - 1) as u16
        });
        indices.push(index);
      }
    }

    Self {
      level,
      vertices,
      indices,
    }
  }

  #[inline]
  pub fn vertex_count(&self) -> usize {
    self.vertices.len()
  }

  #[inline]
  pub fn index_count(&self) -> usize {
    self.indices.len()
  }

  #[inline]
  pub fn triangle_count(&self) -> usize {
    self.indices.len() / 3
  }

  /// Meshlet vertices placed on `element`.
  pub fn instance_vertices<'a>(&'a self, element: &'a Triangle) -> impl Iterator<Item = Vec3> + 'a {
    let [v0, v1, v2] = element.vertices;
    self
      .vertices
      .iter()
      .map(move |uv| v1 + (v2 - v1) * uv.x + (v0 - v1) * uv.y)
  }
}

impl Default for Meshlet {
  /// Level 3: 64 triangles per instance.
  fn default() -> Self {
    Self::tessellate(3)
  }
}
