//! Shared helpers for unit tests.

use std::collections::HashSet;
use std::hash::{Hash, Hasher};

use glam::Vec3;

use crate::dispatch::Dispatcher;
use crate::heap::BitHeap;
use crate::leb::{decode_element, BaseShape, ElementTemplate, Triangle};
use crate::lod::LodDecision;
use crate::node::CbtNode;
use crate::reduction::SumReducer;
use crate::update::{run_update_pass, PassStats, UpdatePass};

/// Template side length for which every vertex down to depth 32 lands on an
/// integer coordinate.
pub const GRID_EXTENT: f32 = 65536.0;

/// Every active element of a reduced heap, in rank order.
pub fn collect_leaves(heap: &BitHeap) -> Vec<CbtNode> {
  (0..heap.active_count()).map(|rank| heap.decode_node(rank)).collect()
}

/// Integer key of a template-space vertex in the XZ plane.
pub fn vertex_key(v: Vec3) -> (i64, i64) {
  (v.x.round() as i64, v.z.round() as i64)
}

/// Area of the base shape for `template`.
pub fn base_area(shape: BaseShape, template: &ElementTemplate) -> f64 {
  let tri = Triangle {
    vertices: template.vertices,
  };
  match shape {
    BaseShape::Triangle => tri.area() as f64,
    BaseShape::Square => 2.0 * tri.area() as f64,
  }
}

/// Elements tile the base shape: leaves are unique, never nested, and their
/// areas add up to the base area.
pub fn assert_partition(heap: &BitHeap, shape: BaseShape, template: &ElementTemplate) {
  let leaves = collect_leaves(heap);
  let set: HashSet<CbtNode> = leaves.iter().copied().collect();
  assert_eq!(set.len(), leaves.len(), "duplicate element");

  for leaf in &leaves {
    assert!(leaf.depth >= shape.min_depth(), "element {} above min depth", leaf.id);
    let mut ancestor = leaf.parent();
    while !ancestor.is_null() {
      assert!(!set.contains(&ancestor), "{} nested in {}", leaf.id, ancestor.id);
      ancestor = ancestor.parent();
    }
  }

  let area: f64 = leaves
    .iter()
    .map(|leaf| decode_element(*leaf, shape, template).area() as f64)
    .sum();
  let expected = base_area(shape, template);
  assert!(
    (area - expected).abs() <= expected * 1e-4,
    "area {} != {}",
    area,
    expected
  );
}

/// No element has another element's vertex in the middle of one of its
/// edges. `template` must be integral (see [`GRID_EXTENT`]).
pub fn assert_conforming(heap: &BitHeap, shape: BaseShape, template: &ElementTemplate) {
  let elements: Vec<(CbtNode, Triangle)> = collect_leaves(heap)
    .into_iter()
    .map(|leaf| (leaf, decode_element(leaf, shape, template)))
    .collect();

  let vertices: HashSet<(i64, i64)> = elements
    .iter()
    .flat_map(|(_, tri)| tri.vertices.iter().map(|v| vertex_key(*v)))
    .collect();

  for (node, tri) in &elements {
    for edge in crate::leb::Edge::ALL {
      let [a, b] = tri.edge(edge);
      let midpoint = vertex_key((a + b) * 0.5);
      assert!(
        !vertices.contains(&midpoint),
        "hanging vertex on {:?} edge of element {} (depth {})",
        edge,
        node.id,
        node.depth
      );
    }
  }
}

/// Rank round trip holds for every element.
pub fn assert_rank_round_trip(heap: &BitHeap) {
  for rank in 0..heap.active_count() {
    let node = heap.decode_node(rank);
    assert_eq!(heap.encode_node(node), rank, "node {}", node.id);
  }
}

/// Deterministic pseudo-random criterion keyed on element geometry.
///
/// The same element always gets the same answer within one `seed`,
/// whichever worker evaluates it.
pub fn hashed_criterion(seed: u64) -> impl Fn(&Triangle) -> LodDecision + Sync {
  move |tri: &Triangle| {
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    seed.hash(&mut hasher);
    for v in tri.vertices {
      v.x.to_bits().hash(&mut hasher);
      v.y.to_bits().hash(&mut hasher);
      v.z.to_bits().hash(&mut hasher);
    }
    match hasher.finish() % 5 {
      0 | 1 => LodDecision::Split,
      2 | 3 => LodDecision::Merge,
      _ => LodDecision::Keep,
    }
  }
}

/// One frame of the double-buffered protocol: copy, pass, reduce, swap.
#[allow(clippy::too_many_arguments)]
pub fn step_frame<C, D>(
  front: &mut BitHeap,
  back: &mut BitHeap,
  pass: UpdatePass,
  shape: BaseShape,
  template: &ElementTemplate,
  criterion: &C,
  dispatcher: &D,
) -> PassStats
where
  C: crate::lod::LodCriterion + ?Sized,
  D: Dispatcher + ?Sized,
{
  back.copy_from(front);
  let stats = run_update_pass(front, back, pass, shape, template, criterion, dispatcher);
  SumReducer::default().reduce(back, dispatcher);
  std::mem::swap(front, back);
  stats
}
