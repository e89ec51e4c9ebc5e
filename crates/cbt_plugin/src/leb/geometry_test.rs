use super::*;

const EPSILON: f32 = 1e-5;

fn assert_vertices_eq(actual: &Triangle, expected: [Vec3; 3]) {
  for (i, (a, e)) in actual.vertices.iter().zip(expected.iter()).enumerate() {
    assert!(a.abs_diff_eq(*e, EPSILON), "v{}: {} != {}", i, a, e);
  }
}

fn nodes_at(depth: u32) -> impl Iterator<Item = CbtNode> {
  let first = 1u64 << depth;
  (first..(first << 1)).map(move |id| CbtNode::new(id, depth))
}

// =========================================================================
// Batch 1: Known elements
// =========================================================================

/// The triangle root is the template itself.
#[test]
fn test_triangle_root_is_template() {
  let template = ElementTemplate::default();
  let root = decode_element(CbtNode::ROOT, BaseShape::Triangle, &template);

  assert_vertices_eq(&root, template.vertices);
}

/// Square halves: node 2 is the template, node 3 its parallelogram twin.
#[test]
fn test_square_halves() {
  let template = ElementTemplate::default();

  let lower = decode_element(CbtNode::new(2, 1), BaseShape::Square, &template);
  let upper = decode_element(CbtNode::new(3, 1), BaseShape::Square, &template);

  assert_vertices_eq(&lower, template.vertices);
  assert_vertices_eq(&upper, [Vec3::Z, Vec3::new(1.0, 0.0, 1.0), Vec3::X]);
}

/// First bisection of the triangle root, winding corrected.
#[test]
fn test_triangle_depth_one() {
  let template = ElementTemplate::default();
  let half = Vec3::new(0.5, 0.0, 0.5);

  let left = decode_element(CbtNode::new(2, 1), BaseShape::Triangle, &template);
  let right = decode_element(CbtNode::new(3, 1), BaseShape::Triangle, &template);

  assert_vertices_eq(&left, [Vec3::ZERO, half, Vec3::X]);
  assert_vertices_eq(&right, [Vec3::Z, half, Vec3::ZERO]);
}

/// Second bisection lands back in template orientation.
#[test]
fn test_triangle_depth_two() {
  let template = ElementTemplate::default();
  let half = Vec3::new(0.5, 0.0, 0.5);

  let first = decode_element(CbtNode::new(4, 2), BaseShape::Triangle, &template);
  let second = decode_element(CbtNode::new(5, 2), BaseShape::Triangle, &template);

  assert_vertices_eq(&first, [Vec3::X, Vec3::new(0.5, 0.0, 0.0), half]);
  assert_vertices_eq(&second, [half, Vec3::new(0.5, 0.0, 0.0), Vec3::ZERO]);
}

// =========================================================================
// Batch 2: Structural properties
// =========================================================================

/// Every decoded element keeps the template's winding.
#[test]
fn test_winding_preserved() {
  let template = ElementTemplate::default();
  for shape in [BaseShape::Triangle, BaseShape::Square] {
    for depth in shape.min_depth()..=10 {
      for node in nodes_at(depth) {
        let normal = decode_element(node, shape, &template).normal();
        assert!(normal.y > 0.0, "{:?} node {} flipped", shape, node.id);
      }
    }
  }
}

/// Elements of one level tile the base shape exactly.
#[test]
fn test_level_area_partition() {
  let template = ElementTemplate::with_extent(4.0);
  for (shape, expected) in [(BaseShape::Triangle, 8.0), (BaseShape::Square, 16.0)] {
    for depth in shape.min_depth()..=8 {
      let area: f32 = nodes_at(depth)
        .map(|node| decode_element(node, shape, &template).area())
        .sum();
      assert!((area - expected).abs() < 1e-3, "{:?} depth {}: {}", shape, depth, area);
    }
  }
}

/// A child's apex is its parent's hypotenuse midpoint.
#[test]
fn test_child_apex_is_parent_midpoint() {
  let template = ElementTemplate::default();
  for shape in [BaseShape::Triangle, BaseShape::Square] {
    for depth in shape.min_depth()..=6 {
      for parent in nodes_at(depth) {
        let midpoint = decode_element(parent, shape, &template).hypotenuse_midpoint();
        for child in [parent.left_child(), parent.right_child()] {
          let apex = decode_element(child, shape, &template).vertices[1];
          assert!(apex.abs_diff_eq(midpoint, EPSILON), "child {}", child.id);
        }
      }
    }
  }
}

/// Both children together cover exactly the parent's vertices plus midpoint.
#[test]
fn test_children_share_parent_legs() {
  let template = ElementTemplate::default();
  let parent = CbtNode::new(13, 3);
  let tri = decode_element(parent, BaseShape::Triangle, &template);
  let left = decode_element(parent.left_child(), BaseShape::Triangle, &template);
  let right = decode_element(parent.right_child(), BaseShape::Triangle, &template);

  assert!((left.area() + right.area() - tri.area()).abs() < EPSILON);
  assert!(left.vertices.iter().all(|v| right.vertices.contains(v) || tri.vertices.contains(v)));
}

// =========================================================================
// Batch 3: Attribute arrays
// =========================================================================

/// Attribute decoding agrees with element decoding on each axis.
#[test]
fn test_attribute_array_matches_element() {
  let template = ElementTemplate::new(
    Vec3::new(3.0, 1.0, -2.0),
    Vec3::new(-1.0, 0.5, 0.0),
    Vec3::new(2.0, -1.0, 4.0),
  );
  for id in [2u64, 3, 9, 22, 45, 100, 511] {
    let node = CbtNode::from_id(id);
    let element = decode_element(node, BaseShape::Square, &template);
    let mut axes = [template.axis(0), template.axis(1), template.axis(2)];

    decode_attribute_array(node, BaseShape::Square, &mut axes);

    for (vertex, position) in element.vertices.iter().enumerate() {
      let decoded = Vec3::new(axes[0][vertex], axes[1][vertex], axes[2][vertex]);
      assert!(decoded.abs_diff_eq(*position, EPSILON), "node {} v{}", id, vertex);
    }
  }
}

/// The square root is not an element and decodes to the identity.
#[test]
fn test_square_root_identity() {
  assert_eq!(decode_transform(CbtNode::ROOT, BaseShape::Square), Mat3::IDENTITY);
}

/// Bounds enclose every vertex.
#[test]
fn test_triangle_bounds() {
  let tri = Triangle::new(Vec3::new(1.0, 2.0, -1.0), Vec3::ZERO, Vec3::new(-3.0, 0.5, 4.0));

  let (min, max) = tri.bounds();

  assert_eq!(min, Vec3::new(-3.0, 0.0, -1.0));
  assert_eq!(max, Vec3::new(1.0, 2.0, 4.0));
}
