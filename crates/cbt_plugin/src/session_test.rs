use super::*;
use crate::dispatch::{RayonDispatcher, SerialDispatcher};
use crate::leb::{BaseShape, ElementTemplate};
use crate::lod::{LodDecision, ScreenSpaceLod, ViewParameters};
use crate::reduction::ReductionStrategy;
use crate::test_utils::*;

fn triangle_config(max_depth: u32) -> CbtConfig {
  CbtConfig {
    max_depth,
    shape: BaseShape::Triangle,
    init: HeapInit::Root,
    ..Default::default()
  }
}

fn split_all(_: &Triangle) -> LodDecision {
  LodDecision::Split
}

fn merge_all(_: &Triangle) -> LodDecision {
  LodDecision::Merge
}

// =========================================================================
// Batch 1: Construction
// =========================================================================

/// Default sessions start with the two square halves.
#[test]
fn test_default_session() {
  let session = LebSession::new(CbtConfig::with_max_depth(12)).unwrap();

  assert_eq!(session.active_count(), 2);
  assert_eq!(session.epoch(), 0);
  assert_eq!(session.decode_node(0), CbtNode::new(2, 1));
  assert_eq!(session.decode_node(1), CbtNode::new(3, 1));
}

/// Invalid configurations never allocate.
#[test]
fn test_invalid_config_rejected() {
  let config = CbtConfig {
    init: HeapInit::Depth(20),
    ..CbtConfig::with_max_depth(10)
  };

  assert!(matches!(
    LebSession::new(config),
    Err(CapacityError::InitialDepth { .. })
  ));
}

// =========================================================================
// Batch 2: Frame protocol
// =========================================================================

/// Split, split, merge on a depth-3 triangle tree: 2, 4, 2 elements.
#[test]
fn test_explicit_passes() {
  let mut session = LebSession::new(triangle_config(3)).unwrap();

  let first = session.run_pass(UpdatePass::Split, &split_all, &SerialDispatcher);
  assert_eq!(first.active_count, 2);

  let second = session.run_pass(UpdatePass::Split, &split_all, &SerialDispatcher);
  assert_eq!(second.active_count, 4);

  let third = session.run_pass(UpdatePass::Merge, &merge_all, &SerialDispatcher);
  assert_eq!(third.active_count, 2);
  assert_eq!(session.epoch(), 0, "explicit passes keep the epoch");
}

/// A depth-0 tree stays at one element and reports the clamp.
#[test]
fn test_depth_zero_clamps() {
  let mut session = LebSession::new(triangle_config(0)).unwrap();

  let frame = session.update(&split_all, &SerialDispatcher);

  assert_eq!(frame.active_count, 1);
  assert_eq!(frame.stats.clamped_splits, 1);
  assert_eq!(session.active_count(), 1);
}

/// update alternates passes by epoch.
#[test]
fn test_update_alternates_passes() {
  let mut session = LebSession::new(triangle_config(6)).unwrap();

  let passes: Vec<UpdatePass> = (0..4)
    .map(|_| session.update(&split_all, &SerialDispatcher).pass)
    .collect();

  assert_eq!(
    passes,
    vec![
      UpdatePass::Split,
      UpdatePass::Merge,
      UpdatePass::Split,
      UpdatePass::Merge
    ]
  );
  assert_eq!(session.epoch(), 4);
  // Two split passes from the root.
  assert_eq!(session.active_count(), 4);
}

/// Continuous splitting saturates at 2^max_depth elements.
#[test]
fn test_split_saturates_at_capacity() {
  let mut session = LebSession::new(CbtConfig::with_max_depth(6)).unwrap();

  for _ in 0..16 {
    session.update(&split_all, &RayonDispatcher::new());
  }

  assert_eq!(session.active_count(), 64);
  assert!(session.elements().all(|(node, _)| node.depth == 6));
}

/// reset restores the initial partition and epoch.
#[test]
fn test_reset() {
  let mut session = LebSession::new(CbtConfig::with_max_depth(8)).unwrap();
  let initial = session.heap().to_words();
  for _ in 0..5 {
    session.update(&split_all, &SerialDispatcher);
  }

  session.reset();

  assert_eq!(session.epoch(), 0);
  assert_eq!(session.heap().to_words(), initial);
}

// =========================================================================
// Batch 3: Dispatch equivalence and outputs
// =========================================================================

/// Rayon and serial sessions stay bit-identical under a camera criterion.
#[test]
fn test_rayon_matches_serial_sessions() {
  let config = CbtConfig {
    template: ElementTemplate::with_extent(100.0),
    reduction: ReductionStrategy::Prepass,
    ..CbtConfig::with_max_depth(14)
  };
  let view = ViewParameters::look_at(
    glam::Vec3::new(20.0, 5.0, 20.0),
    glam::Vec3::new(50.0, 0.0, 50.0),
    60f32.to_radians(),
    16.0 / 9.0,
    720.0,
  );
  let criterion = ScreenSpaceLod::flat(view);

  let mut serial = LebSession::new(config).unwrap();
  let mut parallel = LebSession::new(config).unwrap();
  let rayon = RayonDispatcher::new().with_min_len(config.workgroup_size as usize);

  for _ in 0..24 {
    let a = serial.update(&criterion, &SerialDispatcher);
    let b = parallel.update(&criterion, &rayon);
    assert_eq!(a.active_count, b.active_count);
    assert_eq!(a.stats, b.stats);
  }

  assert_eq!(serial.heap().to_words(), parallel.heap().to_words());
  assert!(serial.active_count() > 2, "camera criterion refined nothing");
}

/// Camera-driven frames keep a conforming partition.
#[test]
fn test_camera_frames_conforming() {
  let template = ElementTemplate::with_extent(GRID_EXTENT);
  let config = CbtConfig {
    template,
    ..CbtConfig::with_max_depth(12)
  };
  let mut session = LebSession::new(config).unwrap();
  let dispatcher = RayonDispatcher::new();

  for frame in 0..40 {
    let eye = glam::Vec3::new(1000.0 + frame as f32 * 1500.0, 800.0, 2000.0);
    let view = ViewParameters::look_at(eye, eye + glam::Vec3::new(1.0, -0.3, 1.0), 1.0, 1.5, 720.0);
    session.update(&ScreenSpaceLod::flat(view), &dispatcher);

    assert_partition(session.heap(), BaseShape::Square, &template);
    assert_conforming(session.heap(), BaseShape::Square, &template);
  }
}

/// Indirect arguments follow the active count.
#[test]
fn test_indirect_args() {
  let mut session = LebSession::new(CbtConfig::with_max_depth(10)).unwrap();
  for _ in 0..6 {
    session.update(&split_all, &SerialDispatcher);
  }
  let meshlet = Meshlet::tessellate(3);

  // Split passes on even epochs: 2 -> 4 -> 8 -> 16.
  assert_eq!(session.active_count(), 16);
  assert_eq!(session.dispatch_args().x, 1);
  let draw = session.draw_args(&meshlet);
  assert_eq!(draw.instance_count, 16);
  assert_eq!(draw.index_count, 192);
}

/// Decoded elements agree with the element iterator.
#[test]
fn test_decode_element_matches_iterator() {
  let mut session = LebSession::new(CbtConfig::with_max_depth(8)).unwrap();
  session.update(&split_all, &SerialDispatcher);

  for (rank, (node, tri)) in session.elements().enumerate() {
    assert_eq!(session.decode_node(rank as u64), node);
    assert_eq!(session.decode_element(rank as u64), tri);
  }
}
