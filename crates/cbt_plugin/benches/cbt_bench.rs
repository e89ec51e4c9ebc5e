//! Benchmarks for the heap reduction, rank decoding and full frame updates.

use cbt_plugin::{
  BitHeap, CbtConfig, ElementTemplate, HeapInit, LebSession, RayonDispatcher, ReductionStrategy,
  ScreenSpaceLod, SerialDispatcher, SumReducer, ViewParameters,
};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use glam::Vec3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Heap with roughly half of its deepest leaves set.
fn random_heap(max_depth: u32, seed: u64) -> BitHeap {
  let heap = BitHeap::new(max_depth, HeapInit::Empty).expect("valid depth");
  let mut rng = StdRng::seed_from_u64(seed);
  let first = 1u64 << max_depth;
  for id in first..(first << 1) {
    if rng.random_bool(0.5) {
      heap.set_leaf_bit(cbt_plugin::CbtNode::new(id, max_depth), true);
    }
  }
  heap
}

fn terrain_view() -> ViewParameters {
  ViewParameters::look_at(
    Vec3::new(100.0, 40.0, 100.0),
    Vec3::new(400.0, 0.0, 400.0),
    60f32.to_radians(),
    16.0 / 9.0,
    1080.0,
  )
}

fn bench_reduction(c: &mut Criterion) {
  let mut group = c.benchmark_group("reduction");
  let rayon = RayonDispatcher::new().with_min_len(256);

  for max_depth in [16u32, 20] {
    let heap = random_heap(max_depth, 7);
    for strategy in [ReductionStrategy::LevelByLevel, ReductionStrategy::Prepass] {
      let reducer = SumReducer::new(strategy);
      group.bench_with_input(
        BenchmarkId::new(format!("{:?}", strategy), max_depth),
        &heap,
        |b, heap| b.iter(|| black_box(reducer.reduce(heap, &rayon))),
      );
    }
  }

  group.finish();
}

fn bench_decode_node(c: &mut Criterion) {
  let heap = random_heap(20, 11);
  let count = SumReducer::default().reduce(&heap, &SerialDispatcher);

  c.bench_function("decode_node (depth 20, 1024 ranks)", |b| {
    b.iter(|| {
      let mut acc = 0u64;
      for rank in (0..count).step_by((count as usize / 1024).max(1)) {
        acc ^= heap.decode_node(black_box(rank)).id;
      }
      acc
    })
  });
}

fn bench_frame_update(c: &mut Criterion) {
  let config = CbtConfig {
    template: ElementTemplate::with_extent(1024.0),
    ..CbtConfig::with_max_depth(20)
  };
  let criterion = ScreenSpaceLod::flat(terrain_view());
  let rayon = RayonDispatcher::new().with_min_len(config.workgroup_size as usize);

  // Converge first so every iteration measures a steady-state frame.
  let mut session = LebSession::new(config).expect("valid config");
  for _ in 0..64 {
    session.update(&criterion, &rayon);
  }

  let mut group = c.benchmark_group("frame_update");
  group.bench_function("rayon", |b| {
    b.iter(|| black_box(session.update(&criterion, &rayon)))
  });
  group.bench_function("serial", |b| {
    b.iter(|| black_box(session.update(&criterion, &SerialDispatcher)))
  });
  group.finish();
}

criterion_group!(benches, bench_reduction, bench_decode_node, bench_frame_update);
criterion_main!(benches);
