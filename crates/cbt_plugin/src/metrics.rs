//! Engine-agnostic metrics collection for subdivision sessions.
//!
//! Compiled in with the `metrics` feature and switchable at runtime through
//! [`COLLECT_METRICS`]. Without the feature every recorder is a no-op.
//!
//! # Usage
//!
//! ```ignore
//! use cbt_plugin::metrics::{SessionMetrics, COLLECT_METRICS};
//!
//! // Pause collection without rebuilding
//! COLLECT_METRICS.store(false, Ordering::Relaxed);
//!
//! // After each frame:
//! let frame = session.update(&criterion, &dispatcher);
//! metrics.record_frame(&frame);
//! metrics.update_from_session(&session);
//! ```

use std::collections::VecDeque;
use std::sync::atomic::AtomicBool;
#[cfg(feature = "metrics")]
use std::sync::atomic::Ordering;

use crate::session::{FrameStats, LebSession};
use crate::update::UpdatePass;

/// Depth buckets tracked by [`SessionMetrics::leaves_per_depth`].
pub const DEPTH_BUCKETS: usize = 64;

/// Runtime switch; recorders return early while it is false.
pub static COLLECT_METRICS: AtomicBool = AtomicBool::new(true);

/// True when the feature is compiled in and the switch is on.
#[inline]
pub fn is_enabled() -> bool {
  #[cfg(feature = "metrics")]
  {
    COLLECT_METRICS.load(Ordering::Relaxed)
  }
  #[cfg(not(feature = "metrics"))]
  {
    false
  }
}

/// Rolling window of the most recent samples.
#[derive(Debug, Clone)]
pub struct RollingWindow<T> {
  buffer: VecDeque<T>,
  capacity: usize,
}

impl<T> RollingWindow<T> {
  pub fn new(capacity: usize) -> Self {
    Self {
      buffer: VecDeque::with_capacity(capacity),
      capacity,
    }
  }

  /// Append `value`, dropping the oldest sample when full.
  pub fn push(&mut self, value: T) {
    if self.capacity == 0 {
      return;
    }
    if self.buffer.len() >= self.capacity {
      self.buffer.pop_front();
    }
    self.buffer.push_back(value);
  }

  pub fn len(&self) -> usize {
    self.buffer.len()
  }

  pub fn is_empty(&self) -> bool {
    self.buffer.is_empty()
  }

  pub fn clear(&mut self) {
    self.buffer.clear();
  }

  /// Samples from oldest to newest.
  pub fn iter(&self) -> impl Iterator<Item = &T> {
    self.buffer.iter()
  }

  /// Most recent value.
  pub fn last(&self) -> Option<&T> {
    self.buffer.back()
  }
}

impl RollingWindow<u64> {
  pub fn sum(&self) -> u64 {
    self.buffer.iter().sum()
  }

  pub fn average(&self) -> f64 {
    if self.buffer.is_empty() {
      0.0
    } else {
      self.sum() as f64 / self.buffer.len() as f64
    }
  }

  pub fn min_max(&self) -> Option<(u64, u64)> {
    let min = *self.buffer.iter().min()?;
    let max = *self.buffer.iter().max()?;
    Some((min, max))
  }
}

impl Default for RollingWindow<u64> {
  fn default() -> Self {
    Self::new(128) // ~2 seconds at 60fps
  }
}

/// Session-level statistics updated each frame.
#[derive(Debug, Clone)]
pub struct SessionMetrics {
  /// Active elements at each depth (index = depth).
  pub leaves_per_depth: [u64; DEPTH_BUCKETS],

  /// Copy + split/merge pass times in microseconds.
  pub update_timings: RollingWindow<u64>,
  /// Reduction times in microseconds.
  pub reduction_timings: RollingWindow<u64>,
  /// Active element count after each frame.
  pub active_counts: RollingWindow<u64>,

  /// Last pass time in microseconds.
  pub last_update_us: u64,
  /// Last reduction time in microseconds.
  pub last_reduction_us: u64,

  /// Frames recorded this session.
  pub frames: u64,
  /// Split operations issued (requested and enforced) this session.
  pub total_splits: u64,
  /// Leaf bits cleared by merges this session.
  pub total_merged_leaves: u64,
  /// Split requests clamped at max depth this session.
  pub total_clamped_splits: u64,
}

impl Default for SessionMetrics {
  fn default() -> Self {
    Self {
      leaves_per_depth: [0; DEPTH_BUCKETS],
      update_timings: RollingWindow::default(),
      reduction_timings: RollingWindow::default(),
      active_counts: RollingWindow::default(),
      last_update_us: 0,
      last_reduction_us: 0,
      frames: 0,
      total_splits: 0,
      total_merged_leaves: 0,
      total_clamped_splits: 0,
    }
  }
}

impl SessionMetrics {
  pub fn new() -> Self {
    Self::default()
  }

  /// Clear per-frame data. Cumulative totals are kept.
  pub fn reset(&mut self) {
    self.leaves_per_depth.fill(0);
    self.update_timings.clear();
    self.reduction_timings.clear();
    self.active_counts.clear();
    self.last_update_us = 0;
    self.last_reduction_us = 0;
  }

  /// Record the outcome of one frame.
  pub fn record_frame(&mut self, frame: &FrameStats) {
    if !is_enabled() {
      return;
    }

    self.update_timings.push(frame.update_us);
    self.reduction_timings.push(frame.reduction_us);
    self.active_counts.push(frame.active_count);
    self.last_update_us = frame.update_us;
    self.last_reduction_us = frame.reduction_us;
    self.frames += 1;

    match frame.pass {
      UpdatePass::Split => {
        self.total_splits += frame.stats.total_splits();
        self.total_clamped_splits += frame.stats.clamped_splits;
      }
      UpdatePass::Merge => self.total_merged_leaves += frame.stats.merged_leaves,
    }
  }

  /// Rebuild the depth histogram from the session's current elements.
  pub fn update_from_session(&mut self, session: &LebSession) {
    if !is_enabled() {
      return;
    }

    self.leaves_per_depth.fill(0);
    for (node, _) in session.elements() {
      let bucket = (node.depth as usize).min(DEPTH_BUCKETS - 1);
      self.leaves_per_depth[bucket] += 1;
    }
  }

  /// Total elements in the depth histogram.
  pub fn total_leaves(&self) -> u64 {
    self.leaves_per_depth.iter().sum()
  }

  /// Deepest depth holding at least one element.
  pub fn deepest_level(&self) -> Option<usize> {
    self.leaves_per_depth.iter().rposition(|&count| count > 0)
  }

  pub fn avg_update_timing_us(&self) -> f64 {
    self.update_timings.average()
  }

  pub fn avg_reduction_timing_us(&self) -> f64 {
    self.reduction_timings.average()
  }
}

#[cfg(all(test, feature = "metrics"))]
mod tests {
  use super::*;
  use crate::config::CbtConfig;
  use crate::dispatch::SerialDispatcher;
  use crate::leb::Triangle;
  use crate::lod::LodDecision;
  use crate::update::PassStats;

  #[test]
  fn test_rolling_window() {
    let mut samples = RollingWindow::new(3);
    assert_eq!(samples.min_max(), None);

    for value in [4u64, 8, 12] {
      samples.push(value);
    }
    assert_eq!(samples.average(), 8.0);

    // 4 falls out
    samples.push(1);
    assert_eq!(samples.iter().copied().collect::<Vec<_>>(), vec![8, 12, 1]);
    assert_eq!(samples.min_max(), Some((1, 12)));
    assert_eq!(samples.last(), Some(&1));
  }

  #[test]
  fn test_record_frame() {
    let mut metrics = SessionMetrics::new();
    let frame = FrameStats {
      epoch: 0,
      pass: UpdatePass::Split,
      stats: PassStats {
        split_requests: 5,
        neighbor_splits: 3,
        clamped_splits: 1,
        merged_leaves: 0,
      },
      active_count: 12,
      update_us: 100,
      reduction_us: 40,
    };

    metrics.record_frame(&frame);
    metrics.record_frame(&FrameStats {
      pass: UpdatePass::Merge,
      stats: PassStats {
        merged_leaves: 4,
        ..Default::default()
      },
      update_us: 300,
      ..frame
    });

    assert_eq!(metrics.frames, 2);
    assert_eq!(metrics.total_splits, 7);
    assert_eq!(metrics.total_clamped_splits, 1);
    assert_eq!(metrics.total_merged_leaves, 4);
    assert_eq!(metrics.avg_update_timing_us(), 200.0);
    assert_eq!(metrics.last_reduction_us, 40);
  }

  #[test]
  fn test_depth_histogram() {
    let mut session = LebSession::new(CbtConfig::with_max_depth(8)).unwrap();
    let split = |_: &Triangle| LodDecision::Split;
    session.update(&split, &SerialDispatcher);

    let mut metrics = SessionMetrics::new();
    metrics.update_from_session(&session);

    assert_eq!(metrics.leaves_per_depth[2], 4);
    assert_eq!(metrics.total_leaves(), 4);
    assert_eq!(metrics.deepest_level(), Some(2));
  }
}
