//! LebSession - owner of the double-buffered heaps of one surface.
//!
//! Each frame follows the same protocol:
//!
//! ```text
//! back <- front                 (copy)
//! pass(front -> back)           (split on even epochs, merge on odd)
//! reduce(back)
//! swap(front, back); epoch += 1
//! ```
//!
//! `front` is the read-only snapshot of a pass and always holds a reduced,
//! conforming partition between frames.

use web_time::Instant;

use crate::config::CbtConfig;
use crate::dispatch::Dispatcher;
use crate::error::CapacityError;
use crate::heap::{BitHeap, HeapInit};
use crate::indirect::{DispatchIndirectArgs, DrawIndexedIndirectArgs};
use crate::leb::{decode_element, Meshlet, Triangle};
use crate::lod::LodCriterion;
use crate::node::CbtNode;
use crate::reduction::SumReducer;
use crate::update::{run_update_pass, PassStats, UpdatePass};

/// Outcome of one frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameStats {
  /// Epoch the frame ran at.
  pub epoch: u64,
  pub pass: UpdatePass,
  pub stats: PassStats,
  /// Active elements after the frame.
  pub active_count: u64,
  /// Copy + split/merge pass time in microseconds.
  pub update_us: u64,
  /// Reduction time in microseconds.
  pub reduction_us: u64,
}

/// One adaptive surface.
pub struct LebSession {
  config: CbtConfig,
  front: BitHeap,
  back: BitHeap,
  reducer: SumReducer,
  epoch: u64,
}

impl LebSession {
  /// Validate `config` and allocate both heaps.
  pub fn new(config: CbtConfig) -> Result<Self, CapacityError> {
    config.validate()?;
    let front = BitHeap::new(config.max_depth, config.init)?;
    let back = BitHeap::new(config.max_depth, HeapInit::Empty)?;

    tracing::debug!(
      max_depth = config.max_depth,
      shape = ?config.shape,
      active_count = front.active_count(),
      heap_bytes = front.byte_size(),
      "created LEB session"
    );

    Ok(Self {
      reducer: SumReducer::new(config.reduction),
      config,
      front,
      back,
      epoch: 0,
    })
  }

  #[inline]
  pub fn config(&self) -> &CbtConfig {
    &self.config
  }

  /// Number of frames run since creation or the last reset.
  #[inline]
  pub fn epoch(&self) -> u64 {
    self.epoch
  }

  /// Current reduced heap.
  #[inline]
  pub fn heap(&self) -> &BitHeap {
    &self.front
  }

  #[inline]
  pub fn active_count(&self) -> u64 {
    self.front.active_count()
  }

  /// Run one frame: the pass picked by the epoch's parity.
  pub fn update<C, D>(&mut self, criterion: &C, dispatcher: &D) -> FrameStats
  where
    C: LodCriterion + ?Sized,
    D: Dispatcher + ?Sized,
  {
    let frame = self.run_pass(UpdatePass::for_epoch(self.epoch), criterion, dispatcher);
    self.epoch += 1;
    frame
  }

  /// Run one frame with an explicit pass. The epoch is left unchanged.
  pub fn run_pass<C, D>(&mut self, pass: UpdatePass, criterion: &C, dispatcher: &D) -> FrameStats
  where
    C: LodCriterion + ?Sized,
    D: Dispatcher + ?Sized,
  {
    let start = Instant::now();
    self.back.copy_from(&self.front);
    let stats = run_update_pass(
      &self.front,
      &self.back,
      pass,
      self.config.shape,
      &self.config.template,
      criterion,
      dispatcher,
    );
    let update_us = start.elapsed().as_micros() as u64;

    let start = Instant::now();
    let active_count = self.reducer.reduce(&self.back, dispatcher);
    let reduction_us = start.elapsed().as_micros() as u64;

    std::mem::swap(&mut self.front, &mut self.back);

    tracing::debug!(
      epoch = self.epoch,
      ?pass,
      active_count,
      update_us,
      reduction_us,
      "frame complete"
    );

    FrameStats {
      epoch: self.epoch,
      pass,
      stats,
      active_count,
      update_us,
      reduction_us,
    }
  }

  /// Restore the configured initial partition and epoch 0.
  pub fn reset(&mut self) {
    self.front.reset(self.config.init);
    self.back.reset(HeapInit::Empty);
    self.epoch = 0;
  }

  /// Heap node of the `rank`-th element.
  #[inline]
  pub fn decode_node(&self, rank: u64) -> CbtNode {
    self.front.decode_node(rank)
  }

  /// Triangle of the `rank`-th element.
  pub fn decode_element(&self, rank: u64) -> Triangle {
    decode_element(self.decode_node(rank), self.config.shape, &self.config.template)
  }

  /// Every element with its triangle, in rank order.
  pub fn elements(&self) -> impl Iterator<Item = (CbtNode, Triangle)> + '_ {
    (0..self.active_count()).map(move |rank| {
      let node = self.decode_node(rank);
      (node, decode_element(node, self.config.shape, &self.config.template))
    })
  }

  /// Workgroups for a per-element kernel.
  pub fn dispatch_args(&self) -> DispatchIndirectArgs {
    DispatchIndirectArgs::for_active_count(self.active_count(), self.config.workgroup_size)
  }

  /// One `meshlet` instance per element.
  pub fn draw_args(&self, meshlet: &Meshlet) -> DrawIndexedIndirectArgs {
    DrawIndexedIndirectArgs::for_active_count(self.active_count(), meshlet.index_count() as u32)
  }
}

impl std::fmt::Debug for LebSession {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("LebSession")
      .field("config", &self.config)
      .field("epoch", &self.epoch)
      .field("heap", &self.front)
      .finish()
  }
}

#[cfg(test)]
#[path = "session_test.rs"]
mod session_test;
