//! cbt_plugin - Framework/engine independent adaptive surface subdivision
//!
//! This crate stores a longest-edge-bisection (LEB) triangulation in a
//! concurrent binary tree (CBT): a bit-packed sum-reduction heap whose leaf
//! bits mark the active elements. Every frame, one worker per element asks a
//! [`LodCriterion`] whether to split or merge, writes leaf bits with atomic
//! operations, and a parallel reduction rebuilds the counts so that the
//! `rank`-th element can be located in `O(max_depth)`.
//!
//! # Features
//!
//! - **BitHeap**: packed sum-reduction tree with atomic leaf updates
//! - **LEB codec**: neighbors, diamonds and triangle geometry decoded from a
//!   heap index alone
//! - **Conforming split/merge**: crack-free refinement driven by any
//!   criterion, including plain closures
//! - **Parallel reduction**: level-by-level or 32-bit popcount prepass
//! - **Indirect arguments**: GPU-ready dispatch and draw argument structs
//!
//! # Example
//!
//! ```ignore
//! use cbt_plugin::{CbtConfig, LebSession, RayonDispatcher, ScreenSpaceLod, ViewParameters};
//!
//! let mut session = LebSession::new(CbtConfig::with_max_depth(20))?;
//! let dispatcher = RayonDispatcher::new();
//!
//! loop {
//!   let view = ViewParameters::look_at(eye, target, fovy, aspect, height);
//!   let frame = session.update(&ScreenSpaceLod::flat(view), &dispatcher);
//!   println!("{} elements", frame.active_count);
//! }
//! ```

pub mod config;
pub mod dispatch;
pub mod error;
pub mod heap;
pub mod node;

pub use config::CbtConfig;
pub use dispatch::{Dispatcher, RayonDispatcher, SerialDispatcher};
pub use error::CapacityError;
pub use heap::{BitHeap, HeapInit, MAX_SUPPORTED_DEPTH};
pub use node::CbtNode;

// Sum reduction over the heap
pub mod reduction;
pub use reduction::{ReductionStrategy, SumReducer};

// Longest edge bisection codec
pub mod leb;
pub use leb::{
  decode_attribute_array, decode_diamond_parent, decode_element, decode_same_depth_neighbors,
  decode_transform, edge_neighbor, BaseShape, DiamondParent, Edge, ElementTemplate, Meshlet,
  SameDepthNeighbors, Triangle,
};

// Split/merge decisions
pub mod lod;
pub use lod::{
  FlatHeight, Frustum, HeightSource, LodCriterion, LodDecision, ScreenSpaceLod, ViewParameters,
};

// Concurrent split/merge kernel
pub mod update;
pub use update::{
  merge_node, merge_node_conforming, run_update_pass, split_node, split_node_conforming,
  PassStats, SplitOutcome, UpdatePass,
};

// Indirect dispatch/draw arguments
pub mod indirect;
pub use indirect::{DispatchIndirectArgs, DrawIndexedIndirectArgs};

// Double-buffered frame driver
pub mod session;
pub use session::{FrameStats, LebSession};

// Engine-agnostic metrics
pub mod metrics;

#[cfg(test)]
pub mod test_utils;
