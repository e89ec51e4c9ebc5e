//! CbtConfig - construction parameters of a subdivision session.

use crate::error::CapacityError;
use crate::heap::{HeapInit, MAX_SUPPORTED_DEPTH};
use crate::leb::{BaseShape, ElementTemplate};
use crate::reduction::ReductionStrategy;

/// Everything fixed for the lifetime of a session.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CbtConfig {
  /// Deepest subdivision level. Heap size is `2^(max_depth + 2)` bits.
  pub max_depth: u32,
  /// Base polygon.
  pub shape: BaseShape,
  /// Initial partition.
  pub init: HeapInit,
  /// Template triangle mapped onto the base shape.
  pub template: ElementTemplate,
  /// How internal sums are rebuilt after each pass.
  pub reduction: ReductionStrategy,
  /// Elements per workgroup for dispatch sizing and rayon task grouping.
  pub workgroup_size: u32,
}

impl Default for CbtConfig {
  fn default() -> Self {
    Self {
      max_depth: 25,
      shape: BaseShape::Square,
      init: HeapInit::Depth(1),
      template: ElementTemplate::default(),
      reduction: ReductionStrategy::LevelByLevel,
      workgroup_size: 256,
    }
  }
}

impl CbtConfig {
  /// Default configuration for a tree of `max_depth`.
  pub fn with_max_depth(max_depth: u32) -> Self {
    Self {
      max_depth,
      ..Default::default()
    }
  }

  /// Check that the heap and the base shape can be built.
  pub fn validate(&self) -> Result<(), CapacityError> {
    if self.max_depth > MAX_SUPPORTED_DEPTH {
      return Err(CapacityError::MaxDepth {
        requested: self.max_depth,
        supported: MAX_SUPPORTED_DEPTH,
      });
    }

    let min_depth = self.shape.min_depth();
    if self.max_depth < min_depth {
      return Err(CapacityError::ShapeDepth {
        shape: self.shape,
        min_depth,
        requested: self.max_depth,
      });
    }

    if self.workgroup_size == 0 {
      return Err(CapacityError::WorkgroupSize);
    }

    let init_depth = match self.init {
      HeapInit::Empty => return Ok(()),
      HeapInit::Root => 0,
      HeapInit::Depth(depth) => depth,
    };
    if init_depth > self.max_depth {
      return Err(CapacityError::InitialDepth {
        requested: init_depth,
        max_depth: self.max_depth,
      });
    }
    if init_depth < min_depth {
      return Err(CapacityError::ShapeDepth {
        shape: self.shape,
        min_depth,
        requested: init_depth,
      });
    }
    Ok(())
  }
}
