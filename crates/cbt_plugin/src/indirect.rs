//! Indirect dispatch/draw arguments sized from the active element count.
//!
//! Layouts match the GPU indirect command structs (wgpu, Vulkan, D3D12), so
//! the bytes can be copied into an indirect buffer as-is.

use bytemuck::{Pod, Zeroable};

/// `dispatch_workgroups_indirect` arguments.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct DispatchIndirectArgs {
  pub x: u32,
  pub y: u32,
  pub z: u32,
}

impl DispatchIndirectArgs {
  /// One invocation per active element, at least one workgroup.
  pub fn for_active_count(active_count: u64, workgroup_size: u32) -> Self {
    debug_assert!(workgroup_size > 0);
    let groups = active_count.div_ceil(workgroup_size.max(1) as u64).max(1);
    Self {
      x: groups.min(u32::MAX as u64) as u32,
      y: 1,
      z: 1,
    }
  }
}

/// `draw_indexed_indirect` arguments.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct DrawIndexedIndirectArgs {
  pub index_count: u32,
  pub instance_count: u32,
  pub first_index: u32,
  pub base_vertex: i32,
  pub first_instance: u32,
}

impl DrawIndexedIndirectArgs {
  /// One meshlet instance per active element.
  pub fn for_active_count(active_count: u64, index_count: u32) -> Self {
    Self {
      index_count,
      instance_count: active_count.min(u32::MAX as u64) as u32,
      ..Default::default()
    }
  }
}
