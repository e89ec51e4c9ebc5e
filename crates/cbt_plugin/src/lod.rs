//! Level-of-detail criterion - the external split/merge decision.
//!
//! The update kernel only asks one question per element: split, keep, or
//! merge. Anything that answers it is a [`LodCriterion`], including plain
//! closures. [`ScreenSpaceLod`] is the stock answer: bisect until an
//! element's hypotenuse covers a target number of pixels on screen.
//!
//! # Screen-space metric
//!
//! ```text
//! lod_factor = -2 * log2(2 * tan(fovy / 2) / viewport_height
//!                        * 2^meshlet_level * pixel_length_target) + 2
//! lod        = lod_factor + log2(|v2 - v0|^2 / |v0 + v2|^2)
//! ```
//!
//! with `v0`, `v2` the hypotenuse endpoints in view space. `lod` is the
//! number of bisections still needed to reach the target size; above 1 the
//! element splits, below 0 it merges, and the gap in between keeps
//! elements from flickering between two depths.

use glam::{Mat4, Vec3, Vec4};

use crate::leb::meshlet::MAX_MESHLET_LEVEL;
use crate::leb::Triangle;

/// Verdict for one element.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LodDecision {
  /// Too coarse: bisect.
  Split,
  /// Right size.
  Keep,
  /// Too fine (or invisible): eligible for merging with its diamond.
  Merge,
}

/// Decides the level of detail of one element.
///
/// Called concurrently from every worker, so implementations are `Sync` and
/// must not depend on evaluation order.
pub trait LodCriterion: Sync {
  fn evaluate(&self, element: &Triangle) -> LodDecision;
}

impl<F> LodCriterion for F
where
  F: Fn(&Triangle) -> LodDecision + Sync,
{
  #[inline]
  fn evaluate(&self, element: &Triangle) -> LodDecision {
    self(element)
  }
}

/// Surface displacement along the template's local Y axis.
pub trait HeightSource: Sync {
  /// Height at template-space `(x, z)`.
  fn height(&self, x: f32, z: f32) -> f32;
}

impl<F> HeightSource for F
where
  F: Fn(f32, f32) -> f32 + Sync,
{
  #[inline]
  fn height(&self, x: f32, z: f32) -> f32 {
    self(x, z)
  }
}

/// No displacement.
#[derive(Clone, Copy, Debug, Default)]
pub struct FlatHeight;

impl HeightSource for FlatHeight {
  #[inline]
  fn height(&self, _x: f32, _z: f32) -> f32 {
    0.0
  }
}

const NEAR_PLANE: f32 = 0.01;

/// Camera and target resolution for [`ScreenSpaceLod`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewParameters {
  /// World to view transform.
  pub view: Mat4,
  /// View to clip transform (depth range 0..1, far plane may be infinite).
  pub projection: Mat4,
  /// Vertical field of view in radians.
  pub fovy: f32,
  /// Viewport height in pixels.
  pub viewport_height: f32,
  /// Target on-screen length of one meshlet triangle edge, in pixels.
  pub pixel_length_target: f32,
  /// Subdivision level of the instanced meshlet.
  pub meshlet_level: u32,
  /// Merge elements outside the view frustum.
  pub cull: bool,
}

impl Default for ViewParameters {
  fn default() -> Self {
    let fovy = 60f32.to_radians();
    Self {
      view: Mat4::IDENTITY,
      projection: Mat4::perspective_infinite_rh(fovy, 16.0 / 9.0, NEAR_PLANE),
      fovy,
      viewport_height: 720.0,
      pixel_length_target: 7.0,
      meshlet_level: 3,
      cull: true,
    }
  }
}

impl ViewParameters {
  /// Perspective camera at `eye` looking at `target`, Y up, no far plane.
  pub fn look_at(eye: Vec3, target: Vec3, fovy: f32, aspect: f32, viewport_height: f32) -> Self {
    Self {
      view: Mat4::look_at_rh(eye, target, Vec3::Y),
      projection: Mat4::perspective_infinite_rh(fovy, aspect, NEAR_PLANE),
      fovy,
      viewport_height,
      ..Default::default()
    }
  }

  #[inline]
  pub fn view_projection(&self) -> Mat4 {
    self.projection * self.view
  }

  /// Constant term of the screen-space metric.
  pub fn lod_factor(&self) -> f32 {
    let tan_half_fov = (self.fovy * 0.5).tan();
    let meshlet_scale = 2f32.powi(self.meshlet_level.min(MAX_MESHLET_LEVEL) as i32);
    let pixels = 2.0 * tan_half_fov / self.viewport_height * meshlet_scale * self.pixel_length_target;
    -2.0 * pixels.log2() + 2.0
  }
}

/// Six inward-facing clip planes `(n, d)` with `n . p + d >= 0` inside.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Frustum {
  pub planes: [Vec4; 6],
}

impl Frustum {
  /// Planes of a view-projection matrix with a 0..1 depth range.
  pub fn from_view_projection(m: Mat4) -> Self {
    let [r0, r1, r2, r3] = [m.row(0), m.row(1), m.row(2), m.row(3)];
    Self {
      planes: [r3 + r0, r3 - r0, r3 + r1, r3 - r1, r2, r3 - r2],
    }
  }

  /// False only when the box is entirely outside one plane.
  pub fn intersects_aabb(&self, min: Vec3, max: Vec3) -> bool {
    self.planes.iter().all(|plane| {
      let normal = plane.truncate();
      let positive = Vec3::select(normal.cmpge(Vec3::ZERO), max, min);
      normal.dot(positive) + plane.w >= 0.0
    })
  }
}

/// Stock screen-space criterion over a displaced template.
#[derive(Clone, Debug)]
pub struct ScreenSpaceLod<H = FlatHeight> {
  view: ViewParameters,
  frustum: Frustum,
  lod_factor: f32,
  height: H,
}

impl ScreenSpaceLod<FlatHeight> {
  /// Criterion for an undisplaced surface.
  pub fn flat(view: ViewParameters) -> Self {
    Self::new(view, FlatHeight)
  }
}

impl<H: HeightSource> ScreenSpaceLod<H> {
  pub fn new(view: ViewParameters, height: H) -> Self {
    Self {
      frustum: Frustum::from_view_projection(view.view_projection()),
      lod_factor: view.lod_factor(),
      view,
      height,
    }
  }

  #[inline]
  pub fn view(&self) -> &ViewParameters {
    &self.view
  }

  #[inline]
  pub fn height_source(&self) -> &H {
    &self.height
  }

  /// Element with its vertices raised by the height source.
  pub fn displace(&self, element: &Triangle) -> Triangle {
    element.map(|v| Vec3::new(v.x, v.y + self.height.height(v.x, v.z), v.z))
  }

  /// Remaining bisections until the hypotenuse reaches its target length.
  pub fn level_of_detail(&self, displaced: &Triangle) -> f32 {
    let v0 = self.view.view.transform_point3(displaced.vertices[0]);
    let v2 = self.view.view.transform_point3(displaced.vertices[2]);
    let edge_center = v0 + v2;
    let edge_vector = v2 - v0;
    self.lod_factor + (edge_vector.length_squared() / edge_center.length_squared()).log2()
  }

  /// True when the displaced element may be on screen.
  pub fn is_visible(&self, displaced: &Triangle) -> bool {
    if !self.view.cull {
      return true;
    }
    let (min, max) = displaced.bounds();
    self.frustum.intersects_aabb(min, max)
  }
}

impl<H: HeightSource> LodCriterion for ScreenSpaceLod<H> {
  fn evaluate(&self, element: &Triangle) -> LodDecision {
    let displaced = self.displace(element);
    let visible = self.is_visible(&displaced);
    let lod = self.level_of_detail(&displaced);

    if lod.is_nan() {
      debug_assert!(false, "NaN level of detail for {:?}", displaced);
      return LodDecision::Keep;
    }

    if !visible || lod < 0.0 {
      LodDecision::Merge
    } else if lod > 1.0 {
      LodDecision::Split
    } else {
      LodDecision::Keep
    }
  }
}

#[cfg(test)]
#[path = "lod_test.rs"]
mod lod_test;
