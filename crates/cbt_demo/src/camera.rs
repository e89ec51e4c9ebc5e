//! Scripted orbiting camera.

use cbt_plugin::{HeightSource, ViewParameters};
use glam::Vec3;

use crate::config::CameraConfig;

/// Camera circling the terrain center, always looking slightly inward.
pub struct OrbitCamera {
	center: Vec3,
	radius: f32,
	eye_height: f32,
	radians_per_frame: f32,
	fovy: f32,
	aspect: f32,
	viewport_height: f32,
	pixel_length_target: f32,
	meshlet_level: u32,
	cull: bool,
}

impl OrbitCamera {
	pub fn new(config: &CameraConfig, extent: f32) -> Self {
		let half = extent * 0.5;
		Self {
			center: Vec3::new(half, 0.0, half),
			radius: config.orbit_radius * extent,
			eye_height: config.eye_height,
			radians_per_frame: config.degrees_per_frame.to_radians(),
			fovy: config.fovy_degrees.to_radians(),
			aspect: config.viewport_width as f32 / config.viewport_height as f32,
			viewport_height: config.viewport_height as f32,
			pixel_length_target: config.pixel_length_target,
			meshlet_level: config.meshlet_level,
			cull: config.cull,
		}
	}

	/// Eye position at `frame`, kept `eye_height` above the ground.
	pub fn eye(&self, frame: u32, terrain: &impl HeightSource) -> Vec3 {
		let angle = frame as f32 * self.radians_per_frame;
		let x = self.center.x + self.radius * angle.cos();
		let z = self.center.z + self.radius * angle.sin();
		Vec3::new(x, terrain.height(x, z) + self.eye_height, z)
	}

	/// View parameters at `frame`.
	pub fn view(&self, frame: u32, terrain: &impl HeightSource) -> ViewParameters {
		let eye = self.eye(frame, terrain);
		// Look along the orbit tangent, tilted down towards the ground.
		let angle = frame as f32 * self.radians_per_frame;
		let forward = Vec3::new(-angle.sin(), -0.2, angle.cos());
		ViewParameters {
			pixel_length_target: self.pixel_length_target,
			meshlet_level: self.meshlet_level,
			cull: self.cull,
			..ViewParameters::look_at(
				eye,
				eye + forward,
				self.fovy,
				self.aspect,
				self.viewport_height,
			)
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use cbt_plugin::FlatHeight;

	#[test]
	fn test_eye_follows_orbit() {
		let camera = OrbitCamera::new(&CameraConfig::default(), 1000.0);

		let start = camera.eye(0, &FlatHeight);
		assert!((start - Vec3::new(850.0, 12.0, 500.0)).length() < 1e-3);

		let hills = |_: f32, _: f32| 30.0;
		assert!((camera.eye(0, &hills).y - 42.0).abs() < 1e-5);
	}

	#[test]
	fn test_view_carries_lod_settings() {
		let config = CameraConfig {
			pixel_length_target: 3.0,
			meshlet_level: 2,
			..Default::default()
		};
		let view = OrbitCamera::new(&config, 512.0).view(10, &FlatHeight);

		assert_eq!(view.pixel_length_target, 3.0);
		assert_eq!(view.meshlet_level, 2);
		assert_eq!(view.viewport_height, 1080.0);
	}
}
