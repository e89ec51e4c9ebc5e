//! Configuration parsing for the terrain driver.

use anyhow::{Context, Result};
use cbt_plugin::{BaseShape, CbtConfig, ElementTemplate, HeapInit, ReductionStrategy};
use serde::Deserialize;
use std::path::Path;

/// Root configuration for a terrain run.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
	/// Deepest subdivision level of the tree.
	#[serde(default = "default_max_depth")]
	pub max_depth: u32,
	/// Base shape covering the terrain.
	#[serde(default)]
	pub shape: ShapeName,
	/// Side length of the terrain in world units.
	#[serde(default = "default_extent")]
	pub extent: f32,
	/// Vertical scale applied to the height source.
	#[serde(default = "default_height_scale")]
	pub height_scale: f32,
	/// Frames to simulate.
	#[serde(default = "default_frames")]
	pub frames: u32,
	/// Worker threads (default: one per core).
	#[serde(default)]
	pub threads: Option<usize>,
	/// Elements per worker batch and per indirect workgroup.
	#[serde(default = "default_workgroup_size")]
	pub workgroup_size: u32,
	/// Sum reduction strategy.
	#[serde(default)]
	pub reduction: ReductionName,
	/// Grayscale heightmap, relative to the config file (procedural if absent).
	#[serde(default)]
	pub heightmap: Option<String>,
	/// Scripted camera.
	#[serde(default)]
	pub camera: CameraConfig,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShapeName {
	Triangle,
	#[default]
	Square,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReductionName {
	#[default]
	LevelByLevel,
	Prepass,
}

/// Orbiting camera parameters.
#[derive(Debug, Clone, Deserialize)]
pub struct CameraConfig {
	/// Orbit radius as a fraction of the terrain extent.
	#[serde(default = "default_orbit_radius")]
	pub orbit_radius: f32,
	/// Eye height above the terrain surface.
	#[serde(default = "default_eye_height")]
	pub eye_height: f32,
	/// Orbit speed in degrees per frame.
	#[serde(default = "default_orbit_speed")]
	pub degrees_per_frame: f32,
	/// Vertical field of view in degrees.
	#[serde(default = "default_fovy")]
	pub fovy_degrees: f32,
	#[serde(default = "default_viewport_width")]
	pub viewport_width: u32,
	#[serde(default = "default_viewport_height")]
	pub viewport_height: u32,
	/// Target on-screen edge length in pixels.
	#[serde(default = "default_pixel_length")]
	pub pixel_length_target: f32,
	/// Subdivision level of the instanced meshlet.
	#[serde(default = "default_meshlet_level")]
	pub meshlet_level: u32,
	/// Merge elements outside the view frustum.
	#[serde(default = "default_cull")]
	pub cull: bool,
}

impl Default for CameraConfig {
	fn default() -> Self {
		Self {
			orbit_radius: default_orbit_radius(),
			eye_height: default_eye_height(),
			degrees_per_frame: default_orbit_speed(),
			fovy_degrees: default_fovy(),
			viewport_width: default_viewport_width(),
			viewport_height: default_viewport_height(),
			pixel_length_target: default_pixel_length(),
			meshlet_level: default_meshlet_level(),
			cull: default_cull(),
		}
	}
}

fn default_max_depth() -> u32 {
	20
}

fn default_extent() -> f32 {
	1024.0
}

fn default_height_scale() -> f32 {
	64.0
}

fn default_frames() -> u32 {
	240
}

fn default_workgroup_size() -> u32 {
	256
}

fn default_orbit_radius() -> f32 {
	0.35
}

fn default_eye_height() -> f32 {
	12.0
}

fn default_orbit_speed() -> f32 {
	1.5
}

fn default_fovy() -> f32 {
	60.0
}

fn default_viewport_width() -> u32 {
	1920
}

fn default_viewport_height() -> u32 {
	1080
}

fn default_pixel_length() -> f32 {
	7.0
}

fn default_meshlet_level() -> u32 {
	3
}

fn default_cull() -> bool {
	true
}

impl Default for Config {
	fn default() -> Self {
		Self {
			max_depth: default_max_depth(),
			shape: ShapeName::default(),
			extent: default_extent(),
			height_scale: default_height_scale(),
			frames: default_frames(),
			threads: None,
			workgroup_size: default_workgroup_size(),
			reduction: ReductionName::default(),
			heightmap: None,
			camera: CameraConfig::default(),
		}
	}
}

impl Config {
	/// Load configuration from a TOML file.
	pub fn load(path: &Path) -> Result<Self> {
		let content = std::fs::read_to_string(path)
			.with_context(|| format!("Failed to read config file: {}", path.display()))?;
		let config: Config =
			toml::from_str(&content).with_context(|| "Failed to parse config TOML")?;
		config.validate()?;
		Ok(config)
	}

	pub fn validate(&self) -> Result<()> {
		if self.extent.is_nan() || self.extent <= 0.0 {
			anyhow::bail!("extent must be positive, got {}", self.extent);
		}
		if self.workgroup_size == 0 {
			anyhow::bail!("workgroup_size must be at least 1");
		}
		if self.threads == Some(0) {
			anyhow::bail!("threads must be at least 1 when set");
		}
		if self.camera.viewport_width == 0 || self.camera.viewport_height == 0 {
			anyhow::bail!(
				"viewport must be non-empty, got {}x{}",
				self.camera.viewport_width,
				self.camera.viewport_height
			);
		}
		if !(1.0..179.0).contains(&self.camera.fovy_degrees) {
			anyhow::bail!(
				"fovy_degrees must be in 1..179, got {}",
				self.camera.fovy_degrees
			);
		}
		self.cbt_config()
			.validate()
			.context("Invalid subdivision settings")?;
		Ok(())
	}

	/// Settings for the subdivision session.
	pub fn cbt_config(&self) -> CbtConfig {
		let shape = match self.shape {
			ShapeName::Triangle => BaseShape::Triangle,
			ShapeName::Square => BaseShape::Square,
		};
		let reduction = match self.reduction {
			ReductionName::LevelByLevel => ReductionStrategy::LevelByLevel,
			ReductionName::Prepass => ReductionStrategy::Prepass,
		};
		CbtConfig {
			max_depth: self.max_depth,
			shape,
			init: HeapInit::Depth(shape.min_depth()),
			template: ElementTemplate::with_extent(self.extent),
			reduction,
			workgroup_size: self.workgroup_size,
		}
	}
}
