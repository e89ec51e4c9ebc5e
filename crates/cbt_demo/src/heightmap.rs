//! Terrain height sources: grayscale images or a procedural fallback.

use anyhow::{Context, Result};
use cbt_plugin::HeightSource;
use std::path::Path;

/// Height field over the `[0, extent]^2` square of the XZ plane.
pub enum Terrain {
	/// Bilinearly sampled grayscale image, row 0 at `z = 0`.
	Image {
		samples: Vec<f32>,
		width: u32,
		height: u32,
		extent: f32,
		scale: f32,
	},
	/// Rolling hills from a few octaves of sines.
	Procedural { extent: f32, scale: f32 },
}

impl Terrain {
	/// Load a heightmap and normalize it to `[0, scale]`.
	pub fn load(path: &Path, extent: f32, scale: f32) -> Result<Self> {
		let image = image::open(path)
			.with_context(|| format!("Failed to open heightmap: {}", path.display()))?
			.to_luma32f();
		let (width, height) = image.dimensions();
		if width < 2 || height < 2 {
			anyhow::bail!("Heightmap must be at least 2x2, got {}x{}", width, height);
		}

		Ok(Self::Image {
			samples: image.into_raw(),
			width,
			height,
			extent,
			scale,
		})
	}

	pub fn procedural(extent: f32, scale: f32) -> Self {
		Self::Procedural { extent, scale }
	}

	pub fn describe(&self) -> String {
		match self {
			Terrain::Image { width, height, .. } => format!("heightmap {}x{}", width, height),
			Terrain::Procedural { .. } => "procedural hills".to_string(),
		}
	}
}

impl HeightSource for Terrain {
	fn height(&self, x: f32, z: f32) -> f32 {
		match self {
			Terrain::Image {
				samples,
				width,
				height,
				extent,
				scale,
			} => {
				let u = (x / extent).clamp(0.0, 1.0) * (*width - 1) as f32;
				let v = (z / extent).clamp(0.0, 1.0) * (*height - 1) as f32;
				let x0 = (u.floor() as u32).min(width - 2);
				let y0 = (v.floor() as u32).min(height - 2);
				let fx = u - x0 as f32;
				let fy = v - y0 as f32;

				let at = |x: u32, y: u32| samples[(y * width + x) as usize];
				let top = at(x0, y0) * (1.0 - fx) + at(x0 + 1, y0) * fx;
				let bottom = at(x0, y0 + 1) * (1.0 - fx) + at(x0 + 1, y0 + 1) * fx;
				(top * (1.0 - fy) + bottom * fy) * scale
			}
			Terrain::Procedural { extent, scale } => {
				let tau = std::f32::consts::TAU;
				let (u, v) = (x / extent, z / extent);
				let hills = (u * tau * 2.0).sin() * (v * tau * 1.5).cos();
				let ridges = 0.5 * (u * tau * 7.0 + v * tau * 3.0).sin();
				let bumps = 0.25 * (u * tau * 23.0).cos() * (v * tau * 19.0).sin();
				(0.5 + 0.35 * (hills + ridges + bumps) / 1.75) * scale
			}
		}
	}
}
