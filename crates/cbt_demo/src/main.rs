//! Headless adaptive terrain driver.
//!
//! Flies a scripted camera over a height field and refines a longest edge
//! bisection of the terrain each frame, printing element counts, timings and
//! the final depth histogram. Optionally writes the final heap as raw bytes,
//! ready for a GPU storage buffer upload.

mod camera;
mod config;
mod heightmap;

use anyhow::{Context, Result};
use cbt_plugin::metrics::SessionMetrics;
use cbt_plugin::{Dispatcher, HeightSource, LebSession, Meshlet, RayonDispatcher, ScreenSpaceLod};
use clap::Parser;
use std::path::{Path, PathBuf};

use camera::OrbitCamera;
use config::Config;
use heightmap::Terrain;

/// Headless adaptive terrain driver for the concurrent binary tree.
#[derive(Parser, Debug)]
#[command(name = "leb_terrain")]
#[command(about = "Refines a terrain with longest edge bisection under a scripted camera")]
struct Args {
	/// Path to configuration TOML file (defaults apply if omitted).
	#[arg(short, long)]
	config: Option<PathBuf>,

	/// Override the number of frames to simulate.
	#[arg(short, long)]
	frames: Option<u32>,

	/// Override the maximum subdivision depth.
	#[arg(short = 'd', long)]
	max_depth: Option<u32>,

	/// Override the worker thread count.
	#[arg(short, long)]
	threads: Option<usize>,

	/// Override the heightmap image.
	#[arg(long)]
	heightmap: Option<PathBuf>,

	/// Print progress every N frames.
	#[arg(long, default_value_t = 30)]
	report_every: u32,

	/// Write the final heap bytes to this file.
	#[arg(long)]
	dump: Option<PathBuf>,
}

fn main() -> Result<()> {
	let args = Args::parse();

	let mut config = match &args.config {
		Some(path) => {
			println!("Loading config from: {}", path.display());
			Config::load(path)?
		}
		None => Config::default(),
	};
	if let Some(frames) = args.frames {
		config.frames = frames;
	}
	if let Some(max_depth) = args.max_depth {
		config.max_depth = max_depth;
	}
	if let Some(threads) = args.threads {
		config.threads = Some(threads);
	}
	config.validate()?;

	// Heightmap paths in the config are relative to the config file
	let config_dir = args
		.config
		.as_deref()
		.and_then(Path::parent)
		.unwrap_or(Path::new("."));
	let heightmap_path = args
		.heightmap
		.clone()
		.or_else(|| config.heightmap.as_ref().map(|p| config_dir.join(p)));
	let terrain = match heightmap_path {
		Some(path) => Terrain::load(&path, config.extent, config.height_scale)?,
		None => Terrain::procedural(config.extent, config.height_scale),
	};

	let cbt_config = config.cbt_config();
	let mut session = LebSession::new(cbt_config).context("Failed to create session")?;

	let dispatcher = match config.threads {
		Some(threads) => {
			RayonDispatcher::with_threads(threads).context("Failed to build thread pool")?
		}
		None => RayonDispatcher::new(),
	}
	.with_min_len(config.workgroup_size as usize);

	println!(
		"Refining {} over {}x{} units: max depth {}, {:?} base, {} heap bytes, {} workers",
		terrain.describe(),
		config.extent,
		config.extent,
		cbt_config.max_depth,
		cbt_config.shape,
		session.heap().byte_size(),
		dispatcher.worker_count(),
	);

	let camera = OrbitCamera::new(&config.camera, config.extent);
	let mut metrics = SessionMetrics::new();
	let height = |x: f32, z: f32| terrain.height(x, z);

	for frame in 0..config.frames {
		let view = camera.view(frame, &terrain);
		let criterion = ScreenSpaceLod::new(view, height);
		let stats = session.update(&criterion, &dispatcher);
		metrics.record_frame(&stats);

		if args.report_every > 0 && (frame + 1) % args.report_every == 0 {
			println!(
				"  frame {:>5} {:?}: {:>8} elements, update {:>6} us, reduce {:>6} us",
				frame + 1,
				stats.pass,
				stats.active_count,
				stats.update_us,
				stats.reduction_us
			);
		}
	}

	metrics.update_from_session(&session);
	print_summary(&session, &metrics, config.camera.meshlet_level);

	if let Some(path) = &args.dump {
		std::fs::write(path, session.heap().to_bytes())
			.with_context(|| format!("Failed to write heap dump: {}", path.display()))?;
		println!("\nHeap written to: {}", path.display());
	}

	Ok(())
}

fn print_summary(session: &LebSession, metrics: &SessionMetrics, meshlet_level: u32) {
	let meshlet = Meshlet::tessellate(meshlet_level);
	let draw = session.draw_args(&meshlet);
	let dispatch = session.dispatch_args();

	println!("\nFinal partition: {} elements", session.active_count());
	println!(
		"  draw: {} indices x {} instances, dispatch: {} workgroups",
		draw.index_count, draw.instance_count, dispatch.x
	);

	if metrics.frames == 0 {
		return;
	}

	println!(
		"  avg update {:.1} us, avg reduction {:.1} us over the last {} frames",
		metrics.avg_update_timing_us(),
		metrics.avg_reduction_timing_us(),
		metrics.update_timings.len()
	);
	if let Some((min, max)) = metrics.active_counts.min_max() {
		println!("  element count range: {}..={}", min, max);
	}
	println!(
		"  {} splits, {} clamped, {} merged leaves",
		metrics.total_splits, metrics.total_clamped_splits, metrics.total_merged_leaves
	);

	println!("\nElements per depth:");
	if let Some(deepest) = metrics.deepest_level() {
		for (depth, count) in metrics.leaves_per_depth[..=deepest].iter().enumerate() {
			if *count > 0 {
				println!("  {:>2}: {}", depth, count);
			}
		}
	}
}
