//! Umbra Shadow Preview
//!
//! Headless driver for the shadow pipeline. It builds a small demo scene,
//! renders a few frames for each camera through the reference culler and
//! logs what the GPU backend would receive.
//!
//! Run with: cargo run -p umbra_preview -- crates/umbra_preview/config/shadows.toml
//!       or: cargo run -p umbra_preview -- --quality high --frames 3
//!
//! Settings are taken from, in priority order:
//!
//! 1. A settings file given on the command line
//! 2. Environment variable: `UMBRA_SHADOW_SETTINGS=path/to/shadows.toml`
//! 3. `--quality low|medium|high|ultra`
//! 4. Built-in defaults

mod backend;
mod demo_scene;

use std::path::PathBuf;

use umbra_render::prelude::*;
use umbra_render::{FrameReport, Result};

use crate::backend::LoggingBackend;

/// Command line options
#[derive(Debug, Default)]
struct PreviewOptions {
    settings_path: Option<PathBuf>,
    quality: Option<ShadowQuality>,
    frames: u32,
    reversed_z: bool,
}

impl PreviewOptions {
    fn from_args() -> std::result::Result<Self, String> {
        let mut options = Self {
            frames: 1,
            settings_path: std::env::var_os("UMBRA_SHADOW_SETTINGS").map(PathBuf::from),
            ..Default::default()
        };

        let mut args = std::env::args().skip(1);
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--quality" | "-q" => {
                    let value = args.next().ok_or("--quality needs a value")?;
                    options.quality = Some(value.parse()?);
                }
                "--frames" | "-n" => {
                    let value = args.next().ok_or("--frames needs a value")?;
                    options.frames = value
                        .parse()
                        .map_err(|_| format!("Invalid frame count: {}", value))?;
                }
                "--reversed-z" => options.reversed_z = true,
                other if other.starts_with('-') => {
                    return Err(format!("Unknown option: {}", other));
                }
                path => options.settings_path = Some(PathBuf::from(path)),
            }
        }

        Ok(options)
    }

    fn settings(&self) -> Result<ShadowSettings> {
        if let Some(path) = &self.settings_path {
            return ShadowSettings::load(path);
        }
        Ok(self.quality.unwrap_or(ShadowQuality::Medium).to_settings())
    }
}

fn main() {
    // Initialize logging
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("info")
    ).init();

    let options = match PreviewOptions::from_args() {
        Ok(options) => options,
        Err(e) => {
            log::error!("{}", e);
            std::process::exit(2);
        }
    };

    if let Err(e) = run(&options) {
        log::error!("Preview failed: {}", e);
        std::process::exit(1);
    }
}

fn run(options: &PreviewOptions) -> Result<()> {
    let settings = options.settings()?;
    log::info!(
        "Shadow settings: atlas {}, {} cascades {:?}, filter {:?}, blend {:?}, distance {}",
        settings.directional.atlas_size,
        settings.directional.cascade_count,
        settings.directional.cascade_ratios,
        settings.directional.filter,
        settings.directional.cascade_blend,
        settings.max_distance,
    );

    let depth_range = if options.reversed_z {
        DepthRange::Reversed
    } else {
        DepthRange::Standard
    };

    let mut pipeline = RenderPipeline::new(settings).with_depth_range(depth_range);
    let cameras = demo_scene::cameras();
    let mut backend = LoggingBackend::default();

    for frame in 0..options.frames {
        log::info!("--- frame {} ---", frame);
        let mut culler = demo_scene::build(frame);

        for (camera, outcome) in cameras
            .iter()
            .zip(pipeline.render(&cameras, &mut culler, &mut backend))
        {
            match outcome {
                FrameOutcome::Rendered(report) => log_report(&report),
                FrameOutcome::Skipped(reason) => {
                    log::info!("Camera '{}' skipped: {:?}", camera.name, reason)
                }
            }
        }
    }

    backend.print_summary();
    Ok(())
}

fn log_report(report: &FrameReport) {
    log::info!(
        "Camera '{}': {} visible, {} directional ({} over limit), {} shadowed",
        report.camera,
        report.lights.visible,
        report.lights.directional,
        report.lights.directional_overflow,
        report.lights.shadowed,
    );
    log::info!(
        "  atlas {}x{} split {} tile {} ({:.0}% used), {} cascades, {} draws",
        report.layout.resolution,
        report.layout.resolution,
        report.layout.split,
        report.layout.tile_size,
        report.layout.utilization() * 100.0,
        report.cascades_rendered,
        report.commands.draws,
    );
    if report.reservations.total() > 0 {
        log::info!("  rejected reservations: {:?}", report.reservations);
    }
}
