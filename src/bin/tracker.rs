//! DOA Tracker Application
//!
//! Opens the array input device, runs the tracking pipeline synchronously
//! inside the capture callback, and renders tracked azimuths on a periodic
//! text surface. Without the numerical backend wired in, the synthetic
//! capabilities provide a deterministic bring-up scene.

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use doa_tracker::{
    audio::{capture::AudioCapture, device::list_devices},
    config::AppConfig,
    constants::FRAME_CHANNEL_CAPACITY,
    dsp::synthetic::{ScriptedScene, SyntheticAnalyzer, SyntheticLocalizer, UlaBeamformer},
    frame::FrameChannel,
    pipeline::Pipeline,
    render::{RenderLoop, TextSurface},
};

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting DOA tracker");

    // Load config: explicit path from argv, else platform default, else defaults
    let config = match std::env::args().nth(1) {
        Some(path) => AppConfig::load(&PathBuf::from(path)).context("loading config file")?,
        None => AppConfig::load_or_default().context("loading default config")?,
    };
    config.validate().context("validating config")?;

    // List available input devices
    println!("\n=== Available Input Devices ===");
    for device in list_devices() {
        let default_marker = if device.is_default { " [DEFAULT]" } else { "" };
        println!("  {}{}:", device.name, default_marker);
        println!("    Sample rates: {:?}", device.sample_rates);
        println!("    Max channels: {}", device.max_channels);
    }
    println!();

    // Device-open failure here is the one fatal startup error
    let mut capture = AudioCapture::new(&config.capture).context("opening capture device")?;
    let block_duration = capture.block_duration();
    tracing::info!(
        channels = config.capture.channels,
        sample_rate = config.capture.sample_rate,
        block_size = config.capture.block_size,
        "capture configured, block duration {:?}",
        block_duration
    );

    // Synthetic capabilities until the numerical backend is wired in;
    // swap these three for the production implementations.
    let scene = ScriptedScene::new(vec![60.0, 120.0]);
    let analyzer = SyntheticAnalyzer::new(
        scene.clone(),
        config.capture.channels as usize,
        config.tracking.eig_threshold,
    );
    let localizer = SyntheticLocalizer::new(scene);
    let beamformer = UlaBeamformer::new(5, 0.24);
    tracing::warn!("using synthetic array-processing capabilities (bring-up mode)");

    let mut pipeline = Pipeline::new(
        &config,
        Box::new(analyzer),
        Box::new(localizer),
        Box::new(beamformer),
    );

    let channel = Arc::new(FrameChannel::new(FRAME_CHANNEL_CAPACITY));
    let producer_channel = channel.clone();

    // The pipeline runs synchronously in the capture callback; a failed
    // block is logged and its cycle skipped, the stream continues.
    capture.start(move |block| {
        let index = block.index;
        match pipeline.process_block(block) {
            Ok(frame) => producer_channel.publish(frame),
            Err(e) => tracing::warn!(block = index, "block processing failed: {e}"),
        }
    })?;
    tracing::info!("audio capture started");

    let render_loop = RenderLoop::start(
        channel.clone(),
        Box::new(TextSurface),
        Duration::from_millis(config.display.render_interval_ms),
    )
    .context("starting render loop")?;
    tracing::info!("render loop started");

    // Main thread: surface device faults and periodic stats
    let mut last_blocks = 0u64;
    loop {
        std::thread::sleep(Duration::from_secs(5));

        while let Some(fault) = capture.check_faults() {
            tracing::warn!("device fault (non-fatal): {fault}");
        }

        let blocks = capture.blocks_captured();
        let sources = render_loop
            .last_frame()
            .map(|f| f.source_count)
            .unwrap_or(0);
        tracing::info!(
            "stats: {} blocks captured (+{}), {} frames dropped, {} sources tracked",
            blocks,
            blocks - last_blocks,
            channel.dropped_count(),
            sources
        );
        last_blocks = blocks;
    }
}
