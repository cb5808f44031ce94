//! Minimal host-side driver: opens the panel, optionally runs the
//! boot-animation-skip handshake, then pushes composited frames at a fixed
//! cadence while printing the metrics snapshot every so often. Stands in
//! for "the host GUI" only far enough to prove the facade's public API is
//! usable end to end -- it draws no overlays and persists no configuration.

use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;

use lcd_core::{Compositor, LcdPanel, SystemInfoPoller};

/// Drive the panel with a composited background for a fixed number of frames.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Path to a static background image (any format the `image` crate decodes).
    #[arg(long, default_value = "")]
    image: String,

    /// Path to a background video (.mp4/.avi/.mov/.mkv).
    #[arg(long, default_value = "")]
    video: String,

    /// Number of frames to push before exiting.
    #[arg(long, default_value_t = 200)]
    frames: u32,

    /// Target frame rate, in Hz.
    #[arg(long, default_value_t = 25.0)]
    fps: f64,

    /// Skip the best-effort boot-animation handshake.
    #[arg(long)]
    skip_handshake: bool,

    /// Print the metrics snapshot every N frames.
    #[arg(long, default_value_t = 25)]
    metrics_every: u32,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut metrics = SystemInfoPoller::new();
    metrics.start();

    let mut panel = LcdPanel::open().context("opening the panel over USB")?;
    if !args.skip_handshake {
        let skipped = panel.run_startup_handshake();
        log::info!("startup handshake {}", if skipped { "completed" } else { "did not settle (advisory only)" });
    }

    let mut compositor = Compositor::new();
    let frame_period = Duration::from_secs_f64(1.0 / args.fps.max(1.0));

    for frame_idx in 0..args.frames {
        let start = Instant::now();
        let rgb = compositor.get_background_bytes(&args.video, &args.image);

        match panel.upload_frame(&rgb) {
            Ok(true) => {}
            Ok(false) => log::warn!("frame {frame_idx} upload rejected by the panel"),
            Err(e) => log::error!("frame {frame_idx} upload failed: {e}"),
        }

        if args.metrics_every > 0 && frame_idx % args.metrics_every == 0 {
            let snapshot = metrics.get_info();
            let mut keys: Vec<&String> = snapshot.keys().collect();
            keys.sort();
            let line: Vec<String> = keys.iter().map(|k| format!("{k}={:.1}", snapshot[*k])).collect();
            log::info!("frame {frame_idx}: {}", line.join(" "));
        }

        let elapsed = start.elapsed();
        if elapsed < frame_period {
            thread::sleep(frame_period - elapsed);
        }
    }

    compositor.stop();
    metrics.stop();
    panel.close();
    Ok(())
}
