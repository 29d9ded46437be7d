//! motiond - streaming motion detector
//!
//! This daemon:
//! 1. Pulls frames from the configured source (files, synthetic scene, ESP32 camera)
//! 2. Runs frame-difference motion detection against the previous frame
//! 3. Prints one JSON line per compared frame
//! 4. Optionally writes annotated frames to an output directory

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use serde::Serialize;
use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use motion_kernel::config::MotiondConfig;
use motion_kernel::encode::write_frame;
use motion_kernel::ingest::open_source;
use motion_kernel::stats::RunningAverage;
use motion_kernel::{DetectionResult, DetectorBackend, FrameDiffBackend};

const LATENCY_WINDOW: usize = 20;
const LATENCY_LOG_EVERY: u64 = 50;
const MAX_CONSECUTIVE_SOURCE_ERRORS: u32 = 5;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Frame source: image file, directory, stub://<scene>, or camera URL.
    #[arg(long)]
    source: Option<String>,
    /// Directory for annotated frames.
    #[arg(long)]
    out: Option<PathBuf>,
    /// Stop after this many frames.
    #[arg(long)]
    max_frames: Option<u64>,
}

#[derive(Serialize)]
struct FrameEvent<'a> {
    frame: u64,
    latency_us: u64,
    #[serde(flatten)]
    result: &'a DetectionResult,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let mut cfg = MotiondConfig::load()?;
    if let Some(source) = args.source {
        if source.trim().is_empty() {
            return Err(anyhow!("--source must not be empty"));
        }
        cfg.source.path = source;
    }
    if let Some(out) = args.out {
        cfg.output.dir = Some(out);
    }
    if let Some(dir) = &cfg.output.dir {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create output directory {}", dir.display()))?;
    }

    let running = Arc::new(AtomicBool::new(true));
    let handler_flag = running.clone();
    ctrlc::set_handler(move || {
        handler_flag.store(false, Ordering::SeqCst);
    })
    .context("error setting Ctrl-C handler")?;

    let mut backend = FrameDiffBackend::new(cfg.detection.clone())?;
    backend.warm_up()?;
    let mut source = open_source(cfg.source.clone())?;
    source.connect()?;
    log::info!(
        "motiond running: source={} threshold={} min_pixels={} labeling={:?}",
        cfg.source.path,
        cfg.detection.threshold,
        cfg.detection.min_pixels,
        cfg.detection.labeling
    );

    let mut latency = RunningAverage::new(LATENCY_WINDOW);
    let mut frames: u64 = 0;
    let mut motion_frames: u64 = 0;
    let mut source_errors = 0u32;
    let stdout = std::io::stdout();

    while running.load(Ordering::SeqCst) {
        if args.max_frames.is_some_and(|max| frames >= max) {
            break;
        }
        let frame = match source.next_frame() {
            Ok(Some(frame)) => {
                source_errors = 0;
                frame
            }
            Ok(None) => {
                log::info!("source exhausted");
                break;
            }
            Err(err) => {
                source_errors += 1;
                log::warn!("failed to capture frame: {:#}", err);
                if source_errors >= MAX_CONSECUTIVE_SOURCE_ERRORS {
                    return Err(err.context("frame source keeps failing"));
                }
                if !source.is_healthy() {
                    backend.reset();
                    source.connect()?;
                }
                continue;
            }
        };
        let index = frames;
        frames += 1;

        let started = Instant::now();
        let (width, height) = frame.dimensions();
        let result = match backend.detect(frame.pixels(), width, height) {
            Ok(result) => result,
            Err(err) => {
                log::warn!(
                    "detection failed on frame {}: {:#}; serving frame unannotated",
                    index,
                    err
                );
                DetectionResult::default()
            }
        };
        let avg = latency.push_duration(started.elapsed());
        if frames % LATENCY_LOG_EVERY == 0 {
            log::info!(
                "{} frames, {} with motion, avg detection latency {:?}",
                frames,
                motion_frames,
                avg
            );
        }

        if result.motion_detected {
            motion_frames += 1;
        }
        if result.compared {
            let event = FrameEvent {
                frame: index,
                latency_us: started.elapsed().as_micros() as u64,
                result: &result,
            };
            let line = serde_json::to_string(&event)?;
            writeln!(stdout.lock(), "{}", line)?;
        }

        if let Some(dir) = &cfg.output.dir {
            if cfg.output.only_on_motion && !result.motion_detected {
                continue;
            }
            let image = result.annotated.as_ref().unwrap_or(&frame);
            let path = dir.join(format!(
                "frame_{:06}.{}",
                index,
                cfg.output.format.extension()
            ));
            if let Err(err) = write_frame(&path, image, cfg.output.format, cfg.output.jpeg_quality)
            {
                log::warn!("failed to write {}: {:#}", path.display(), err);
            }
        }
    }

    let stats = source.stats();
    log::info!(
        "motiond stopped: {} frames from {}, {} with motion",
        stats.frames_captured,
        stats.source,
        motion_frames
    );
    Ok(())
}
