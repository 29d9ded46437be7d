//! motion_diff - compare two images and report motion regions

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

use motion_kernel::encode::{write_frame, OutputFormat, DEFAULT_JPEG_QUALITY};
use motion_kernel::ingest::decode_image;
use motion_kernel::{detect_motion, BoundingBox, GrayFrame, LabelingStrategy, MotionParams};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Previous frame (JPEG, PNG or BMP).
    previous: PathBuf,
    /// Current frame (JPEG, PNG or BMP).
    current: PathBuf,
    /// Pixel difference that counts as change.
    #[arg(long, default_value_t = motion_kernel::detect::pipeline::DEFAULT_THRESHOLD)]
    threshold: u8,
    /// Minimum region size in pixels.
    #[arg(long, default_value_t = motion_kernel::detect::pipeline::DEFAULT_MIN_PIXELS)]
    min_pixels: usize,
    /// Keep at most this many regions.
    #[arg(long)]
    max_regions: Option<usize>,
    /// Odd mean-filter size applied before differencing.
    #[arg(long)]
    smoothing: Option<u32>,
    /// flood-fill or union-find.
    #[arg(long, default_value = "flood-fill")]
    labeling: LabelingStrategy,
    /// Write the annotated current frame here (format from the extension).
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(Serialize)]
struct Summary {
    motion: bool,
    foreground_pixels: usize,
    raw_components: usize,
    boxes: Vec<BoundingBox>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let previous = load(&args.previous)?;
    let current = load(&args.current)?;
    let params = MotionParams {
        threshold: args.threshold,
        min_pixels: args.min_pixels,
        max_regions: args.max_regions,
        smoothing_kernel: args.smoothing,
        labeling: args.labeling,
        annotate: args.out.is_some(),
        ..MotionParams::default()
    };
    let report = detect_motion(previous.view(), current.view(), &params)?;

    if let (Some(out), Some(annotated)) = (&args.out, &report.annotated) {
        let format = output_format(out)?;
        write_frame(out, annotated, format, DEFAULT_JPEG_QUALITY)?;
        log::info!("annotated frame written to {}", out.display());
    }

    let summary = Summary {
        motion: report.motion_detected(),
        foreground_pixels: report.foreground_pixels,
        raw_components: report.raw_component_count,
        boxes: report.boxes(),
    };
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

fn load(path: &Path) -> Result<GrayFrame> {
    let bytes = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    decode_image(&bytes).with_context(|| format!("failed to decode {}", path.display()))
}

fn output_format(path: &Path) -> Result<OutputFormat> {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) => ext.parse(),
        None => Ok(OutputFormat::Jpeg),
    }
}
