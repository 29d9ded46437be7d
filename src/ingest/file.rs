//! Local file frame source.
//!
//! `FileSource` reads frames from:
//! - a single image file (JPEG, PNG, BMP)
//! - a directory of image files and raw dumps, in file-name order
//! - raw sensor dumps (`.raw`), decoded with a configured `RawLayout`
//! - `stub://<scene>` synthetic scenes for tests and demos
//!
//! The file source never fetches remote URLs and never writes frames back.

use std::fs;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Instant;

use anyhow::{anyhow, Context, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Deserialize;

use super::normalize::{normalize_to_gray, PixelFormat};
use super::{decode_image, frame_interval, FrameSource, SourceStats};
use crate::frame::GrayFrame;

/// Frame size of the synthetic scenes, matching the camera's 240x240 mode.
pub const SYNTHETIC_SIZE: u32 = 240;

const IMAGE_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "bmp", "raw"];

/// Geometry and pixel format of `.raw` sensor dumps.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
pub struct RawLayout {
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub format: PixelFormat,
}

/// Configuration for a local file source.
#[derive(Clone, Debug)]
pub struct FileConfig {
    /// Local file or directory path, or `stub://<scene>`.
    pub path: String,
    /// Target frame rate. Frames are paced to this rate; 0 delivers them
    /// as fast as they can be decoded.
    pub target_fps: u32,
    /// Required to read `.raw` files.
    pub raw: Option<RawLayout>,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            path: String::new(),
            target_fps: 10,
            raw: None,
        }
    }
}

/// Local file frame source.
pub struct FileSource {
    config: FileConfig,
    backend: FileBackend,
    last_frame_at: Option<Instant>,
    frame_count: u64,
}

enum FileBackend {
    Synthetic(SyntheticScene),
    Sequence(ImageSequence),
}

impl FileSource {
    pub fn new(config: FileConfig) -> Result<Self> {
        if !is_local_file_path(&config.path) {
            return Err(anyhow!(
                "file ingestion only supports local paths (no URL schemes)"
            ));
        }
        let backend = match config.path.strip_prefix("stub://") {
            Some(scene) => FileBackend::Synthetic(SyntheticScene::new(scene)?),
            None => FileBackend::Sequence(ImageSequence::new(Path::new(&config.path), config.raw)?),
        };
        Ok(Self {
            config,
            backend,
            last_frame_at: None,
            frame_count: 0,
        })
    }

    fn pace(&mut self) {
        let interval = frame_interval(self.config.target_fps);
        if let Some(last) = self.last_frame_at {
            let elapsed = last.elapsed();
            if elapsed < interval {
                thread::sleep(interval - elapsed);
            }
        }
        self.last_frame_at = Some(Instant::now());
    }
}

impl FrameSource for FileSource {
    fn connect(&mut self) -> Result<()> {
        match &self.backend {
            FileBackend::Synthetic(_) => {
                log::info!("FileSource: connected to {} (synthetic)", self.config.path)
            }
            FileBackend::Sequence(seq) => log::info!(
                "FileSource: connected to {} ({} files)",
                self.config.path,
                seq.paths.len()
            ),
        }
        Ok(())
    }

    fn next_frame(&mut self) -> Result<Option<GrayFrame>> {
        let frame = match &mut self.backend {
            FileBackend::Synthetic(scene) => Some(scene.render(self.frame_count)?),
            FileBackend::Sequence(seq) => seq.next_frame()?,
        };
        if frame.is_some() {
            self.pace();
            self.frame_count += 1;
        }
        Ok(frame)
    }

    fn is_healthy(&self) -> bool {
        match &self.backend {
            FileBackend::Synthetic(_) => true,
            FileBackend::Sequence(seq) => seq.next < seq.paths.len(),
        }
    }

    fn stats(&self) -> SourceStats {
        SourceStats {
            frames_captured: self.frame_count,
            source: self.config.path.clone(),
        }
    }
}

// ----------------------------------------------------------------------------
// Image files and raw dumps
// ----------------------------------------------------------------------------

struct ImageSequence {
    paths: Vec<PathBuf>,
    raw: Option<RawLayout>,
    next: usize,
}

impl ImageSequence {
    fn new(path: &Path, raw: Option<RawLayout>) -> Result<Self> {
        let paths = if path.is_dir() {
            let mut paths = Vec::new();
            for entry in fs::read_dir(path)
                .with_context(|| format!("failed to read directory {}", path.display()))?
            {
                let entry_path = entry?.path();
                if entry_path.is_file() && has_frame_extension(&entry_path) {
                    paths.push(entry_path);
                }
            }
            paths.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
            if paths.is_empty() {
                return Err(anyhow!("no image files in {}", path.display()));
            }
            paths
        } else if path.is_file() {
            vec![path.to_path_buf()]
        } else {
            return Err(anyhow!("frame source {} does not exist", path.display()));
        };
        if raw.is_none() && paths.iter().any(|p| is_raw(p)) {
            return Err(anyhow!("raw frame files require a raw layout (width, height, format)"));
        }
        Ok(Self {
            paths,
            raw,
            next: 0,
        })
    }

    fn next_frame(&mut self) -> Result<Option<GrayFrame>> {
        let Some(path) = self.paths.get(self.next) else {
            return Ok(None);
        };
        self.next += 1;
        let bytes =
            fs::read(path).with_context(|| format!("failed to read frame {}", path.display()))?;
        let frame = match self.raw {
            Some(layout) if is_raw(path) => {
                normalize_to_gray(&bytes, layout.width, layout.height, layout.format)
            }
            _ => decode_image(&bytes),
        }
        .with_context(|| format!("failed to decode frame {}", path.display()))?;
        Ok(Some(frame))
    }
}

fn has_frame_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

fn is_raw(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("raw"))
}

// ----------------------------------------------------------------------------
// Synthetic scenes (stub://) for tests
// ----------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum SceneKind {
    /// Fixed gradient with sensor noise.
    Static,
    /// A bright square crossing a dark background.
    MovingSquare,
    /// Background brightness toggling every 10 frames.
    Flash,
}

struct SyntheticScene {
    kind: SceneKind,
    rng: StdRng,
}

const SQUARE_SIZE: u32 = 16;
const SQUARE_STEP: u32 = 4;
const NOISE: i16 = 3;

impl SyntheticScene {
    fn new(name: &str) -> Result<Self> {
        let kind = match name {
            "" | "static" => SceneKind::Static,
            "moving-square" => SceneKind::MovingSquare,
            "flash" => SceneKind::Flash,
            other => return Err(anyhow!("unknown synthetic scene '{}'", other)),
        };
        Ok(Self {
            kind,
            rng: StdRng::seed_from_u64(0x5eed),
        })
    }

    fn render(&mut self, index: u64) -> Result<GrayFrame> {
        let mut frame = match self.kind {
            SceneKind::Static => self.gradient()?,
            SceneKind::MovingSquare => {
                let mut frame = GrayFrame::filled(SYNTHETIC_SIZE, SYNTHETIC_SIZE, 30)?;
                let (x, y) = square_origin(index);
                frame.fill_rect(x, y, x + SQUARE_SIZE - 1, y + SQUARE_SIZE - 1, 200);
                frame
            }
            SceneKind::Flash => {
                let level = if (index / 10) % 2 == 1 { 220 } else { 30 };
                GrayFrame::filled(SYNTHETIC_SIZE, SYNTHETIC_SIZE, level)?
            }
        };
        self.add_noise(&mut frame);
        Ok(frame)
    }

    fn gradient(&self) -> Result<GrayFrame> {
        let mut data = Vec::with_capacity((SYNTHETIC_SIZE * SYNTHETIC_SIZE) as usize);
        for y in 0..SYNTHETIC_SIZE {
            for x in 0..SYNTHETIC_SIZE {
                data.push(((x + y) / 2).min(255) as u8);
            }
        }
        Ok(GrayFrame::new(SYNTHETIC_SIZE, SYNTHETIC_SIZE, data)?)
    }

    fn add_noise(&mut self, frame: &mut GrayFrame) {
        let (width, height) = frame.dimensions();
        for y in 0..height {
            for x in 0..width {
                let jitter = self.rng.gen_range(-NOISE..=NOISE);
                let value = (frame.get(x, y) as i16 + jitter).clamp(0, 255) as u8;
                frame.set(x, y, value);
            }
        }
    }
}

/// Top-left corner of the moving square in frame `index`.
pub(crate) fn square_origin(index: u64) -> (u32, u32) {
    let span = (SYNTHETIC_SIZE - SQUARE_SIZE) as u64;
    let x = (index * SQUARE_STEP as u64) % span;
    let y = (index * (SQUARE_STEP / 2) as u64) % span;
    (x as u32, y as u32)
}

fn is_local_file_path(path: &str) -> bool {
    if path.trim().is_empty() {
        return false;
    }
    if path.starts_with("stub://") {
        return true;
    }
    !path.contains("://")
}
