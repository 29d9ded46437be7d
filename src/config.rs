use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::detect::{LabelingStrategy, MotionParams};
use crate::encode::{OutputFormat, DEFAULT_JPEG_QUALITY};
use crate::ingest::{FileConfig, RawLayout};

const DEFAULT_SOURCE: &str = "stub://moving-square";
const DEFAULT_TARGET_FPS: u32 = 10;

#[derive(Debug, Deserialize, Default)]
struct MotiondConfigFile {
    source: Option<SourceConfigFile>,
    detection: Option<DetectionConfigFile>,
    output: Option<OutputConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct SourceConfigFile {
    path: Option<String>,
    target_fps: Option<u32>,
    raw: Option<RawLayout>,
}

#[derive(Debug, Deserialize, Default)]
struct DetectionConfigFile {
    threshold: Option<u8>,
    min_pixels: Option<usize>,
    max_component_fraction: Option<f32>,
    global_coverage: Option<f32>,
    max_regions: Option<usize>,
    smoothing_kernel: Option<u32>,
    labeling: Option<LabelingStrategy>,
    box_color: Option<u8>,
}

#[derive(Debug, Deserialize, Default)]
struct OutputConfigFile {
    dir: Option<PathBuf>,
    format: Option<OutputFormat>,
    jpeg_quality: Option<u8>,
    only_on_motion: Option<bool>,
}

#[derive(Debug, Clone)]
pub struct MotiondConfig {
    pub source: FileConfig,
    pub detection: MotionParams,
    pub output: OutputSettings,
}

#[derive(Debug, Clone)]
pub struct OutputSettings {
    /// Directory for annotated frames; nothing is written when unset.
    pub dir: Option<PathBuf>,
    pub format: OutputFormat,
    pub jpeg_quality: u8,
    /// Only write frames in which motion was detected.
    pub only_on_motion: bool,
}

impl MotiondConfig {
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("MOTION_CONFIG").ok();
        let file_cfg = match config_path.as_deref() {
            Some(path) if !path.trim().is_empty() => Some(read_config_file(Path::new(path))?),
            _ => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default());
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: MotiondConfigFile) -> Self {
        let source = file.source.unwrap_or_default();
        let source = FileConfig {
            path: source.path.unwrap_or_else(|| DEFAULT_SOURCE.to_string()),
            target_fps: source.target_fps.unwrap_or(DEFAULT_TARGET_FPS),
            raw: source.raw,
        };

        let defaults = MotionParams::default();
        let detection = file.detection.unwrap_or_default();
        let detection = MotionParams {
            threshold: detection.threshold.unwrap_or(defaults.threshold),
            min_pixels: detection.min_pixels.unwrap_or(defaults.min_pixels),
            max_component_fraction: detection
                .max_component_fraction
                .unwrap_or(defaults.max_component_fraction),
            global_coverage: detection
                .global_coverage
                .unwrap_or(defaults.global_coverage),
            max_regions: detection.max_regions.or(defaults.max_regions),
            smoothing_kernel: detection.smoothing_kernel.or(defaults.smoothing_kernel),
            labeling: detection.labeling.unwrap_or(defaults.labeling),
            box_color: detection.box_color.unwrap_or(defaults.box_color),
            ..defaults
        };

        let output = file.output.unwrap_or_default();
        let output = OutputSettings {
            dir: output.dir,
            format: output.format.unwrap_or_default(),
            jpeg_quality: output.jpeg_quality.unwrap_or(DEFAULT_JPEG_QUALITY),
            only_on_motion: output.only_on_motion.unwrap_or(false),
        };

        Self {
            source,
            detection,
            output,
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(source) = std::env::var("MOTION_SOURCE") {
            if !source.trim().is_empty() {
                self.source.path = source;
            }
        }
        if let Some(fps) = parse_env::<u32>("MOTION_TARGET_FPS", "an integer frame rate")? {
            self.source.target_fps = fps;
        }
        if let Some(threshold) = parse_env::<u8>("MOTION_THRESHOLD", "an integer in 0..=255")? {
            self.detection.threshold = threshold;
        }
        if let Some(min_pixels) = parse_env::<usize>("MOTION_MIN_PIXELS", "an integer pixel count")? {
            self.detection.min_pixels = min_pixels;
        }
        if let Ok(dir) = std::env::var("MOTION_OUTPUT_DIR") {
            if !dir.trim().is_empty() {
                self.output.dir = Some(PathBuf::from(dir));
            }
        }
        if let Ok(format) = std::env::var("MOTION_OUTPUT_FORMAT") {
            if !format.trim().is_empty() {
                self.output.format = format.parse()?;
            }
        }
        Ok(())
    }

    fn validate(&mut self) -> Result<()> {
        self.source.path = self.source.path.trim().to_string();
        if self.source.path.is_empty() {
            return Err(anyhow!("source path must not be empty"));
        }
        self.detection
            .validate()
            .map_err(|e| anyhow!("invalid detection settings: {}", e))?;
        if !(1..=100).contains(&self.output.jpeg_quality) {
            return Err(anyhow!(
                "output jpeg_quality must be in 1..=100, got {}",
                self.output.jpeg_quality
            ));
        }
        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, expected: &str) -> Result<Option<T>> {
    match std::env::var(key) {
        Ok(value) if !value.trim().is_empty() => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| anyhow!("{} must be {}", key, expected)),
        _ => Ok(None),
    }
}

fn read_config_file(path: &Path) -> Result<MotiondConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let is_toml = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
    let cfg = if is_toml {
        toml::from_str(&raw).map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    } else {
        serde_json::from_str(&raw)
            .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    };
    Ok(cfg)
}
