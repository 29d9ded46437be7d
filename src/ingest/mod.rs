//! Frame ingestion sources.
//!
//! Sources deliver 8-bit grayscale frames to the detector:
//! - Local image files, directories of images, raw sensor dumps
//! - `stub://` synthetic scenes (testing, demos)
//! - ESP32 camera web server snapshots or MJPEG (feature: ingest-esp32)
//!
//! Every source converts to luma at capture time. Sources never write frames
//! to disk and never log pixel content.

#[cfg(feature = "ingest-esp32")]
pub mod esp32;
pub mod file;
pub mod normalize;

use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use serde::Serialize;

use crate::frame::GrayFrame;

#[cfg(feature = "ingest-esp32")]
pub use esp32::{Esp32Config, Esp32Source};
pub use file::{FileConfig, FileSource, RawLayout};
pub use normalize::{normalize_to_gray, PixelFormat};

/// A stream of grayscale frames.
pub trait FrameSource {
    /// Open the underlying device, file set or stream.
    fn connect(&mut self) -> Result<()>;

    /// Capture the next frame. `Ok(None)` marks the end of the stream.
    fn next_frame(&mut self) -> Result<Option<GrayFrame>>;

    fn is_healthy(&self) -> bool;

    fn stats(&self) -> SourceStats;
}

/// Statistics for a frame source.
#[derive(Clone, Debug, Default, Serialize)]
pub struct SourceStats {
    pub frames_captured: u64,
    pub source: String,
}

/// Open the source named by `config.path`.
///
/// `http(s)://` URLs go to the ESP32 camera source when that feature is
/// enabled; everything else is a local file source.
pub fn open_source(config: FileConfig) -> Result<Box<dyn FrameSource>> {
    let path = config.path.trim();
    if path.starts_with("http://") || path.starts_with("https://") {
        #[cfg(feature = "ingest-esp32")]
        {
            let source = Esp32Source::new(Esp32Config {
                url: path.to_string(),
                target_fps: config.target_fps,
            })?;
            return Ok(Box::new(source));
        }
        #[cfg(not(feature = "ingest-esp32"))]
        {
            return Err(anyhow!(
                "camera URL '{}' requires the ingest-esp32 feature",
                path
            ));
        }
    }
    Ok(Box::new(FileSource::new(config)?))
}

/// Decode an encoded image (JPEG, PNG, BMP) to luma.
pub fn decode_image(bytes: &[u8]) -> Result<GrayFrame> {
    let image = image::load_from_memory(bytes).context("decode image")?;
    let luma = image.into_luma8();
    let (width, height) = luma.dimensions();
    GrayFrame::new(width, height, luma.into_raw()).map_err(|e| anyhow!(e))
}

/// Minimum spacing between delivered frames.
pub(crate) fn frame_interval(target_fps: u32) -> Duration {
    if target_fps == 0 {
        Duration::from_millis(0)
    } else {
        Duration::from_millis((1000 / target_fps).max(1) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_interval_handles_zero_fps() {
        assert_eq!(frame_interval(0), Duration::from_millis(0));
        assert_eq!(frame_interval(10), Duration::from_millis(100));
        assert_eq!(frame_interval(5000), Duration::from_millis(1));
    }

    #[test]
    fn decode_image_rejects_garbage() {
        assert!(decode_image(b"not an image").is_err());
    }

    #[cfg(not(feature = "ingest-esp32"))]
    #[test]
    fn camera_urls_need_the_esp32_feature() {
        let err = open_source(FileConfig {
            path: "http://192.168.4.1/capture".into(),
            ..FileConfig::default()
        })
        .err()
        .expect("url rejected");
        assert!(err.to_string().contains("ingest-esp32"));
    }
}
