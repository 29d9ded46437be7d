//! Encoding of grayscale frames for output (annotated snapshots, streams).

use std::fs;
use std::path::Path;
use std::str::FromStr;

use anyhow::{anyhow, Context, Result};
use image::codecs::bmp::BmpEncoder;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder};
use serde::Deserialize;

use crate::frame::GrayFrame;

pub const DEFAULT_JPEG_QUALITY: u8 = 90;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Jpeg,
    Bmp,
    Png,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "jpg",
            OutputFormat::Bmp => "bmp",
            OutputFormat::Png => "png",
        }
    }
}

impl FromStr for OutputFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "jpeg" | "jpg" => Ok(OutputFormat::Jpeg),
            "bmp" => Ok(OutputFormat::Bmp),
            "png" => Ok(OutputFormat::Png),
            other => Err(anyhow!("unknown output format '{}'", other)),
        }
    }
}

/// Encode `frame` as a single-channel image.
pub fn encode_frame(frame: &GrayFrame, format: OutputFormat, jpeg_quality: u8) -> Result<Vec<u8>> {
    if !(1..=100).contains(&jpeg_quality) {
        return Err(anyhow!("jpeg quality must be in 1..=100, got {}", jpeg_quality));
    }
    let (width, height) = frame.dimensions();
    let mut out = Vec::new();
    match format {
        OutputFormat::Jpeg => JpegEncoder::new_with_quality(&mut out, jpeg_quality).write_image(
            frame.pixels(),
            width,
            height,
            ExtendedColorType::L8,
        ),
        OutputFormat::Bmp => {
            BmpEncoder::new(&mut out).write_image(frame.pixels(), width, height, ExtendedColorType::L8)
        }
        OutputFormat::Png => {
            PngEncoder::new(&mut out).write_image(frame.pixels(), width, height, ExtendedColorType::L8)
        }
    }
    .with_context(|| format!("failed to encode {}x{} frame as {:?}", width, height, format))?;
    Ok(out)
}

/// Encode `frame` and write it to `path`.
pub fn write_frame(
    path: &Path,
    frame: &GrayFrame,
    format: OutputFormat,
    jpeg_quality: u8,
) -> Result<()> {
    let bytes = encode_frame(frame, format, jpeg_quality)?;
    fs::write(path, bytes).with_context(|| format!("failed to write {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::decode_image;

    fn sample() -> GrayFrame {
        let mut frame = GrayFrame::filled(16, 8, 40).unwrap();
        frame.fill_rect(4, 2, 9, 5, 220);
        frame
    }

    #[test]
    fn png_decodes_back_exactly() {
        let bytes = encode_frame(&sample(), OutputFormat::Png, DEFAULT_JPEG_QUALITY).unwrap();
        assert_eq!(decode_image(&bytes).unwrap(), sample());
    }

    #[test]
    fn bmp_keeps_dimensions() {
        let bytes = encode_frame(&sample(), OutputFormat::Bmp, DEFAULT_JPEG_QUALITY).unwrap();
        assert_eq!(&bytes[..2], b"BM");
        assert_eq!(decode_image(&bytes).unwrap().dimensions(), (16, 8));
    }

    #[test]
    fn jpeg_has_soi_marker_and_dimensions() {
        let bytes = encode_frame(&sample(), OutputFormat::Jpeg, DEFAULT_JPEG_QUALITY).unwrap();
        assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
        assert_eq!(decode_image(&bytes).unwrap().dimensions(), (16, 8));
    }

    #[test]
    fn rejects_out_of_range_quality() {
        assert!(encode_frame(&sample(), OutputFormat::Jpeg, 0).is_err());
    }

    #[test]
    fn parses_format_names() {
        assert_eq!("JPG".parse::<OutputFormat>().unwrap(), OutputFormat::Jpeg);
        assert_eq!(OutputFormat::Bmp.extension(), "bmp");
        assert!("gif".parse::<OutputFormat>().is_err());
    }
}
