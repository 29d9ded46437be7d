use std::str::FromStr;

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

use crate::frame::GrayFrame;

/// Layout of raw sensor buffers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PixelFormat {
    #[default]
    Gray8,
    Rgb24,
    /// 16 bits per pixel, big-endian, as the camera sensor emits it.
    Rgb565,
    Nv12,
}

impl PixelFormat {
    /// Buffer length of a `width` x `height` frame in this format.
    pub fn frame_len(self, width: u32, height: u32) -> Result<usize> {
        let plane = (width as usize)
            .checked_mul(height as usize)
            .ok_or_else(|| anyhow!("frame dimensions overflow"))?;
        let len = match self {
            PixelFormat::Gray8 => Some(plane),
            PixelFormat::Rgb24 => plane.checked_mul(3),
            PixelFormat::Rgb565 => plane.checked_mul(2),
            PixelFormat::Nv12 => plane.checked_add(plane / 2),
        };
        len.ok_or_else(|| anyhow!("frame dimensions overflow"))
    }
}

impl FromStr for PixelFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gray8" | "gray" | "grayscale" => Ok(PixelFormat::Gray8),
            "rgb24" | "rgb888" => Ok(PixelFormat::Rgb24),
            "rgb565" => Ok(PixelFormat::Rgb565),
            "nv12" => Ok(PixelFormat::Nv12),
            other => Err(anyhow!("unknown pixel format '{}'", other)),
        }
    }
}

/// Convert a raw buffer into an 8-bit luma frame.
pub fn normalize_to_gray(
    pixels: &[u8],
    width: u32,
    height: u32,
    format: PixelFormat,
) -> Result<GrayFrame> {
    let expected = format.frame_len(width, height)?;
    if pixels.len() != expected {
        return Err(anyhow!(
            "{:?} frame length mismatch: expected {}, got {}",
            format,
            expected,
            pixels.len()
        ));
    }

    let luma = match format {
        PixelFormat::Gray8 => pixels.to_vec(),
        PixelFormat::Rgb24 => pixels
            .chunks_exact(3)
            .map(|px| luma(px[0], px[1], px[2]))
            .collect(),
        PixelFormat::Rgb565 => pixels
            .chunks_exact(2)
            .map(|px| {
                let (r, g, b) = rgb565_to_rgb(u16::from_be_bytes([px[0], px[1]]));
                luma(r, g, b)
            })
            .collect(),
        // The Y plane already is luma; chroma is ignored.
        PixelFormat::Nv12 => pixels[..(width as usize * height as usize)].to_vec(),
    };
    Ok(GrayFrame::new(width, height, luma)?)
}

fn rgb565_to_rgb(pixel: u16) -> (u8, u8, u8) {
    let r = ((pixel >> 11) & 0x1f) as u8;
    let g = ((pixel >> 5) & 0x3f) as u8;
    let b = (pixel & 0x1f) as u8;
    ((r << 3) | (r >> 2), (g << 2) | (g >> 4), (b << 3) | (b >> 2))
}

/// BT.601 luma in 8.8 fixed point.
fn luma(r: u8, g: u8, b: u8) -> u8 {
    ((77 * r as u32 + 150 * g as u32 + 29 * b as u32) >> 8) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nv12_keeps_the_y_plane() -> Result<()> {
        let nv12 = [vec![10, 20, 30, 40], vec![128u8; 2]].concat();
        let gray = normalize_to_gray(&nv12, 2, 2, PixelFormat::Nv12)?;
        assert_eq!(gray.pixels(), &[10, 20, 30, 40]);
        Ok(())
    }

    #[test]
    fn rgb24_white_and_black() -> Result<()> {
        let pixels = [255, 255, 255, 0, 0, 0];
        let gray = normalize_to_gray(&pixels, 2, 1, PixelFormat::Rgb24)?;
        assert_eq!(gray.pixels(), &[255, 0]);
        Ok(())
    }

    #[test]
    fn rgb565_is_big_endian() -> Result<()> {
        // Pure red, then pure white.
        let pixels = [0xf8, 0x00, 0xff, 0xff];
        let gray = normalize_to_gray(&pixels, 2, 1, PixelFormat::Rgb565)?;
        assert_eq!(gray.pixels(), &[76, 255]);
        Ok(())
    }

    #[test]
    fn length_is_validated() {
        let err = normalize_to_gray(&[0; 5], 2, 2, PixelFormat::Gray8).unwrap_err();
        assert!(err.to_string().contains("expected 4, got 5"));
    }

    #[test]
    fn formats_parse_from_config_strings() {
        assert_eq!("RGB565".parse::<PixelFormat>().unwrap(), PixelFormat::Rgb565);
        assert_eq!("gray".parse::<PixelFormat>().unwrap(), PixelFormat::Gray8);
        assert!("yuyv".parse::<PixelFormat>().is_err());
    }
}
