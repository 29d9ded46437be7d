//! Mask morphology and frame pre-smoothing.
//!
//! `dilate` is a 3x3 max filter over a binary mask. The outer border of the
//! output is always background, so no region ever reaches the frame edge.
//! The filter reads from a source buffer and writes a separate destination;
//! a pixel is never computed from an already-dilated neighbour.

use crate::error::{MotionError, MotionResult};
use crate::frame::{scratch_vec, BinaryMask, FrameView, GrayFrame, BACKGROUND};

/// Dilate `mask` into a new mask.
pub fn dilate(mask: &BinaryMask) -> MotionResult<BinaryMask> {
    let (width, height) = mask.dimensions();
    let mut out = scratch_vec(mask.len(), BACKGROUND, "dilation buffer")?;
    dilate_into(mask.as_slice(), &mut out, width as usize, height as usize);
    Ok(BinaryMask::from_parts(width, height, out))
}

/// Dilate `mask` in place. A copy of the input is taken first; on allocation
/// failure the mask is left untouched.
pub fn dilate_in_place(mask: &mut BinaryMask) -> MotionResult<()> {
    let (width, height) = mask.dimensions();
    let mut src = scratch_vec(mask.len(), BACKGROUND, "dilation buffer")?;
    src.copy_from_slice(mask.as_slice());
    let dst = mask.as_mut_slice();
    dst.fill(BACKGROUND);
    dilate_into(&src, dst, width as usize, height as usize);
    Ok(())
}

// `dst` must be all background on entry; only interior pixels are written.
fn dilate_into(src: &[u8], dst: &mut [u8], width: usize, height: usize) {
    if width < 3 || height < 3 {
        return;
    }
    for y in 1..height - 1 {
        let above = &src[(y - 1) * width..y * width];
        let row = &src[y * width..(y + 1) * width];
        let below = &src[(y + 1) * width..(y + 2) * width];
        let out = &mut dst[y * width..(y + 1) * width];
        for x in 1..width - 1 {
            let mut max = 0u8;
            for line in [above, row, below] {
                max = max.max(line[x - 1]).max(line[x]).max(line[x + 1]);
            }
            out[x] = max;
        }
    }
}

/// Mean filter with an odd `kernel` x `kernel` window.
///
/// Each output pixel is the integer mean of the in-bounds part of its window,
/// so edge pixels average fewer samples. A kernel of 1 copies the frame.
pub fn box_blur(frame: FrameView<'_>, kernel: u32) -> MotionResult<GrayFrame> {
    if kernel == 0 || kernel % 2 == 0 {
        return Err(MotionError::InvalidParameter(format!(
            "smoothing kernel must be odd and >= 1, got {}",
            kernel
        )));
    }
    let (width, height) = frame.dimensions();
    let (w, h) = (width as usize, height as usize);
    let half = (kernel / 2) as usize;
    let src = frame.pixels();
    let mut out = scratch_vec(src.len(), 0u8, "smoothing buffer")?;

    for y in 0..h {
        let y0 = y.saturating_sub(half);
        let y1 = (y + half).min(h - 1);
        for x in 0..w {
            let x0 = x.saturating_sub(half);
            let x1 = (x + half).min(w - 1);
            let rows = (y0..=y1).map(|ny| &src[ny * w + x0..=ny * w + x1]);
            out[y * w + x] = window_mean(rows);
        }
    }
    GrayFrame::new(width, height, out)
}

/// Integer mean over the rows of one window.
///
/// Accumulates in `u64`: a clipped window can still hold more than
/// `u32::MAX / 255` pixels on very large frames.
fn window_mean<'a>(rows: impl Iterator<Item = &'a [u8]>) -> u8 {
    let mut sum = 0u64;
    let mut count = 0u64;
    for row in rows {
        sum += row.iter().map(|&v| v as u64).sum::<u64>();
        count += row.len() as u64;
    }
    if count == 0 {
        return 0;
    }
    (sum / count) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::FOREGROUND;

    fn mask_with(width: u32, height: u32, points: &[(u32, u32)]) -> BinaryMask {
        let mut mask = BinaryMask::new(width, height).unwrap();
        for &(x, y) in points {
            mask.set(x, y, true);
        }
        mask
    }

    #[test]
    fn single_pixel_grows_to_three_by_three() {
        let mask = mask_with(7, 7, &[(3, 3)]);
        let out = dilate(&mask).unwrap();
        assert_eq!(out.foreground_count(), 9);
        for y in 2..=4 {
            for x in 2..=4 {
                assert!(out.is_foreground(x, y));
            }
        }
    }

    #[test]
    fn border_is_forced_to_background() {
        let mut mask = BinaryMask::new(5, 5).unwrap();
        for y in 0..5 {
            for x in 0..5 {
                mask.set(x, y, true);
            }
        }
        let out = dilate(&mask).unwrap();
        assert_eq!(out.foreground_count(), 9);
        for i in 0..5 {
            assert!(!out.is_foreground(i, 0));
            assert!(!out.is_foreground(i, 4));
            assert!(!out.is_foreground(0, i));
            assert!(!out.is_foreground(4, i));
        }
    }

    #[test]
    fn dilation_does_not_cascade_within_a_pass() {
        // A chain reaction would fill the whole interior of a 9-wide row.
        let mask = mask_with(9, 3, &[(1, 1)]);
        let out = dilate(&mask).unwrap();
        let lit: Vec<u32> = (0..9).filter(|&x| out.is_foreground(x, 1)).collect();
        assert_eq!(lit, vec![1, 2]);
    }

    #[test]
    fn in_place_matches_copying_variant() {
        let mask = mask_with(6, 6, &[(1, 1), (4, 2), (2, 4)]);
        let mut in_place = mask.clone();
        dilate_in_place(&mut in_place).unwrap();
        assert_eq!(in_place, dilate(&mask).unwrap());
    }

    #[test]
    fn tiny_masks_dilate_to_background() {
        let mask = mask_with(2, 2, &[(0, 0), (1, 1)]);
        let out = dilate(&mask).unwrap();
        assert!(out.as_slice().iter().all(|&v| v != FOREGROUND));
    }

    #[test]
    fn box_blur_averages_in_bounds_window() {
        let frame = GrayFrame::new(3, 3, vec![0, 0, 0, 0, 90, 0, 0, 0, 0]).unwrap();
        let out = box_blur(frame.view(), 3).unwrap();
        assert_eq!(out.get(1, 1), 10);
        // Corner window holds 4 samples, one of them 90.
        assert_eq!(out.get(0, 0), 22);
    }

    #[test]
    fn box_blur_kernel_one_is_identity() {
        let frame = GrayFrame::new(2, 2, vec![1, 2, 3, 4]).unwrap();
        assert_eq!(box_blur(frame.view(), 1).unwrap(), frame);
    }

    #[test]
    fn box_blur_rejects_even_kernel() {
        let frame = GrayFrame::filled(2, 2, 0).unwrap();
        assert!(matches!(
            box_blur(frame.view(), 2),
            Err(MotionError::InvalidParameter(_))
        ));
    }

    #[test]
    fn window_mean_does_not_overflow_on_huge_windows() {
        // 4200 rows of 4096 saturated pixels sum past u32::MAX.
        let row = vec![255u8; 4096];
        let rows = std::iter::repeat(row.as_slice()).take(4200);
        assert_eq!(window_mean(rows), 255);
    }
}
