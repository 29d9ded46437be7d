use crate::error::{MotionError, MotionResult};
use crate::frame::{pixel_count, scratch_with_capacity, BinaryMask, FrameView, BACKGROUND, FOREGROUND};

/// Pixel-wise absolute difference of two frames, thresholded into a mask.
///
/// A mask pixel is `FOREGROUND` when `|curr - prev| > threshold`. Higher
/// thresholds are less sensitive; a threshold of 255 never fires.
pub fn diff(prev: FrameView<'_>, curr: FrameView<'_>, threshold: u8) -> MotionResult<BinaryMask> {
    if prev.dimensions() != curr.dimensions() {
        return Err(MotionError::DimensionMismatch {
            prev: prev.dimensions(),
            curr: curr.dimensions(),
        });
    }
    let (width, height) = curr.dimensions();
    let len = pixel_count(width, height)?;

    let mut data = scratch_with_capacity(len, "difference mask")?;
    data.extend(
        prev.pixels()
            .iter()
            .zip(curr.pixels())
            .map(|(&p, &c)| {
                if p.abs_diff(c) > threshold {
                    FOREGROUND
                } else {
                    BACKGROUND
                }
            }),
    );
    Ok(BinaryMask::from_parts(width, height, data))
}
