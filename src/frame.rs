//! Frame and mask buffers.
//!
//! - `FrameView` / `FrameViewMut`: borrowed grayscale buffers, one byte per pixel.
//!   The detector never owns a caller's frame; it borrows it for one call.
//! - `GrayFrame`: owned grayscale buffer (the retained previous frame, decoded
//!   images, annotated output).
//! - `BinaryMask`: width x height buffer restricted to {0, 255}.
//! - `BoundingBox` / `Component`: per-call region descriptions.
//!
//! All scratch allocations go through `scratch_vec` so that an exhausted heap
//! surfaces as `MotionError::AllocationFailure` instead of an abort.

use serde::Serialize;

use crate::error::{MotionError, MotionResult};

/// Mask value of a pixel that changed between frames.
pub const FOREGROUND: u8 = 255;
/// Mask value of an unchanged pixel.
pub const BACKGROUND: u8 = 0;

/// Number of pixels of a `width` x `height` buffer, rejecting empty or overflowing sizes.
pub(crate) fn pixel_count(width: u32, height: u32) -> MotionResult<usize> {
    if width == 0 || height == 0 {
        return Err(MotionError::EmptyInput { width, height });
    }
    (width as usize)
        .checked_mul(height as usize)
        .ok_or(MotionError::AllocationFailure {
            buffer: "frame",
            bytes: usize::MAX,
        })
}

/// Reserve an empty vector with room for exactly `capacity` elements.
pub(crate) fn scratch_with_capacity<T>(
    capacity: usize,
    buffer: &'static str,
) -> MotionResult<Vec<T>> {
    let mut out = Vec::new();
    if allocation_failure_injected() || out.try_reserve_exact(capacity).is_err() {
        return Err(MotionError::AllocationFailure {
            buffer,
            bytes: capacity.saturating_mul(std::mem::size_of::<T>()),
        });
    }
    Ok(out)
}

#[cfg(test)]
thread_local! {
    static FAIL_SCRATCH: std::cell::Cell<bool> = const { std::cell::Cell::new(false) };
}

/// Make every scratch reservation on this thread fail until switched off.
#[cfg(test)]
pub(crate) fn fail_scratch_allocations(fail: bool) {
    FAIL_SCRATCH.with(|flag| flag.set(fail));
}

#[cfg(test)]
fn allocation_failure_injected() -> bool {
    FAIL_SCRATCH.with(|flag| flag.get())
}

#[cfg(not(test))]
#[inline(always)]
fn allocation_failure_injected() -> bool {
    false
}

/// Reserve and fill a vector of `len` copies of `fill`.
pub(crate) fn scratch_vec<T: Clone>(
    len: usize,
    fill: T,
    buffer: &'static str,
) -> MotionResult<Vec<T>> {
    let mut out = scratch_with_capacity(len, buffer)?;
    out.resize(len, fill);
    Ok(out)
}

fn check_len(width: u32, height: u32, actual: usize) -> MotionResult<()> {
    let expected = pixel_count(width, height)?;
    if actual != expected {
        return Err(MotionError::BufferLength { expected, actual });
    }
    Ok(())
}

// ----------------------------------------------------------------------------
// Borrowed frames
// ----------------------------------------------------------------------------

/// Read-only grayscale frame borrowed for the duration of one call.
///
/// A view cannot outlive the buffer it borrows:
///
/// ```compile_fail
/// use motion_kernel::FrameView;
///
/// let view = {
///     let pixels = vec![0u8; 4];
///     FrameView::new(2, 2, &pixels).unwrap()
/// };
/// let _ = view.width();
/// ```
#[derive(Clone, Copy, Debug)]
pub struct FrameView<'a> {
    width: u32,
    height: u32,
    data: &'a [u8],
}

impl<'a> FrameView<'a> {
    pub fn new(width: u32, height: u32, data: &'a [u8]) -> MotionResult<Self> {
        check_len(width, height, data.len())?;
        Ok(Self {
            width,
            height,
            data,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn pixels(&self) -> &'a [u8] {
        self.data
    }

    #[inline]
    pub fn get(&self, x: u32, y: u32) -> u8 {
        self.data[y as usize * self.width as usize + x as usize]
    }

    /// Copy into an owned frame.
    pub fn to_frame(&self) -> MotionResult<GrayFrame> {
        let mut data = scratch_with_capacity(self.data.len(), "frame copy")?;
        data.extend_from_slice(self.data);
        Ok(GrayFrame {
            width: self.width,
            height: self.height,
            data,
        })
    }
}

/// Mutable grayscale frame borrowed for in-place drawing.
#[derive(Debug)]
pub struct FrameViewMut<'a> {
    width: u32,
    height: u32,
    data: &'a mut [u8],
}

impl<'a> FrameViewMut<'a> {
    pub fn new(width: u32, height: u32, data: &'a mut [u8]) -> MotionResult<Self> {
        check_len(width, height, data.len())?;
        Ok(Self {
            width,
            height,
            data,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    pub fn set(&mut self, x: u32, y: u32, value: u8) {
        self.data[y as usize * self.width as usize + x as usize] = value;
    }

    /// Fill `len` pixels of row `y` starting at `x`. Caller guarantees bounds.
    #[inline]
    pub(crate) fn fill_row(&mut self, x: u32, y: u32, len: u32, value: u8) {
        let start = y as usize * self.width as usize + x as usize;
        self.data[start..start + len as usize].fill(value);
    }
}

// ----------------------------------------------------------------------------
// Owned frames
// ----------------------------------------------------------------------------

/// Owned grayscale frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GrayFrame {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl GrayFrame {
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> MotionResult<Self> {
        check_len(width, height, data.len())?;
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Frame with every pixel set to `value`.
    pub fn filled(width: u32, height: u32, value: u8) -> MotionResult<Self> {
        let len = pixel_count(width, height)?;
        Ok(Self {
            width,
            height,
            data: scratch_vec(len, value, "frame")?,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn pixels(&self) -> &[u8] {
        &self.data
    }

    pub fn get(&self, x: u32, y: u32) -> u8 {
        self.view().get(x, y)
    }

    pub fn set(&mut self, x: u32, y: u32, value: u8) {
        let index = y as usize * self.width as usize + x as usize;
        self.data[index] = value;
    }

    /// Fill the inclusive rectangle `(x0, y0)..=(x1, y1)`, clipped to the frame.
    pub fn fill_rect(&mut self, x0: u32, y0: u32, x1: u32, y1: u32, value: u8) {
        for y in y0..=y1.min(self.height.saturating_sub(1)) {
            for x in x0..=x1.min(self.width.saturating_sub(1)) {
                self.set(x, y, value);
            }
        }
    }

    pub fn view(&self) -> FrameView<'_> {
        FrameView {
            width: self.width,
            height: self.height,
            data: &self.data,
        }
    }

    pub fn view_mut(&mut self) -> FrameViewMut<'_> {
        FrameViewMut {
            width: self.width,
            height: self.height,
            data: &mut self.data,
        }
    }

    /// Overwrite this frame with `src`. Same-sized sources are copied in place.
    pub fn copy_from(&mut self, src: FrameView<'_>) -> MotionResult<()> {
        if self.dimensions() == src.dimensions() {
            self.data.copy_from_slice(src.pixels());
        } else {
            *self = src.to_frame()?;
        }
        Ok(())
    }

    pub fn into_raw(self) -> Vec<u8> {
        self.data
    }
}

// ----------------------------------------------------------------------------
// Binary mask
// ----------------------------------------------------------------------------

/// Width x height buffer whose values are restricted to `BACKGROUND` / `FOREGROUND`.
///
/// Raw bytes are only writable inside the crate, so callers cannot break the
/// two-value invariant:
///
/// ```compile_fail
/// let mut mask = motion_kernel::BinaryMask::new(2, 2).unwrap();
/// mask.as_mut_slice()[0] = 7;
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BinaryMask {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl BinaryMask {
    /// All-background mask.
    pub fn new(width: u32, height: u32) -> MotionResult<Self> {
        let len = pixel_count(width, height)?;
        Ok(Self {
            width,
            height,
            data: scratch_vec(len, BACKGROUND, "mask")?,
        })
    }

    /// Wrap raw bytes, rejecting any value other than 0 or 255.
    pub fn from_raw(width: u32, height: u32, data: Vec<u8>) -> MotionResult<Self> {
        check_len(width, height, data.len())?;
        if let Some((index, &value)) = data
            .iter()
            .enumerate()
            .find(|(_, &v)| v != BACKGROUND && v != FOREGROUND)
        {
            return Err(MotionError::NonBinaryMask { index, value });
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    pub(crate) fn from_parts(width: u32, height: u32, data: Vec<u8>) -> Self {
        debug_assert_eq!(data.len(), width as usize * height as usize);
        Self {
            width,
            height,
            data,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    pub(crate) fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.data
    }

    #[inline]
    pub fn is_foreground(&self, x: u32, y: u32) -> bool {
        self.data[y as usize * self.width as usize + x as usize] == FOREGROUND
    }

    pub fn set(&mut self, x: u32, y: u32, foreground: bool) {
        let index = y as usize * self.width as usize + x as usize;
        self.data[index] = if foreground { FOREGROUND } else { BACKGROUND };
    }

    /// Number of `FOREGROUND` pixels.
    pub fn foreground_count(&self) -> usize {
        self.data.iter().filter(|&&v| v == FOREGROUND).count()
    }

    pub fn into_raw(self) -> Vec<u8> {
        self.data
    }
}

// ----------------------------------------------------------------------------
// Regions
// ----------------------------------------------------------------------------

/// Axis-aligned box with inclusive corners.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct BoundingBox {
    pub min_x: u32,
    pub min_y: u32,
    pub max_x: u32,
    pub max_y: u32,
}

impl BoundingBox {
    pub fn new(min_x: u32, min_y: u32, max_x: u32, max_y: u32) -> Self {
        debug_assert!(min_x <= max_x && min_y <= max_y);
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Box covering the single pixel `(x, y)`.
    pub fn point(x: u32, y: u32) -> Self {
        Self::new(x, y, x, y)
    }

    /// Grow to include `(x, y)`.
    #[inline]
    pub fn include(&mut self, x: u32, y: u32) {
        self.min_x = self.min_x.min(x);
        self.min_y = self.min_y.min(y);
        self.max_x = self.max_x.max(x);
        self.max_y = self.max_y.max(y);
    }

    pub fn width(&self) -> u32 {
        self.max_x - self.min_x + 1
    }

    pub fn height(&self) -> u32 {
        self.max_y - self.min_y + 1
    }

    pub fn area(&self) -> u64 {
        self.width() as u64 * self.height() as u64
    }

    pub fn contains(&self, x: u32, y: u32) -> bool {
        (self.min_x..=self.max_x).contains(&x) && (self.min_y..=self.max_y).contains(&y)
    }
}

/// A maximal 8-connected set of foreground pixels, scoped to one detection call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Component {
    pub bbox: BoundingBox,
    pub pixel_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_rejects_wrong_length() {
        let err = GrayFrame::new(4, 4, vec![0; 15]).unwrap_err();
        assert_eq!(
            err,
            MotionError::BufferLength {
                expected: 16,
                actual: 15
            }
        );
    }

    #[test]
    fn frame_rejects_empty_dimensions() {
        assert_eq!(
            FrameView::new(0, 3, &[]).unwrap_err(),
            MotionError::EmptyInput {
                width: 0,
                height: 3
            }
        );
        assert!(BinaryMask::new(5, 0).is_err());
    }

    #[test]
    fn mask_from_raw_rejects_non_binary_values() {
        let err = BinaryMask::from_raw(2, 2, vec![0, 255, 7, 0]).unwrap_err();
        assert_eq!(err, MotionError::NonBinaryMask { index: 2, value: 7 });
    }

    #[test]
    fn copy_from_reuses_buffer_for_same_dimensions() {
        let mut slot = GrayFrame::filled(3, 2, 0).unwrap();
        let src = GrayFrame::filled(3, 2, 9).unwrap();
        let before = slot.pixels().as_ptr();
        slot.copy_from(src.view()).unwrap();
        assert_eq!(slot.pixels().as_ptr(), before);
        assert_eq!(slot, src);
    }

    #[test]
    fn bounding_box_grows_to_include_points() {
        let mut bbox = BoundingBox::point(4, 4);
        bbox.include(2, 6);
        bbox.include(5, 3);
        assert_eq!(bbox, BoundingBox::new(2, 3, 5, 6));
        assert_eq!(bbox.width(), 4);
        assert_eq!(bbox.height(), 4);
        assert_eq!(bbox.area(), 16);
        assert!(bbox.contains(2, 3));
        assert!(!bbox.contains(6, 3));
    }
}
