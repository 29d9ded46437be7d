//! Error kinds reported by the detection core.
//!
//! Every variant is fatal for the call that produced it and is reported
//! synchronously to the caller. Nothing here is retried internally; a caller
//! that wants to retry simply tries again with the next captured frame.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MotionError {
    /// The two frames of a differencing pass do not share dimensions.
    #[error("frame dimensions differ: previous {}x{}, current {}x{}", prev.0, prev.1, curr.0, curr.1)]
    DimensionMismatch { prev: (u32, u32), curr: (u32, u32) },

    /// A frame or mask with zero width or height.
    #[error("empty input: {width}x{height}")]
    EmptyInput { width: u32, height: u32 },

    /// Pixel buffer length does not match width * height.
    #[error("pixel buffer length mismatch: expected {expected}, got {actual}")]
    BufferLength { expected: usize, actual: usize },

    /// A scratch buffer could not be reserved.
    #[error("failed to allocate {bytes} bytes for {buffer}")]
    AllocationFailure { buffer: &'static str, bytes: usize },

    /// A mask built from raw bytes holds a value other than 0 or 255.
    #[error("mask value {value} at index {index} is not 0 or 255")]
    NonBinaryMask { index: usize, value: u8 },

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
}

pub type MotionResult<T> = std::result::Result<T, MotionError>;
