//! Motion Kernel
//!
//! Frame-difference motion detection for fixed cameras.
//!
//! # Pipeline
//!
//! 1. **Diff**: pixel-wise absolute difference of two grayscale frames,
//!    thresholded into a binary mask.
//! 2. **Dilate**: 3x3 max filter closing small gaps; the frame border is
//!    always background.
//! 3. **Label**: 8-connected components with bounding boxes and pixel counts.
//! 4. **Filter**: drop speckles below a minimum size and whole-frame
//!    components caused by global illumination changes.
//! 5. **Annotate**: draw surviving boxes onto a copy of the current frame.
//!
//! # Module Structure
//!
//! - `frame`: frame views, owned frames, masks, boxes
//! - `detect`: the pipeline stages, `MotionDetector`, the backend seam
//! - `ingest`: frame sources (files, synthetic scenes, ESP32 camera)
//! - `encode`: JPEG / BMP / PNG output
//! - `config`: `motiond` configuration

pub mod config;
pub mod detect;
pub mod encode;
pub mod error;
pub mod frame;
pub mod ingest;
pub mod stats;

pub use detect::{
    detect_motion, Detection, DetectionResult, DetectorBackend, FrameDiffBackend, FrameOutcome,
    LabelingStrategy, MotionDetector, MotionParams, MotionReport, RegionFilter, SizeClass,
};
pub use error::{MotionError, MotionResult};
pub use frame::{
    BinaryMask, BoundingBox, Component, FrameView, FrameViewMut, GrayFrame, BACKGROUND, FOREGROUND,
};
#[cfg(feature = "ingest-esp32")]
pub use ingest::{Esp32Config, Esp32Source};
pub use ingest::{FileConfig, FileSource, FrameSource};
