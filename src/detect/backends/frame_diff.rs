use anyhow::{Context, Result};

use crate::detect::backend::DetectorBackend;
use crate::detect::pipeline::{FrameOutcome, MotionDetector, MotionParams};
use crate::detect::result::{Detection, DetectionResult, SizeClass};
use crate::error::MotionError;
use crate::frame::FrameView;

/// Frame-differencing motion backend.
///
/// Wraps a `MotionDetector`; the first frame after construction or `reset`
/// only primes the detector and reports no motion. A frame whose size differs
/// from the retained one re-primes the detector at the new size.
#[derive(Debug)]
pub struct FrameDiffBackend {
    detector: MotionDetector,
}

impl FrameDiffBackend {
    pub fn new(params: MotionParams) -> Result<Self> {
        let detector = MotionDetector::new(params).context("invalid motion parameters")?;
        Ok(Self { detector })
    }
}

impl DetectorBackend for FrameDiffBackend {
    fn name(&self) -> &'static str {
        "frame-diff"
    }

    fn detect(&mut self, pixels: &[u8], width: u32, height: u32) -> Result<DetectionResult> {
        let frame = FrameView::new(width, height, pixels)?;
        let outcome = match self.detector.process(frame) {
            Err(MotionError::DimensionMismatch { prev, curr }) => {
                log::info!(
                    "frame size changed from {}x{} to {}x{}; re-priming",
                    prev.0,
                    prev.1,
                    curr.0,
                    curr.1
                );
                self.detector.reset();
                self.detector.process(frame)?
            }
            other => other?,
        };
        let report = match outcome {
            FrameOutcome::Primed => return Ok(DetectionResult::default()),
            FrameOutcome::Compared(report) => report,
        };

        let detections = report
            .components
            .iter()
            .map(|c| Detection::from_component(c, width, height))
            .collect();
        Ok(DetectionResult {
            motion_detected: report.motion_detected(),
            compared: true,
            detections,
            foreground_pixels: report.foreground_pixels,
            size_class: SizeClass::classify(&report.components, report.frame_pixels),
            annotated: report.annotated,
        })
    }

    fn reset(&mut self) {
        self.detector.reset();
    }
}
