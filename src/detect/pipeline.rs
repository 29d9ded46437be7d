//! Motion-detection pipeline: diff -> dilate -> segment -> filter -> annotate.
//!
//! `detect_motion` is the stateless entry point over two borrowed frames.
//! `MotionDetector` drives it over a stream and owns the single retained
//! previous frame. That slot is overwritten only after a pass succeeds, so a
//! failed call can be retried against the same previous frame.

use serde::{Deserialize, Serialize};

use super::annotate::{annotate, DEFAULT_BOX_COLOR};
use super::diff::diff;
use super::filter::{RegionFilter, DEFAULT_GLOBAL_COVERAGE, DEFAULT_MAX_COMPONENT_FRACTION};
use super::labeling::LabelingStrategy;
use super::morphology::{box_blur, dilate_in_place};
use crate::error::{MotionError, MotionResult};
use crate::frame::{BoundingBox, Component, FrameView, GrayFrame};

pub const DEFAULT_THRESHOLD: u8 = 70;
pub const DEFAULT_MIN_PIXELS: usize = 50;

/// Tunable parameters, supplied by the caller per detector.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MotionParams {
    /// Absolute difference a pixel must exceed to count as changed.
    pub threshold: u8,
    /// Minimum component size in pixels.
    pub min_pixels: usize,
    pub max_component_fraction: f32,
    pub global_coverage: f32,
    pub max_regions: Option<usize>,
    /// Odd mean-filter size applied to both frames before differencing.
    pub smoothing_kernel: Option<u32>,
    pub labeling: LabelingStrategy,
    /// Produce an annotated copy of the current frame.
    pub annotate: bool,
    pub box_color: u8,
}

impl Default for MotionParams {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            min_pixels: DEFAULT_MIN_PIXELS,
            max_component_fraction: DEFAULT_MAX_COMPONENT_FRACTION,
            global_coverage: DEFAULT_GLOBAL_COVERAGE,
            max_regions: None,
            smoothing_kernel: None,
            labeling: LabelingStrategy::FloodFill,
            annotate: true,
            box_color: DEFAULT_BOX_COLOR,
        }
    }
}

impl MotionParams {
    pub fn region_filter(&self) -> RegionFilter {
        RegionFilter {
            min_pixels: self.min_pixels,
            max_component_fraction: self.max_component_fraction,
            global_coverage: self.global_coverage,
            max_regions: self.max_regions,
        }
    }

    pub fn validate(&self) -> MotionResult<()> {
        self.region_filter().validate()?;
        if let Some(kernel) = self.smoothing_kernel {
            if kernel == 0 || kernel % 2 == 0 {
                return Err(MotionError::InvalidParameter(format!(
                    "smoothing_kernel must be odd and >= 1, got {}",
                    kernel
                )));
            }
        }
        Ok(())
    }
}

/// Outcome of one differencing pass.
#[derive(Clone, Debug, PartialEq)]
pub struct MotionReport {
    /// Surviving components in raster order of their seed pixel.
    pub components: Vec<Component>,
    /// Components found before filtering.
    pub raw_component_count: usize,
    /// Foreground pixels of the dilated mask.
    pub foreground_pixels: usize,
    pub frame_pixels: usize,
    /// Current frame with box outlines, when annotation was requested.
    pub annotated: Option<GrayFrame>,
}

impl MotionReport {
    pub fn boxes(&self) -> Vec<BoundingBox> {
        self.components.iter().map(|c| c.bbox).collect()
    }

    pub fn motion_detected(&self) -> bool {
        !self.components.is_empty()
    }
}

/// Run the full pipeline over two frames of equal size.
pub fn detect_motion(
    prev: FrameView<'_>,
    curr: FrameView<'_>,
    params: &MotionParams,
) -> MotionResult<MotionReport> {
    params.validate()?;
    if prev.dimensions() != curr.dimensions() {
        return Err(MotionError::DimensionMismatch {
            prev: prev.dimensions(),
            curr: curr.dimensions(),
        });
    }

    let mut mask = match params.smoothing_kernel {
        Some(kernel) if kernel > 1 => {
            let prev = box_blur(prev, kernel)?;
            let curr = box_blur(curr, kernel)?;
            diff(prev.view(), curr.view(), params.threshold)?
        }
        _ => diff(prev, curr, params.threshold)?,
    };
    let changed = mask.foreground_count();
    dilate_in_place(&mut mask)?;

    let foreground_pixels = mask.foreground_count();
    let frame_pixels = mask.len();
    let raw = params.labeling.segment(&mask)?;
    let raw_component_count = raw.len();
    let components = params
        .region_filter()
        .apply(raw, foreground_pixels, frame_pixels);

    log::debug!(
        "motion pass: changed={} foreground={} components={} kept={}",
        changed,
        foreground_pixels,
        raw_component_count,
        components.len()
    );

    let annotated = if params.annotate {
        let mut out = curr.to_frame()?;
        let boxes: Vec<BoundingBox> = components.iter().map(|c| c.bbox).collect();
        annotate(&mut out.view_mut(), &boxes, params.box_color);
        Some(out)
    } else {
        None
    };

    Ok(MotionReport {
        components,
        raw_component_count,
        foreground_pixels,
        frame_pixels,
        annotated,
    })
}

/// Result of feeding one frame to a `MotionDetector`.
#[derive(Clone, Debug, PartialEq)]
pub enum FrameOutcome {
    /// No previous frame was held; this one was stored for the next call.
    Primed,
    Compared(MotionReport),
}

/// Stream driver holding the single previous-frame slot.
#[derive(Debug)]
pub struct MotionDetector {
    params: MotionParams,
    previous: Option<GrayFrame>,
    frames_compared: u64,
}

impl MotionDetector {
    pub fn new(params: MotionParams) -> MotionResult<Self> {
        params.validate()?;
        Ok(Self {
            params,
            previous: None,
            frames_compared: 0,
        })
    }

    pub fn params(&self) -> &MotionParams {
        &self.params
    }

    pub fn previous(&self) -> Option<&GrayFrame> {
        self.previous.as_ref()
    }

    pub fn frames_compared(&self) -> u64 {
        self.frames_compared
    }

    /// Drop the retained frame, e.g. after acquisition restarts.
    pub fn reset(&mut self) {
        self.previous = None;
    }

    /// Compare `curr` against the retained frame, then retain `curr`.
    pub fn process(&mut self, curr: FrameView<'_>) -> MotionResult<FrameOutcome> {
        match &mut self.previous {
            None => {
                self.previous = Some(curr.to_frame()?);
                Ok(FrameOutcome::Primed)
            }
            Some(prev) => {
                let report = detect_motion(prev.view(), curr, &self.params)?;
                prev.copy_from(curr)?;
                self.frames_compared += 1;
                Ok(FrameOutcome::Compared(report))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(min_pixels: usize) -> MotionParams {
        MotionParams {
            threshold: 50,
            min_pixels,
            ..MotionParams::default()
        }
    }

    fn frame_with_block(size: u32, x: u32, y: u32, block: u32, value: u8) -> GrayFrame {
        let mut frame = GrayFrame::filled(size, size, 0).unwrap();
        frame.fill_rect(x, y, x + block - 1, y + block - 1, value);
        frame
    }

    #[test]
    fn detector_primes_on_first_frame() {
        let mut detector = MotionDetector::new(params(1)).unwrap();
        let frame = GrayFrame::filled(8, 8, 10).unwrap();
        assert_eq!(detector.process(frame.view()).unwrap(), FrameOutcome::Primed);
        assert_eq!(detector.previous(), Some(&frame));
        assert_eq!(detector.frames_compared(), 0);
        assert_eq!(detector.params().min_pixels, 1);
    }

    #[test]
    fn detector_retains_latest_frame_after_compare() {
        let mut detector = MotionDetector::new(params(1)).unwrap();
        let first = GrayFrame::filled(12, 12, 0).unwrap();
        let second = frame_with_block(12, 4, 4, 3, 200);
        detector.process(first.view()).unwrap();
        let outcome = detector.process(second.view()).unwrap();
        let FrameOutcome::Compared(report) = outcome else {
            panic!("expected a comparison");
        };
        assert_eq!(report.boxes(), vec![BoundingBox::new(3, 3, 7, 7)]);
        assert_eq!(detector.previous(), Some(&second));
        assert_eq!(detector.frames_compared(), 1);
    }

    #[test]
    fn failed_pass_keeps_previous_frame() {
        let mut detector = MotionDetector::new(params(1)).unwrap();
        let first = GrayFrame::filled(6, 6, 0).unwrap();
        detector.process(first.view()).unwrap();
        let other = GrayFrame::filled(7, 6, 0).unwrap();
        let err = detector.process(other.view()).unwrap_err();
        assert!(matches!(err, MotionError::DimensionMismatch { .. }));
        assert_eq!(detector.previous(), Some(&first));
    }

    #[test]
    fn allocation_failure_keeps_previous_frame() {
        use crate::frame::fail_scratch_allocations;

        let mut detector = MotionDetector::new(params(1)).unwrap();
        let first = GrayFrame::filled(10, 10, 0).unwrap();
        let second = frame_with_block(10, 3, 3, 3, 200);
        detector.process(first.view()).unwrap();

        fail_scratch_allocations(true);
        let result = detector.process(second.view());
        fail_scratch_allocations(false);

        assert!(matches!(
            result,
            Err(MotionError::AllocationFailure { .. })
        ));
        assert_eq!(detector.previous(), Some(&first));
        assert_eq!(detector.frames_compared(), 0);

        // The same frame succeeds once memory is available again.
        let outcome = detector.process(second.view()).unwrap();
        assert!(matches!(outcome, FrameOutcome::Compared(ref r) if r.motion_detected()));
        assert_eq!(detector.previous(), Some(&second));
    }

    #[test]
    fn reset_clears_previous_frame() {
        let mut detector = MotionDetector::new(params(1)).unwrap();
        let frame = GrayFrame::filled(4, 4, 0).unwrap();
        detector.process(frame.view()).unwrap();
        detector.reset();
        assert!(detector.previous().is_none());
        assert_eq!(detector.process(frame.view()).unwrap(), FrameOutcome::Primed);
    }

    #[test]
    fn annotation_draws_boxes_on_current_frame_copy() {
        let prev = GrayFrame::filled(12, 12, 0).unwrap();
        let curr = frame_with_block(12, 4, 4, 3, 100);
        let report = detect_motion(prev.view(), curr.view(), &params(1)).unwrap();
        let annotated = report.annotated.expect("annotated frame");
        assert_eq!(annotated.get(3, 3), DEFAULT_BOX_COLOR);
        assert_eq!(annotated.get(5, 5), 100);
        // The caller's frame is untouched.
        assert_eq!(curr.get(3, 3), 0);
    }

    #[test]
    fn annotation_can_be_disabled() {
        let prev = GrayFrame::filled(5, 5, 0).unwrap();
        let curr = GrayFrame::filled(5, 5, 0).unwrap();
        let report = detect_motion(
            prev.view(),
            curr.view(),
            &MotionParams {
                annotate: false,
                ..params(1)
            },
        )
        .unwrap();
        assert!(report.annotated.is_none());
        assert!(!report.motion_detected());
    }

    #[test]
    fn smoothing_suppresses_isolated_pixel_noise() {
        let prev = GrayFrame::filled(9, 9, 0).unwrap();
        let mut curr = GrayFrame::filled(9, 9, 0).unwrap();
        curr.set(4, 4, 120);
        let noisy = detect_motion(prev.view(), curr.view(), &params(1)).unwrap();
        assert_eq!(noisy.components.len(), 1);
        let smoothed = detect_motion(
            prev.view(),
            curr.view(),
            &MotionParams {
                smoothing_kernel: Some(3),
                ..params(1)
            },
        )
        .unwrap();
        assert!(smoothed.components.is_empty());
    }

    #[test]
    fn invalid_params_are_rejected() {
        assert!(MotionDetector::new(params(0)).is_err());
        let even_kernel = MotionParams {
            smoothing_kernel: Some(4),
            ..MotionParams::default()
        };
        assert!(MotionDetector::new(even_kernel).is_err());
    }
}
