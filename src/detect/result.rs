use serde::Serialize;

use crate::frame::{BoundingBox, Component, GrayFrame};

/// Share of the frame below which the largest region counts as a small object.
pub const SMALL_OBJECT_FRACTION: f32 = 0.05;

/// Result of running detection on a frame.
#[derive(Clone, Debug, Default, Serialize)]
pub struct DetectionResult {
    /// Did any region survive filtering?
    pub motion_detected: bool,
    /// False when the frame only primed the detector.
    pub compared: bool,
    /// Bounding boxes (normalized 0..1 coordinates).
    pub detections: Vec<Detection>,
    /// Foreground pixels after dilation.
    pub foreground_pixels: usize,
    /// Size class of the largest region.
    pub size_class: SizeClass,
    /// Current frame with region outlines drawn in.
    #[serde(skip)]
    pub annotated: Option<GrayFrame>,
}

impl DetectionResult {
    pub fn boxes(&self) -> impl Iterator<Item = BoundingBox> + '_ {
        self.detections.iter().map(|d| d.bbox)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Detection {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
    pub pixel_count: usize,
    /// Pixel-space box the normalized coordinates were derived from.
    pub bbox: BoundingBox,
}

impl Detection {
    pub fn from_component(component: &Component, width: u32, height: u32) -> Self {
        let bbox = component.bbox;
        let (fw, fh) = (width as f32, height as f32);
        Self {
            x: bbox.min_x as f32 / fw,
            y: bbox.min_y as f32 / fh,
            w: bbox.width() as f32 / fw,
            h: bbox.height() as f32 / fh,
            pixel_count: component.pixel_count,
            bbox,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SizeClass {
    #[default]
    Unknown,
    Small,
    Large,
}

impl SizeClass {
    /// Classify by the largest component's share of `frame_pixels`.
    pub fn classify(components: &[Component], frame_pixels: usize) -> Self {
        let Some(largest) = components.iter().map(|c| c.pixel_count).max() else {
            return SizeClass::Unknown;
        };
        if (largest as f64) < SMALL_OBJECT_FRACTION as f64 * frame_pixels as f64 {
            SizeClass::Small
        } else {
            SizeClass::Large
        }
    }
}
