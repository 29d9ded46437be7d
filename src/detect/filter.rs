use crate::error::{MotionError, MotionResult};
use crate::frame::Component;

/// Share of the foreground mass at which a single component is treated as
/// global noise (illumination change, gain shift) rather than an object.
pub const DEFAULT_MAX_COMPONENT_FRACTION: f32 = 0.9;

/// Share of the frame the foreground must cover before the dominant-component
/// rule applies.
pub const DEFAULT_GLOBAL_COVERAGE: f32 = 0.5;

/// Drops noise speckles and degenerate whole-frame components.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RegionFilter {
    /// Components with fewer pixels are dropped.
    pub min_pixels: usize,
    /// Components holding at least this share of the foreground are dropped.
    pub max_component_fraction: f32,
    /// The dominant-component rule only fires when foreground covers at least
    /// this share of the frame.
    pub global_coverage: f32,
    /// Keep at most this many components, in emission order.
    pub max_regions: Option<usize>,
}

impl Default for RegionFilter {
    fn default() -> Self {
        Self {
            min_pixels: 1,
            max_component_fraction: DEFAULT_MAX_COMPONENT_FRACTION,
            global_coverage: DEFAULT_GLOBAL_COVERAGE,
            max_regions: None,
        }
    }
}

impl RegionFilter {
    pub fn new(min_pixels: usize) -> Self {
        Self {
            min_pixels,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> MotionResult<()> {
        if self.min_pixels == 0 {
            return Err(MotionError::InvalidParameter(
                "min_pixels must be at least 1".into(),
            ));
        }
        if !(self.max_component_fraction > 0.0 && self.max_component_fraction <= 1.0) {
            return Err(MotionError::InvalidParameter(format!(
                "max_component_fraction must be in (0, 1], got {}",
                self.max_component_fraction
            )));
        }
        if !(0.0..=1.0).contains(&self.global_coverage) {
            return Err(MotionError::InvalidParameter(format!(
                "global_coverage must be in [0, 1], got {}",
                self.global_coverage
            )));
        }
        Ok(())
    }

    /// Filter `components`, preserving emission order.
    ///
    /// `total_foreground` is the foreground pixel count of the segmented mask,
    /// computed once by the caller. `frame_pixels` is width * height.
    pub fn apply(
        &self,
        components: Vec<Component>,
        total_foreground: usize,
        frame_pixels: usize,
    ) -> Vec<Component> {
        if total_foreground == 0 {
            return Vec::new();
        }
        let degenerate_check = total_foreground > 1
            && total_foreground as f64 >= self.global_coverage as f64 * frame_pixels as f64;
        let limit = self.max_component_fraction as f64 * total_foreground as f64;

        let kept = components.into_iter().filter(|component| {
            if component.pixel_count < self.min_pixels {
                return false;
            }
            if degenerate_check && component.pixel_count as f64 >= limit {
                log::debug!(
                    "discarding component {:?}: holds {:.1}% of foreground",
                    component.bbox,
                    component.pixel_count as f64 * 100.0 / total_foreground as f64
                );
                return false;
            }
            true
        });
        match self.max_regions {
            Some(max) => kept.take(max).collect(),
            None => kept.collect(),
        }
    }
}

/// Filter with the default fraction rule and no region cap.
pub fn filter(
    components: Vec<Component>,
    total_foreground: usize,
    frame_pixels: usize,
    min_pixels: usize,
) -> Vec<Component> {
    RegionFilter::new(min_pixels).apply(components, total_foreground, frame_pixels)
}
