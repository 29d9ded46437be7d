//! Motion detection: frame differencing, dilation, connected-component
//! labeling, region filtering, and box annotation.

pub mod annotate;
mod backend;
mod backends;
pub mod diff;
pub mod filter;
pub mod labeling;
pub mod morphology;
pub mod pipeline;
mod result;

pub use annotate::{annotate, DEFAULT_BOX_COLOR};
pub use backend::DetectorBackend;
pub use backends::FrameDiffBackend;
pub use diff::diff;
pub use filter::{filter, RegionFilter};
pub use labeling::{count_regions, segment, segment_union_find, LabelingStrategy};
pub use morphology::{box_blur, dilate, dilate_in_place};
pub use pipeline::{detect_motion, FrameOutcome, MotionDetector, MotionParams, MotionReport};
pub use result::{Detection, DetectionResult, SizeClass};
