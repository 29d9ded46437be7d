use anyhow::Result;

use crate::detect::result::DetectionResult;

/// Detector backend trait.
///
/// The daemon drives frames through this seam. Implementations borrow the
/// pixel slice for the duration of one call and must not keep it; any state
/// carried between frames (such as a previous frame) is the backend's own copy.
pub trait DetectorBackend: Send {
    /// Backend identifier.
    fn name(&self) -> &'static str;

    /// Run detection on a grayscale frame, one byte per pixel.
    fn detect(&mut self, pixels: &[u8], width: u32, height: u32) -> Result<DetectionResult>;

    /// Optional warm-up hook.
    fn warm_up(&mut self) -> Result<()> {
        Ok(())
    }

    /// Drop inter-frame state, e.g. after the source reconnects.
    fn reset(&mut self) {}
}
