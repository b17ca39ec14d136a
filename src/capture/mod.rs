mod nokhwa_capture;

#[cfg(test)]
pub mod fake;

pub use nokhwa_capture::WebcamCapture;

use image::RgbImage;
use thiserror::Error;

/// Errors raised at the capture backend seam. Both are terminal for a run.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("Cannot open camera {index}: {reason}")]
    DeviceUnavailable { index: u32, reason: String },

    #[error("Can't receive frame: {0}")]
    FrameReadFailure(String),
}

/// Trait for camera capture sources
///
/// Implementors own the device handle; dropping the source releases it.
pub trait CaptureSource {
    /// Block until the next frame is available
    fn read_frame(&mut self) -> Result<RgbImage, CaptureError>;

    /// Get the resolution of captured frames
    fn resolution(&self) -> (u32, u32);
}

/// Reject frames that carry no pixels.
pub fn validate_frame(frame: RgbImage) -> Result<RgbImage, CaptureError> {
    let (width, height) = frame.dimensions();
    if width == 0 || height == 0 {
        return Err(CaptureError::FrameReadFailure(format!(
            "empty {}x{} frame",
            width, height
        )));
    }
    Ok(frame)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_frame_is_a_read_failure() {
        let err = validate_frame(RgbImage::new(0, 480)).unwrap_err();
        assert!(matches!(err, CaptureError::FrameReadFailure(_)));
        assert_eq!(err.to_string(), "Can't receive frame: empty 0x480 frame");
    }

    #[test]
    fn populated_frame_passes_through() {
        let frame = validate_frame(RgbImage::new(4, 2)).unwrap();
        assert_eq!(frame.dimensions(), (4, 2));
    }

    #[test]
    fn device_unavailable_names_the_index() {
        let err = CaptureError::DeviceUnavailable {
            index: 3,
            reason: "no such device".into(),
        };
        assert_eq!(err.to_string(), "Cannot open camera 3: no such device");
    }
}
