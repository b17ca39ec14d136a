use super::{validate_frame, CaptureError, CaptureSource};
use image::RgbImage;
use nokhwa::pixel_format::RgbFormat;
use nokhwa::utils::{CameraIndex, RequestedFormat, RequestedFormatType};
use nokhwa::Camera;

/// A V4L2 webcam opened through nokhwa.
pub struct WebcamCapture {
    camera: Camera,
    index: u32,
    width: u32,
    height: u32,
}

impl WebcamCapture {
    /// Open the camera at `device_index` and start its stream.
    pub fn open(device_index: u32) -> Result<Self, CaptureError> {
        tracing::info!("Opening webcam {}", device_index);

        let unavailable = |err: nokhwa::NokhwaError| CaptureError::DeviceUnavailable {
            index: device_index,
            reason: err.to_string(),
        };

        let index = CameraIndex::Index(device_index);
        let requested =
            RequestedFormat::new::<RgbFormat>(RequestedFormatType::AbsoluteHighestFrameRate);

        let mut camera = Camera::new(index, requested).map_err(unavailable)?;
        camera.open_stream().map_err(unavailable)?;

        let resolution = camera.resolution();
        tracing::info!(
            "Webcam {} streaming at {}x{}",
            device_index,
            resolution.width(),
            resolution.height()
        );

        Ok(Self {
            camera,
            index: device_index,
            width: resolution.width(),
            height: resolution.height(),
        })
    }
}

impl CaptureSource for WebcamCapture {
    fn read_frame(&mut self) -> Result<RgbImage, CaptureError> {
        let buffer = self
            .camera
            .frame()
            .map_err(|err| CaptureError::FrameReadFailure(err.to_string()))?;

        let expected = buffer.resolution();
        let decoded = buffer
            .decode_image::<RgbFormat>()
            .map_err(|err| CaptureError::FrameReadFailure(err.to_string()))?;

        // A short MJPEG payload can decode to a smaller image than advertised
        if decoded.dimensions() != (expected.width(), expected.height()) {
            return Err(CaptureError::FrameReadFailure(format!(
                "decoded {}x{} frame, expected {}x{}",
                decoded.width(),
                decoded.height(),
                expected.width(),
                expected.height()
            )));
        }

        validate_frame(decoded)
    }

    fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

// nokhwa's `Camera` stops its own stream on drop
impl Drop for WebcamCapture {
    fn drop(&mut self) {
        tracing::debug!("Webcam {} released", self.index);
    }
}
