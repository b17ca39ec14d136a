mod window;

#[cfg(test)]
pub mod fake;

pub use window::PreviewWindow;

use image::RgbImage;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PreviewError {
    #[error("Failed to create preview window: {0}")]
    Create(String),

    #[error("Failed to update preview window: {0}")]
    Update(String),
}

/// A user command decoded from keyboard input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Write the current frame to the photo path
    Save,
    /// Leave the capture loop
    Quit,
    /// The user closed the preview window
    WindowClosed,
}

/// Trait for surfaces that show frames
pub trait PreviewSurface {
    fn render(&mut self, frame: &RgbImage) -> Result<(), PreviewError>;
}

/// Trait for sources of user commands
pub trait CommandSource {
    /// Wait at most `timeout` for the next command.
    ///
    /// Returns `None` when nothing arrived in time. Implementations tied to a
    /// GUI pump its events here.
    fn next_command(&mut self, timeout: Duration) -> Result<Option<Command>, PreviewError>;
}

/// Pack an RGB frame into the 0RGB `u32` layout window buffers use.
pub fn pack_0rgb(frame: &RgbImage, buffer: &mut Vec<u32>) {
    buffer.clear();
    buffer.extend(frame.pixels().map(|pixel| {
        let [r, g, b] = pixel.0;
        ((r as u32) << 16) | ((g as u32) << 8) | b as u32
    }));
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn packs_pixels_row_major() {
        let mut frame = RgbImage::new(2, 2);
        frame.put_pixel(0, 0, Rgb([0xff, 0x00, 0x00]));
        frame.put_pixel(1, 0, Rgb([0x00, 0xff, 0x00]));
        frame.put_pixel(0, 1, Rgb([0x00, 0x00, 0xff]));
        frame.put_pixel(1, 1, Rgb([0x12, 0x34, 0x56]));

        let mut buffer = Vec::new();
        pack_0rgb(&frame, &mut buffer);

        assert_eq!(buffer, vec![0xff0000, 0x00ff00, 0x0000ff, 0x123456]);
    }

    #[test]
    fn reuses_buffer_between_frames() {
        let mut buffer = vec![7; 100];
        pack_0rgb(&RgbImage::new(3, 1), &mut buffer);
        assert_eq!(buffer, vec![0; 3]);
    }
}
