use image::codecs::jpeg::JpegEncoder;
use image::RgbImage;
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DEFAULT_PHOTO_PATH: &str = "photo.jpg";
pub const DEFAULT_JPEG_QUALITY: u8 = 95;

#[derive(Debug, Error)]
pub enum PhotoError {
    #[error("Invalid JPEG quality {0}, expected 1-100")]
    InvalidQuality(u8),

    #[error("Failed to encode {}: {source}", path.display())]
    Encode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Failed to write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Writes frames as JPEG to a single path, replacing the previous photo.
#[derive(Debug, Clone)]
pub struct PhotoWriter {
    path: PathBuf,
    quality: u8,
}

impl Default for PhotoWriter {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_PHOTO_PATH),
            quality: DEFAULT_JPEG_QUALITY,
        }
    }
}

impl PhotoWriter {
    pub fn new<P: Into<PathBuf>>(path: P, quality: u8) -> Result<Self, PhotoError> {
        if !(1..=100).contains(&quality) {
            return Err(PhotoError::InvalidQuality(quality));
        }
        Ok(Self {
            path: path.into(),
            quality,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Encode `frame` and replace the photo on disk.
    ///
    /// The JPEG is written next to the target and renamed over it, so readers
    /// never observe a half-written photo.
    pub fn save(&self, frame: &RgbImage) -> Result<&Path, PhotoError> {
        let _span = tracing::debug_span!("save_photo", path = %self.path.display()).entered();

        let staging = self.staging_path();
        if let Err(err) = self.write_jpeg(&staging, frame) {
            let _ = fs::remove_file(&staging);
            return Err(err);
        }

        fs::rename(&staging, &self.path).map_err(|source| {
            let _ = fs::remove_file(&staging);
            PhotoError::Io {
                path: self.path.clone(),
                source,
            }
        })?;

        Ok(&self.path)
    }

    fn staging_path(&self) -> PathBuf {
        let mut name = OsString::from(self.path.as_os_str());
        name.push(".tmp");
        PathBuf::from(name)
    }

    fn write_jpeg(&self, staging: &Path, frame: &RgbImage) -> Result<(), PhotoError> {
        let io_error = |source: std::io::Error| PhotoError::Io {
            path: staging.to_path_buf(),
            source,
        };

        let file = File::create(staging).map_err(io_error)?;
        let mut writer = BufWriter::new(file);

        JpegEncoder::new_with_quality(&mut writer, self.quality)
            .encode_image(frame)
            .map_err(|source| PhotoError::Encode {
                path: self.path.clone(),
                source,
            })?;

        writer.flush().map_err(io_error)?;
        Ok(())
    }
}
