mod capture;
mod capture_loop;
mod photo;
mod preview;

use anyhow::{Context, Result};
use capture::WebcamCapture;
use capture_loop::{
    LoopConfig, StopReason, DEFAULT_DEVICE_INDEX, DEFAULT_POLL_MS, DEFAULT_READ_RETRIES,
    DEFAULT_WINDOW_TITLE,
};
use clap::Parser;
use photo::{PhotoWriter, DEFAULT_JPEG_QUALITY, DEFAULT_PHOTO_PATH};
use preview::PreviewWindow;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Webcam device index
    #[arg(short, long, default_value_t = DEFAULT_DEVICE_INDEX)]
    device: u32,

    /// Where the 's' key writes the current frame
    #[arg(short, long, default_value = DEFAULT_PHOTO_PATH)]
    output: PathBuf,

    /// JPEG quality of saved photos
    #[arg(long, default_value_t = DEFAULT_JPEG_QUALITY, value_parser = clap::value_parser!(u8).range(1..=100))]
    quality: u8,

    /// How long each iteration waits for a key, in milliseconds
    #[arg(long, default_value_t = DEFAULT_POLL_MS)]
    poll_ms: u64,

    /// Preview window title
    #[arg(long, default_value = DEFAULT_WINDOW_TITLE)]
    title: String,

    /// Consecutive frame read failures to tolerate before giving up
    #[arg(long, default_value_t = DEFAULT_READ_RETRIES)]
    read_retries: u32,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,
}

impl Args {
    fn loop_config(&self) -> LoopConfig {
        LoopConfig {
            device_index: self.device,
            window_title: self.title.clone(),
            poll_timeout: Duration::from_millis(self.poll_ms),
            read_retries: self.read_retries,
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .init();

    tracing::debug!("Device: {}", args.device);

    let photo = PhotoWriter::new(&args.output, args.quality).context("Invalid photo settings")?;
    tracing::info!(
        "Photos will be written to {} (quality {})",
        photo.path().display(),
        args.quality
    );

    let summary = capture_loop::run(
        args.loop_config(),
        &photo,
        WebcamCapture::open,
        PreviewWindow::open,
    )
    .context("Webcam session failed")?;

    tracing::info!(
        "Done ({}): {} frames shown, {} photos saved",
        summary.stop,
        summary.frames,
        summary.photos_saved
    );

    match summary.stop {
        StopReason::ReadFailure(err) => Err(err).context("Webcam session failed"),
        StopReason::Quit | StopReason::WindowClosed => Ok(()),
    }
}
