use crate::capture::{CaptureError, CaptureSource};
use crate::photo::PhotoWriter;
use crate::preview::{Command, CommandSource, PreviewError, PreviewSurface};
use image::RgbImage;
use std::fmt;
use std::time::{Duration, Instant};
use thiserror::Error;

pub const DEFAULT_DEVICE_INDEX: u32 = 0;
pub const DEFAULT_WINDOW_TITLE: &str = "Webcam Test";
pub const DEFAULT_POLL_MS: u64 = 1;
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_millis(DEFAULT_POLL_MS);
pub const DEFAULT_READ_RETRIES: u32 = 0;

/// Frames between debug timing reports
const STATS_INTERVAL: u64 = 30;

#[derive(Debug, Error)]
pub enum CaptureLoopError {
    #[error(transparent)]
    Capture(#[from] CaptureError),

    #[error(transparent)]
    Preview(#[from] PreviewError),

    #[error("Capture loop is not streaming (state {0:?})")]
    NotStreaming(LoopState),
}

/// Lifecycle of a capture session.
///
/// `Idle → Opening → Streaming → Closing → Closed`, with `Opening → Closed`
/// when the device or window cannot be acquired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Idle,
    Opening,
    Streaming,
    Closing,
    Closed,
}

impl LoopState {
    pub fn can_advance_to(self, next: LoopState) -> bool {
        use LoopState::*;
        matches!(
            (self, next),
            (Idle, Opening)
                | (Opening, Streaming)
                | (Opening, Closed)
                | (Streaming, Closing)
                | (Closing, Closed)
        )
    }
}

#[derive(Debug, Clone)]
pub struct LoopConfig {
    pub device_index: u32,
    pub window_title: String,
    pub poll_timeout: Duration,
    /// Consecutive read failures tolerated before the loop gives up
    pub read_retries: u32,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            device_index: DEFAULT_DEVICE_INDEX,
            window_title: DEFAULT_WINDOW_TITLE.to_string(),
            poll_timeout: DEFAULT_POLL_TIMEOUT,
            read_retries: DEFAULT_READ_RETRIES,
        }
    }
}

/// Why the loop left `Streaming`.
#[derive(Debug)]
pub enum StopReason {
    Quit,
    WindowClosed,
    /// The device stopped delivering frames; terminal for the run
    ReadFailure(CaptureError),
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::Quit => f.write_str("quit"),
            StopReason::WindowClosed => f.write_str("window closed"),
            StopReason::ReadFailure(_) => f.write_str("frame read failure"),
        }
    }
}

#[derive(Debug)]
pub struct LoopSummary {
    pub frames: u64,
    pub photos_saved: u64,
    pub stop: StopReason,
}

#[derive(Debug, Default)]
struct Counters {
    frames: u64,
    photos_saved: u64,
}

/// An open camera and its preview window, owned for one session.
pub struct CaptureLoop<C, S> {
    capture: C,
    surface: S,
    config: LoopConfig,
    state: LoopState,
}

fn advance(state: &mut LoopState, next: LoopState) {
    debug_assert!(
        state.can_advance_to(next),
        "invalid transition {:?} -> {:?}",
        state,
        next
    );
    tracing::debug!("Capture loop {:?} -> {:?}", state, next);
    *state = next;
}

impl<C, S> CaptureLoop<C, S>
where
    C: CaptureSource,
    S: PreviewSurface + CommandSource,
{
    /// Acquire the camera, then the window sized to its resolution.
    ///
    /// No window is created when the camera cannot be opened.
    pub fn open<OC, OS>(
        config: LoopConfig,
        open_capture: OC,
        open_surface: OS,
    ) -> Result<Self, CaptureLoopError>
    where
        OC: FnOnce(u32) -> Result<C, CaptureError>,
        OS: FnOnce(&str, u32, u32) -> Result<S, PreviewError>,
    {
        let mut state = LoopState::Idle;
        advance(&mut state, LoopState::Opening);

        let capture = match open_capture(config.device_index) {
            Ok(capture) => capture,
            Err(err) => {
                advance(&mut state, LoopState::Closed);
                return Err(err.into());
            }
        };

        let (width, height) = capture.resolution();
        let surface = match open_surface(&config.window_title, width, height) {
            Ok(surface) => surface,
            Err(err) => {
                drop(capture);
                advance(&mut state, LoopState::Closed);
                return Err(err.into());
            }
        };

        advance(&mut state, LoopState::Streaming);
        tracing::info!("Camera opened. Press 's' to save photo, 'q' to quit.");

        Ok(Self {
            capture,
            surface,
            config,
            state,
        })
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    /// Read, render and poll until a stop condition.
    ///
    /// A read failure ends the loop with `StopReason::ReadFailure`; only
    /// preview errors come back as `Err`. Leaves the loop in `Closing`.
    pub fn stream(&mut self, photo: &PhotoWriter) -> Result<LoopSummary, CaptureLoopError> {
        if self.state() != LoopState::Streaming {
            return Err(CaptureLoopError::NotStreaming(self.state()));
        }

        let mut counters = Counters::default();
        let result = self.stream_frames(photo, &mut counters);

        match &result {
            Ok(stop) => tracing::debug!(
                frames = counters.frames,
                photos_saved = counters.photos_saved,
                "Capture loop stopped: {}",
                stop
            ),
            Err(_) => tracing::debug!(
                frames = counters.frames,
                photos_saved = counters.photos_saved,
                "Capture loop stopped: preview failure"
            ),
        }
        advance(&mut self.state, LoopState::Closing);

        result.map(|stop| LoopSummary {
            frames: counters.frames,
            photos_saved: counters.photos_saved,
            stop,
        })
    }

    fn stream_frames(
        &mut self,
        photo: &PhotoWriter,
        counters: &mut Counters,
    ) -> Result<StopReason, CaptureLoopError> {
        let mut consecutive_failures = 0u32;
        let mut total_read_time = Duration::ZERO;

        loop {
            let read_start = Instant::now();
            let frame = match self.capture.read_frame() {
                Ok(frame) => {
                    consecutive_failures = 0;
                    frame
                }
                Err(err) if consecutive_failures < self.config.read_retries => {
                    consecutive_failures += 1;
                    tracing::warn!(
                        "{} (retry {}/{})",
                        err,
                        consecutive_failures,
                        self.config.read_retries
                    );
                    // Keep the window responsive while the device recovers
                    if let Some(stop) = self.poll(None, photo, counters)? {
                        return Ok(stop);
                    }
                    continue;
                }
                Err(err) => return Ok(StopReason::ReadFailure(err)),
            };
            total_read_time += read_start.elapsed();
            counters.frames += 1;

            self.surface.render(&frame)?;

            if let Some(stop) = self.poll(Some(&frame), photo, counters)? {
                return Ok(stop);
            }

            if counters.frames % STATS_INTERVAL == 0 {
                let avg_read_ms =
                    total_read_time.as_secs_f64() * 1000.0 / counters.frames as f64;
                tracing::debug!("Frame {}: read={:.1}ms", counters.frames, avg_read_ms);
            }
        }
    }

    /// Wait for one command and act on it; `Some` means stop.
    fn poll(
        &mut self,
        frame: Option<&RgbImage>,
        photo: &PhotoWriter,
        counters: &mut Counters,
    ) -> Result<Option<StopReason>, CaptureLoopError> {
        match self.surface.next_command(self.config.poll_timeout)? {
            Some(Command::Save) => match frame {
                Some(frame) => match photo.save(frame) {
                    Ok(path) => {
                        counters.photos_saved += 1;
                        tracing::info!("Saved {}", path.display());
                    }
                    Err(err) => tracing::error!("{}", err),
                },
                None => tracing::warn!("No frame to save"),
            },
            Some(Command::Quit) => return Ok(Some(StopReason::Quit)),
            Some(Command::WindowClosed) => return Ok(Some(StopReason::WindowClosed)),
            None => {}
        }
        Ok(None)
    }

    /// Destroy the window and release the camera.
    pub fn close(self) -> LoopState {
        let Self {
            capture,
            surface,
            mut state,
            ..
        } = self;

        if state == LoopState::Streaming {
            advance(&mut state, LoopState::Closing);
        }
        drop(surface);
        drop(capture);
        advance(&mut state, LoopState::Closed);
        state
    }
}

/// Run one full session: open, stream, close.
///
/// The device and window are released before this returns, whatever the
/// outcome.
pub fn run<C, S, OC, OS>(
    config: LoopConfig,
    photo: &PhotoWriter,
    open_capture: OC,
    open_surface: OS,
) -> Result<LoopSummary, CaptureLoopError>
where
    C: CaptureSource,
    S: PreviewSurface + CommandSource,
    OC: FnOnce(u32) -> Result<C, CaptureError>,
    OS: FnOnce(&str, u32, u32) -> Result<S, PreviewError>,
{
    let mut capture_loop = CaptureLoop::open(config, open_capture, open_surface)?;
    let outcome = capture_loop.stream(photo);
    capture_loop.close();
    outcome
}
