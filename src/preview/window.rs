use super::{pack_0rgb, Command, CommandSource, PreviewError, PreviewSurface};
use image::RgbImage;
use minifb::{Key, KeyRepeat, ScaleMode, Window, WindowOptions};
use std::time::{Duration, Instant};

/// Granularity of the event pump while waiting for a key.
const PUMP_INTERVAL: Duration = Duration::from_millis(1);

/// Native preview window backed by minifb.
///
/// Rendering and key polling share one event pump, so the window is both the
/// preview surface and the command source.
pub struct PreviewWindow {
    window: Window,
    buffer: Vec<u32>,
}

impl PreviewWindow {
    pub fn open(title: &str, width: u32, height: u32) -> Result<Self, PreviewError> {
        tracing::debug!("Creating preview window '{}' ({}x{})", title, width, height);

        let window = Window::new(
            title,
            width as usize,
            height as usize,
            WindowOptions {
                resize: true,
                scale_mode: ScaleMode::AspectRatioStretch,
                ..WindowOptions::default()
            },
        )
        .map_err(|err| PreviewError::Create(err.to_string()))?;

        Ok(Self {
            window,
            buffer: Vec::with_capacity((width * height) as usize),
        })
    }

    fn pressed_command(&self) -> Option<Command> {
        self.window
            .get_keys_pressed(KeyRepeat::No)
            .into_iter()
            .find_map(command_for_key)
    }
}

fn command_for_key(key: Key) -> Option<Command> {
    match key {
        Key::S => Some(Command::Save),
        Key::Q | Key::Escape => Some(Command::Quit),
        _ => None,
    }
}

impl PreviewSurface for PreviewWindow {
    fn render(&mut self, frame: &RgbImage) -> Result<(), PreviewError> {
        let (width, height) = frame.dimensions();
        pack_0rgb(frame, &mut self.buffer);
        self.window
            .update_with_buffer(&self.buffer, width as usize, height as usize)
            .map_err(|err| PreviewError::Update(err.to_string()))
    }
}

impl CommandSource for PreviewWindow {
    fn next_command(&mut self, timeout: Duration) -> Result<Option<Command>, PreviewError> {
        let deadline = Instant::now() + timeout;
        loop {
            if !self.window.is_open() {
                return Ok(Some(Command::WindowClosed));
            }
            // Keys seen by the last update, including the one done by render
            if let Some(command) = self.pressed_command() {
                return Ok(Some(command));
            }

            let now = Instant::now();
            if now >= deadline {
                return Ok(None);
            }
            std::thread::sleep((deadline - now).min(PUMP_INTERVAL));
            self.window.update();
        }
    }
}

impl Drop for PreviewWindow {
    fn drop(&mut self) {
        tracing::debug!("Preview window destroyed");
    }
}
