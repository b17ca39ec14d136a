use super::{Command, CommandSource, PreviewError, PreviewSurface};
use image::RgbImage;
use std::collections::VecDeque;
use std::time::Duration;

/// Surface that replays a fixed list of poll results.
///
/// Once the script runs out every poll answers `Quit`, so a loop under test
/// always terminates.
pub struct ScriptedSurface {
    polls: VecDeque<Option<Command>>,
    pub rendered: Vec<RgbImage>,
    pub timeouts: Vec<Duration>,
    pub fail_render: bool,
}

impl ScriptedSurface {
    pub fn new(polls: &[Option<Command>]) -> Self {
        Self {
            polls: polls.iter().copied().collect(),
            rendered: Vec::new(),
            timeouts: Vec::new(),
            fail_render: false,
        }
    }
}

impl PreviewSurface for ScriptedSurface {
    fn render(&mut self, frame: &RgbImage) -> Result<(), PreviewError> {
        if self.fail_render {
            return Err(PreviewError::Update("display lost".into()));
        }
        self.rendered.push(frame.clone());
        Ok(())
    }
}

impl CommandSource for ScriptedSurface {
    fn next_command(&mut self, timeout: Duration) -> Result<Option<Command>, PreviewError> {
        self.timeouts.push(timeout);
        Ok(self.polls.pop_front().unwrap_or(Some(Command::Quit)))
    }
}
