use super::{validate_frame, CaptureError, CaptureSource};
use image::{Rgb, RgbImage};
use std::cell::RefCell;
use std::collections::{HashSet, VecDeque};
use std::rc::Rc;

pub const FAKE_WIDTH: u32 = 8;
pub const FAKE_HEIGHT: u32 = 6;

/// Outcome of one scripted read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FakeRead {
    Frame,
    Fail,
    Empty,
}

#[derive(Default)]
struct Bus {
    present: HashSet<u32>,
    open: HashSet<u32>,
}

/// Shared view of the fake cameras plugged into the machine.
///
/// Tracks which indices are open so tests can check exclusive ownership and
/// release.
#[derive(Clone, Default)]
pub struct FakeDevices {
    bus: Rc<RefCell<Bus>>,
}

impl FakeDevices {
    pub fn with_devices(indices: &[u32]) -> Self {
        let devices = Self::default();
        devices.bus.borrow_mut().present.extend(indices);
        devices
    }

    /// Open `index`; reads follow `script`, then yield frames forever.
    pub fn open(&self, index: u32, script: &[FakeRead]) -> Result<FakeCamera, CaptureError> {
        let mut bus = self.bus.borrow_mut();
        if !bus.present.contains(&index) {
            return Err(CaptureError::DeviceUnavailable {
                index,
                reason: "no such device".into(),
            });
        }
        if !bus.open.insert(index) {
            return Err(CaptureError::DeviceUnavailable {
                index,
                reason: "device busy".into(),
            });
        }
        Ok(FakeCamera {
            devices: self.clone(),
            index,
            script: script.iter().copied().collect(),
            frames: 0,
        })
    }

    pub fn is_open(&self, index: u32) -> bool {
        self.bus.borrow().open.contains(&index)
    }
}

pub struct FakeCamera {
    devices: FakeDevices,
    index: u32,
    script: VecDeque<FakeRead>,
    frames: u8,
}

/// Solid frame whose red channel identifies its sequence number.
///
/// Steps of 40 keep neighbouring frames apart after JPEG compression.
pub fn numbered_frame(n: u8) -> RgbImage {
    RgbImage::from_pixel(FAKE_WIDTH, FAKE_HEIGHT, Rgb([n.wrapping_mul(40), 0, 0]))
}

impl CaptureSource for FakeCamera {
    fn read_frame(&mut self) -> Result<RgbImage, CaptureError> {
        match self.script.pop_front().unwrap_or(FakeRead::Frame) {
            FakeRead::Frame => {
                self.frames = self.frames.wrapping_add(1);
                validate_frame(numbered_frame(self.frames))
            }
            FakeRead::Fail => Err(CaptureError::FrameReadFailure("device disconnected".into())),
            FakeRead::Empty => validate_frame(RgbImage::new(0, 0)),
        }
    }

    fn resolution(&self) -> (u32, u32) {
        (FAKE_WIDTH, FAKE_HEIGHT)
    }
}

impl Drop for FakeCamera {
    fn drop(&mut self) {
        self.devices.bus.borrow_mut().open.remove(&self.index);
    }
}
