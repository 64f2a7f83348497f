use std::time::Duration;

use crate::capture::domain::capture_request::CaptureRequest;
use crate::capture::domain::frame_source::FrameSource;
use crate::shared::constants::FRAME_CHANNELS;
use crate::shared::frame::Frame;
use crate::shared::resolution::Resolution;

pub const DEFAULT_PATTERN_RESOLUTION: Resolution = Resolution::new(320, 240);

/// Synthetic camera that emits flat gray frames whose brightness steps with
/// the frame index, so output order is visible in the encoded file.
///
/// Honors any requested size. With a frame limit, the read after the last
/// frame fails like an unplugged device would.
pub struct PatternSource {
    default_resolution: Resolution,
    frame_limit: Option<usize>,
    interval: Option<Duration>,
    resolution: Option<Resolution>,
    next_index: usize,
}

impl PatternSource {
    pub fn new() -> Self {
        Self {
            default_resolution: DEFAULT_PATTERN_RESOLUTION,
            frame_limit: None,
            interval: None,
            resolution: None,
            next_index: 0,
        }
    }

    /// Resolution used when the request does not ask for one.
    pub fn with_default_resolution(mut self, resolution: Resolution) -> Self {
        self.default_resolution = resolution;
        self
    }

    pub fn with_frame_limit(mut self, limit: usize) -> Self {
        self.frame_limit = Some(limit);
        self
    }

    /// Sleep between frames to mimic a device's cadence.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = Some(interval);
        self
    }

    /// Brightness of frame `index`.
    pub fn shade(index: usize) -> u8 {
        ((index * 40) % 256) as u8
    }
}

impl Default for PatternSource {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameSource for PatternSource {
    fn open(&mut self, request: &CaptureRequest) -> Result<Resolution, Box<dyn std::error::Error>> {
        let resolution = request.size.unwrap_or(self.default_resolution);
        if resolution.width == 0 || resolution.height == 0 {
            return Err(format!("invalid pattern size {resolution}").into());
        }
        self.resolution = Some(resolution);
        self.next_index = 0;
        Ok(resolution)
    }

    fn read_frame(&mut self) -> Result<Frame, Box<dyn std::error::Error>> {
        let resolution = self.resolution.ok_or("PatternSource: not opened")?;
        if self.frame_limit.is_some_and(|limit| self.next_index >= limit) {
            return Err("pattern source exhausted".into());
        }
        if let Some(interval) = self.interval {
            std::thread::sleep(interval);
        }

        let index = self.next_index;
        self.next_index += 1;
        Ok(Frame::solid(resolution, FRAME_CHANNELS, Self::shade(index), index))
    }

    fn is_open(&self) -> bool {
        self.resolution.is_some()
    }

    fn release(&mut self) {
        self.resolution = None;
    }
}
