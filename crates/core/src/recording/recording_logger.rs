use std::time::Instant;

use crate::shared::constants::PROGRESS_LOG_INTERVAL;

/// Observer for capture-loop events.
///
/// Keeps the loop free of any particular output mechanism: the CLI logs
/// through the `log` crate, tests stay silent.
pub trait RecordingLogger: Send {
    /// Log a human-readable status message.
    fn info(&mut self, message: &str);

    /// Called after each frame reaches the writer. `written` counts frames
    /// written so far in this session.
    fn frame_written(&mut self, written: usize);

    /// Emit an end-of-session summary. Default: no-op.
    fn summary(&self) {}
}

/// Discards all events.
pub struct NullRecordingLogger;

impl RecordingLogger for NullRecordingLogger {
    fn info(&mut self, _message: &str) {}
    fn frame_written(&mut self, _written: usize) {}
}

/// Forwards events to `log::info!`.
///
/// Progress lines are throttled to one every `throttle_frames` frames, since
/// a camera produces tens of frames per second for as long as it runs.
pub struct LogRecordingLogger {
    throttle_frames: usize,
    start_time: Option<Instant>,
    frames: usize,
}

impl LogRecordingLogger {
    pub fn new(throttle_frames: usize) -> Self {
        Self {
            throttle_frames: throttle_frames.max(1),
            start_time: None,
            frames: 0,
        }
    }

    /// Returns the formatted summary, or `None` if no frame was written.
    pub fn summary_string(&self) -> Option<String> {
        let start = self.start_time?;
        if self.frames == 0 {
            return None;
        }
        let elapsed = start.elapsed().as_secs_f64();
        let mut line = format!(
            "Recording summary: {} frames in {elapsed:.1}s",
            self.frames
        );
        if elapsed > 0.0 {
            let fps = self.frames as f64 / elapsed;
            line.push_str(&format!(" ({fps:.1} fps captured)"));
        }
        Some(line)
    }
}

impl Default for LogRecordingLogger {
    fn default() -> Self {
        Self::new(PROGRESS_LOG_INTERVAL)
    }
}

impl RecordingLogger for LogRecordingLogger {
    fn info(&mut self, message: &str) {
        log::info!("{message}");
    }

    fn frame_written(&mut self, written: usize) {
        self.start_time.get_or_insert_with(Instant::now);
        self.frames = written;
        if written % self.throttle_frames == 0 {
            log::info!("Recording: {written} frames written");
        }
    }

    fn summary(&self) {
        if let Some(text) = self.summary_string() {
            log::info!("{text}");
        }
    }
}
