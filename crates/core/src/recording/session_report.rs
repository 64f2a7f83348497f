use std::fmt;
use std::path::PathBuf;
use std::sync::{Condvar, Mutex, PoisonError};
use std::time::Duration;

use thiserror::Error;

/// Why a recording session failed. Every variant is terminal for the
/// session; nothing is retried.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RecordingError {
    #[error("cannot open camera {device}: {reason}")]
    DeviceOpen { device: String, reason: String },
    #[error("cannot receive frame: {0}")]
    FrameRead(String),
    #[error("cannot create {}: {reason}", path.display())]
    WriterOpen { path: PathBuf, reason: String },
    #[error("cannot write frame: {0}")]
    FrameWrite(String),
    #[error("cannot finalize recording: {0}")]
    Finalize(String),
    #[error("cannot spawn capture thread: {0}")]
    Spawn(String),
}

/// How a session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEnd {
    /// `stop()` was called (directly, on drop or at process exit).
    Stopped,
    Failed(RecordingError),
}

/// Published once per started session, when its worker reaches `Closed`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionReport {
    pub frames_written: usize,
    pub end: SessionEnd,
}

impl SessionReport {
    pub fn stopped(frames_written: usize) -> Self {
        Self {
            frames_written,
            end: SessionEnd::Stopped,
        }
    }

    pub fn failed(frames_written: usize, error: RecordingError) -> Self {
        Self {
            frames_written,
            end: SessionEnd::Failed(error),
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self.end, SessionEnd::Failed(_))
    }

    pub fn error(&self) -> Option<&RecordingError> {
        match &self.end {
            SessionEnd::Failed(error) => Some(error),
            SessionEnd::Stopped => None,
        }
    }
}

impl fmt::Display for SessionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.end {
            SessionEnd::Stopped => write!(f, "stopped after {} frames", self.frames_written),
            SessionEnd::Failed(error) => {
                write!(f, "failed after {} frames: {error}", self.frames_written)
            }
        }
    }
}

/// Write-once holder for the session report, with blocking waits.
#[derive(Default)]
pub(crate) struct ReportSlot {
    report: Mutex<Option<SessionReport>>,
    ready: Condvar,
}

impl ReportSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `report` unless one was already published.
    pub fn publish(&self, report: SessionReport) {
        let mut slot = self.report.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.is_none() {
            *slot = Some(report);
            self.ready.notify_all();
        }
    }

    pub fn get(&self) -> Option<SessionReport> {
        self.report
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Blocks until a report is published or `timeout` elapses.
    pub fn wait(&self, timeout: Duration) -> Option<SessionReport> {
        let guard = self.report.lock().unwrap_or_else(PoisonError::into_inner);
        let (guard, _) = self
            .ready
            .wait_timeout_while(guard, timeout, |report| report.is_none())
            .unwrap_or_else(PoisonError::into_inner);
        guard.clone()
    }
}
