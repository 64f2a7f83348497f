use std::sync::{Mutex, MutexGuard, PoisonError, TryLockError};

use crate::capture::domain::frame_source::FrameSource;
use crate::video::domain::video_writer::VideoWriter;

/// The open capture and writer handles of a streaming session.
///
/// The writer is only ever present alongside an open source.
#[derive(Default)]
pub(crate) struct Handles {
    pub source: Option<Box<dyn FrameSource>>,
    pub writer: Option<Box<dyn VideoWriter>>,
}

impl Handles {
    fn take(&mut self) -> Handles {
        Handles {
            source: self.source.take(),
            writer: self.writer.take(),
        }
    }

    fn is_empty(&self) -> bool {
        self.source.is_none() && self.writer.is_none()
    }

    /// Releases the capture device, then finalizes the output file.
    /// Returns the writer's close error, if any.
    fn release(self) -> Result<(), String> {
        if let Some(mut source) = self.source {
            source.release();
        }
        match self.writer {
            Some(mut writer) => writer.close().map_err(|e| e.to_string()),
            None => Ok(()),
        }
    }
}

/// Mutex-guarded home of the session's [`Handles`].
///
/// The capture loop holds the lock for one read-and-write iteration at a
/// time. Both release paths (the loop at `Closed`, `stop()` on the caller's
/// thread) move the handles out under the lock and close them after, so
/// whichever runs second finds nothing to release.
#[derive(Default)]
pub(crate) struct HandleSlot {
    handles: Mutex<Handles>,
}

impl HandleSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// A panic on the worker cannot leave the handles half-moved, so a
    /// poisoned lock is still safe to use.
    pub fn lock(&self) -> MutexGuard<'_, Handles> {
        self.handles.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Moves the handles out and releases them, waiting for the lock.
    pub fn release(&self) -> Result<(), String> {
        let handles = self.lock().take();
        release_taken(handles)
    }

    /// Like [`release`](Self::release), but gives up immediately when the
    /// lock is held (the worker is mid-read). Returns `None` in that case.
    pub fn try_release(&self) -> Option<Result<(), String>> {
        let handles = match self.handles.try_lock() {
            Ok(mut guard) => guard.take(),
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner().take(),
            Err(TryLockError::WouldBlock) => return None,
        };
        Some(release_taken(handles))
    }
}

fn release_taken(handles: Handles) -> Result<(), String> {
    if handles.is_empty() {
        return Ok(());
    }
    log::debug!("Releasing capture and writer handles");
    handles.release()
}

/// Releases handles that never made it into a slot.
pub(crate) fn release_unplaced(
    source: Box<dyn FrameSource>,
    writer: Option<Box<dyn VideoWriter>>,
) -> Result<(), String> {
    Handles {
        source: Some(source),
        writer,
    }
    .release()
}
