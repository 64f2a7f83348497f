use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::capture::domain::capture_request::CaptureRequest;
use crate::capture::domain::frame_source::FrameSource;
use crate::shared::constants::OUTPUT_FOURCC;
use crate::shared::video_metadata::VideoMetadata;
use crate::video::domain::video_writer::VideoWriter;

use super::handle_slot::{release_unplaced, HandleSlot};
use super::recorder_state::{AtomicRecorderState, RecorderState};
use super::recording_logger::RecordingLogger;
use super::session_report::{RecordingError, ReportSlot, SessionReport};

/// State shared between a recorder and its capture thread.
pub(crate) struct SessionShared {
    pub state: AtomicRecorderState,
    pub handles: HandleSlot,
    pub report: ReportSlot,
}

impl SessionShared {
    pub fn new() -> Self {
        Self {
            state: AtomicRecorderState::new(RecorderState::Idle),
            handles: HandleSlot::new(),
            report: ReportSlot::new(),
        }
    }
}

/// Everything one capture thread needs. Consumed by [`CaptureSession::run`].
pub(crate) struct CaptureSession {
    pub shared: Arc<SessionShared>,
    pub request: CaptureRequest,
    pub output_path: PathBuf,
    pub fps: f64,
    pub source: Box<dyn FrameSource>,
    pub writer: Box<dyn VideoWriter>,
    pub logger: Box<dyn RecordingLogger>,
}

impl CaptureSession {
    /// Runs OPENING → STREAMING → CLOSED and publishes the session report.
    ///
    /// Expects the shared state to be `Opening` on entry.
    pub fn run(self) {
        let CaptureSession {
            shared,
            request,
            output_path,
            fps,
            source,
            writer,
            mut logger,
        } = self;

        let (frames_written, failure) =
            match open_handles(&shared, &request, &output_path, fps, source, writer) {
                Ok(true) => {
                    logger.info(&format!(
                        "Recording camera {} to {}",
                        request.device_label(),
                        output_path.display()
                    ));
                    stream(&shared, logger.as_mut())
                }
                Ok(false) => (0, None),
                Err(e) => (0, Some(e)),
            };

        // CLOSED
        shared.state.close();
        let finalized = shared.handles.release();

        let report = match (failure, finalized) {
            (Some(e), finalized) => {
                if let Err(close_err) = finalized {
                    log::warn!("Failed to finalize {}: {close_err}", output_path.display());
                }
                SessionReport::failed(frames_written, e)
            }
            (None, Err(close_err)) => {
                SessionReport::failed(frames_written, RecordingError::Finalize(close_err))
            }
            (None, Ok(())) => SessionReport::stopped(frames_written),
        };

        match report.error() {
            Some(e) => log::error!("Recording of camera {} ended: {e}", request.device_label()),
            None => logger.info(&format!(
                "Recording stopped, {frames_written} frames written to {}",
                output_path.display()
            )),
        }
        logger.summary();
        shared.report.publish(report);
    }
}

/// OPENING. Returns `Ok(false)` when `stop()` arrived while the devices were
/// being opened; the fresh handles are released before returning.
fn open_handles(
    shared: &SessionShared,
    request: &CaptureRequest,
    output_path: &Path,
    fps: f64,
    mut source: Box<dyn FrameSource>,
    mut writer: Box<dyn VideoWriter>,
) -> Result<bool, RecordingError> {
    let resolution = match source.open(request) {
        Ok(resolution) => resolution,
        Err(e) => {
            source.release();
            return Err(RecordingError::DeviceOpen {
                device: request.device_label(),
                reason: e.to_string(),
            });
        }
    };
    log::debug!(
        "Camera {} negotiated {resolution} via {}",
        request.device_label(),
        request.backend
    );

    let metadata = VideoMetadata::new(resolution, fps, OUTPUT_FOURCC);
    if let Err(e) = writer.open(output_path, &metadata) {
        if let Err(close_err) = release_unplaced(source, None) {
            log::warn!("Failed to release camera: {close_err}");
        }
        return Err(RecordingError::WriterOpen {
            path: output_path.to_path_buf(),
            reason: e.to_string(),
        });
    }

    let mut handles = shared.handles.lock();
    match shared
        .state
        .transition(RecorderState::Opening, RecorderState::Streaming)
    {
        Ok(()) => {
            handles.source = Some(source);
            handles.writer = Some(writer);
            Ok(true)
        }
        Err(observed) => {
            drop(handles);
            log::debug!("Stopped while opening (state {observed}), releasing fresh handles");
            if let Err(close_err) = release_unplaced(source, Some(writer)) {
                log::warn!("Failed to finalize {}: {close_err}", output_path.display());
            }
            Ok(false)
        }
    }
}

/// STREAMING. Returns the number of frames written and the error that ended
/// the stream, if it did not end by `stop()`.
fn stream(
    shared: &SessionShared,
    logger: &mut dyn RecordingLogger,
) -> (usize, Option<RecordingError>) {
    let mut written = 0;
    loop {
        let mut guard = shared.handles.lock();
        let handles = &mut *guard;

        if shared.state.get() != RecorderState::Streaming {
            return (written, None);
        }
        // stop() took the handles between iterations.
        let (Some(source), Some(writer)) = (handles.source.as_mut(), handles.writer.as_mut())
        else {
            return (written, None);
        };
        if !source.is_open() {
            return (
                written,
                Some(RecordingError::FrameRead("capture device closed".into())),
            );
        }

        let read = source.read_frame();
        // Whatever a read returns after stop() is discarded.
        if shared.state.get() != RecorderState::Streaming {
            return (written, None);
        }
        let frame = match read {
            Ok(frame) => frame,
            Err(e) => return (written, Some(RecordingError::FrameRead(e.to_string()))),
        };
        if let Err(e) = writer.write(&frame) {
            return (written, Some(RecordingError::FrameWrite(e.to_string())));
        }
        written += 1;
        drop(guard);

        logger.frame_written(written);
    }
}
