use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::thread;
use std::time::Duration;

use crate::capture::domain::frame_source::FrameSource;
use crate::capture::infrastructure::ffmpeg_camera::FfmpegCamera;
use crate::platform::default_sleep_inhibitor;
use crate::platform::sleep_inhibitor::SleepInhibitor;
use crate::shared::constants::SHUTDOWN_GRACE_MS;
use crate::shutdown::exit_hooks::{self, ExitHook, ExitHookGuard};
use crate::video::domain::video_writer::VideoWriter;
use crate::video::infrastructure::ffmpeg_writer::FfmpegWriter;

use super::capture_loop::{CaptureSession, SessionShared};
use super::recorder_config::{ConfigError, RecorderConfig};
use super::recorder_state::RecorderState;
use super::recording_logger::{LogRecordingLogger, RecordingLogger};
use super::session_report::{RecordingError, SessionReport};

const CAPTURE_THREAD_NAME: &str = "camrec-capture";

/// Components consumed by the single session a recorder may run.
struct Components {
    source: Box<dyn FrameSource>,
    writer: Box<dyn VideoWriter>,
    logger: Box<dyn RecordingLogger>,
}

/// Records one camera to one file on a background thread.
///
/// A recorder runs at most one session: after it reaches
/// [`RecorderState::Closed`], `start()` is ignored. Dropping the recorder
/// stops it and waits (bounded) for the file to be finalized; a process-exit
/// hook does the same for recorders still alive when `main` returns.
///
/// ```no_run
/// use camrec_core::recording::recorder::Recorder;
/// use camrec_core::recording::recorder_config::RecorderConfig;
///
/// let recorder = Recorder::new(RecorderConfig::new("clip.mp4").with_fps(25.0))?;
/// recorder.start();
/// std::thread::sleep(std::time::Duration::from_secs(5));
/// recorder.stop();
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct Recorder {
    config: RecorderConfig,
    shared: Arc<SessionShared>,
    components: Mutex<Option<Components>>,
    inhibitor: Mutex<Box<dyn SleepInhibitor>>,
    exit_hook: Option<ExitHookGuard>,
}

impl Recorder {
    /// A recorder backed by ffmpeg capture and encoding.
    pub fn new(config: RecorderConfig) -> Result<Self, ConfigError> {
        Self::with_components(
            config,
            Box::new(FfmpegCamera::new()),
            Box::new(FfmpegWriter::new()),
            Box::new(LogRecordingLogger::default()),
            default_sleep_inhibitor(),
        )
    }

    pub fn with_components(
        config: RecorderConfig,
        source: Box<dyn FrameSource>,
        writer: Box<dyn VideoWriter>,
        logger: Box<dyn RecordingLogger>,
        mut inhibitor: Box<dyn SleepInhibitor>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        if let Err(e) = inhibitor.acquire() {
            log::warn!("Could not prevent system sleep: {e}");
        }

        let shared = Arc::new(SessionShared::new());
        let weak: Weak<dyn ExitHook> = Arc::downgrade(&shared) as Weak<dyn ExitHook>;
        let exit_hook = exit_hooks::register(weak);

        Ok(Self {
            config,
            shared,
            components: Mutex::new(Some(Components {
                source,
                writer,
                logger,
            })),
            inhibitor: Mutex::new(inhibitor),
            exit_hook: Some(exit_hook),
        })
    }

    /// Spawns the capture thread and returns without waiting for the camera.
    ///
    /// Returns `false` (and does nothing) if the recorder is running or has
    /// already run.
    pub fn start(&self) -> bool {
        if let Err(state) = self
            .shared
            .state
            .transition(RecorderState::Idle, RecorderState::Opening)
        {
            log::debug!("Ignoring start: recorder is {state}");
            return false;
        }

        let components = self
            .components
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let Some(Components {
            source,
            writer,
            logger,
        }) = components
        else {
            // Unreachable while Idle is only left through this method.
            self.shared.state.close();
            return false;
        };

        let session = CaptureSession {
            shared: self.shared.clone(),
            request: self.config.capture_request(),
            output_path: self.config.output_path.clone(),
            fps: self.config.fps,
            source,
            writer,
            logger,
        };

        // Detached: the handle is dropped, the thread is never joined.
        match thread::Builder::new()
            .name(CAPTURE_THREAD_NAME.to_string())
            .spawn(move || session.run())
        {
            Ok(_) => {
                log::debug!("Capture thread started for {}", self.config.output_path.display());
                true
            }
            Err(e) => {
                log::error!("Failed to spawn capture thread: {e}");
                self.shared.state.close();
                self.shared
                    .report
                    .publish(SessionReport::failed(0, RecordingError::Spawn(e.to_string())));
                false
            }
        }
    }

    /// Ends the session without waiting for the capture thread.
    ///
    /// Returns `false` if the recorder was not running. The handles are
    /// released here unless the capture thread is inside a read, in which
    /// case it releases them itself as it exits.
    pub fn stop(&self) -> bool {
        self.shared.stop()
    }

    pub fn is_running(&self) -> bool {
        self.shared.state.get().is_running()
    }

    pub fn state(&self) -> RecorderState {
        self.shared.state.get()
    }

    pub fn config(&self) -> &RecorderConfig {
        &self.config
    }

    /// Blocks until the session report is published or `timeout` elapses.
    pub fn wait_for_report(&self, timeout: Duration) -> Option<SessionReport> {
        self.shared.report.wait(timeout)
    }

    pub fn last_report(&self) -> Option<SessionReport> {
        self.shared.report.get()
    }

    #[cfg(test)]
    fn fire_exit_hook(&self) {
        if let Some(hook) = &self.exit_hook {
            hook.fire();
        }
    }
}

impl Drop for Recorder {
    fn drop(&mut self) {
        self.shared.on_exit();
        self.inhibitor
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .release();
        self.exit_hook.take();
    }
}

impl SessionShared {
    fn stop(&self) -> bool {
        let Some(previous) = self.state.close_if_running() else {
            log::debug!("Ignoring stop: recorder is {}", self.state.get());
            return false;
        };
        log::debug!("Stopping recorder (was {previous})");

        match self.handles.try_release() {
            Some(Ok(())) => {}
            Some(Err(e)) => log::warn!("Failed to finalize recording: {e}"),
            None => log::debug!("Capture thread is mid-read; it will release the handles"),
        }
        true
    }
}

impl ExitHook for SessionShared {
    /// Stops, then gives the capture thread a bounded time to finish the file.
    fn on_exit(&self) {
        self.stop();
        if self.state.get() == RecorderState::Idle {
            return;
        }
        if self
            .report
            .wait(Duration::from_millis(SHUTDOWN_GRACE_MS))
            .is_none()
        {
            log::warn!("Capture thread did not finish within {SHUTDOWN_GRACE_MS}ms");
        }
    }
}
