use std::thread::{self, JoinHandle};

use crossbeam_channel::Sender;
use windows::Win32::System::Power::{
    SetThreadExecutionState, ES_CONTINUOUS, ES_DISPLAY_REQUIRED,
};

use super::sleep_inhibitor::SleepInhibitor;

/// Holds `ES_DISPLAY_REQUIRED` on a dedicated thread.
///
/// The execution state belongs to the thread that set it, so one keeper
/// thread sets and clears it. `acquire` and `release` may then come from
/// any thread (the recorder's owner, its drop, or the exit hook).
pub struct ExecutionStateInhibitor {
    keeper: Option<(Sender<()>, JoinHandle<()>)>,
}

impl ExecutionStateInhibitor {
    pub fn new() -> Self {
        Self { keeper: None }
    }
}

impl SleepInhibitor for ExecutionStateInhibitor {
    fn acquire(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        if self.keeper.is_some() {
            return Ok(());
        }
        let (ready_tx, ready_rx) = crossbeam_channel::bounded::<bool>(1);
        let (release_tx, release_rx) = crossbeam_channel::bounded::<()>(0);

        let handle = thread::Builder::new()
            .name("camrec-awake".into())
            .spawn(move || {
                // Safety: plain Win32 call with valid flags.
                let previous =
                    unsafe { SetThreadExecutionState(ES_CONTINUOUS | ES_DISPLAY_REQUIRED) };
                let acquired = previous.0 != 0;
                let _ = ready_tx.send(acquired);
                if !acquired {
                    return;
                }
                // Parked until release() drops the sender.
                let _ = release_rx.recv();
                unsafe { SetThreadExecutionState(ES_CONTINUOUS) };
            })?;

        match ready_rx.recv() {
            Ok(true) => {
                self.keeper = Some((release_tx, handle));
                Ok(())
            }
            _ => {
                let _ = handle.join();
                Err("SetThreadExecutionState failed".into())
            }
        }
    }

    fn release(&mut self) {
        if let Some((release_tx, handle)) = self.keeper.take() {
            drop(release_tx);
            if handle.join().is_err() {
                log::warn!("Execution state keeper thread panicked");
            }
        }
    }
}

impl Drop for ExecutionStateInhibitor {
    fn drop(&mut self) {
        self.release();
    }
}
