pub mod sleep_inhibitor;

#[cfg(target_os = "macos")]
mod macos;
#[cfg(target_os = "windows")]
mod windows;

use sleep_inhibitor::SleepInhibitor;

/// The sleep inhibitor for the current platform.
///
/// Windows and macOS keep the display awake while a recorder exists; other
/// platforms get a no-op.
pub fn default_sleep_inhibitor() -> Box<dyn SleepInhibitor> {
    #[cfg(target_os = "macos")]
    {
        Box::new(macos::CaffeinateInhibitor::new())
    }
    #[cfg(target_os = "windows")]
    {
        Box::new(windows::ExecutionStateInhibitor::new())
    }
    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    {
        Box::new(sleep_inhibitor::NoopSleepInhibitor)
    }
}
