use std::process::{Child, Command, Stdio};

use super::sleep_inhibitor::SleepInhibitor;

/// Runs `caffeinate -di -w <pid>`, which also exits on its own if this
/// process dies without releasing.
pub struct CaffeinateInhibitor {
    child: Option<Child>,
}

impl CaffeinateInhibitor {
    pub fn new() -> Self {
        Self { child: None }
    }
}

impl SleepInhibitor for CaffeinateInhibitor {
    fn acquire(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        if self.child.is_some() {
            return Ok(());
        }
        let child = Command::new("caffeinate")
            .args(["-di", "-w", &std::process::id().to_string()])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;
        self.child = Some(child);
        Ok(())
    }

    fn release(&mut self) {
        if let Some(mut child) = self.child.take() {
            if let Err(e) = child.kill() {
                log::warn!("Failed to stop caffeinate: {e}");
            }
            let _ = child.wait();
        }
    }
}
