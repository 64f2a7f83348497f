/// Keeps the machine (and display) from sleeping while a recorder exists.
///
/// Best effort: the recorder logs a failed `acquire` and carries on.
pub trait SleepInhibitor: Send {
    fn acquire(&mut self) -> Result<(), Box<dyn std::error::Error>>;

    /// Must be a no-op when not acquired.
    fn release(&mut self);
}

/// Does nothing. The default where no platform mechanism exists.
pub struct NoopSleepInhibitor;

impl SleepInhibitor for NoopSleepInhibitor {
    fn acquire(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        Ok(())
    }

    fn release(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_noop_inhibitor() {
        let mut inhibitor = NoopSleepInhibitor;
        assert!(inhibitor.acquire().is_ok());
        inhibitor.release();
        inhibitor.release();
    }

    #[test]
    fn test_default_inhibitor_acquire_and_release() {
        let mut inhibitor = crate::platform::default_sleep_inhibitor();
        // May fail on headless machines; must not panic either way.
        let _ = inhibitor.acquire();
        inhibitor.release();
        inhibitor.release();
    }
}
