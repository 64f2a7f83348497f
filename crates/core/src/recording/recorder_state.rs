use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

/// Lifecycle of one recording session.
///
/// `Idle → Opening → Streaming → Closed`, where `Closed` is terminal and can
/// be reached from either running state (stop, failure or end of stream).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum RecorderState {
    Idle = 0,
    Opening = 1,
    Streaming = 2,
    Closed = 3,
}

impl RecorderState {
    pub fn is_running(self) -> bool {
        matches!(self, RecorderState::Opening | RecorderState::Streaming)
    }

    fn from_u8(value: u8) -> Self {
        match value {
            0 => RecorderState::Idle,
            1 => RecorderState::Opening,
            2 => RecorderState::Streaming,
            _ => RecorderState::Closed,
        }
    }
}

impl fmt::Display for RecorderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecorderState::Idle => write!(f, "idle"),
            RecorderState::Opening => write!(f, "opening"),
            RecorderState::Streaming => write!(f, "streaming"),
            RecorderState::Closed => write!(f, "closed"),
        }
    }
}

/// [`RecorderState`] shared between the caller's thread and the worker.
#[derive(Debug)]
pub struct AtomicRecorderState(AtomicU8);

impl AtomicRecorderState {
    pub fn new(state: RecorderState) -> Self {
        Self(AtomicU8::new(state as u8))
    }

    pub fn get(&self) -> RecorderState {
        RecorderState::from_u8(self.0.load(Ordering::SeqCst))
    }

    /// Moves `from → to` only if the current state is `from`. Returns the
    /// state actually observed on failure.
    pub fn transition(&self, from: RecorderState, to: RecorderState) -> Result<(), RecorderState> {
        self.0
            .compare_exchange(from as u8, to as u8, Ordering::SeqCst, Ordering::SeqCst)
            .map(|_| ())
            .map_err(RecorderState::from_u8)
    }

    /// Moves any running state to `Closed`. Returns the state it replaced
    /// when that state was running.
    pub fn close_if_running(&self) -> Option<RecorderState> {
        let mut current = self.get();
        while current.is_running() {
            match self.transition(current, RecorderState::Closed) {
                Ok(()) => return Some(current),
                Err(observed) => current = observed,
            }
        }
        None
    }

    pub fn close(&self) {
        self.0.store(RecorderState::Closed as u8, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_running_states() {
        assert!(!RecorderState::Idle.is_running());
        assert!(RecorderState::Opening.is_running());
        assert!(RecorderState::Streaming.is_running());
        assert!(!RecorderState::Closed.is_running());
    }

    #[test]
    fn test_transition_succeeds_from_expected_state() {
        let state = AtomicRecorderState::new(RecorderState::Idle);
        assert!(state
            .transition(RecorderState::Idle, RecorderState::Opening)
            .is_ok());
        assert_eq!(state.get(), RecorderState::Opening);
    }

    #[test]
    fn test_transition_reports_observed_state() {
        let state = AtomicRecorderState::new(RecorderState::Streaming);
        assert_eq!(
            state.transition(RecorderState::Idle, RecorderState::Opening),
            Err(RecorderState::Streaming)
        );
        assert_eq!(state.get(), RecorderState::Streaming);
    }

    #[test]
    fn test_close_if_running_from_each_state() {
        for (initial, expected) in [
            (RecorderState::Idle, None),
            (RecorderState::Opening, Some(RecorderState::Opening)),
            (RecorderState::Streaming, Some(RecorderState::Streaming)),
            (RecorderState::Closed, None),
        ] {
            let state = AtomicRecorderState::new(initial);
            assert_eq!(state.close_if_running(), expected, "from {initial}");
            if expected.is_some() {
                assert_eq!(state.get(), RecorderState::Closed);
            } else {
                assert_eq!(state.get(), initial);
            }
        }
    }

    #[test]
    fn test_close_if_running_only_once() {
        let state = AtomicRecorderState::new(RecorderState::Streaming);
        assert!(state.close_if_running().is_some());
        assert!(state.close_if_running().is_none());
    }
}
