mod capture_loop;
mod handle_slot;
pub mod recorder;
pub mod recorder_config;
pub mod recorder_state;
pub mod recording_logger;
pub mod session_report;
