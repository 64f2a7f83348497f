pub mod capture_backend;
pub mod capture_request;
pub mod frame_source;
