pub mod constants;
pub mod frame;
pub mod resolution;
pub mod video_metadata;
