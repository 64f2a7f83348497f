pub mod ffmpeg_camera;
pub mod pattern_source;
