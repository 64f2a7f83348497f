//! Background camera capture to a video file.
//!
//! A [`recording::recorder::Recorder`] owns one worker thread that opens a
//! capture device, reads frames and appends them to an encoded output file
//! until it is stopped or the device fails.

pub mod capture;
pub mod platform;
pub mod recording;
pub mod shared;
pub mod shutdown;
pub mod video;
