pub const DEFAULT_DEVICE_INDEX: u32 = 0;
pub const DEFAULT_OUTPUT_PATH: &str = "output.mp4";
pub const DEFAULT_FPS: f64 = 30.0;

/// Four-character code tagged on every encoded output stream.
pub const OUTPUT_FOURCC: &str = "mp4v";

/// RGB24: every frame crossing a domain boundary uses this layout.
pub const FRAME_CHANNELS: u8 = 3;

/// How long exit hooks and drops wait for a worker to finalize its file.
pub const SHUTDOWN_GRACE_MS: u64 = 2000;

/// Frames between progress log lines.
pub const PROGRESS_LOG_INTERVAL: usize = 300;

/// Packs a four-character code the way container formats store it
/// (first character in the lowest byte).
pub fn fourcc(code: &str) -> Option<u32> {
    let bytes = code.as_bytes();
    if bytes.len() != 4 {
        return None;
    }
    Some(
        bytes
            .iter()
            .rev()
            .fold(0u32, |acc, &b| (acc << 8) | u32::from(b)),
    )
}
