use std::path::Path;

use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;

/// Codec-bound sink that appends frames to a video file in arrival order.
///
/// Keeps the recorder independent of a specific encoding library.
pub trait VideoWriter: Send {
    fn open(
        &mut self,
        path: &Path,
        metadata: &VideoMetadata,
    ) -> Result<(), Box<dyn std::error::Error>>;

    fn write(&mut self, frame: &Frame) -> Result<(), Box<dyn std::error::Error>>;

    /// Finalizes the file. Closing a writer that is not open is a no-op.
    fn close(&mut self) -> Result<(), Box<dyn std::error::Error>>;
}
