use crate::capture::domain::capture_request::CaptureRequest;
use crate::shared::frame::Frame;
use crate::shared::resolution::Resolution;

/// A camera (or anything camera-shaped) that yields frames on demand.
///
/// The recorder opens it on its worker thread, reads until told to stop or
/// until a read fails, then releases it exactly once.
pub trait FrameSource: Send {
    /// Opens the device and returns the resolution it actually negotiated,
    /// which may differ from `request.size`.
    fn open(&mut self, request: &CaptureRequest) -> Result<Resolution, Box<dyn std::error::Error>>;

    /// Blocks until the next frame is available. Any error ends the session:
    /// end of stream, disconnect and driver errors are not distinguished.
    fn read_frame(&mut self) -> Result<Frame, Box<dyn std::error::Error>>;

    fn is_open(&self) -> bool;

    /// Releases the device. Must be a no-op when not open.
    fn release(&mut self);
}
