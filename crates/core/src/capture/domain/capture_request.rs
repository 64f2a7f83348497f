use crate::capture::domain::capture_backend::CaptureBackend;
use crate::shared::resolution::Resolution;

/// What the recorder asks a [`FrameSource`](super::frame_source::FrameSource)
/// to open.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CaptureRequest {
    pub device_index: u32,
    /// Required by backends that address devices by name (dshow).
    pub device_name: Option<String>,
    pub backend: CaptureBackend,
    /// `None` keeps the device default.
    pub size: Option<Resolution>,
}

impl CaptureRequest {
    /// How the device appears in logs and errors: its name if given,
    /// otherwise its index.
    pub fn device_label(&self) -> String {
        match &self.device_name {
            Some(name) => name.clone(),
            None => self.device_index.to_string(),
        }
    }
}
