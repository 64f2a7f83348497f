use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::capture::domain::capture_backend::CaptureBackend;
use crate::capture::domain::capture_request::CaptureRequest;
use crate::shared::constants::{DEFAULT_DEVICE_INDEX, DEFAULT_FPS, DEFAULT_OUTPUT_PATH};
use crate::shared::resolution::Resolution;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("frame rate must be a positive number, got {0}")]
    InvalidFps(f64),
    #[error("frame dimensions must be positive, got {width}x{height}")]
    ZeroDimension { width: u32, height: u32 },
    #[error("width and height must be given together")]
    PartialDimensions,
    #[error("output path is empty")]
    EmptyOutputPath,
}

/// Everything a recorder needs to know before it starts. Immutable once the
/// recorder is constructed.
#[derive(Clone, Debug, PartialEq)]
pub struct RecorderConfig {
    pub device_index: u32,
    pub output_path: PathBuf,
    /// Declared in the output file only; capture runs at the device's pace.
    pub fps: f64,
    pub width: Option<u32>,
    pub height: Option<u32>,
    /// `None` picks the platform default.
    pub backend: Option<CaptureBackend>,
    pub device_name: Option<String>,
}

impl RecorderConfig {
    pub fn new(output_path: impl AsRef<Path>) -> Self {
        Self {
            output_path: output_path.as_ref().to_path_buf(),
            ..Self::default()
        }
    }

    pub fn with_device(mut self, index: u32) -> Self {
        self.device_index = index;
        self
    }

    pub fn with_fps(mut self, fps: f64) -> Self {
        self.fps = fps;
        self
    }

    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }

    pub fn with_backend(mut self, backend: CaptureBackend) -> Self {
        self.backend = Some(backend);
        self
    }

    pub fn with_device_name(mut self, name: impl Into<String>) -> Self {
        self.device_name = Some(name.into());
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.fps.is_finite() || self.fps <= 0.0 {
            return Err(ConfigError::InvalidFps(self.fps));
        }
        if self.output_path.as_os_str().is_empty() {
            return Err(ConfigError::EmptyOutputPath);
        }
        match (self.width, self.height) {
            (Some(width), Some(height)) if width == 0 || height == 0 => {
                Err(ConfigError::ZeroDimension { width, height })
            }
            (Some(_), None) | (None, Some(_)) => Err(ConfigError::PartialDimensions),
            _ => Ok(()),
        }
    }

    /// Requested frame size, if both dimensions were given.
    pub fn requested_size(&self) -> Option<Resolution> {
        match (self.width, self.height) {
            (Some(width), Some(height)) => Some(Resolution::new(width, height)),
            _ => None,
        }
    }

    pub fn backend(&self) -> CaptureBackend {
        self.backend.unwrap_or_else(CaptureBackend::platform_default)
    }

    pub fn capture_request(&self) -> CaptureRequest {
        CaptureRequest {
            device_index: self.device_index,
            device_name: self.device_name.clone(),
            backend: self.backend(),
            size: self.requested_size(),
        }
    }
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            device_index: DEFAULT_DEVICE_INDEX,
            output_path: PathBuf::from(DEFAULT_OUTPUT_PATH),
            fps: DEFAULT_FPS,
            width: None,
            height: None,
            backend: None,
            device_name: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;

    #[test]
    fn test_defaults() {
        let config = RecorderConfig::default();
        assert_eq!(config.device_index, 0);
        assert_eq!(config.output_path, PathBuf::from("output.mp4"));
        assert_relative_eq!(config.fps, 30.0);
        assert!(config.requested_size().is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_sets_fields() {
        let config = RecorderConfig::new("clip.mp4")
            .with_device(2)
            .with_fps(24.0)
            .with_size(1280, 720)
            .with_backend(CaptureBackend::V4l2)
            .with_device_name("/dev/video2");

        assert_eq!(config.device_index, 2);
        assert_eq!(config.output_path, PathBuf::from("clip.mp4"));
        assert_relative_eq!(config.fps, 24.0);
        assert_eq!(config.requested_size(), Some(Resolution::new(1280, 720)));
        assert_eq!(config.backend(), CaptureBackend::V4l2);
        assert!(config.validate().is_ok());
    }

    #[rstest]
    #[case::zero(0.0)]
    #[case::negative(-5.0)]
    #[case::nan(f64::NAN)]
    #[case::infinite(f64::INFINITY)]
    fn test_invalid_fps_rejected(#[case] fps: f64) {
        let config = RecorderConfig::default().with_fps(fps);
        assert!(matches!(config.validate(), Err(ConfigError::InvalidFps(_))));
    }

    #[rstest]
    #[case::zero_width(0, 480)]
    #[case::zero_height(640, 0)]
    fn test_zero_dimension_rejected(#[case] width: u32, #[case] height: u32) {
        let config = RecorderConfig::default().with_size(width, height);
        assert_eq!(
            config.validate(),
            Err(ConfigError::ZeroDimension { width, height })
        );
    }

    #[test]
    fn test_partial_dimensions_rejected() {
        let config = RecorderConfig {
            width: Some(640),
            ..RecorderConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::PartialDimensions));
    }

    #[test]
    fn test_empty_output_path_rejected() {
        let config = RecorderConfig::new("");
        assert_eq!(config.validate(), Err(ConfigError::EmptyOutputPath));
    }

    #[test]
    fn test_capture_request_carries_device_and_size() {
        let config = RecorderConfig::new("out.mp4")
            .with_device(1)
            .with_size(320, 240)
            .with_backend(CaptureBackend::AvFoundation);
        let request = config.capture_request();
        assert_eq!(request.device_index, 1);
        assert_eq!(request.size, Some(Resolution::new(320, 240)));
        assert_eq!(request.backend, CaptureBackend::AvFoundation);
        assert!(request.device_name.is_none());
    }

    #[test]
    fn test_backend_defaults_to_platform() {
        assert_eq!(
            RecorderConfig::default().backend(),
            CaptureBackend::platform_default()
        );
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(
            ConfigError::InvalidFps(-1.0).to_string(),
            "frame rate must be a positive number, got -1"
        );
        assert_eq!(
            ConfigError::PartialDimensions.to_string(),
            "width and height must be given together"
        );
    }
}
