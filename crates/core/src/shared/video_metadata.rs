use crate::shared::resolution::Resolution;

/// Format of the encoded output stream.
#[derive(Clone, Debug, PartialEq)]
pub struct VideoMetadata {
    pub width: u32,
    pub height: u32,
    /// Declared rate in the container; not a capture throttle.
    pub fps: f64,
    pub fourcc: String,
}

impl VideoMetadata {
    pub fn new(resolution: Resolution, fps: f64, fourcc: &str) -> Self {
        Self {
            width: resolution.width,
            height: resolution.height,
            fps,
            fourcc: fourcc.to_string(),
        }
    }

    pub fn resolution(&self) -> Resolution {
        Resolution::new(self.width, self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_construction_from_resolution() {
        let meta = VideoMetadata::new(Resolution::new(640, 480), 30.0, "mp4v");
        assert_eq!(meta.width, 640);
        assert_eq!(meta.height, 480);
        assert_eq!(meta.fps, 30.0);
        assert_eq!(meta.fourcc, "mp4v");
        assert_eq!(meta.resolution(), Resolution::new(640, 480));
    }
}
