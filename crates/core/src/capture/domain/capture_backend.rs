use std::fmt;
use std::str::FromStr;

/// Platform capture API used to reach a camera.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CaptureBackend {
    /// Video4Linux2.
    V4l2,
    /// DirectShow. Preferred on Windows because it keeps the camera
    /// indicator handling in the driver's hands.
    DShow,
    /// AVFoundation.
    AvFoundation,
}

impl CaptureBackend {
    pub const ALL: &[CaptureBackend] = &[
        CaptureBackend::V4l2,
        CaptureBackend::DShow,
        CaptureBackend::AvFoundation,
    ];

    /// The backend native to the platform this binary was built for.
    pub fn platform_default() -> Self {
        if cfg!(target_os = "windows") {
            CaptureBackend::DShow
        } else if cfg!(target_os = "macos") {
            CaptureBackend::AvFoundation
        } else {
            CaptureBackend::V4l2
        }
    }

    /// Input format name as registered by libavdevice.
    pub fn format_name(&self) -> &'static str {
        match self {
            CaptureBackend::V4l2 => "video4linux2",
            CaptureBackend::DShow => "dshow",
            CaptureBackend::AvFoundation => "avfoundation",
        }
    }

    /// Whether cameras are addressed by name only, so an index has to be
    /// looked up in the backend's device list.
    pub fn addresses_by_name(&self) -> bool {
        matches!(self, CaptureBackend::DShow)
    }

    /// Builds the device URL for this backend.
    ///
    /// `name` overrides the index on every backend. Without it, DirectShow
    /// takes entry `index` of `listed`, the video devices in enumeration
    /// order; the other backends ignore `listed`.
    pub fn device_url(
        &self,
        index: u32,
        name: Option<&str>,
        listed: &[String],
    ) -> Result<String, String> {
        match self {
            CaptureBackend::V4l2 => Ok(match name {
                Some(path) => path.to_string(),
                None => format!("/dev/video{index}"),
            }),
            CaptureBackend::AvFoundation => Ok(match name {
                Some(device) => format!("{device}:none"),
                None => format!("{index}:none"),
            }),
            CaptureBackend::DShow => {
                let device = match name {
                    Some(device) => device,
                    None => listed.get(index as usize).ok_or_else(|| {
                        format!(
                            "no dshow video device at index {index} ({} found)",
                            listed.len()
                        )
                    })?,
                };
                Ok(format!("video={device}"))
            }
        }
    }
}

impl fmt::Display for CaptureBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptureBackend::V4l2 => write!(f, "v4l2"),
            CaptureBackend::DShow => write!(f, "dshow"),
            CaptureBackend::AvFoundation => write!(f, "avfoundation"),
        }
    }
}

impl FromStr for CaptureBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "v4l2" | "video4linux2" => Ok(CaptureBackend::V4l2),
            "dshow" => Ok(CaptureBackend::DShow),
            "avfoundation" => Ok(CaptureBackend::AvFoundation),
            other => Err(format!(
                "unknown capture backend '{other}', expected one of: v4l2, dshow, avfoundation"
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn cameras(names: &[&str]) -> Vec<String> {
        names.iter().map(|name| name.to_string()).collect()
    }

    #[rstest]
    #[case::v4l2(CaptureBackend::V4l2, 2, None, "/dev/video2")]
    #[case::v4l2_path(CaptureBackend::V4l2, 0, Some("/dev/cam"), "/dev/cam")]
    #[case::avfoundation(CaptureBackend::AvFoundation, 1, None, "1:none")]
    #[case::avfoundation_named(
        CaptureBackend::AvFoundation,
        0,
        Some("FaceTime HD Camera"),
        "FaceTime HD Camera:none"
    )]
    #[case::dshow_named(CaptureBackend::DShow, 0, Some("USB Camera"), "video=USB Camera")]
    #[case::dshow_first(CaptureBackend::DShow, 0, None, "video=Integrated Webcam")]
    #[case::dshow_second(CaptureBackend::DShow, 1, None, "video=OBS Virtual Camera")]
    fn test_device_url(
        #[case] backend: CaptureBackend,
        #[case] index: u32,
        #[case] name: Option<&str>,
        #[case] expected: &str,
    ) {
        let listed = cameras(&["Integrated Webcam", "OBS Virtual Camera"]);
        assert_eq!(backend.device_url(index, name, &listed).unwrap(), expected);
    }

    #[test]
    fn test_dshow_name_overrides_index() {
        let listed = cameras(&["Integrated Webcam"]);
        assert_eq!(
            CaptureBackend::DShow
                .device_url(5, Some("USB Camera"), &listed)
                .unwrap(),
            "video=USB Camera"
        );
    }

    #[test]
    fn test_dshow_index_past_listed_devices_is_rejected() {
        let err = CaptureBackend::DShow
            .device_url(2, None, &cameras(&["Integrated Webcam"]))
            .unwrap_err();
        assert!(err.contains("index 2"));
        assert!(err.contains("1 found"));
        assert!(CaptureBackend::DShow.device_url(0, None, &[]).is_err());
    }

    #[test]
    fn test_only_dshow_addresses_by_name() {
        assert!(CaptureBackend::DShow.addresses_by_name());
        assert!(!CaptureBackend::V4l2.addresses_by_name());
        assert!(!CaptureBackend::AvFoundation.addresses_by_name());
    }

    #[test]
    fn test_display_roundtrips_through_from_str() {
        for backend in CaptureBackend::ALL {
            assert_eq!(backend.to_string().parse::<CaptureBackend>(), Ok(*backend));
        }
    }

    #[test]
    fn test_from_str_accepts_ffmpeg_name_and_case() {
        assert_eq!("VIDEO4LINUX2".parse(), Ok(CaptureBackend::V4l2));
        assert_eq!("DShow".parse(), Ok(CaptureBackend::DShow));
        assert!("gstreamer".parse::<CaptureBackend>().is_err());
    }

    #[test]
    fn test_platform_default_is_listed() {
        assert!(CaptureBackend::ALL.contains(&CaptureBackend::platform_default()));
    }
}
