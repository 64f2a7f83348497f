use std::ffi::CStr;
use std::thread;
use std::time::Duration;

use crate::capture::domain::capture_request::CaptureRequest;
use crate::capture::domain::frame_source::FrameSource;
use crate::shared::constants::FRAME_CHANNELS;
use crate::shared::frame::Frame;
use crate::shared::resolution::Resolution;

const PACKET_RETRY_DELAY: Duration = Duration::from_millis(5);

/// Captures from a camera through libavdevice (ffmpeg-next).
///
/// The backend in the [`CaptureRequest`] picks the input format (v4l2,
/// dshow, avfoundation). Decoded frames are converted to RGB24.
pub struct FfmpegCamera {
    input_ctx: Option<ffmpeg_next::format::context::Input>,
    decoder: Option<ffmpeg_next::decoder::Video>,
    scaler: Option<ffmpeg_next::software::scaling::Context>,
    video_stream_index: usize,
    resolution: Resolution,
    frame_index: usize,
}

// Safety: FfmpegCamera is only used from a single thread at a time.
// The raw pointers inside ffmpeg types are not shared across threads.
unsafe impl Send for FfmpegCamera {}

impl FfmpegCamera {
    pub fn new() -> Self {
        Self {
            input_ctx: None,
            decoder: None,
            scaler: None,
            video_stream_index: 0,
            resolution: Resolution::new(0, 0),
            frame_index: 0,
        }
    }
}

impl Default for FfmpegCamera {
    fn default() -> Self {
        Self::new()
    }
}

/// Names of the video capture devices compiled into the linked ffmpeg.
pub fn list_backends() -> Result<Vec<String>, Box<dyn std::error::Error>> {
    ffmpeg_next::init()?;
    Ok(ffmpeg_next::device::input::video()
        .map(|format| format.name().to_string())
        .collect())
}

/// Names of the video devices `format` can open, in enumeration order.
fn list_video_devices(
    format: &ffmpeg_next::format::Input,
) -> Result<Vec<String>, Box<dyn std::error::Error>> {
    use ffmpeg_next::ffi;

    let mut list: *mut ffi::AVDeviceInfoList = std::ptr::null_mut();
    // Safety: `format` points at a registered input format; `list` is freed
    // below with the matching libavdevice call.
    let ret = unsafe {
        ffi::avdevice_list_input_sources(
            format.as_ptr(),
            std::ptr::null(),
            std::ptr::null_mut(),
            &mut list,
        )
    };
    if ret < 0 {
        return Err(format!(
            "cannot list {} devices: {}",
            format.name(),
            ffmpeg_next::Error::from(ret)
        )
        .into());
    }
    if list.is_null() {
        return Ok(Vec::new());
    }

    let mut names = Vec::new();
    // Safety: libavdevice filled `nb_devices` entries of `devices`.
    unsafe {
        let count = (*list).nb_devices.max(0) as usize;
        for i in 0..count {
            let info = *(*list).devices.add(i);
            if info.is_null() || (*info).device_name.is_null() {
                continue;
            }
            // dshow lists audio inputs too.
            let media_count = (*info).nb_media_types.max(0) as usize;
            if media_count > 0 && !(*info).media_types.is_null() {
                let media = std::slice::from_raw_parts((*info).media_types, media_count);
                if !media.contains(&ffi::AVMediaType::AVMEDIA_TYPE_VIDEO) {
                    continue;
                }
            }
            names.push(CStr::from_ptr((*info).device_name).to_string_lossy().into_owned());
        }
        ffi::avdevice_free_list_devices(&mut list);
    }
    Ok(names)
}

/// Whether a failed packet read is worth retrying. Only EAGAIN is: the
/// device has no packet yet. EOF or any other error ends the capture.
fn is_retryable(error: &ffmpeg_next::Error) -> bool {
    matches!(error, ffmpeg_next::Error::Other { errno } if *errno == libc::EAGAIN)
}

impl FrameSource for FfmpegCamera {
    fn open(&mut self, request: &CaptureRequest) -> Result<Resolution, Box<dyn std::error::Error>> {
        ffmpeg_next::init()?;

        let format_name = request.backend.format_name();
        let input_format = ffmpeg_next::device::input::video()
            .find(|format| format.name() == format_name)
            .ok_or_else(|| format!("capture backend '{}' not available in ffmpeg", request.backend))?;

        let listed = if request.backend.addresses_by_name() && request.device_name.is_none() {
            let listed = list_video_devices(&input_format)?;
            log::debug!("{} video devices: {listed:?}", request.backend);
            listed
        } else {
            Vec::new()
        };
        let url = request.backend.device_url(
            request.device_index,
            request.device_name.as_deref(),
            &listed,
        )?;

        let mut options = ffmpeg_next::Dictionary::new();
        if let Some(size) = request.size {
            options.set("video_size", &size.to_string());
        }

        let ctx = ffmpeg_next::format::open_with(
            &url,
            &ffmpeg_next::format::format::Format::Input(input_format),
            options,
        )
        .map_err(|e| format!("failed to open {url} via {}: {e}", request.backend))?;

        let ictx = match ctx {
            ffmpeg_next::format::context::Context::Input(ictx) => ictx,
            ffmpeg_next::format::context::Context::Output(_) => {
                return Err(format!("{url} opened as an output").into())
            }
        };

        let stream = ictx
            .streams()
            .best(ffmpeg_next::media::Type::Video)
            .ok_or("No video stream found")?;
        let video_stream_index = stream.index();
        let codec_ctx = ffmpeg_next::codec::context::Context::from_parameters(stream.parameters())?;
        let decoder = codec_ctx.decoder().video()?;

        let resolution = Resolution::new(decoder.width(), decoder.height());
        if resolution.width == 0 || resolution.height == 0 {
            return Err(format!("{url} reported an empty frame size").into());
        }

        log::debug!(
            "Opened {url} via {} at {resolution} ({:?})",
            request.backend,
            decoder.format()
        );

        self.video_stream_index = video_stream_index;
        self.resolution = resolution;
        self.frame_index = 0;
        self.scaler = None;
        self.decoder = Some(decoder);
        self.input_ctx = Some(ictx);

        Ok(resolution)
    }

    fn read_frame(&mut self) -> Result<Frame, Box<dyn std::error::Error>> {
        let (Some(ictx), Some(decoder)) = (self.input_ctx.as_mut(), self.decoder.as_mut()) else {
            return Err("FfmpegCamera: not opened".into());
        };

        let mut decoded = ffmpeg_next::util::frame::video::Video::empty();
        loop {
            if decoder.receive_frame(&mut decoded).is_ok() {
                break;
            }

            let mut packet = ffmpeg_next::Packet::empty();
            match packet.read(ictx) {
                Ok(()) => {}
                Err(e) if is_retryable(&e) => {
                    thread::sleep(PACKET_RETRY_DELAY);
                    continue;
                }
                Err(ffmpeg_next::Error::Eof) => return Err("capture stream ended".into()),
                Err(e) => return Err(format!("capture device read failed: {e}").into()),
            }
            if packet.stream() != self.video_stream_index {
                continue;
            }
            if let Err(e) = decoder.send_packet(&packet) {
                log::debug!("Dropping undecodable capture packet: {e}");
            }
        }

        // Pixel format can be unknown until the first decode (e.g. MJPEG).
        if self.scaler.is_none() {
            self.scaler = Some(ffmpeg_next::software::scaling::Context::get(
                decoded.format(),
                decoded.width(),
                decoded.height(),
                ffmpeg_next::format::Pixel::RGB24,
                self.resolution.width,
                self.resolution.height,
                ffmpeg_next::software::scaling::Flags::BILINEAR,
            )?);
        }
        let scaler = self.scaler.as_mut().ok_or("FfmpegCamera: scaler unavailable")?;

        let mut rgb_frame = ffmpeg_next::util::frame::video::Video::empty();
        scaler.run(&decoded, &mut rgb_frame)?;

        let pixels = extract_rgb_pixels(&rgb_frame, self.resolution);
        let frame = Frame::new(
            pixels,
            self.resolution.width,
            self.resolution.height,
            FRAME_CHANNELS,
            self.frame_index,
        );
        self.frame_index += 1;
        Ok(frame)
    }

    fn is_open(&self) -> bool {
        self.input_ctx.is_some()
    }

    fn release(&mut self) {
        self.scaler = None;
        self.decoder = None;
        self.input_ctx = None;
    }
}

/// Copies pixel data from an ffmpeg frame into a contiguous RGB buffer,
/// dropping any per-row stride padding.
fn extract_rgb_pixels(
    rgb_frame: &ffmpeg_next::util::frame::video::Video,
    resolution: Resolution,
) -> Vec<u8> {
    let stride = rgb_frame.stride(0);
    let data = rgb_frame.data(0);
    let row_len = resolution.width as usize * FRAME_CHANNELS as usize;

    let mut pixels = Vec::with_capacity(resolution.frame_len(FRAME_CHANNELS));
    for row in 0..resolution.height as usize {
        let row_start = row * stride;
        pixels.extend_from_slice(&data[row_start..row_start + row_len]);
    }
    pixels
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::domain::capture_backend::CaptureBackend;

    fn request(index: u32) -> CaptureRequest {
        CaptureRequest {
            device_index: index,
            device_name: None,
            backend: CaptureBackend::platform_default(),
            size: None,
        }
    }

    #[test]
    fn test_new_is_not_open() {
        let camera = FfmpegCamera::new();
        assert!(!camera.is_open());
    }

    #[test]
    fn test_open_missing_device_returns_error() {
        let mut camera = FfmpegCamera::new();
        assert!(camera.open(&request(999)).is_err());
        assert!(!camera.is_open());
    }

    #[test]
    fn test_read_without_open_returns_error() {
        let mut camera = FfmpegCamera::new();
        assert!(camera.read_frame().is_err());
    }

    #[test]
    fn test_release_idempotent() {
        let mut camera = FfmpegCamera::new();
        camera.release();
        camera.release();
        assert!(!camera.is_open());
    }

    #[test]
    fn test_only_eagain_reads_are_retried() {
        assert!(is_retryable(&ffmpeg_next::Error::Other {
            errno: libc::EAGAIN
        }));
        assert!(!is_retryable(&ffmpeg_next::Error::Eof));
        assert!(!is_retryable(&ffmpeg_next::Error::Other {
            errno: libc::ENODEV
        }));
        assert!(!is_retryable(&ffmpeg_next::Error::Other { errno: libc::EIO }));
    }

    #[test]
    fn test_extract_rgb_pixels_strips_padding() {
        ffmpeg_next::init().unwrap();
        let resolution = Resolution::new(5, 2);
        let mut rgb = ffmpeg_next::util::frame::video::Video::new(
            ffmpeg_next::format::Pixel::RGB24,
            resolution.width,
            resolution.height,
        );
        let stride = rgb.stride(0);
        let data = rgb.data_mut(0);
        for row in 0..2 {
            for byte in 0..15 {
                data[row * stride + byte] = (row * 100 + byte) as u8;
            }
        }

        let pixels = extract_rgb_pixels(&rgb, resolution);
        assert_eq!(pixels.len(), 30);
        assert_eq!(pixels[0], 0);
        assert_eq!(pixels[14], 14);
        assert_eq!(pixels[15], 100);
        assert_eq!(pixels[29], 114);
    }
}
