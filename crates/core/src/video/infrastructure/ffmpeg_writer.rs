use std::path::{Path, PathBuf};

use crate::shared::constants::{fourcc, FRAME_CHANNELS};
use crate::shared::frame::Frame;
use crate::shared::resolution::Resolution;
use crate::shared::video_metadata::VideoMetadata;
use crate::video::domain::video_writer::VideoWriter;

/// Containers that carry the four-character code in the stream header.
const FOURCC_CONTAINERS: &[&str] = &["mp4", "m4v", "mov"];

/// Encodes RGB frames as MPEG-4 Part 2 via ffmpeg-next.
///
/// The container comes from the output extension. In MP4/MOV outputs the
/// stream is tagged with the metadata's four-character code.
pub struct FfmpegWriter {
    output_path: Option<PathBuf>,
    octx: Option<ffmpeg_next::format::context::Output>,
    encoder: Option<ffmpeg_next::codec::encoder::video::Encoder>,
    scaler: Option<ffmpeg_next::software::scaling::Context>,
    resolution: Resolution,
    time_base: ffmpeg_next::Rational,
    frame_count: usize,
    video_stream_index: usize,
}

// Safety: FfmpegWriter is only used from a single thread at a time.
// The raw pointers inside ffmpeg types are not shared across threads.
unsafe impl Send for FfmpegWriter {}

impl FfmpegWriter {
    pub fn new() -> Self {
        Self {
            output_path: None,
            octx: None,
            encoder: None,
            scaler: None,
            resolution: Resolution::new(0, 0),
            time_base: ffmpeg_next::Rational(1, 30),
            frame_count: 0,
            video_stream_index: 0,
        }
    }

    pub fn frame_count(&self) -> usize {
        self.frame_count
    }

    /// Flushes the encoder and writes the container trailer.
    fn finish_stream(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        self.encoder
            .as_mut()
            .ok_or("FfmpegWriter: not opened")?
            .send_eof()?;
        self.drain_packets()?;
        self.octx
            .as_mut()
            .ok_or("FfmpegWriter: not opened")?
            .write_trailer()?;
        Ok(())
    }

    fn drain_packets(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        let (Some(encoder), Some(octx)) = (self.encoder.as_mut(), self.octx.as_mut()) else {
            return Err("FfmpegWriter: not opened".into());
        };
        let ost_time_base = octx
            .stream(self.video_stream_index)
            .ok_or("FfmpegWriter: output stream missing")?
            .time_base();

        let mut encoded = ffmpeg_next::Packet::empty();
        while encoder.receive_packet(&mut encoded).is_ok() {
            encoded.set_stream(self.video_stream_index);
            encoded.rescale_ts(self.time_base, ost_time_base);
            encoded.write_interleaved(octx)?;
        }
        Ok(())
    }
}

impl Default for FfmpegWriter {
    fn default() -> Self {
        Self::new()
    }
}

/// Declared frame rate as a rational with millisecond-of-a-frame precision,
/// so 29.97 stays 2997/100 instead of being rounded to 30. Positive rates
/// below that precision clamp to 1/1000.
fn frame_rate(fps: f64) -> ffmpeg_next::Rational {
    if !(fps.is_finite() && fps > 0.0) {
        return ffmpeg_next::Rational(30, 1);
    }
    let millis = ((fps * 1000.0).round() as i32).max(1);
    ffmpeg_next::Rational(millis, 1000).reduce()
}

fn carries_fourcc(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| FOURCC_CONTAINERS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

impl VideoWriter for FfmpegWriter {
    fn open(
        &mut self,
        path: &Path,
        metadata: &VideoMetadata,
    ) -> Result<(), Box<dyn std::error::Error>> {
        ffmpeg_next::init()?;

        if metadata.width == 0 || metadata.height == 0 {
            return Err(format!(
                "cannot encode {}x{} frames",
                metadata.width, metadata.height
            )
            .into());
        }
        let codec_tag = fourcc(&metadata.fourcc)
            .ok_or_else(|| format!("invalid four-character code '{}'", metadata.fourcc))?;

        let mut octx = ffmpeg_next::format::output(path)?;

        let global_header = octx
            .format()
            .flags()
            .contains(ffmpeg_next::format::Flags::GLOBAL_HEADER);

        let codec = ffmpeg_next::encoder::find(ffmpeg_next::codec::Id::MPEG4)
            .ok_or("MPEG4 encoder not found")?;

        let mut ost = octx.add_stream(Some(codec))?;

        let mut encoder_ctx = ffmpeg_next::codec::context::Context::new_with_codec(codec)
            .encoder()
            .video()?;

        let rate = frame_rate(metadata.fps);
        let time_base = rate.invert();

        encoder_ctx.set_width(metadata.width);
        encoder_ctx.set_height(metadata.height);
        encoder_ctx.set_format(ffmpeg_next::format::Pixel::YUV420P);
        encoder_ctx.set_time_base(time_base);
        encoder_ctx.set_frame_rate(Some(rate));

        if global_header {
            encoder_ctx.set_flags(ffmpeg_next::codec::Flags::GLOBAL_HEADER);
        }

        let encoder = encoder_ctx.open_with(ffmpeg_next::Dictionary::new())?;
        ost.set_parameters(&encoder);
        ost.set_time_base(time_base);
        if carries_fourcc(path) {
            unsafe {
                (*ost.parameters().as_mut_ptr()).codec_tag = codec_tag;
            }
        }

        self.video_stream_index = 0; // first stream

        octx.write_header()?;

        let scaler = ffmpeg_next::software::scaling::Context::get(
            ffmpeg_next::format::Pixel::RGB24,
            metadata.width,
            metadata.height,
            ffmpeg_next::format::Pixel::YUV420P,
            metadata.width,
            metadata.height,
            ffmpeg_next::software::scaling::Flags::BILINEAR,
        )?;

        self.output_path = Some(path.to_path_buf());
        self.resolution = metadata.resolution();
        self.time_base = time_base;
        self.octx = Some(octx);
        self.encoder = Some(encoder);
        self.scaler = Some(scaler);
        self.frame_count = 0;

        Ok(())
    }

    fn write(&mut self, frame: &Frame) -> Result<(), Box<dyn std::error::Error>> {
        let (Some(encoder), Some(scaler)) = (self.encoder.as_mut(), self.scaler.as_mut()) else {
            return Err("FfmpegWriter: not opened".into());
        };
        if frame.resolution() != self.resolution || frame.channels() != FRAME_CHANNELS {
            return Err(format!(
                "frame {} is {} with {} channels, writer expects {} RGB",
                frame.index(),
                frame.resolution(),
                frame.channels(),
                self.resolution
            )
            .into());
        }

        let mut rgb_frame = ffmpeg_next::util::frame::video::Video::new(
            ffmpeg_next::format::Pixel::RGB24,
            self.resolution.width,
            self.resolution.height,
        );

        let stride = rgb_frame.stride(0);
        let data = rgb_frame.data_mut(0);
        let src = frame.data();
        let row_len = self.resolution.width as usize * FRAME_CHANNELS as usize;

        // Copy pixel data, respecting stride
        for row in 0..self.resolution.height as usize {
            let src_start = row * row_len;
            let dst_start = row * stride;
            data[dst_start..dst_start + row_len]
                .copy_from_slice(&src[src_start..src_start + row_len]);
        }

        let mut yuv_frame = ffmpeg_next::util::frame::video::Video::empty();
        scaler.run(&rgb_frame, &mut yuv_frame)?;
        yuv_frame.set_pts(Some(self.frame_count as i64));

        encoder.send_frame(&yuv_frame)?;
        self.drain_packets()?;

        self.frame_count += 1;
        Ok(())
    }

    fn close(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        if self.encoder.is_none() {
            return Ok(());
        }

        let result = self.finish_stream();

        if let Some(path) = self.output_path.take() {
            log::debug!("Closed {} after {} frames", path.display(), self.frame_count);
        }
        self.octx = None;
        self.encoder = None;
        self.scaler = None;

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn metadata(w: u32, h: u32, fps: f64) -> VideoMetadata {
        VideoMetadata::new(Resolution::new(w, h), fps, "mp4v")
    }

    fn solid_frame(index: usize, w: u32, h: u32, value: u8) -> Frame {
        Frame::solid(Resolution::new(w, h), 3, value, index)
    }

    fn write_clip(path: &Path, meta: &VideoMetadata, frames: usize) {
        let mut writer = FfmpegWriter::new();
        writer.open(path, meta).unwrap();
        for i in 0..frames {
            writer
                .write(&solid_frame(i, meta.width, meta.height, 128))
                .unwrap();
        }
        writer.close().unwrap();
    }

    fn open_video_stream(path: &Path) -> ffmpeg_next::format::context::Input {
        ffmpeg_next::init().unwrap();
        ffmpeg_next::format::input(&path).unwrap()
    }

    #[test]
    fn test_write_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.mp4");

        write_clip(&path, &metadata(160, 120, 30.0), 3);

        assert!(path.exists());
        assert!(std::fs::metadata(&path).unwrap().len() > 0);
    }

    #[test]
    fn test_written_video_has_correct_resolution() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.mp4");

        write_clip(&path, &metadata(160, 120, 30.0), 1);

        let ictx = open_video_stream(&path);
        let stream = ictx
            .streams()
            .best(ffmpeg_next::media::Type::Video)
            .unwrap();
        let codec_ctx =
            ffmpeg_next::codec::context::Context::from_parameters(stream.parameters()).unwrap();
        let decoder = codec_ctx.decoder().video().unwrap();
        assert_eq!(decoder.width(), 160);
        assert_eq!(decoder.height(), 120);
    }

    #[test]
    fn test_written_video_is_tagged_mp4v() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.mp4");

        write_clip(&path, &metadata(160, 120, 30.0), 2);

        let ictx = open_video_stream(&path);
        let stream = ictx
            .streams()
            .best(ffmpeg_next::media::Type::Video)
            .unwrap();
        let tag = unsafe { (*stream.parameters().as_ptr()).codec_tag };
        assert_eq!(tag.to_le_bytes(), *b"mp4v");
    }

    #[test]
    fn test_written_video_declares_frame_rate() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.mp4");

        write_clip(&path, &metadata(160, 120, 25.0), 5);

        let ictx = open_video_stream(&path);
        let stream = ictx
            .streams()
            .best(ffmpeg_next::media::Type::Video)
            .unwrap();
        let rate = stream.avg_frame_rate();
        assert_relative_eq!(f64::from(rate), 25.0, epsilon = 0.5);
    }

    #[test]
    fn test_write_without_open_returns_error() {
        let mut writer = FfmpegWriter::new();
        let result = writer.write(&solid_frame(0, 160, 120, 128));
        assert!(result.is_err());
    }

    #[test]
    fn test_write_rejects_mismatched_frame_size() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.mp4");

        let mut writer = FfmpegWriter::new();
        writer.open(&path, &metadata(160, 120, 30.0)).unwrap();
        assert!(writer.write(&solid_frame(0, 80, 60, 128)).is_err());
        writer.write(&solid_frame(1, 160, 120, 128)).unwrap();
        assert_eq!(writer.frame_count(), 1);
        writer.close().unwrap();
    }

    #[test]
    fn test_open_rejects_empty_size() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.mp4");

        let mut writer = FfmpegWriter::new();
        assert!(writer.open(&path, &metadata(0, 120, 30.0)).is_err());
    }

    #[test]
    fn test_close_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.mp4");

        let mut writer = FfmpegWriter::new();
        writer.open(&path, &metadata(160, 120, 30.0)).unwrap();
        writer.write(&solid_frame(0, 160, 120, 128)).unwrap();
        writer.close().unwrap();
        assert!(writer.close().is_ok());
    }

    #[test]
    fn test_close_without_open_is_noop() {
        let mut writer = FfmpegWriter::new();
        assert!(writer.close().is_ok());
    }

    #[test]
    fn test_frame_rate_keeps_fractional_rates() {
        assert_eq!(frame_rate(30.0), ffmpeg_next::Rational(30, 1));
        assert_eq!(frame_rate(29.97), ffmpeg_next::Rational(2997, 100));
        assert_eq!(frame_rate(0.0), ffmpeg_next::Rational(30, 1));
    }

    #[test]
    fn test_frame_rate_clamps_tiny_rates() {
        assert_eq!(frame_rate(0.0004), ffmpeg_next::Rational(1, 1000));
        assert_eq!(frame_rate(1e-9), ffmpeg_next::Rational(1, 1000));
        assert_eq!(frame_rate(0.5), ffmpeg_next::Rational(1, 2));
    }

    #[test]
    fn test_carries_fourcc() {
        assert!(carries_fourcc(Path::new("a.mp4")));
        assert!(carries_fourcc(Path::new("a.MOV")));
        assert!(!carries_fourcc(Path::new("a.avi")));
        assert!(!carries_fourcc(Path::new("a")));
    }
}
