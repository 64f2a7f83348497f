pub mod ffmpeg_writer;
