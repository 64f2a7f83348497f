mod settings;

use std::path::PathBuf;
use std::process;
use std::time::{Duration, Instant};

use clap::{Args, Parser, Subcommand};
use crossbeam_channel::RecvTimeoutError;

use camrec_core::capture::domain::capture_backend::CaptureBackend;
use camrec_core::capture::infrastructure::ffmpeg_camera;
use camrec_core::capture::infrastructure::pattern_source::PatternSource;
use camrec_core::platform::default_sleep_inhibitor;
use camrec_core::recording::recorder::Recorder;
use camrec_core::recording::recorder_config::RecorderConfig;
use camrec_core::recording::recording_logger::LogRecordingLogger;
use camrec_core::recording::session_report::SessionEnd;
use camrec_core::shared::constants::SHUTDOWN_GRACE_MS;
use camrec_core::video::infrastructure::ffmpeg_writer::FfmpegWriter;

use settings::Settings;

/// How often the main thread checks for Ctrl-C, the duration limit and the
/// end of the session.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Records a camera to a video file in the background.
#[derive(Parser)]
#[command(name = "camrec", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Record until Ctrl-C, the duration elapses, or the camera fails.
    Record(RecordArgs),
    /// List the capture backends available in the linked ffmpeg.
    Backends,
}

#[derive(Args)]
struct RecordArgs {
    /// Camera index.
    #[arg(long)]
    device: Option<u32>,

    /// Output video file (mp4, m4v, mov, avi, ...).
    #[arg(long, short)]
    output: Option<PathBuf>,

    /// Frame rate declared in the output file.
    #[arg(long)]
    fps: Option<f64>,

    /// Requested frame width (requires --height).
    #[arg(long, requires = "height")]
    width: Option<u32>,

    /// Requested frame height (requires --width).
    #[arg(long, requires = "width")]
    height: Option<u32>,

    /// Capture backend: v4l2, dshow or avfoundation.
    #[arg(long)]
    backend: Option<CaptureBackend>,

    /// Device name; overrides --device. dshow otherwise picks --device from
    /// its enumerated video devices.
    #[arg(long)]
    device_name: Option<String>,

    /// Stop after this many seconds.
    #[arg(long)]
    duration: Option<f64>,

    /// Record a synthetic pattern instead of a camera.
    #[arg(long)]
    test_pattern: bool,
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    match cli.command {
        Command::Record(args) => run_record(&args, &Settings::load()),
        Command::Backends => run_backends(),
    }
}

fn run_backends() -> Result<(), Box<dyn std::error::Error>> {
    let available = ffmpeg_camera::list_backends()?;
    for backend in CaptureBackend::ALL {
        let status = if available.iter().any(|name| name == backend.format_name()) {
            "available"
        } else {
            "missing"
        };
        let default = if *backend == CaptureBackend::platform_default() {
            " (default)"
        } else {
            ""
        };
        let name = backend.to_string();
        println!("{name:14}{status}{default}");
    }
    Ok(())
}

fn run_record(args: &RecordArgs, settings: &Settings) -> Result<(), Box<dyn std::error::Error>> {
    let config = build_config(args, settings)?;
    let time_limit = parse_duration(args.duration)?;
    let output = config.output_path.clone();

    let recorder = if args.test_pattern {
        let source = PatternSource::new().with_interval(Duration::from_secs_f64(1.0 / config.fps));
        Recorder::with_components(
            config,
            Box::new(source),
            Box::new(FfmpegWriter::new()),
            Box::new(LogRecordingLogger::default()),
            default_sleep_inhibitor(),
        )?
    } else {
        Recorder::new(config)?
    };

    let (stop_tx, stop_rx) = crossbeam_channel::bounded::<()>(1);
    ctrlc::set_handler(move || {
        let _ = stop_tx.try_send(());
    })?;

    recorder.start();
    log::info!("Recording to {} (Ctrl-C to stop)", output.display());

    let deadline = time_limit.map(|limit| Instant::now() + limit);
    loop {
        match stop_rx.recv_timeout(POLL_INTERVAL) {
            Ok(()) => {
                log::info!("Interrupted, stopping");
                break;
            }
            Err(RecvTimeoutError::Disconnected) => break,
            Err(RecvTimeoutError::Timeout) => {}
        }
        if !recorder.is_running() {
            break;
        }
        if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            log::info!("Duration reached, stopping");
            break;
        }
    }

    recorder.stop();
    let report = recorder
        .wait_for_report(Duration::from_millis(SHUTDOWN_GRACE_MS))
        .ok_or("capture thread did not finish in time")?;

    match report.end {
        SessionEnd::Stopped => {
            log::info!(
                "Output written to {} ({} frames)",
                output.display(),
                report.frames_written
            );
            Ok(())
        }
        SessionEnd::Failed(e) => Err(e.into()),
    }
}

/// Merges flags over settings-file defaults.
fn build_config(
    args: &RecordArgs,
    settings: &Settings,
) -> Result<RecorderConfig, Box<dyn std::error::Error>> {
    let mut config = RecorderConfig::new(args.output.as_ref().unwrap_or(&settings.output))
        .with_device(args.device.unwrap_or(settings.device))
        .with_fps(args.fps.unwrap_or(settings.fps));

    // Flags replace the settings' size as a pair.
    let (width, height) = if args.width.is_some() || args.height.is_some() {
        (args.width, args.height)
    } else {
        (settings.width, settings.height)
    };
    config.width = width;
    config.height = height;

    let backend = match (args.backend, settings.backend.as_deref()) {
        (Some(backend), _) => Some(backend),
        (None, Some(name)) => Some(
            name.parse::<CaptureBackend>()
                .map_err(|e| format!("settings file: {e}"))?,
        ),
        (None, None) => None,
    };
    config.backend = backend;
    config.device_name = args.device_name.clone().or_else(|| settings.device_name.clone());

    config.validate()?;
    Ok(config)
}

fn parse_duration(seconds: Option<f64>) -> Result<Option<Duration>, Box<dyn std::error::Error>> {
    match seconds {
        None => Ok(None),
        Some(s) if s.is_finite() && s > 0.0 => Ok(Some(Duration::from_secs_f64(s))),
        Some(s) => Err(format!("Duration must be a positive number of seconds, got {s}").into()),
    }
}
