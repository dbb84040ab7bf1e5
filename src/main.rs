use anyhow::Result;
use clap::{Parser, Subcommand};
use scribestream::{
    CaptureConfig, Config, FileCapture, HttpTranscriber, PipelineError, RecordingSession,
    SessionConfig, SessionObserver,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Parser)]
#[command(
    name = "scribestream",
    about = "Chunked streaming transcription against a hosted speech-to-text service"
)]
struct Cli {
    /// Path to the configuration file (extension omitted)
    #[arg(short, long, default_value = "config/scribestream")]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a chunked transcription session over a pre-recorded WAV file
    Transcribe {
        /// WAV file to transcribe
        file: PathBuf,

        /// Slice duration in milliseconds
        #[arg(long)]
        slice_ms: Option<u64>,
    },

    /// Record from the microphone until Ctrl-C, printing the live transcript
    #[cfg(feature = "mic")]
    Record {
        /// Slice duration in milliseconds
        #[arg(long)]
        slice_ms: Option<u64>,

        /// Input device name (default: system default)
        #[arg(long)]
        device: Option<String>,
    },

    /// List available audio input devices
    #[cfg(feature = "mic")]
    Devices,
}

/// Prints pipeline events; the CLI stand-in for a UI layer.
struct PrintObserver;

impl SessionObserver for PrintObserver {
    fn on_loading_changed(&self, loading: bool) {
        info!("Transcription in flight: {}", loading);
    }

    fn on_transcript_updated(&self, transcript: &str) {
        info!("Transcript so far: {}", transcript);
    }

    fn on_slice_error(&self, error: &PipelineError) {
        warn!("Slice transcription failed, continuing: {}", error);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let cfg = Config::load(&cli.config)?;
    info!("Loaded config: endpoint {}", cfg.transcription.endpoint);

    match cli.command {
        Command::Transcribe { file, slice_ms } => {
            let transcriber = Arc::new(HttpTranscriber::from_config(&cfg.transcription)?);

            let capture_config = CaptureConfig {
                frame_duration_ms: cfg.audio.frame_duration_ms,
                ..CaptureConfig::default()
            };
            let capture = FileCapture::new(&file, capture_config)?;

            let session_config = SessionConfig {
                slice_duration: Duration::from_millis(
                    slice_ms.unwrap_or(cfg.audio.slice_duration_ms),
                ),
                sample_rate: capture.sample_rate(),
                channels: capture.channels(),
                ..SessionConfig::default()
            };

            let session = RecordingSession::with_observer(
                session_config,
                transcriber,
                Arc::new(PrintObserver),
            )?;

            session.start(Box::new(capture)).await?;
            // File capture drains on stop, so the finalizer sees the whole
            // file.
            let text = session.stop().await?;
            println!("{}", text);
        }

        #[cfg(feature = "mic")]
        Command::Record { slice_ms, device } => {
            use scribestream::MicCapture;

            let transcriber = Arc::new(HttpTranscriber::from_config(&cfg.transcription)?);

            let capture_config = CaptureConfig {
                target_sample_rate: cfg.audio.sample_rate,
                target_channels: cfg.audio.channels,
                frame_duration_ms: cfg.audio.frame_duration_ms,
            };
            let capture = MicCapture::new(device.as_deref(), capture_config)?;

            let session_config = SessionConfig {
                slice_duration: Duration::from_millis(
                    slice_ms.unwrap_or(cfg.audio.slice_duration_ms),
                ),
                sample_rate: cfg.audio.sample_rate,
                channels: cfg.audio.channels,
                ..SessionConfig::default()
            };

            let session = RecordingSession::with_observer(
                session_config,
                transcriber,
                Arc::new(PrintObserver),
            )?;

            session.start(Box::new(capture)).await?;
            info!("Recording; press Ctrl-C to stop and finalize");

            tokio::signal::ctrl_c().await?;

            let text = session.stop().await?;
            let stats = session.stats().await;
            info!(
                "Recorded {:.1}s, {} slices",
                stats.duration_secs, stats.slices_emitted
            );
            println!("{}", text);
        }

        #[cfg(feature = "mic")]
        Command::Devices => {
            use scribestream::MicCapture;

            for name in MicCapture::list_devices()? {
                println!("{}", name);
            }
        }
    }

    Ok(())
}
