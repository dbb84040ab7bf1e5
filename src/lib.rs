pub mod audio;
pub mod config;
pub mod error;
pub mod session;
pub mod transcribe;

pub use audio::{
    AudioCapture, AudioFile, AudioFormat, AudioFrame, AudioSlice, CaptureConfig, FileCapture,
    Slicer,
};
pub use config::{Config, TranscriptionConfig};
pub use error::{PipelineError, Result};
pub use session::{
    NoopObserver, RecordingSession, SessionConfig, SessionObserver, SessionStats, Transcript,
};
pub use transcribe::{HttpTranscriber, Transcribe};

#[cfg(feature = "mic")]
pub use audio::MicCapture;
