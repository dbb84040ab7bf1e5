//! Error types for scribestream.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    // Configuration errors: rejected before any device or network access
    #[error("Invalid configuration: {message}")]
    InvalidConfiguration { message: String },

    // Capture errors
    #[error("Audio device unavailable: {message}")]
    DeviceUnavailable { message: String },

    #[error("Audio encoding failed: {message}")]
    AudioEncoding { message: String },

    // Session state-machine misuse
    #[error("A recording session is already active")]
    AlreadyRecording,

    #[error("No recording session is active")]
    NotRecording,

    // Transcription errors
    #[error("Transcription request failed: {message}")]
    TranscriptionRequest {
        /// HTTP status code, if the endpoint responded at all
        status: Option<u16>,
        /// Whether the bounded wait elapsed before a response arrived
        timed_out: bool,
        message: String,
    },

    #[error("Transcription response malformed: {message}")]
    TranscriptionResponse { message: String },

    // General I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

// Type alias for convenience
pub type Result<T> = std::result::Result<T, PipelineError>;
