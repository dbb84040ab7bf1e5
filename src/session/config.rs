use crate::error::{PipelineError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for a recording session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Unique session identifier
    pub session_id: String,

    /// Duration of each transcription slice
    /// Default: 5 seconds
    pub slice_duration: Duration,

    /// Sample rate for audio processing (Whisper-style endpoints expect 16kHz)
    pub sample_rate: u32,

    /// Number of audio channels (1 = mono, 2 = stereo)
    pub channels: u16,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            session_id: format!("session-{}", uuid::Uuid::new_v4()),
            slice_duration: Duration::from_secs(5),
            sample_rate: 16000, // Whisper expects 16kHz
            channels: 1,        // Mono
        }
    }
}

impl SessionConfig {
    /// Reject bad values synchronously, before any device or network access.
    pub fn validate(&self) -> Result<()> {
        if self.slice_duration.is_zero() {
            return Err(PipelineError::InvalidConfiguration {
                message: "slice duration must be positive".to_string(),
            });
        }
        if self.sample_rate == 0 {
            return Err(PipelineError::InvalidConfiguration {
                message: "sample rate must be positive".to_string(),
            });
        }
        if self.channels == 0 {
            return Err(PipelineError::InvalidConfiguration {
                message: "channel count must be positive".to_string(),
            });
        }
        Ok(())
    }
}
