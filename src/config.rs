use crate::error::{PipelineError, Result};
use serde::Deserialize;

/// Environment variable consulted when the config file carries no API token.
pub const API_TOKEN_ENV: &str = "SCRIBESTREAM_API_TOKEN";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub transcription: TranscriptionConfig,
    #[serde(default)]
    pub audio: AudioConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TranscriptionConfig {
    /// Base URL of the inference service, e.g. "https://data.example.org/v1"
    pub endpoint: String,

    /// Speech-to-text model name
    #[serde(default = "default_model")]
    pub model: String,

    /// Bearer token; falls back to SCRIBESTREAM_API_TOKEN if absent
    #[serde(default)]
    pub api_token: Option<String>,

    /// Bounded wait for each transcription request, in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AudioConfig {
    /// Capture sample rate (Whisper-style endpoints expect 16kHz)
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,

    /// Number of channels (1 = mono)
    #[serde(default = "default_channels")]
    pub channels: u16,

    /// Duration of each capture frame in milliseconds
    #[serde(default = "default_frame_duration_ms")]
    pub frame_duration_ms: u64,

    /// Default duration of each transcription slice in milliseconds
    #[serde(default = "default_slice_duration_ms")]
    pub slice_duration_ms: u64,
}

fn default_model() -> String {
    "whisper-base".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_sample_rate() -> u32 {
    16000
}

fn default_channels() -> u16 {
    1
}

fn default_frame_duration_ms() -> u64 {
    100
}

fn default_slice_duration_ms() -> u64 {
    5000
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: default_sample_rate(),
            channels: default_channels(),
            frame_duration_ms: default_frame_duration_ms(),
            slice_duration_ms: default_slice_duration_ms(),
        }
    }
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .build()
            .map_err(|e| PipelineError::InvalidConfiguration {
                message: format!("failed to load config from {}: {}", path, e),
            })?;

        settings
            .try_deserialize()
            .map_err(|e| PipelineError::InvalidConfiguration {
                message: format!("failed to parse config: {}", e),
            })
    }
}

impl TranscriptionConfig {
    /// Resolve the API token from the config file or the environment.
    ///
    /// A missing token is a configuration error, rejected before any network
    /// access is attempted.
    pub fn resolve_token(&self) -> Result<String> {
        if let Some(token) = &self.api_token {
            if !token.trim().is_empty() {
                return Ok(token.clone());
            }
        }

        match std::env::var(API_TOKEN_ENV) {
            Ok(token) if !token.trim().is_empty() => Ok(token),
            _ => Err(PipelineError::InvalidConfiguration {
                message: format!(
                    "no API token provided (set transcription.api_token or {})",
                    API_TOKEN_ENV
                ),
            }),
        }
    }
}
