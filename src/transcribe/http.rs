use super::Transcribe;
use crate::audio::AudioFormat;
use crate::config::TranscriptionConfig;
use crate::error::{PipelineError, Result};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

/// Transcription client for hosted speech-to-text endpoints.
///
/// Posts a multipart form with `model` and `file` fields to
/// `<endpoint>/audio/transcriptions`, authenticated with a bearer token, and
/// extracts the `text` field of the JSON response. Each request has a bounded
/// wait; the client performs no retries.
pub struct HttpTranscriber {
    client: reqwest::Client,
    url: String,
    model: String,
}

#[derive(Debug, Deserialize)]
struct TranscriptionResponse {
    text: String,
}

impl HttpTranscriber {
    pub fn new(endpoint: &str, model: &str, api_token: &str, timeout: Duration) -> Result<Self> {
        if endpoint.trim().is_empty() {
            return Err(PipelineError::InvalidConfiguration {
                message: "transcription endpoint must not be empty".to_string(),
            });
        }
        if model.trim().is_empty() {
            return Err(PipelineError::InvalidConfiguration {
                message: "transcription model must not be empty".to_string(),
            });
        }
        if api_token.trim().is_empty() {
            return Err(PipelineError::InvalidConfiguration {
                message: "API token must not be empty".to_string(),
            });
        }

        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", api_token)).map_err(|e| {
                PipelineError::InvalidConfiguration {
                    message: format!("API token is not a valid header value: {}", e),
                }
            })?,
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .connect_timeout(Duration::from_secs(10))
            .timeout(timeout)
            .build()
            .map_err(|e| PipelineError::InvalidConfiguration {
                message: format!("failed to build HTTP client: {}", e),
            })?;

        let url = format!("{}/audio/transcriptions", endpoint.trim_end_matches('/'));

        Ok(Self {
            client,
            url,
            model: model.to_string(),
        })
    }

    pub fn from_config(config: &TranscriptionConfig) -> Result<Self> {
        let token = config.resolve_token()?;
        Self::new(
            &config.endpoint,
            &config.model,
            &token,
            Duration::from_secs(config.timeout_secs),
        )
    }
}

#[async_trait::async_trait]
impl Transcribe for HttpTranscriber {
    async fn transcribe(&self, audio: Vec<u8>, format: AudioFormat) -> Result<String> {
        if audio.is_empty() {
            return Err(PipelineError::InvalidConfiguration {
                message: "cannot transcribe an empty audio buffer".to_string(),
            });
        }

        debug!(
            "Sending transcription request: {} bytes ({}) to {}",
            audio.len(),
            format.mime(),
            self.url
        );

        let part = Part::bytes(audio)
            .file_name(format.file_name())
            .mime_str(format.mime())
            .map_err(|e| PipelineError::InvalidConfiguration {
                message: format!("invalid MIME type for audio part: {}", e),
            })?;

        let form = Form::new().text("model", self.model.clone()).part("file", part);

        let response = self
            .client
            .post(&self.url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| PipelineError::TranscriptionRequest {
                status: e.status().map(|s| s.as_u16()),
                timed_out: e.is_timeout(),
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PipelineError::TranscriptionRequest {
                status: Some(status.as_u16()),
                timed_out: false,
                message: format!("status {}: {}", status, body.trim()),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| PipelineError::TranscriptionRequest {
                status: Some(status.as_u16()),
                timed_out: e.is_timeout(),
                message: format!("failed to read response body: {}", e),
            })?;

        // A non-2xx was already rejected above: a body that does not carry
        // the expected `text` field is a malformed response, not an empty
        // transcript.
        let parsed: TranscriptionResponse =
            serde_json::from_str(&body).map_err(|e| PipelineError::TranscriptionResponse {
                message: format!("{}", e),
            })?;

        debug!("Transcription response: {} chars", parsed.text.len());

        Ok(parsed.text)
    }
}
