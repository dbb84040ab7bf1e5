//! Speech-to-text transcription
//!
//! The `Transcribe` trait is the seam between the pipeline and the remote
//! endpoint: stateless, idempotent, safe to call concurrently for
//! independent inputs, and retry-free (retries are a caller policy).

mod http;

pub use http::HttpTranscriber;

use crate::audio::AudioFormat;
use crate::error::Result;

#[async_trait::async_trait]
pub trait Transcribe: Send + Sync {
    /// Transcribe one encoded audio buffer into text.
    async fn transcribe(&self, audio: Vec<u8>, format: AudioFormat) -> Result<String>;
}
