use super::capture::{AudioCapture, AudioFrame, CaptureConfig};
use crate::error::{PipelineError, Result};
use std::path::Path;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::info;

/// A decoded WAV file held in memory.
pub struct AudioFile {
    pub path: String,
    pub duration_seconds: f64,
    pub sample_rate: u32,
    pub channels: u16,
    pub samples: Vec<i16>,
}

impl AudioFile {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!("Opening audio file: {}", path.display());

        let reader = hound::WavReader::open(path).map_err(|e| PipelineError::DeviceUnavailable {
            message: format!("failed to open WAV file {}: {}", path.display(), e),
        })?;

        let spec = reader.spec();
        let samples: Vec<i16> = reader
            .into_samples::<i16>()
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| PipelineError::DeviceUnavailable {
                message: format!("failed to read audio samples: {}", e),
            })?;

        let duration_seconds =
            samples.len() as f64 / (spec.sample_rate as f64 * spec.channels as f64);

        info!(
            "Audio file loaded: {:.1}s, {}Hz, {} channels, {} samples",
            duration_seconds,
            spec.sample_rate,
            spec.channels,
            samples.len()
        );

        Ok(Self {
            path: path.display().to_string(),
            duration_seconds,
            sample_rate: spec.sample_rate,
            channels: spec.channels,
            samples,
        })
    }
}

/// Capture backend over a pre-recorded WAV file.
///
/// Emits the file's samples as frames of `frame_duration_ms` with synthetic
/// timestamps, then closes the frame channel. `stop` waits for the emitter to
/// drain rather than cutting it short: a finite source always delivers its
/// whole content.
pub struct FileCapture {
    audio: AudioFile,
    config: CaptureConfig,
    capturing: bool,
    emit_task: Option<JoinHandle<()>>,
}

impl FileCapture {
    pub fn new(path: impl AsRef<Path>, config: CaptureConfig) -> Result<Self> {
        let audio = AudioFile::open(path)?;
        Ok(Self {
            audio,
            config,
            capturing: false,
            emit_task: None,
        })
    }

    pub fn sample_rate(&self) -> u32 {
        self.audio.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.audio.channels
    }
}

#[async_trait::async_trait]
impl AudioCapture for FileCapture {
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>> {
        if self.capturing {
            return Err(PipelineError::AlreadyRecording);
        }
        self.capturing = true;

        let sample_rate = self.audio.sample_rate;
        let channels = self.audio.channels;
        let samples = self.audio.samples.clone();
        let frame_samples = (self.config.frame_duration_ms as usize * sample_rate as usize
            / 1000)
            * channels as usize;
        let frame_ms = self.config.frame_duration_ms;

        let (tx, rx) = mpsc::channel(64);

        let task = tokio::spawn(async move {
            let frame_samples = frame_samples.max(1);
            for (i, window) in samples.chunks(frame_samples).enumerate() {
                let frame = AudioFrame {
                    samples: window.to_vec(),
                    sample_rate,
                    channels,
                    timestamp_ms: i as u64 * frame_ms,
                };
                if tx.send(frame).await.is_err() {
                    // Receiver dropped: the session is gone.
                    break;
                }
            }
        });

        self.emit_task = Some(task);
        Ok(rx)
    }

    async fn stop(&mut self) -> Result<()> {
        if !self.capturing {
            return Ok(());
        }
        self.capturing = false;

        if let Some(task) = self.emit_task.take() {
            task.await.map_err(|e| PipelineError::DeviceUnavailable {
                message: format!("file emitter task failed: {}", e),
            })?;
        }
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.capturing
    }

    fn name(&self) -> &str {
        "file"
    }
}
