//! Microphone capture using CPAL (Cross-Platform Audio Library).

use super::capture::{AudioCapture, AudioFrame, CaptureConfig};
use crate::error::{PipelineError, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Wrapper for cpal::Stream to make it Send.
///
/// SAFETY: The stream is only accessed from one thread at a time through the
/// Mutex wrapper in MicCapture. The stream methods are called synchronously
/// and don't cross thread boundaries unsafely.
struct SendableStream(cpal::Stream);

unsafe impl Send for SendableStream {}

/// Microphone capture backend.
///
/// Captures 16-bit PCM at the configured rate and channel count. The CPAL
/// callback appends into a shared buffer; a tokio task drains the buffer once
/// per frame duration and forwards frames over the capture channel.
pub struct MicCapture {
    device: cpal::Device,
    config: CaptureConfig,
    stream: Arc<Mutex<Option<SendableStream>>>,
    buffer: Arc<Mutex<Vec<i16>>>,
    running: Arc<AtomicBool>,
    forward_task: Option<JoinHandle<()>>,
}

impl MicCapture {
    /// Create a microphone capture for the named device, or the system
    /// default input device if `device_name` is None.
    pub fn new(device_name: Option<&str>, config: CaptureConfig) -> Result<Self> {
        let host = cpal::default_host();

        let device = if let Some(name) = device_name {
            let devices = host
                .input_devices()
                .map_err(|e| PipelineError::DeviceUnavailable {
                    message: format!("failed to enumerate input devices: {}", e),
                })?;

            let mut found = None;
            for dev in devices {
                if dev.name().map(|n| n == name).unwrap_or(false) {
                    found = Some(dev);
                    break;
                }
            }

            found.ok_or_else(|| PipelineError::DeviceUnavailable {
                message: format!("input device not found: {}", name),
            })?
        } else {
            host.default_input_device()
                .ok_or_else(|| PipelineError::DeviceUnavailable {
                    message: "no default input device".to_string(),
                })?
        };

        Ok(Self {
            device,
            config,
            stream: Arc::new(Mutex::new(None)),
            buffer: Arc::new(Mutex::new(Vec::new())),
            running: Arc::new(AtomicBool::new(false)),
            forward_task: None,
        })
    }

    /// List available input device names.
    pub fn list_devices() -> Result<Vec<String>> {
        let host = cpal::default_host();
        let devices = host
            .input_devices()
            .map_err(|e| PipelineError::DeviceUnavailable {
                message: format!("failed to enumerate input devices: {}", e),
            })?;

        Ok(devices.filter_map(|d| d.name().ok()).collect())
    }

    /// Build the input stream, preferring i16 at the target format and
    /// falling back to f32 with sample conversion for devices that only
    /// expose float formats.
    fn build_stream(&self) -> Result<cpal::Stream> {
        let stream_config = cpal::StreamConfig {
            channels: self.config.target_channels,
            sample_rate: cpal::SampleRate(self.config.target_sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        let err_callback = |err| {
            warn!("Audio stream error: {}", err);
        };

        let buffer = Arc::clone(&self.buffer);
        if let Ok(stream) = self.device.build_input_stream(
            &stream_config,
            move |data: &[i16], _: &cpal::InputCallbackInfo| {
                if let Ok(mut buf) = buffer.lock() {
                    buf.extend_from_slice(data);
                }
            },
            err_callback,
            None,
        ) {
            return Ok(stream);
        }

        let buffer = Arc::clone(&self.buffer);
        self.device
            .build_input_stream(
                &stream_config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    if let Ok(mut buf) = buffer.lock() {
                        buf.extend(
                            data.iter()
                                .map(|&s| (s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16),
                        );
                    }
                },
                err_callback,
                None,
            )
            .map_err(|e| PipelineError::DeviceUnavailable {
                message: format!("failed to build input stream: {}", e),
            })
    }

    fn drain_buffer(buffer: &Mutex<Vec<i16>>) -> Vec<i16> {
        match buffer.lock() {
            Ok(mut buf) => std::mem::take(&mut *buf),
            Err(_) => Vec::new(),
        }
    }
}

#[async_trait::async_trait]
impl AudioCapture for MicCapture {
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>> {
        {
            let guard = self.stream.lock().map_err(|e| PipelineError::DeviceUnavailable {
                message: format!("failed to lock stream: {}", e),
            })?;
            if guard.is_some() {
                return Err(PipelineError::AlreadyRecording);
            }
        }

        let stream = self.build_stream()?;
        stream.play().map_err(|e| PipelineError::DeviceUnavailable {
            message: format!("failed to start audio stream: {}", e),
        })?;

        {
            let mut guard = self.stream.lock().map_err(|e| PipelineError::DeviceUnavailable {
                message: format!("failed to lock stream: {}", e),
            })?;
            *guard = Some(SendableStream(stream));
        }

        info!(
            "Microphone capture started ({}Hz, {} channels)",
            self.config.target_sample_rate, self.config.target_channels
        );

        self.running.store(true, Ordering::SeqCst);

        let (tx, rx) = mpsc::channel(64);
        let buffer = Arc::clone(&self.buffer);
        let running = Arc::clone(&self.running);
        let sample_rate = self.config.target_sample_rate;
        let channels = self.config.target_channels;
        let frame_ms = self.config.frame_duration_ms.max(1);

        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_millis(frame_ms));
            let mut elapsed_ms: u64 = 0;

            loop {
                interval.tick().await;
                let stopping = !running.load(Ordering::SeqCst);

                let samples = Self::drain_buffer(&buffer);
                if !samples.is_empty() {
                    let frame = AudioFrame {
                        samples,
                        sample_rate,
                        channels,
                        timestamp_ms: elapsed_ms,
                    };
                    if tx.send(frame).await.is_err() {
                        // Receiver dropped: the session is gone.
                        break;
                    }
                }
                elapsed_ms += frame_ms;

                if stopping {
                    break;
                }
            }
        });

        self.forward_task = Some(task);
        Ok(rx)
    }

    async fn stop(&mut self) -> Result<()> {
        // Pause the device first so no more samples arrive, then let the
        // forwarder flush whatever is left in the buffer.
        {
            let mut guard = self.stream.lock().map_err(|e| PipelineError::DeviceUnavailable {
                message: format!("failed to lock stream: {}", e),
            })?;
            if let Some(stream) = guard.take() {
                stream.0.pause().map_err(|e| PipelineError::DeviceUnavailable {
                    message: format!("failed to stop audio stream: {}", e),
                })?;
            }
        }

        self.running.store(false, Ordering::SeqCst);

        if let Some(task) = self.forward_task.take() {
            if let Err(e) = task.await {
                warn!("Microphone forwarder task failed: {}", e);
            }
        }

        info!("Microphone capture stopped");
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn name(&self) -> &str {
        "microphone"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_device_is_unavailable() {
        let result = MicCapture::new(Some("NonExistentDevice12345"), CaptureConfig::default());
        assert!(matches!(
            result,
            Err(PipelineError::DeviceUnavailable { .. })
        ));
    }

    #[test]
    #[ignore] // Requires audio hardware
    fn test_create_with_default_device() {
        let capture = MicCapture::new(None, CaptureConfig::default());
        assert!(capture.is_ok());
    }

    #[tokio::test]
    #[ignore] // Requires audio hardware
    async fn test_start_stop() {
        let mut capture =
            MicCapture::new(None, CaptureConfig::default()).expect("failed to create capture");
        let _rx = capture.start().await.expect("failed to start");
        tokio::time::sleep(Duration::from_millis(200)).await;
        capture.stop().await.expect("failed to stop");
        assert!(!capture.is_capturing());
    }
}
