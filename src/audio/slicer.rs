use super::capture::AudioFrame;
use crate::error::{PipelineError, Result};
use std::io::Cursor;
use std::time::Duration;
use tracing::debug;

/// Encoding of an audio slice's byte buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioFormat {
    Wav,
}

impl AudioFormat {
    pub fn mime(&self) -> &'static str {
        match self {
            AudioFormat::Wav => "audio/wav",
        }
    }

    pub fn file_name(&self) -> &'static str {
        match self {
            AudioFormat::Wav => "audio.wav",
        }
    }
}

/// One fixed-duration segment of a continuous capture, encoded as a
/// self-contained byte buffer ready for submission to the transcription
/// endpoint.
#[derive(Debug, Clone)]
pub struct AudioSlice {
    /// Slice number (0-indexed, capture order)
    pub index: usize,
    /// Encoding of `data`
    pub format: AudioFormat,
    /// Encoded audio bytes
    pub data: Vec<u8>,
    /// Start time in milliseconds since capture started
    pub start_ms: u64,
    /// End time in milliseconds since capture started
    pub end_ms: u64,
    /// Number of PCM samples in this slice
    pub sample_count: usize,
}

/// Splits a continuous stream of audio frames into sequential slices of a
/// fixed target duration.
///
/// Slices are contiguous and non-overlapping: concatenating the PCM of every
/// emitted slice (including the partial one from `finish`) reconstructs
/// exactly the full buffer. The full buffer is retained for the finalizer
/// path.
pub struct Slicer {
    /// Samples per slice (all channels interleaved)
    slice_samples: usize,
    sample_rate: u32,
    channels: u16,
    /// Samples not yet emitted as a slice
    pending: Vec<i16>,
    /// Every sample seen since creation
    full: Vec<i16>,
    next_index: usize,
    /// Total samples already emitted as slices
    emitted_samples: usize,
}

impl Slicer {
    pub fn new(slice_duration: Duration, sample_rate: u32, channels: u16) -> Result<Self> {
        if slice_duration.is_zero() {
            return Err(PipelineError::InvalidConfiguration {
                message: "slice duration must be positive".to_string(),
            });
        }
        if sample_rate == 0 || channels == 0 {
            return Err(PipelineError::InvalidConfiguration {
                message: format!(
                    "invalid audio format: {}Hz, {} channels",
                    sample_rate, channels
                ),
            });
        }

        let slice_samples = (slice_duration.as_millis() as usize * sample_rate as usize
            / 1000)
            * channels as usize;
        if slice_samples == 0 {
            return Err(PipelineError::InvalidConfiguration {
                message: format!("slice duration {:?} is shorter than one sample", slice_duration),
            });
        }

        Ok(Self {
            slice_samples,
            sample_rate,
            channels,
            pending: Vec::new(),
            full: Vec::new(),
            next_index: 0,
            emitted_samples: 0,
        })
    }

    /// Feed one capture frame; returns any slices that became complete.
    ///
    /// A frame larger than the slice duration can complete several slices at
    /// once.
    pub fn push(&mut self, frame: &AudioFrame) -> Result<Vec<AudioSlice>> {
        self.pending.extend_from_slice(&frame.samples);
        self.full.extend_from_slice(&frame.samples);

        let mut slices = Vec::new();
        while self.pending.len() >= self.slice_samples {
            let rest = self.pending.split_off(self.slice_samples);
            let samples = std::mem::replace(&mut self.pending, rest);
            slices.push(self.emit(samples)?);
        }
        Ok(slices)
    }

    /// Flush the partial remainder and return it together with the full
    /// buffer captured since creation.
    pub fn finish(mut self) -> Result<(Option<AudioSlice>, Vec<i16>)> {
        let last = if self.pending.is_empty() {
            None
        } else {
            let samples = std::mem::take(&mut self.pending);
            Some(self.emit(samples)?)
        };

        debug!(
            "Slicer finished: {} slices, {} samples total",
            self.next_index,
            self.full.len()
        );

        Ok((last, self.full))
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    fn emit(&mut self, samples: Vec<i16>) -> Result<AudioSlice> {
        let start_ms = self.samples_to_ms(self.emitted_samples);
        self.emitted_samples += samples.len();
        let end_ms = self.samples_to_ms(self.emitted_samples);

        let index = self.next_index;
        self.next_index += 1;

        let sample_count = samples.len();
        let data = encode_wav(&samples, self.sample_rate, self.channels)?;

        debug!(
            "Slice {} ready: {}ms - {}ms ({} samples, {} bytes)",
            index,
            start_ms,
            end_ms,
            sample_count,
            data.len()
        );

        Ok(AudioSlice {
            index,
            format: AudioFormat::Wav,
            data,
            start_ms,
            end_ms,
            sample_count,
        })
    }

    fn samples_to_ms(&self, samples: usize) -> u64 {
        (samples as u64 * 1000) / (self.sample_rate as u64 * self.channels as u64)
    }
}

/// Encode i16 PCM samples as an in-memory WAV file.
pub fn encode_wav(samples: &[i16], sample_rate: u32, channels: u16) -> Result<Vec<u8>> {
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut buffer = Cursor::new(Vec::new());
    {
        let mut writer =
            hound::WavWriter::new(&mut buffer, spec).map_err(|e| PipelineError::AudioEncoding {
                message: format!("failed to create WAV writer: {}", e),
            })?;

        for &sample in samples {
            writer
                .write_sample(sample)
                .map_err(|e| PipelineError::AudioEncoding {
                    message: format!("failed to write sample: {}", e),
                })?;
        }

        writer.finalize().map_err(|e| PipelineError::AudioEncoding {
            message: format!("failed to finalize WAV: {}", e),
        })?;
    }

    Ok(buffer.into_inner())
}
