pub mod capture;
pub mod file;
pub mod slicer;

#[cfg(feature = "mic")]
pub mod mic;

pub use capture::{AudioCapture, AudioFrame, CaptureConfig};
pub use file::{AudioFile, FileCapture};
pub use slicer::{encode_wav, AudioFormat, AudioSlice, Slicer};

#[cfg(feature = "mic")]
pub use mic::MicCapture;
