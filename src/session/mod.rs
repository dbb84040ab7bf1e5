//! Recording session management
//!
//! This module provides the `RecordingSession` abstraction that manages:
//! - Audio capture from a backend (microphone or file)
//! - Slicing the stream into fixed-duration segments
//! - Concurrent per-slice transcription with order-preserving accumulation
//! - The finalizer: one whole-recording transcription on stop
//! - Session statistics and state management

mod config;
mod observer;
mod session;
mod stats;
mod transcript;

pub use config::SessionConfig;
pub use observer::{NoopObserver, SessionObserver};
pub use session::RecordingSession;
pub use stats::SessionStats;
pub use transcript::Transcript;
