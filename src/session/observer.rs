use crate::error::PipelineError;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Presentation hooks invoked by the pipeline on state changes.
///
/// This decouples the pipeline core from any presentation layer: a UI can
/// toggle a loading indicator or render the running transcript without the
/// pipeline knowing about it. All methods default to no-ops.
pub trait SessionObserver: Send + Sync {
    /// Fired when the number of in-flight transcription requests transitions
    /// between zero and non-zero.
    fn on_loading_changed(&self, _loading: bool) {}

    /// Fired whenever the ordered transcript grows.
    fn on_transcript_updated(&self, _transcript: &str) {}

    /// Fired when a per-slice transcription fails. The session keeps
    /// capturing; the failed slice is skipped in the transcript.
    fn on_slice_error(&self, _error: &PipelineError) {}
}

/// Observer that ignores every event.
pub struct NoopObserver;

impl SessionObserver for NoopObserver {}

/// Tracks in-flight transcription requests and reports zero/non-zero
/// transitions to the observer.
pub(crate) struct LoadingGauge {
    in_flight: AtomicUsize,
    observer: Arc<dyn SessionObserver>,
}

impl LoadingGauge {
    pub(crate) fn new(observer: Arc<dyn SessionObserver>) -> Self {
        Self {
            in_flight: AtomicUsize::new(0),
            observer,
        }
    }

    pub(crate) fn begin(&self) {
        if self.in_flight.fetch_add(1, Ordering::SeqCst) == 0 {
            self.observer.on_loading_changed(true);
        }
    }

    pub(crate) fn end(&self) {
        if self.in_flight.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.observer.on_loading_changed(false);
        }
    }
}
