use super::config::SessionConfig;
use super::observer::{LoadingGauge, NoopObserver, SessionObserver};
use super::stats::SessionStats;
use super::transcript::Transcript;
use crate::audio::{encode_wav, AudioCapture, AudioFormat, AudioSlice, Slicer};
use crate::error::{PipelineError, Result};
use crate::transcribe::Transcribe;
use chrono::Utc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// A recording session: one lifetime of capture, from start to stop.
///
/// Frames from the capture backend are cut into fixed-duration slices; each
/// slice is transcribed concurrently and its fragment merged into an ordered
/// transcript. `stop` runs the finalizer: the full buffered recording is
/// transcribed as a single unit, which supersedes the per-slice transcript.
///
/// Sessions are owned objects; several independent sessions can coexist, but
/// each one is Idle or Recording, never both, and `start` while recording is
/// an error.
pub struct RecordingSession {
    config: SessionConfig,
    transcriber: Arc<dyn Transcribe>,
    observer: Arc<dyn SessionObserver>,

    /// When the session object was created
    started_at: chrono::DateTime<chrono::Utc>,

    /// Liveness flag, the single-writer session guard
    is_recording: Arc<AtomicBool>,

    /// Ordered per-slice transcript
    transcript: Arc<Mutex<Transcript>>,

    /// Number of slices emitted in the current recording
    slices_emitted: Arc<AtomicUsize>,

    /// Capture backend, held while recording so `stop` can release the device
    capture: Mutex<Option<Box<dyn AudioCapture>>>,

    /// Handle for the slicing task
    slicing_task: Mutex<Option<JoinHandle<()>>>,

    /// Handle for the fragment accumulator task
    accumulator_task: Mutex<Option<JoinHandle<()>>>,

    /// Receives the full raw buffer once the slicing task drains
    full_buffer_rx: Mutex<Option<oneshot::Receiver<Vec<i16>>>>,
}

impl RecordingSession {
    /// Create a new session. Configuration errors are rejected here,
    /// synchronously, before any device or network access.
    pub fn new(config: SessionConfig, transcriber: Arc<dyn Transcribe>) -> Result<Self> {
        Self::with_observer(config, transcriber, Arc::new(NoopObserver))
    }

    pub fn with_observer(
        config: SessionConfig,
        transcriber: Arc<dyn Transcribe>,
        observer: Arc<dyn SessionObserver>,
    ) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            config,
            transcriber,
            observer,
            started_at: Utc::now(),
            is_recording: Arc::new(AtomicBool::new(false)),
            transcript: Arc::new(Mutex::new(Transcript::new())),
            slices_emitted: Arc::new(AtomicUsize::new(0)),
            capture: Mutex::new(None),
            slicing_task: Mutex::new(None),
            accumulator_task: Mutex::new(None),
            full_buffer_rx: Mutex::new(None),
        })
    }

    pub fn session_id(&self) -> &str {
        &self.config.session_id
    }

    /// Start recording from the given capture backend.
    ///
    /// Fails with `AlreadyRecording` if this session is live (the running
    /// recording is unaffected), and with `DeviceUnavailable` if the backend
    /// cannot start, in which case the session stays Idle.
    pub async fn start(&self, mut capture: Box<dyn AudioCapture>) -> Result<()> {
        if self
            .is_recording
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(PipelineError::AlreadyRecording);
        }

        info!(
            "Starting recording session: {} ({} capture, {:?} slices)",
            self.config.session_id,
            capture.name(),
            self.config.slice_duration
        );

        let slicer = match Slicer::new(
            self.config.slice_duration,
            self.config.sample_rate,
            self.config.channels,
        ) {
            Ok(slicer) => slicer,
            Err(e) => {
                self.is_recording.store(false, Ordering::SeqCst);
                return Err(e);
            }
        };

        let frame_rx = match capture.start().await {
            Ok(rx) => rx,
            Err(e) => {
                self.is_recording.store(false, Ordering::SeqCst);
                return Err(e);
            }
        };

        // A new recording replaces the previous transcript wholesale.
        {
            let mut transcript = self.transcript.lock().await;
            *transcript = Transcript::new();
        }
        self.slices_emitted.store(0, Ordering::SeqCst);

        let (fragment_tx, fragment_rx) = mpsc::channel::<(usize, Result<String>)>(64);
        let (buffer_tx, buffer_rx) = oneshot::channel::<Vec<i16>>();

        // Accumulator task: merges fragments in slice order and reports
        // transcript growth. Aborted on stop so in-flight results from a
        // finished session are discarded.
        let transcript = Arc::clone(&self.transcript);
        let observer = Arc::clone(&self.observer);
        let accumulator = tokio::spawn(async move {
            let mut fragment_rx = fragment_rx;
            while let Some((index, result)) = fragment_rx.recv().await {
                match result {
                    Ok(fragment) => {
                        let snapshot = {
                            let mut transcript = transcript.lock().await;
                            let advanced = transcript.insert(index, fragment);
                            advanced.then(|| transcript.snapshot())
                        };
                        if let Some(snapshot) = snapshot {
                            observer.on_transcript_updated(&snapshot);
                        }
                    }
                    Err(e) => {
                        warn!("Transcription of slice {} failed: {}", index, e);
                        observer.on_slice_error(&e);
                        transcript.lock().await.skip(index);
                    }
                }
            }
        });

        // Slicing task: cuts frames into slices and fires one transcription
        // task per slice. Ends when the capture channel closes, then hands
        // the full raw buffer to the finalizer path.
        let transcriber = Arc::clone(&self.transcriber);
        let gauge = Arc::new(LoadingGauge::new(Arc::clone(&self.observer)));
        let slices_emitted = Arc::clone(&self.slices_emitted);
        let session_id = self.config.session_id.clone();
        let slicing = tokio::spawn(async move {
            let mut slicer = slicer;
            let mut frame_rx = frame_rx;

            while let Some(frame) = frame_rx.recv().await {
                match slicer.push(&frame) {
                    Ok(slices) => {
                        for slice in slices {
                            slices_emitted.fetch_add(1, Ordering::SeqCst);
                            spawn_transcription(
                                slice,
                                Arc::clone(&transcriber),
                                fragment_tx.clone(),
                                Arc::clone(&gauge),
                            );
                        }
                    }
                    Err(e) => error!("Failed to slice audio frame: {}", e),
                }
            }

            match slicer.finish() {
                Ok((_partial, full)) => {
                    // The partial remainder stays out of the slice path: the
                    // finalizer transcribes the full buffer anyway.
                    if buffer_tx.send(full).is_err() {
                        warn!("Session {} discarded its capture buffer", session_id);
                    }
                }
                Err(e) => error!("Failed to flush slicer: {}", e),
            }
        });

        {
            let mut guard = self.capture.lock().await;
            *guard = Some(capture);
        }
        {
            let mut guard = self.slicing_task.lock().await;
            *guard = Some(slicing);
        }
        {
            let mut guard = self.accumulator_task.lock().await;
            *guard = Some(accumulator);
        }
        {
            let mut guard = self.full_buffer_rx.lock().await;
            *guard = Some(buffer_rx);
        }

        info!("Recording session started: {}", self.config.session_id);

        Ok(())
    }

    /// Current accumulated per-slice transcript.
    pub async fn transcript(&self) -> String {
        self.transcript.lock().await.snapshot()
    }

    /// Stop recording and run the finalizer.
    ///
    /// Releases the capture device, discards in-flight per-slice results,
    /// transcribes the full buffered recording as one unit and returns that
    /// text. An empty capture buffer resolves to an empty string without a
    /// network call; a finalizer failure is this method's error.
    pub async fn stop(&self) -> Result<String> {
        if self
            .is_recording
            .compare_exchange(true, false, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(PipelineError::NotRecording);
        }

        info!("Stopping recording session: {}", self.config.session_id);

        self.shutdown_capture().await;

        // Wait for the slicing task: it owns the full buffer.
        if let Some(task) = self.slicing_task.lock().await.take() {
            if let Err(e) = task.await {
                error!("Slicing task panicked: {}", e);
            }
        }

        // Drop the accumulator so in-flight slice results are discarded; the
        // finalizer result supersedes them.
        if let Some(task) = self.accumulator_task.lock().await.take() {
            task.abort();
            let _ = task.await;
        }

        let full = match self.full_buffer_rx.lock().await.take() {
            Some(rx) => match rx.await {
                Ok(samples) => samples,
                Err(_) => {
                    warn!("Capture buffer lost for session {}", self.config.session_id);
                    Vec::new()
                }
            },
            None => Vec::new(),
        };

        if full.is_empty() {
            info!(
                "Session {} captured no audio; returning empty transcript",
                self.config.session_id
            );
            return Ok(String::new());
        }

        let wav = encode_wav(&full, self.config.sample_rate, self.config.channels)?;
        info!(
            "Finalizing session {}: {} samples ({} bytes WAV)",
            self.config.session_id,
            full.len(),
            wav.len()
        );

        self.observer.on_loading_changed(true);
        let result = self.transcriber.transcribe(wav, AudioFormat::Wav).await;
        self.observer.on_loading_changed(false);

        let text = result?;
        info!(
            "Session {} finalized: {} chars",
            self.config.session_id,
            text.len()
        );
        Ok(text)
    }

    /// Cancel the session without finalizing.
    ///
    /// Releases the capture device and discards the buffered recording and
    /// any in-flight transcription results. A no-op when the session is Idle.
    pub async fn abort(&self) {
        if self
            .is_recording
            .compare_exchange(true, false, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return;
        }

        warn!("Aborting recording session: {}", self.config.session_id);

        self.shutdown_capture().await;

        if let Some(task) = self.slicing_task.lock().await.take() {
            task.abort();
            let _ = task.await;
        }
        if let Some(task) = self.accumulator_task.lock().await.take() {
            task.abort();
            let _ = task.await;
        }
        self.full_buffer_rx.lock().await.take();
    }

    /// Current session statistics.
    pub async fn stats(&self) -> SessionStats {
        let duration = Utc::now().signed_duration_since(self.started_at);
        let fragments_resolved = self.transcript.lock().await.flushed();

        SessionStats {
            is_recording: self.is_recording.load(Ordering::SeqCst),
            started_at: self.started_at,
            duration_secs: duration.num_milliseconds() as f64 / 1000.0,
            slices_emitted: self.slices_emitted.load(Ordering::SeqCst),
            fragments_resolved,
        }
    }

    async fn shutdown_capture(&self) {
        if let Some(mut capture) = self.capture.lock().await.take() {
            if let Err(e) = capture.stop().await {
                warn!("Failed to stop capture backend: {}", e);
            }
        }
    }
}

/// Fire one transcription request for a slice. The result is delivered to
/// the accumulator; a closed accumulator means the session already stopped
/// and the fragment is dropped.
fn spawn_transcription(
    slice: AudioSlice,
    transcriber: Arc<dyn Transcribe>,
    fragment_tx: mpsc::Sender<(usize, Result<String>)>,
    gauge: Arc<LoadingGauge>,
) {
    let index = slice.index;
    let format = slice.format;
    tokio::spawn(async move {
        gauge.begin();
        let result = transcriber.transcribe(slice.data, format).await;
        gauge.end();
        let _ = fragment_tx.send((index, result)).await;
    });
}
