//! Continuous speech capture
//!
//! Drives one logical recording as a sequence of possibly many ephemeral
//! engine sessions. Recognition engines end sessions unilaterally; while the
//! user is still recording, a session end triggers a transparent restart and
//! accumulation resumes where it left off. Finalized text is delivered
//! exactly once, when the user stops.

mod engine;
mod error;
mod transcript;

pub use engine::{
    EngineEvent, EngineSession, RecognizedSegment, SessionControl, SpeechCaptureEngine,
};
pub use error::CaptureError;
pub use transcript::TranscriptBuffer;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::broadcast;
use tracing::{info, warn};

/// Capture lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CaptureMode {
    /// No recording in progress
    #[default]
    Idle,
    /// Recording; a session end triggers a transparent restart
    Recording,
    /// User requested stop; the next session end finalizes
    Stopping,
}

/// Capture event for subscribers
#[derive(Debug, Clone)]
pub enum CaptureEvent {
    /// Latest interim preview (empty when the preview cleared)
    Partial { text: String },
    /// Full accumulated transcript after new final text was appended
    Committed { text: String },
    /// The engine session ended mid-recording and a new one was opened
    SessionRestarted,
    /// The finalized transcript, delivered exactly once per recording.
    /// Never emitted for an empty transcript.
    Finalized { transcript: String },
    /// Capture failed; the recording was discarded
    CaptureError { message: String },
    /// The capture path has fully wound down
    Stopped,
}

/// Lock a mutex, recovering the data if a holder panicked
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Controller for continuous speech capture
///
/// All mode and transcript mutation happens inside one driving task per
/// recording; `begin` and `request_stop` return immediately and completion
/// arrives via the event stream.
pub struct CaptureController {
    engine: Arc<dyn SpeechCaptureEngine>,
    mode: Arc<Mutex<CaptureMode>>,
    transcript: Arc<Mutex<TranscriptBuffer>>,
    live_control: Arc<Mutex<Option<SessionControl>>>,
    event_tx: broadcast::Sender<CaptureEvent>,
}

impl CaptureController {
    pub fn new(engine: Arc<dyn SpeechCaptureEngine>) -> Self {
        let (event_tx, _) = broadcast::channel(100);
        Self {
            engine,
            mode: Arc::new(Mutex::new(CaptureMode::Idle)),
            transcript: Arc::new(Mutex::new(TranscriptBuffer::default())),
            live_control: Arc::new(Mutex::new(None)),
            event_tx,
        }
    }

    /// Subscribe to capture events
    pub fn subscribe(&self) -> broadcast::Receiver<CaptureEvent> {
        self.event_tx.subscribe()
    }

    /// Current capture mode
    pub fn mode(&self) -> CaptureMode {
        *lock(&self.mode)
    }

    /// Begin a new recording.
    ///
    /// Clears the transcript buffer and spawns the capture loop. Rejected
    /// without any state change when the engine capability is missing or a
    /// recording is already in progress.
    pub fn begin(&self) -> Result<(), CaptureError> {
        if !self.engine.is_available() {
            return Err(CaptureError::Unavailable);
        }

        {
            let mut mode = lock(&self.mode);
            if *mode != CaptureMode::Idle {
                return Err(CaptureError::Busy);
            }
            *mode = CaptureMode::Recording;
        }
        lock(&self.transcript).take();

        info!("Capture started");
        tokio::spawn(run_capture_loop(
            self.engine.clone(),
            self.mode.clone(),
            self.transcript.clone(),
            self.live_control.clone(),
            self.event_tx.clone(),
        ));
        Ok(())
    }

    /// Request that the recording stop.
    ///
    /// Valid only while recording; a no-op otherwise. The live session is
    /// asked to end, and its end-of-session event triggers finalization.
    pub fn request_stop(&self) {
        {
            let mut mode = lock(&self.mode);
            if *mode != CaptureMode::Recording {
                return;
            }
            *mode = CaptureMode::Stopping;
        }
        info!("Capture stop requested");

        let control = lock(&self.live_control).clone();
        if let Some(control) = control {
            control.request_end();
        }
    }
}

/// Drive engine sessions for one logical recording.
///
/// The loop opens sessions until the user stops or capture fails. The mode is
/// re-read at every decision point: a `request_stop` may land between any two
/// events.
async fn run_capture_loop(
    engine: Arc<dyn SpeechCaptureEngine>,
    mode: Arc<Mutex<CaptureMode>>,
    transcript: Arc<Mutex<TranscriptBuffer>>,
    live_control: Arc<Mutex<Option<SessionControl>>>,
    event_tx: broadcast::Sender<CaptureEvent>,
) {
    let mut first_session = true;

    loop {
        // A stop can land between sessions; don't open another one for it.
        if *lock(&mode) != CaptureMode::Recording {
            finalize(&mode, &transcript, &live_control, &event_tx);
            return;
        }

        let mut session = match engine.open_session().await {
            Ok(session) => session,
            Err(e) => {
                abort(&mode, &transcript, &live_control, &event_tx, &e.to_string());
                return;
            }
        };

        if !first_session {
            info!("Engine session ended mid-recording, restarted");
            let _ = event_tx.send(CaptureEvent::SessionRestarted);
        }
        first_session = false;

        lock(&transcript).begin_session();
        *lock(&live_control) = Some(session.control.clone());

        // The stop may have raced the session open; relay it to the session
        // that now exists.
        if *lock(&mode) == CaptureMode::Stopping {
            session.control.request_end();
        }

        let mut session_failed = None;
        while let Some(event) = session.events.recv().await {
            match event {
                EngineEvent::Results {
                    result_index,
                    segments,
                } => {
                    let (appended, partial, committed) = {
                        let mut buf = lock(&transcript);
                        let appended = buf.apply(result_index, &segments);
                        (
                            appended,
                            buf.partial().unwrap_or_default().to_string(),
                            buf.full_text(),
                        )
                    };
                    if appended {
                        let _ = event_tx.send(CaptureEvent::Committed { text: committed });
                    }
                    let _ = event_tx.send(CaptureEvent::Partial { text: partial });
                }
                EngineEvent::Ended => break,
                EngineEvent::Failed { message } => {
                    session_failed = Some(message);
                    break;
                }
            }
        }

        *lock(&live_control) = None;

        if let Some(message) = session_failed {
            abort(&mode, &transcript, &live_control, &event_tx, &message);
            return;
        }

        // Read the mode into a local so the mutex guard is released before
        // `finalize` runs — `finalize` re-locks `mode`, and holding the guard
        // across the match arm would self-deadlock.
        let current_mode = *lock(&mode);
        match current_mode {
            // Engine-initiated end while still recording: transparent restart
            CaptureMode::Recording => continue,
            _ => {
                finalize(&mode, &transcript, &live_control, &event_tx);
                return;
            }
        }
    }
}

/// Deliver the accumulated transcript and return to idle.
///
/// An empty transcript produces no `Finalized` event; there is nothing to
/// analyze.
fn finalize(
    mode: &Mutex<CaptureMode>,
    transcript: &Mutex<TranscriptBuffer>,
    live_control: &Mutex<Option<SessionControl>>,
    event_tx: &broadcast::Sender<CaptureEvent>,
) {
    let text = lock(transcript).take();
    *lock(live_control) = None;
    *lock(mode) = CaptureMode::Idle;

    if text.trim().is_empty() {
        info!("Capture finished with empty transcript, nothing to deliver");
    } else {
        info!(chars = text.len(), "Capture finalized");
        let _ = event_tx.send(CaptureEvent::Finalized { transcript: text });
    }
    let _ = event_tx.send(CaptureEvent::Stopped);
}

/// Abort the recording after a capture failure.
///
/// The in-progress session and any text accumulated this recording are
/// discarded; the user must restart.
fn abort(
    mode: &Mutex<CaptureMode>,
    transcript: &Mutex<TranscriptBuffer>,
    live_control: &Mutex<Option<SessionControl>>,
    event_tx: &broadcast::Sender<CaptureEvent>,
    message: &str,
) {
    warn!("Capture aborted: {}", message);
    lock(transcript).take();
    *lock(live_control) = None;
    *lock(mode) = CaptureMode::Idle;

    let _ = event_tx.send(CaptureEvent::CaptureError {
        message: message.to_string(),
    });
    let _ = event_tx.send(CaptureEvent::Stopped);
}
