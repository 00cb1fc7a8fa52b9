//! Capture engine capability interface
//!
//! The controller is written against this trait rather than a concrete
//! recognition backend, so it can be driven by a scripted engine in tests
//! and by the realtime speech service in the binary.

use async_trait::async_trait;
use tokio::sync::{mpsc, watch};

use super::CaptureError;

/// A span of recognized speech reported by an engine session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecognizedSegment {
    /// Recognized text, including any trailing spacing the service emitted
    pub text: String,
    /// Whether the service has committed this segment (final) or is still
    /// revising it (interim)
    pub is_final: bool,
}

impl RecognizedSegment {
    pub fn final_text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_final: true,
        }
    }

    pub fn interim_text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_final: false,
        }
    }
}

/// Events delivered by a single capture session
#[derive(Debug, Clone)]
pub enum EngineEvent {
    /// Recognition results, indexed from the engine's low-water mark.
    ///
    /// `result_index` is the absolute position of the first segment within
    /// this session's result list. Engines may re-report a superset of
    /// previously delivered segments starting from that mark; already
    /// committed positions must not be appended again by the consumer.
    Results {
        result_index: usize,
        segments: Vec<RecognizedSegment>,
    },
    /// The session ended, either engine-initiated or after a requested end.
    /// No further results follow.
    Ended,
    /// The session failed. No further events follow.
    Failed { message: String },
}

/// Handle for asking a live session to wind down
///
/// Engines watch this handle and end the session gracefully once an end has
/// been requested, which eventually yields [`EngineEvent::Ended`].
#[derive(Debug, Clone)]
pub struct SessionControl {
    end_tx: watch::Sender<bool>,
}

impl SessionControl {
    pub fn new() -> Self {
        let (end_tx, _) = watch::channel(false);
        Self { end_tx }
    }

    /// Ask the engine to end the session gracefully. Idempotent.
    pub fn request_end(&self) {
        let _ = self.end_tx.send(true);
    }

    pub fn is_end_requested(&self) -> bool {
        *self.end_tx.borrow()
    }

    /// Wait until an end has been requested for this session
    pub async fn end_requested(&self) {
        let mut rx = self.end_tx.subscribe();
        let _ = rx.wait_for(|requested| *requested).await;
    }
}

impl Default for SessionControl {
    fn default() -> Self {
        Self::new()
    }
}

/// One instance of the underlying recognition engine
///
/// Sessions are ephemeral: the engine may end one unilaterally at any time.
/// Restart policy belongs to the caller, not the engine.
pub struct EngineSession {
    /// Event stream for this session, open until `Ended` or `Failed`
    pub events: mpsc::Receiver<EngineEvent>,
    /// Handle used to request a graceful end of this session
    pub control: SessionControl,
}

/// Platform speech-recognition capability
#[async_trait]
pub trait SpeechCaptureEngine: Send + Sync {
    /// Whether the capability is usable at all (input device present,
    /// service configured). Checked before any capture state changes.
    fn is_available(&self) -> bool;

    /// Open one recognition session
    async fn open_session(&self) -> Result<EngineSession, CaptureError>;
}
