//! Error types for the capture module

use crate::audio::AudioCaptureError;

/// Errors that can occur while driving speech capture
#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("Speech capture is not available on this system")]
    Unavailable,

    #[error("A recording is already in progress")]
    Busy,

    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Connection timeout - the speech service did not respond in time")]
    ConnectionTimeout,

    #[error("Audio capture error: {0}")]
    Audio(#[from] AudioCaptureError),

    #[error("Capture engine error: {0}")]
    Engine(String),
}
