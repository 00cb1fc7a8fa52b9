//! Audio types and error definitions

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use tracing::info;

/// Chunk of microphone audio ready for streaming to the speech service
#[derive(Debug, Clone)]
pub struct AudioChunk {
    /// PCM 16-bit signed samples, mono
    pub samples: Vec<i16>,
    /// Sample rate in Hz after resampling
    pub sample_rate: u32,
}

/// Handle for controlling audio capture from outside the capture thread
pub struct AudioCaptureHandle {
    pub(crate) is_capturing: Arc<AtomicBool>,
    pub(crate) thread_handle: Option<JoinHandle<()>>,
}

impl AudioCaptureHandle {
    /// Stop capturing and wait for the capture thread to exit
    pub fn stop(&mut self) {
        self.is_capturing.store(false, Ordering::SeqCst);
        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
        }
        info!("Audio capture stopped");
    }
}

impl Drop for AudioCaptureHandle {
    fn drop(&mut self) {
        self.is_capturing.store(false, Ordering::SeqCst);
    }
}

/// Errors that can occur during audio capture
#[derive(Debug, thiserror::Error)]
pub enum AudioCaptureError {
    #[error("No audio input device found")]
    NoInputDevice,

    #[error("Unsupported audio format: {0}")]
    UnsupportedFormat(String),

    #[error("Resampler setup failed: {0}")]
    Resampler(String),

    #[error("Audio stream error: {0}")]
    StreamError(#[from] cpal::BuildStreamError),

    #[error("Audio play error: {0}")]
    PlayError(#[from] cpal::PlayStreamError),

    #[error("Default config error: {0}")]
    DefaultConfigError(#[from] cpal::DefaultStreamConfigError),
}
