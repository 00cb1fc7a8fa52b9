//! Capture event handling
//!
//! Consumes events from the capture controller for one recording: live
//! preview updates while recording, and the finalized transcript which is
//! submitted to the backend for analysis.

use super::{lock, CallState};
use crate::backend::BackendClient;
use crate::capture::CaptureEvent;
use crate::display;
use crate::storage;
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;
use tracing::{debug, error, warn};

/// Spawn the event handler task for one recording
pub(super) fn spawn_event_handler(
    event_rx: broadcast::Receiver<CaptureEvent>,
    state: Arc<Mutex<CallState>>,
    backend: Arc<BackendClient>,
    phone_number: String,
) {
    tokio::spawn(run_event_handler(event_rx, state, backend, phone_number));
}

/// Process capture events until the capture path winds down
async fn run_event_handler(
    mut event_rx: broadcast::Receiver<CaptureEvent>,
    state: Arc<Mutex<CallState>>,
    backend: Arc<BackendClient>,
    phone_number: String,
) {
    loop {
        let event = match event_rx.recv().await {
            Ok(event) => event,
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!("Capture event handler lagged, skipped {} events", skipped);
                continue;
            }
            Err(broadcast::error::RecvError::Closed) => break,
        };

        match event {
            CaptureEvent::Partial { text } => display::live_partial(&text),
            CaptureEvent::Committed { text } => display::live_transcript(&text),
            CaptureEvent::SessionRestarted => {
                debug!("Capture session restarted mid-recording");
            }
            CaptureEvent::Finalized { transcript } => {
                process_transcript(&state, &backend, &phone_number, &transcript).await;
            }
            CaptureEvent::CaptureError { message } => {
                display::notice(&format!("Recording error: {}", message));
            }
            CaptureEvent::Stopped => {
                lock(&state).recording = false;
                break;
            }
        }
    }
}

/// Submit the finalized transcript for analysis and render the result.
///
/// The `processing` flag gates a new recording until the analysis response
/// is in; there is no cancellation of an in-flight analysis call.
async fn process_transcript(
    state: &Arc<Mutex<CallState>>,
    backend: &BackendClient,
    phone_number: &str,
    transcript: &str,
) {
    lock(state).processing = true;
    display::notice("Processing transcript...");

    match backend.analyze_speech(transcript, phone_number).await {
        Ok(analysis) => display::analysis(&analysis),
        Err(e) => {
            error!("Speech analysis failed: {}", e);
            display::notice("Error analyzing speech.");
        }
    }

    if let Err(e) = storage::save_transcript(phone_number, transcript) {
        warn!("Could not save call transcript: {}", e);
    }

    lock(state).processing = false;
}
