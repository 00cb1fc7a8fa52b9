//! Call session management
//!
//! Wires user actions to the capture controller and the backend client:
//! customer lookup, the start/stop recording toggle, and the follow-up
//! requests (recommendations, post-call analysis). Holds the customer and
//! recording/processing flags shared with the capture event handler.

mod events;

use crate::backend::{BackendClient, CustomerRecord};
use crate::capture::CaptureController;
use crate::display;
use crate::error::BackendError;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{error, info};

/// Shared state of the current call
#[derive(Default)]
pub(crate) struct CallState {
    /// Phone number of the selected customer
    customer_phone: Option<String>,
    customer: Option<CustomerRecord>,
    recording: bool,
    processing: bool,
}

impl CallState {
    /// Why a new recording may not start right now, if any reason
    fn deny_start(&self) -> Option<&'static str> {
        if self.customer.is_none() {
            Some("Please look up a customer first.")
        } else if self.processing {
            Some("Analysis of the previous call is still in progress.")
        } else {
            None
        }
    }
}

fn lock(state: &Mutex<CallState>) -> MutexGuard<'_, CallState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Orchestrator for one user-facing call session
pub struct CallSession {
    backend: Arc<BackendClient>,
    controller: Arc<CaptureController>,
    state: Arc<Mutex<CallState>>,
}

impl CallSession {
    pub fn new(backend: Arc<BackendClient>, controller: Arc<CaptureController>) -> Self {
        Self {
            backend,
            controller,
            state: Arc::new(Mutex::new(CallState::default())),
        }
    }

    /// Look up a customer by phone number.
    ///
    /// Any previously selected customer is cleared first; on failure the
    /// selection stays empty and the recording control stays unavailable.
    pub async fn lookup(&self, phone_number: &str) {
        {
            let mut state = lock(&self.state);
            state.customer = None;
            state.customer_phone = None;
        }

        match self.backend.lookup_customer(phone_number).await {
            Ok(record) => {
                display::customer_panel(&record);
                let mut state = lock(&self.state);
                state.customer = Some(record);
                state.customer_phone = Some(phone_number.to_string());
            }
            Err(e) => {
                let message = match &e {
                    // The backend's detail message is meant for the user
                    BackendError::Server { .. } => e.to_string(),
                    _ => {
                        error!("Customer lookup failed: {}", e);
                        "Error looking up customer".to_string()
                    }
                };
                display::notice(&format!("Lookup failed: {}", message));
            }
        }
    }

    /// Start or stop recording, depending on the current state
    pub fn toggle_recording(&self) {
        let (recording, phone, denial) = {
            let state = lock(&self.state);
            (
                state.recording,
                state.customer_phone.clone(),
                state.deny_start(),
            )
        };

        if recording {
            self.controller.request_stop();
            lock(&self.state).recording = false;
            display::notice("Recording stopped.");
            return;
        }

        if let Some(reason) = denial {
            display::notice(reason);
            return;
        }
        let Some(phone) = phone else {
            display::notice("Please look up a customer first.");
            return;
        };

        // Subscribe before begin so no early event is missed
        let event_rx = self.controller.subscribe();
        match self.controller.begin() {
            Ok(()) => {
                lock(&self.state).recording = true;
                info!("Recording started for customer {}", phone);
                display::notice("Recording... enter 'record' again to stop.");
                events::spawn_event_handler(
                    event_rx,
                    self.state.clone(),
                    self.backend.clone(),
                    phone,
                );
            }
            Err(e) => {
                display::notice(&format!("Could not start recording: {}", e));
            }
        }
    }

    /// Fetch and render negotiation recommendations.
    ///
    /// Failures degrade to an empty list; the error is only logged.
    pub async fn recommendations(&self) {
        let Some(phone) = lock(&self.state).customer_phone.clone() else {
            display::notice("Please look up a customer first.");
            return;
        };

        match self.backend.get_recommendations(&phone).await {
            Ok(items) => display::recommendations(&items),
            Err(e) => {
                error!("Failed to fetch recommendations: {}", e);
                display::recommendations(&[]);
            }
        }
    }

    /// Fetch and render the post-call analysis
    pub async fn post_call_analysis(&self) {
        let Some(phone) = lock(&self.state).customer_phone.clone() else {
            display::notice("Please look up a customer first.");
            return;
        };

        match self.backend.post_call_analysis(&phone).await {
            Ok(text) => display::post_call(&text),
            Err(e) => {
                error!("Post-call analysis failed: {}", e);
                display::notice("Failed to retrieve post-call analysis.");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn selected_state() -> CallState {
        CallState {
            customer_phone: Some("555-0100".to_string()),
            customer: Some(CustomerRecord {
                customer_name: "Dana Fields".to_string(),
                email: "dana@example.com".to_string(),
                last_purchase_date: "2026-01-15".to_string(),
                purchase_history: 100.0,
                customer_segment: "Basic".to_string(),
                interaction_history: Vec::new(),
            }),
            recording: false,
            processing: false,
        }
    }

    #[test]
    fn test_start_denied_without_customer() {
        let state = CallState::default();
        assert!(state.deny_start().is_some());
    }

    #[test]
    fn test_start_denied_while_processing() {
        let mut state = selected_state();
        state.processing = true;
        assert_eq!(
            state.deny_start(),
            Some("Analysis of the previous call is still in progress.")
        );
    }

    #[test]
    fn test_start_allowed_with_customer_and_idle_analysis() {
        let state = selected_state();
        assert!(state.deny_start().is_none());
    }
}
