//! Client for the backend analysis service
//!
//! JSON over HTTP against a single configurable endpoint root. All four
//! collaborator endpoints are `POST`; none are retried automatically —
//! failures surface to the caller and the user may simply re-attempt.

mod types;

pub use types::CustomerRecord;

use crate::error::BackendError;
use anyhow::Context;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use tracing::{info, instrument};
use types::{
    AnalysisResponse, AnalyzeSpeechRequest, ErrorDetail, PhoneNumberRequest,
    PostCallAnalysisResponse, RecommendationsResponse,
};

/// Client for the call-assistance backend
pub struct BackendClient {
    base_url: String,
    client: reqwest::Client,
}

impl BackendClient {
    /// Create a new backend client for the given endpoint root
    pub fn new(base_url: &str) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .context("Failed to create HTTP client for BackendClient")?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    /// Look up a customer by phone number.
    ///
    /// On a non-2xx response the server's `detail` message is carried in the
    /// returned error so it can be shown to the user verbatim.
    #[instrument(skip(self))]
    pub async fn lookup_customer(
        &self,
        phone_number: &str,
    ) -> Result<CustomerRecord, BackendError> {
        let body = PhoneNumberRequest {
            phone_number: phone_number.to_string(),
        };
        let record: CustomerRecord = self.post("/lookup-customer", &body).await?;
        info!(customer = %record.customer_name, "Customer found");
        Ok(record)
    }

    /// Submit a finalized transcript for analysis
    #[instrument(skip(self, text_data), fields(transcript_len = text_data.len()))]
    pub async fn analyze_speech(
        &self,
        text_data: &str,
        phone_number: &str,
    ) -> Result<String, BackendError> {
        let body = AnalyzeSpeechRequest {
            text_data: text_data.to_string(),
            phone_number: phone_number.to_string(),
        };
        let response: AnalysisResponse = self.post("/analyze-speech", &body).await?;
        Ok(response.analysis)
    }

    /// Fetch negotiation recommendations for the customer's latest interaction
    #[instrument(skip(self))]
    pub async fn get_recommendations(
        &self,
        phone_number: &str,
    ) -> Result<Vec<String>, BackendError> {
        let body = PhoneNumberRequest {
            phone_number: phone_number.to_string(),
        };
        let response: RecommendationsResponse = self.post("/get-recommendations", &body).await?;
        Ok(response.recommendations)
    }

    /// Fetch the post-call summary for the customer's latest interaction
    #[instrument(skip(self))]
    pub async fn post_call_analysis(&self, phone_number: &str) -> Result<String, BackendError> {
        let body = PhoneNumberRequest {
            phone_number: phone_number.to_string(),
        };
        let response: PostCallAnalysisResponse = self.post("/post-call-analysis", &body).await?;
        Ok(response.post_call_analysis)
    }

    /// POST a JSON body and decode a JSON response
    async fn post<B, T>(&self, path: &str, body: &B) -> Result<T, BackendError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(error_from_response(status.as_u16(), &body_text));
        }

        response.json::<T>().await.map_err(|e| {
            BackendError::InvalidResponse(format!("Failed to parse response from {}: {}", path, e))
        })
    }
}

/// Map a non-2xx response to an error carrying the server's `detail`
/// message when the body provides one
fn error_from_response(status: u16, body_text: &str) -> BackendError {
    let message = serde_json::from_str::<ErrorDetail>(body_text)
        .ok()
        .and_then(|d| d.detail)
        .unwrap_or_else(|| format!("Request failed with status {}", status));
    BackendError::Server { status, message }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detail_message_is_surfaced() {
        let error = error_from_response(404, r#"{"detail": "Customer not found"}"#);
        let BackendError::Server { status, message } = &error else {
            panic!("expected server error");
        };
        assert_eq!(*status, 404);
        assert_eq!(message, "Customer not found");
        // Display carries the message verbatim for the UI
        assert_eq!(error.to_string(), "Customer not found");
    }

    #[test]
    fn test_missing_detail_falls_back_to_generic_message() {
        let error = error_from_response(500, "internal server error");
        assert_eq!(error.to_string(), "Request failed with status 500");
    }

    #[test]
    fn test_null_detail_falls_back_to_generic_message() {
        let error = error_from_response(422, r#"{"detail": null}"#);
        assert_eq!(error.to_string(), "Request failed with status 422");
    }

    #[test]
    fn test_base_url_trailing_slash_is_normalized() {
        let client = BackendClient::new("http://localhost:8000/").expect("client setup failed");
        assert_eq!(client.base_url, "http://localhost:8000");
    }
}
