//! Request and response bodies for the backend collaborator

use serde::{Deserialize, Serialize};

/// Customer record returned by `/lookup-customer`
#[derive(Debug, Clone, Deserialize)]
pub struct CustomerRecord {
    pub customer_name: String,
    pub email: String,
    pub last_purchase_date: String,
    /// Lifetime purchase value
    pub purchase_history: f64,
    pub customer_segment: String,
    #[serde(default)]
    pub interaction_history: Vec<String>,
}

/// Request body for endpoints keyed by phone number
#[derive(Debug, Serialize)]
pub(crate) struct PhoneNumberRequest {
    pub phone_number: String,
}

/// Request body for `/analyze-speech`
#[derive(Debug, Serialize)]
pub(crate) struct AnalyzeSpeechRequest {
    pub text_data: String,
    pub phone_number: String,
}

/// Response body for `/analyze-speech`
#[derive(Debug, Deserialize)]
pub(crate) struct AnalysisResponse {
    pub analysis: String,
}

/// Response body for `/get-recommendations`
#[derive(Debug, Deserialize)]
pub(crate) struct RecommendationsResponse {
    #[serde(default)]
    pub recommendations: Vec<String>,
}

/// Response body for `/post-call-analysis`
#[derive(Debug, Deserialize)]
pub(crate) struct PostCallAnalysisResponse {
    pub post_call_analysis: String,
}

/// Error body shape used by the backend on non-2xx responses
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorDetail {
    pub detail: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_customer_record_deserialization() {
        let json = r#"{
            "customer_name": "Dana Fields",
            "email": "dana@example.com",
            "last_purchase_date": "2026-01-15",
            "purchase_history": 2350.0,
            "customer_segment": "Premium",
            "interaction_history": ["[2026-01-20 10:00:00] asked about pricing"]
        }"#;
        let record: CustomerRecord = serde_json::from_str(json).expect("Failed to deserialize");
        assert_eq!(record.customer_name, "Dana Fields");
        assert_eq!(record.customer_segment, "Premium");
        assert_eq!(record.interaction_history.len(), 1);
    }

    #[test]
    fn test_customer_record_tolerates_missing_history() {
        let json = r#"{
            "customer_name": "Dana Fields",
            "email": "dana@example.com",
            "last_purchase_date": "2026-01-15",
            "purchase_history": 100.0,
            "customer_segment": "Basic"
        }"#;
        let record: CustomerRecord = serde_json::from_str(json).expect("Failed to deserialize");
        assert!(record.interaction_history.is_empty());
    }

    #[test]
    fn test_analyze_request_serialization() {
        let request = AnalyzeSpeechRequest {
            text_data: "the delivery was late".to_string(),
            phone_number: "555-0100".to_string(),
        };
        let json = serde_json::to_string(&request).expect("Failed to serialize");
        assert!(json.contains("\"text_data\":\"the delivery was late\""));
        assert!(json.contains("\"phone_number\":\"555-0100\""));
    }

    #[test]
    fn test_recommendations_default_to_empty() {
        let response: RecommendationsResponse =
            serde_json::from_str("{}").expect("Failed to deserialize");
        assert!(response.recommendations.is_empty());
    }
}
