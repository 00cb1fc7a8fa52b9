//! Application configuration
//!
//! Defaults are embedded from config.toml at build time; environment
//! variables override them at startup. The speech service API key is never
//! part of the embedded config and comes only from the environment.

use crate::error::AppError;
use serde::Deserialize;
use std::env;

/// Application configuration
#[derive(Debug, Deserialize)]
pub struct Config {
    pub backend: BackendConfig,
    pub speech: SpeechConfig,
}

/// Backend analysis service configuration
#[derive(Debug, Deserialize)]
pub struct BackendConfig {
    /// Endpoint root for the four collaborator endpoints
    pub base_url: String,
}

/// Realtime transcription service configuration
#[derive(Debug, Deserialize)]
pub struct SpeechConfig {
    /// WebSocket URL of the transcription service
    pub service_url: String,
    /// Language hint, empty for service-side detection
    #[serde(default = "default_language")]
    pub language: String,
    /// Capture sample rate in Hz
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,
}

fn default_language() -> String {
    "en".to_string()
}

fn default_sample_rate() -> u32 {
    crate::audio::SERVICE_SAMPLE_RATE
}

/// Load configuration from the embedded config.toml plus environment
/// overrides
pub fn load() -> Result<Config, AppError> {
    const CONFIG_TOML: &str = include_str!("../config.toml");
    let mut config: Config =
        toml::from_str(CONFIG_TOML).map_err(|e| AppError::Config(e.to_string()))?;
    apply_overrides(&mut config, |key| env::var(key).ok());
    Ok(config)
}

/// The speech service API key, from the environment only
pub fn speech_api_key() -> String {
    env::var("CALLASSIST_SPEECH_API_KEY").unwrap_or_default()
}

/// Apply environment-style overrides from a lookup function
fn apply_overrides(config: &mut Config, get: impl Fn(&str) -> Option<String>) {
    if let Some(value) = get("CALLASSIST_BACKEND_URL") {
        config.backend.base_url = value;
    }
    if let Some(value) = get("CALLASSIST_SPEECH_URL") {
        config.speech.service_url = value;
    }
    if let Some(value) = get("CALLASSIST_LANGUAGE") {
        config.speech.language = value;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parsed_defaults() -> Config {
        toml::from_str(include_str!("../config.toml")).expect("embedded config must parse")
    }

    #[test]
    fn test_embedded_config_parses() {
        let config = parsed_defaults();
        assert!(!config.backend.base_url.is_empty());
        assert!(config.speech.service_url.starts_with("ws"));
        assert_eq!(config.speech.sample_rate, 16000);
    }

    #[test]
    fn test_overrides_take_precedence() {
        let mut config = parsed_defaults();
        apply_overrides(&mut config, |key| match key {
            "CALLASSIST_BACKEND_URL" => Some("http://backend.test".to_string()),
            "CALLASSIST_LANGUAGE" => Some("no".to_string()),
            _ => None,
        });
        assert_eq!(config.backend.base_url, "http://backend.test");
        assert_eq!(config.speech.language, "no");
        // Untouched keys keep their embedded defaults
        assert!(config.speech.service_url.starts_with("ws"));
    }

    #[test]
    fn test_missing_optional_keys_use_defaults() {
        let config: Config = toml::from_str(
            r#"
            [backend]
            base_url = "http://localhost:8000"

            [speech]
            service_url = "wss://stt.test/stream"
            "#,
        )
        .expect("config must parse");
        assert_eq!(config.speech.language, "en");
        assert_eq!(config.speech.sample_rate, 16000);
    }
}
