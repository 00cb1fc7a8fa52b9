//! Wire messages for the realtime transcription service
//!
//! The service speaks JSON over WebSocket: the client opens a session,
//! streams base64 PCM16 audio, and receives transcript results indexed from
//! the service's low-water mark until the session ends.

use crate::audio::AudioChunk;
use base64::Engine;
use serde::{Deserialize, Serialize};

/// Messages sent to the transcription service
#[derive(Debug, Serialize)]
#[serde(tag = "type")]
pub(crate) enum ClientMessage {
    /// Session configuration, sent once after connecting
    #[serde(rename = "session.begin")]
    SessionBegin { session: SessionConfig },
    /// Append audio to the session's input stream
    #[serde(rename = "audio.append")]
    AudioAppend { audio: String },
    /// Ask the service to flush pending results and end the session
    #[serde(rename = "session.end")]
    SessionEnd,
}

/// Session configuration for the transcription service
#[derive(Debug, Serialize)]
pub(crate) struct SessionConfig {
    /// Client-generated session id, echoed in service logs
    pub session_id: String,
    /// Input audio format (pcm16)
    pub input_audio_format: String,
    /// Input sample rate in Hz
    pub sample_rate: u32,
    /// Optional language hint
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

impl SessionConfig {
    pub fn new(session_id: String, sample_rate: u32, language: Option<&str>) -> Self {
        Self {
            session_id,
            input_audio_format: "pcm16".to_string(),
            sample_rate,
            language: language.map(String::from),
        }
    }
}

impl ClientMessage {
    /// Build an audio append message from a captured chunk
    pub fn audio(chunk: &AudioChunk) -> Self {
        let mut bytes = Vec::with_capacity(chunk.samples.len() * 2);
        for sample in &chunk.samples {
            bytes.extend_from_slice(&sample.to_le_bytes());
        }
        ClientMessage::AudioAppend {
            audio: base64::engine::general_purpose::STANDARD.encode(bytes),
        }
    }
}

/// Messages received from the transcription service
#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
pub(crate) enum ServerMessage {
    /// Session accepted
    #[serde(rename = "session.began")]
    SessionBegan {
        #[allow(dead_code)]
        session_id: Option<String>,
    },
    /// Transcript results starting at the service's low-water mark
    #[serde(rename = "transcript.results")]
    TranscriptResults {
        result_index: usize,
        segments: Vec<WireSegment>,
    },
    /// The service ended the session; no further results follow
    #[serde(rename = "session.ended")]
    SessionEnded,
    /// Service-reported error
    #[serde(rename = "error")]
    Error { error: Option<WireError> },
    /// Catch-all for message types this client does not handle
    #[serde(other)]
    Other,
}

/// One recognized segment on the wire
#[derive(Debug, Deserialize)]
pub(crate) struct WireSegment {
    pub text: String,
    pub is_final: bool,
}

/// Error payload on the wire
#[derive(Debug, Deserialize)]
pub(crate) struct WireError {
    pub message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_begin_serialization() {
        let msg = ClientMessage::SessionBegin {
            session: SessionConfig::new("abc123".to_string(), 16000, Some("en")),
        };
        let json = serde_json::to_string(&msg).expect("Failed to serialize");
        assert!(json.contains("\"type\":\"session.begin\""));
        assert!(json.contains("abc123"));
        assert!(json.contains("pcm16"));
        assert!(json.contains("16000"));
        assert!(json.contains("\"language\":\"en\""));
    }

    #[test]
    fn test_session_begin_omits_absent_language() {
        let msg = ClientMessage::SessionBegin {
            session: SessionConfig::new("abc123".to_string(), 16000, None),
        };
        let json = serde_json::to_string(&msg).expect("Failed to serialize");
        assert!(!json.contains("language"));
    }

    #[test]
    fn test_audio_append_encodes_little_endian_pcm() {
        let chunk = AudioChunk {
            samples: vec![1, -1],
            sample_rate: 16000,
        };
        let msg = ClientMessage::audio(&chunk);
        let ClientMessage::AudioAppend { audio } = &msg else {
            panic!("expected audio.append");
        };
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(audio)
            .expect("Failed to decode");
        assert_eq!(bytes, vec![0x01, 0x00, 0xFF, 0xFF]);
    }

    #[test]
    fn test_transcript_results_deserialization() {
        let json = r#"{
            "type": "transcript.results",
            "result_index": 2,
            "segments": [
                {"text": "hello ", "is_final": true},
                {"text": "wor", "is_final": false}
            ]
        }"#;
        let msg: ServerMessage = serde_json::from_str(json).expect("Failed to deserialize");
        let ServerMessage::TranscriptResults {
            result_index,
            segments,
        } = msg
        else {
            panic!("expected transcript.results");
        };
        assert_eq!(result_index, 2);
        assert_eq!(segments.len(), 2);
        assert!(segments[0].is_final);
        assert_eq!(segments[1].text, "wor");
    }

    #[test]
    fn test_unknown_message_types_are_tolerated() {
        let msg: ServerMessage =
            serde_json::from_str(r#"{"type":"metrics.update","load":0.3}"#)
                .expect("Failed to deserialize");
        assert!(matches!(msg, ServerMessage::Other));
    }

    #[test]
    fn test_error_message_deserialization() {
        let json = r#"{"type":"error","error":{"message":"quota exceeded"}}"#;
        let msg: ServerMessage = serde_json::from_str(json).expect("Failed to deserialize");
        let ServerMessage::Error { error } = msg else {
            panic!("expected error");
        };
        assert_eq!(error.and_then(|e| e.message).as_deref(), Some("quota exceeded"));
    }
}
