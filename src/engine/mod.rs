//! Realtime capture engine
//!
//! Production implementation of the speech capture capability: each engine
//! session is one WebSocket connection to the realtime transcription
//! service, fed by live microphone audio. Sessions are deliberately dumb —
//! the service or the transport may end one at any time, and the capture
//! controller owns the restart policy.

mod messages;

use crate::audio::{self, AudioCaptureHandle, AudioChunk};
use crate::capture::{
    CaptureError, EngineEvent, EngineSession, RecognizedSegment, SessionControl,
    SpeechCaptureEngine,
};
use async_trait::async_trait;
use base64::Engine as _;
use futures_util::{SinkExt, StreamExt};
use messages::{ClientMessage, ServerMessage, SessionConfig};
use rand::Rng;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{interval, timeout};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, trace, warn};
use zeroize::Zeroize;

/// WebSocket connection timeout
const WS_CONNECT_TIMEOUT: Duration = Duration::from_secs(15);

/// Ping interval to keep WebSocket connections alive
const PING_INTERVAL: Duration = Duration::from_secs(30);

/// How long to wait for the service to confirm a requested session end
/// before tearing the session down anyway
const SESSION_END_GRACE: Duration = Duration::from_secs(5);

/// Configuration for the realtime engine
#[derive(Debug, Clone)]
pub struct RealtimeEngineConfig {
    /// WebSocket URL of the transcription service
    pub service_url: String,
    /// API key sent on the connection request
    pub api_key: String,
    /// Language hint, empty for service-side detection
    pub language: String,
    /// Capture sample rate in Hz
    pub sample_rate: u32,
}

/// Speech capture engine backed by the realtime transcription service
pub struct RealtimeSpeechEngine {
    config: RealtimeEngineConfig,
}

impl RealtimeSpeechEngine {
    pub fn new(config: RealtimeEngineConfig) -> Self {
        Self { config }
    }
}

impl Drop for RealtimeSpeechEngine {
    fn drop(&mut self) {
        // Clear API key from memory
        self.config.api_key.zeroize();
    }
}

#[async_trait]
impl SpeechCaptureEngine for RealtimeSpeechEngine {
    fn is_available(&self) -> bool {
        !self.config.service_url.is_empty()
            && !self.config.api_key.is_empty()
            && audio::has_input_device()
    }

    async fn open_session(&self) -> Result<EngineSession, CaptureError> {
        // No session without a microphone
        let (audio_handle, audio_rx) = audio::start_capture(self.config.sample_rate)?;

        let request = match build_ws_request(&self.config.service_url, &self.config.api_key) {
            Ok(request) => request,
            Err(e) => {
                stop_capture(audio_handle);
                return Err(CaptureError::ConnectionError(e));
            }
        };

        info!(url = %self.config.service_url, "Connecting to transcription service");
        let mut ws_stream =
            match timeout(WS_CONNECT_TIMEOUT, connect_async(request)).await {
                Ok(Ok((stream, _response))) => stream,
                Ok(Err(e)) => {
                    stop_capture(audio_handle);
                    return Err(CaptureError::ConnectionError(e.to_string()));
                }
                Err(_) => {
                    stop_capture(audio_handle);
                    return Err(CaptureError::ConnectionTimeout);
                }
            };

        let session_id = generate_session_id();
        let language = if self.config.language.is_empty() {
            None
        } else {
            Some(self.config.language.as_str())
        };
        let begin = ClientMessage::SessionBegin {
            session: SessionConfig::new(session_id.clone(), self.config.sample_rate, language),
        };
        let json = serde_json::to_string(&begin)
            .map_err(|e| CaptureError::Engine(e.to_string()))?;
        if let Err(e) = ws_stream.send(Message::Text(json)).await {
            stop_capture(audio_handle);
            return Err(CaptureError::ConnectionError(e.to_string()));
        }
        info!(session_id = %session_id, "Transcription session opened");

        let (event_tx, event_rx) = mpsc::channel(64);
        let control = SessionControl::new();
        tokio::spawn(run_session(
            ws_stream,
            audio_rx,
            audio_handle,
            control.clone(),
            event_tx,
        ));

        Ok(EngineSession {
            events: event_rx,
            control,
        })
    }
}

/// Drive one live session until the service, the transport or the caller
/// ends it, then emit the terminal event.
async fn run_session(
    ws_stream: tokio_tungstenite::WebSocketStream<
        tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
    >,
    audio_rx: mpsc::Receiver<AudioChunk>,
    audio_handle: AudioCaptureHandle,
    control: SessionControl,
    event_tx: mpsc::Sender<EngineEvent>,
) {
    let (ws_sink, mut ws_source) = ws_stream.split();

    let send_task = tokio::spawn(run_send_loop(ws_sink, audio_rx, control.clone()));

    // Once an end is requested the service gets a grace period to flush
    // remaining finals and confirm with session.ended.
    let end_deadline = async {
        control.end_requested().await;
        tokio::time::sleep(SESSION_END_GRACE).await;
    };
    tokio::pin!(end_deadline);

    let mut failure: Option<String> = None;
    loop {
        tokio::select! {
            _ = &mut end_deadline => {
                warn!("Service did not confirm session end in time, closing");
                break;
            }
            msg = ws_source.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        match serde_json::from_str::<ServerMessage>(&text) {
                            Ok(ServerMessage::TranscriptResults { result_index, segments }) => {
                                trace!(result_index, count = segments.len(), "Transcript results");
                                let segments = segments
                                    .into_iter()
                                    .map(|s| {
                                        if s.is_final {
                                            RecognizedSegment::final_text(s.text)
                                        } else {
                                            RecognizedSegment::interim_text(s.text)
                                        }
                                    })
                                    .collect();
                                if event_tx
                                    .send(EngineEvent::Results { result_index, segments })
                                    .await
                                    .is_err()
                                {
                                    break;
                                }
                            }
                            Ok(ServerMessage::SessionBegan { .. }) => {
                                debug!("Service acknowledged session");
                            }
                            Ok(ServerMessage::SessionEnded) => {
                                info!("Service ended the session");
                                break;
                            }
                            Ok(ServerMessage::Error { error }) => {
                                let message = error
                                    .and_then(|e| e.message)
                                    .unwrap_or_else(|| "unspecified service error".to_string());
                                failure = Some(message);
                                break;
                            }
                            Ok(ServerMessage::Other) => {}
                            Err(e) => {
                                warn!("Failed to parse service message: {} - {}", e, text);
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        // The service terminates idle sessions with a plain
                        // close; that is an end-of-session, not a failure.
                        info!("Transcription connection closed");
                        break;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        failure = Some(e.to_string());
                        break;
                    }
                }
            }
        }
    }

    send_task.abort();
    stop_capture(audio_handle);

    let terminal = match failure {
        Some(message) => EngineEvent::Failed { message },
        None => EngineEvent::Ended,
    };
    let _ = event_tx.send(terminal).await;
}

/// Forward audio chunks to the service until the session winds down
async fn run_send_loop(
    mut ws_sink: impl SinkExt<Message, Error = tokio_tungstenite::tungstenite::Error>
        + Unpin
        + Send
        + 'static,
    mut audio_rx: mpsc::Receiver<AudioChunk>,
    control: SessionControl,
) {
    let mut ping_interval = interval(PING_INTERVAL);
    ping_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    let mut chunks_sent = 0u64;

    loop {
        tokio::select! {
            biased;

            _ = control.end_requested() => {
                debug!("Session end requested, flushing");
                let end = ClientMessage::SessionEnd;
                if let Ok(json) = serde_json::to_string(&end) {
                    let _ = ws_sink.send(Message::Text(json)).await;
                }
                return;
            }
            _ = ping_interval.tick() => {
                if ws_sink.send(Message::Ping(vec![])).await.is_err() {
                    warn!("Failed to send keepalive ping");
                    return;
                }
            }
            chunk = audio_rx.recv() => {
                let Some(chunk) = chunk else {
                    debug!("Audio channel closed after {} chunks", chunks_sent);
                    return;
                };
                chunks_sent += 1;
                if chunks_sent == 1 {
                    info!(samples = chunk.samples.len(), "Streaming audio to the service");
                }
                let msg = ClientMessage::audio(&chunk);
                let Ok(json) = serde_json::to_string(&msg) else { continue };
                if ws_sink.send(Message::Text(json)).await.is_err() {
                    warn!("Failed to send audio chunk, stopping send loop");
                    return;
                }
            }
        }
    }
}

/// Stop microphone capture without blocking the async runtime.
///
/// `AudioCaptureHandle::stop` joins the capture thread.
fn stop_capture(mut handle: AudioCaptureHandle) {
    tokio::task::spawn_blocking(move || handle.stop());
}

/// Build the WebSocket upgrade request with bearer authentication
fn build_ws_request(ws_url: &str, api_key: &str) -> Result<http::Request<()>, String> {
    let parsed = url::Url::parse(ws_url).map_err(|e| e.to_string())?;
    let host = parsed
        .host_str()
        .ok_or_else(|| "Invalid URL: no host".to_string())?
        .to_string();

    http::Request::builder()
        .uri(ws_url)
        .header("Host", host)
        .header("Authorization", format!("Bearer {}", api_key))
        .header("Upgrade", "websocket")
        .header("Connection", "Upgrade")
        .header("Sec-WebSocket-Key", generate_ws_key())
        .header("Sec-WebSocket-Version", "13")
        .body(())
        .map_err(|e| e.to_string())
}

/// Generate a random WebSocket key
fn generate_ws_key() -> String {
    let mut key = [0u8; 16];
    rand::thread_rng().fill(&mut key);
    base64::engine::general_purpose::STANDARD.encode(key)
}

/// Generate a client session id for service-side correlation
fn generate_session_id() -> String {
    let mut rng = rand::thread_rng();
    (0..16)
        .map(|_| rng.sample(rand::distributions::Alphanumeric) as char)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ws_request_carries_auth_and_upgrade_headers() {
        let request =
            build_ws_request("wss://stt.example.com/v1/stream", "secret").expect("request failed");
        assert_eq!(request.uri().to_string(), "wss://stt.example.com/v1/stream");

        let header = |name: &str| {
            request
                .headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default()
                .to_string()
        };
        assert_eq!(header("Authorization"), "Bearer secret");
        assert_eq!(header("Host"), "stt.example.com");
        assert_eq!(header("Upgrade"), "websocket");
        assert!(!header("Sec-WebSocket-Key").is_empty());
    }

    #[test]
    fn test_ws_request_rejects_invalid_url() {
        assert!(build_ws_request("not a url", "secret").is_err());
    }

    #[test]
    fn test_session_ids_are_distinct() {
        let a = generate_session_id();
        let b = generate_session_id();
        assert_eq!(a.len(), 16);
        assert_ne!(a, b);
    }
}
