#![deny(clippy::all)]

mod audio;
mod backend;
mod capture;
mod config;
mod display;
mod engine;
mod error;
mod session;
mod storage;

use backend::BackendClient;
use capture::CaptureController;
use engine::{RealtimeEngineConfig, RealtimeSpeechEngine};
use session::CallSession;
use std::io::Write;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env before anything reads the environment
    dotenvy::dotenv().ok();

    // Initialize tracing for structured logging
    tracing_subscriber::fmt::init();

    let config = config::load()?;
    info!(backend = %config.backend.base_url, "Configuration loaded");

    let backend = Arc::new(BackendClient::new(&config.backend.base_url)?);

    let engine = Arc::new(RealtimeSpeechEngine::new(RealtimeEngineConfig {
        service_url: config.speech.service_url.clone(),
        api_key: config::speech_api_key(),
        language: config.speech.language.clone(),
        sample_rate: config.speech.sample_rate,
    }));
    let controller = Arc::new(CaptureController::new(engine));

    let session = CallSession::new(backend, controller);

    display::banner();
    run_command_loop(&session).await
}

/// Read commands from stdin until quit or end of input
async fn run_command_loop(session: &CallSession) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let input = line.trim();

        match input.split_once(' ').unwrap_or((input, "")) {
            ("lookup", phone) if !phone.trim().is_empty() => {
                session.lookup(phone.trim()).await;
            }
            ("lookup", _) => display::notice("usage: lookup <phone>"),
            ("record", _) => session.toggle_recording(),
            ("recs", _) => session.recommendations().await,
            ("summary", _) => session.post_call_analysis().await,
            ("help", _) => display::notice(display::help_text()),
            ("quit", _) | ("exit", _) => break,
            ("", _) => {}
            (other, _) => {
                display::notice(&format!("Unknown command: {} (try 'help')", other));
            }
        }
    }

    info!("Exiting");
    Ok(())
}
