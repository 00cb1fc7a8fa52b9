//! Microphone capture using cpal
//!
//! Captures audio from the default input device on a dedicated thread,
//! mixes to mono and resamples to the speech service rate. Chunks arrive on
//! a bounded channel sized for several seconds of backlog.

mod sink;
mod types;

pub use types::{AudioCaptureError, AudioCaptureHandle, AudioChunk};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::SampleFormat;
use sink::SampleSink;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{error, info};

/// Sample rate expected by the speech service (16kHz PCM16 mono)
pub const SERVICE_SAMPLE_RATE: u32 = 16000;

/// Whether any audio input device is present
pub fn has_input_device() -> bool {
    cpal::default_host().default_input_device().is_some()
}

/// Start audio capture on a dedicated thread
///
/// Returns a handle used to stop the capture and a receiver of audio chunks
/// resampled to `target_sample_rate`.
pub fn start_capture(
    target_sample_rate: u32,
) -> Result<(AudioCaptureHandle, mpsc::Receiver<AudioChunk>), AudioCaptureError> {
    let is_capturing = Arc::new(AtomicBool::new(true));
    let capture_flag = is_capturing.clone();

    let (chunk_tx, chunk_rx) = mpsc::channel(600);

    let thread_handle = thread::spawn(move || {
        if let Err(e) = run_capture(capture_flag, chunk_tx, target_sample_rate) {
            error!("Audio capture error: {}", e);
        }
    });

    Ok((
        AudioCaptureHandle {
            is_capturing,
            thread_handle: Some(thread_handle),
        },
        chunk_rx,
    ))
}

/// Run the capture stream on the current thread until stopped
fn run_capture(
    is_capturing: Arc<AtomicBool>,
    chunk_tx: mpsc::Sender<AudioChunk>,
    target_sample_rate: u32,
) -> Result<(), AudioCaptureError> {
    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .ok_or(AudioCaptureError::NoInputDevice)?;

    let device_name = device.name().unwrap_or_else(|_| "Unknown".to_string());
    let supported = device.default_input_config()?;
    let sample_format = supported.sample_format();
    let config: cpal::StreamConfig = supported.into();

    info!(
        device = %device_name,
        device_rate = config.sample_rate.0,
        channels = config.channels,
        target_rate = target_sample_rate,
        "Starting audio capture"
    );

    let mut sample_sink = SampleSink::new(
        config.channels as usize,
        config.sample_rate.0,
        target_sample_rate,
        chunk_tx,
    )
    .map_err(|e| AudioCaptureError::Resampler(e.to_string()))?;

    let err_fn = |e| error!("Audio stream error: {}", e);
    let stream = match sample_format {
        SampleFormat::F32 => device.build_input_stream(
            &config,
            move |data: &[f32], _| sample_sink.push_f32(data),
            err_fn,
            None,
        )?,
        SampleFormat::I16 => device.build_input_stream(
            &config,
            move |data: &[i16], _| sample_sink.push_i16(data),
            err_fn,
            None,
        )?,
        other => {
            return Err(AudioCaptureError::UnsupportedFormat(format!("{:?}", other)));
        }
    };

    stream.play()?;

    // The stream lives as long as this thread does
    while is_capturing.load(Ordering::SeqCst) {
        thread::sleep(Duration::from_millis(50));
    }

    drop(stream);
    Ok(())
}
