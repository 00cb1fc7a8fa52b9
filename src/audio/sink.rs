//! Sample processing between the device callback and the chunk channel

use super::types::AudioChunk;
use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};
use tokio::sync::mpsc;
use tracing::{error, warn};

/// Samples fed to the resampler per pass
const RESAMPLER_INPUT_LEN: usize = 1024;

/// Accumulates device samples, mixes to mono, resamples to the service rate
/// and emits fixed-size chunks.
///
/// Lives inside the cpal data callback; all work here must stay cheap and
/// non-blocking, hence `try_send` on the chunk channel.
pub(super) struct SampleSink {
    channels: usize,
    target_rate: u32,
    chunk_len: usize,
    pending: Vec<f32>,
    resampler: Option<SincFixedIn<f32>>,
    out: Vec<i16>,
    tx: mpsc::Sender<AudioChunk>,
}

impl SampleSink {
    pub(super) fn new(
        channels: usize,
        device_rate: u32,
        target_rate: u32,
        tx: mpsc::Sender<AudioChunk>,
    ) -> Result<Self, rubato::ResamplerConstructionError> {
        let resampler = if device_rate == target_rate {
            None
        } else {
            let params = SincInterpolationParameters {
                sinc_len: 128,
                f_cutoff: 0.95,
                interpolation: SincInterpolationType::Linear,
                oversampling_factor: 128,
                window: WindowFunction::BlackmanHarris2,
            };
            Some(SincFixedIn::new(
                target_rate as f64 / device_rate as f64,
                2.0,
                params,
                RESAMPLER_INPUT_LEN,
                1,
            )?)
        };

        Ok(Self {
            channels,
            target_rate,
            // 100ms of audio per chunk
            chunk_len: (target_rate / 10) as usize,
            pending: Vec::new(),
            resampler,
            out: Vec::new(),
            tx,
        })
    }

    /// Feed interleaved f32 frames from the device callback
    pub(super) fn push_f32(&mut self, data: &[f32]) {
        if self.channels > 1 {
            self.pending.extend(
                data.chunks(self.channels)
                    .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32),
            );
        } else {
            self.pending.extend_from_slice(data);
        }
        self.drain();
    }

    /// Feed interleaved i16 frames from the device callback
    pub(super) fn push_i16(&mut self, data: &[i16]) {
        let as_f32: Vec<f32> = data.iter().map(|&s| s as f32 / 32768.0).collect();
        self.push_f32(&as_f32);
    }

    fn drain(&mut self) {
        match self.resampler {
            Some(ref mut resampler) => {
                while self.pending.len() >= RESAMPLER_INPUT_LEN {
                    let input: Vec<f32> = self.pending.drain(..RESAMPLER_INPUT_LEN).collect();
                    match resampler.process(&[input], None) {
                        Ok(resampled) => {
                            self.out.extend(
                                resampled[0]
                                    .iter()
                                    .map(|&s| (s.clamp(-1.0, 1.0) * 32767.0) as i16),
                            );
                        }
                        Err(e) => error!("Resampling error: {}", e),
                    }
                }
            }
            None => {
                self.out.extend(
                    self.pending
                        .drain(..)
                        .map(|s| (s.clamp(-1.0, 1.0) * 32767.0) as i16),
                );
            }
        }

        while self.out.len() >= self.chunk_len {
            let chunk = AudioChunk {
                samples: self.out.drain(..self.chunk_len).collect(),
                sample_rate: self.target_rate,
            };
            if let Err(e) = self.tx.try_send(chunk) {
                warn!("Audio buffer overflow - chunk dropped: {}", e);
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stereo_is_mixed_to_mono_without_resampling() {
        let (tx, mut rx) = mpsc::channel(8);
        let mut sink = SampleSink::new(2, 16000, 16000, tx).expect("sink setup failed");

        // One chunk is 1600 mono samples at 16kHz
        let frames: Vec<f32> = (0..1600).flat_map(|_| [0.5f32, -0.5f32]).collect();
        sink.push_f32(&frames);

        let chunk = rx.try_recv().expect("expected a full chunk");
        assert_eq!(chunk.samples.len(), 1600);
        assert_eq!(chunk.sample_rate, 16000);
        // 0.5 and -0.5 average to silence
        assert!(chunk.samples.iter().all(|&s| s == 0));
    }

    #[test]
    fn test_partial_chunks_are_held_back() {
        let (tx, mut rx) = mpsc::channel(8);
        let mut sink = SampleSink::new(1, 16000, 16000, tx).expect("sink setup failed");

        sink.push_f32(&vec![0.1f32; 1000]);
        assert!(rx.try_recv().is_err());

        sink.push_f32(&vec![0.1f32; 600]);
        assert!(rx.try_recv().is_ok());
    }

    #[test]
    fn test_i16_input_round_trips_amplitude() {
        let (tx, mut rx) = mpsc::channel(8);
        let mut sink = SampleSink::new(1, 16000, 16000, tx).expect("sink setup failed");

        sink.push_i16(&vec![16384i16; 1600]);
        let chunk = rx.try_recv().expect("expected a full chunk");
        assert!(chunk.samples.iter().all(|&s| (s - 16383).abs() <= 1));
    }

    #[test]
    fn test_downsampling_produces_proportional_output() {
        let (tx, mut rx) = mpsc::channel(64);
        let mut sink = SampleSink::new(1, 48000, 16000, tx).expect("sink setup failed");

        // 3 seconds at 48kHz resample to roughly 3 seconds at 16kHz,
        // minus resampler latency and the held-back partial chunk
        sink.push_f32(&vec![0.0f32; 48000 * 3]);

        let mut total = 0usize;
        while let Ok(chunk) = rx.try_recv() {
            assert_eq!(chunk.sample_rate, 16000);
            total += chunk.samples.len();
        }
        assert!(total > 40000, "too few resampled samples: {}", total);
        assert!(total <= 48000, "too many resampled samples: {}", total);
    }
}
