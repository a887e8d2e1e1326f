//! Microphone capture of a single spoken phrase.
//!
//! cpal delivers fixed-size chunks from the default input device. A [`PhraseDetector`] watches
//! chunk energy: it waits for speech onset (up to the listen timeout), records while speech
//! continues, and closes the phrase after a trailing silence gap or the phrase limit.
//! The detector counts samples rather than wall-clock time, so it is deterministic under test.

use crate::error::{VoiceError, VoiceResult};
use chrono::{DateTime, Utc};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::StreamConfig;
use std::sync::mpsc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Capture configuration.
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Sample rate in Hz (default 16000, what STT backends expect).
    pub sample_rate: u32,
    /// Chunk size in samples (default 480 = 30ms at 16kHz).
    pub chunk_size: usize,
    /// RMS above this counts as speech.
    pub energy_threshold: f32,
    /// Silence after speech that closes the phrase (default 800ms).
    pub gap: Duration,
    /// Speech shorter than this is treated as noise and dropped.
    pub min_speech: Duration,
    /// How long to wait for speech to begin.
    pub listen_timeout: Duration,
    /// Hard cap on one phrase.
    pub phrase_limit: Duration,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16000,
            chunk_size: 480,
            energy_threshold: 0.02,
            gap: Duration::from_millis(800),
            min_speech: Duration::from_millis(200),
            listen_timeout: Duration::from_secs(5),
            phrase_limit: Duration::from_secs(10),
        }
    }
}

impl CaptureConfig {
    /// Listen timeout and phrase limit from the assistant configuration.
    pub fn from_assistant(config: &jarvis_core::AssistantConfig) -> Self {
        Self {
            listen_timeout: config.listen_timeout(),
            phrase_limit: config.phrase_limit(),
            ..Self::default()
        }
    }

    fn samples_for(&self, d: Duration) -> usize {
        (d.as_secs_f64() * self.sample_rate as f64) as usize
    }
}

/// One recorded phrase: PCM from speech onset until the closing gap.
#[derive(Debug, Clone)]
pub struct CapturedPhrase {
    /// Mono f32 PCM (-1.0..1.0).
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub duration: Duration,
    pub captured_at: DateTime<Utc>,
}

/// Silence → Speech → TrailingSilence → (done) state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhraseState {
    Waiting,
    Speech,
    TrailingSilence,
}

/// What the detector decided after a chunk.
#[derive(Debug, Clone, PartialEq)]
pub enum DetectorStep {
    Continue,
    /// No speech before the listen timeout.
    TimedOut,
    Complete(Vec<f32>),
}

pub struct PhraseDetector {
    config: CaptureConfig,
    state: PhraseState,
    buffer: Vec<f32>,
    waited: usize,
    silence_run: usize,
}

pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    (samples.iter().map(|s| s * s).sum::<f32>() / samples.len() as f32).sqrt()
}

impl PhraseDetector {
    pub fn new(config: CaptureConfig) -> Self {
        Self {
            config,
            state: PhraseState::Waiting,
            buffer: Vec::new(),
            waited: 0,
            silence_run: 0,
        }
    }

    pub fn state(&self) -> PhraseState {
        self.state
    }

    pub fn feed(&mut self, chunk: &[f32]) -> DetectorStep {
        let is_speech = rms(chunk) > self.config.energy_threshold;
        match self.state {
            PhraseState::Waiting => {
                if is_speech {
                    self.state = PhraseState::Speech;
                    self.buffer.extend_from_slice(chunk);
                } else {
                    self.waited += chunk.len();
                    if self.waited >= self.config.samples_for(self.config.listen_timeout) {
                        return DetectorStep::TimedOut;
                    }
                }
            }
            PhraseState::Speech | PhraseState::TrailingSilence => {
                self.buffer.extend_from_slice(chunk);
                if is_speech {
                    self.state = PhraseState::Speech;
                    self.silence_run = 0;
                } else {
                    self.state = PhraseState::TrailingSilence;
                    self.silence_run += chunk.len();
                }
                let gap_reached = self.silence_run >= self.config.samples_for(self.config.gap);
                let limit_reached =
                    self.buffer.len() >= self.config.samples_for(self.config.phrase_limit);
                if gap_reached || limit_reached {
                    return self.finish();
                }
            }
        }
        DetectorStep::Continue
    }

    fn finish(&mut self) -> DetectorStep {
        let spoken = self.buffer.len().saturating_sub(self.silence_run);
        let samples = std::mem::take(&mut self.buffer);
        self.state = PhraseState::Waiting;
        self.silence_run = 0;
        if spoken < self.config.samples_for(self.config.min_speech) {
            debug!(target: "jarvis::listen", spoken, "speech too short; ignoring");
            return DetectorStep::TimedOut;
        }
        DetectorStep::Complete(samples)
    }
}

/// Default-input-device capture.
pub struct MicCapture {
    config: CaptureConfig,
}

impl MicCapture {
    pub fn new(config: CaptureConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CaptureConfig {
        &self.config
    }

    /// Record one phrase. `Ok(None)` when nobody spoke in time. Blocks the calling thread.
    pub fn record_phrase(&self) -> VoiceResult<Option<CapturedPhrase>> {
        let device = cpal::default_host()
            .default_input_device()
            .ok_or_else(|| VoiceError::AudioDevice("No input device available".to_string()))?;
        debug!(
            target: "jarvis::listen",
            device = %device.name().unwrap_or_else(|_| "Unknown".to_string()),
            "using input device"
        );

        let stream_config = StreamConfig {
            channels: 1,
            sample_rate: cpal::SampleRate(self.config.sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        let chunk_size = self.config.chunk_size;
        let (chunk_tx, chunk_rx) = mpsc::channel::<Vec<f32>>();
        let mut pending = Vec::with_capacity(chunk_size);
        let stream = device.build_input_stream(
            &stream_config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                for &sample in data {
                    pending.push(sample);
                    if pending.len() >= chunk_size {
                        // Receiver gone means the phrase is finished.
                        let _ = chunk_tx.send(std::mem::replace(
                            &mut pending,
                            Vec::with_capacity(chunk_size),
                        ));
                    }
                }
            },
            move |err| {
                warn!(target: "jarvis::listen", error = %err, "audio stream error");
            },
            None,
        )?;
        stream.play()?;

        let mut detector = PhraseDetector::new(self.config.clone());
        let deadline = self.config.listen_timeout + self.config.phrase_limit + Duration::from_secs(1);
        let started = std::time::Instant::now();
        loop {
            let remaining = deadline.saturating_sub(started.elapsed());
            let chunk = match chunk_rx.recv_timeout(remaining) {
                Ok(chunk) => chunk,
                Err(mpsc::RecvTimeoutError::Timeout) => return Ok(None),
                Err(mpsc::RecvTimeoutError::Disconnected) => {
                    return Err(VoiceError::AudioStream("capture stream closed".to_string()))
                }
            };
            match detector.feed(&chunk) {
                DetectorStep::Continue => {}
                DetectorStep::TimedOut => return Ok(None),
                DetectorStep::Complete(samples) => {
                    let duration = Duration::from_secs_f64(
                        samples.len() as f64 / self.config.sample_rate as f64,
                    );
                    info!(
                        target: "jarvis::listen",
                        secs = duration.as_secs_f32(),
                        "phrase captured"
                    );
                    return Ok(Some(CapturedPhrase {
                        samples,
                        sample_rate: self.config.sample_rate,
                        duration,
                        captured_at: Utc::now(),
                    }));
                }
            }
        }
    }

    /// Names of the available input devices.
    pub fn list_input_devices() -> VoiceResult<Vec<String>> {
        let host = cpal::default_host();
        Ok(host
            .input_devices()?
            .filter_map(|d| d.name().ok())
            .collect())
    }
}
