//! # JARVIS Voice - Speech Output and Voice Input
//!
//! Serializes every spoken reply through one worker thread and turns microphone phrases into
//! command text. Built on bare metal Rust (cpal in, rodio or the platform synthesizer out).
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  producers ──enqueue──→ SpeechQueue ──→ jarvis-speech thread │
//! │                                          stop() → render()   │
//! │                                              ↓               │
//! │                              SinkRenderer / SystemSpeech /   │
//! │                              SilentRenderer                  │
//! │                                                              │
//! │  jarvis-listen thread: MicCapture → PhraseDetector → STT ──→ │
//! │                        command text (to the assistant)       │
//! └──────────────────────────────────────────────────────────────┘
//! ```

pub mod capture;
pub mod error;
pub mod listener;
pub mod queue;
pub mod render;
pub mod stt;
pub mod tts;

pub use capture::{CaptureConfig, CapturedPhrase, MicCapture, PhraseDetector, PhraseState};
pub use error::{VoiceError, VoiceResult};
pub use listener::{ListenWorker, MicListener, RetryBackoff};
pub use queue::{SpeechQueue, SpeechQueueState, SpeechTask};
pub use render::{
    create_best_renderer, SilentRenderer, SinkRenderer, SpeechRenderer, SystemSpeechRenderer,
};
pub use stt::{create_best_stt, OpenRouterStt, PlaceholderStt, SttBackend};
#[cfg(feature = "whisper")]
pub use stt::WhisperStt;
pub use tts::{split_for_tts, HttpTts, PlaceholderTts, TtsBackend, TtsSettings};
