//! **Speech-to-Text (STT)**: turn a [`CapturedPhrase`] into command text.
//!
//! Implement `SttBackend` for local Whisper (e.g. whisper-rs) or a remote transcription API.

use crate::capture::CapturedPhrase;
use crate::error::{VoiceError, VoiceResult};

/// Backend for converting PCM to text.
pub trait SttBackend: Send + Sync {
    /// Transcribe one phrase (mono f32). Empty string when nothing was recognized.
    fn transcribe(&self, phrase: &CapturedPhrase) -> VoiceResult<String>;

    fn name(&self) -> &'static str;
}

/// Encode f32 PCM (mono) to 16-bit WAV bytes for API upload.
pub fn pcm_f32_to_wav(samples: &[f32], sample_rate: u32) -> Vec<u8> {
    let data_len = (samples.len() * 2) as u32;
    let mut buf = Vec::with_capacity(44 + data_len as usize);
    buf.extend_from_slice(b"RIFF");
    buf.extend_from_slice(&(36 + data_len).to_le_bytes());
    buf.extend_from_slice(b"WAVE");
    buf.extend_from_slice(b"fmt ");
    buf.extend_from_slice(&16u32.to_le_bytes());
    buf.extend_from_slice(&1u16.to_le_bytes()); // PCM
    buf.extend_from_slice(&1u16.to_le_bytes()); // mono
    buf.extend_from_slice(&sample_rate.to_le_bytes());
    buf.extend_from_slice(&(sample_rate * 2).to_le_bytes()); // byte rate
    buf.extend_from_slice(&2u16.to_le_bytes()); // block align
    buf.extend_from_slice(&16u16.to_le_bytes()); // bits per sample
    buf.extend_from_slice(b"data");
    buf.extend_from_slice(&data_len.to_le_bytes());
    for &s in samples {
        let i = (s.clamp(-1.0, 1.0) * 32767.0).round() as i16;
        buf.extend_from_slice(&i.to_le_bytes());
    }
    buf
}

/// Fixed transcript, or nothing. Without a configured response the listener always hears silence.
#[derive(Debug, Default)]
pub struct PlaceholderStt {
    pub response: Option<String>,
}

impl PlaceholderStt {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_response(s: impl Into<String>) -> Self {
        Self {
            response: Some(s.into()),
        }
    }
}

impl SttBackend for PlaceholderStt {
    fn transcribe(&self, _phrase: &CapturedPhrase) -> VoiceResult<String> {
        Ok(self.response.clone().unwrap_or_default())
    }

    fn name(&self) -> &'static str {
        "placeholder"
    }
}

/// OpenAI-compatible transcription API (OpenAI Whisper, OpenRouter, local gateways).
/// Reads `STT_API_URL`, `STT_API_KEY` (or `OPENROUTER_API_KEY`) and `STT_MODEL` (default whisper-1).
#[derive(Debug, Clone)]
pub struct OpenRouterStt {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    client: reqwest::blocking::Client,
}

impl OpenRouterStt {
    pub fn from_env() -> VoiceResult<Self> {
        let base_url = std::env::var("STT_API_URL")
            .unwrap_or_else(|_| "https://api.openai.com/v1".to_string());
        let api_key = std::env::var("STT_API_KEY")
            .or_else(|_| std::env::var("OPENROUTER_API_KEY"))
            .map_err(|_| {
                VoiceError::Config("STT requires STT_API_KEY or OPENROUTER_API_KEY".to_string())
            })?;
        let model = std::env::var("STT_MODEL").unwrap_or_else(|_| "whisper-1".to_string());
        Self::new(base_url, api_key, model)
    }

    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> VoiceResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| VoiceError::Stt(e.to_string()))?;
        Ok(Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            model: model.into(),
            client,
        })
    }
}

impl SttBackend for OpenRouterStt {
    fn transcribe(&self, phrase: &CapturedPhrase) -> VoiceResult<String> {
        if phrase.samples.is_empty() {
            return Ok(String::new());
        }
        let wav = pcm_f32_to_wav(&phrase.samples, phrase.sample_rate);
        let url = format!("{}/audio/transcriptions", self.base_url.trim_end_matches('/'));
        let part = reqwest::blocking::multipart::Part::bytes(wav)
            .file_name("audio.wav")
            .mime_str("audio/wav")
            .map_err(|e| VoiceError::Stt(e.to_string()))?;
        let form = reqwest::blocking::multipart::Form::new()
            .part("file", part)
            .text("model", self.model.clone())
            .text("language", "en");
        let res = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .map_err(|e| VoiceError::Stt(e.to_string()))?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().unwrap_or_default();
            return Err(VoiceError::Stt(format!("STT API error {}: {}", status, body)));
        }
        let json: serde_json::Value = res.json().map_err(|e| VoiceError::Stt(e.to_string()))?;
        Ok(json
            .get("text")
            .and_then(|t| t.as_str())
            .unwrap_or("")
            .trim()
            .to_string())
    }

    fn name(&self) -> &'static str {
        "openrouter"
    }
}

#[cfg(feature = "whisper")]
mod whisper_stt {
    use super::*;
    use std::sync::Mutex;
    use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters};

    /// Local Whisper: loads a ggml model (e.g. ggml-base.en.bin) and runs on-device.
    /// Audio must be 16 kHz mono (the capture default).
    pub struct WhisperStt {
        #[allow(dead_code)]
        context: WhisperContext,
        state: Mutex<whisper_rs::WhisperState>,
    }

    impl WhisperStt {
        pub fn new(model_path: &str) -> VoiceResult<Self> {
            let context =
                WhisperContext::new_with_params(model_path, WhisperContextParameters::default())
                    .map_err(|e| VoiceError::Stt(format!("Whisper load failed: {}", e)))?;
            let state = context
                .create_state()
                .map_err(|e| VoiceError::Stt(format!("Whisper state init failed: {}", e)))?;
            Ok(Self {
                context,
                state: Mutex::new(state),
            })
        }
    }

    impl SttBackend for WhisperStt {
        fn transcribe(&self, phrase: &CapturedPhrase) -> VoiceResult<String> {
            if phrase.samples.is_empty() {
                return Ok(String::new());
            }
            if phrase.sample_rate != 16000 {
                return Err(VoiceError::Stt(format!(
                    "Whisper expects 16 kHz; got {} Hz",
                    phrase.sample_rate
                )));
            }
            let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 1 });
            params.set_print_progress(false);
            params.set_print_realtime(false);
            params.set_no_timestamps(true);
            params.set_language(Some("en"));

            let mut state = self
                .state
                .lock()
                .map_err(|e| VoiceError::Stt(format!("Whisper lock poisoned: {}", e)))?;
            state
                .full(&params, &phrase.samples)
                .map_err(|e| VoiceError::Stt(format!("Whisper inference failed: {}", e)))?;
            Ok(state
                .as_iter()
                .filter_map(|seg| seg.to_str().ok())
                .collect::<Vec<_>>()
                .join(" ")
                .trim()
                .to_string())
        }

        fn name(&self) -> &'static str {
            "whisper"
        }
    }
}

#[cfg(feature = "whisper")]
pub use whisper_stt::WhisperStt;

/// Best available backend from the environment.
/// Priority: local Whisper (`WHISPER_MODEL_PATH`, `whisper` feature), then the remote API
/// (`STT_API_KEY`), then the placeholder.
pub fn create_best_stt() -> Box<dyn SttBackend> {
    #[cfg(feature = "whisper")]
    {
        if let Ok(path) = std::env::var("WHISPER_MODEL_PATH") {
            let path = path.trim();
            if !path.is_empty() {
                match whisper_stt::WhisperStt::new(path) {
                    Ok(w) => return Box::new(w),
                    Err(e) => tracing::warn!(target: "jarvis::listen", error = %e, "whisper unavailable"),
                }
            }
        }
    }
    if let Ok(remote) = OpenRouterStt::from_env() {
        return Box::new(remote);
    }
    tracing::warn!(target: "jarvis::listen", "no STT backend configured; voice input will hear nothing");
    Box::new(PlaceholderStt::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::time::Duration;

    fn phrase(samples: Vec<f32>) -> CapturedPhrase {
        CapturedPhrase {
            samples,
            sample_rate: 16000,
            duration: Duration::from_millis(30),
            captured_at: Utc::now(),
        }
    }

    #[test]
    fn placeholder_with_response() {
        let stt = PlaceholderStt::with_response("what time is it");
        assert_eq!(stt.transcribe(&phrase(vec![])).unwrap(), "what time is it");
        assert_eq!(PlaceholderStt::new().transcribe(&phrase(vec![0.1; 480])).unwrap(), "");
    }

    #[test]
    fn wav_header_describes_payload() {
        let wav = pcm_f32_to_wav(&[0.0, 1.0, -1.0, 2.0], 16000);
        assert_eq!(wav.len(), 44 + 8);
        assert_eq!(&wav[0..4], b"RIFF");
        assert_eq!(u32::from_le_bytes([wav[4], wav[5], wav[6], wav[7]]), 36 + 8);
        assert_eq!(u32::from_le_bytes([wav[24], wav[25], wav[26], wav[27]]), 16000);
        assert_eq!(i16::from_le_bytes([wav[46], wav[47]]), 32767);
        assert_eq!(i16::from_le_bytes([wav[50], wav[51]]), 32767);
    }
}
