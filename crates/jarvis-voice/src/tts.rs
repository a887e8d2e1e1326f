//! Text-to-speech backends that produce encoded audio for the playback renderer.
//!
//! The HTTP backend talks to any OpenAI-compatible `/audio/speech` endpoint. Replies longer
//! than the endpoint accepts are split at sentence ends by [`split_for_tts`] and synthesized
//! piece by piece.

use crate::error::{VoiceError, VoiceResult};
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, warn};

/// Longest `input` the speech endpoint accepts, in characters.
pub const MAX_INPUT_CHARS: usize = 4096;

/// Backend that turns text into audio bytes (WAV/MP3).
pub trait TtsBackend: Send + Sync {
    /// Synthesize text to audio bytes. An empty vec means "nothing to play".
    fn synthesize(&self, text: &str) -> VoiceResult<Vec<u8>>;

    /// Largest text one `synthesize` call takes.
    fn max_input_chars(&self) -> usize {
        MAX_INPUT_CHARS
    }
}

/// Returns empty audio so nothing plays.
#[derive(Debug, Default)]
pub struct PlaceholderTts;

impl TtsBackend for PlaceholderTts {
    fn synthesize(&self, _text: &str) -> VoiceResult<Vec<u8>> {
        Ok(Vec::new())
    }
}

/// Where and how to synthesize.
///
/// | Env | Default |
/// |-----|---------|
/// | TTS_API_URL | https://api.openai.com/v1 |
/// | TTS_API_KEY, then OPENROUTER_API_KEY | none (backend unavailable) |
/// | TTS_MODEL | tts-1 |
/// | TTS_VOICE | alloy |
/// | TTS_SPEED | 1.0 (0.25 to 4.0) |
/// | TTS_TIMEOUT_SECS | 30 |
#[derive(Debug, Clone, PartialEq)]
pub struct TtsSettings {
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub voice: String,
    pub speed: f32,
    pub timeout: Duration,
}

impl Default for TtsSettings {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            api_key: None,
            model: "tts-1".to_string(),
            voice: "alloy".to_string(),
            speed: 1.0,
            timeout: Duration::from_secs(30),
        }
    }
}

impl TtsSettings {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; unparsable numbers keep their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut settings = Self::default();
        if let Some(url) = lookup("TTS_API_URL") {
            settings.base_url = url;
        }
        settings.api_key = lookup("TTS_API_KEY")
            .or_else(|| lookup("OPENROUTER_API_KEY"))
            .filter(|k| !k.trim().is_empty());
        if let Some(model) = lookup("TTS_MODEL") {
            settings.model = model;
        }
        if let Some(voice) = lookup("TTS_VOICE") {
            settings.voice = voice;
        }
        if let Some(raw) = lookup("TTS_SPEED") {
            match raw.parse::<f32>() {
                Ok(speed) => settings.speed = speed.clamp(0.25, 4.0),
                Err(_) => warn!(target: "jarvis::speech", value = %raw, "ignoring TTS_SPEED"),
            }
        }
        if let Some(raw) = lookup("TTS_TIMEOUT_SECS") {
            match raw.parse::<u64>() {
                Ok(secs) => settings.timeout = Duration::from_secs(secs),
                Err(_) => warn!(target: "jarvis::speech", value = %raw, "ignoring TTS_TIMEOUT_SECS"),
            }
        }
        settings
    }

    pub fn endpoint(&self) -> String {
        format!("{}/audio/speech", self.base_url.trim_end_matches('/'))
    }
}

#[derive(Debug, Serialize)]
struct SpeechRequest<'a> {
    model: &'a str,
    input: &'a str,
    voice: &'a str,
    response_format: &'static str,
    speed: f32,
}

/// Remote synthesis over HTTP. Requires an API key.
#[derive(Clone)]
pub struct HttpTts {
    settings: TtsSettings,
    api_key: String,
    client: reqwest::blocking::Client,
}

impl HttpTts {
    pub fn from_env() -> VoiceResult<Self> {
        Self::new(TtsSettings::from_env())
    }

    pub fn new(settings: TtsSettings) -> VoiceResult<Self> {
        let api_key = settings.api_key.clone().ok_or_else(|| {
            VoiceError::Config("TTS requires TTS_API_KEY or OPENROUTER_API_KEY".to_string())
        })?;
        let client = reqwest::blocking::Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(|e| VoiceError::Tts(e.to_string()))?;
        Ok(Self {
            settings,
            api_key,
            client,
        })
    }

    pub fn settings(&self) -> &TtsSettings {
        &self.settings
    }

    fn request_body<'a>(&'a self, input: &'a str) -> SpeechRequest<'a> {
        SpeechRequest {
            model: &self.settings.model,
            input,
            voice: &self.settings.voice,
            response_format: "mp3",
            speed: self.settings.speed,
        }
    }
}

impl TtsBackend for HttpTts {
    fn synthesize(&self, text: &str) -> VoiceResult<Vec<u8>> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(Vec::new());
        }
        debug!(target: "jarvis::speech", chars = text.chars().count(), voice = %self.settings.voice, "synthesizing");
        let res = self
            .client
            .post(self.settings.endpoint())
            .bearer_auth(&self.api_key)
            .json(&self.request_body(text))
            .send()
            .map_err(|e| VoiceError::Tts(e.to_string()))?;
        let status = res.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(VoiceError::Config(format!("TTS endpoint rejected the API key ({})", status)));
        }
        if !status.is_success() {
            let detail: String = res.text().unwrap_or_default().chars().take(200).collect();
            return Err(VoiceError::Tts(format!("{} from speech endpoint: {}", status, detail)));
        }
        Ok(res.bytes().map_err(|e| VoiceError::Tts(e.to_string()))?.to_vec())
    }
}

/// Split `text` into trimmed pieces of at most `max_chars` characters, breaking after sentence
/// ends where possible and inside a sentence only when it alone is too long.
pub fn split_for_tts(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut pieces = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for sentence in text.split_inclusive(|c: char| matches!(c, '.' | '!' | '?' | '\n')) {
        let len = sentence.chars().count();
        if current_len + len > max_chars {
            push_trimmed(&mut pieces, &current);
            current.clear();
            current_len = 0;
        }
        if len > max_chars {
            let chars: Vec<char> = sentence.chars().collect();
            for part in chars.chunks(max_chars) {
                push_trimmed(&mut pieces, &part.iter().collect::<String>());
            }
            continue;
        }
        current.push_str(sentence);
        current_len += len;
    }
    push_trimmed(&mut pieces, &current);
    pieces
}

fn push_trimmed(pieces: &mut Vec<String>, piece: &str) {
    let piece = piece.trim();
    if !piece.is_empty() {
        pieces.push(piece.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings_from(pairs: &[(&str, &str)]) -> TtsSettings {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        TtsSettings::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn placeholder_tts_returns_empty() {
        let out = PlaceholderTts.synthesize("hello").unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn settings_fall_back_and_clamp() {
        let s = settings_from(&[
            ("OPENROUTER_API_KEY", "or-key"),
            ("TTS_VOICE", "nova"),
            ("TTS_SPEED", "9"),
            ("TTS_TIMEOUT_SECS", "soon"),
        ]);
        assert_eq!(s.api_key.as_deref(), Some("or-key"));
        assert_eq!(s.voice, "nova");
        assert_eq!(s.speed, 4.0);
        assert_eq!(s.timeout, Duration::from_secs(30));
        assert_eq!(s.endpoint(), "https://api.openai.com/v1/audio/speech");

        let s = settings_from(&[("TTS_API_KEY", "  "), ("TTS_API_URL", "http://localhost:9/v1/")]);
        assert_eq!(s.api_key, None);
        assert_eq!(s.endpoint(), "http://localhost:9/v1/audio/speech");
    }

    #[test]
    fn http_backend_needs_a_key() {
        assert!(matches!(
            HttpTts::new(TtsSettings::default()),
            Err(VoiceError::Config(_))
        ));

        let tts = HttpTts::new(settings_from(&[("TTS_API_KEY", "k")])).unwrap();
        assert_eq!(tts.synthesize("   ").unwrap(), Vec::<u8>::new());
        let body = serde_json::to_value(tts.request_body("hi")).unwrap();
        assert_eq!(body["response_format"], "mp3");
        assert_eq!(body["voice"], "alloy");
    }

    #[test]
    fn long_replies_split_at_sentence_ends() {
        let text = "One two. Three four! Five six?";
        assert_eq!(split_for_tts(text, 12), vec!["One two.", "Three four!", "Five six?"]);
        assert_eq!(split_for_tts(text, 100), vec![text]);
        assert!(split_for_tts("   ", 10).is_empty());

        let monster = "a".repeat(25);
        let pieces = split_for_tts(&monster, 10);
        assert_eq!(pieces.len(), 3);
        assert!(pieces.iter().all(|p| p.chars().count() <= 10));
        assert_eq!(pieces.concat(), monster);
    }
}
