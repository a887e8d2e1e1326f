//! Assistant configuration.
//!
//! Precedence: built-in defaults < TOML file (`JARVIS_CONFIG` path, default `config/jarvis`)
//! < environment variables prefixed `JARVIS__` (e.g. `JARVIS__WEATHER_API_KEY`).
//! Contacts are only ever read from the file, never baked into the binary.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use crate::error::CoreResult;

/// Runtime configuration for the core and the default collaborators.
///
/// | Key | Default | Description |
/// |-----|---------|-------------|
/// | assistant_name | JARVIS | Name used in greetings and logs. |
/// | contacts | {} | Messaging contacts, lower-case name -> phone number. |
/// | default_country_code | +91 | Prefix added to raw numbers without `+`. |
/// | message_delay_minutes | 2 | Offset before a scheduled text is sent. |
/// | file_delay_minutes | 3 | Offset before a scheduled file is sent. |
/// | weather_api_key | none | OpenWeatherMap key; weather is unavailable without it. |
/// | http_timeout_secs | 5 | Timeout for weather / knowledge lookups. |
/// | conversation_api_key | none | Chat key; falls back to `OPENROUTER_API_KEY`. |
/// | speech_poll_ms | 500 | Speech worker wait interval between shutdown checks. |
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssistantConfig {
    pub assistant_name: String,
    #[serde(default)]
    pub contacts: HashMap<String, String>,
    pub default_country_code: String,
    pub message_delay_minutes: u32,
    pub file_delay_minutes: u32,
    #[serde(default)]
    pub weather_api_key: Option<String>,
    pub weather_base_url: String,
    pub geo_lookup_url: String,
    pub fallback_city: String,
    pub knowledge_base_url: String,
    pub search_url: String,
    pub http_timeout_secs: u64,
    #[serde(default)]
    pub conversation_api_key: Option<String>,
    pub conversation_base_url: String,
    pub conversation_model: String,
    pub speech_poll_ms: u64,
    pub listen_timeout_secs: u64,
    pub phrase_limit_secs: u64,
    pub typing_delay_ms: u64,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            assistant_name: "JARVIS".to_string(),
            contacts: HashMap::new(),
            default_country_code: "+91".to_string(),
            message_delay_minutes: 2,
            file_delay_minutes: 3,
            weather_api_key: None,
            weather_base_url: "https://api.openweathermap.org/data/2.5/weather".to_string(),
            geo_lookup_url: "http://ip-api.com/json/".to_string(),
            fallback_city: "London".to_string(),
            knowledge_base_url: "https://en.wikipedia.org/api/rest_v1/page/summary/".to_string(),
            search_url: "https://www.google.com/search?q=".to_string(),
            http_timeout_secs: 5,
            conversation_api_key: None,
            conversation_base_url: "https://openrouter.ai/api/v1".to_string(),
            conversation_model: "meta-llama/llama-3.3-70b-instruct".to_string(),
            speech_poll_ms: 500,
            listen_timeout_secs: 5,
            phrase_limit_secs: 10,
            typing_delay_ms: 1000,
        }
    }
}

impl AssistantConfig {
    /// Load config from file and environment. Precedence: env `JARVIS_CONFIG` path > `config/jarvis` > defaults.
    pub fn load() -> CoreResult<Self> {
        let config_path =
            std::env::var("JARVIS_CONFIG").unwrap_or_else(|_| "config/jarvis".to_string());
        let defaults = Self::default();
        let builder = config::Config::builder()
            .set_default("assistant_name", defaults.assistant_name.clone())?
            .set_default("default_country_code", defaults.default_country_code.clone())?
            .set_default("message_delay_minutes", defaults.message_delay_minutes as i64)?
            .set_default("file_delay_minutes", defaults.file_delay_minutes as i64)?
            .set_default("weather_base_url", defaults.weather_base_url.clone())?
            .set_default("geo_lookup_url", defaults.geo_lookup_url.clone())?
            .set_default("fallback_city", defaults.fallback_city.clone())?
            .set_default("knowledge_base_url", defaults.knowledge_base_url.clone())?
            .set_default("search_url", defaults.search_url.clone())?
            .set_default("http_timeout_secs", defaults.http_timeout_secs as i64)?
            .set_default("conversation_base_url", defaults.conversation_base_url.clone())?
            .set_default("conversation_model", defaults.conversation_model.clone())?
            .set_default("speech_poll_ms", defaults.speech_poll_ms as i64)?
            .set_default("listen_timeout_secs", defaults.listen_timeout_secs as i64)?
            .set_default("phrase_limit_secs", defaults.phrase_limit_secs as i64)?
            .set_default("typing_delay_ms", defaults.typing_delay_ms as i64)?;

        // `config` resolves the extension itself, so both "config/jarvis" and "config/jarvis.toml" work.
        let path = Path::new(&config_path);
        let with_ext = path.with_extension("toml");
        let builder = if path.exists() || with_ext.exists() {
            builder.add_source(config::File::with_name(&config_path))
        } else {
            builder
        };

        let built = builder
            .add_source(config::Environment::with_prefix("JARVIS").separator("__"))
            .build()?;

        let mut cfg: Self = built.try_deserialize()?;
        cfg.normalize();
        Ok(cfg)
    }

    /// Load, falling back to defaults on any error (logged). Startup never aborts on config.
    pub fn load_or_default() -> Self {
        match Self::load() {
            Ok(cfg) => cfg,
            Err(e) => {
                tracing::warn!(target: "jarvis::config", error = %e, "config load failed; using defaults");
                let mut cfg = Self::default();
                cfg.normalize();
                cfg
            }
        }
    }

    /// Lower-case contact names, drop blank keys, and resolve the chat key from `OPENROUTER_API_KEY`.
    fn normalize(&mut self) {
        self.contacts = self
            .contacts
            .drain()
            .map(|(name, number)| (name.trim().to_lowercase(), number.trim().to_string()))
            .filter(|(name, number)| !name.is_empty() && !number.is_empty())
            .collect();
        self.weather_api_key = non_blank(self.weather_api_key.take());
        self.conversation_api_key = non_blank(self.conversation_api_key.take())
            .or_else(|| non_blank(std::env::var("OPENROUTER_API_KEY").ok()));
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs.max(1))
    }

    pub fn speech_poll_interval(&self) -> Duration {
        Duration::from_millis(self.speech_poll_ms.max(10))
    }

    pub fn listen_timeout(&self) -> Duration {
        Duration::from_secs(self.listen_timeout_secs.max(1))
    }

    pub fn phrase_limit(&self) -> Duration {
        Duration::from_secs(self.phrase_limit_secs.max(1))
    }

    pub fn typing_delay(&self) -> Duration {
        Duration::from_millis(self.typing_delay_ms)
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_scheduling_offsets() {
        let cfg = AssistantConfig::default();
        assert_eq!(cfg.message_delay_minutes, 2);
        assert_eq!(cfg.file_delay_minutes, 3);
        assert_eq!(cfg.default_country_code, "+91");
        assert!(cfg.contacts.is_empty());
    }

    #[test]
    fn normalize_lowercases_contacts_and_drops_blanks() {
        let mut cfg = AssistantConfig::default();
        cfg.contacts.insert("  Alice ".to_string(), "+15550100".to_string());
        cfg.contacts.insert(" ".to_string(), "+15550101".to_string());
        cfg.weather_api_key = Some("   ".to_string());
        cfg.normalize();
        assert_eq!(cfg.contacts.get("alice").map(String::as_str), Some("+15550100"));
        assert_eq!(cfg.contacts.len(), 1);
        assert!(cfg.weather_api_key.is_none());
    }

    #[test]
    fn loads_contacts_from_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("jarvis.toml");
        std::fs::write(
            &file,
            "assistant_name = \"FRIDAY\"\nmessage_delay_minutes = 5\n[contacts]\nBob = \"+15550199\"\n",
        )
        .unwrap();
        std::env::set_var("JARVIS_CONFIG", file.to_string_lossy().to_string());
        let cfg = AssistantConfig::load().unwrap();
        std::env::remove_var("JARVIS_CONFIG");
        assert_eq!(cfg.assistant_name, "FRIDAY");
        assert_eq!(cfg.message_delay_minutes, 5);
        assert_eq!(cfg.contacts.get("bob").map(String::as_str), Some("+15550199"));
        assert_eq!(cfg.file_delay_minutes, 3);
    }
}
