//! Free-form conversation over an OpenAI-compatible chat endpoint (OpenRouter by default).
//!
//! The session is stateful: user and assistant turns are kept and replayed on each call.
//! A turn is only recorded once the remote call succeeds.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::debug;

use super::http_client;
use crate::collaborators::ConversationAI;
use crate::config::AssistantConfig;
use crate::error::{CoreError, CoreResult};

/// Turns retained beyond the system prompt.
const MAX_HISTORY: usize = 20;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    fn new(role: &str, content: impl Into<String>) -> Self {
        Self {
            role: role.to_string(),
            content: content.into(),
        }
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Deserialize)]
struct ChatMessageResponse {
    content: String,
}

pub struct OpenRouterConversation {
    api_key: String,
    base_url: String,
    model: String,
    system_prompt: String,
    client: reqwest::Client,
    history: Mutex<Vec<ChatMessage>>,
}

impl OpenRouterConversation {
    /// `None` when no key is configured.
    pub fn from_config(config: &AssistantConfig) -> Option<Self> {
        let key = config.conversation_api_key.as_deref()?.trim().to_string();
        if key.is_empty() {
            return None;
        }
        Some(
            Self::new(key, &config.conversation_base_url, &config.conversation_model).with_system_prompt(
                &format!(
                    "You are {}, a concise voice assistant. Answer in one to three short spoken sentences.",
                    config.assistant_name
                ),
            ),
        )
    }

    pub fn new(api_key: String, base_url: &str, model: &str) -> Self {
        Self {
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            system_prompt: String::new(),
            client: http_client(std::time::Duration::from_secs(60)),
            history: Mutex::new(Vec::new()),
        }
    }

    pub fn with_system_prompt(mut self, prompt: &str) -> Self {
        self.system_prompt = prompt.to_string();
        self
    }

    pub async fn history(&self) -> Vec<ChatMessage> {
        self.history.lock().await.clone()
    }
}

#[async_trait]
impl ConversationAI for OpenRouterConversation {
    async fn reply(&self, message: &str) -> CoreResult<String> {
        let mut history = self.history.lock().await;

        let mut messages = Vec::with_capacity(history.len() + 2);
        if !self.system_prompt.is_empty() {
            messages.push(ChatMessage::new("system", self.system_prompt.clone()));
        }
        messages.extend(history.iter().cloned());
        messages.push(ChatMessage::new("user", message));

        let body = ChatRequest {
            model: &self.model,
            messages,
            temperature: Some(0.7),
            max_tokens: Some(512),
        };

        let url = format!("{}/chat/completions", self.base_url);
        debug!(target: "jarvis::conversation", model = %self.model, turns = history.len(), "chat request");
        let res = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("X-Title", "JARVIS")
            .json(&body)
            .send()
            .await
            .map_err(|e| CoreError::unavailable("conversation", e))?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(CoreError::unavailable(
                "conversation",
                format!("API error {}: {}", status, text),
            ));
        }

        let parsed: ChatResponse = res
            .json()
            .await
            .map_err(|e| CoreError::unavailable("conversation", e))?;
        let answer = parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content.trim().to_string())
            .filter(|c| !c.is_empty())
            .ok_or_else(|| CoreError::unavailable("conversation", "empty response"))?;

        history.push(ChatMessage::new("user", message));
        history.push(ChatMessage::new("assistant", answer.clone()));
        let excess = history.len().saturating_sub(MAX_HISTORY);
        history.drain(..excess);

        Ok(answer)
    }
}
