//! Session log: append-only record of who said what, and when.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::RwLock;

use crate::error::CoreResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Speaker {
    User,
    Assistant,
}

/// One line of the conversation. Never mutated once appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationEntry {
    pub speaker: Speaker,
    pub text: String,
    pub at: DateTime<Utc>,
}

/// A single input as received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Utterance {
    pub text: String,
    pub received_at: DateTime<Utc>,
}

impl Utterance {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            received_at: Utc::now(),
        }
    }
}

/// Read-only to everyone except the assistant, which only appends.
#[derive(Debug, Default)]
pub struct SessionLog {
    entries: RwLock<Vec<ConversationEntry>>,
}

impl SessionLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&self, speaker: Speaker, text: impl Into<String>) {
        let entry = ConversationEntry {
            speaker,
            text: text.into(),
            at: Utc::now(),
        };
        // A poisoned lock still holds a consistent Vec; keep appending.
        let mut guard = self.entries.write().unwrap_or_else(|p| p.into_inner());
        guard.push(entry);
    }

    /// Snapshot in append order.
    pub fn entries(&self) -> Vec<ConversationEntry> {
        self.entries
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(|p| p.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Audit export.
    pub fn to_json(&self) -> CoreResult<String> {
        Ok(serde_json::to_string_pretty(&self.entries())?)
    }

    /// Plain text for the CLI `history` command.
    pub fn render(&self, assistant_name: &str) -> String {
        self.entries()
            .iter()
            .map(|e| {
                let who = match e.speaker {
                    Speaker::User => "You",
                    Speaker::Assistant => assistant_name,
                };
                format!("[{}] {}: {}", e.at.format("%H:%M:%S"), who, e.text)
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}
