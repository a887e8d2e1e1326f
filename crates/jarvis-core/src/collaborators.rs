//! Narrow interfaces to the outside world.
//!
//! Each handler in the dispatcher calls exactly one of these. Implementations live in
//! [`crate::providers`]; tests substitute recording fakes.

use async_trait::async_trait;
use chrono::{DateTime, Local};
use serde::Serialize;
use std::path::PathBuf;

use crate::error::CoreResult;
use crate::intent::MessageTarget;

#[async_trait]
pub trait AppLauncher: Send + Sync {
    /// Launch by friendly name; returns status text.
    async fn open(&self, name: &str) -> CoreResult<String>;
    async fn close(&self, name: &str) -> CoreResult<String>;
}

/// Fire-and-forget browser navigation.
#[async_trait]
pub trait WebActions: Send + Sync {
    async fn search(&self, query: &str) -> CoreResult<()>;
    async fn open_url(&self, url: &str) -> CoreResult<()>;

    async fn open_youtube(&self) -> CoreResult<()> {
        self.open_url("https://www.youtube.com").await
    }

    /// Opens the results page for `query`; the first result is one click away.
    async fn play_video(&self, query: &str) -> CoreResult<()> {
        self.open_url(&format!(
            "https://www.youtube.com/results?search_query={}",
            urlencoding::encode(query)
        ))
        .await
    }

    async fn search_youtube(&self, query: &str) -> CoreResult<()> {
        self.open_url(&format!(
            "https://www.youtube.com/results?search_query={}",
            urlencoding::encode(query)
        ))
        .await
    }
}

#[async_trait]
pub trait WeatherProvider: Send + Sync {
    /// `None` resolves the current location. Unknown city is `CoreError::NotFound`.
    async fn get(&self, city: Option<&str>) -> CoreResult<String>;
}

/// A send that has been scheduled, not yet performed.
#[derive(Debug, Clone, Serialize)]
pub struct ScheduledSend {
    pub recipient: String,
    pub at: DateTime<Local>,
}

#[async_trait]
pub trait MessagingProvider: Send + Sync {
    async fn schedule_text(
        &self,
        target: &MessageTarget,
        body: &str,
        delay_minutes: u32,
    ) -> CoreResult<ScheduledSend>;

    async fn schedule_file(
        &self,
        target: &MessageTarget,
        path: &str,
        delay_minutes: u32,
    ) -> CoreResult<ScheduledSend>;
}

#[async_trait]
pub trait KnowledgeProvider: Send + Sync {
    /// Short summary of `topic`; also opens the full article as a side channel.
    async fn summarize(&self, topic: &str) -> CoreResult<String>;
}

/// Stateful remote chat session. History is internal to the implementation.
#[async_trait]
pub trait ConversationAI: Send + Sync {
    async fn reply(&self, message: &str) -> CoreResult<String>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PowerAction {
    Lock,
    Sleep,
    Hibernate,
    Shutdown,
    Restart,
    CancelShutdown,
}

/// Keyboard chords the assistant knows how to press.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Shortcut {
    NextTab,
    PreviousTab,
    CloseTab,
    NewTab,
    SwitchWindow,
    Minimize,
    Maximize,
    ShowDesktop,
    Enter,
    SelectAll,
    Copy,
    Paste,
    Cut,
    Undo,
    Redo,
}

#[async_trait]
pub trait SystemActuator: Send + Sync {
    async fn power(&self, action: PowerAction) -> CoreResult<String>;
    async fn set_volume(&self, level: u8) -> CoreResult<()>;
    async fn shortcut(&self, shortcut: Shortcut) -> CoreResult<()>;
    async fn press_backspace(&self, count: u32) -> CoreResult<()>;
    async fn type_text(&self, text: &str) -> CoreResult<()>;
    /// Returns the saved image path.
    async fn screenshot(&self) -> CoreResult<PathBuf>;
    async fn system_info(&self) -> CoreResult<String>;
}
