//! Intent identifiers and the structured parameters extracted for them.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A classified category of user request. Each variant has exactly one handler in the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentId {
    Quit,
    TypeText,
    Messaging,
    Greeting,
    Time,
    Date,
    Weather,
    Screenshot,
    SystemInfo,
    Volume,
    LockScreen,
    Sleep,
    Hibernate,
    Shutdown,
    Restart,
    NextTab,
    PreviousTab,
    CloseTab,
    NewTab,
    SwitchWindow,
    Minimize,
    Maximize,
    ShowDesktop,
    PressEnter,
    Backspace,
    SelectAll,
    Copy,
    Paste,
    Cut,
    Undo,
    Redo,
    YouTube,
    PlayVideo,
    OpenApp,
    CloseApp,
    WebSearch,
    Wikipedia,
    Arithmetic,
    Help,
    /// No rule fired; delegated to the conversational collaborator.
    FreeForm,
}

impl IntentId {
    pub fn as_str(&self) -> &'static str {
        match self {
            IntentId::Quit => "quit",
            IntentId::TypeText => "type_text",
            IntentId::Messaging => "messaging",
            IntentId::Greeting => "greeting",
            IntentId::Time => "time",
            IntentId::Date => "date",
            IntentId::Weather => "weather",
            IntentId::Screenshot => "screenshot",
            IntentId::SystemInfo => "system_info",
            IntentId::Volume => "volume",
            IntentId::LockScreen => "lock_screen",
            IntentId::Sleep => "sleep",
            IntentId::Hibernate => "hibernate",
            IntentId::Shutdown => "shutdown",
            IntentId::Restart => "restart",
            IntentId::NextTab => "next_tab",
            IntentId::PreviousTab => "previous_tab",
            IntentId::CloseTab => "close_tab",
            IntentId::NewTab => "new_tab",
            IntentId::SwitchWindow => "switch_window",
            IntentId::Minimize => "minimize",
            IntentId::Maximize => "maximize",
            IntentId::ShowDesktop => "show_desktop",
            IntentId::PressEnter => "press_enter",
            IntentId::Backspace => "backspace",
            IntentId::SelectAll => "select_all",
            IntentId::Copy => "copy",
            IntentId::Paste => "paste",
            IntentId::Cut => "cut",
            IntentId::Undo => "undo",
            IntentId::Redo => "redo",
            IntentId::YouTube => "youtube",
            IntentId::PlayVideo => "play_video",
            IntentId::OpenApp => "open_app",
            IntentId::CloseApp => "close_app",
            IntentId::WebSearch => "web_search",
            IntentId::Wikipedia => "wikipedia",
            IntentId::Arithmetic => "arithmetic",
            IntentId::Help => "help",
            IntentId::FreeForm => "free_form",
        }
    }
}

impl fmt::Display for IntentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Recipient of a message: a configured contact name or a raw phone number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum MessageTarget {
    Contact(String),
    Number(String),
}

impl fmt::Display for MessageTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageTarget::Contact(name) => f.write_str(name),
            MessageTarget::Number(number) => f.write_str(number),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", content = "query", rename_all = "snake_case")]
pub enum YouTubeAction {
    Open,
    Play(String),
    Search(String),
}

/// Structured arguments produced by an extractor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Params {
    None,
    /// Free text payload: text to type, app name, search query, topic, or the raw utterance.
    Text(String),
    Message {
        target: MessageTarget,
        body: String,
    },
    File {
        target: MessageTarget,
        path: String,
    },
    /// `None` means "wherever I am".
    City(Option<String>),
    /// First integer-like token, unvalidated. Range checks belong to the handler.
    Level(u64),
    Count(u64),
    Shutdown {
        cancel: bool,
    },
    YouTube(YouTubeAction),
    /// Normalized arithmetic plus the command it came from (used if evaluation fails).
    Expression {
        expr: String,
        original: String,
    },
}

/// Result of running an extractor: either parameters or a request for clarification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraction {
    Params(Params),
    ClarificationNeeded(String),
}

impl Extraction {
    pub fn clarify(message: impl Into<String>) -> Self {
        Extraction::ClarificationNeeded(message.into())
    }
}

impl From<Params> for Extraction {
    fn from(params: Params) -> Self {
        Extraction::Params(params)
    }
}
