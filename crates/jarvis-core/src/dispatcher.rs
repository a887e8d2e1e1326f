//! Intent dispatcher.
//!
//! Maps an intent plus its parameters onto exactly one collaborator call and turns the
//! outcome into response text. Nothing escapes [`Dispatcher::dispatch`]: collaborator errors,
//! unsupported platforms and even panics inside a handler all become a text reply.

use chrono::Local;
use futures::FutureExt;
use serde::Serialize;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::arithmetic;
use crate::collaborators::{
    AppLauncher, ConversationAI, KnowledgeProvider, MessagingProvider, PowerAction, Shortcut,
    SystemActuator, WeatherProvider, WebActions,
};
use crate::config::AssistantConfig;
use crate::error::{CoreError, CoreResult};
use crate::intent::{Extraction, IntentId, Params, YouTubeAction};
use crate::matcher::IntentMatch;

/// Upper bound on backspace repeats in one command.
pub const MAX_BACKSPACE: u64 = 500;

pub const AI_UNAVAILABLE: &str = "AI is not available. Please check your API key.";

pub const HELP_TEXT: &str = "I can help you with:
- Open/Close applications (e.g., \"open chrome\", \"close notepad\")
- Web search (e.g., \"search Rust tutorials\")
- Wikipedia (e.g., \"wikipedia Rust programming\")
- YouTube: open, play videos, search
- Weather updates (e.g., \"weather in London\")
- Time and date (e.g., \"what time is it?\")
- WhatsApp messages (e.g., \"send message to Alice saying Hello\")
- WhatsApp files (e.g., \"send file photo.jpg to Alice\")
- Typing/Dictation (e.g., \"write Hello World\")
- Keyboard shortcuts: Enter, Backspace, Copy, Paste, Cut, Undo, Redo
- Screenshot (e.g., \"take screenshot\")
- System info (e.g., \"system status\")
- Volume control (e.g., \"set volume 50\")
- Power: Lock, Sleep, Hibernate, Shutdown, Restart
- Tab control: Next tab, Previous tab, Close tab, New tab
- Window control: Switch window, Minimize, Maximize, Show desktop
- Math calculations (e.g., \"what is 2 + 2\")
- General questions (answered by the conversational AI)";

/// The set of external capabilities the dispatcher may call.
#[derive(Clone)]
pub struct Collaborators {
    pub apps: Arc<dyn AppLauncher>,
    pub web: Arc<dyn WebActions>,
    pub weather: Arc<dyn WeatherProvider>,
    pub messaging: Arc<dyn MessagingProvider>,
    pub knowledge: Arc<dyn KnowledgeProvider>,
    /// `None` when no chat key is configured.
    pub conversation: Option<Arc<dyn ConversationAI>>,
    pub system: Arc<dyn SystemActuator>,
}

/// Exactly one per utterance. `terminal` ends the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DispatchResult {
    pub text: String,
    pub terminal: bool,
}

impl DispatchResult {
    pub fn reply(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            terminal: false,
        }
    }

    pub fn terminal(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            terminal: true,
        }
    }
}

pub struct Dispatcher {
    collaborators: Collaborators,
    message_delay_minutes: u32,
    file_delay_minutes: u32,
}

impl Dispatcher {
    pub fn new(collaborators: Collaborators, config: &AssistantConfig) -> Self {
        Self {
            collaborators,
            message_delay_minutes: config.message_delay_minutes,
            file_delay_minutes: config.file_delay_minutes,
        }
    }

    /// Dispatch a matcher result. A clarification short-circuits without touching any collaborator.
    pub async fn dispatch_match(&self, matched: IntentMatch) -> DispatchResult {
        match matched.extraction {
            Extraction::Params(params) => self.dispatch(matched.intent, params).await,
            Extraction::ClarificationNeeded(message) => {
                debug!(target: "jarvis::dispatch", intent = %matched.intent, "clarification needed");
                DispatchResult::reply(CoreError::ClarificationNeeded(message).user_message())
            }
        }
    }

    /// Never fails. Quit is answered before any handler runs.
    pub async fn dispatch(&self, intent: IntentId, params: Params) -> DispatchResult {
        if intent == IntentId::Quit {
            info!(target: "jarvis::dispatch", "quit requested");
            return DispatchResult::terminal("Goodbye!");
        }

        info!(target: "jarvis::dispatch", intent = %intent, "dispatching");
        match AssertUnwindSafe(self.handle(intent, params)).catch_unwind().await {
            Ok(Ok(text)) => DispatchResult::reply(text),
            Ok(Err(e)) => {
                warn!(target: "jarvis::dispatch", intent = %intent, error = %e, "handler failed");
                DispatchResult::reply(e.user_message())
            }
            Err(_) => {
                error!(target: "jarvis::dispatch", intent = %intent, "handler panicked");
                DispatchResult::reply(format!(
                    "Sorry, something went wrong while handling {}.",
                    intent
                ))
            }
        }
    }

    async fn handle(&self, intent: IntentId, params: Params) -> CoreResult<String> {
        let c = &self.collaborators;
        match (intent, params) {
            (IntentId::Greeting, _) => Ok("Hello! How can I assist you today?".to_string()),
            (IntentId::Help, _) => Ok(HELP_TEXT.to_string()),
            (IntentId::Time, _) => Ok(format!(
                "The current time is {}",
                Local::now().format("%I:%M %p")
            )),
            (IntentId::Date, _) => Ok(format!("Today is {}", Local::now().format("%A, %B %d, %Y"))),

            (IntentId::TypeText, Params::Text(text)) => {
                c.system.type_text(&text).await?;
                Ok(format!("Typed: {}", text))
            }

            (IntentId::Messaging, Params::Message { target, body }) => {
                let delay = self.message_delay_minutes;
                let sent = c.messaging.schedule_text(&target, &body, delay).await?;
                Ok(format!(
                    "WhatsApp message scheduled to {} for {}. WhatsApp Web will open in {} minutes.",
                    sent.recipient,
                    sent.at.format("%I:%M %p"),
                    delay
                ))
            }
            (IntentId::Messaging, Params::File { target, path }) => {
                let delay = self.file_delay_minutes;
                let sent = c.messaging.schedule_file(&target, &path, delay).await?;
                Ok(format!(
                    "File scheduled to send to {} for {}. WhatsApp Web will open in {} minutes.",
                    sent.recipient,
                    sent.at.format("%I:%M %p"),
                    delay
                ))
            }

            (IntentId::Weather, Params::City(city)) => c.weather.get(city.as_deref()).await,

            (IntentId::Screenshot, _) => {
                let path = c.system.screenshot().await?;
                Ok(format!("Screenshot saved as {}", path.display()))
            }
            (IntentId::SystemInfo, _) => c.system.system_info().await,

            (IntentId::Volume, Params::Level(level)) => {
                if level > 100 {
                    return Ok(format!(
                        "Volume level {} is out of range. Please choose a level between 0 and 100.",
                        level
                    ));
                }
                c.system.set_volume(level as u8).await?;
                Ok(format!("Volume set to {}%", level))
            }

            (IntentId::LockScreen, _) => c.system.power(PowerAction::Lock).await,
            (IntentId::Sleep, _) => c.system.power(PowerAction::Sleep).await,
            (IntentId::Hibernate, _) => c.system.power(PowerAction::Hibernate).await,
            (IntentId::Shutdown, Params::Shutdown { cancel: true }) => {
                c.system.power(PowerAction::CancelShutdown).await
            }
            (IntentId::Shutdown, _) => c.system.power(PowerAction::Shutdown).await,
            (IntentId::Restart, _) => c.system.power(PowerAction::Restart).await,

            (IntentId::NextTab, _) => self.press(Shortcut::NextTab, "Switching to next tab").await,
            (IntentId::PreviousTab, _) => {
                self.press(Shortcut::PreviousTab, "Switching to previous tab").await
            }
            (IntentId::CloseTab, _) => self.press(Shortcut::CloseTab, "Closing current tab").await,
            (IntentId::NewTab, _) => self.press(Shortcut::NewTab, "Opening new tab").await,
            (IntentId::SwitchWindow, _) => {
                self.press(Shortcut::SwitchWindow, "Switching window").await
            }
            (IntentId::Minimize, _) => self.press(Shortcut::Minimize, "Minimizing window").await,
            (IntentId::Maximize, _) => self.press(Shortcut::Maximize, "Maximizing window").await,
            (IntentId::ShowDesktop, _) => self.press(Shortcut::ShowDesktop, "Showing desktop").await,
            (IntentId::PressEnter, _) => self.press(Shortcut::Enter, "Pressed Enter").await,
            (IntentId::SelectAll, _) => self.press(Shortcut::SelectAll, "Selected all text").await,
            (IntentId::Copy, _) => self.press(Shortcut::Copy, "Copied text").await,
            (IntentId::Paste, _) => self.press(Shortcut::Paste, "Pasted text").await,
            (IntentId::Cut, _) => self.press(Shortcut::Cut, "Cut text").await,
            (IntentId::Undo, _) => self.press(Shortcut::Undo, "Undone last action").await,
            (IntentId::Redo, _) => self.press(Shortcut::Redo, "Redone last action").await,

            (IntentId::Backspace, Params::Count(count)) => {
                if count > MAX_BACKSPACE {
                    return Ok(format!(
                        "Backspace count {} is too large. The limit is {}.",
                        count, MAX_BACKSPACE
                    ));
                }
                c.system.press_backspace(count as u32).await?;
                Ok(format!("Pressed Backspace {} time(s)", count))
            }

            (IntentId::YouTube | IntentId::PlayVideo, Params::YouTube(action)) => match action {
                YouTubeAction::Open => {
                    c.web.open_youtube().await?;
                    Ok("Opening YouTube".to_string())
                }
                YouTubeAction::Play(query) => {
                    c.web.play_video(&query).await?;
                    Ok(format!("Playing '{}' on YouTube", query))
                }
                YouTubeAction::Search(query) => {
                    c.web.search_youtube(&query).await?;
                    Ok(format!("Searching YouTube for '{}'", query))
                }
            },

            (IntentId::OpenApp, Params::Text(name)) => c.apps.open(&name).await,
            (IntentId::CloseApp, Params::Text(name)) => c.apps.close(&name).await,

            (IntentId::WebSearch, Params::Text(query)) => {
                c.web.search(&query).await?;
                Ok(format!("Searching for {}", query))
            }

            (IntentId::Wikipedia, Params::Text(topic)) => {
                let summary = c.knowledge.summarize(&topic).await?;
                Ok(format!("Wikipedia: {}", summary))
            }

            (IntentId::Arithmetic, Params::Expression { expr, original }) => {
                match arithmetic::evaluate(&expr) {
                    Ok(answer) => Ok(format!("The answer is {}", answer)),
                    Err(e) => {
                        debug!(target: "jarvis::dispatch", error = %e, "arithmetic failed; asking conversation");
                        self.converse(&original).await
                    }
                }
            }

            (IntentId::FreeForm, Params::Text(message)) => self.converse(&message).await,

            (intent, params) => Err(CoreError::ClarificationNeeded(format!(
                "I couldn't work out the details for {} ({:?}).",
                intent, params
            ))),
        }
    }

    async fn press(&self, shortcut: Shortcut, done: &str) -> CoreResult<String> {
        self.collaborators.system.shortcut(shortcut).await?;
        Ok(done.to_string())
    }

    async fn converse(&self, message: &str) -> CoreResult<String> {
        match &self.collaborators.conversation {
            Some(ai) => ai.reply(message).await,
            None => Ok(AI_UNAVAILABLE.to_string()),
        }
    }
}
