//! The assistant core surface: `process_command`, `speak`, `listen`.

use std::sync::Arc;
use tracing::{debug, info};

use crate::config::AssistantConfig;
use crate::dispatcher::{Collaborators, DispatchResult, Dispatcher};
use crate::extract::{self, CommandText};
use crate::intent::IntentId;
use crate::matcher::{IntentMatch, IntentMatcher};
use crate::session::{SessionLog, Speaker, Utterance};

/// Returned by `process_command` when the session should end.
pub const QUIT_SENTINEL: &str = "QUIT";

/// Where spoken output goes. Implementations must not block the caller.
pub trait SpeechSink: Send + Sync {
    /// Queue `text` for rendering; returns the task id when accepted.
    fn enqueue(&self, text: &str) -> Option<u64>;
}

/// Speech-to-text input. `None` on timeout, silence, or any failure.
pub trait Listener: Send + Sync {
    fn listen(&self) -> Option<String>;
}

pub struct Assistant {
    name: String,
    matcher: IntentMatcher,
    dispatcher: Dispatcher,
    log: Arc<SessionLog>,
    speech: Option<Arc<dyn SpeechSink>>,
    listener: Option<Arc<dyn Listener>>,
}

impl Assistant {
    pub fn new(config: &AssistantConfig, collaborators: Collaborators) -> Self {
        Self {
            name: config.assistant_name.clone(),
            matcher: IntentMatcher::standard(),
            dispatcher: Dispatcher::new(collaborators, config),
            log: Arc::new(SessionLog::new()),
            speech: None,
            listener: None,
        }
    }

    pub fn with_speech(mut self, sink: Arc<dyn SpeechSink>) -> Self {
        self.speech = Some(sink);
        self
    }

    pub fn with_listener(mut self, listener: Arc<dyn Listener>) -> Self {
        self.listener = Some(listener);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn log(&self) -> Arc<SessionLog> {
        Arc::clone(&self.log)
    }

    pub fn matcher(&self) -> &IntentMatcher {
        &self.matcher
    }

    /// Match, dispatch, record. Returns the reply text or [`QUIT_SENTINEL`]. Never fails.
    pub async fn process_command(&self, text: &str) -> String {
        let result = self.respond(Utterance::new(text)).await;
        if result.terminal {
            QUIT_SENTINEL.to_string()
        } else {
            result.text
        }
    }

    /// Same as `process_command` but keeps the full [`DispatchResult`].
    pub async fn respond(&self, utterance: Utterance) -> DispatchResult {
        self.log.append(Speaker::User, utterance.text.clone());

        let matched = self.matcher.match_text(&utterance.text).unwrap_or_else(|| {
            debug!(target: "jarvis::assistant", "no rule matched; routing to free-form");
            IntentMatch {
                intent: IntentId::FreeForm,
                order: u32::MAX,
                extraction: extract::free_form(&CommandText::new(&utterance.text)),
            }
        });
        info!(
            target: "jarvis::assistant",
            intent = %matched.intent,
            order = matched.order,
            "command matched"
        );

        let result = self.dispatcher.dispatch_match(matched).await;
        self.log.append(Speaker::Assistant, result.text.clone());
        result
    }

    /// Hand text to the speech queue. Empty text and a missing sink are no-ops.
    pub fn speak(&self, text: &str) -> Option<u64> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        self.speech.as_ref().and_then(|sink| sink.enqueue(text))
    }

    pub fn listen(&self) -> Option<String> {
        self.listener.as_ref().and_then(|l| l.listen())
    }

    /// Process and speak the reply. The sentinel itself is never spoken; the goodbye text is.
    pub async fn handle(&self, text: &str) -> DispatchResult {
        let result = self.respond(Utterance::new(text)).await;
        self.speak(&result.text);
        result
    }
}
