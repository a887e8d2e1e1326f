//! # JARVIS Core - Deterministic Intent Dispatch
//!
//! Turns free-text commands into exactly one reply each. Matching is an ordered, first-match-wins
//! keyword table; every failure ends as response text.
//!
//! ```text
//! text ─→ IntentMatcher ─→ (intent, params) ─→ Dispatcher ─→ collaborator
//!                                                   │
//!                               reply text ←────────┘
//!                                   ├─→ SessionLog
//!                                   └─→ SpeechSink (speech queue)
//! ```

pub mod arithmetic;
pub mod assistant;
pub mod collaborators;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod extract;
pub mod intent;
pub mod matcher;
pub mod platform;
pub mod providers;
pub mod session;

pub use assistant::{Assistant, Listener, SpeechSink, QUIT_SENTINEL};
pub use collaborators::{
    AppLauncher, ConversationAI, KnowledgeProvider, MessagingProvider, PowerAction, ScheduledSend,
    Shortcut, SystemActuator, WeatherProvider, WebActions,
};
pub use config::AssistantConfig;
pub use dispatcher::{Collaborators, DispatchResult, Dispatcher};
pub use error::{CoreError, CoreResult};
pub use intent::{Extraction, IntentId, MessageTarget, Params, YouTubeAction};
pub use matcher::{IntentMatch, IntentMatcher, IntentRule, Trigger};
pub use platform::Platform;
pub use providers::default_collaborators;
pub use session::{ConversationEntry, SessionLog, Speaker, Utterance};
