//! Error types for the assistant core

use thiserror::Error;

/// Result type alias for core operations
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors raised inside the core. None of these cross `Assistant::process_command`:
/// the dispatcher resolves every variant to response text via [`CoreError::user_message`].
#[derive(Error, Debug)]
pub enum CoreError {
    /// A required parameter is missing or ambiguous (e.g. no "to <contact>").
    #[error("Clarification needed: {0}")]
    ClarificationNeeded(String),

    /// A dependency is missing or a remote call failed.
    #[error("{collaborator} unavailable: {reason}")]
    CollaboratorUnavailable {
        collaborator: &'static str,
        reason: String,
    },

    /// The capability exists but not on this operating system.
    #[error("{capability} is not supported on {platform}")]
    UnsupportedOnPlatform {
        capability: &'static str,
        platform: String,
    },

    /// Lookup target does not exist (unknown city, topic, contact, file).
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid expression: {0}")]
    InvalidExpression(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl CoreError {
    pub fn unavailable(collaborator: &'static str, reason: impl ToString) -> Self {
        CoreError::CollaboratorUnavailable {
            collaborator,
            reason: reason.to_string(),
        }
    }

    pub fn unsupported(capability: &'static str, platform: impl ToString) -> Self {
        CoreError::UnsupportedOnPlatform {
            capability,
            platform: platform.to_string(),
        }
    }

    /// Text spoken back to the user when this error ends a dispatch.
    pub fn user_message(&self) -> String {
        match self {
            CoreError::ClarificationNeeded(msg) | CoreError::NotFound(msg) => msg.clone(),
            CoreError::CollaboratorUnavailable { collaborator, reason } => {
                format!("Sorry, {} is unavailable right now ({}).", collaborator, reason)
            }
            CoreError::UnsupportedOnPlatform { capability, platform } => {
                format!("{} is not supported on {}.", capability, platform)
            }
            CoreError::InvalidExpression(expr) => {
                format!("I couldn't evaluate '{}'.", expr)
            }
            other => format!("Something went wrong: {}", other),
        }
    }
}

impl From<config::ConfigError> for CoreError {
    fn from(err: config::ConfigError) -> Self {
        CoreError::Config(err.to_string())
    }
}
