//! Default collaborator implementations backed by the host OS and public HTTP APIs.

pub mod apps;
pub mod conversation;
pub mod knowledge;
pub mod messaging;
pub mod system;
pub mod weather;
pub mod web;

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::collaborators::{ConversationAI, WebActions};
use crate::config::AssistantConfig;
use crate::dispatcher::Collaborators;
use crate::error::{CoreError, CoreResult};
use crate::platform::Platform;

pub use apps::SystemAppLauncher;
pub use conversation::OpenRouterConversation;
pub use knowledge::WikipediaKnowledge;
pub use messaging::WhatsAppScheduler;
pub use system::DesktopActuator;
pub use weather::OpenWeatherProvider;
pub use web::BrowserWeb;

/// Wire up the real providers. Missing conversation key leaves `conversation` empty.
pub fn default_collaborators(config: &AssistantConfig) -> Collaborators {
    let platform = Platform::current();
    let web: Arc<dyn WebActions> = Arc::new(BrowserWeb::new(platform, &config.search_url));

    let conversation = OpenRouterConversation::from_config(config)
        .map(|c| Arc::new(c) as Arc<dyn ConversationAI>);
    if conversation.is_none() {
        info!(target: "jarvis::providers", "no conversation key configured; free-form replies disabled");
    }

    Collaborators {
        apps: Arc::new(SystemAppLauncher::new(platform)),
        web: Arc::clone(&web),
        weather: Arc::new(OpenWeatherProvider::from_config(config)),
        messaging: Arc::new(WhatsAppScheduler::from_config(config, Arc::clone(&web))),
        knowledge: Arc::new(WikipediaKnowledge::from_config(config, Arc::clone(&web))),
        conversation,
        system: Arc::new(DesktopActuator::new(platform, config.typing_delay())),
    }
}

pub(crate) fn http_client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent("JARVIS/1.0")
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}

/// Start a process without waiting for it.
pub(crate) fn spawn_detached(
    collaborator: &'static str,
    program: &str,
    args: &[&str],
) -> CoreResult<()> {
    debug!(target: "jarvis::providers", program, ?args, "spawning");
    tokio::process::Command::new(program)
        .args(args)
        .stdin(std::process::Stdio::null())
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .spawn()
        .map(|_| ())
        .map_err(|e| CoreError::unavailable(collaborator, format!("{}: {}", program, e)))
}

/// Run a command to completion; non-zero exit is an error carrying stderr.
pub(crate) async fn run_checked(
    collaborator: &'static str,
    program: &str,
    args: &[&str],
) -> CoreResult<String> {
    debug!(target: "jarvis::providers", program, ?args, "running");
    let output = tokio::process::Command::new(program)
        .args(args)
        .output()
        .await
        .map_err(|e| CoreError::unavailable(collaborator, format!("{}: {}", program, e)))?;
    if output.status.success() {
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        Err(CoreError::unavailable(
            collaborator,
            format!("{} exited with {}: {}", program, output.status, stderr),
        ))
    }
}
