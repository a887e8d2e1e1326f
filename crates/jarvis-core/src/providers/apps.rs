//! Application launcher backed by a per-platform table of friendly names.

use async_trait::async_trait;
use tracing::info;

use super::{run_checked, spawn_detached};
use crate::collaborators::AppLauncher;
use crate::error::{CoreError, CoreResult};
use crate::platform::Platform;

/// Ordered: the first entry whose name contains, or is contained in, the request wins.
pub fn app_table(platform: Platform) -> Vec<(&'static str, &'static str)> {
    match platform {
        Platform::Windows => vec![
            ("notepad", "notepad.exe"),
            ("calculator", "calc.exe"),
            ("paint", "mspaint.exe"),
            ("chrome", "chrome.exe"),
            ("google chrome", "chrome.exe"),
            ("firefox", "firefox.exe"),
            ("edge", "msedge.exe"),
            ("microsoft edge", "msedge.exe"),
            ("explorer", "explorer.exe"),
            ("file explorer", "explorer.exe"),
            ("cmd", "cmd.exe"),
            ("command prompt", "cmd.exe"),
            ("powershell", "powershell.exe"),
            ("task manager", "taskmgr.exe"),
            ("control panel", "control.exe"),
            ("settings", "ms-settings:"),
            ("word", "winword.exe"),
            ("excel", "excel.exe"),
            ("powerpoint", "powerpnt.exe"),
            ("outlook", "outlook.exe"),
            ("vscode", "code.exe"),
            ("visual studio code", "code.exe"),
            ("spotify", "spotify.exe"),
            ("discord", "discord.exe"),
            ("steam", "steam.exe"),
        ],
        Platform::MacOs => vec![
            ("safari", "Safari"),
            ("chrome", "Google Chrome"),
            ("firefox", "Firefox"),
            ("notes", "Notes"),
            ("calculator", "Calculator"),
            ("terminal", "Terminal"),
            ("finder", "Finder"),
            ("spotify", "Spotify"),
        ],
        Platform::Linux | Platform::Other => vec![
            ("firefox", "firefox"),
            ("chrome", "google-chrome"),
            ("terminal", "gnome-terminal"),
            ("calculator", "gnome-calculator"),
            ("files", "nautilus"),
            ("text editor", "gedit"),
        ],
    }
}

pub struct SystemAppLauncher {
    platform: Platform,
    apps: Vec<(&'static str, &'static str)>,
}

impl SystemAppLauncher {
    pub fn new(platform: Platform) -> Self {
        Self {
            platform,
            apps: app_table(platform),
        }
    }

    /// Fuzzy containment in either direction.
    pub fn find(&self, name: &str) -> Option<(&'static str, &'static str)> {
        let name = name.trim().to_lowercase();
        if name.is_empty() {
            return None;
        }
        self.apps
            .iter()
            .copied()
            .find(|(key, _)| name.contains(key) || key.contains(name.as_str()))
    }

    fn known_names(&self, limit: usize) -> String {
        self.apps
            .iter()
            .take(limit)
            .map(|(key, _)| *key)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[async_trait]
impl AppLauncher for SystemAppLauncher {
    async fn open(&self, name: &str) -> CoreResult<String> {
        let Some((key, target)) = self.find(name) else {
            return Err(CoreError::NotFound(format!(
                "I don't know how to open {}. Try: {}",
                name.trim(),
                self.known_names(8)
            )));
        };
        info!(target: "jarvis::apps", app = key, target, "opening application");
        match self.platform {
            Platform::Windows => spawn_detached("app launcher", "cmd", &["/C", "start", "", target])?,
            Platform::MacOs => spawn_detached("app launcher", "open", &["-a", target])?,
            Platform::Linux | Platform::Other => spawn_detached("app launcher", target, &[])?,
        }
        Ok(format!("Opening {}", key))
    }

    async fn close(&self, name: &str) -> CoreResult<String> {
        let Some((key, target)) = self.find(name) else {
            return Err(CoreError::NotFound(format!(
                "Couldn't find {} to close",
                name.trim()
            )));
        };
        info!(target: "jarvis::apps", app = key, target, "closing application");
        match self.platform {
            Platform::Windows => {
                run_checked("app launcher", "taskkill", &["/F", "/IM", target]).await?
            }
            Platform::MacOs | Platform::Linux | Platform::Other => {
                run_checked("app launcher", "pkill", &["-f", target]).await?
            }
        };
        Ok(format!("Closing {}", key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn containment_matches_either_direction() {
        let launcher = SystemAppLauncher::new(Platform::Windows);
        assert_eq!(launcher.find("google chrome please").map(|a| a.0), Some("chrome"));
        assert_eq!(launcher.find("calc").map(|a| a.1), Some("calc.exe"));
        assert_eq!(launcher.find("  ").map(|a| a.0), None);
    }

    #[tokio::test]
    async fn unknown_app_lists_known_names() {
        let launcher = SystemAppLauncher::new(Platform::Linux);
        let err = launcher.open("blender").await.unwrap_err();
        let msg = err.user_message();
        assert!(msg.starts_with("I don't know how to open blender. Try: firefox, chrome"));
    }
}
