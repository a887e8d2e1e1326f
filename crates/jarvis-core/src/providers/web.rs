//! Browser navigation through the platform's URL opener.

use async_trait::async_trait;
use tracing::info;

use super::spawn_detached;
use crate::collaborators::WebActions;
use crate::error::CoreResult;
use crate::platform::Platform;

pub struct BrowserWeb {
    platform: Platform,
    search_url: String,
}

impl BrowserWeb {
    pub fn new(platform: Platform, search_url: &str) -> Self {
        Self {
            platform,
            search_url: search_url.to_string(),
        }
    }

    pub fn search_url_for(&self, query: &str) -> String {
        format!("{}{}", self.search_url, urlencoding::encode(query))
    }
}

#[async_trait]
impl WebActions for BrowserWeb {
    async fn search(&self, query: &str) -> CoreResult<()> {
        self.open_url(&self.search_url_for(query)).await
    }

    async fn open_url(&self, url: &str) -> CoreResult<()> {
        info!(target: "jarvis::web", url, "opening");
        match self.platform {
            // The empty title argument keeps `start` from treating a quoted URL as the title.
            Platform::Windows => spawn_detached("browser", "cmd", &["/C", "start", "", url]),
            Platform::MacOs => spawn_detached("browser", "open", &[url]),
            Platform::Linux | Platform::Other => spawn_detached("browser", "xdg-open", &[url]),
        }
    }
}
