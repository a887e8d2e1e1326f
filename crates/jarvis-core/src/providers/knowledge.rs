//! Wikipedia summaries via the REST summary endpoint.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, warn};

use super::http_client;
use crate::collaborators::{KnowledgeProvider, WebActions};
use crate::config::AssistantConfig;
use crate::error::{CoreError, CoreResult};

#[derive(Debug, Deserialize)]
struct PageSummary {
    #[serde(default)]
    extract: String,
    #[serde(default)]
    content_urls: Option<ContentUrls>,
}

#[derive(Debug, Deserialize)]
struct ContentUrls {
    desktop: PageUrl,
}

#[derive(Debug, Deserialize)]
struct PageUrl {
    page: String,
}

pub struct WikipediaKnowledge {
    client: reqwest::Client,
    base_url: String,
    web: Arc<dyn WebActions>,
}

impl WikipediaKnowledge {
    pub fn from_config(config: &AssistantConfig, web: Arc<dyn WebActions>) -> Self {
        Self {
            client: http_client(config.http_timeout()),
            base_url: config.knowledge_base_url.clone(),
            web,
        }
    }
}

/// First `n` sentences, split on '.', rejoined with a trailing period.
pub fn first_sentences(text: &str, n: usize) -> String {
    let sentences: Vec<&str> = text
        .split('.')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .take(n)
        .collect();
    if sentences.is_empty() {
        String::new()
    } else {
        format!("{}.", sentences.join(". "))
    }
}

#[async_trait]
impl KnowledgeProvider for WikipediaKnowledge {
    async fn summarize(&self, topic: &str) -> CoreResult<String> {
        let title = topic.trim().replace(' ', "_");
        let url = format!("{}{}", self.base_url, urlencoding::encode(&title));
        debug!(target: "jarvis::knowledge", %url, "fetching summary");

        let res = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| CoreError::unavailable("Wikipedia", e))?;

        let not_found = || {
            CoreError::NotFound(format!(
                "No Wikipedia article found for '{}'. Try a different search term.",
                topic.trim()
            ))
        };

        let summary: PageSummary = match res.status() {
            StatusCode::OK => res
                .json()
                .await
                .map_err(|e| CoreError::unavailable("Wikipedia", e))?,
            StatusCode::NOT_FOUND => return Err(not_found()),
            status => {
                return Err(CoreError::unavailable(
                    "Wikipedia",
                    format!("HTTP {}", status.as_u16()),
                ))
            }
        };

        let text = first_sentences(&summary.extract, 3);
        if text.is_empty() {
            return Err(not_found());
        }

        if let Some(urls) = summary.content_urls {
            if let Err(e) = self.web.open_url(&urls.desktop.page).await {
                warn!(target: "jarvis::knowledge", error = %e, "could not open article page");
            }
        }
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_first_three_sentences() {
        let text = "Rust is a language. It is fast. It is safe. It has a borrow checker.";
        assert_eq!(
            first_sentences(text, 3),
            "Rust is a language. It is fast. It is safe."
        );
        assert_eq!(first_sentences("", 3), "");
    }
}
