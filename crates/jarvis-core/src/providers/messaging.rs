//! WhatsApp Web scheduling.
//!
//! Sends are deferred: the send time is `now + delay`, and a background task opens the
//! WhatsApp Web chat at that moment. Files are resolved up front so a bad path fails now,
//! not minutes later.

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Local};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::collaborators::{MessagingProvider, ScheduledSend, WebActions};
use crate::config::AssistantConfig;
use crate::error::{CoreError, CoreResult};
use crate::intent::MessageTarget;

const WHATSAPP_SEND_URL: &str = "https://web.whatsapp.com/send";

pub struct WhatsAppScheduler {
    contacts: HashMap<String, String>,
    country_code: String,
    web: Arc<dyn WebActions>,
}

/// A recipient after contact lookup: what to call them and which number to use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRecipient {
    pub label: String,
    pub phone: String,
}

impl WhatsAppScheduler {
    pub fn new(
        contacts: HashMap<String, String>,
        country_code: impl Into<String>,
        web: Arc<dyn WebActions>,
    ) -> Self {
        Self {
            contacts,
            country_code: country_code.into(),
            web,
        }
    }

    pub fn from_config(config: &AssistantConfig, web: Arc<dyn WebActions>) -> Self {
        Self::new(
            config.contacts.clone(),
            config.default_country_code.clone(),
            web,
        )
    }

    pub fn resolve(&self, target: &MessageTarget) -> CoreResult<ResolvedRecipient> {
        match target {
            MessageTarget::Contact(name) => {
                let key = name.trim().to_lowercase();
                match self.contacts.get(&key) {
                    Some(phone) => Ok(ResolvedRecipient {
                        label: key,
                        phone: phone.clone(),
                    }),
                    None => {
                        let mut known: Vec<&str> = self.contacts.keys().map(String::as_str).collect();
                        known.sort_unstable();
                        known.truncate(5);
                        let available = if known.is_empty() {
                            "none configured".to_string()
                        } else {
                            known.join(", ")
                        };
                        Err(CoreError::NotFound(format!(
                            "Contact '{}' not found. Available contacts: {}",
                            key, available
                        )))
                    }
                }
            }
            MessageTarget::Number(number) => {
                let phone = self.normalize_number(number);
                Ok(ResolvedRecipient {
                    label: phone.clone(),
                    phone,
                })
            }
        }
    }

    /// Strip spaces and dashes; prefix the default country code when there is no `+`.
    pub fn normalize_number(&self, number: &str) -> String {
        let compact: String = number
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '-')
            .collect();
        if compact.starts_with('+') {
            compact
        } else {
            format!("{}{}", self.country_code, compact)
        }
    }

    fn chat_url(phone: &str, text: Option<&str>) -> String {
        let digits: String = phone.chars().filter(|c| c.is_ascii_digit()).collect();
        match text {
            Some(body) => format!(
                "{}?phone={}&text={}",
                WHATSAPP_SEND_URL,
                digits,
                urlencoding::encode(body)
            ),
            None => format!("{}?phone={}", WHATSAPP_SEND_URL, digits),
        }
    }

    fn schedule_open(&self, url: String, delay_minutes: u32) {
        let web = Arc::clone(&self.web);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(u64::from(delay_minutes) * 60)).await;
            if let Err(e) = web.open_url(&url).await {
                warn!(target: "jarvis::messaging", error = %e, "scheduled WhatsApp send failed");
            }
        });
    }
}

/// The user's Desktop, Downloads and Pictures folders, in lookup order.
pub fn user_file_dirs() -> Vec<PathBuf> {
    [dirs::desktop_dir(), dirs::download_dir(), dirs::picture_dir()]
        .into_iter()
        .flatten()
        .collect()
}

/// Path as given if it exists, else the same name under each of `search_dirs`.
pub fn resolve_file(path: &str, search_dirs: &[PathBuf]) -> CoreResult<PathBuf> {
    let given = PathBuf::from(path);
    if given.exists() {
        return Ok(given);
    }
    if let Some(found) = search_dirs
        .iter()
        .map(|dir| dir.join(path))
        .find(|candidate| candidate.exists())
    {
        return Ok(found);
    }
    Err(CoreError::NotFound(format!(
        "File not found: {}. Please provide full path or place file on Desktop/Downloads/Pictures.",
        path
    )))
}

#[async_trait]
impl MessagingProvider for WhatsAppScheduler {
    async fn schedule_text(
        &self,
        target: &MessageTarget,
        body: &str,
        delay_minutes: u32,
    ) -> CoreResult<ScheduledSend> {
        let recipient = self.resolve(target)?;
        let at = Local::now() + ChronoDuration::minutes(i64::from(delay_minutes));
        info!(
            target: "jarvis::messaging",
            recipient = %recipient.label,
            at = %at.format("%H:%M"),
            "scheduling WhatsApp message"
        );
        self.schedule_open(Self::chat_url(&recipient.phone, Some(body)), delay_minutes);
        Ok(ScheduledSend {
            recipient: recipient.label,
            at,
        })
    }

    async fn schedule_file(
        &self,
        target: &MessageTarget,
        path: &str,
        delay_minutes: u32,
    ) -> CoreResult<ScheduledSend> {
        let recipient = self.resolve(target)?;
        let file = resolve_file(path, &user_file_dirs())?;
        let at = Local::now() + ChronoDuration::minutes(i64::from(delay_minutes));
        // WhatsApp Web has no URL parameter for attachments; the chat opens and the file is attached there.
        info!(
            target: "jarvis::messaging",
            recipient = %recipient.label,
            file = %file.display(),
            at = %at.format("%H:%M"),
            "scheduling WhatsApp file"
        );
        self.schedule_open(Self::chat_url(&recipient.phone, None), delay_minutes);
        Ok(ScheduledSend {
            recipient: recipient.label,
            at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingWeb {
        opened: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl WebActions for RecordingWeb {
        async fn search(&self, _query: &str) -> CoreResult<()> {
            Ok(())
        }
        async fn open_url(&self, url: &str) -> CoreResult<()> {
            self.opened.lock().unwrap().push(url.to_string());
            Ok(())
        }
    }

    fn scheduler(web: Arc<RecordingWeb>) -> WhatsAppScheduler {
        let mut contacts = HashMap::new();
        contacts.insert("alice".to_string(), "+15550100".to_string());
        WhatsAppScheduler::new(contacts, "+91", web)
    }

    #[test]
    fn raw_numbers_get_country_code() {
        let s = scheduler(Arc::new(RecordingWeb::default()));
        assert_eq!(s.normalize_number("98765 43210"), "+919876543210");
        assert_eq!(s.normalize_number("+1 555-0100"), "+15550100");
    }

    #[test]
    fn unknown_contact_lists_available() {
        let s = scheduler(Arc::new(RecordingWeb::default()));
        let err = s.resolve(&MessageTarget::Contact("Bob".into())).unwrap_err();
        assert_eq!(
            err.user_message(),
            "Contact 'bob' not found. Available contacts: alice"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn text_opens_chat_after_delay() {
        let web = Arc::new(RecordingWeb::default());
        let s = scheduler(Arc::clone(&web));
        let before = Local::now();
        let sent = s
            .schedule_text(&MessageTarget::Contact("Alice".into()), "hi there", 2)
            .await
            .unwrap();
        assert_eq!(sent.recipient, "alice");
        assert!(sent.at >= before + ChronoDuration::minutes(2));
        assert!(web.opened.lock().unwrap().is_empty());

        tokio::time::sleep(Duration::from_secs(121)).await;
        let opened = web.opened.lock().unwrap().clone();
        assert_eq!(
            opened,
            vec!["https://web.whatsapp.com/send?phone=15550100&text=hi%20there".to_string()]
        );
    }

    #[test]
    fn file_resolves_under_user_folders_in_order() {
        let home = tempfile::tempdir().unwrap();
        let desktop = home.path().join("Desktop");
        let downloads = home.path().join("Downloads");
        std::fs::create_dir_all(&desktop).unwrap();
        std::fs::create_dir_all(&downloads).unwrap();
        std::fs::write(downloads.join("report.pdf"), b"%PDF").unwrap();
        std::fs::write(desktop.join("notes.txt"), b"a").unwrap();
        std::fs::write(downloads.join("notes.txt"), b"b").unwrap();
        let dirs = vec![desktop.clone(), downloads.clone()];

        assert_eq!(resolve_file("report.pdf", &dirs).unwrap(), downloads.join("report.pdf"));
        assert_eq!(resolve_file("notes.txt", &dirs).unwrap(), desktop.join("notes.txt"));
        assert!(matches!(
            resolve_file("missing.pdf", &dirs),
            Err(CoreError::NotFound(_))
        ));
    }
}
