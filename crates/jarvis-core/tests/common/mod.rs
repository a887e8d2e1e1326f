//! Recording fakes for every collaborator. Nothing here touches the OS or network.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::Local;
use jarvis_core::{
    AppLauncher, Assistant, AssistantConfig, Collaborators, ConversationAI, CoreError, CoreResult,
    KnowledgeProvider, MessageTarget, MessagingProvider, PowerAction, ScheduledSend, Shortcut,
    SpeechSink, SystemActuator, WeatherProvider, WebActions,
};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

/// Every collaborator call, in order.
#[derive(Default)]
pub struct CallLog {
    calls: Mutex<Vec<String>>,
}

impl CallLog {
    pub fn record(&self, call: impl Into<String>) {
        self.calls.lock().unwrap().push(call.into());
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

pub struct FakeApps(pub Arc<CallLog>);

#[async_trait]
impl AppLauncher for FakeApps {
    async fn open(&self, name: &str) -> CoreResult<String> {
        self.0.record(format!("open:{}", name));
        Ok(format!("Opening {}", name))
    }
    async fn close(&self, name: &str) -> CoreResult<String> {
        self.0.record(format!("close:{}", name));
        Ok(format!("Closing {}", name))
    }
}

pub struct FakeWeb(pub Arc<CallLog>);

#[async_trait]
impl WebActions for FakeWeb {
    async fn search(&self, query: &str) -> CoreResult<()> {
        self.0.record(format!("search:{}", query));
        Ok(())
    }
    async fn open_url(&self, url: &str) -> CoreResult<()> {
        self.0.record(format!("url:{}", url));
        Ok(())
    }
}

pub struct FakeWeather(pub Arc<CallLog>);

#[async_trait]
impl WeatherProvider for FakeWeather {
    async fn get(&self, city: Option<&str>) -> CoreResult<String> {
        self.0.record(format!("weather:{}", city.unwrap_or("<here>")));
        match city {
            Some("atlantis") => Err(CoreError::NotFound(
                "City 'atlantis' not found. Please check the spelling.".to_string(),
            )),
            Some(c) => Ok(format!("Weather in {}: Clear", c)),
            None => Ok("Weather in London: Clear".to_string()),
        }
    }
}

pub struct FakeMessaging(pub Arc<CallLog>);

#[async_trait]
impl MessagingProvider for FakeMessaging {
    async fn schedule_text(
        &self,
        target: &MessageTarget,
        body: &str,
        delay_minutes: u32,
    ) -> CoreResult<ScheduledSend> {
        self.0
            .record(format!("text:{}:{}:{}", target, body, delay_minutes));
        Ok(ScheduledSend {
            recipient: target.to_string(),
            at: Local::now(),
        })
    }
    async fn schedule_file(
        &self,
        target: &MessageTarget,
        path: &str,
        delay_minutes: u32,
    ) -> CoreResult<ScheduledSend> {
        self.0
            .record(format!("file:{}:{}:{}", target, path, delay_minutes));
        Ok(ScheduledSend {
            recipient: target.to_string(),
            at: Local::now(),
        })
    }
}

pub struct FakeKnowledge(pub Arc<CallLog>);

#[async_trait]
impl KnowledgeProvider for FakeKnowledge {
    async fn summarize(&self, topic: &str) -> CoreResult<String> {
        self.0.record(format!("wiki:{}", topic));
        Ok(format!("{} is a topic.", topic))
    }
}

pub struct FakeConversation(pub Arc<CallLog>);

#[async_trait]
impl ConversationAI for FakeConversation {
    async fn reply(&self, message: &str) -> CoreResult<String> {
        self.0.record(format!("chat:{}", message));
        Ok(format!("AI says: {}", message))
    }
}

/// Fails every keyboard call; power obeys a Linux-like platform gate.
pub struct FakeSystem {
    pub log: Arc<CallLog>,
    pub keyboard_broken: bool,
    pub panic_on_screenshot: bool,
}

#[async_trait]
impl SystemActuator for FakeSystem {
    async fn power(&self, action: PowerAction) -> CoreResult<String> {
        self.log.record(format!("power:{:?}", action));
        match action {
            PowerAction::Hibernate => Err(CoreError::unsupported("Hibernate", "Linux")),
            _ => Ok(format!("{:?} requested", action)),
        }
    }
    async fn set_volume(&self, level: u8) -> CoreResult<()> {
        self.log.record(format!("volume:{}", level));
        Ok(())
    }
    async fn shortcut(&self, shortcut: Shortcut) -> CoreResult<()> {
        self.log.record(format!("shortcut:{:?}", shortcut));
        if self.keyboard_broken {
            Err(CoreError::unavailable("keyboard", "no display"))
        } else {
            Ok(())
        }
    }
    async fn press_backspace(&self, count: u32) -> CoreResult<()> {
        self.log.record(format!("backspace:{}", count));
        Ok(())
    }
    async fn type_text(&self, text: &str) -> CoreResult<()> {
        self.log.record(format!("type:{}", text));
        Ok(())
    }
    async fn screenshot(&self) -> CoreResult<PathBuf> {
        self.log.record("screenshot");
        if self.panic_on_screenshot {
            panic!("capture backend crashed");
        }
        Ok(PathBuf::from("/tmp/shot.png"))
    }
    async fn system_info(&self) -> CoreResult<String> {
        self.log.record("sysinfo");
        Ok("System Info: CPU: 1.0%".to_string())
    }
}

/// Records every enqueued utterance.
#[derive(Default)]
pub struct RecordingSpeech {
    pub spoken: Mutex<Vec<String>>,
}

impl SpeechSink for RecordingSpeech {
    fn enqueue(&self, text: &str) -> Option<u64> {
        let mut spoken = self.spoken.lock().unwrap();
        spoken.push(text.to_string());
        Some(spoken.len() as u64)
    }
}

pub struct Harness {
    pub assistant: Assistant,
    pub calls: Arc<CallLog>,
    pub speech: Arc<RecordingSpeech>,
}

pub struct HarnessOptions {
    pub with_conversation: bool,
    pub keyboard_broken: bool,
    pub panic_on_screenshot: bool,
}

impl Default for HarnessOptions {
    fn default() -> Self {
        Self {
            with_conversation: true,
            keyboard_broken: false,
            panic_on_screenshot: false,
        }
    }
}

pub fn harness() -> Harness {
    harness_with(HarnessOptions::default())
}

pub fn harness_with(opts: HarnessOptions) -> Harness {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    let calls = Arc::new(CallLog::default());
    let collaborators = Collaborators {
        apps: Arc::new(FakeApps(Arc::clone(&calls))),
        web: Arc::new(FakeWeb(Arc::clone(&calls))),
        weather: Arc::new(FakeWeather(Arc::clone(&calls))),
        messaging: Arc::new(FakeMessaging(Arc::clone(&calls))),
        knowledge: Arc::new(FakeKnowledge(Arc::clone(&calls))),
        conversation: if opts.with_conversation {
            Some(Arc::new(FakeConversation(Arc::clone(&calls))) as Arc<dyn ConversationAI>)
        } else {
            None
        },
        system: Arc::new(FakeSystem {
            log: Arc::clone(&calls),
            keyboard_broken: opts.keyboard_broken,
            panic_on_screenshot: opts.panic_on_screenshot,
        }),
    };
    let speech = Arc::new(RecordingSpeech::default());
    let assistant = Assistant::new(&AssistantConfig::default(), collaborators)
        .with_speech(Arc::clone(&speech) as Arc<dyn SpeechSink>);
    Harness {
        assistant,
        calls,
        speech,
    }
}
