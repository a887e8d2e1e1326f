//! Voice input: microphone phrase → STT → command text, plus the optional long-lived listen worker.

use crate::capture::{CaptureConfig, MicCapture};
use crate::error::{VoiceError, VoiceResult};
use crate::stt::{create_best_stt, SttBackend};
use jarvis_core::Listener;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Microphone + STT. Every failure (no device, API error, silence) ends as `None`.
pub struct MicListener {
    capture: MicCapture,
    stt: Box<dyn SttBackend>,
}

impl MicListener {
    pub fn new(config: CaptureConfig, stt: Box<dyn SttBackend>) -> Self {
        Self {
            capture: MicCapture::new(config),
            stt,
        }
    }

    /// Default device with the best STT backend the environment offers.
    pub fn from_assistant(config: &jarvis_core::AssistantConfig) -> Self {
        Self::new(CaptureConfig::from_assistant(config), create_best_stt())
    }

    fn try_listen(&self) -> VoiceResult<Option<String>> {
        let Some(phrase) = self.capture.record_phrase()? else {
            return Ok(None);
        };
        let text = self.stt.transcribe(&phrase)?;
        let text = text.trim();
        Ok((!text.is_empty()).then(|| text.to_string()))
    }
}

impl Listener for MicListener {
    fn listen(&self) -> Option<String> {
        match self.try_listen() {
            Ok(Some(text)) => {
                info!(target: "jarvis::listen", stt = self.stt.name(), text = %text, "heard");
                Some(text)
            }
            Ok(None) => {
                debug!(target: "jarvis::listen", "nothing heard");
                None
            }
            Err(e) => {
                warn!(target: "jarvis::listen", error = %e, "listen failed");
                None
            }
        }
    }
}

/// Wait applied when a listen call comes back empty almost at once (no device, stream
/// rejected). Doubles per consecutive fast miss up to `max`; a call that ran at least
/// `initial` (a real timeout on silence) resets it.
#[derive(Debug, Clone, Copy)]
pub struct RetryBackoff {
    pub initial: Duration,
    pub max: Duration,
}

impl Default for RetryBackoff {
    fn default() -> Self {
        Self {
            initial: Duration::from_millis(250),
            max: Duration::from_secs(5),
        }
    }
}

/// Sleep in short slices so `stop` is not held up by a long backoff.
fn pause(flag: &AtomicBool, wait: Duration) {
    let deadline = Instant::now() + wait;
    while flag.load(Ordering::SeqCst) {
        let now = Instant::now();
        if now >= deadline {
            break;
        }
        thread::sleep((deadline - now).min(Duration::from_millis(50)));
    }
}

/// Named, long-lived thread that keeps calling a [`Listener`] and forwards what it hears.
pub struct ListenWorker {
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl ListenWorker {
    /// Spawn the worker. Heard text arrives on the returned receiver in order.
    pub fn start(
        listener: Arc<dyn Listener>,
    ) -> VoiceResult<(Self, mpsc::UnboundedReceiver<String>)> {
        Self::start_with_backoff(listener, RetryBackoff::default())
    }

    pub fn start_with_backoff(
        listener: Arc<dyn Listener>,
        backoff: RetryBackoff,
    ) -> VoiceResult<(Self, mpsc::UnboundedReceiver<String>)> {
        let (tx, rx) = mpsc::unbounded_channel();
        let running = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&running);
        let handle = thread::Builder::new()
            .name("jarvis-listen".to_string())
            .spawn(move || {
                info!(target: "jarvis::listen", "listen worker started");
                let mut wait = Duration::ZERO;
                while flag.load(Ordering::SeqCst) {
                    let started = Instant::now();
                    let Some(text) = listener.listen() else {
                        if started.elapsed() >= backoff.initial {
                            wait = Duration::ZERO;
                            continue;
                        }
                        wait = (wait * 2).max(backoff.initial).min(backoff.max);
                        debug!(target: "jarvis::listen", ?wait, "listen returned early; backing off");
                        pause(&flag, wait);
                        continue;
                    };
                    wait = Duration::ZERO;
                    if !flag.load(Ordering::SeqCst) {
                        break;
                    }
                    if tx.send(text).is_err() {
                        debug!(target: "jarvis::listen", "consumer gone");
                        break;
                    }
                }
                flag.store(false, Ordering::SeqCst);
                info!(target: "jarvis::listen", "listen worker stopped");
            })
            .map_err(|e| VoiceError::Worker(format!("spawn failed: {}", e)))?;
        Ok((
            Self {
                running,
                handle: Some(handle),
            },
            rx,
        ))
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Clear the running flag and wait for the in-flight listen call to return.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!(target: "jarvis::listen", "listen worker panicked");
            }
        }
    }
}

impl Drop for ListenWorker {
    fn drop(&mut self) {
        self.stop();
    }
}
