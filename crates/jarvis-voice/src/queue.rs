//! **Speech Output Queue**: one long-lived worker thread serializes every spoken reply.
//!
//! Producers call [`SpeechQueue::enqueue`] from any thread; it never blocks on audio. The worker
//! is the only code that touches the [`SpeechRenderer`]. For each task it dequeues, it first asks
//! the renderer to stop whatever is playing, then renders the new text to completion. Utterances
//! are therefore heard in enqueue order and never overlap.
//!
//! ```text
//! producers ──enqueue──→ [ pending (FIFO) ] ──recv (bounded wait)──→ worker ──→ renderer
//!                                                                       │
//!                                        stop() then render() ←─────────┘
//! ```
//!
//! Shutdown clears the running flag; the worker finishes the task in hand, then exits and
//! discards whatever is still pending.

use crate::error::{VoiceError, VoiceResult};
use crate::render::SpeechRenderer;
use chrono::{DateTime, Utc};
use jarvis_core::SpeechSink;
use serde::Serialize;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// `playing_id` value meaning "nothing is rendering". Task ids start at 1.
const IDLE: u64 = 0;

/// One queued unit of text. Owned by the queue once enqueued.
#[derive(Debug, Clone)]
pub struct SpeechTask {
    pub id: u64,
    pub text: String,
    pub enqueued_at: DateTime<Utc>,
}

/// Point-in-time view of the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SpeechQueueState {
    /// Tasks enqueued but not yet taken by the worker.
    pub pending: usize,
    pub playing_id: Option<u64>,
    pub running: bool,
}

struct Shared {
    running: AtomicBool,
    playing_id: AtomicU64,
    pending: AtomicUsize,
}

pub struct SpeechQueue {
    /// Id assignment and channel send happen under this lock so ids follow channel order.
    sender: Mutex<(u64, mpsc::UnboundedSender<SpeechTask>)>,
    shared: Arc<Shared>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl SpeechQueue {
    /// Spawn the worker thread. `poll_interval` bounds how long the worker waits for a task
    /// before re-checking the running flag.
    pub fn start<F>(poll_interval: Duration, make_renderer: F) -> VoiceResult<Self>
    where
        F: FnOnce() -> Box<dyn SpeechRenderer> + Send + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel();
        let shared = Arc::new(Shared {
            running: AtomicBool::new(true),
            playing_id: AtomicU64::new(IDLE),
            pending: AtomicUsize::new(0),
        });

        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .map_err(|e| VoiceError::Worker(format!("runtime init failed: {}", e)))?;

        let worker_shared = Arc::clone(&shared);
        let handle = thread::Builder::new()
            .name("jarvis-speech".to_string())
            .spawn(move || {
                let renderer = make_renderer();
                run_worker(rt, rx, renderer, worker_shared, poll_interval);
            })
            .map_err(|e| VoiceError::Worker(format!("spawn failed: {}", e)))?;

        info!(
            target: "jarvis::speech",
            poll_ms = poll_interval.as_millis() as u64,
            "speech worker started"
        );

        Ok(Self {
            sender: Mutex::new((0, tx)),
            shared,
            worker: Mutex::new(Some(handle)),
        })
    }

    /// Append `text` and return its id. Never blocks on rendering. `None` once shut down.
    pub fn enqueue(&self, text: impl Into<String>) -> Option<u64> {
        if !self.shared.running.load(Ordering::SeqCst) {
            return None;
        }
        let mut guard = self
            .sender
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let (next_id, tx) = &mut *guard;
        let task = SpeechTask {
            id: *next_id + 1,
            text: text.into(),
            enqueued_at: Utc::now(),
        };
        let id = task.id;
        self.shared.pending.fetch_add(1, Ordering::SeqCst);
        if tx.send(task).is_err() {
            decrement(&self.shared.pending);
            debug!(target: "jarvis::speech", "enqueue after worker exit");
            return None;
        }
        *next_id = id;
        debug!(target: "jarvis::speech", id, "speech task enqueued");
        Some(id)
    }

    pub fn state(&self) -> SpeechQueueState {
        let playing = self.shared.playing_id.load(Ordering::SeqCst);
        SpeechQueueState {
            pending: self.shared.pending.load(Ordering::SeqCst),
            playing_id: (playing != IDLE).then_some(playing),
            running: self.shared.running.load(Ordering::SeqCst),
        }
    }

    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::SeqCst)
    }

    /// Stop accepting tasks, let the worker finish its current one, then join it.
    /// Pending tasks are discarded. Idempotent.
    pub fn shutdown(&self) {
        self.shared.running.store(false, Ordering::SeqCst);
        let handle = self
            .worker
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        if let Some(handle) = handle {
            if handle.join().is_err() {
                warn!(target: "jarvis::speech", "speech worker panicked");
            }
        }
    }
}

impl SpeechSink for SpeechQueue {
    fn enqueue(&self, text: &str) -> Option<u64> {
        SpeechQueue::enqueue(self, text)
    }
}

impl Drop for SpeechQueue {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run_worker(
    rt: tokio::runtime::Runtime,
    mut rx: mpsc::UnboundedReceiver<SpeechTask>,
    mut renderer: Box<dyn SpeechRenderer>,
    shared: Arc<Shared>,
    poll_interval: Duration,
) {
    info!(target: "jarvis::speech", renderer = renderer.name(), "speech worker ready");

    while shared.running.load(Ordering::SeqCst) {
        let task = match rt.block_on(async { timeout(poll_interval, rx.recv()).await }) {
            Ok(Some(task)) => task,
            Ok(None) => break,
            Err(_) => continue,
        };
        decrement(&shared.pending);
        if !shared.running.load(Ordering::SeqCst) {
            // Shutdown raced the dequeue; this task counts as pending.
            debug!(target: "jarvis::speech", id = task.id, "discarding task at shutdown");
            break;
        }

        if let Err(e) = renderer.stop() {
            debug!(target: "jarvis::speech", error = %e, "stop before render failed");
        }
        shared.playing_id.store(task.id, Ordering::SeqCst);
        let waited_ms = (Utc::now() - task.enqueued_at).num_milliseconds();
        debug!(target: "jarvis::speech", id = task.id, waited_ms, "rendering");
        match panic::catch_unwind(AssertUnwindSafe(|| renderer.render(&task.text))) {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(target: "jarvis::speech", id = task.id, error = %e, "render failed"),
            Err(_) => warn!(target: "jarvis::speech", id = task.id, "renderer panicked"),
        }
        shared.playing_id.store(IDLE, Ordering::SeqCst);
    }

    rx.close();
    let mut discarded = 0usize;
    while rx.try_recv().is_ok() {
        discarded += 1;
    }
    shared.pending.store(0, Ordering::SeqCst);
    shared.running.store(false, Ordering::SeqCst);
    info!(target: "jarvis::speech", discarded, "speech worker stopped");
}

/// Saturating: a late failed enqueue may race the worker resetting the counter.
fn decrement(counter: &AtomicUsize) {
    let _ = counter.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| Some(n.saturating_sub(1)));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::SilentRenderer;

    #[test]
    fn ids_increase_and_state_settles() {
        let queue = SpeechQueue::start(Duration::from_millis(10), || {
            Box::new(SilentRenderer) as Box<dyn SpeechRenderer>
        })
        .unwrap();
        let a = queue.enqueue("one").unwrap();
        let b = queue.enqueue("two").unwrap();
        assert!(b > a);

        for _ in 0..200 {
            if queue.state().pending == 0 && queue.state().playing_id.is_none() {
                break;
            }
            thread::sleep(Duration::from_millis(5));
        }
        let state = queue.state();
        assert_eq!(state.pending, 0);
        assert_eq!(state.playing_id, None);
        assert!(state.running);
    }

    #[test]
    fn enqueue_after_shutdown_is_refused() {
        let queue = SpeechQueue::start(Duration::from_millis(10), || {
            Box::new(SilentRenderer) as Box<dyn SpeechRenderer>
        })
        .unwrap();
        queue.shutdown();
        queue.shutdown();
        assert!(!queue.is_running());
        assert_eq!(queue.enqueue("late"), None);
        assert_eq!(queue.state().pending, 0);
    }
}
