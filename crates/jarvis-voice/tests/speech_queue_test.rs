//! Speech queue ordering and exclusivity, driven by a recording renderer (no audio device).
//!
//! Run with: `cargo test -p jarvis-voice --test speech_queue_test`

use jarvis_voice::{SpeechQueue, SpeechRenderer, VoiceError, VoiceResult};
use proptest::prelude::*;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Event {
    Stop,
    Render(String),
}

#[derive(Default)]
struct Recorder {
    events: Mutex<Vec<Event>>,
    active: AtomicUsize,
    max_active: AtomicUsize,
}

impl Recorder {
    fn rendered(&self) -> Vec<String> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter_map(|e| match e {
                Event::Render(t) => Some(t.clone()),
                Event::Stop => None,
            })
            .collect()
    }
}

struct RecordingRenderer {
    recorder: Arc<Recorder>,
    render_time: Duration,
}

impl SpeechRenderer for RecordingRenderer {
    fn render(&mut self, text: &str) -> VoiceResult<()> {
        let now = self.recorder.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.recorder.max_active.fetch_max(now, Ordering::SeqCst);
        self.recorder
            .events
            .lock()
            .unwrap()
            .push(Event::Render(text.to_string()));
        thread::sleep(self.render_time);
        self.recorder.active.fetch_sub(1, Ordering::SeqCst);
        if text == "boom" {
            return Err(VoiceError::Playback("device unplugged".into()));
        }
        Ok(())
    }

    fn stop(&mut self) -> VoiceResult<()> {
        self.recorder.events.lock().unwrap().push(Event::Stop);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "recording"
    }
}

fn start(render_time: Duration) -> (SpeechQueue, Arc<Recorder>) {
    let recorder = Arc::new(Recorder::default());
    let for_worker = Arc::clone(&recorder);
    let queue = SpeechQueue::start(Duration::from_millis(5), move || {
        Box::new(RecordingRenderer {
            recorder: for_worker,
            render_time,
        }) as Box<dyn SpeechRenderer>
    })
    .expect("start speech queue");
    (queue, recorder)
}

fn wait_for(mut done: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(10);
    while !done() {
        assert!(Instant::now() < deadline, "timed out waiting for the speech worker");
        thread::sleep(Duration::from_millis(2));
    }
}

#[test]
fn each_render_is_preceded_by_a_stop() {
    let (queue, recorder) = start(Duration::from_millis(1));
    queue.enqueue("A");
    queue.enqueue("B");
    wait_for(|| recorder.rendered().len() == 2);

    assert_eq!(
        *recorder.events.lock().unwrap(),
        vec![
            Event::Stop,
            Event::Render("A".into()),
            Event::Stop,
            Event::Render("B".into()),
        ]
    );
}

#[test]
fn later_task_waits_for_earlier_render() {
    let (queue, recorder) = start(Duration::from_millis(40));
    queue.enqueue("A");
    // B arrives while A is still rendering.
    wait_for(|| queue.state().playing_id == Some(1));
    queue.enqueue("B");
    assert_eq!(queue.state().pending, 1);
    wait_for(|| recorder.rendered().len() == 2);

    assert_eq!(recorder.rendered(), vec!["A", "B"]);
    assert_eq!(recorder.max_active.load(Ordering::SeqCst), 1);
}

#[test]
fn render_failure_does_not_kill_the_worker() {
    let (queue, recorder) = start(Duration::from_millis(1));
    queue.enqueue("boom");
    queue.enqueue("still here");
    wait_for(|| recorder.rendered().len() == 2);
    assert!(queue.state().running);
    assert_eq!(recorder.rendered(), vec!["boom", "still here"]);
}

#[test]
fn shutdown_finishes_current_task_and_discards_pending() {
    let (queue, recorder) = start(Duration::from_millis(60));
    for i in 0..5 {
        queue.enqueue(format!("task {}", i));
    }
    wait_for(|| queue.state().playing_id == Some(1));
    queue.shutdown();

    assert_eq!(recorder.rendered(), vec!["task 0"]);
    let state = queue.state();
    assert!(!state.running);
    assert_eq!(state.pending, 0);
    assert_eq!(state.playing_id, None);
    assert_eq!(queue.enqueue("after"), None);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(12))]

    /// Randomized concurrent producers: renders follow id order, every producer's own
    /// utterances stay in its order, and never more than one render is active.
    #[test]
    fn concurrent_enqueues_render_in_fifo_order(plan in prop::collection::vec(1usize..6, 1..5)) {
        let (queue, recorder) = start(Duration::from_micros(200));
        let queue = Arc::new(queue);
        let ids: Arc<Mutex<HashMap<String, u64>>> = Arc::default();

        let producers: Vec<_> = plan
            .iter()
            .enumerate()
            .map(|(p, &count)| {
                let queue = Arc::clone(&queue);
                let ids = Arc::clone(&ids);
                thread::spawn(move || {
                    for i in 0..count {
                        let text = format!("p{}-{}", p, i);
                        let id = queue.enqueue(text.clone()).expect("queue running");
                        ids.lock().unwrap().insert(text, id);
                    }
                })
            })
            .collect();
        for handle in producers {
            handle.join().unwrap();
        }

        let total: usize = plan.iter().sum();
        wait_for(|| recorder.rendered().len() == total);

        let rendered = recorder.rendered();
        let ids = ids.lock().unwrap();
        let order: Vec<u64> = rendered.iter().map(|t| ids[t]).collect();
        prop_assert!(order.windows(2).all(|w| w[0] < w[1]), "render order {:?}", order);

        for (p, &count) in plan.iter().enumerate() {
            let mine: Vec<String> = rendered
                .iter()
                .filter(|t| t.starts_with(&format!("p{}-", p)))
                .cloned()
                .collect();
            let expected: Vec<String> = (0..count).map(|i| format!("p{}-{}", p, i)).collect();
            prop_assert_eq!(mine, expected);
        }
        prop_assert_eq!(recorder.max_active.load(Ordering::SeqCst), 1);
        queue.shutdown();
    }
}
