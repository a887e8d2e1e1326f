//! End-to-end command handling against recording collaborators.
//!
//! Verifies that every utterance gets exactly one reply, that failures surface as text,
//! and that the session log and speech sink see what the user would.
//!
//! Run with: `cargo test --test assistant_test`

mod common;

use common::{harness, harness_with, HarnessOptions};
use jarvis_core::dispatcher::AI_UNAVAILABLE;
use jarvis_core::extract::MESSAGING_USAGE;
use jarvis_core::{Speaker, Utterance, QUIT_SENTINEL};
use proptest::prelude::*;

#[tokio::test]
async fn quit_returns_sentinel_and_calls_nothing() {
    let h = harness();
    let reply = h.assistant.process_command("open chrome then goodbye").await;
    assert_eq!(reply, QUIT_SENTINEL);
    assert!(h.calls.calls().is_empty());

    let result = h.assistant.handle("bye").await;
    assert!(result.terminal);
    assert_eq!(h.speech.spoken.lock().unwrap().as_slice(), ["Goodbye!"]);
}

#[tokio::test]
async fn typing_preserves_case_and_wins_over_greeting() {
    let h = harness();
    let reply = h.assistant.process_command("Write Hello World").await;
    assert_eq!(reply, "Typed: Hello World");
    assert_eq!(h.calls.calls(), vec!["type:Hello World"]);
}

#[tokio::test]
async fn out_of_range_volume_is_reported_not_applied() {
    let h = harness();
    let reply = h.assistant.process_command("set volume 1050").await;
    assert!(reply.contains("1050"), "reply was {:?}", reply);
    assert!(h.calls.calls().iter().all(|c| !c.starts_with("volume:")));

    let reply = h.assistant.process_command("set volume 40").await;
    assert_eq!(reply, "Volume set to 40%");
    assert_eq!(h.calls.calls(), vec!["volume:40"]);
}

#[tokio::test]
async fn arithmetic_answers_locally() {
    let h = harness();
    let reply = h.assistant.process_command("what is 2 + 2").await;
    assert!(reply.contains('4'), "reply was {:?}", reply);
    assert_eq!(
        h.assistant.process_command("what is 12 divided by 4?").await,
        "The answer is 3"
    );
    assert!(h.calls.calls().is_empty());
}

#[tokio::test]
async fn malformed_arithmetic_falls_back_to_conversation() {
    let h = harness();
    let reply = h.assistant.process_command("e-mail john").await;
    assert_eq!(reply, "AI says: e-mail john");

    let offline = harness_with(HarnessOptions {
        with_conversation: false,
        ..Default::default()
    });
    assert_eq!(offline.assistant.process_command("2 + + ").await, AI_UNAVAILABLE);
}

#[tokio::test]
async fn unmatched_text_goes_to_conversation() {
    let h = harness();
    let reply = h.assistant.process_command("tell me a joke").await;
    assert_eq!(reply, "AI says: tell me a joke");
    assert_eq!(h.calls.calls(), vec!["chat:tell me a joke"]);
}

#[tokio::test]
async fn incomplete_message_asks_for_clarification() {
    let h = harness();
    let result = h.assistant.handle("send a message saying hi").await;
    assert_eq!(result.text, MESSAGING_USAGE);
    assert!(!result.terminal);
    assert!(h.calls.calls().is_empty());
    // Only the clarification is spoken, never the raw command.
    assert_eq!(
        h.speech.spoken.lock().unwrap().as_slice(),
        [MESSAGING_USAGE]
    );
}

#[tokio::test]
async fn complete_message_is_scheduled_with_configured_delay() {
    let h = harness();
    let reply = h
        .assistant
        .process_command("send message to mom saying dinner at 8")
        .await;
    assert!(reply.starts_with("WhatsApp message scheduled to mom"), "{}", reply);
    assert!(reply.ends_with("will open in 2 minutes."), "{}", reply);
    assert_eq!(h.calls.calls(), vec!["text:mom:dinner at 8:2"]);
}

#[tokio::test]
async fn collaborator_errors_become_text() {
    let h = harness_with(HarnessOptions {
        keyboard_broken: true,
        ..Default::default()
    });
    let reply = h.assistant.process_command("copy").await;
    assert_eq!(reply, "Sorry, keyboard is unavailable right now (no display).");

    assert_eq!(
        h.assistant.process_command("hibernate").await,
        "Hibernate is not supported on Linux."
    );
    assert_eq!(
        h.assistant.process_command("weather in atlantis").await,
        "City 'atlantis' not found. Please check the spelling."
    );
}

#[tokio::test]
async fn panicking_collaborator_still_yields_a_reply() {
    let h = harness_with(HarnessOptions {
        panic_on_screenshot: true,
        ..Default::default()
    });
    let reply = h.assistant.process_command("take a screenshot").await;
    assert!(reply.contains("something went wrong"), "reply was {:?}", reply);

    // The assistant keeps working afterwards.
    assert_eq!(
        h.assistant.process_command("hello").await,
        "Hello! How can I assist you today?"
    );
}

#[tokio::test]
async fn odd_inputs_never_panic_and_always_reply() {
    let h = harness();
    let long = "play ".repeat(2_000);
    let inputs = [
        "",
        "   ",
        "🙂🙂🙂",
        "ÉCRIRE ça",
        "backspace 99999999999999999999999",
        "+",
        "((((",
        "wikipedia",
        "open",
        long.as_str(),
    ];
    for input in inputs {
        let result = h.assistant.respond(Utterance::new(input)).await;
        assert!(!result.terminal, "{:?} ended the session", input);
    }
    assert_eq!(h.assistant.log().len(), inputs.len() * 2);
}

#[tokio::test]
async fn deeply_signed_arithmetic_falls_back_instead_of_overflowing() {
    let h = harness();
    let input = format!("what is {}1", "-".repeat(10_000));
    let reply = h.assistant.process_command(&input).await;
    assert_eq!(reply, format!("AI says: {}", input));

    let nested = format!("what is {}2{}", "(".repeat(4_000), ")".repeat(4_000));
    let reply = h.assistant.process_command(&nested).await;
    assert!(reply.starts_with("AI says: "), "{}", reply);
}

/// Operator-heavy text that reaches the arithmetic path.
fn arithmetic_noise() -> impl Strategy<Value = String> {
    prop_oneof![
        "what is [-+*/%(). 0-9]{0,300}",
        (1usize..20_000).prop_map(|n| format!("what is {}1", "-".repeat(n))),
        (1usize..5_000).prop_map(|n| format!("what is {}1{}", "(".repeat(n), ")".repeat(n))),
        (1usize..3_000).prop_map(|n| format!("what is {}", vec!["9 ** 9"; n].join(" * "))),
    ]
}

fn block_on<F: std::future::Future>(fut: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("test runtime")
        .block_on(fut)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn every_input_gets_exactly_one_reply(input in prop_oneof![any::<String>(), arithmetic_noise()]) {
        let h = harness();
        let result = block_on(h.assistant.respond(Utterance::new(input.as_str())));
        let entries = h.assistant.log().entries();
        prop_assert_eq!(entries.len(), 2);
        prop_assert_eq!(&entries[0].text, &input);
        prop_assert_eq!(&entries[1].text, &result.text);
    }
}

#[tokio::test]
async fn session_log_alternates_user_and_assistant() {
    let h = harness();
    h.assistant.process_command("hello").await;
    h.assistant.process_command("what is 3 * 3").await;

    let entries = h.assistant.log().entries();
    let speakers: Vec<Speaker> = entries.iter().map(|e| e.speaker).collect();
    assert_eq!(
        speakers,
        vec![Speaker::User, Speaker::Assistant, Speaker::User, Speaker::Assistant]
    );
    assert_eq!(entries[2].text, "what is 3 * 3");
    assert_eq!(entries[3].text, "The answer is 9");
    assert!(entries.windows(2).all(|w| w[0].at <= w[1].at));
}

#[tokio::test]
async fn empty_text_is_never_spoken() {
    let h = harness();
    assert_eq!(h.assistant.speak("   "), None);
    assert_eq!(h.assistant.speak(" hi "), Some(1));
    assert_eq!(h.speech.spoken.lock().unwrap().as_slice(), ["hi"]);
}
