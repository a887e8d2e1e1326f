//! The interactive loop: typed lines and heard phrases go through the same assistant.

use jarvis_core::{default_collaborators, Assistant, AssistantConfig, Listener, SpeechSink};
use jarvis_voice::{ListenWorker, SpeechQueue};
use std::io::Write;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

enum Input {
    Typed(String),
    Heard(String),
}

/// How the loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exit {
    /// Quit command or end of input; let queued speech finish.
    Graceful,
    Interrupted,
}

pub async fn run(
    config: AssistantConfig,
    speech: Option<Arc<SpeechQueue>>,
    listener: Option<Arc<dyn Listener>>,
) -> Exit {
    let mut assistant = Assistant::new(&config, default_collaborators(&config));
    if let Some(queue) = &speech {
        assistant = assistant.with_speech(Arc::clone(queue) as Arc<dyn SpeechSink>);
    }

    let mut voice = None;
    if let Some(listener) = &listener {
        assistant = assistant.with_listener(Arc::clone(listener));
        match ListenWorker::start(Arc::clone(listener)) {
            Ok(started) => voice = Some(started),
            Err(e) => tracing::warn!(error = %e, "voice input unavailable"),
        }
    }
    let (listen_worker, mut heard_rx) = match voice {
        Some((worker, rx)) => (Some(worker), Some(rx)),
        None => (None, None),
    };

    let assistant = Arc::new(assistant);
    let name = assistant.name().to_string();

    let greeting = format!(
        "Hello! I am {}. Type a command, 'history' to review, or 'quit' to exit.",
        name
    );
    println!("{}: {}", name, greeting);
    assistant.speak(&greeting);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut exit = Exit::Graceful;
    loop {
        prompt();
        let input = tokio::select! {
            line = lines.next_line() => match line {
                Ok(Some(line)) => Input::Typed(line),
                Ok(None) => break,
                Err(e) => {
                    tracing::warn!(error = %e, "stdin read failed");
                    break;
                }
            },
            Some(heard) = next_heard(&mut heard_rx) => Input::Heard(heard),
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("CTRL-C received; shutting down");
                exit = Exit::Interrupted;
                break;
            }
        };

        let text = match input {
            Input::Typed(line) => line.trim().to_string(),
            Input::Heard(text) => {
                println!("\nYou (voice): {}", text);
                text
            }
        };
        if text.is_empty() {
            continue;
        }

        match text.to_lowercase().as_str() {
            "history" => {
                println!("{}", assistant.log().render(&name));
                continue;
            }
            "history json" => {
                match assistant.log().to_json() {
                    Ok(json) => println!("{}", json),
                    Err(e) => tracing::warn!(error = %e, "history export failed"),
                }
                continue;
            }
            "listen" => {
                let one_shot = Arc::clone(&assistant);
                let heard = tokio::task::spawn_blocking(move || one_shot.listen())
                    .await
                    .ok()
                    .flatten();
                match heard {
                    Some(heard) => {
                        println!("You (voice): {}", heard);
                        if !answer(&assistant, &name, &heard).await {
                            break;
                        }
                    }
                    None => println!("{}: I didn't catch that.", name),
                }
                continue;
            }
            _ => {}
        }

        if !answer(&assistant, &name, &text).await {
            break;
        }
    }

    if let Some(mut worker) = listen_worker {
        // Joining waits out the in-flight listen call.
        let _ = tokio::task::spawn_blocking(move || worker.stop()).await;
    }
    if let Some(queue) = &speech {
        tracing::debug!(state = ?queue.state(), "speech queue at exit");
    }
    exit
}

/// Dispatch, print and speak one command. `false` when the session should end.
async fn answer(assistant: &Assistant, name: &str, text: &str) -> bool {
    let result = assistant.handle(text).await;
    println!("{}: {}", name, result.text);
    !result.terminal
}

async fn next_heard(rx: &mut Option<mpsc::UnboundedReceiver<String>>) -> Option<String> {
    match rx {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

fn prompt() {
    print!("\nYou: ");
    let _ = std::io::stdout().flush();
}
