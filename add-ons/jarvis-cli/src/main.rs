//! JARVIS - interactive voice assistant.
//!
//! Reads commands from stdin (and, with `--voice`, from the microphone), answers each one,
//! and speaks the reply through the speech worker. The voice components are built and torn
//! down outside the async runtime because their HTTP backends are blocking clients.

mod repl;

use clap::Parser;
use jarvis_core::{AssistantConfig, Listener, Platform};
use jarvis_voice::{create_best_renderer, MicListener, SilentRenderer, SpeechQueue, SpeechRenderer};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// JARVIS - deterministic voice assistant
#[derive(Parser)]
#[command(name = "jarvis")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Voice assistant: open apps, search, weather, messaging, keyboard and system control")]
struct Cli {
    /// Also listen on the default microphone
    #[arg(long, env = "JARVIS_VOICE")]
    voice: bool,

    /// Print replies without speaking them
    #[arg(long)]
    mute: bool,

    /// Configuration file (TOML). Overrides JARVIS_CONFIG.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    // Load .env file if present (before any env::var calls)
    if let Err(e) = dotenvy::dotenv() {
        eprintln!("[jarvis] .env not loaded: {} (using system environment)", e);
    }

    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| default_level.into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Some(path) = &cli.config {
        std::env::set_var("JARVIS_CONFIG", path);
    }
    let config = AssistantConfig::load_or_default();
    let platform = Platform::current();

    let mute = cli.mute;
    let speech = match SpeechQueue::start(config.speech_poll_interval(), move || {
        if mute {
            Box::new(SilentRenderer) as Box<dyn SpeechRenderer>
        } else {
            create_best_renderer(platform)
        }
    }) {
        Ok(queue) => Some(Arc::new(queue)),
        Err(e) => {
            tracing::warn!(error = %e, "speech worker unavailable; running text only");
            None
        }
    };

    let listener: Option<Arc<dyn Listener>> = cli
        .voice
        .then(|| Arc::new(MicListener::from_assistant(&config)) as Arc<dyn Listener>);

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            tracing::error!(error = %e, "failed to start async runtime");
            std::process::exit(1);
        }
    };

    tracing::info!(
        assistant = %config.assistant_name,
        platform = %platform,
        voice = cli.voice,
        speech = speech.is_some(),
        "JARVIS started"
    );

    let exit = runtime.block_on(repl::run(config, speech.clone(), listener.clone()));
    drop(runtime);

    if let Some(queue) = speech {
        if exit == repl::Exit::Graceful {
            wait_for_silence(&queue, Duration::from_secs(10));
        }
        queue.shutdown();
    }
    tracing::info!("JARVIS stopped");
}

/// Give queued replies (the goodbye, usually) a chance to be heard before shutdown discards them.
fn wait_for_silence(queue: &SpeechQueue, limit: Duration) {
    let deadline = Instant::now() + limit;
    while Instant::now() < deadline {
        let state = queue.state();
        if !state.running || (state.pending == 0 && state.playing_id.is_none()) {
            return;
        }
        std::thread::sleep(Duration::from_millis(50));
    }
}
