//! Speech renderers: the only things that ever make sound.
//!
//! A renderer is owned by exactly one speech worker thread and is built inside that thread,
//! so it does not need to be `Send` (rodio's output stream is not).

use crate::error::{VoiceError, VoiceResult};
use crate::tts::{split_for_tts, HttpTts, TtsBackend};
use jarvis_core::Platform;
use rodio::{OutputStream, Sink, Source};
use std::io::Cursor;
use std::process::{Child, Command, Stdio};
use tracing::{info, warn};

/// Words per minute for command-line synthesizers.
const SPEECH_RATE_WPM: u32 = 180;

/// Audio rendering capability driven by the speech worker.
pub trait SpeechRenderer {
    /// Render `text` to completion. Blocks the worker, never a producer.
    fn render(&mut self, text: &str) -> VoiceResult<()>;

    /// Best-effort "stop current playback". Must succeed when nothing is playing.
    fn stop(&mut self) -> VoiceResult<()>;

    fn name(&self) -> &'static str;
}

/// Text-only fallback: logs what would have been spoken.
#[derive(Debug, Default)]
pub struct SilentRenderer;

impl SpeechRenderer for SilentRenderer {
    fn render(&mut self, text: &str) -> VoiceResult<()> {
        info!(target: "jarvis::speech", text = %text, "speak (text only)");
        Ok(())
    }

    fn stop(&mut self) -> VoiceResult<()> {
        Ok(())
    }

    fn name(&self) -> &'static str {
        "silent"
    }
}

/// TTS backend + rodio sink on the default output device.
pub struct SinkRenderer {
    _stream: OutputStream,
    sink: Sink,
    tts: Box<dyn TtsBackend>,
}

impl SinkRenderer {
    pub fn new(tts: Box<dyn TtsBackend>) -> VoiceResult<Self> {
        let (stream, handle) =
            OutputStream::try_default().map_err(|e| VoiceError::Playback(e.to_string()))?;
        let sink = Sink::try_new(&handle).map_err(|e| VoiceError::Playback(e.to_string()))?;
        info!(target: "jarvis::speech", "sink ready for TTS playback");
        Ok(Self {
            _stream: stream,
            sink,
            tts,
        })
    }

    fn queue_bytes(&self, bytes: Vec<u8>) -> VoiceResult<()> {
        let source = rodio::Decoder::new(Cursor::new(bytes))
            .map_err(|e| VoiceError::Playback(format!("Decode failed: {}", e)))?;
        self.sink.append(source.convert_samples::<f32>());
        Ok(())
    }
}

impl SpeechRenderer for SinkRenderer {
    /// Pieces are queued as they are synthesized, so playback of the first overlaps
    /// synthesis of the rest.
    fn render(&mut self, text: &str) -> VoiceResult<()> {
        for piece in split_for_tts(text, self.tts.max_input_chars()) {
            let bytes = self.tts.synthesize(&piece)?;
            if !bytes.is_empty() {
                self.queue_bytes(bytes)?;
            }
        }
        self.sink.sleep_until_end();
        Ok(())
    }

    fn stop(&mut self) -> VoiceResult<()> {
        if !self.sink.empty() {
            self.sink.stop();
            info!(target: "jarvis::speech", "playback stopped");
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "tts-sink"
    }
}

/// The platform's own synthesizer: `say` on macOS, `espeak` on Linux, SAPI through PowerShell on Windows.
pub struct SystemSpeechRenderer {
    platform: Platform,
    child: Option<Child>,
}

impl SystemSpeechRenderer {
    pub fn new(platform: Platform) -> VoiceResult<Self> {
        if platform == Platform::Other {
            return Err(VoiceError::Config(format!(
                "no system speech synthesizer on {}",
                platform
            )));
        }
        Ok(Self {
            platform,
            child: None,
        })
    }

    fn command(&self, text: &str) -> Command {
        match self.platform {
            Platform::MacOs => {
                let rate = SPEECH_RATE_WPM.to_string();
                let mut cmd = Command::new("say");
                cmd.args(["-r", rate.as_str(), text]);
                cmd
            }
            Platform::Windows => {
                let escaped = text.replace('\'', "''");
                let script = format!(
                    "Add-Type -AssemblyName System.Speech; \
                     $s = New-Object System.Speech.Synthesis.SpeechSynthesizer; \
                     $s.Rate = 1; $s.Volume = 90; $s.Speak('{}')",
                    escaped
                );
                let mut cmd = Command::new("powershell");
                cmd.args(["-NoProfile", "-Command", script.as_str()]);
                cmd
            }
            _ => {
                let rate = SPEECH_RATE_WPM.to_string();
                let mut cmd = Command::new("espeak");
                cmd.args(["-s", rate.as_str(), "-a", "180", text]);
                cmd
            }
        }
    }
}

impl SpeechRenderer for SystemSpeechRenderer {
    fn render(&mut self, text: &str) -> VoiceResult<()> {
        let child = self
            .command(text)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;
        let child = self.child.insert(child);
        let status = child.wait();
        self.child = None;
        let status = status?;
        if status.success() {
            Ok(())
        } else {
            Err(VoiceError::Playback(format!("speech command exited with {}", status)))
        }
    }

    fn stop(&mut self) -> VoiceResult<()> {
        if let Some(mut child) = self.child.take() {
            if let Err(e) = child.kill() {
                warn!(target: "jarvis::speech", error = %e, "speech process already gone");
            }
            let _ = child.wait();
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "system"
    }
}

/// Pick the best renderer available on this machine. Runs on the speech worker thread.
///
/// Priority: remote TTS played through rodio when a TTS key is configured and an output device
/// exists, then the platform synthesizer, then text only. Never fails.
pub fn create_best_renderer(platform: Platform) -> Box<dyn SpeechRenderer> {
    if let Ok(tts) = HttpTts::from_env() {
        match SinkRenderer::new(Box::new(tts)) {
            Ok(r) => return Box::new(r),
            Err(e) => warn!(target: "jarvis::speech", error = %e, "TTS playback unavailable"),
        }
    }
    match SystemSpeechRenderer::new(platform) {
        Ok(r) => Box::new(r),
        Err(e) => {
            warn!(target: "jarvis::speech", error = %e, "falling back to text-only speech");
            Box::new(SilentRenderer)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn silent_renderer_always_succeeds() {
        let mut r = SilentRenderer;
        assert!(r.stop().is_ok());
        assert!(r.render("hello").is_ok());
        assert!(r.stop().is_ok());
    }

    #[test]
    fn system_renderer_needs_known_platform() {
        assert!(SystemSpeechRenderer::new(Platform::Other).is_err());
        let mut r = SystemSpeechRenderer::new(Platform::Linux).unwrap();
        // Nothing is playing yet.
        assert!(r.stop().is_ok());
    }

    #[test]
    fn windows_command_escapes_quotes() {
        let r = SystemSpeechRenderer::new(Platform::Windows).unwrap();
        let cmd = r.command("it's done");
        let args: Vec<String> = cmd
            .get_args()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        assert!(args[2].contains("Speak('it''s done')"));
    }
}
