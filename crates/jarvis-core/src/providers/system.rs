//! Desktop actuator: power, volume, keyboard, screenshots and telemetry.
//!
//! - Power and volume go through the platform's own commands. Windows volume is driven with
//!   the media volume keys, which move the master level in 2% steps.
//! - Keyboard chords and typing use enigo on a blocking thread.
//! - Telemetry uses sysinfo.

use async_trait::async_trait;
use chrono::Local;
use enigo::{Direction, Enigo, Key, Keyboard, Settings};
use std::path::PathBuf;
use std::time::Duration;
use sysinfo::{Disks, System};
use tracing::{debug, info};

use super::{run_checked, spawn_detached};
use crate::collaborators::{PowerAction, Shortcut, SystemActuator};
use crate::error::{CoreError, CoreResult};
use crate::platform::Platform;

const GIB: f64 = 1024.0 * 1024.0 * 1024.0;

pub struct DesktopActuator {
    platform: Platform,
    typing_delay: Duration,
}

impl DesktopActuator {
    pub fn new(platform: Platform, typing_delay: Duration) -> Self {
        Self {
            platform,
            typing_delay,
        }
    }
}

/// Program, arguments and spoken status for a power action on a platform.
pub fn power_command(
    platform: Platform,
    action: PowerAction,
) -> CoreResult<(&'static str, Vec<&'static str>, &'static str)> {
    use Platform::*;
    use PowerAction::*;
    let cmd = match (action, platform) {
        (Lock, Windows) => (
            "rundll32.exe",
            vec!["user32.dll,LockWorkStation"],
            "Locking screen...",
        ),
        (Lock, MacOs) => ("pmset", vec!["displaysleepnow"], "Locking screen..."),
        (Lock, _) => ("gnome-screensaver-command", vec!["-l"], "Locking screen..."),

        (Sleep, Windows) => (
            "rundll32.exe",
            vec!["powrprof.dll,SetSuspendState", "0,1,0"],
            "Putting system to sleep...",
        ),
        (Sleep, MacOs) => ("pmset", vec!["sleepnow"], "Putting system to sleep..."),
        (Sleep, _) => ("systemctl", vec!["suspend"], "Putting system to sleep..."),

        (Hibernate, Windows) => ("shutdown", vec!["/h"], "Hibernating system..."),
        (Hibernate, other) => return Err(CoreError::unsupported("Hibernate", other)),

        (Shutdown, Windows) => (
            "shutdown",
            vec!["/s", "/t", "30"],
            "System will shutdown in 30 seconds. Say 'cancel shutdown' to abort.",
        ),
        (Shutdown, MacOs) => (
            "sudo",
            vec!["shutdown", "-h", "+1"],
            "System will shutdown in 1 minute.",
        ),
        (Shutdown, _) => ("shutdown", vec!["-h", "+1"], "System will shutdown in 1 minute."),

        (Restart, Windows) => (
            "shutdown",
            vec!["/r", "/t", "30"],
            "System will restart in 30 seconds.",
        ),
        (Restart, MacOs) => (
            "sudo",
            vec!["shutdown", "-r", "+1"],
            "System will restart in 1 minute.",
        ),
        (Restart, _) => ("shutdown", vec!["-r", "+1"], "System will restart in 1 minute."),

        (CancelShutdown, Windows) => ("shutdown", vec!["/a"], "Shutdown cancelled."),
        (CancelShutdown, other) => {
            return Err(CoreError::unsupported("Shutdown cancellation", other))
        }
    };
    Ok(cmd)
}

/// Keys pressed in order and released in reverse. The last key is the one that is "clicked".
pub fn chord(platform: Platform, shortcut: Shortcut) -> Vec<Key> {
    let primary = if platform == Platform::MacOs {
        Key::Meta
    } else {
        Key::Control
    };
    match shortcut {
        Shortcut::NextTab => vec![Key::Control, Key::Tab],
        Shortcut::PreviousTab => vec![Key::Control, Key::Shift, Key::Tab],
        Shortcut::CloseTab => vec![primary, Key::Unicode('w')],
        Shortcut::NewTab => vec![primary, Key::Unicode('t')],
        Shortcut::SwitchWindow if platform == Platform::MacOs => vec![Key::Meta, Key::Tab],
        Shortcut::SwitchWindow => vec![Key::Alt, Key::Tab],
        Shortcut::Minimize if platform == Platform::MacOs => vec![Key::Meta, Key::Unicode('m')],
        Shortcut::Minimize => vec![Key::Meta, Key::DownArrow],
        Shortcut::Maximize if platform == Platform::MacOs => {
            vec![Key::Control, Key::Meta, Key::Unicode('f')]
        }
        Shortcut::Maximize => vec![Key::Meta, Key::UpArrow],
        Shortcut::ShowDesktop => match platform {
            Platform::Windows => vec![Key::Meta, Key::Unicode('d')],
            Platform::MacOs => vec![Key::F11],
            Platform::Linux | Platform::Other => vec![Key::Control, Key::Alt, Key::Unicode('d')],
        },
        Shortcut::Enter => vec![Key::Return],
        Shortcut::SelectAll => vec![primary, Key::Unicode('a')],
        Shortcut::Copy => vec![primary, Key::Unicode('c')],
        Shortcut::Paste => vec![primary, Key::Unicode('v')],
        Shortcut::Cut => vec![primary, Key::Unicode('x')],
        Shortcut::Undo => vec![primary, Key::Unicode('z')],
        Shortcut::Redo if platform == Platform::MacOs => {
            vec![Key::Meta, Key::Shift, Key::Unicode('z')]
        }
        Shortcut::Redo => vec![Key::Control, Key::Unicode('y')],
    }
}

fn keyboard_error(e: impl std::fmt::Debug) -> CoreError {
    CoreError::unavailable("keyboard", format!("{:?}", e))
}

fn press_chord(keys: &[Key]) -> CoreResult<()> {
    let Some((last, modifiers)) = keys.split_last() else {
        return Ok(());
    };
    let mut enigo = Enigo::new(&Settings::default()).map_err(keyboard_error)?;
    for key in modifiers {
        enigo.key(*key, Direction::Press).map_err(keyboard_error)?;
    }
    let clicked = enigo.key(*last, Direction::Click).map_err(keyboard_error);
    // Release modifiers even if the click failed.
    for key in modifiers.iter().rev() {
        let _ = enigo.key(*key, Direction::Release);
    }
    clicked
}

/// Run enigo work off the async runtime.
async fn blocking_keyboard<F>(work: F) -> CoreResult<()>
where
    F: FnOnce() -> CoreResult<()> + Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| CoreError::unavailable("keyboard", e))?
}

const VK_VOLUME_DOWN: u32 = 0xAE;
const VK_VOLUME_UP: u32 = 0xAF;
/// Key presses that take the Windows master volume from any level to zero.
const VOLUME_KEY_RANGE: u32 = 50;

/// Volume-key presses (down, then up) that land on `level`; each press is 2%.
pub fn volume_key_steps(level: u8) -> (u32, u32) {
    let level = u32::from(level.min(100));
    (VOLUME_KEY_RANGE, (level + 1) / 2)
}

fn press_volume_keys(down: u32, up: u32) -> CoreResult<()> {
    let mut enigo = Enigo::new(&Settings::default()).map_err(keyboard_error)?;
    for (key, presses) in [(VK_VOLUME_DOWN, down), (VK_VOLUME_UP, up)] {
        for _ in 0..presses {
            enigo
                .key(Key::Other(key), Direction::Click)
                .map_err(keyboard_error)?;
        }
    }
    Ok(())
}

fn screenshot_path() -> PathBuf {
    let name = format!("screenshot_{}.png", Local::now().format("%Y%m%d_%H%M%S"));
    match dirs::desktop_dir() {
        Some(desktop) if desktop.is_dir() => desktop.join(name),
        _ => PathBuf::from(name),
    }
}

/// One-line CPU / RAM / disk summary.
pub fn system_summary() -> String {
    let mut sys = System::new_all();
    // CPU usage needs two samples.
    std::thread::sleep(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL);
    sys.refresh_cpu();

    let cpu = sys.global_cpu_info().cpu_usage();
    let total = sys.total_memory() as f64;
    let used = sys.used_memory() as f64;
    let mem_pct = if total > 0.0 { used / total * 100.0 } else { 0.0 };

    let disks = Disks::new_with_refreshed_list();
    let root = disks
        .iter()
        .find(|d| d.mount_point() == std::path::Path::new("/"))
        .or_else(|| disks.iter().next());
    let disk = match root {
        Some(d) => {
            let total = d.total_space() as f64;
            let free = d.available_space() as f64;
            let pct = if total > 0.0 { (total - free) / total * 100.0 } else { 0.0 };
            format!("Disk: {:.1}% used, {:.1}GB free", pct, free / GIB)
        }
        None => "Disk: unknown".to_string(),
    };

    format!(
        "System Info: CPU: {:.1}%, RAM: {:.1}% ({:.1}GB / {:.1}GB), {}",
        cpu,
        mem_pct,
        used / GIB,
        total / GIB,
        disk
    )
}

#[async_trait]
impl SystemActuator for DesktopActuator {
    async fn power(&self, action: PowerAction) -> CoreResult<String> {
        let (program, args, status) = power_command(self.platform, action)?;
        info!(target: "jarvis::system", ?action, program, "power action");
        spawn_detached("power control", program, &args)?;
        Ok(status.to_string())
    }

    async fn set_volume(&self, level: u8) -> CoreResult<()> {
        let level = level.min(100);
        match self.platform {
            Platform::MacOs => {
                let script = format!("set volume output volume {}", level);
                run_checked("volume control", "osascript", &["-e", script.as_str()]).await?;
            }
            Platform::Linux => {
                let pct = format!("{}%", level);
                run_checked(
                    "volume control",
                    "pactl",
                    &["set-sink-volume", "@DEFAULT_SINK@", pct.as_str()],
                )
                .await?;
            }
            Platform::Windows => {
                let (down, up) = volume_key_steps(level);
                blocking_keyboard(move || press_volume_keys(down, up))
                    .await
                    .map_err(|e| CoreError::unavailable("volume control", e.user_message()))?;
            }
            other => return Err(CoreError::unsupported("Volume control", other)),
        }
        debug!(target: "jarvis::system", level, "volume set");
        Ok(())
    }

    async fn shortcut(&self, shortcut: Shortcut) -> CoreResult<()> {
        let keys = chord(self.platform, shortcut);
        debug!(target: "jarvis::system", ?shortcut, "pressing chord");
        blocking_keyboard(move || press_chord(&keys)).await
    }

    async fn press_backspace(&self, count: u32) -> CoreResult<()> {
        blocking_keyboard(move || {
            let mut enigo = Enigo::new(&Settings::default()).map_err(keyboard_error)?;
            for _ in 0..count {
                enigo
                    .key(Key::Backspace, Direction::Click)
                    .map_err(keyboard_error)?;
            }
            Ok(())
        })
        .await
    }

    async fn type_text(&self, text: &str) -> CoreResult<()> {
        // Give the user a moment to focus the target window.
        tokio::time::sleep(self.typing_delay).await;
        let text = text.to_string();
        blocking_keyboard(move || {
            let mut enigo = Enigo::new(&Settings::default()).map_err(keyboard_error)?;
            enigo.text(&text).map_err(keyboard_error)
        })
        .await
    }

    async fn screenshot(&self) -> CoreResult<PathBuf> {
        let path = screenshot_path();
        let target = path.to_string_lossy().to_string();
        match self.platform {
            Platform::MacOs => {
                run_checked("screenshot", "screencapture", &["-x", target.as_str()]).await?;
            }
            Platform::Windows => {
                let script = format!(
                    "Add-Type -AssemblyName System.Windows.Forms,System.Drawing; \
                     $b=[System.Windows.Forms.Screen]::PrimaryScreen.Bounds; \
                     $bmp=New-Object System.Drawing.Bitmap $b.Width,$b.Height; \
                     $g=[System.Drawing.Graphics]::FromImage($bmp); \
                     $g.CopyFromScreen($b.Location,[System.Drawing.Point]::Empty,$b.Size); \
                     $bmp.Save('{}')",
                    target.replace('\'', "''")
                );
                run_checked(
                    "screenshot",
                    "powershell.exe",
                    &["-NoProfile", "-ExecutionPolicy", "Bypass", "-Command", script.as_str()],
                )
                .await?;
            }
            Platform::Linux | Platform::Other => {
                run_checked("screenshot", "gnome-screenshot", &["-f", target.as_str()]).await?;
            }
        }
        info!(target: "jarvis::system", path = %path.display(), "screenshot saved");
        Ok(path)
    }

    async fn system_info(&self) -> CoreResult<String> {
        tokio::task::spawn_blocking(system_summary)
            .await
            .map_err(|e| CoreError::unavailable("system info", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hibernate_is_windows_only() {
        assert!(power_command(Platform::Windows, PowerAction::Hibernate).is_ok());
        let err = power_command(Platform::Linux, PowerAction::Hibernate).unwrap_err();
        assert_eq!(err.user_message(), "Hibernate is not supported on Linux.");
    }

    #[test]
    fn shutdown_status_mentions_cancel_on_windows() {
        let (program, args, status) =
            power_command(Platform::Windows, PowerAction::Shutdown).unwrap();
        assert_eq!(program, "shutdown");
        assert_eq!(args, vec!["/s", "/t", "30"]);
        assert!(status.contains("cancel shutdown"));
    }

    #[test]
    fn clipboard_chords_follow_platform_modifier() {
        assert_eq!(
            chord(Platform::Windows, Shortcut::Copy),
            vec![Key::Control, Key::Unicode('c')]
        );
        assert_eq!(
            chord(Platform::MacOs, Shortcut::Copy),
            vec![Key::Meta, Key::Unicode('c')]
        );
        assert_eq!(chord(Platform::Linux, Shortcut::Enter), vec![Key::Return]);
    }

    #[test]
    fn windows_volume_steps_bottom_out_then_climb() {
        assert_eq!(volume_key_steps(0), (50, 0));
        assert_eq!(volume_key_steps(40), (50, 20));
        assert_eq!(volume_key_steps(75), (50, 38));
        assert_eq!(volume_key_steps(100), (50, 50));
        assert_eq!(volume_key_steps(250), (50, 50));
    }

    #[tokio::test]
    async fn volume_unsupported_on_other_platforms() {
        let actuator = DesktopActuator::new(Platform::Other, Duration::ZERO);
        let err = actuator.set_volume(40).await.unwrap_err();
        assert!(matches!(
            err,
            CoreError::UnsupportedOnPlatform { capability: "Volume control", .. }
        ));
    }
}
