//! The command OS triggers run when a reminder fires.
//!
//! Shows a desktop notification through whatever the platform provides, or
//! prints the reminder when nothing is available (for example over SSH).

use std::process::Command;

use anyhow::{Context, Result};
use tracing::{debug, warn};

const TITLE: &str = "Reminder";
const TIMEOUT_SECS: u32 = 10;

pub fn run(message: &str) -> Result<()> {
    let Some(mut command) = notifier(message) else {
        println!("{TITLE}: {message}");
        return Ok(());
    };

    debug!(?command, "showing notification");
    let status = command
        .status()
        .with_context(|| format!("Failed to run {:?}", command.get_program()))?;
    if !status.success() {
        warn!(%status, "notifier failed, printing reminder instead");
        println!("{TITLE}: {message}");
    }
    Ok(())
}

fn notifier(message: &str) -> Option<Command> {
    if cfg!(windows) {
        let msg = which::which("msg").ok()?;
        let mut command = Command::new(msg);
        command.args(["*", &format!("/TIME:{TIMEOUT_SECS}"), message]);
        Some(command)
    } else if cfg!(target_os = "macos") {
        let osascript = which::which("osascript").ok()?;
        let mut command = Command::new(osascript);
        command.args([
            "-e",
            &format!(
                "display notification {} with title {}",
                applescript_string(message),
                applescript_string(TITLE)
            ),
        ]);
        Some(command)
    } else {
        let notify_send = which::which("notify-send").ok()?;
        let mut command = Command::new(notify_send);
        command.args([
            "--app-name=skilltime",
            &format!("--expire-time={}", TIMEOUT_SECS * 1000),
            "--",
            TITLE,
            message,
        ]);
        Some(command)
    }
}

fn applescript_string(s: &str) -> String {
    format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\""))
}
