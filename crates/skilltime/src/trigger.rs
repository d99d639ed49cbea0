//! One-shot OS triggers.
//!
//! Firing a reminder at a wall-clock time after this process has exited is the
//! operating system's job. This module only knows how to create and delete a
//! single named, one-shot entry in the platform scheduler.

use std::process::Command;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Result, SkillTimeError};
use crate::zone::TimePoint;

/// The fixed program a trigger runs. The reminder message is appended as the
/// final argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl TriggerCommand {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Full argument vector, program first, for `message`.
    ///
    /// A `--` precedes the message so text starting with `-` is never read
    /// as an option.
    pub fn argv(&self, message: &str) -> Vec<String> {
        let mut argv = Vec::with_capacity(self.args.len() + 3);
        argv.push(self.program.clone());
        argv.extend(self.args.iter().cloned());
        argv.push("--".to_string());
        argv.push(message.to_string());
        argv
    }
}

/// A single scheduler entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OneShotTrigger {
    /// Scheduler-visible name; embeds the scheduled action's id.
    pub name: String,
    /// Program and arguments to run.
    pub argv: Vec<String>,
    /// When to run, expressed in the zone the host scheduler uses.
    pub run_at: TimePoint,
}

impl OneShotTrigger {
    /// Local run date, `YYYY-MM-DD`.
    pub fn run_at_date(&self) -> String {
        self.run_at.format("%Y-%m-%d").to_string()
    }

    /// Local run time, `HH:MM:SS`.
    pub fn run_at_time(&self) -> String {
        self.run_at.format("%H:%M:%S").to_string()
    }
}

/// Create/delete access to a platform scheduler.
pub trait TriggerScheduler: Send + Sync {
    /// Register `trigger` to run once.
    fn create(&self, trigger: &OneShotTrigger) -> Result<()>;

    /// Remove the trigger called `name`. Fails if the scheduler no longer
    /// knows it (for example because it already fired).
    fn delete(&self, name: &str) -> Result<()>;
}

/// Which [`TriggerScheduler`] to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SchedulerKind {
    /// `schtasks` on Windows, `systemd-run` elsewhere.
    #[default]
    Auto,
    Systemd,
    Schtasks,
    /// Log instead of touching the OS.
    DryRun,
}

impl SchedulerKind {
    pub fn build(self) -> Box<dyn TriggerScheduler> {
        match self {
            SchedulerKind::Auto => platform_default(),
            SchedulerKind::Systemd => Box::new(SystemdScheduler),
            SchedulerKind::Schtasks => Box::new(SchtasksScheduler),
            SchedulerKind::DryRun => Box::new(DryRunScheduler),
        }
    }
}

/// The scheduler for the target platform.
pub fn platform_default() -> Box<dyn TriggerScheduler> {
    if cfg!(windows) {
        Box::new(SchtasksScheduler)
    } else {
        Box::new(SystemdScheduler)
    }
}

// ── systemd ─────────────────────────────────────────────────────────────────

/// Transient user timers via `systemd-run --user`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemdScheduler;

impl SystemdScheduler {
    fn create_args(trigger: &OneShotTrigger) -> Vec<String> {
        // systemd accepts a zone suffix; UTC sidesteps the host's zone setting.
        let on_calendar = trigger
            .run_at
            .with_timezone(&Utc)
            .format("%Y-%m-%d %H:%M:%S UTC");
        let mut args = vec![
            "--user".to_string(),
            format!("--unit={}", trigger.name),
            format!("--on-calendar={on_calendar}"),
            "--timer-property=AccuracySec=1s".to_string(),
            "--collect".to_string(),
            "--".to_string(),
        ];
        args.extend(trigger.argv.iter().cloned());
        args
    }
}

impl TriggerScheduler for SystemdScheduler {
    fn create(&self, trigger: &OneShotTrigger) -> Result<()> {
        run("systemd-run", &Self::create_args(trigger))
    }

    fn delete(&self, name: &str) -> Result<()> {
        run(
            "systemctl",
            &[
                "--user".to_string(),
                "stop".to_string(),
                format!("{name}.timer"),
            ],
        )
    }
}

// ── Windows Task Scheduler ──────────────────────────────────────────────────

/// Windows Task Scheduler via `schtasks.exe`.
///
/// `/SD` is written as `MM/DD/YYYY`, the short-date form en-US hosts accept.
/// `/ST` has minute resolution, so seconds in the run time are dropped.
#[derive(Debug, Clone, Copy, Default)]
pub struct SchtasksScheduler;

impl SchtasksScheduler {
    fn create_args(trigger: &OneShotTrigger) -> Vec<String> {
        vec![
            "/Create".to_string(),
            "/SC".to_string(),
            "ONCE".to_string(),
            "/TN".to_string(),
            trigger.name.clone(),
            "/TR".to_string(),
            command_line(&trigger.argv),
            "/SD".to_string(),
            trigger.run_at.format("%m/%d/%Y").to_string(),
            "/ST".to_string(),
            trigger.run_at.format("%H:%M").to_string(),
            "/F".to_string(),
        ]
    }
}

impl TriggerScheduler for SchtasksScheduler {
    fn create(&self, trigger: &OneShotTrigger) -> Result<()> {
        run("schtasks", &Self::create_args(trigger))
    }

    fn delete(&self, name: &str) -> Result<()> {
        run(
            "schtasks",
            &[
                "/Delete".to_string(),
                "/TN".to_string(),
                name.to_string(),
                "/F".to_string(),
            ],
        )
    }
}

// ── Dry run ─────────────────────────────────────────────────────────────────

/// Logs trigger operations without performing them.
#[derive(Debug, Clone, Copy, Default)]
pub struct DryRunScheduler;

impl TriggerScheduler for DryRunScheduler {
    fn create(&self, trigger: &OneShotTrigger) -> Result<()> {
        info!(
            trigger = %trigger.name,
            date = %trigger.run_at_date(),
            time = %trigger.run_at_time(),
            command = %command_line(&trigger.argv),
            "dry run: would create one-shot trigger"
        );
        Ok(())
    }

    fn delete(&self, name: &str) -> Result<()> {
        info!(trigger = %name, "dry run: would delete trigger");
        Ok(())
    }
}

// ── Helpers ─────────────────────────────────────────────────────────────────

/// Join `argv` into one command line, quoting every element.
fn command_line(argv: &[String]) -> String {
    argv.iter()
        .map(|arg| format!("\"{}\"", arg.replace('"', "\\\"")))
        .collect::<Vec<_>>()
        .join(" ")
}

fn run(program: &str, args: &[String]) -> Result<()> {
    let path = which::which(program)
        .map_err(|e| SkillTimeError::Trigger(format!("'{program}' not found in PATH: {e}")))?;
    debug!(program, ?args, "running scheduler command");

    let output = Command::new(&path)
        .args(args)
        .output()
        .map_err(|e| SkillTimeError::Trigger(format!("failed to run '{program}': {e}")))?;

    if output.status.success() {
        Ok(())
    } else {
        Err(SkillTimeError::Trigger(format!(
            "'{program}' exited with {}: {}",
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        )))
    }
}
