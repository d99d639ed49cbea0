//! Settings file.
//!
//! Lives at `<config dir>/skilltime/config.toml` unless a path is given.
//! A missing file means all defaults.

use std::path::{Path, PathBuf};

use chrono::Duration;
use serde::Deserialize;

use crate::error::{Result, SkillTimeError};
use crate::trigger::{SchedulerKind, TriggerCommand};
use crate::zone::TimeZoneResolver;

const DEFAULT_TRIGGER_PREFIX: &str = "SkillTimeNotify_";
const DEFAULT_EVENT_MINUTES: i64 = 60;
/// One leap year.
const MAX_EVENT_MINUTES: i64 = 366 * 24 * 60;

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// IANA zone overriding the host's.
    pub timezone: Option<String>,

    /// SQLite file holding scheduled actions.
    pub store_path: Option<PathBuf>,

    pub scheduler: SchedulerKind,

    /// Prefix of every OS trigger name this tool creates.
    pub trigger_prefix: String,

    /// Program and arguments triggers run; the message is appended.
    pub reminder_command: Option<Vec<String>>,

    /// Length of a calendar event when no end time is given.
    pub default_event_minutes: i64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            timezone: None,
            store_path: None,
            scheduler: SchedulerKind::default(),
            trigger_prefix: DEFAULT_TRIGGER_PREFIX.to_string(),
            reminder_command: None,
            default_event_minutes: DEFAULT_EVENT_MINUTES,
        }
    }
}

impl Settings {
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| SkillTimeError::Config("Could not determine config directory".into()))?
            .join("skilltime");

        Ok(config_dir.join("config.toml"))
    }

    /// Load settings from `path`, or defaults if it does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml(&raw)
            .map_err(|e| SkillTimeError::Config(format!("{}: {e}", path.display())))
    }

    fn from_toml(raw: &str) -> std::result::Result<Self, String> {
        let settings: Settings = toml::from_str(raw).map_err(|e| e.to_string())?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> std::result::Result<(), String> {
        if !(1..=MAX_EVENT_MINUTES).contains(&self.default_event_minutes) {
            return Err(format!(
                "default_event_minutes must be between 1 and {MAX_EVENT_MINUTES}, got {}",
                self.default_event_minutes
            ));
        }
        // Trigger names become systemd unit and Task Scheduler names.
        let prefix_ok = !self.trigger_prefix.is_empty()
            && self
                .trigger_prefix
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !prefix_ok {
            return Err(format!(
                "trigger_prefix must be non-empty ASCII letters, digits, '_' or '-', got '{}'",
                self.trigger_prefix
            ));
        }
        if matches!(&self.reminder_command, Some(cmd) if cmd.is_empty()) {
            return Err("reminder_command must name a program".to_string());
        }
        Ok(())
    }

    /// Where the scheduled-action store lives.
    pub fn store_path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.store_path {
            return Ok(path.clone());
        }
        let data_dir = dirs::data_dir()
            .ok_or_else(|| SkillTimeError::Config("Could not determine data directory".into()))?;
        Ok(data_dir.join("skilltime").join("actions.db"))
    }

    /// A resolver honoring the configured zone first.
    pub fn zone_resolver(&self) -> TimeZoneResolver {
        TimeZoneResolver::from_host().with_configured(self.timezone.as_deref())
    }

    /// The program triggers run. Defaults to this executable's `display`
    /// subcommand.
    pub fn reminder_command(&self) -> Result<TriggerCommand> {
        match self.reminder_command.as_deref() {
            Some([program, args @ ..]) => Ok(TriggerCommand::new(program.clone(), args.to_vec())),
            Some([]) => Err(SkillTimeError::Config(
                "reminder_command must name a program".to_string(),
            )),
            None => {
                let exe = std::env::current_exe()?;
                Ok(TriggerCommand::new(
                    exe.to_string_lossy().into_owned(),
                    vec!["display".to_string()],
                ))
            }
        }
    }

    pub fn default_event_duration(&self) -> Duration {
        Duration::minutes(self.default_event_minutes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_is_defaults() {
        let settings = Settings::from_toml("").unwrap();
        assert_eq!(settings.trigger_prefix, "SkillTimeNotify_");
        assert_eq!(settings.scheduler, SchedulerKind::Auto);
        assert_eq!(settings.default_event_duration(), Duration::minutes(60));
        assert!(settings.timezone.is_none());
    }

    #[test]
    fn test_full_file() {
        let settings = Settings::from_toml(
            r#"
            timezone = "Europe/Berlin"
            store_path = "/tmp/skilltime/actions.db"
            scheduler = "dry-run"
            trigger_prefix = "Remind-"
            reminder_command = ["notify-send", "Reminder"]
            default_event_minutes = 30
            "#,
        )
        .unwrap();
        assert_eq!(settings.timezone.as_deref(), Some("Europe/Berlin"));
        assert_eq!(
            settings.store_path().unwrap(),
            PathBuf::from("/tmp/skilltime/actions.db")
        );
        assert_eq!(settings.scheduler, SchedulerKind::DryRun);
        let command = settings.reminder_command().unwrap();
        assert_eq!(command.program, "notify-send");
        assert_eq!(command.args, vec!["Reminder"]);
        assert_eq!(settings.default_event_duration(), Duration::minutes(30));
    }

    #[test]
    fn test_configured_zone_feeds_resolver() {
        let settings = Settings::from_toml("timezone = \"Asia/Tokyo\"").unwrap();
        assert_eq!(settings.zone_resolver().resolve().name(), "Asia/Tokyo");
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(Settings::from_toml("default_event_minutes = 0").is_err());
        assert!(Settings::from_toml("default_event_minutes = 9223372036854775807").is_err());
        assert!(Settings::from_toml("default_event_minutes = 527040").is_ok());
        assert!(Settings::from_toml("trigger_prefix = \"has space\"").is_err());
        assert!(Settings::from_toml("reminder_command = []").is_err());
        assert!(Settings::from_toml("scheduler = \"cron\"").is_err());
        assert!(Settings::from_toml("colour = \"blue\"").is_err());
    }

    #[test]
    fn test_missing_file_is_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::load(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(settings.default_event_minutes, 60);
    }

    #[test]
    fn test_load_reports_path_on_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "default_event_minutes = \"soon\"").unwrap();
        let err = Settings::load(&path).unwrap_err().to_string();
        assert!(err.contains("config.toml"), "got: {err}");
    }
}
