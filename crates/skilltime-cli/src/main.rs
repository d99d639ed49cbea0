mod display;

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, FixedOffset};
use clap::{Parser, Subcommand};
use serde_json::Value;
use skilltime::config::Settings;
use skilltime::registry::{RegistryOptions, ScheduledActionRegistry};
use skilltime::skills::{self, SkillContext};
use skilltime::zone::TimeZoneRef;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "skilltime", version)]
#[command(about = "Time, calendar and reminder skills for assistants, JSON in and JSON out")]
struct Cli {
    /// Settings file (default: <config dir>/skilltime/config.toml)
    #[arg(long, global = true, env = "SKILLTIME_CONFIG")]
    config: Option<PathBuf>,

    /// Pretend the current time is this RFC 3339 instant
    #[arg(long, global = true, value_parser = parse_now)]
    now: Option<DateTime<FixedOffset>>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a skill with a JSON argument object and print its JSON result
    Call {
        skill: String,

        /// Arguments as a JSON object
        #[arg(default_value = "{}")]
        args: String,
    },
    /// Print every skill's schema
    Exports,
    /// List pending reminders
    Actions,
    /// Show a reminder now (run by OS triggers)
    Display {
        #[arg(required = true, num_args = 1.., allow_hyphen_values = true)]
        message: Vec<String>,
    },
}

fn parse_now(s: &str) -> std::result::Result<DateTime<FixedOffset>, String> {
    DateTime::parse_from_rfc3339(s).map_err(|e| format!("expected an RFC 3339 instant: {e}"))
}

fn init_logging() {
    let filter =
        EnvFilter::try_from_env("SKILLTIME_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();

    match &cli.command {
        Commands::Call { skill, args } => {
            println!("{}", call(&cli, skill, args));
            Ok(())
        }
        Commands::Exports => {
            println!("{}", serde_json::to_string_pretty(&skills::exports())?);
            Ok(())
        }
        Commands::Actions => {
            let settings = load_settings(cli.config.as_ref())?;
            let zone = settings.zone_resolver().resolve();
            let registry = open_registry(&settings, zone)?;
            let actions = registry.list().context("Failed to list pending reminders")?;
            println!("{}", serde_json::to_string_pretty(&actions)?);
            Ok(())
        }
        Commands::Display { message } => display::run(&message.join(" ")),
    }
}

/// Run one skill. Every failure, including setup, comes back as a JSON error.
fn call(cli: &Cli, skill: &str, raw_args: &str) -> String {
    let args: Value = match serde_json::from_str(raw_args) {
        Ok(args) => args,
        Err(e) => return skills::error_json(&format!("JSON Error: {e}")),
    };

    let settings = match load_settings(cli.config.as_ref()) {
        Ok(settings) => settings,
        Err(e) => return skills::error_json(&format!("{e:#}")),
    };
    let zone = settings.zone_resolver().resolve();
    let now = match cli.now {
        Some(now) => zone.at(now),
        None => zone.now(),
    };

    let registry = if skills::uses_registry(skill) {
        match open_registry(&settings, zone.clone()) {
            Ok(registry) => Some(registry),
            Err(e) => return skills::error_json(&format!("{e:#}")),
        }
    } else {
        None
    };

    let ctx = SkillContext {
        now,
        zone,
        settings: &settings,
        registry: registry.as_ref(),
    };
    skills::run(skill, &args, &ctx)
}

fn load_settings(path: Option<&PathBuf>) -> Result<Settings> {
    let path = match path {
        Some(path) => path.clone(),
        None => Settings::default_path()?,
    };
    Settings::load(&path).with_context(|| format!("Failed to load settings from {}", path.display()))
}

fn open_registry(settings: &Settings, zone: TimeZoneRef) -> Result<ScheduledActionRegistry> {
    let store_path = settings.store_path()?;
    let options = RegistryOptions {
        trigger_prefix: settings.trigger_prefix.clone(),
        command: settings.reminder_command()?,
        zone,
    };
    ScheduledActionRegistry::open(&store_path, settings.scheduler.build(), options)
        .with_context(|| format!("Failed to open reminder store at {}", store_path.display()))
}
