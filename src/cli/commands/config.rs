//! Config command - show or edit configuration

use crate::cli::args::{ConfigAction, ConfigArgs};
use crate::config::{Config, ConfigManager};
use crate::error::{GeocacheError, GeocacheResult};
use crate::ui::{self, UiContext};
use std::path::PathBuf;

/// Keys accepted by `config set`
const VALID_KEYS: [&str; 11] = [
    "general.verbose",
    "general.log_format",
    "geocoder.api_key",
    "geocoder.base_url",
    "geocoder.request_timeout_secs",
    "geocoder.lookup_timeout_secs",
    "cache.path",
    "cache.precision",
    "cache.max_age_days",
    "cache.max_entries",
    "cache.flush_timeout_secs",
];

/// Execute the config command
pub async fn execute(
    args: ConfigArgs,
    manager: &ConfigManager,
    config: &Config,
) -> GeocacheResult<()> {
    match args.action {
        None | Some(ConfigAction::Show) => show_config(config)?,
        Some(ConfigAction::Path) => println!("{}", manager.path().display()),
        Some(ConfigAction::Init { force }) => init_config(manager, force).await?,
        Some(ConfigAction::Set { key, value }) => set_value(manager, &key, &value).await?,
    }

    Ok(())
}

fn show_config(config: &Config) -> GeocacheResult<()> {
    let mut redacted = config.clone();
    if redacted.geocoder.api_key.is_some() {
        redacted.geocoder.api_key = Some("********".to_string());
    }
    println!("{}", toml::to_string_pretty(&redacted)?);
    Ok(())
}

async fn init_config(manager: &ConfigManager, force: bool) -> GeocacheResult<()> {
    let ctx = UiContext::detect();
    let path = manager.path();

    if path.exists() && !force {
        ui::step_warn(
            &ctx,
            &format!("Config already exists at {} (use --force to overwrite)", path.display()),
        );
        return Ok(());
    }

    manager.save(&Config::default()).await?;
    ui::step_ok(&ctx, &format!("Configuration initialized at {}", path.display()));
    Ok(())
}

/// Update one key in the file on disk; environment overrides are not persisted
async fn set_value(manager: &ConfigManager, key: &str, value: &str) -> GeocacheResult<()> {
    let ctx = UiContext::detect();
    let mut config = if manager.path().exists() {
        manager.load_from_file(manager.path()).await?
    } else {
        Config::default()
    };

    apply(&mut config, key, value)?;
    config.validate().map_err(GeocacheError::User)?;

    manager.save(&config).await?;
    let shown = if key == "geocoder.api_key" { "********" } else { value };
    ui::step_ok(&ctx, &format!("Set {} = {}", key, shown));
    Ok(())
}

fn apply(config: &mut Config, key: &str, value: &str) -> GeocacheResult<()> {
    let parts: Vec<&str> = key.split('.').collect();

    match parts.as_slice() {
        ["general", "verbose"] => config.general.verbose = parse_bool(value)?,
        ["general", "log_format"] => config.general.log_format = value.to_string(),

        ["geocoder", "api_key"] => config.geocoder.api_key = non_empty(value),
        ["geocoder", "base_url"] => config.geocoder.base_url = value.to_string(),
        ["geocoder", "request_timeout_secs"] => {
            config.geocoder.request_timeout_secs = parse_num(value)?
        }
        ["geocoder", "lookup_timeout_secs"] => {
            config.geocoder.lookup_timeout_secs = parse_num(value)?
        }

        ["cache", "path"] => config.cache.path = non_empty(value).map(PathBuf::from),
        ["cache", "precision"] => config.cache.precision = parse_num(value)?,
        ["cache", "max_age_days"] => config.cache.max_age_days = parse_num(value)?,
        ["cache", "max_entries"] => config.cache.max_entries = parse_num(value)?,
        ["cache", "flush_timeout_secs"] => config.cache.flush_timeout_secs = parse_num(value)?,

        _ => {
            return Err(GeocacheError::User(format!(
                "Unknown config key: {}. Valid keys: {}",
                key,
                VALID_KEYS.join(", ")
            )))
        }
    }

    Ok(())
}

fn non_empty(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

fn parse_bool(value: &str) -> GeocacheResult<bool> {
    match value.to_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(GeocacheError::User(format!(
            "Invalid boolean value: {}. Use true/false",
            value
        ))),
    }
}

fn parse_num<T: std::str::FromStr>(value: &str) -> GeocacheResult<T> {
    value
        .trim()
        .parse()
        .map_err(|_| GeocacheError::User(format!("Invalid number: {}", value)))
}
