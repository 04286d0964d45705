//! Config command - show or edit configuration

use crate::cli::args::{ConfigAction, ConfigArgs};
use crate::config::{Config, ConfigManager, LOCAL_CONFIG_FILE};
use crate::error::{ShellcacheError, ShellcacheResult};
use crate::ui::{self, Line, Mark, UiContext};
use std::path::PathBuf;
use tokio::fs;

/// Keys accepted by `config set`
const KEYS: &[&str] = &[
    "general.log_format",
    "general.journal",
    "general.state_dir",
    "worker.generation",
    "worker.origin",
    "worker.scope",
    "worker.manifest",
    "worker.skip_waiting",
    "bypass.hosts",
    "network.timeout_secs",
    "network.user_agent",
    "network.max_body_bytes",
    "store.backend",
    "store.path",
];

/// Keys stored as comma-separated lists
const LIST_KEYS: &[&str] = &["worker.manifest", "bypass.hosts"];

const BOOL_KEYS: &[&str] = &["general.journal", "worker.skip_waiting"];

const INT_KEYS: &[&str] = &["network.timeout_secs", "network.max_body_bytes"];

/// Execute the config command
pub async fn execute(args: ConfigArgs, config: &Config, manager: &ConfigManager) -> ShellcacheResult<()> {
    match args.action {
        None | Some(ConfigAction::Show) => show_config(config),
        Some(ConfigAction::Path) => {
            println!("{}", manager.path().display());
            Ok(())
        }
        Some(ConfigAction::Init { force }) => init_config(manager, force).await,
        Some(ConfigAction::Set { key, value, local }) => {
            if local {
                set_local_value(&key, &value).await
            } else {
                set_value(manager, config, &key, &value).await
            }
        }
    }
}

fn show_config(config: &Config) -> ShellcacheResult<()> {
    println!("{}", toml::to_string_pretty(config)?);
    Ok(())
}

async fn init_config(manager: &ConfigManager, force: bool) -> ShellcacheResult<()> {
    let ctx = UiContext::detect();
    let path = manager.path();

    if path.exists() && !force {
        ui::emit(
            &ctx,
            &Line::new(Mark::Warn, format!("Config already exists at {}", path.display()))
                .with_detail("use --force to overwrite"),
        );
        return Ok(());
    }

    manager.save(&Config::default()).await?;
    ui::emit(
        &ctx,
        &Line::new(Mark::Ok, "Configuration initialized").with_detail(path.display().to_string()),
    );
    Ok(())
}

async fn set_value(
    manager: &ConfigManager,
    config: &Config,
    key: &str,
    value: &str,
) -> ShellcacheResult<()> {
    let ctx = UiContext::detect();
    let mut config = config.clone();
    apply(&mut config, key, value)?;

    // Catch a bad origin or manifest before it is written
    config.manifest_urls()?;

    manager.save(&config).await?;
    ui::step(&ctx, Mark::Ok, &format!("Set {} = {}", key, value));
    Ok(())
}

/// Apply one dot-separated key to a config
fn apply(config: &mut Config, key: &str, value: &str) -> ShellcacheResult<()> {
    let parts: Vec<&str> = key.split('.').collect();
    match parts.as_slice() {
        ["general", "log_format"] => config.general.log_format = parse_log_format(value)?,
        ["general", "journal"] => config.general.journal = parse_bool(value)?,
        ["general", "state_dir"] => config.general.state_dir = Some(PathBuf::from(value)),

        ["worker", "generation"] => config.worker.generation = non_empty(key, value)?,
        ["worker", "origin"] => config.worker.origin = value.to_string(),
        ["worker", "scope"] => config.worker.scope = Some(value.to_string()),
        ["worker", "manifest"] => config.worker.manifest = parse_list(value),
        ["worker", "skip_waiting"] => config.worker.skip_waiting = parse_bool(value)?,

        ["bypass", "hosts"] => config.bypass.hosts = parse_list(value),

        ["network", "timeout_secs"] => config.network.timeout_secs = parse_u64(value)?,
        ["network", "user_agent"] => config.network.user_agent = value.to_string(),
        ["network", "max_body_bytes"] => config.network.max_body_bytes = parse_u64(value)?,

        ["store", "backend"] => config.store.backend = parse_backend(value)?,
        ["store", "path"] => config.store.path = Some(PathBuf::from(value)),

        _ => return Err(unknown_key(key)),
    }
    Ok(())
}

async fn set_local_value(key: &str, value: &str) -> ShellcacheResult<()> {
    let ctx = UiContext::detect();
    if !KEYS.contains(&key) {
        return Err(unknown_key(key));
    }

    let cwd = std::env::current_dir()
        .map_err(|e| ShellcacheError::io("getting current directory", e))?;
    let local_path = cwd.join(LOCAL_CONFIG_FILE);

    let mut doc: toml::Value = if local_path.exists() {
        let content = fs::read_to_string(&local_path)
            .await
            .map_err(|e| ShellcacheError::io(format!("reading {}", local_path.display()), e))?;
        toml::from_str(&content).map_err(|e| ShellcacheError::ConfigInvalid {
            path: local_path.clone(),
            reason: e.to_string(),
        })?
    } else {
        toml::Value::Table(toml::map::Map::new())
    };

    set_toml_value(&mut doc, key, value)?;

    // Only the keys set explicitly are written to the local file
    let content = toml::to_string_pretty(&doc)?;
    fs::write(&local_path, content)
        .await
        .map_err(|e| ShellcacheError::io(format!("writing {}", local_path.display()), e))?;

    ui::emit(
        &ctx,
        &Line::new(Mark::Ok, format!("Set {} = {}", key, value))
            .with_detail(local_path.display().to_string()),
    );
    Ok(())
}

/// Set `section.key` in a TOML tree, creating the section if needed
fn set_toml_value(doc: &mut toml::Value, key: &str, value: &str) -> ShellcacheResult<()> {
    let (section, leaf) = key
        .split_once('.')
        .ok_or_else(|| unknown_key(key))?;

    let table = doc
        .as_table_mut()
        .ok_or_else(|| ShellcacheError::User("Local config is not a table".to_string()))?
        .entry(section)
        .or_insert_with(|| toml::Value::Table(toml::map::Map::new()))
        .as_table_mut()
        .ok_or_else(|| ShellcacheError::User(format!("Expected table at key: {}", section)))?;

    // Validate through the typed schema, then store with the matching TOML type
    apply(&mut Config::default(), key, value)?;
    let toml_value = if LIST_KEYS.contains(&key) {
        toml::Value::Array(parse_list(value).into_iter().map(toml::Value::String).collect())
    } else if BOOL_KEYS.contains(&key) {
        toml::Value::Boolean(parse_bool(value)?)
    } else if INT_KEYS.contains(&key) {
        let n = parse_u64(value)?;
        toml::Value::Integer(i64::try_from(n).unwrap_or(i64::MAX))
    } else {
        toml::Value::String(value.to_string())
    };

    table.insert(leaf.to_string(), toml_value);
    Ok(())
}

fn unknown_key(key: &str) -> ShellcacheError {
    ShellcacheError::User(format!(
        "Unknown config key: {}. Valid keys: {}",
        key,
        KEYS.join(", ")
    ))
}

fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn non_empty(key: &str, value: &str) -> ShellcacheResult<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ShellcacheError::User(format!("{} cannot be empty", key)));
    }
    Ok(value.to_string())
}

fn parse_bool(value: &str) -> ShellcacheResult<bool> {
    match value.to_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(ShellcacheError::User(format!(
            "Invalid boolean value: {}. Use true/false",
            value
        ))),
    }
}

fn parse_u64(value: &str) -> ShellcacheResult<u64> {
    value
        .parse()
        .map_err(|_| ShellcacheError::User(format!("Invalid number: {}", value)))
}

fn parse_log_format(value: &str) -> ShellcacheResult<String> {
    match value {
        "text" | "json" => Ok(value.to_string()),
        _ => Err(ShellcacheError::User(format!(
            "Invalid log format: {}. Use text or json",
            value
        ))),
    }
}

fn parse_backend(value: &str) -> ShellcacheResult<String> {
    match value {
        "disk" | "memory" => Ok(value.to_string()),
        _ => Err(ShellcacheError::User(format!(
            "Invalid store backend: {}. Use disk or memory",
            value
        ))),
    }
}
