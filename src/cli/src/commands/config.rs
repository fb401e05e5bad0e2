//! Configuration management commands.
//!
//! Stores CLI configuration in `~/.jobboard/config.toml`.

use anyhow::{Context, Result};
use clap::Subcommand;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::output::{self, Notice, OutputFormat, Section};

/// Keys the CLI reads back; anything else is rejected on `set`.
pub const KNOWN_KEYS: [&str; 2] = ["api-url", "page-size"];

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Set a configuration value
    Set {
        /// Configuration key (api-url, page-size)
        key: String,
        /// Value to set
        value: String,
    },

    /// Get a configuration value
    Get {
        /// Configuration key
        key: String,
    },

    /// Show all configuration
    Show,

    /// Reset configuration to defaults
    Reset {
        /// Skip confirmation
        #[arg(short, long)]
        force: bool,
    },
}

/// Persistent CLI configuration stored on disk.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct CliConfig {
    #[serde(default)]
    pub values: BTreeMap<String, String>,
}

impl CliConfig {
    /// Validate and store a value.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "api-url" => {
                if !(value.starts_with("http://") || value.starts_with("https://")) {
                    anyhow::bail!("api-url must start with http:// or https://");
                }
            }
            "page-size" => {
                let size: u64 = value.parse().context("page-size must be a number")?;
                if size == 0 {
                    anyhow::bail!("page-size must be at least 1");
                }
            }
            other => anyhow::bail!(
                "Unknown key '{}' (expected one of: {})",
                other,
                KNOWN_KEYS.join(", ")
            ),
        }
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

fn config_path() -> Result<PathBuf> {
    let home = dirs::home_dir().context("Could not determine home directory")?;
    Ok(home.join(".jobboard").join("config.toml"))
}

/// Load the CLI configuration from disk, returning defaults if the file does
/// not exist.
fn load_config() -> Result<CliConfig> {
    let path = config_path()?;
    if !path.exists() {
        return Ok(CliConfig::default());
    }
    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    toml::from_str(&content).context("Failed to parse config file")
}

fn save_config(cfg: &CliConfig) -> Result<()> {
    let path = config_path()?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let content = toml::to_string_pretty(cfg).context("Failed to serialize config")?;
    std::fs::write(&path, content)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

fn load_value(key: &str) -> Option<String> {
    load_config().ok().and_then(|cfg| cfg.values.get(key).cloned())
}

/// The `api-url` value from the config file, if set.
pub fn load_api_url() -> Option<String> {
    load_value("api-url")
}

/// The `page-size` value from the config file, if set and valid.
pub fn load_page_size() -> Option<u64> {
    load_value("page-size").and_then(|v| v.parse().ok())
}

pub async fn execute(cmd: ConfigCommands, format: OutputFormat) -> Result<()> {
    match cmd {
        ConfigCommands::Set { key, value } => {
            let mut cfg = load_config()?;
            cfg.set(&key, &value)?;
            save_config(&cfg)?;

            match format {
                OutputFormat::Table => output::notice(Notice::Ok, &format!("{} = {}", key, value)),
                _ => output::print_document(&serde_json::json!({ "key": key, "value": value }), format)?,
            }
        }

        ConfigCommands::Get { key } => {
            let cfg = load_config()?;
            match cfg.values.get(&key) {
                Some(value) => match format {
                    OutputFormat::Table => println!("{}", value),
                    _ => output::print_document(&serde_json::json!({ "key": key, "value": value }), format)?,
                },
                None => anyhow::bail!("Key '{}' not set", key),
            }
        }

        ConfigCommands::Show => {
            let cfg = load_config()?;

            if cfg.values.is_empty() {
                output::notice(Notice::Info, "No configuration values set.");
                return Ok(());
            }

            match format {
                OutputFormat::Table => cfg
                    .values
                    .iter()
                    .fold(Section::new("Configuration"), |section, (k, v)| {
                        section.field(k.as_str(), v.as_str())
                    })
                    .print(),
                _ => output::print_document(&cfg.values, format)?,
            }
        }

        ConfigCommands::Reset { force } => {
            if !force {
                output::notice(
                    Notice::Info,
                    "This will reset all CLI configuration. Use --force to confirm.",
                );
                return Ok(());
            }

            let path = config_path()?;
            if path.exists() {
                std::fs::remove_file(&path)
                    .with_context(|| format!("Failed to remove {}", path.display()))?;
            }

            output::notice(Notice::Ok, "Configuration reset to defaults");
        }
    }

    Ok(())
}
