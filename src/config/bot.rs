//! Bot settings loading from config.toml
//!
//! Holds the text-command prefix and the list of cogs to enable. The file is
//! optional; without it the bot runs with the defaults below.

use crate::errors::{Error, Result};
use serde::Deserialize;
use std::path::Path;

/// Prefix used when neither config.toml nor the guild overrides it.
pub const DEFAULT_PREFIX: &str = "s!";

/// Configuration structure representing the entire config.toml file
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct BotConfig {
    /// Text-command prefix
    pub prefix: String,
    /// Names of the cogs to load, in order
    pub cogs: Vec<String>,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_PREFIX.to_string(),
            cogs: vec!["general".to_string(), "testc".to_string()],
        }
    }
}

/// Loads bot configuration from a TOML file
///
/// # Errors
/// Returns an error if:
/// - The file exists but cannot be read
/// - The TOML syntax is invalid
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<BotConfig> {
    let path = path.as_ref();
    if !path.exists() {
        tracing::info!("No {} found, using default bot settings", path.display());
        return Ok(BotConfig::default());
    }

    let contents = std::fs::read_to_string(path).map_err(|e| Error::Config {
        message: format!("Failed to read config file {}: {e}", path.display()),
    })?;

    toml::from_str(&contents).map_err(|e| Error::Config {
        message: format!("Failed to parse {}: {e}", path.display()),
    })
}

/// Loads bot configuration from the default location (./config.toml)
pub fn load_default_config() -> Result<BotConfig> {
    load_config("config.toml")
}
