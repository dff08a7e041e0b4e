//! Configuration loader and validator for the PawMeet jobs engine.
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(&'static str),
}

/// Root configuration struct mirroring the YAML schema exactly.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    pub app: App,
    pub engine: Engine,
    pub mailer: Mailer,
}

/// App-level settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct App {
    pub data_dir: String,
    pub bind_addr: String,
    /// When set, trigger requests must present it as a bearer token.
    #[serde(default)]
    pub trigger_token: Option<String>,
}

/// Campaign rules and run bounds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Engine {
    pub dormancy_days: u32,
    pub nudge_cooldown_days: u32,
    pub run_timeout_seconds: u64,
}

/// Mail provider settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Mailer {
    pub api_token: String,
    pub from_address: String,
}

impl Config {
    /// Ensure required directories exist (creates `app.data_dir` if missing).
    pub fn ensure_dirs(&self) -> Result<(), std::io::Error> {
        if self.app.data_dir.trim().is_empty() {
            return Ok(());
        }
        fs::create_dir_all(&self.app.data_dir)
    }
}

/// Load configuration from a YAML file and validate it.
/// - If `path` is None, uses `config.yaml` in the current working directory.
pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = path.unwrap_or_else(|| Path::new("config.yaml"));
    let content = fs::read_to_string(path)?;
    let cfg: Config = serde_yaml::from_str(&content)?;
    validate(&cfg)?;
    Ok(cfg)
}

/// Validate a configuration instance.
fn validate(cfg: &Config) -> Result<(), ConfigError> {
    if cfg.app.data_dir.trim().is_empty() {
        return Err(ConfigError::Invalid("app.data_dir must be non-empty"));
    }
    if cfg.app.bind_addr.trim().is_empty() {
        return Err(ConfigError::Invalid("app.bind_addr must be non-empty"));
    }
    if let Some(token) = &cfg.app.trigger_token {
        if token.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "app.trigger_token must be non-empty when set",
            ));
        }
    }

    if cfg.engine.dormancy_days == 0 {
        return Err(ConfigError::Invalid("engine.dormancy_days must be > 0"));
    }
    if cfg.engine.nudge_cooldown_days == 0 {
        return Err(ConfigError::Invalid("engine.nudge_cooldown_days must be > 0"));
    }
    if cfg.engine.run_timeout_seconds == 0 {
        return Err(ConfigError::Invalid("engine.run_timeout_seconds must be > 0"));
    }

    if cfg.mailer.api_token.trim().is_empty() {
        return Err(ConfigError::Invalid("mailer.api_token must be non-empty"));
    }
    if cfg.mailer.from_address.trim().is_empty() {
        return Err(ConfigError::Invalid("mailer.from_address must be non-empty"));
    }

    Ok(())
}

/// Canonical example configuration.
pub fn example() -> &'static str {
    r#"app:
  data_dir: "./data"
  bind_addr: "0.0.0.0:8080"
  trigger_token: "CHANGE_ME_CRON_SECRET"

engine:
  dormancy_days: 14
  nudge_cooldown_days: 30
  run_timeout_seconds: 60

mailer:
  api_token: "YOUR_MAIL_API_TOKEN"
  from_address: "PawMeet <hello@pawmeet.app>"
"#
}
