//! Configuration system
//!
//! Provides layered configuration with:
//! - Runtime defaults
//! - Config file loading (optional)
//! - Environment variable overrides
//! - Validation
//!
//! With no config file and no overrides the defaults reproduce the plain
//! `site-metrics <filepath>` behavior. The loaded [`Config`] is passed
//! explicitly to the components that need it.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::info;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Logging configuration
    pub logging: LoggingConfig,

    /// Input processing configuration
    pub processing: ProcessingConfig,

    /// Report output configuration
    pub output: OutputConfig,

    /// Paths configuration
    pub paths: PathsConfig,

    /// File this configuration was read from, if any
    #[serde(skip)]
    pub source: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
    pub output: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingConfig {
    pub on_malformed: MalformedPolicy,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub json_pretty: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub log_directory: PathBuf,
}

/// What to do with an input line that does not decode into an event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MalformedPolicy {
    /// Log a warning, count the line, keep going.
    #[default]
    Skip,
    /// Fail the whole batch.
    Abort,
}

impl FromStr for MalformedPolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "skip" => Ok(MalformedPolicy::Skip),
            "abort" => Ok(MalformedPolicy::Abort),
            other => anyhow::bail!("Unknown malformed-line policy: {}", other),
        }
    }
}

impl fmt::Display for MalformedPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MalformedPolicy::Skip => f.write_str("skip"),
            MalformedPolicy::Abort => f.write_str("abort"),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "WARN".to_string(),
            format: "pretty".to_string(),
            output: "console".to_string(),
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            log_directory: PathBuf::from("logs"),
        }
    }
}

const LOG_FORMATS: &[&str] = &["pretty", "compact", "json"];
const LOG_OUTPUTS: &[&str] = &["console", "file", "both"];

impl Config {
    /// Load configuration from file, environment, and defaults
    pub fn load() -> Result<Self> {
        let mut config = Config::default();

        let config_paths = [
            PathBuf::from("site-metrics.toml"),
            PathBuf::from(".site-metrics.toml"),
            dirs::config_dir()
                .map(|d| d.join("site-metrics").join("config.toml"))
                .unwrap_or_default(),
        ];

        for path in &config_paths {
            // logging is not initialized yet; callers report `source` once it is
            if path.is_file() {
                config = Self::load_from_file(path)?;
                break;
            }
        }

        config.apply_env_overrides()?;
        config.validate()?;

        Ok(config)
    }

    /// Load configuration from TOML file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let mut config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        config.source = Some(path.to_path_buf());

        Ok(config)
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(val) = env::var("LOG_LEVEL") {
            self.logging.level = val;
        }
        if let Ok(val) = env::var("LOG_FORMAT") {
            self.logging.format = val;
        }
        if let Ok(val) = env::var("LOG_OUTPUT") {
            self.logging.output = val;
        }

        if let Ok(val) = env::var("SITE_METRICS_ON_MALFORMED") {
            self.processing.on_malformed = val
                .parse()
                .context("Invalid SITE_METRICS_ON_MALFORMED")?;
        }

        if let Ok(val) = env::var("SITE_METRICS_JSON_PRETTY") {
            self.output.json_pretty = val
                .parse()
                .context("Invalid SITE_METRICS_JSON_PRETTY")?;
        }

        if let Ok(val) = env::var("SITE_METRICS_LOG_DIR") {
            self.paths.log_directory = PathBuf::from(val);
        }

        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if !LOG_FORMATS.contains(&self.logging.format.as_str()) {
            anyhow::bail!(
                "Log format must be one of {:?}, got {}",
                LOG_FORMATS,
                self.logging.format
            );
        }

        if !LOG_OUTPUTS.contains(&self.logging.output.as_str()) {
            anyhow::bail!(
                "Log output must be one of {:?}, got {}",
                LOG_OUTPUTS,
                self.logging.output
            );
        }

        if self.logging.output != "console" && !self.paths.log_directory.exists() {
            fs::create_dir_all(&self.paths.log_directory).with_context(|| {
                format!(
                    "Failed to create log directory: {}",
                    self.paths.log_directory.display()
                )
            })?;
        }

        Ok(())
    }

    /// Save current configuration to file
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let content =
            toml::to_string_pretty(self).context("Failed to serialize configuration")?;

        fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        info!(path = %path.display(), "Configuration saved to file");

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.logging.level, "WARN");
        assert_eq!(config.logging.output, "console");
        assert_eq!(config.processing.on_malformed, MalformedPolicy::Skip);
        assert!(!config.output.json_pretty);
    }

    #[test]
    fn test_policy_parse() {
        assert_eq!("skip".parse::<MalformedPolicy>().unwrap(), MalformedPolicy::Skip);
        assert_eq!("ABORT".parse::<MalformedPolicy>().unwrap(), MalformedPolicy::Abort);
        assert!("retry".parse::<MalformedPolicy>().is_err());
    }

    #[test]
    fn test_validation() {
        let mut config = Config::default();
        config.logging.format = "xml".to_string();
        assert!(config.validate().is_err());
    }
}
