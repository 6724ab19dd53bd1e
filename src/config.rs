//! Configuration management for the restic exporter.
//!
//! Supports loading configuration from:
//! - TOML configuration files
//! - Environment variables (with `RESTIC_EXPORTER_` prefix)
//! - Command-line arguments

use crate::error::{Result, ResticError};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Restic repository settings.
#[derive(Clone, Serialize, Deserialize)]
pub struct ResticConfig {
    /// Repository location (e.g., "s3:s3.amazonaws.com/my-bucket" or "/srv/restic-repo")
    pub repository: String,

    /// Repository password, passed to restic via RESTIC_PASSWORD
    #[serde(default)]
    pub password: String,

    /// Path to the restic binary
    #[serde(default = "default_binary")]
    pub binary: String,

    /// AWS access key for S3-backed repositories
    #[serde(default)]
    pub aws_access_key_id: Option<String>,

    /// AWS secret key for S3-backed repositories
    #[serde(default)]
    pub aws_secret_access_key: Option<String>,

    /// Per-invocation timeout in seconds
    #[serde(default = "default_command_timeout")]
    pub command_timeout_seconds: u64,
}

impl std::fmt::Debug for ResticConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResticConfig")
            .field("repository", &self.repository)
            .field("password", &"***REDACTED***")
            .field("binary", &self.binary)
            .field("aws_access_key_id", &self.aws_access_key_id)
            .field("aws_secret_access_key", &"***REDACTED***")
            .field("command_timeout_seconds", &self.command_timeout_seconds)
            .finish()
    }
}

/// Exporter specific settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ExporterConfig {
    /// Address to listen on for metrics endpoint
    #[serde(default = "default_listen_address")]
    pub listen_address: String,
    /// Seconds between refresh cycles
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval_seconds: u64,
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Main configuration structure for the restic exporter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Restic repository configuration
    pub restic: ResticConfig,

    /// Exporter server configuration
    pub exporter: ExporterConfig,
}

fn default_binary() -> String {
    "restic".to_string()
}

fn default_command_timeout() -> u64 {
    5
}

fn default_listen_address() -> String {
    "0.0.0.0:9150".to_string()
}

fn default_refresh_interval() -> u64 {
    30
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Settings {
    /// Load configuration from a file and environment variables.
    ///
    /// # Arguments
    ///
    /// * `config_path` - Optional path to configuration file
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use restic_exporter::config::Settings;
    ///
    /// let settings = Settings::load(Some("config/default.toml")).unwrap();
    /// ```
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let mut builder = config::Config::builder();

        // Add config file if provided
        if let Some(path) = config_path {
            if Path::new(path).exists() {
                builder = builder.add_source(config::File::with_name(path));
            }
        }

        // Add environment variables with RESTIC_EXPORTER_ prefix
        builder = builder.add_source(
            config::Environment::with_prefix("RESTIC_EXPORTER")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        let settings: Settings = config.try_deserialize()?;

        settings.validate()?;
        Ok(settings)
    }

    /// Validate configuration settings.
    fn validate(&self) -> Result<()> {
        if self.restic.repository.is_empty() {
            return Err(ResticError::Config(config::ConfigError::Message(
                "restic repository cannot be empty".to_string(),
            )));
        }

        if self.restic.password.is_empty() {
            return Err(ResticError::Config(config::ConfigError::Message(
                "restic repository password is required".to_string(),
            )));
        }

        if self.restic.command_timeout_seconds == 0 {
            return Err(ResticError::Config(config::ConfigError::Message(
                "restic command timeout must be greater than zero".to_string(),
            )));
        }

        if self.exporter.refresh_interval_seconds == 0 {
            return Err(ResticError::Config(config::ConfigError::Message(
                "refresh interval must be greater than zero".to_string(),
            )));
        }

        Ok(())
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            restic: ResticConfig {
                repository: String::new(),
                password: String::new(),
                binary: default_binary(),
                aws_access_key_id: None,
                aws_secret_access_key: None,
                command_timeout_seconds: default_command_timeout(),
            },
            exporter: ExporterConfig {
                listen_address: default_listen_address(),
                refresh_interval_seconds: default_refresh_interval(),
                log_level: default_log_level(),
            },
        }
    }
}
