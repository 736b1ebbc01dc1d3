//! Configuration management for StaySmart.
//!
//! Handles loading configuration from TOML files and environment variables.
//! Replaces hard-coded connection constants with an explicit object that is
//! handed to [`crate::persistence::StaySmartDb`] at construction.

use crate::error::{Result, StaySmartError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

/// Environment variable that overrides the configured database location.
pub const DATABASE_ENV: &str = "STAYSMART_DATABASE";

/// Longest billing cycle accepted, in days.
pub const MAX_CYCLE_DAYS: i64 = 366;

/// Main configuration structure for StaySmart.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Relational store settings.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Billing cycle settings.
    #[serde(default)]
    pub billing: BillingConfig,
}

/// Where the store lives once all overrides are applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseLocation {
    File(PathBuf),
    Memory,
}

/// Relational store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Path of the SQLite database file.
    pub path: Option<PathBuf>,

    /// Connection string (`sqlite:///abs/path.db` or `sqlite::memory:`).
    /// Takes precedence over `path` when both are set.
    pub url: Option<String>,

    /// Upper bound on pooled connections.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Seconds a statement waits on a locked database before failing.
    #[serde(default = "default_busy_timeout_secs")]
    pub busy_timeout_secs: u64,

    /// Seconds a caller waits for a pooled connection.
    #[serde(default = "default_acquire_timeout_secs")]
    pub acquire_timeout_secs: u64,
}

fn default_max_connections() -> u32 {
    5
}

fn default_busy_timeout_secs() -> u64 {
    5
}

fn default_acquire_timeout_secs() -> u64 {
    10
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: None,
            url: None,
            max_connections: default_max_connections(),
            busy_timeout_secs: default_busy_timeout_secs(),
            acquire_timeout_secs: default_acquire_timeout_secs(),
        }
    }
}

impl DatabaseConfig {
    /// Config for a private in-memory store (tests, dry runs).
    pub fn in_memory() -> Self {
        Self {
            url: Some("sqlite::memory:".to_string()),
            // Each in-memory connection is its own database.
            max_connections: 1,
            ..Default::default()
        }
    }

    /// Config for a database file at `path`.
    pub fn at_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            ..Default::default()
        }
    }

    /// Parses a `sqlite:` connection string into a location.
    ///
    /// Accepted forms: `sqlite::memory:`, `sqlite:///abs/path.db`,
    /// `sqlite://relative/path.db`.
    pub fn parse_connection_string(conn_str: &str) -> Result<DatabaseLocation> {
        let url = Url::parse(conn_str)
            .map_err(|e| StaySmartError::config(format!("Invalid connection string: {e}")))?;

        if url.scheme() != "sqlite" {
            return Err(StaySmartError::config(format!(
                "Invalid scheme '{}'. Expected 'sqlite'",
                url.scheme()
            )));
        }

        if url.path() == ":memory:" {
            return Ok(DatabaseLocation::Memory);
        }

        let path = match url.host_str() {
            Some(host) if !host.is_empty() => format!("{host}{}", url.path()),
            _ => url.path().to_string(),
        };

        if path.is_empty() || path == "/" {
            return Err(StaySmartError::config(format!(
                "Connection string '{conn_str}' does not name a database file"
            )));
        }

        Ok(DatabaseLocation::File(PathBuf::from(path)))
    }

    /// Resolves the configured location, falling back to the platform default.
    pub fn location(&self) -> Result<DatabaseLocation> {
        if let Some(url) = &self.url {
            return Self::parse_connection_string(url);
        }
        if let Some(path) = &self.path {
            return Ok(DatabaseLocation::File(path.clone()));
        }
        Ok(DatabaseLocation::File(Self::default_db_path()))
    }

    /// Lets `STAYSMART_DATABASE` override the location read from the file.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(value) = std::env::var(DATABASE_ENV) {
            let value = value.trim();
            if !value.is_empty() {
                self.set_target(value);
            }
        }
    }

    /// Points the config at `target`, which is either a connection string or a path.
    pub fn set_target(&mut self, target: &str) {
        if target.starts_with("sqlite:") {
            self.url = Some(target.to_string());
            self.path = None;
        } else {
            self.path = Some(PathBuf::from(target));
            self.url = None;
        }
    }

    /// Returns the default database path for the current platform.
    pub fn default_db_path() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("staysmart")
            .join("staysmart.db")
    }

    /// Returns a display string for logs.
    pub fn display_string(&self) -> String {
        match self.location() {
            Ok(DatabaseLocation::Memory) => "in-memory database".to_string(),
            Ok(DatabaseLocation::File(path)) => path.display().to_string(),
            Err(_) => "invalid database location".to_string(),
        }
    }
}

/// Billing cycle configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BillingConfig {
    /// Days between consecutive payment due dates.
    #[serde(default = "default_cycle_days")]
    pub cycle_days: i64,

    /// Days before the due date at which a pending payment becomes due.
    #[serde(default = "default_due_lead_days")]
    pub due_lead_days: i64,
}

fn default_cycle_days() -> i64 {
    30
}

fn default_due_lead_days() -> i64 {
    3
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self {
            cycle_days: default_cycle_days(),
            due_lead_days: default_due_lead_days(),
        }
    }
}

impl Config {
    /// Returns the default config file path for the current platform.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("staysmart")
            .join("config.toml")
    }

    /// Loads configuration from a TOML file.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| StaySmartError::config(format!("Failed to read config file: {e}")))?;

        Self::parse_toml(&content, path)
    }

    /// Parses configuration from a TOML string.
    fn parse_toml(content: &str, path: &Path) -> Result<Self> {
        let config: Self = toml::from_str(content).map_err(|e| {
            StaySmartError::config(format!(
                "Configuration error in {}:\n  {}",
                path.display(),
                e
            ))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects values the store or billing logic cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.database.max_connections == 0 {
            return Err(StaySmartError::config(
                "database.max_connections must be at least 1",
            ));
        }
        if self.billing.cycle_days <= 0 || self.billing.cycle_days > MAX_CYCLE_DAYS {
            return Err(StaySmartError::config(format!(
                "billing.cycle_days must be between 1 and {MAX_CYCLE_DAYS}"
            )));
        }
        if self.billing.due_lead_days < 0 {
            return Err(StaySmartError::config(
                "billing.due_lead_days cannot be negative",
            ));
        }
        if self.billing.due_lead_days > self.billing.cycle_days {
            return Err(StaySmartError::config(
                "billing.due_lead_days cannot exceed billing.cycle_days",
            ));
        }
        Ok(())
    }
}
