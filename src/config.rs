//! tf-index configuration management.
//!
//! Settings live in `tf-index.toml` in the working directory unless a path
//! is given explicitly. Every field has a default, so a missing file or a
//! missing section is not an error.

use crate::error::{IndexError, Result};
use crate::fs_utils;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Default configuration file name
pub const CONFIG_FILE: &str = "tf-index.toml";

/// Environment variable overriding `database.path`
pub const DB_ENV: &str = "TF_INDEX_DB";

const LOG_LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub index: IndexConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub daemon: DaemonConfig,
}

/// Entity database settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite file holding the entity tables
    #[serde(default = "default_db_path")]
    pub path: PathBuf,

    /// Rows fetched per page while streaming
    #[serde(default = "default_page_size")]
    pub page_size: u64,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("threat-framework.db")
}

fn default_page_size() -> u64 {
    crate::source::sqlite::DEFAULT_PAGE_SIZE
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            page_size: default_page_size(),
        }
    }
}

/// Persisted index settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexConfig {
    #[serde(default = "default_index_path")]
    pub path: PathBuf,
}

fn default_index_path() -> PathBuf {
    PathBuf::from("index.yaml")
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            path: default_index_path(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// WebSocket daemon settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DaemonConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    9850
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl DaemonConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Settings {
    /// Load `tf-index.toml` from the current directory
    pub fn load() -> Result<Self> {
        Self::load_from(Path::new(CONFIG_FILE))
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|e| IndexError::Config {
            message: format!("Failed to read {}: {}", path.display(), e),
        })?;

        toml::from_str(&content).map_err(|e| IndexError::Config {
            message: format!("Failed to parse config: {}", e),
        })
    }

    /// Apply `TF_INDEX_DB` if it is set
    pub fn with_env_overrides(mut self) -> Self {
        self.apply_database_override(std::env::var(DB_ENV).ok());
        self
    }

    fn apply_database_override(&mut self, value: Option<String>) {
        if let Some(path) = value.filter(|v| !v.trim().is_empty()) {
            self.database.path = PathBuf::from(path);
        }
    }

    /// Save configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).map_err(|e| IndexError::Config {
            message: format!("Failed to serialize config: {}", e),
        })?;

        fs_utils::write_atomic(path, content.as_bytes())
            .map_err(|e| IndexError::persistence(path, e.to_string()))
    }

    /// Get a configuration value by key path (e.g., "index.path")
    pub fn get(&self, key: &str) -> Option<String> {
        let parts: Vec<&str> = key.split('.').collect();
        match parts.as_slice() {
            ["database", "path"] => Some(self.database.path.display().to_string()),
            ["database", "page_size"] => Some(self.database.page_size.to_string()),
            ["index", "path"] => Some(self.index.path.display().to_string()),
            ["logging", "level"] => Some(self.logging.level.clone()),
            ["daemon", "host"] => Some(self.daemon.host.clone()),
            ["daemon", "port"] => Some(self.daemon.port.to_string()),
            _ => None,
        }
    }

    /// Set a configuration value by key path
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let parts: Vec<&str> = key.split('.').collect();
        match parts.as_slice() {
            ["database", "path"] => self.database.path = non_empty_path(key, value)?,
            ["database", "page_size"] => {
                self.database.page_size = match value.parse::<u64>() {
                    Ok(n) if n > 0 => n,
                    _ => {
                        return Err(IndexError::Config {
                            message: format!("Invalid page size: {}. Must be a positive integer", value),
                        })
                    }
                };
            }
            ["index", "path"] => self.index.path = non_empty_path(key, value)?,
            ["logging", "level"] => {
                if !LOG_LEVELS.contains(&value) {
                    return Err(IndexError::Config {
                        message: format!(
                            "Invalid log level: {}. Must be one of: {}",
                            value,
                            LOG_LEVELS.join(", ")
                        ),
                    });
                }
                self.logging.level = value.to_string();
            }
            ["daemon", "host"] => self.daemon.host = value.to_string(),
            ["daemon", "port"] => {
                self.daemon.port = match value.parse::<u16>() {
                    Ok(port) if port > 0 => port,
                    _ => {
                        return Err(IndexError::Config {
                            message: format!("Invalid port: {}", value),
                        })
                    }
                };
            }
            _ => {
                return Err(IndexError::Config {
                    message: format!("Unknown configuration key: {}", key),
                });
            }
        }
        Ok(())
    }

    /// Display configuration as TOML
    pub fn display(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| IndexError::Config {
            message: format!("Failed to serialize config: {}", e),
        })
    }
}

fn non_empty_path(key: &str, value: &str) -> Result<PathBuf> {
    if value.trim().is_empty() {
        return Err(IndexError::Config {
            message: format!("{} cannot be empty", key),
        });
    }
    Ok(PathBuf::from(value))
}
