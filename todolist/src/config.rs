//! Application configuration.
//!
//! Parses configuration from environment variables. Every setting has a
//! default, so running with a clean environment serves `tasks.json` on port
//! 8080.
//!
//! # Environment Variables
//!
//! | Variable | Required | Default | Description |
//! |----------|----------|---------|-------------|
//! | `TODO_FILE` | No | `tasks.json` | JSON file the task list persists to |
//! | `PORT` | No | 8080 | HTTP server port |
//! | `TODO_INDEX_FILE` | No | `index.html` | Static page served at `/` |

use std::env;
use std::path::PathBuf;

use thiserror::Error;

/// Default HTTP server port.
pub const DEFAULT_PORT: u16 = 8080;

/// Default backing file for the task list.
pub const DEFAULT_TASKS_FILE: &str = "tasks.json";

/// Default static page served at `/`.
pub const DEFAULT_INDEX_FILE: &str = "index.html";

/// Errors that can occur when parsing configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Environment variable has invalid format.
    #[error("invalid format for {var}: {message}")]
    InvalidFormat { var: String, message: String },

    /// Port number is invalid.
    #[error("invalid port number: {0}")]
    InvalidPort(#[from] std::num::ParseIntError),
}

/// Settings parsed from environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// File the task list is loaded from and saved to.
    pub tasks_file: PathBuf,

    /// HTTP server port.
    pub port: u16,

    /// Page returned by `GET /`.
    pub index_file: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tasks_file: PathBuf::from(DEFAULT_TASKS_FILE),
            port: DEFAULT_PORT,
            index_file: PathBuf::from(DEFAULT_INDEX_FILE),
        }
    }
}

impl Config {
    /// Parse configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - `PORT` is not a valid u16
    /// - a path variable is set but empty or not valid unicode
    ///
    /// # Example
    ///
    /// ```no_run
    /// use todolist::config::Config;
    ///
    /// let config = Config::from_env().expect("Failed to load config");
    /// println!("Server will listen on port {}", config.port);
    /// ```
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            tasks_file: parse_path("TODO_FILE", DEFAULT_TASKS_FILE)?,
            port: parse_port()?,
            index_file: parse_path("TODO_INDEX_FILE", DEFAULT_INDEX_FILE)?,
        })
    }
}

/// Parse a path environment variable, falling back to `default` when unset.
fn parse_path(name: &str, default: &str) -> Result<PathBuf, ConfigError> {
    match env::var(name) {
        Ok(value) if value.trim().is_empty() => Err(ConfigError::InvalidFormat {
            var: name.to_string(),
            message: "path cannot be empty".to_string(),
        }),
        Ok(value) => Ok(PathBuf::from(value)),
        Err(env::VarError::NotPresent) => Ok(PathBuf::from(default)),
        Err(env::VarError::NotUnicode(_)) => Err(ConfigError::InvalidFormat {
            var: name.to_string(),
            message: "contains invalid unicode".to_string(),
        }),
    }
}

/// Parse the PORT environment variable.
///
/// Returns the default port if not set.
fn parse_port() -> Result<u16, ConfigError> {
    match env::var("PORT") {
        Ok(port_str) => Ok(port_str.trim().parse()?),
        Err(env::VarError::NotPresent) => Ok(DEFAULT_PORT),
        Err(env::VarError::NotUnicode(_)) => Err(ConfigError::InvalidFormat {
            var: "PORT".to_string(),
            message: "contains invalid unicode".to_string(),
        }),
    }
}
