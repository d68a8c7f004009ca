//! Bootstrap configuration file
//!
//! The TOML file is optional. Every key is optional; services layer CLI
//! arguments and environment variables on top and fall back to compiled
//! defaults for anything left unset.
//!
//! ```toml
//! [server]
//! port = 5780
//!
//! [database]
//! url = "sqlite:///var/lib/mmtl/mmtl.db?mode=rwc"
//!
//! [correlator]
//! url = "http://127.0.0.1:5000/correlate"
//! timeout_secs = 120
//! max_retries = 1
//!
//! [auth]
//! username = "admin"
//! cookie_http_only = false
//!
//! [logging]
//! level = "info"
//! ```

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Parsed bootstrap file
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    pub server: ServerSection,
    pub database: DatabaseSection,
    pub correlator: CorrelatorSection,
    pub auth: AuthSection,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    pub bind: Option<String>,
    pub port: Option<u16>,
    /// Maximum accepted request body, in bytes
    pub upload_limit_bytes: Option<usize>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DatabaseSection {
    pub url: Option<String>,
    pub max_connections: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CorrelatorSection {
    pub url: Option<String>,
    pub timeout_secs: Option<u64>,
    pub max_retries: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AuthSection {
    pub enabled: Option<bool>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub session_secret: Option<String>,
    pub cookie_http_only: Option<bool>,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Read and parse a bootstrap file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
    parse_toml_config(&content)
}

/// Parse bootstrap TOML text
pub fn parse_toml_config(content: &str) -> Result<TomlConfig> {
    toml::from_str(content).map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))
}

/// Default bootstrap file location (`~/.config/mmtl/config.toml` on Linux)
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("mmtl").join("config.toml"))
}

/// Default data folder holding the SQLite file
pub fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("mmtl"))
        .unwrap_or_else(|| PathBuf::from("./mmtl_data"))
}

/// SQLite URL for a database file, created on first use
pub fn sqlite_url_for(path: &Path) -> String {
    format!("sqlite://{}?mode=rwc", path.display())
}
