//! Gateway configuration
//!
//! Resolution order for every setting:
//! 1. Command-line argument
//! 2. Environment variable
//! 3. TOML bootstrap file (`--config`, `MMTL_CONFIG`, or the platform default)
//! 4. Compiled default

use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

use mmtl_common::config::{
    default_config_path, default_data_dir, load_toml_config, sqlite_url_for, TomlConfig,
};
use mmtl_common::db::DEFAULT_MAX_CONNECTIONS;

pub const DEFAULT_BIND: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 5780;
pub const DEFAULT_CORRELATOR_URL: &str = "http://127.0.0.1:5000/correlate";
pub const DEFAULT_CORRELATOR_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_CORRELATOR_MAX_RETRIES: u32 = 1;
pub const DEFAULT_UPLOAD_LIMIT_BYTES: usize = 50 * 1024 * 1024;
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Settings read from the command line; `None` defers to lower layers
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub config_path: Option<PathBuf>,
    pub bind: Option<String>,
    pub port: Option<u16>,
    pub database_url: Option<String>,
    pub correlator_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CorrelatorConfig {
    pub url: String,
    pub timeout: Duration,
    pub max_retries: u32,
}

impl Default for CorrelatorConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_CORRELATOR_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_CORRELATOR_TIMEOUT_SECS),
            max_retries: DEFAULT_CORRELATOR_MAX_RETRIES,
        }
    }
}

#[derive(Clone, PartialEq)]
pub struct AuthConfig {
    /// When false every protected route is open
    pub enabled: bool,
    pub username: Option<String>,
    pub password: Option<String>,
    pub session_secret: Option<String>,
    pub cookie_http_only: bool,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("enabled", &self.enabled)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("session_secret", &self.session_secret.as_ref().map(|_| "<redacted>"))
            .field("cookie_http_only", &self.cookie_http_only)
            .finish()
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            username: None,
            password: None,
            session_secret: None,
            cookie_http_only: false,
        }
    }
}

/// Fully resolved gateway settings
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayConfig {
    pub bind: String,
    pub port: u16,
    pub database_url: String,
    pub max_connections: u32,
    pub correlator: CorrelatorConfig,
    pub auth: AuthConfig,
    pub upload_limit_bytes: usize,
    /// `EnvFilter` directive used when `RUST_LOG` is unset
    pub log_filter: String,
}

/// Where the bootstrap file came from
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigSource {
    File(PathBuf),
    Missing(PathBuf),
    NoConfigDir,
}

impl ConfigSource {
    /// Report the source; called once logging is up
    pub fn log(&self) {
        match self {
            ConfigSource::File(path) => info!("Loaded config from {}", path.display()),
            ConfigSource::Missing(path) => {
                warn!("Config file {} not found, using defaults", path.display())
            }
            ConfigSource::NoConfigDir => warn!("No config directory available, using defaults"),
        }
    }
}

impl GatewayConfig {
    /// Resolve against the process environment and the bootstrap file
    ///
    /// A missing file is not an error; a malformed one is.
    pub fn load(cli: &CliOverrides) -> mmtl_common::Result<(Self, ConfigSource)> {
        let env = |key: &str| std::env::var(key).ok().filter(|v| !v.trim().is_empty());

        let path = cli
            .config_path
            .clone()
            .or_else(|| env("MMTL_CONFIG").map(PathBuf::from))
            .or_else(default_config_path);

        let (toml, source) = match path {
            Some(path) if path.exists() => (load_toml_config(&path)?, ConfigSource::File(path)),
            Some(path) => (TomlConfig::default(), ConfigSource::Missing(path)),
            None => (TomlConfig::default(), ConfigSource::NoConfigDir),
        };

        Ok((Self::resolve_with_env(cli, &toml, env), source))
    }

    /// Merge the four layers with an injectable environment lookup
    pub fn resolve_with_env<F>(cli: &CliOverrides, toml: &TomlConfig, env: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let bind = cli
            .bind
            .clone()
            .or_else(|| env("MMTL_BIND"))
            .or_else(|| toml.server.bind.clone())
            .unwrap_or_else(|| DEFAULT_BIND.to_string());

        let port = cli
            .port
            .or_else(|| parsed(&env, "MMTL_PORT"))
            .or(toml.server.port)
            .unwrap_or(DEFAULT_PORT);

        let database_url = cli
            .database_url
            .clone()
            .or_else(|| env("DATABASE_URL"))
            .or_else(|| toml.database.url.clone())
            .unwrap_or_else(|| sqlite_url_for(&default_data_dir().join("mmtl.db")));

        let max_connections = toml
            .database
            .max_connections
            .unwrap_or(DEFAULT_MAX_CONNECTIONS);

        let correlator = CorrelatorConfig {
            url: cli
                .correlator_url
                .clone()
                .or_else(|| env("CORRELATOR_URL"))
                .or_else(|| toml.correlator.url.clone())
                .unwrap_or_else(|| DEFAULT_CORRELATOR_URL.to_string()),
            timeout: Duration::from_secs(
                parsed(&env, "CORRELATOR_TIMEOUT_SECS")
                    .or(toml.correlator.timeout_secs)
                    .unwrap_or(DEFAULT_CORRELATOR_TIMEOUT_SECS),
            ),
            max_retries: parsed(&env, "CORRELATOR_MAX_RETRIES")
                .or(toml.correlator.max_retries)
                .unwrap_or(DEFAULT_CORRELATOR_MAX_RETRIES),
        };

        let auth = AuthConfig {
            enabled: flag(&env, "MMTL_AUTH_ENABLED")
                .or(toml.auth.enabled)
                .unwrap_or(true),
            username: env("ADMIN_USERNAME").or_else(|| toml.auth.username.clone()),
            password: env("ADMIN_PASSWORD").or_else(|| toml.auth.password.clone()),
            session_secret: env("MMTL_SESSION_SECRET").or_else(|| toml.auth.session_secret.clone()),
            cookie_http_only: flag(&env, "MMTL_COOKIE_HTTP_ONLY")
                .or(toml.auth.cookie_http_only)
                .unwrap_or(false),
        };

        let upload_limit_bytes = parsed(&env, "MMTL_UPLOAD_LIMIT_BYTES")
            .or(toml.server.upload_limit_bytes)
            .unwrap_or(DEFAULT_UPLOAD_LIMIT_BYTES);

        let level = if toml.logging.level.trim().is_empty() {
            DEFAULT_LOG_LEVEL
        } else {
            toml.logging.level.trim()
        };
        let log_filter = format!(
            "mmtl_gateway={0},mmtl_common={0},tower_http={0}",
            level
        );

        Self {
            bind,
            port,
            database_url,
            max_connections,
            correlator,
            auth,
            upload_limit_bytes,
            log_filter,
        }
    }
}

fn parsed<T, F>(env: &F, key: &str) -> Option<T>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    let raw = env(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!("Ignoring {}={:?}: not a valid value", key, raw);
            None
        }
    }
}

fn flag<F>(env: &F, key: &str) -> Option<bool>
where
    F: Fn(&str) -> Option<String>,
{
    let raw = env(key)?;
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => {
            warn!("Ignoring {}={:?}: expected true or false", key, raw);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mmtl_common::config::parse_toml_config;
    use std::collections::HashMap;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config =
            GatewayConfig::resolve_with_env(&CliOverrides::default(), &TomlConfig::default(), env_from(&[]));
        assert_eq!(config.bind, DEFAULT_BIND);
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.correlator, CorrelatorConfig::default());
        assert!(config.auth.enabled);
        assert!(!config.auth.cookie_http_only);
        assert!(config.auth.username.is_none());
        assert_eq!(config.upload_limit_bytes, DEFAULT_UPLOAD_LIMIT_BYTES);
        assert!(config.database_url.starts_with("sqlite://"));
        assert!(config.database_url.ends_with("mmtl.db?mode=rwc"));
        assert!(config.log_filter.starts_with("mmtl_gateway=info"));
    }

    #[test]
    fn test_layer_precedence() {
        let toml = parse_toml_config(
            r#"
            [server]
            port = 7000
            bind = "0.0.0.0"

            [correlator]
            url = "http://toml/correlate"
            timeout_secs = 30

            [logging]
            level = "debug"
            "#,
        )
        .unwrap();
        let env = env_from(&[("MMTL_PORT", "7100"), ("CORRELATOR_URL", "http://env/correlate")]);
        let cli = CliOverrides {
            port: Some(7200),
            ..Default::default()
        };

        let config = GatewayConfig::resolve_with_env(&cli, &toml, env);
        assert_eq!(config.port, 7200);
        assert_eq!(config.bind, "0.0.0.0");
        assert_eq!(config.correlator.url, "http://env/correlate");
        assert_eq!(config.correlator.timeout, Duration::from_secs(30));
        assert_eq!(config.correlator.max_retries, DEFAULT_CORRELATOR_MAX_RETRIES);
        assert!(config.log_filter.contains("mmtl_gateway=debug"));
    }

    #[test]
    fn test_auth_from_env() {
        let env = env_from(&[
            ("ADMIN_USERNAME", "admin"),
            ("ADMIN_PASSWORD", "hunter2"),
            ("MMTL_AUTH_ENABLED", "false"),
            ("MMTL_COOKIE_HTTP_ONLY", "yes"),
        ]);
        let config = GatewayConfig::resolve_with_env(&CliOverrides::default(), &TomlConfig::default(), env);
        assert_eq!(config.auth.username.as_deref(), Some("admin"));
        assert_eq!(config.auth.password.as_deref(), Some("hunter2"));
        assert!(!config.auth.enabled);
        assert!(config.auth.cookie_http_only);
        assert!(!format!("{:?}", config.auth).contains("hunter2"));
    }

    #[test]
    fn test_invalid_env_values_fall_through() {
        let toml = parse_toml_config("[server]\nport = 7000\n").unwrap();
        let env = env_from(&[("MMTL_PORT", "not-a-port"), ("MMTL_AUTH_ENABLED", "maybe")]);
        let config = GatewayConfig::resolve_with_env(&CliOverrides::default(), &toml, env);
        assert_eq!(config.port, 7000);
        assert!(config.auth.enabled);
    }
}
