//! Edge cache configuration.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Top-level configuration for edge fragment caching and invalidation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EdgeConfig {
    /// Edge-fragment rendering.
    #[serde(default)]
    pub esi: EsiConfig,

    /// Widget defaults.
    #[serde(default)]
    pub widgets: WidgetConfig,

    /// Cache-server invalidation.
    #[serde(default)]
    pub invalidation: InvalidationConfig,

    /// Logging.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl EdgeConfig {
    /// Load config from a file (`.json` or TOML).
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = if path.extension().is_some_and(|ext| ext == "json") {
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse JSON config: {}", path.display()))?
        } else {
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse TOML config: {}", path.display()))?
        };

        config
            .validate()
            .with_context(|| format!("Invalid config: {}", path.display()))?;
        Ok(config)
    }

    /// Parse config from a TOML string.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).context("Failed to parse TOML config")?;
        config.validate()?;
        Ok(config)
    }

    /// Check values that serde cannot.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.invalidation.validate()
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid invalidation method '{0}'")]
    InvalidMethod(String),

    #[error("invalidation timeout must be greater than zero")]
    ZeroTimeout,

    #[error("cache server #{index} has an empty host")]
    EmptyHost { index: usize },

    #[error("cache server '{host}' has port 0")]
    ZeroPort { host: String },
}

/// Edge-fragment rendering toggle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EsiConfig {
    /// Render cacheable widgets as edge inclusions.
    #[serde(default)]
    pub enabled: bool,
}

impl EsiConfig {
    /// Enabled edge rendering.
    pub fn enabled() -> Self {
        Self { enabled: true }
    }
}

/// Widget defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WidgetConfig {
    /// Default freshness lifetime of a widget response, in seconds.
    #[serde(default = "default_widget_ttl_secs")]
    pub default_ttl_secs: u64,
}

fn default_widget_ttl_secs() -> u64 {
    300
}

impl WidgetConfig {
    /// Default widget TTL.
    pub fn default_ttl(&self) -> Duration {
        Duration::from_secs(self.default_ttl_secs)
    }
}

impl Default for WidgetConfig {
    fn default() -> Self {
        Self {
            default_ttl_secs: default_widget_ttl_secs(),
        }
    }
}

/// Cache-server invalidation settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvalidationConfig {
    /// Request method understood by the cache servers as "ban".
    #[serde(default = "default_method")]
    pub method: String,

    /// Per-server timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Statically configured cache servers.
    #[serde(default)]
    pub servers: Vec<ServerConfig>,
}

fn default_method() -> String {
    "BAN".to_string()
}

fn default_timeout_ms() -> u64 {
    3000
}

impl InvalidationConfig {
    /// Per-server timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Parsed invalidation method.
    pub fn http_method(&self) -> Result<http::Method, ConfigError> {
        http::Method::from_bytes(self.method.as_bytes())
            .map_err(|_| ConfigError::InvalidMethod(self.method.clone()))
    }

    fn validate(&self) -> Result<(), ConfigError> {
        self.http_method()?;

        if self.timeout_ms == 0 {
            return Err(ConfigError::ZeroTimeout);
        }

        for (index, server) in self.servers.iter().enumerate() {
            if server.host.trim().is_empty() {
                return Err(ConfigError::EmptyHost { index });
            }
            if server.port == 0 {
                return Err(ConfigError::ZeroPort {
                    host: server.host.clone(),
                });
            }
        }

        Ok(())
    }
}

impl Default for InvalidationConfig {
    fn default() -> Self {
        Self {
            method: default_method(),
            timeout_ms: default_timeout_ms(),
            servers: Vec::new(),
        }
    }
}

/// A cache server address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host name or IP.
    pub host: String,
    /// Port (default 80).
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_port() -> u16 {
    80
}

/// Logging settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default level filter; `RUST_LOG` takes precedence.
    #[serde(default = "default_level")]
    pub level: String,

    /// Output format.
    #[serde(default)]
    pub format: LogFormat,
}

fn default_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            format: LogFormat::default(),
        }
    }
}

/// Output format for logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable format (for development).
    #[default]
    Human,
    /// JSON format (for production/log aggregation).
    Json,
}
