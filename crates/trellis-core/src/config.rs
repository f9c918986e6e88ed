//! # Configuration
//!
//! Configuration is read through the [`ConfigProvider`] trait, a plain
//! key → string lookup. [`EnvConfig`] reads the process environment and
//! [`MapConfig`] holds values in memory for tests. [`FrameworkConfig`] is the
//! typed view the HTTP layer is built from.

use std::collections::HashMap;
use std::str::FromStr;

use crate::error::ConfigError;

/// Key → value lookup for configuration.
pub trait ConfigProvider: Send + Sync {
    /// Return the raw value for `key`, if set.
    fn get(&self, key: &str) -> Option<String>;
}

/// Reads configuration from environment variables.
///
/// With a prefix of `"APP_"`, `get("PORT")` reads `APP_PORT`.
#[derive(Debug, Clone, Default)]
pub struct EnvConfig {
    prefix: String,
}

impl EnvConfig {
    /// Provider reading unprefixed variables.
    pub fn new() -> Self {
        Self::default()
    }

    /// Provider reading variables named `{prefix}{key}`.
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }
}

impl ConfigProvider for EnvConfig {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(format!("{}{key}", self.prefix)).ok()
    }
}

/// In-memory configuration.
#[derive(Debug, Clone, Default)]
pub struct MapConfig {
    values: HashMap<String, String>,
}

impl MapConfig {
    /// Empty provider.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a value, builder style.
    pub fn set(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }
}

impl ConfigProvider for MapConfig {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }
}

impl<K, V> FromIterator<(K, V)> for MapConfig
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable multi-line output.
    #[default]
    Pretty,
    /// One JSON object per line.
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" | "text" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(format!("expected \"pretty\" or \"json\", got \"{other}\"")),
        }
    }
}

/// Typed configuration for the HTTP layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameworkConfig {
    /// Prefix all modules are mounted under.
    pub api_prefix: String,
    /// Bind address.
    pub host: String,
    /// Bind port.
    pub port: u16,
    /// Allowed CORS origins. Empty disables CORS; `"*"` allows any origin.
    pub cors_origins: Vec<String>,
    /// Append the built-in error handlers after project handlers.
    pub default_error_handlers: bool,
    /// Maximum request body size in bytes.
    pub body_limit: usize,
    /// Serve the generated OpenAPI document.
    pub openapi: bool,
    /// Log output format.
    pub log_format: LogFormat,
}

impl Default for FrameworkConfig {
    fn default() -> Self {
        Self {
            api_prefix: "/api".to_string(),
            host: "0.0.0.0".to_string(),
            port: 8080,
            cors_origins: Vec::new(),
            default_error_handlers: true,
            body_limit: 2 * 1024 * 1024,
            openapi: true,
            log_format: LogFormat::Pretty,
        }
    }
}

impl FrameworkConfig {
    /// Read configuration from a provider, falling back to defaults for
    /// unset keys.
    ///
    /// Keys: `API_PREFIX`, `HOST`, `PORT`, `CORS_ORIGINS`,
    /// `DEFAULT_ERROR_HANDLERS`, `BODY_LIMIT`, `OPENAPI`, `LOG_FORMAT`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when a set value cannot be parsed.
    pub fn from_provider(provider: &dyn ConfigProvider) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            api_prefix: provider
                .get("API_PREFIX")
                .map(|p| normalize_prefix(&p))
                .unwrap_or(defaults.api_prefix),
            host: provider.get("HOST").unwrap_or(defaults.host),
            port: parse_key(provider, "PORT")?.unwrap_or(defaults.port),
            cors_origins: provider
                .get("CORS_ORIGINS")
                .map(|raw| {
                    raw.split(',')
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or(defaults.cors_origins),
            default_error_handlers: parse_bool(provider, "DEFAULT_ERROR_HANDLERS")?
                .unwrap_or(defaults.default_error_handlers),
            body_limit: parse_key(provider, "BODY_LIMIT")?.unwrap_or(defaults.body_limit),
            openapi: parse_bool(provider, "OPENAPI")?.unwrap_or(defaults.openapi),
            log_format: parse_key(provider, "LOG_FORMAT")?.unwrap_or(defaults.log_format),
        })
    }
}

/// Normalize a mount prefix to `/segment` form; `""` and `"/"` become `""`.
pub fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim().trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{trimmed}")
    }
}

fn parse_key<T>(provider: &dyn ConfigProvider, key: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match provider.get(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| ConfigError::Invalid {
                key: key.to_string(),
                value: raw.clone(),
                reason: e.to_string(),
            }),
    }
}

fn parse_bool(provider: &dyn ConfigProvider, key: &str) -> Result<Option<bool>, ConfigError> {
    match provider.get(key) {
        None => Ok(None),
        Some(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(Some(true)),
            "0" | "false" | "no" | "off" => Ok(Some(false)),
            _ => Err(ConfigError::Invalid {
                key: key.to_string(),
                value: raw,
                reason: "expected a boolean".to_string(),
            }),
        },
    }
}
