//! TOML Configuration File Support
//!
//! Client configuration is read from `~/.config/streamchat/config.toml`.
//!
//! # Configuration Priority
//!
//! Configuration values are loaded with the following priority (highest first):
//! 1. CLI arguments (via [`ConfigOverrides`])
//! 2. Environment variables
//! 3. TOML configuration file
//! 4. Default values
//!
//! # Example Configuration
//!
//! ```toml
//! [server]
//! base_url = "http://localhost:8081"
//! websocket_path = "/api/v1/ws"
//! upload_path = "/api/v1/upload-image"
//! connect_timeout_ms = 5000
//!
//! [upload]
//! max_image_bytes = 5242880
//! ```

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::image::MAX_IMAGE_BYTES;

/// Backend used when nothing else is configured
pub const DEFAULT_BASE_URL: &str = "http://localhost:8081";
/// Streaming channel path
pub const DEFAULT_WEBSOCKET_PATH: &str = "/api/v1/ws";
/// Image upload path
pub const DEFAULT_UPLOAD_PATH: &str = "/api/v1/upload-image";
/// WebSocket handshake bound
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 5000;

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur when loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read config file at {path}: {source}")]
    ReadError {
        /// The path that was attempted
        path: PathBuf,
        /// The underlying IO error
        source: std::io::Error,
    },

    /// Failed to parse TOML
    #[error("Failed to parse TOML config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

// =============================================================================
// Configuration Source Tracking
// =============================================================================

/// Tracks where a configuration value came from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigSource {
    /// Value from command-line argument
    Cli,
    /// Value from environment variable
    Env,
    /// Value from TOML configuration file
    File,
    /// Default value
    Default,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cli => write!(f, "CLI"),
            Self::Env => write!(f, "environment"),
            Self::File => write!(f, "config file"),
            Self::Default => write!(f, "default"),
        }
    }
}

// =============================================================================
// TOML Configuration Structures
// =============================================================================

/// Server section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerToml {
    /// Backend base URL (`http`, `https`, `ws` or `wss`)
    pub base_url: Option<String>,

    /// Path of the streaming WebSocket endpoint
    pub websocket_path: Option<String>,

    /// Path of the image upload endpoint
    pub upload_path: Option<String>,

    /// WebSocket handshake timeout in milliseconds
    pub connect_timeout_ms: Option<u64>,
}

/// Upload section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadToml {
    /// Largest accepted image in bytes
    pub max_image_bytes: Option<usize>,
}

/// Top-level TOML configuration structure
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatToml {
    /// Server configuration section
    pub server: ServerToml,

    /// Upload configuration section
    pub upload: UploadToml,
}

// =============================================================================
// Main Configuration Struct
// =============================================================================

/// Resolved client configuration
#[derive(Clone, Debug)]
pub struct ChatConfig {
    /// Backend base URL
    pub base_url: String,

    /// Streaming channel path
    pub websocket_path: String,

    /// Image upload path
    pub upload_path: String,

    /// Largest accepted image in bytes
    pub max_image_bytes: usize,

    /// WebSocket handshake timeout
    pub connect_timeout: Duration,

    /// Path to the config file that was loaded (if any)
    pub config_file_path: Option<PathBuf>,

    source: ConfigSource,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            websocket_path: DEFAULT_WEBSOCKET_PATH.to_string(),
            upload_path: DEFAULT_UPLOAD_PATH.to_string(),
            max_image_bytes: MAX_IMAGE_BYTES,
            connect_timeout: Duration::from_millis(DEFAULT_CONNECT_TIMEOUT_MS),
            config_file_path: None,
            source: ConfigSource::Default,
        }
    }
}

impl ChatConfig {
    /// Create a new configuration with default values
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the primary source of this configuration
    #[must_use]
    pub fn source(&self) -> ConfigSource {
        self.source
    }

    /// Set the configuration source
    pub fn set_source(&mut self, source: ConfigSource) {
        self.source = source;
    }

    /// Full WebSocket URL, with `http`/`https` mapped to `ws`/`wss`
    #[must_use]
    pub fn websocket_url(&self) -> String {
        let base = self.base_url.trim_end_matches('/');
        let base = if let Some(rest) = base.strip_prefix("https://") {
            format!("wss://{rest}")
        } else if let Some(rest) = base.strip_prefix("http://") {
            format!("ws://{rest}")
        } else {
            base.to_string()
        };
        join_path(&base, &self.websocket_path)
    }

    /// Full image upload URL, with `ws`/`wss` mapped to `http`/`https`
    #[must_use]
    pub fn upload_url(&self) -> String {
        let base = self.base_url.trim_end_matches('/');
        let base = if let Some(rest) = base.strip_prefix("wss://") {
            format!("https://{rest}")
        } else if let Some(rest) = base.strip_prefix("ws://") {
            format!("http://{rest}")
        } else {
            base.to_string()
        };
        join_path(&base, &self.upload_path)
    }

    /// Check values that would only fail later at connect time
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] naming the offending value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let scheme_ok = ["http://", "https://", "ws://", "wss://"]
            .iter()
            .any(|scheme| self.base_url.starts_with(scheme));
        if !scheme_ok {
            return Err(ConfigError::ValidationError(format!(
                "base_url must start with http://, https://, ws:// or wss:// (got {:?})",
                self.base_url
            )));
        }
        if self.max_image_bytes == 0 {
            return Err(ConfigError::ValidationError(
                "max_image_bytes must be greater than zero".to_string(),
            ));
        }
        if self.connect_timeout.is_zero() {
            return Err(ConfigError::ValidationError(
                "connect_timeout_ms must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

fn join_path(base: &str, path: &str) -> String {
    if path.starts_with('/') {
        format!("{base}{path}")
    } else {
        format!("{base}/{path}")
    }
}

// =============================================================================
// Configuration Loading
// =============================================================================

/// Get the default configuration file path
///
/// Returns `$XDG_CONFIG_HOME/streamchat/config.toml` or
/// `~/.config/streamchat/config.toml` if `XDG_CONFIG_HOME` is not set.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("streamchat").join("config.toml"))
}

/// Load configuration from the default path and the environment
///
/// # Errors
///
/// Returns an error if the config file exists but cannot be parsed, or if
/// the resulting values are invalid. A missing config file is not an error.
pub fn load_config() -> Result<ChatConfig, ConfigError> {
    load_config_from_path(default_config_path())
}

/// Load configuration from a specific path and the environment
///
/// # Errors
///
/// Returns an error if the specified config file cannot be read or parsed.
pub fn load_config_from_path(path: Option<PathBuf>) -> Result<ChatConfig, ConfigError> {
    load_config_with_env(path, |key| std::env::var(key).ok())
}

/// Load configuration with a caller-supplied environment lookup
///
/// # Errors
///
/// Same as [`load_config_from_path`].
pub fn load_config_with_env<F>(path: Option<PathBuf>, env: F) -> Result<ChatConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = ChatConfig::default();

    if let Some(ref config_path) = path {
        if config_path.exists() {
            let toml_content =
                std::fs::read_to_string(config_path).map_err(|e| ConfigError::ReadError {
                    path: config_path.clone(),
                    source: e,
                })?;

            let toml_config: ChatToml = toml::from_str(&toml_content)?;
            apply_toml_config(&mut config, &toml_config);
            config.config_file_path = Some(config_path.clone());
            config.source = ConfigSource::File;

            tracing::info!(
                path = %config_path.display(),
                "Loaded configuration from file"
            );
        } else {
            tracing::debug!(
                path = %config_path.display(),
                "Config file not found, using defaults"
            );
        }
    }

    apply_env_config(&mut config, env);
    config.validate()?;

    Ok(config)
}

fn apply_toml_config(config: &mut ChatConfig, toml: &ChatToml) {
    if let Some(ref url) = toml.server.base_url {
        config.base_url.clone_from(url);
    }
    if let Some(ref path) = toml.server.websocket_path {
        config.websocket_path.clone_from(path);
    }
    if let Some(ref path) = toml.server.upload_path {
        config.upload_path.clone_from(path);
    }
    if let Some(ms) = toml.server.connect_timeout_ms {
        config.connect_timeout = Duration::from_millis(ms);
    }
    if let Some(bytes) = toml.upload.max_image_bytes {
        config.max_image_bytes = bytes;
    }
}

fn apply_env_config<F>(config: &mut ChatConfig, env: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(url) = env("STREAMCHAT_SERVER") {
        config.base_url = url;
        config.source = ConfigSource::Env;
    }
    if let Some(path) = env("STREAMCHAT_WS_PATH") {
        config.websocket_path = path;
        config.source = ConfigSource::Env;
    }
    if let Some(path) = env("STREAMCHAT_UPLOAD_PATH") {
        config.upload_path = path;
        config.source = ConfigSource::Env;
    }
    if let Some(bytes) = env("STREAMCHAT_MAX_IMAGE_BYTES") {
        match bytes.parse::<usize>() {
            Ok(bytes) => {
                config.max_image_bytes = bytes;
                config.source = ConfigSource::Env;
            }
            Err(_) => tracing::warn!(value = %bytes, "Ignoring invalid STREAMCHAT_MAX_IMAGE_BYTES"),
        }
    }
    if let Some(timeout) = env("STREAMCHAT_CONNECT_TIMEOUT") {
        match timeout.parse::<u64>() {
            Ok(ms) => {
                config.connect_timeout = Duration::from_millis(ms);
                config.source = ConfigSource::Env;
            }
            Err(_) => {
                tracing::warn!(value = %timeout, "Ignoring invalid STREAMCHAT_CONNECT_TIMEOUT");
            }
        }
    }
}

// =============================================================================
// CLI Override Support
// =============================================================================

/// Builder for applying CLI overrides to configuration
///
/// Use this after [`load_config`] to apply command-line argument overrides.
#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    /// Backend base URL override
    pub base_url: Option<String>,

    /// Image size ceiling override (bytes)
    pub max_image_bytes: Option<usize>,

    /// Connect timeout override (milliseconds)
    pub connect_timeout_ms: Option<u64>,
}

impl ConfigOverrides {
    /// Create a new empty set of overrides
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set base URL override
    #[must_use]
    pub fn with_base_url(mut self, url: String) -> Self {
        self.base_url = Some(url);
        self
    }

    /// Set image size ceiling override
    #[must_use]
    pub fn with_max_image_bytes(mut self, bytes: usize) -> Self {
        self.max_image_bytes = Some(bytes);
        self
    }

    /// Set connect timeout override
    #[must_use]
    pub fn with_connect_timeout_ms(mut self, ms: u64) -> Self {
        self.connect_timeout_ms = Some(ms);
        self
    }

    /// Apply overrides to a configuration
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] if an override is invalid.
    pub fn apply(&self, config: &mut ChatConfig) -> Result<(), ConfigError> {
        if self.base_url.is_some()
            || self.max_image_bytes.is_some()
            || self.connect_timeout_ms.is_some()
        {
            config.source = ConfigSource::Cli;
        }

        if let Some(ref url) = self.base_url {
            config.base_url.clone_from(url);
        }
        if let Some(bytes) = self.max_image_bytes {
            config.max_image_bytes = bytes;
        }
        if let Some(ms) = self.connect_timeout_ms {
            config.connect_timeout = Duration::from_millis(ms);
        }

        config.validate()
    }
}

// =============================================================================
// Tests
// =============================================================================
