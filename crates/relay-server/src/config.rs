//! Server configuration loading from file and environment variables.

use serde::Deserialize;
use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;
use thiserror::Error;

/// Top-level server configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Server network settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Notification platform settings.
    #[serde(default)]
    pub platform: PlatformSettings,

    /// Relay behaviour settings.
    #[serde(default)]
    pub relay: RelaySettings,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Network configuration for the HTTP server.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to.
    #[serde(default = "default_host")]
    pub host: IpAddr,

    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Public base URL of this application. Sent to the platform as the
    /// caller URL during exchange and as the notification source URL.
    #[serde(default = "default_public_url")]
    pub public_url: String,
}

/// Where the notification platform lives.
#[derive(Debug, Clone, Deserialize)]
pub struct PlatformSettings {
    /// Base URL of the platform.
    #[serde(default = "default_platform_url")]
    pub base_url: String,

    /// Timeout for each platform request, in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// Relay behaviour.
#[derive(Debug, Clone, Deserialize)]
pub struct RelaySettings {
    /// Name presented to the platform when the caller does not supply one.
    #[serde(default = "default_source_name")]
    pub source_name: String,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "relay_server=debug,info").
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Whether to output logs in JSON format.
    #[serde(default)]
    pub json: bool,
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1))
}

fn default_port() -> u16 {
    5000
}

fn default_public_url() -> String {
    "http://localhost:5000".to_string()
}

fn default_platform_url() -> String {
    "http://localhost:3000".to_string()
}

fn default_timeout_secs() -> u64 {
    relay_platform::DEFAULT_TIMEOUT.as_secs()
}

fn default_source_name() -> String {
    "Third-party demo service".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            public_url: default_public_url(),
        }
    }
}

impl Default for PlatformSettings {
    fn default() -> Self {
        Self {
            base_url: default_platform_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for RelaySettings {
    fn default() -> Self {
        Self {
            source_name: default_source_name(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl PlatformSettings {
    /// Converts to the platform client's connection settings.
    pub fn client_config(&self) -> relay_platform::PlatformConfig {
        relay_platform::PlatformConfig {
            base_url: self.base_url.clone(),
            timeout: Duration::from_secs(self.timeout_secs),
        }
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    /// Failed to parse the configuration file.
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Loads configuration from a TOML file, falling back to defaults.
///
/// Environment variable overrides:
/// - `RELAY_HOST` overrides `server.host`
/// - `RELAY_PORT` overrides `server.port`
/// - `RELAY_PUBLIC_URL` overrides `server.public_url`
/// - `RELAY_PLATFORM_URL` overrides `platform.base_url`
/// - `RELAY_PLATFORM_TIMEOUT_SECS` overrides `platform.timeout_secs`
/// - `RELAY_SOURCE_NAME` overrides `relay.source_name`
/// - `RELAY_LOG_LEVEL` overrides `logging.level`
/// - `RELAY_LOG_JSON` overrides `logging.json` (set to "true" to enable)
///
/// # Errors
///
/// Returns `ConfigError` if the file exists but cannot be read or parsed.
pub fn load_config(path: Option<&str>) -> Result<Config, ConfigError> {
    let mut config = match path {
        Some(p) => match std::fs::read_to_string(p) {
            Ok(contents) => toml::from_str(&contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = p, "config file not found, using defaults");
                Config::default()
            }
            Err(e) => return Err(ConfigError::FileRead(e)),
        },
        None => Config::default(),
    };

    // Environment variable overrides
    if let Ok(host) = std::env::var("RELAY_HOST") {
        if let Ok(parsed) = host.parse() {
            config.server.host = parsed;
        }
    }
    if let Ok(port) = std::env::var("RELAY_PORT") {
        if let Ok(parsed) = port.parse() {
            config.server.port = parsed;
        }
    }
    if let Ok(url) = std::env::var("RELAY_PUBLIC_URL") {
        config.server.public_url = url;
    }
    if let Ok(url) = std::env::var("RELAY_PLATFORM_URL") {
        config.platform.base_url = url;
    }
    if let Ok(secs) = std::env::var("RELAY_PLATFORM_TIMEOUT_SECS") {
        if let Ok(parsed) = secs.parse() {
            config.platform.timeout_secs = parsed;
        }
    }
    if let Ok(name) = std::env::var("RELAY_SOURCE_NAME") {
        config.relay.source_name = name;
    }
    if let Ok(level) = std::env::var("RELAY_LOG_LEVEL") {
        config.logging.level = level;
    }
    if let Ok(json) = std::env::var("RELAY_LOG_JSON") {
        config.logging.json = json == "true" || json == "1";
    }

    Ok(config)
}
