//! Client configuration.
//!
//! Loaded from a TOML file (`~/.config/palaver/config.toml`) with compiled
//! defaults filling every gap. A missing default-path file is not an
//! error; an explicitly given path that does not exist is.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::connection::ReconnectConfig;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file {path}: {source}")]
    ReadFile {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Failed to parse the TOML configuration.
    #[error("failed to parse config file: {0}")]
    ParseToml(#[from] toml::de::Error),
}

// ---------------------------------------------------------------------------
// TOML file structs (all fields Option for partial overrides)
// ---------------------------------------------------------------------------

/// Top-level TOML config file structure.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct ConfigFile {
    connection: ConnectionFileConfig,
    session: SessionFileConfig,
}

/// `[connection]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct ConnectionFileConfig {
    ws_url: Option<String>,
    connect_timeout_secs: Option<u64>,
    reconnect_base_delay_ms: Option<u64>,
    reconnect_max_delay_ms: Option<u64>,
}

/// `[session]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct SessionFileConfig {
    history_page_size: Option<u32>,
    event_buffer: Option<usize>,
    session_event_buffer: Option<usize>,
}

// ---------------------------------------------------------------------------
// Resolved configuration
// ---------------------------------------------------------------------------

/// Fully resolved client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// WebSocket endpoint of the chat server.
    pub ws_url: String,
    /// Timeout for the WebSocket handshake.
    pub connect_timeout: Duration,
    /// Reconnection backoff parameters.
    pub reconnect: ReconnectConfig,
    /// Messages fetched per history page.
    pub history_page_size: u32,
    /// Buffer size of the decoded inbound event channel.
    pub event_buffer: usize,
    /// Buffer size of the session event channel handed to the UI.
    pub session_event_buffer: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            ws_url: "ws://127.0.0.1:8000/ws".to_string(),
            connect_timeout: Duration::from_secs(10),
            reconnect: ReconnectConfig::default(),
            history_page_size: 50,
            event_buffer: 256,
            session_event_buffer: 64,
        }
    }
}

impl ClientConfig {
    /// Load configuration from a TOML file merged over the defaults.
    ///
    /// With `explicit_path` the file must exist; without it the default
    /// path is tried and a missing file yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the file cannot be read or parsed.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self, ConfigError> {
        let file = load_config_file(explicit_path)?;
        Ok(Self::resolve(&file))
    }

    /// Resolve a `ClientConfig` from a parsed config file.
    ///
    /// Separated from `load()` to enable unit testing without the
    /// filesystem.
    #[must_use]
    fn resolve(file: &ConfigFile) -> Self {
        let defaults = Self::default();

        Self {
            ws_url: file
                .connection
                .ws_url
                .clone()
                .unwrap_or(defaults.ws_url),
            connect_timeout: file
                .connection
                .connect_timeout_secs
                .map_or(defaults.connect_timeout, Duration::from_secs),
            reconnect: ReconnectConfig {
                base_delay: file
                    .connection
                    .reconnect_base_delay_ms
                    .map_or(defaults.reconnect.base_delay, Duration::from_millis),
                max_delay: file
                    .connection
                    .reconnect_max_delay_ms
                    .map_or(defaults.reconnect.max_delay, Duration::from_millis),
            },
            history_page_size: file
                .session
                .history_page_size
                .unwrap_or(defaults.history_page_size),
            event_buffer: file.session.event_buffer.unwrap_or(defaults.event_buffer),
            session_event_buffer: file
                .session
                .session_event_buffer
                .unwrap_or(defaults.session_event_buffer),
        }
    }
}

/// Load and parse a TOML config file.
///
/// If `explicit_path` is `Some`, the file must exist (error if not).
/// If `explicit_path` is `None`, the default path is tried and missing file
/// is treated as empty config.
fn load_config_file(explicit_path: Option<&Path>) -> Result<ConfigFile, ConfigError> {
    let path = if let Some(p) = explicit_path {
        let contents = std::fs::read_to_string(p).map_err(|e| ConfigError::ReadFile {
            path: p.to_path_buf(),
            source: e,
        })?;
        return Ok(toml::from_str(&contents)?);
    } else {
        let Some(config_dir) = dirs::config_dir() else {
            return Ok(ConfigFile::default());
        };
        config_dir.join("palaver").join("config.toml")
    };

    match std::fs::read_to_string(&path) {
        Ok(contents) => Ok(toml::from_str(&contents)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ConfigFile::default()),
        Err(e) => Err(ConfigError::ReadFile { path, source: e }),
    }
}
