use crate::constants::{
    DEFAULT_OUTBOUND_QUEUE, DEFAULT_PD_AUX_PORT, DEFAULT_PD_CONNECT_TIMEOUT_MS, DEFAULT_PORT,
};
use crate::events::model::LogLevel;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// TCP port the gateway listens on
    #[serde(default = "default_port")]
    pub port: u16,
    /// Interface to bind (default 0.0.0.0)
    pub bind_addr: Option<String>,
    /// Port on the PD peer's host that receives replies and pushes
    pub pd_aux_port: Option<u16>,
    /// Connect timeout for the PD side-channel
    pub pd_connect_timeout_ms: Option<u64>,
    /// Per-session outbound line queue capacity
    pub outbound_queue: Option<usize>,
    /// Refuse connections beyond this many concurrent sessions (unlimited if unset)
    pub max_connections: Option<usize>,
    /// Logging / events configuration
    pub logging: Option<LoggingConfig>,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct LoggingConfig {
    /// Path to JSON line event log (rotated). If unset, defaults to logs/oocsi_events.jsonl
    pub json_path: Option<String>,
    /// Max size in bytes before rotation (default 5MB)
    pub json_max_bytes: Option<usize>,
    /// Number of rotated files to retain (default 3)
    pub json_rotate: Option<u32>,
    /// Disable console sink (default false)
    pub disable_console: Option<bool>,
    /// Disable JSON file sink (default false)
    pub disable_json: Option<bool>,
    /// Minimum level printed on the console
    pub console_level: Option<LogLevel>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            bind_addr: None,
            pd_aux_port: None,
            pd_connect_timeout_ms: None,
            outbound_queue: None,
            max_connections: None,
            logging: None,
        }
    }
}

impl Config {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Load a TOML config file. `Ok(None)` when the file does not exist.
    pub fn load(path: impl AsRef<Path>) -> Result<Option<Self>, ConfigError> {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(content) => Self::from_toml_str(&content).map(Some),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    pub fn bind_addr(&self) -> String {
        format!(
            "{}:{}",
            self.bind_addr.as_deref().unwrap_or("0.0.0.0"),
            self.port
        )
    }

    pub fn pd_aux_port(&self) -> u16 {
        self.pd_aux_port.unwrap_or(DEFAULT_PD_AUX_PORT)
    }

    pub fn pd_connect_timeout_ms(&self) -> u64 {
        self.pd_connect_timeout_ms
            .unwrap_or(DEFAULT_PD_CONNECT_TIMEOUT_MS)
    }

    pub fn outbound_queue(&self) -> usize {
        self.outbound_queue.unwrap_or(DEFAULT_OUTBOUND_QUEUE).max(1)
    }
}
