use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::{DoraError, Result};
use crate::repository::DEFAULT_BASE_URL;

/// Default bind host for the HTTP binding.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default port for the HTTP binding.
pub const DEFAULT_PORT: u16 = 8000;

/// Which transport binding the process runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    /// Line-delimited JSON-RPC over stdin/stdout.
    #[default]
    Stdio,
    /// JSON-RPC over `POST /mcp`.
    Http,
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stdio => f.write_str("stdio"),
            Self::Http => f.write_str("http"),
        }
    }
}

impl FromStr for TransportKind {
    type Err = DoraError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "stdio" => Ok(Self::Stdio),
            "http" => Ok(Self::Http),
            other => Err(DoraError::Config {
                message: format!("unknown transport '{}' (expected 'stdio' or 'http')", other),
            }),
        }
    }
}

/// Process configuration, resolved once at startup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Transport binding to run.
    pub transport: TransportKind,
    /// Bind host for the HTTP binding.
    pub host: String,
    /// Bind port for the HTTP binding.
    pub port: u16,
    /// Repository base URL, up to and including `/islandora`.
    pub base_url: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            transport: TransportKind::default(),
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

/// Loads the configuration from a JSON file.
///
/// Keys missing from the file keep their defaults.
pub fn load_config(path: &Path) -> Result<ServerConfig> {
    let contents = fs::read_to_string(path).map_err(|e| DoraError::Config {
        message: format!("failed to read config file '{}': {}", path.display(), e),
    })?;

    serde_json::from_str(&contents).map_err(|e| DoraError::Config {
        message: format!("failed to parse config file '{}': {}", path.display(), e),
    })
}

/// Command-line and environment overrides applied on top of the file config.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub transport: Option<TransportKind>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub base_url: Option<String>,
}

impl ServerConfig {
    /// Returns a copy with every set override applied.
    pub fn with_overrides(mut self, overrides: ConfigOverrides) -> Self {
        if let Some(transport) = overrides.transport {
            self.transport = transport;
        }
        if let Some(host) = overrides.host {
            self.host = host;
        }
        if let Some(port) = overrides.port {
            self.port = port;
        }
        if let Some(base_url) = overrides.base_url {
            self.base_url = base_url;
        }
        self
    }

    /// Checks values that serde cannot.
    pub fn validate(&self) -> Result<()> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(DoraError::Config {
                message: format!("base_url must be an http(s) URL, got '{}'", self.base_url),
            });
        }
        if self.transport == TransportKind::Http && self.host.trim().is_empty() {
            return Err(DoraError::Config {
                message: "host must not be empty for the http transport".to_string(),
            });
        }
        Ok(())
    }
}
