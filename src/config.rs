//! Server settings: command line and environment first, then
//! `~/.config/promcli/config.toml`, then built-in defaults.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_PORT: u16 = 9090;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("either --url or --address must be specified")]
    MissingServer,

    #[error("{path}: `url` and `address` are mutually exclusive")]
    ConflictingServer { path: String },

    #[error("failed to read {path}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

/// On-disk configuration file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub server: ServerSection,
    #[serde(skip)]
    source: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerSection {
    pub url: Option<String>,
    pub address: Option<String>,
    pub timeout: Option<u64>,
    pub insecure: Option<bool>,
}

/// Server options given on the command line or through the environment.
#[derive(Debug, Clone, Default)]
pub struct ServerOverrides {
    pub url: Option<String>,
    pub address: Option<String>,
    pub timeout: Option<u64>,
    pub insecure: bool,
}

/// Fully resolved connection settings.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub endpoint: String,
    pub timeout: Duration,
    pub insecure: bool,
}

impl Config {
    /// `$PROMCLI_CONFIG`, else `<config dir>/promcli/config.toml`.
    pub fn path() -> Option<PathBuf> {
        if let Ok(path) = std::env::var("PROMCLI_CONFIG") {
            return Some(PathBuf::from(path));
        }
        dirs::config_dir().map(|d| d.join("promcli").join("config.toml"))
    }

    /// Load the config file if there is one. A missing file is not an error.
    pub fn load() -> Result<Self, ConfigError> {
        match Self::path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let display = path.display().to_string();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: display.clone(),
            source,
        })?;
        let mut config: Config = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: display.clone(),
            source,
        })?;
        if config.server.url.is_some() && config.server.address.is_some() {
            return Err(ConfigError::ConflictingServer { path: display });
        }
        config.source = Some(path.to_path_buf());
        Ok(config)
    }

    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// Merge command-line overrides on top of the file.
    ///
    /// The server location is taken as a unit: if either `--url` or
    /// `--address` is given, the file's `url`/`address` are ignored.
    pub fn resolve(&self, overrides: &ServerOverrides) -> Result<ServerConfig, ConfigError> {
        let (url, address) = if overrides.url.is_some() || overrides.address.is_some() {
            (overrides.url.as_deref(), overrides.address.as_deref())
        } else {
            (self.server.url.as_deref(), self.server.address.as_deref())
        };

        let endpoint = match (non_empty(url), non_empty(address)) {
            (Some(url), _) => url.to_string(),
            (None, Some(address)) => address_endpoint(address),
            (None, None) => return Err(ConfigError::MissingServer),
        };

        let timeout = overrides
            .timeout
            .or(self.server.timeout)
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        Ok(ServerConfig {
            endpoint,
            timeout: Duration::from_secs(timeout),
            insecure: overrides.insecure || self.server.insecure.unwrap_or(false),
        })
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Bare host or IP to a URL on the default Prometheus port.
pub fn address_endpoint(address: &str) -> String {
    format!("http://{}:{}", address, DEFAULT_PORT)
}
