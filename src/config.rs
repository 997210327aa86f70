//! Where to send what.
//!
//! Resolution order: command-line flags / environment variables → config
//! file → defaults. Flags and environment are resolved by the binary and
//! handed over as [`Overrides`].
//!
//! Config file (TOML), all keys optional:
//!
//! ```toml
//! addr = "192.168.0.2"
//! port = 4000
//! file = "test.mp4"
//! connect_timeout_secs = 5
//! ```

use crate::error::ConfigError;
use crate::socket::Endpoint;
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_ADDR: Ipv4Addr = Ipv4Addr::new(192, 168, 0, 2);
pub const DEFAULT_PORT: u16 = 4000;
pub const DEFAULT_FILE: &str = "test.mp4";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub addr: Ipv4Addr,
    pub port: u16,
    /// File whose bytes make up the payload.
    pub file: PathBuf,
    /// Absent = block until the OS gives up on the connect.
    pub connect_timeout_secs: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            addr: DEFAULT_ADDR,
            port: DEFAULT_PORT,
            file: PathBuf::from(DEFAULT_FILE),
            connect_timeout_secs: None,
        }
    }
}

/// Values that take precedence over the config file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub addr: Option<Ipv4Addr>,
    pub port: Option<u16>,
    pub file: Option<PathBuf>,
    pub connect_timeout_secs: Option<u64>,
}

impl Config {
    /// Loads `path` if given, otherwise starts from the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        if config.connect_timeout_secs == Some(0) {
            return Err(ConfigError::Invalid {
                path: path.to_path_buf(),
                reason: "connect_timeout_secs must be at least 1",
            });
        }
        Ok(config)
    }

    pub fn apply(mut self, overrides: Overrides) -> Self {
        if let Some(addr) = overrides.addr {
            self.addr = addr;
        }
        if let Some(port) = overrides.port {
            self.port = port;
        }
        if let Some(file) = overrides.file {
            self.file = file;
        }
        if overrides.connect_timeout_secs.is_some() {
            self.connect_timeout_secs = overrides.connect_timeout_secs;
        }
        self
    }

    pub fn endpoint(&self) -> Endpoint {
        Endpoint(self.addr, self.port)
    }

    pub fn connect_timeout(&self) -> Option<Duration> {
        self.connect_timeout_secs.map(Duration::from_secs)
    }
}
