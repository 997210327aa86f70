use crate::socket::Endpoint;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

pub mod exit_code {
    pub const FILE_ACCESS: u8 = 66;
    pub const CONNECTION: u8 = 69;
    pub const TRANSMISSION: u8 = 74;
    pub const CONFIG: u8 = 78;
    pub const INTERRUPTED: u8 = 130;
}

/// Failures of the read -> connect -> send -> close sequence. Every variant is
/// terminal: nothing is retried once one of these is produced.
#[derive(Debug, Error)]
pub enum SendError {
    #[error("cannot read {}", path.display())]
    FileAccess {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("cannot connect to {endpoint}")]
    Connection {
        endpoint: Endpoint,
        #[source]
        source: io::Error,
    },
    #[error("transmission to {endpoint} failed after {sent} of {total} bytes")]
    Transmission {
        endpoint: Endpoint,
        sent: usize,
        total: usize,
        #[source]
        source: io::Error,
    },
}

impl SendError {
    pub fn exit_code(&self) -> u8 {
        match self {
            SendError::FileAccess { .. } => exit_code::FILE_ACCESS,
            SendError::Connection { .. } => exit_code::CONNECTION,
            SendError::Transmission { .. } => exit_code::TRANSMISSION,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid config file {}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid config file {}: {reason}", path.display())]
    Invalid { path: PathBuf, reason: &'static str },
}
