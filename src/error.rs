use std::path::PathBuf;
use thiserror::Error;

/// Failures of a supervisor operation. Each one is turned into an `error`
/// event for the connection that issued the command.
#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error("{name} is already running")]
    AlreadyRunning { name: String },

    #[error("{0}")]
    NotFound(String),

    /// OS-level failure launching a process, message kept verbatim
    #[error("{0}")]
    SpawnFailure(String),
}

/// Inbound frame could not be turned into a command.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("Invalid message: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("Unknown action: {0}")]
    UnknownAction(String),

    #[error("Missing field: {0}")]
    MissingField(&'static str),
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("failed to read project snapshot {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse project snapshot {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Error)]
pub enum AssetError {
    #[error("Not found")]
    NotFound,

    #[error("Server error")]
    Read(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {key} value {value:?}")]
    InvalidValue { key: &'static str, value: String },

    #[error("failed to parse config file {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}
