//! Error types for the bridge

use std::time::Duration;

use thiserror::Error;

pub type BridgeResult<T> = std::result::Result<T, BridgeError>;

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("{0}")]
    Host(#[from] HostError),

    #[error("{0}")]
    Discovery(#[from] DiscoveryError),

    #[error("{0}")]
    Connection(#[from] ConnectionError),

    #[error("{0}")]
    Registry(#[from] RegistryError),
}

/// Failures talking to the host process.
#[derive(Debug, Error)]
pub enum HostError {
    #[error("Failed to connect to host at {address}: {source}")]
    Connect {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Host did not become ready within {0:?}")]
    Unavailable(Duration),

    #[error("Host closed the connection before it became ready")]
    ClosedBeforeReady,

    #[error("Host connection closed")]
    Closed,

    #[error("Host error [{code}]: {message}")]
    Rpc { code: i32, message: String },

    #[error("Host protocol error: {0}")]
    Protocol(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("Language discovery failed: {0}")]
    Languages(#[source] HostError),

    #[error("Endpoint port discovery failed: {0}")]
    Port(#[source] HostError),

    #[error("Discovery did not complete within {0:?}")]
    Timeout(Duration),
}

/// Failures scoped to one language's connection.
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("Invalid endpoint '{0}'")]
    InvalidEndpoint(String),

    /// The socket failed, either during the handshake or after it
    #[error("{language} connection failed: {message}")]
    Failed { language: String, message: String },

    #[error("{language} connection closed")]
    Closed { language: String },

    #[error("{language} client is already attached to its socket")]
    AlreadyAttached { language: String },

    #[error("{language} server error [{code}]: {message}")]
    Server {
        language: String,
        code: i32,
        message: String,
    },

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl ConnectionError {
    /// Language whose connection failed, when known
    pub fn affected_language(&self) -> Option<&str> {
        match self {
            Self::Failed { language, .. }
            | Self::Closed { language }
            | Self::AlreadyAttached { language }
            | Self::Server { language, .. } => Some(language),
            Self::InvalidEndpoint(_) | Self::Json(_) => None,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Language provider has already been published")]
    AlreadyPublished,

    #[error("Language provider was not published within {0:?}")]
    Timeout(Duration),
}

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("No language server connection matches mode '{0}'")]
    NoConnection(String),

    #[error("Capability '{0}' is disabled")]
    CapabilityDisabled(&'static str),

    #[error("{0}")]
    Connection(#[from] ConnectionError),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config parse error: {0}")]
    Parse(String),

    #[error("Invalid value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
