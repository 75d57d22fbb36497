//! Error types shared by the engine and the launcher.

use std::io;
use std::path::PathBuf;

/// Errors raised while loading or validating configuration.
#[derive(Debug)]
pub enum ConfigError {
    /// The config file could not be read
    Read { path: PathBuf, source: io::Error },
    /// The config file is not a well-formed JSON object of the expected shape
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    /// A value is structurally fine but semantically out of range
    Invalid(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Read { path, source } => {
                write!(f, "Failed to read config file {}: {}", path.display(), source)
            }
            Self::Parse { path, source } => {
                write!(f, "Invalid JSON config {}: {}", path.display(), source)
            }
            Self::Invalid(e) => write!(f, "Invalid configuration: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Read { source, .. } => Some(source),
            Self::Parse { source, .. } => Some(source),
            Self::Invalid(_) => None,
        }
    }
}

/// Errors raised while pushing records to the connected peer.
#[derive(Debug)]
pub enum DeliveryError {
    /// Writing or flushing the transport failed; the session cannot continue
    Transport(io::Error),
    /// A record could not be serialized
    Encode(serde_json::Error),
}

impl std::fmt::Display for DeliveryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Transport(e) => write!(f, "Transport write failed: {}", e),
            Self::Encode(e) => write!(f, "Record encoding failed: {}", e),
        }
    }
}

impl std::error::Error for DeliveryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Transport(e) => Some(e),
            Self::Encode(e) => Some(e),
        }
    }
}

impl From<io::Error> for DeliveryError {
    fn from(e: io::Error) -> Self {
        Self::Transport(e)
    }
}

impl From<serde_json::Error> for DeliveryError {
    fn from(e: serde_json::Error) -> Self {
        Self::Encode(e)
    }
}
