// src/error.rs
use std::{io, path::PathBuf};

use thiserror::Error;

use crate::vault::VaultError;

/// Application level failures of the write/export paths.
///
/// The timer path never surfaces these; it folds every failure into
/// "no TTL available".
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed cluster definition or user input.
    #[error("{0}")]
    Validation(String),

    /// The caller's identity could not be established.
    #[error("{0}")]
    Identity(String),

    /// The secrets service rejected the request or could not be reached.
    #[error("{context}: {source}")]
    Vault {
        context: String,
        #[source]
        source: VaultError,
    },

    /// A secret was returned but its payload is unusable.
    #[error("{0}")]
    SecretData(String),

    /// Exchanging credentials for a console sign-in token failed.
    #[error("{context}: {source}")]
    Federation {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("{context}: {source}")]
    Yaml {
        context: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("{0}")]
    Config(String),

    #[error("{context} [{}]: {source}", .path.display())]
    Io {
        context: String,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl Error {
    pub fn vault(context: impl Into<String>, source: VaultError) -> Self {
        Error::Vault {
            context: context.into(),
            source,
        }
    }

    pub fn federation(
        context: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Error::Federation {
            context: context.into(),
            source: source.into(),
        }
    }

    pub fn io(context: impl Into<String>, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Error::Io {
            context: context.into(),
            path: path.into(),
            source,
        }
    }

    /// True for failures caused by an unreachable or slow secrets service.
    pub fn is_network(&self) -> bool {
        matches!(self, Error::Vault { source, .. } if source.is_network())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
