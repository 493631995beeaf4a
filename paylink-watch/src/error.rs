//! Error types for the watcher.

use std::path::PathBuf;

use paylink::AmountError;
use paylink_svm::{RequestBuildError, WatchAddressError};

/// Configuration could not be resolved.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file exists but is unreadable.
    #[error("cannot read {}: {source}", path.display())]
    Read {
        /// File that failed.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The file is not valid configuration.
    #[error("invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// No recipient in the file, flags or environment.
    #[error("no recipient configured (set `recipient`, --recipient or PAYLINK_RECIPIENT)")]
    MissingRecipient,
}

/// Errors that stop the watcher before polling starts.
#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    /// See [`ConfigError`].
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The amount argument is not a valid decimal.
    #[error("invalid amount: {0}")]
    Amount(#[from] AmountError),

    /// The request could not be built.
    #[error(transparent)]
    Request(#[from] RequestBuildError),

    /// No address to watch for the request.
    #[error(transparent)]
    Address(#[from] WatchAddressError),

    /// Signal registration or terminal output failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
