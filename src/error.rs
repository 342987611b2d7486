//! Error types surfaced to the embedding host.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while adding handlers to a registry.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("handler exists: {name:?}")]
    HandlerExists { name: String },
    #[error("invalid handler name {name:?}: names must be non-empty and free of NUL")]
    InvalidName { name: String },
}

/// Errors raised by the control object lifecycle.
#[derive(Debug, Error)]
pub enum ControlError {
    #[error("already running on pid {pid}")]
    AlreadyRunning { pid: String },
    #[error("handlers cannot be registered while the listener is running")]
    Serving,
    #[error("control path {} exists and is not a socket", path.display())]
    NotSocket { path: PathBuf },
    #[error("failed to inspect control path {}: {source}", path.display())]
    Metadata {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to remove stale control socket {}: {source}", path.display())]
    Cleanup {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to listen on {}: {source}", path.display())]
    Bind {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

impl ControlError {
    /// Whether this error reports a live instance already serving the path.
    pub fn is_already_running(&self) -> bool {
        matches!(self, ControlError::AlreadyRunning { .. })
    }
}
