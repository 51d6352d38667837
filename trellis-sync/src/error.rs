//! Error types for trellis-sync.
//!
//! Only run-aborting conditions are errors. Per-file failures are captured as
//! [`crate::report::FileFailure`] records and never surface here.

use std::path::PathBuf;

use thiserror::Error;

use trellis_core::{ConfigError, DestinationPath};

/// All errors that can abort a sync run.
#[derive(Debug, Error)]
pub enum SyncError {
    /// An error from configuration loading.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// The template source root cannot be enumerated.
    #[error("template source {path} is unreadable: {source}")]
    SourceRoot {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Two template files map to the same destination.
    #[error("templates '{first}' and '{second}' both map to '{destination}'")]
    DestinationCollision {
        destination: DestinationPath,
        first: String,
        second: String,
    },

    /// A template maps onto the engine's state directory, a conflict sibling
    /// or a staging file name.
    #[error("template '{template}' maps to reserved destination '{destination}'")]
    ReservedDestination {
        destination: DestinationPath,
        template: String,
    },

    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON serialization error (manifest).
    #[error("manifest JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience constructor for [`SyncError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> SyncError {
    SyncError::Io {
        path: path.into(),
        source,
    }
}
