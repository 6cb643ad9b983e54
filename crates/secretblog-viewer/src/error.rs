//! Viewer error types.

use std::path::PathBuf;

use secretblog_core::LoadError;
use thiserror::Error;

/// Errors that stop the viewer.
#[derive(Debug, Error)]
pub enum ViewerError {
    /// Neither the link nor the session held a usable key.
    #[error("no usable key in link")]
    NoKey,

    /// The post body could not be fetched or did not authenticate.
    #[error("post unavailable: {0}")]
    Content(#[from] LoadError),

    /// Writing exported content failed.
    #[error("cannot write {}: {source}", path.display())]
    Write {
        /// File being written
        path: PathBuf,
        /// Underlying failure
        #[source]
        source: std::io::Error,
    },

    /// Map features could not be serialized for export.
    #[error("cannot encode export: {0}")]
    Encode(#[from] serde_json::Error),
}
