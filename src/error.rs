//! Error type shared by all store backends.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failure of a single store operation.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("cannot access {}: {source}", path.display())]
    Access {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{0} already exists in store")]
    AlreadyExists(String),

    #[error("{0} not found in store")]
    NotFound(String),

    #[error("{} differs from {}; refusing to remove", stored.display(), reference.display())]
    Mismatch { stored: PathBuf, reference: PathBuf },

    #[error("{tool}: {detail}")]
    Tool { tool: String, detail: String },
}

impl StoreError {
    pub fn access(path: impl Into<PathBuf>, source: io::Error) -> Self {
        StoreError::Access {
            path: path.into(),
            source,
        }
    }

    pub fn tool(tool: impl Into<String>, detail: impl Into<String>) -> Self {
        StoreError::Tool {
            tool: tool.into(),
            detail: detail.into(),
        }
    }
}

pub type Result<T, E = StoreError> = std::result::Result<T, E>;
