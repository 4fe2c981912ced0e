use std::path::PathBuf;
use std::time::Duration;

use devreg_oci::OciError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to push devfile.yaml to {reference}: {source}")]
    Push {
        reference: String,
        #[source]
        source: OciError,
    },

    #[error("not found: {0}")]
    NotFound(String),

    #[error("integrity error for {reference}: {reason}")]
    Integrity { reference: String, reason: String },

    #[error("media type rejected for {reference}: expected {expected}, found {actual}")]
    MediaTypeRejected {
        reference: String,
        expected: String,
        actual: String,
    },

    #[error("failed to pull devfile.yaml from {reference}: {source}")]
    Pull {
        reference: String,
        #[source]
        source: OciError,
    },

    #[error("pull of {reference} timed out after {after:?}")]
    Timeout { reference: String, after: Duration },

    #[error("registry at {endpoint} is unreachable: {source}")]
    Transport {
        endpoint: String,
        #[source]
        source: OciError,
    },

    #[error("registry client error: {0}")]
    Client(#[source] OciError),

    #[error("index error: {0}")]
    Index(#[from] devreg_index::IndexError),
}

impl SyncError {
    /// Whether the lookup target simply does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

pub type SyncResult<T> = Result<T, SyncError>;
