//! Error types for the index crate.

use std::path::PathBuf;

/// Errors that can occur while loading the registry index.
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    /// The index file could not be read.
    #[error("failed to read index file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The index file is not a JSON array of stack entries.
    #[error("failed to parse index: {0}")]
    Parse(#[from] serde_json::Error),

    /// An entry has an empty `name`.
    #[error("index entry #{position} has an empty name")]
    EmptyName { position: usize },

    /// Two entries share the same `name`.
    #[error("duplicate stack name in index: {0}")]
    DuplicateName(String),

    /// An entry has no usable `links.self` reference path.
    #[error("stack {0} has no links.self reference")]
    MissingSelfLink(String),
}

/// Convenience alias for index results.
pub type IndexResult<T> = Result<T, IndexError>;
