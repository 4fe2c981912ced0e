use devreg_types::{Digest, TypeError};
use thiserror::Error;

/// Errors from registry transport operations.
#[derive(Debug, Error)]
pub enum OciError {
    #[error("invalid reference {reference}: {reason}")]
    InvalidReference { reference: String, reason: String },

    #[error("manifest not found: {0}")]
    ManifestNotFound(String),

    #[error("blob {digest} not found in {repository}")]
    BlobNotFound { repository: String, digest: Digest },

    #[error("digest mismatch: expected {expected}, computed {computed}")]
    DigestMismatch { expected: Digest, computed: Digest },

    #[error("registry returned {status} for {method} {url}: {body}")]
    UnexpectedStatus {
        method: &'static str,
        url: String,
        status: u16,
        body: String,
    },

    #[error("unsupported manifest media type: {0}")]
    UnsupportedManifest(String),

    #[error("artifact has no layers")]
    EmptyArtifact,

    #[error("duplicate layer name in artifact: {0}")]
    DuplicateLayer(String),

    #[error("invalid upload location: {0}")]
    InvalidLocation(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid digest: {0}")]
    Digest(#[from] TypeError),
}

impl OciError {
    /// The registry has nothing under the reference.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::ManifestNotFound(_))
    }

    /// The registry answered, but what it served is inconsistent with the
    /// manifest it advertised.
    pub fn is_integrity(&self) -> bool {
        matches!(self, Self::BlobNotFound { .. } | Self::DigestMismatch { .. })
    }
}

pub type OciResult<T> = Result<T, OciError>;
