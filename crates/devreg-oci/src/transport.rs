use async_trait::async_trait;
use devreg_types::{ArtifactPayload, ArtifactReference, Digest, ReferenceTarget};

use crate::error::{OciError, OciResult};
use crate::manifest::PushRequest;

/// Pull-side filter: only layers of these media types are fetched.
#[derive(Clone, Debug, Default)]
pub struct PullOptions {
    pub allowed_media_types: Vec<String>,
}

impl PullOptions {
    pub fn allow(media_type: impl Into<String>) -> Self {
        Self {
            allowed_media_types: vec![media_type.into()],
        }
    }
}

/// Named files retrieved by a pull.
#[derive(Clone, Debug, Default)]
pub struct ContentSet {
    entries: Vec<ArtifactPayload>,
}

impl ContentSet {
    pub fn push(&mut self, payload: ArtifactPayload) {
        self.entries.push(payload);
    }

    pub fn get_by_name(&self, name: &str) -> Option<&ArtifactPayload> {
        self.entries.iter().find(|p| p.name == name)
    }

    pub fn take_by_name(&mut self, name: &str) -> Option<ArtifactPayload> {
        let position = self.entries.iter().position(|p| p.name == name)?;
        Some(self.entries.swap_remove(position))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Result of a successful pull.
#[derive(Clone, Debug)]
pub struct PulledArtifact {
    pub manifest_digest: Digest,
    pub config_media_type: String,
    pub contents: ContentSet,
}

/// Transport interface for an OCI registry.
///
/// Implementations are stateless per call: a push or pull carries everything
/// it needs, so one transport can serve concurrent callers.
#[async_trait]
pub trait RegistryTransport: Send + Sync {
    /// Store an artifact under `reference` and return its manifest digest.
    /// The last push to a reference wins.
    async fn push(&self, reference: &ArtifactReference, request: &PushRequest) -> OciResult<Digest>;

    /// Fetch the artifact under `reference`, keeping only allowed layers.
    async fn pull(&self, reference: &ArtifactReference, options: &PullOptions) -> OciResult<PulledArtifact>;
}

/// Check that a reference names a valid repository and tag or digest.
pub fn validate_reference(reference: &ArtifactReference) -> OciResult<()> {
    let invalid = |reason: String| OciError::InvalidReference {
        reference: reference.to_string(),
        reason,
    };

    if reference.registry().is_empty() {
        return Err(invalid("missing registry host".into()));
    }
    let repository = reference.repository();
    if repository.is_empty() {
        return Err(invalid("missing repository path".into()));
    }
    for component in repository.split('/') {
        let valid_chars = component
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '.' | '_' | '-'));
        let alnum_edges = component.starts_with(|c: char| c.is_ascii_alphanumeric())
            && component.ends_with(|c: char| c.is_ascii_alphanumeric());
        if !valid_chars || !alnum_edges {
            return Err(invalid(format!("invalid repository component {component:?}")));
        }
    }

    match reference.target() {
        ReferenceTarget::Tag(tag) => {
            let valid = !tag.is_empty()
                && tag.len() <= 128
                && !tag.starts_with(['.', '-'])
                && tag.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'));
            if !valid {
                return Err(invalid(format!("invalid tag {tag:?}")));
            }
        }
        ReferenceTarget::Digest(digest) => {
            digest.parse::<Digest>()?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference(path: &str) -> ArtifactReference {
        ArtifactReference::new("localhost:5000", path)
    }

    #[test]
    fn accepts_catalog_references() {
        assert!(validate_reference(&reference("go")).is_ok());
        assert!(validate_reference(&reference("devfile-catalog/java-maven:1.1.0")).is_ok());
        assert!(validate_reference(&reference("stacks/node_js")).is_ok());
        let digest = Digest::sha256(b"m");
        assert!(validate_reference(&reference(&format!("go@{digest}"))).is_ok());
    }

    #[test]
    fn rejects_bad_references() {
        assert!(validate_reference(&reference("")).is_err());
        assert!(validate_reference(&reference("Go")).is_err());
        assert!(validate_reference(&reference("go-")).is_err());
        assert!(validate_reference(&reference("go:")).is_err());
        assert!(validate_reference(&reference("go:.hidden")).is_err());
        assert!(validate_reference(&reference("go@sha256:short")).is_err());
    }

    #[test]
    fn content_set_lookup() {
        let mut set = ContentSet::default();
        set.push(ArtifactPayload::devfile(b"a".to_vec()));
        assert_eq!(set.len(), 1);
        assert!(set.get_by_name("devfile.yaml").is_some());
        assert!(set.get_by_name("other").is_none());
        let taken = set.take_by_name("devfile.yaml").unwrap();
        assert_eq!(taken.data, b"a");
        assert!(set.is_empty());
    }
}
