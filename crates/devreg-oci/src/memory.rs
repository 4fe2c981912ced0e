use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use devreg_types::{ArtifactReference, Digest, ReferenceTarget};

use crate::error::{OciError, OciResult};
use crate::manifest::{layer_payload, Manifest, PreparedArtifact, PushRequest};
use crate::transport::{validate_reference, ContentSet, PullOptions, PulledArtifact, RegistryTransport};

#[derive(Default)]
struct Contents {
    blobs: HashMap<Digest, Vec<u8>>,
    manifests: HashMap<Digest, Vec<u8>>,
    /// `registry/repository:tag` → manifest digest.
    tags: HashMap<String, Digest>,
}

/// In-memory registry transport.
///
/// Intended for tests and embedding. Pushes go through the same artifact
/// assembly as [`HttpRegistryClient`](crate::HttpRegistryClient), so
/// digests match what a real registry would report.
#[derive(Default)]
pub struct InMemoryTransport {
    contents: RwLock<Contents>,
}

impl InMemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored blobs, configs included.
    pub fn blob_count(&self) -> usize {
        self.contents.read().expect("lock poisoned").blobs.len()
    }

    /// Number of tags pointing at a manifest.
    pub fn tag_count(&self) -> usize {
        self.contents.read().expect("lock poisoned").tags.len()
    }

    /// Overwrite a stored blob, keeping its digest key.
    pub fn corrupt_blob(&self, digest: &Digest, data: Vec<u8>) -> bool {
        let mut contents = self.contents.write().expect("lock poisoned");
        match contents.blobs.get_mut(digest) {
            Some(blob) => {
                *blob = data;
                true
            }
            None => false,
        }
    }

    fn tag_key(reference: &ArtifactReference, tag: &str) -> String {
        format!("{}/{}:{tag}", reference.registry(), reference.repository())
    }
}

#[async_trait]
impl RegistryTransport for InMemoryTransport {
    async fn push(&self, reference: &ArtifactReference, request: &PushRequest) -> OciResult<Digest> {
        validate_reference(reference)?;
        let ReferenceTarget::Tag(tag) = reference.target() else {
            return Err(OciError::InvalidReference {
                reference: reference.to_string(),
                reason: "cannot push to a digest reference".into(),
            });
        };
        let prepared = PreparedArtifact::build(request)?;

        let mut contents = self.contents.write().expect("lock poisoned");
        for (digest, data) in prepared.blobs {
            contents.blobs.entry(digest).or_insert(data);
        }
        contents
            .manifests
            .insert(prepared.manifest_digest.clone(), prepared.manifest_bytes);
        contents
            .tags
            .insert(Self::tag_key(reference, tag), prepared.manifest_digest.clone());
        Ok(prepared.manifest_digest)
    }

    async fn pull(&self, reference: &ArtifactReference, options: &PullOptions) -> OciResult<PulledArtifact> {
        validate_reference(reference)?;
        let contents = self.contents.read().expect("lock poisoned");

        let manifest_digest = match reference.target() {
            ReferenceTarget::Tag(tag) => contents.tags.get(&Self::tag_key(reference, tag)).cloned(),
            ReferenceTarget::Digest(d) => Some(d.parse::<Digest>()?),
        }
        .ok_or_else(|| OciError::ManifestNotFound(reference.to_string()))?;
        let manifest_bytes = contents
            .manifests
            .get(&manifest_digest)
            .ok_or_else(|| OciError::ManifestNotFound(reference.to_string()))?;
        let manifest = Manifest::from_slice(manifest_bytes)?;

        let mut set = ContentSet::default();
        for layer in manifest.allowed_layers(&options.allowed_media_types) {
            let data = contents
                .blobs
                .get(&layer.digest)
                .cloned()
                .ok_or_else(|| OciError::BlobNotFound {
                    repository: reference.repository().to_string(),
                    digest: layer.digest.clone(),
                })?;
            if let Some(payload) = layer_payload(layer, data)? {
                set.push(payload);
            }
        }

        Ok(PulledArtifact {
            manifest_digest,
            config_media_type: manifest.config.media_type,
            contents: set,
        })
    }
}

impl std::fmt::Debug for InMemoryTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryTransport")
            .field("blob_count", &self.blob_count())
            .field("tag_count", &self.tag_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use devreg_types::media_types;

    fn reference(path: &str) -> ArtifactReference {
        ArtifactReference::new("localhost:5000", path)
    }

    #[tokio::test]
    async fn push_pull_roundtrip() {
        let transport = InMemoryTransport::new();
        let r = reference("go");
        let digest = transport.push(&r, &PushRequest::devfile(b"hello".to_vec())).await.unwrap();
        let pulled = transport
            .pull(&r, &PullOptions::allow(media_types::DEVFILE_LAYER))
            .await
            .unwrap();
        assert_eq!(pulled.manifest_digest, digest);
        assert_eq!(pulled.contents.get_by_name("devfile.yaml").unwrap().data, b"hello");
        assert_eq!(transport.blob_count(), 2);
    }

    #[tokio::test]
    async fn last_push_wins() {
        let transport = InMemoryTransport::new();
        let r = reference("go");
        transport.push(&r, &PushRequest::devfile(b"v1".to_vec())).await.unwrap();
        transport.push(&r, &PushRequest::devfile(b"v2".to_vec())).await.unwrap();
        let pulled = transport.pull(&r, &PullOptions::default()).await.unwrap();
        assert_eq!(pulled.contents.get_by_name("devfile.yaml").unwrap().data, b"v2");
        assert_eq!(transport.tag_count(), 1);
    }

    #[tokio::test]
    async fn missing_tag_is_not_found() {
        let transport = InMemoryTransport::new();
        let err = transport.pull(&reference("go"), &PullOptions::default()).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn tags_are_scoped_by_registry() {
        let transport = InMemoryTransport::new();
        transport
            .push(&reference("go"), &PushRequest::devfile(b"x".to_vec()))
            .await
            .unwrap();
        let elsewhere = ArtifactReference::new("other:5000", "go");
        assert!(transport.pull(&elsewhere, &PullOptions::default()).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn corrupted_blob_fails_integrity() {
        let transport = InMemoryTransport::new();
        let r = reference("go");
        transport.push(&r, &PushRequest::devfile(b"good".to_vec())).await.unwrap();
        assert!(transport.corrupt_blob(&Digest::sha256(b"good"), b"bad".to_vec()));
        let err = transport.pull(&r, &PullOptions::default()).await.unwrap_err();
        assert!(err.is_integrity());
    }
}
