//! OCI image manifest model and artifact assembly.
//!
//! A devfile artifact is one manifest with a `{}` config blob (typed with
//! the config envelope media type) and one layer per stack file. Layers carry
//! their file name in the `org.opencontainers.image.title` annotation, which
//! is how pulls find `devfile.yaml` again.

use std::collections::{BTreeMap, HashSet};

use devreg_types::{media_types, ArtifactPayload, Digest};
use serde::{Deserialize, Serialize};

use crate::error::{OciError, OciResult};

/// Annotation naming the file a layer was created from.
pub const ANNOTATION_TITLE: &str = "org.opencontainers.image.title";

/// Docker schema 2 manifests are accepted on pull; registries may convert.
pub const DOCKER_MANIFEST_V2: &str = "application/vnd.docker.distribution.manifest.v2+json";

/// Config blob pushed with every artifact.
pub const EMPTY_CONFIG: &[u8] = b"{}";

/// Content descriptor: a typed, sized pointer to a blob.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Descriptor {
    pub media_type: String,
    pub digest: Digest,
    pub size: u64,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
}

impl Descriptor {
    pub fn new(media_type: impl Into<String>, data: &[u8]) -> Self {
        Self {
            media_type: media_type.into(),
            digest: Digest::sha256(data),
            size: data.len() as u64,
            annotations: BTreeMap::new(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.annotations.insert(ANNOTATION_TITLE.to_string(), title.into());
        self
    }

    /// File name from the title annotation.
    pub fn title(&self) -> Option<&str> {
        self.annotations.get(ANNOTATION_TITLE).map(String::as_str)
    }
}

/// OCI image manifest (schema version 2).
///
/// Field order is fixed by the struct, so serializing the same manifest
/// twice yields the same bytes and the same digest.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    pub schema_version: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
    pub config: Descriptor,
    pub layers: Vec<Descriptor>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
}

impl Manifest {
    /// Decode manifest bytes fetched from a registry.
    pub fn from_slice(bytes: &[u8]) -> OciResult<Self> {
        let manifest: Self = serde_json::from_slice(bytes)?;
        if manifest.schema_version != 2 {
            return Err(OciError::UnsupportedManifest(format!(
                "schemaVersion {}",
                manifest.schema_version
            )));
        }
        match manifest.media_type.as_deref() {
            None | Some(media_types::OCI_MANIFEST) | Some(DOCKER_MANIFEST_V2) => Ok(manifest),
            Some(other) => Err(OciError::UnsupportedManifest(other.to_string())),
        }
    }

    /// Layers whose media type is in `allowed`. An empty allow-list admits
    /// every layer.
    pub fn allowed_layers<'a>(&'a self, allowed: &'a [String]) -> impl Iterator<Item = &'a Descriptor> + 'a {
        self.layers
            .iter()
            .filter(move |layer| allowed.is_empty() || allowed.iter().any(|m| *m == layer.media_type))
    }
}

/// What to push: the config envelope type and the files to store as layers.
#[derive(Clone, Debug)]
pub struct PushRequest {
    pub config_media_type: String,
    pub layers: Vec<ArtifactPayload>,
}

impl PushRequest {
    /// A single-file devfile artifact.
    pub fn devfile(content: Vec<u8>) -> Self {
        Self {
            config_media_type: media_types::DEVFILE_CONFIG.to_string(),
            layers: vec![ArtifactPayload::devfile(content)],
        }
    }
}

/// A push request turned into the exact blobs and manifest bytes to upload.
#[derive(Clone, Debug)]
pub struct PreparedArtifact {
    pub manifest: Manifest,
    pub manifest_bytes: Vec<u8>,
    pub manifest_digest: Digest,
    /// Config blob first, then layers in request order.
    pub blobs: Vec<(Digest, Vec<u8>)>,
}

impl PreparedArtifact {
    pub fn build(request: &PushRequest) -> OciResult<Self> {
        if request.layers.is_empty() {
            return Err(OciError::EmptyArtifact);
        }
        let mut seen = HashSet::new();
        for layer in &request.layers {
            if !seen.insert(layer.name.as_str()) {
                return Err(OciError::DuplicateLayer(layer.name.clone()));
            }
        }

        let config = Descriptor::new(&request.config_media_type, EMPTY_CONFIG);
        let mut blobs = vec![(config.digest.clone(), EMPTY_CONFIG.to_vec())];
        let mut layers = Vec::with_capacity(request.layers.len());
        for payload in &request.layers {
            let descriptor = Descriptor::new(&payload.media_type, &payload.data).with_title(&payload.name);
            blobs.push((descriptor.digest.clone(), payload.data.clone()));
            layers.push(descriptor);
        }

        let manifest = Manifest {
            schema_version: 2,
            media_type: Some(media_types::OCI_MANIFEST.to_string()),
            config,
            layers,
            annotations: BTreeMap::new(),
        };
        let manifest_bytes = serde_json::to_vec(&manifest)?;
        let manifest_digest = Digest::sha256(&manifest_bytes);
        Ok(Self {
            manifest,
            manifest_bytes,
            manifest_digest,
            blobs,
        })
    }
}

/// Turn a fetched layer blob into a payload, verifying its digest.
///
/// Returns `Ok(None)` for layers without a title: they cannot be looked up
/// by name.
pub(crate) fn layer_payload(layer: &Descriptor, data: Vec<u8>) -> OciResult<Option<ArtifactPayload>> {
    let computed = Digest::sha256(&data);
    if computed != layer.digest {
        return Err(OciError::DigestMismatch {
            expected: layer.digest.clone(),
            computed,
        });
    }
    Ok(layer
        .title()
        .map(|title| ArtifactPayload::new(title, layer.media_type.clone(), data)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prepared_devfile_artifact() {
        let prepared = PreparedArtifact::build(&PushRequest::devfile(b"schemaVersion: 2.0.0".to_vec())).unwrap();
        let m = &prepared.manifest;
        assert_eq!(m.schema_version, 2);
        assert_eq!(m.config.media_type, media_types::DEVFILE_CONFIG);
        assert_eq!(m.config.digest, Digest::sha256(b"{}"));
        assert_eq!(m.layers.len(), 1);
        assert_eq!(m.layers[0].media_type, media_types::DEVFILE_LAYER);
        assert_eq!(m.layers[0].title(), Some("devfile.yaml"));
        assert_eq!(m.layers[0].size, 20);
        assert_eq!(prepared.blobs.len(), 2);
        assert_eq!(prepared.manifest_digest, Digest::sha256(&prepared.manifest_bytes));
    }

    #[test]
    fn identical_content_identical_digest() {
        let a = PreparedArtifact::build(&PushRequest::devfile(b"x".to_vec())).unwrap();
        let b = PreparedArtifact::build(&PushRequest::devfile(b"x".to_vec())).unwrap();
        assert_eq!(a.manifest_bytes, b.manifest_bytes);
        assert_eq!(a.manifest_digest, b.manifest_digest);
        let c = PreparedArtifact::build(&PushRequest::devfile(b"y".to_vec())).unwrap();
        assert_ne!(a.manifest_digest, c.manifest_digest);
    }

    #[test]
    fn manifest_json_shape() {
        let prepared = PreparedArtifact::build(&PushRequest::devfile(b"x".to_vec())).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&prepared.manifest_bytes).unwrap();
        assert_eq!(value["schemaVersion"], 2);
        assert_eq!(value["mediaType"], media_types::OCI_MANIFEST);
        assert_eq!(value["layers"][0]["annotations"][ANNOTATION_TITLE], "devfile.yaml");
        assert!(value["layers"][0]["digest"].as_str().unwrap().starts_with("sha256:"));
        assert!(value.get("annotations").is_none());
    }

    #[test]
    fn rejects_empty_and_duplicate_layers() {
        let empty = PushRequest {
            config_media_type: media_types::DEVFILE_CONFIG.into(),
            layers: vec![],
        };
        assert!(matches!(PreparedArtifact::build(&empty), Err(OciError::EmptyArtifact)));

        let dup = PushRequest {
            config_media_type: media_types::DEVFILE_CONFIG.into(),
            layers: vec![ArtifactPayload::devfile(b"a".to_vec()), ArtifactPayload::devfile(b"b".to_vec())],
        };
        assert!(matches!(PreparedArtifact::build(&dup), Err(OciError::DuplicateLayer(_))));
    }

    #[test]
    fn allow_list_filters_layers() {
        let request = PushRequest {
            config_media_type: media_types::DEVFILE_CONFIG.into(),
            layers: vec![
                ArtifactPayload::devfile(b"a".to_vec()),
                ArtifactPayload::new("meta.yaml", "application/x-other", b"b".to_vec()),
            ],
        };
        let prepared = PreparedArtifact::build(&request).unwrap();
        let allowed = vec![media_types::DEVFILE_LAYER.to_string()];
        let titles: Vec<_> = prepared.manifest.allowed_layers(&allowed).filter_map(Descriptor::title).collect();
        assert_eq!(titles, vec!["devfile.yaml"]);
        assert_eq!(prepared.manifest.allowed_layers(&[]).count(), 2);
    }

    #[test]
    fn decode_rejects_unknown_manifest_types() {
        let prepared = PreparedArtifact::build(&PushRequest::devfile(b"x".to_vec())).unwrap();
        let mut m = prepared.manifest.clone();
        m.media_type = Some("application/vnd.oci.image.index.v1+json".into());
        let bytes = serde_json::to_vec(&m).unwrap();
        assert!(matches!(Manifest::from_slice(&bytes), Err(OciError::UnsupportedManifest(_))));

        let decoded = Manifest::from_slice(&prepared.manifest_bytes).unwrap();
        assert_eq!(decoded, prepared.manifest);
    }

    #[test]
    fn layer_payload_verifies_digest() {
        let layer = Descriptor::new(media_types::DEVFILE_LAYER, b"good").with_title("devfile.yaml");
        let payload = layer_payload(&layer, b"good".to_vec()).unwrap().unwrap();
        assert_eq!(payload.data, b"good");
        assert!(matches!(
            layer_payload(&layer, b"evil".to_vec()),
            Err(OciError::DigestMismatch { .. })
        ));

        let untitled = Descriptor::new(media_types::DEVFILE_LAYER, b"good");
        assert!(layer_payload(&untitled, b"good".to_vec()).unwrap().is_none());
    }
}
