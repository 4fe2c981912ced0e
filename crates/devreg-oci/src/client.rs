//! OCI distribution client over HTTP.
//!
//! Push uploads every blob monolithically (`POST` an upload session, then
//! `PUT` the bytes with `?digest=`), skipping blobs the registry already has,
//! and finishes by putting the manifest under the tag. Pull fetches the
//! manifest, then each allowed layer, verifying every digest locally.

use std::time::Duration;

use async_trait::async_trait;
use devreg_types::{media_types, ArtifactReference, Digest, ReferenceTarget};
use reqwest::header::{ACCEPT, CONTENT_TYPE, LOCATION};
use reqwest::{Response, StatusCode};
use url::Url;

use crate::error::{OciError, OciResult};
use crate::manifest::{layer_payload, Manifest, PreparedArtifact, PushRequest, DOCKER_MANIFEST_V2};
use crate::transport::{validate_reference, ContentSet, PullOptions, PulledArtifact, RegistryTransport};

const MAX_ERROR_BODY: usize = 512;

/// Connection settings for [`HttpRegistryClient`].
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Talk `http://` instead of `https://`.
    pub plain_http: bool,
    /// Deadline for each individual registry request.
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            plain_http: true,
            request_timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(5),
        }
    }
}

/// Registry transport speaking the OCI distribution API.
#[derive(Clone, Debug)]
pub struct HttpRegistryClient {
    http: reqwest::Client,
    scheme: &'static str,
}

impl HttpRegistryClient {
    pub fn new(config: &ClientConfig) -> OciResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .user_agent(concat!("devreg/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            http,
            scheme: if config.plain_http { "http" } else { "https" },
        })
    }

    /// `GET {scheme}://{host}/` and return the status code.
    ///
    /// Transport failures (refused connection, DNS) are errors; any HTTP
    /// answer, healthy or not, is a status.
    pub async fn probe(&self, host: &str) -> OciResult<StatusCode> {
        let url = format!("{}://{}", self.scheme, host.trim_end_matches('/'));
        let response = self.http.get(&url).send().await?;
        Ok(response.status())
    }

    fn base_url(&self, reference: &ArtifactReference) -> String {
        format!("{}://{}/v2/{}", self.scheme, reference.registry(), reference.repository())
    }

    async fn blob_exists(&self, base: &str, digest: &Digest) -> OciResult<bool> {
        let url = format!("{base}/blobs/{digest}");
        let response = self.http.head(&url).send().await?;
        match response.status() {
            status if status.is_success() => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            _ => Err(unexpected("HEAD", &url, response).await),
        }
    }

    async fn upload_blob(&self, base: &str, digest: &Digest, data: &[u8]) -> OciResult<()> {
        if self.blob_exists(base, digest).await? {
            tracing::debug!(%digest, "blob already present, skipping upload");
            return Ok(());
        }

        let start_url = format!("{base}/blobs/uploads/");
        let response = self.http.post(&start_url).send().await?;
        if response.status() != StatusCode::ACCEPTED {
            return Err(unexpected("POST", &start_url, response).await);
        }
        let location = response
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| OciError::InvalidLocation("missing Location header".into()))?;
        let mut upload_url = resolve_location(&start_url, location)?;
        upload_url
            .query_pairs_mut()
            .append_pair("digest", &digest.to_string());

        let response = self
            .http
            .put(upload_url.clone())
            .header(CONTENT_TYPE, media_types::OCTET_STREAM)
            .body(data.to_vec())
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(unexpected("PUT", upload_url.as_str(), response).await);
        }
        tracing::debug!(%digest, size = data.len(), "uploaded blob");
        Ok(())
    }

    async fn fetch_blob(&self, base: &str, reference: &ArtifactReference, digest: &Digest) -> OciResult<Vec<u8>> {
        let url = format!("{base}/blobs/{digest}");
        let response = self.http.get(&url).send().await?;
        match response.status() {
            status if status.is_success() => Ok(response.bytes().await?.to_vec()),
            StatusCode::NOT_FOUND => Err(OciError::BlobNotFound {
                repository: reference.repository().to_string(),
                digest: digest.clone(),
            }),
            _ => Err(unexpected("GET", &url, response).await),
        }
    }
}

#[async_trait]
impl RegistryTransport for HttpRegistryClient {
    async fn push(&self, reference: &ArtifactReference, request: &PushRequest) -> OciResult<Digest> {
        validate_reference(reference)?;
        let ReferenceTarget::Tag(tag) = reference.target() else {
            return Err(OciError::InvalidReference {
                reference: reference.to_string(),
                reason: "cannot push to a digest reference".into(),
            });
        };
        let prepared = PreparedArtifact::build(request)?;
        let base = self.base_url(reference);

        for (digest, data) in &prepared.blobs {
            self.upload_blob(&base, digest, data).await?;
        }

        let url = format!("{base}/manifests/{tag}");
        let response = self
            .http
            .put(&url)
            .header(CONTENT_TYPE, media_types::OCI_MANIFEST)
            .body(prepared.manifest_bytes.clone())
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(unexpected("PUT", &url, response).await);
        }
        Ok(prepared.manifest_digest)
    }

    async fn pull(&self, reference: &ArtifactReference, options: &PullOptions) -> OciResult<PulledArtifact> {
        validate_reference(reference)?;
        let base = self.base_url(reference);
        let target = reference.target();

        let url = format!("{base}/manifests/{}", target.as_str());
        let response = self
            .http
            .get(&url)
            .header(ACCEPT, format!("{}, {}", media_types::OCI_MANIFEST, DOCKER_MANIFEST_V2))
            .send()
            .await?;
        match response.status() {
            status if status.is_success() => {}
            StatusCode::NOT_FOUND => return Err(OciError::ManifestNotFound(reference.to_string())),
            _ => return Err(unexpected("GET", &url, response).await),
        }
        let manifest_bytes = response.bytes().await?;
        let manifest_digest = Digest::sha256(&manifest_bytes);
        if let ReferenceTarget::Digest(expected) = target {
            let expected: Digest = expected.parse()?;
            if expected != manifest_digest {
                return Err(OciError::DigestMismatch {
                    expected,
                    computed: manifest_digest,
                });
            }
        }
        let manifest = Manifest::from_slice(&manifest_bytes)?;

        let mut contents = ContentSet::default();
        for layer in manifest.allowed_layers(&options.allowed_media_types) {
            let data = self.fetch_blob(&base, reference, &layer.digest).await?;
            if let Some(payload) = layer_payload(layer, data)? {
                contents.push(payload);
            }
        }

        Ok(PulledArtifact {
            manifest_digest,
            config_media_type: manifest.config.media_type,
            contents,
        })
    }
}

/// Upload locations may be absolute or relative to the registry.
fn resolve_location(request_url: &str, location: &str) -> OciResult<Url> {
    let base = Url::parse(request_url).map_err(|e| OciError::InvalidLocation(e.to_string()))?;
    base.join(location)
        .map_err(|e| OciError::InvalidLocation(format!("{location}: {e}")))
}

async fn unexpected(method: &'static str, url: &str, response: Response) -> OciError {
    let status = response.status().as_u16();
    let mut body = response.text().await.unwrap_or_default();
    if body.len() > MAX_ERROR_BODY {
        let mut cut = MAX_ERROR_BODY;
        while !body.is_char_boundary(cut) {
            cut -= 1;
        }
        body.truncate(cut);
    }
    OciError::UnexpectedStatus {
        method,
        url: url.to_string(),
        status,
        body,
    }
}
