use std::sync::Arc;
use std::time::Duration;

use devreg_oci::{OciError, PullOptions, RegistryTransport};
use devreg_types::{media_types, ArtifactReference, BundleDescriptor, DEVFILE_NAME};

use crate::error::{SyncError, SyncResult};
use crate::reference::ReferenceBuilder;

/// Fetches stack content back out of the registry on demand.
///
/// Holds no mutable state, so one resolver serves all concurrent requests.
/// Every pull runs under a deadline. Dropping the returned future (a client
/// hanging up, say) abandons the registry calls in flight.
pub struct PullResolver {
    transport: Arc<dyn RegistryTransport>,
    references: ReferenceBuilder,
    deadline: Duration,
}

impl PullResolver {
    pub fn new(transport: Arc<dyn RegistryTransport>, references: ReferenceBuilder, deadline: Duration) -> Self {
        Self {
            transport,
            references,
            deadline,
        }
    }

    /// Pull `devfile.yaml` for `descriptor` and return its bytes.
    pub async fn pull_bundle(&self, descriptor: &BundleDescriptor) -> SyncResult<Vec<u8>> {
        let reference = self.references.build(descriptor);
        match tokio::time::timeout(self.deadline, self.fetch(&reference)).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(%reference, deadline = ?self.deadline, "pull timed out");
                Err(SyncError::Timeout {
                    reference: reference.to_string(),
                    after: self.deadline,
                })
            }
        }
    }

    async fn fetch(&self, reference: &ArtifactReference) -> SyncResult<Vec<u8>> {
        tracing::info!(%reference, "pulling devfile.yaml");
        let pulled = self
            .transport
            .pull(reference, &PullOptions::allow(media_types::DEVFILE_LAYER))
            .await
            .map_err(|e| classify(reference, e))?;

        if pulled.config_media_type != media_types::DEVFILE_CONFIG {
            tracing::warn!(%reference, config = %pulled.config_media_type, "artifact is not a devfile stack");
            return Err(SyncError::MediaTypeRejected {
                reference: reference.to_string(),
                expected: media_types::DEVFILE_CONFIG.to_string(),
                actual: pulled.config_media_type,
            });
        }

        let mut contents = pulled.contents;
        let Some(devfile) = contents.take_by_name(DEVFILE_NAME) else {
            tracing::error!(
                %reference,
                digest = %pulled.manifest_digest,
                "registry returned a manifest without devfile.yaml"
            );
            return Err(SyncError::Integrity {
                reference: reference.to_string(),
                reason: format!("pulled artifact does not contain {DEVFILE_NAME}"),
            });
        };

        tracing::info!(%reference, digest = %pulled.manifest_digest, "pulled stack");
        Ok(devfile.data)
    }
}

fn classify(reference: &ArtifactReference, err: OciError) -> SyncError {
    if err.is_not_found() {
        return SyncError::NotFound(reference.to_string());
    }
    if err.is_integrity() {
        tracing::error!(%reference, "registry content is inconsistent: {err}");
        return SyncError::Integrity {
            reference: reference.to_string(),
            reason: err.to_string(),
        };
    }
    SyncError::Pull {
        reference: reference.to_string(),
        source: err,
    }
}
