use std::path::PathBuf;
use std::sync::Arc;

use devreg_index::IndexSnapshot;
use devreg_oci::{PushRequest, RegistryTransport};
use devreg_types::{BundleDescriptor, Digest};

use crate::error::{SyncError, SyncResult};
use crate::reference::ReferenceBuilder;
use crate::types::{PublishedStack, SyncReport};

/// Publishes stacks from disk into the registry.
pub struct PushSynchronizer {
    transport: Arc<dyn RegistryTransport>,
    references: ReferenceBuilder,
    stacks_root: PathBuf,
}

impl PushSynchronizer {
    pub fn new(
        transport: Arc<dyn RegistryTransport>,
        references: ReferenceBuilder,
        stacks_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            transport,
            references,
            stacks_root: stacks_root.into(),
        }
    }

    /// Read `{stacks_root}/{name}/devfile.yaml` and push it under the stack's
    /// reference. Returns the manifest digest.
    pub async fn push_bundle(&self, descriptor: &BundleDescriptor) -> SyncResult<Digest> {
        let path = self.stacks_root.join(descriptor.source_path());
        let content = tokio::fs::read(&path)
            .await
            .map_err(|source| SyncError::Read { path, source })?;

        let reference = self.references.build(descriptor);
        tracing::info!(stack = %descriptor.name, %reference, "pushing devfile.yaml");
        let digest = self
            .transport
            .push(&reference, &PushRequest::devfile(content))
            .await
            .map_err(|source| SyncError::Push {
                reference: reference.to_string(),
                source,
            })?;
        tracing::info!(stack = %descriptor.name, %reference, %digest, "pushed stack");
        Ok(digest)
    }

    /// Push every stack in index order, one at a time, stopping at the first
    /// failure.
    pub async fn push_all(&self, index: &IndexSnapshot) -> SyncResult<SyncReport> {
        let mut report = SyncReport::default();
        for descriptor in index.iter() {
            let digest = self.push_bundle(descriptor).await?;
            report.published.push(PublishedStack {
                name: descriptor.name.clone(),
                reference: self.references.build(descriptor),
                digest,
            });
        }
        Ok(report)
    }
}
