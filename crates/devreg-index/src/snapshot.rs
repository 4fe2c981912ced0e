use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use bytes::Bytes;
use devreg_types::BundleDescriptor;

use crate::error::{IndexError, IndexResult};

/// Immutable, ordered catalog of stack descriptors.
///
/// Entries keep the order of the index file. The raw file bytes are kept as
/// well so the catalog can be served back exactly as loaded.
pub struct IndexSnapshot {
    entries: Vec<BundleDescriptor>,
    by_name: HashMap<String, usize>,
    raw: Bytes,
}

impl IndexSnapshot {
    /// Read and validate the index file at `path`.
    pub async fn load(path: &Path) -> IndexResult<Self> {
        let raw = tokio::fs::read(path).await.map_err(|source| IndexError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let snapshot = Self::from_json(raw)?;
        tracing::info!(path = %path.display(), stacks = snapshot.len(), "loaded registry index");
        Ok(snapshot)
    }

    /// Parse and validate index JSON.
    ///
    /// Every entry needs a non-empty, unique `name` and a non-empty
    /// `links.self`.
    pub fn from_json(raw: impl Into<Bytes>) -> IndexResult<Self> {
        let raw = raw.into();
        let entries: Vec<BundleDescriptor> = serde_json::from_slice(&raw)?;

        let mut by_name = HashMap::with_capacity(entries.len());
        for (position, entry) in entries.iter().enumerate() {
            if entry.name.trim().is_empty() {
                return Err(IndexError::EmptyName { position });
            }
            if entry.self_link().map_or(true, |link| link.trim_matches('/').is_empty()) {
                return Err(IndexError::MissingSelfLink(entry.name.clone()));
            }
            if by_name.insert(entry.name.clone(), position).is_some() {
                return Err(IndexError::DuplicateName(entry.name.clone()));
            }
        }

        Ok(Self { entries, by_name, raw })
    }

    /// Wrap in an `Arc` for sharing across request handlers.
    pub fn into_shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// Look up a stack by name.
    pub fn get(&self, name: &str) -> Option<&BundleDescriptor> {
        self.by_name.get(name).map(|&i| &self.entries[i])
    }

    /// Entries in index order.
    pub fn iter(&self) -> impl Iterator<Item = &BundleDescriptor> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Index file bytes exactly as loaded.
    pub fn raw_json(&self) -> Bytes {
        self.raw.clone()
    }
}

impl std::fmt::Debug for IndexSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexSnapshot")
            .field("stacks", &self.entries.len())
            .field("raw_bytes", &self.raw.len())
            .finish()
    }
}
