use std::sync::Arc;

use devreg_index::IndexSnapshot;

use crate::error::{SyncError, SyncResult};
use crate::pull::PullResolver;
use crate::types::{ResolvedStack, SyncReport};

/// Name-based lookup over the index, backed by the registry.
#[derive(Clone)]
pub struct Catalog {
    index: Arc<IndexSnapshot>,
    resolver: Arc<PullResolver>,
}

impl Catalog {
    pub fn new(index: Arc<IndexSnapshot>, resolver: Arc<PullResolver>) -> Self {
        Self { index, resolver }
    }

    pub fn index(&self) -> &Arc<IndexSnapshot> {
        &self.index
    }

    /// Pull the stack called `name` and sniff its content type.
    pub async fn resolve(&self, name: &str) -> SyncResult<ResolvedStack> {
        let descriptor = self
            .index
            .get(name)
            .ok_or_else(|| SyncError::NotFound(format!("stack {name}")))?;
        let data = self.resolver.pull_bundle(descriptor).await?;
        let content_type = sniff_content_type(&data);
        Ok(ResolvedStack { data, content_type })
    }
}

impl std::fmt::Debug for Catalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Catalog").field("index", &self.index).finish()
    }
}

/// A catalog whose every stack has been pushed.
///
/// Only a successful [`Startup`](crate::Startup) produces one, and the
/// request façade can only be built from one. No request can therefore reach
/// the registry before synchronization has finished.
#[derive(Debug)]
pub struct PublishedCatalog {
    catalog: Catalog,
    report: SyncReport,
}

impl PublishedCatalog {
    pub(crate) fn new(catalog: Catalog, report: SyncReport) -> Self {
        Self { catalog, report }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn report(&self) -> &SyncReport {
        &self.report
    }

    pub fn into_parts(self) -> (Catalog, SyncReport) {
        (self.catalog, self.report)
    }
}

/// Bytes past this point never affect the sniffed type.
const SNIFF_LEN: usize = 512;

/// Plain text unless the first 512 bytes contain a binary control byte.
///
/// Tab, newline, form feed, carriage return and escape count as text, as do
/// DEL and bytes above 0x7f. Invalid UTF-8 alone does not make data binary.
pub fn sniff_content_type(data: &[u8]) -> &'static str {
    let window = &data[..data.len().min(SNIFF_LEN)];
    let is_text = !window.iter().any(|&b| is_binary_byte(b));
    if is_text {
        "text/plain; charset=utf-8"
    } else {
        "application/octet-stream"
    }
}

fn is_binary_byte(b: u8) -> bool {
    matches!(b, 0x00..=0x08 | 0x0b | 0x0e..=0x1a | 0x1c..=0x1f)
}
