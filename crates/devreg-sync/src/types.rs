use devreg_types::{ArtifactReference, Digest};

/// One stack published during startup.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PublishedStack {
    pub name: String,
    pub reference: ArtifactReference,
    pub digest: Digest,
}

/// Everything a startup synchronization pushed, in index order.
#[derive(Clone, Debug, Default)]
pub struct SyncReport {
    pub published: Vec<PublishedStack>,
}

impl SyncReport {
    pub fn len(&self) -> usize {
        self.published.len()
    }

    pub fn is_empty(&self) -> bool {
        self.published.is_empty()
    }
}

/// Stack bytes ready to hand to a client.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedStack {
    pub data: Vec<u8>,
    pub content_type: &'static str,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sync_report_defaults() {
        let r = SyncReport::default();
        assert!(r.is_empty());
        assert_eq!(r.len(), 0);
    }
}
