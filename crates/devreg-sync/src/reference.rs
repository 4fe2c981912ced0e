use devreg_types::{ArtifactReference, BundleDescriptor};

/// Derives the registry reference of a stack from its `links.self` path.
#[derive(Clone, Debug)]
pub struct ReferenceBuilder {
    host: String,
}

impl ReferenceBuilder {
    pub fn new(host: impl Into<String>) -> Self {
        Self { host: host.into() }
    }

    /// `{host}/{links.self}`. A descriptor without a `self` link maps to the
    /// bare host, which no transport accepts.
    pub fn build(&self, descriptor: &BundleDescriptor) -> ArtifactReference {
        ArtifactReference::new(&self.host, descriptor.self_link().unwrap_or_default())
    }
}
