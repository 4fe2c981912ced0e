//! Foundation types for the devfile registry.
//!
//! Every other devreg crate depends on `devreg-types`. The types here are
//! plain data: no I/O, no network, no clocks.
//!
//! # Key Types
//!
//! - [`BundleDescriptor`] -- one stack entry from the registry index
//! - [`ArtifactReference`] -- registry-addressable key (`host/path[:tag]`)
//! - [`ArtifactPayload`] -- bytes of a stack file tagged with its media type
//! - [`Digest`] -- `sha256:` content digest as used by OCI registries
//! - [`media_types`] -- the fixed devfile media type pair

pub mod descriptor;
pub mod digest;
pub mod error;
pub mod media;
pub mod payload;
pub mod reference;

pub use descriptor::{BundleDescriptor, DEVFILE_NAME};
pub use digest::Digest;
pub use error::TypeError;
pub use media::media_types;
pub use payload::ArtifactPayload;
pub use reference::{ArtifactReference, ReferenceTarget};
