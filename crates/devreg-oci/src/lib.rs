//! OCI distribution plumbing for the devfile registry.
//!
//! Stacks are stored as single-layer OCI artifacts. This crate knows how to
//! assemble such an artifact ([`PreparedArtifact`]), move it to and from a
//! registry ([`RegistryTransport`]), and verify everything it fetches against
//! the digests the manifest advertises.
//!
//! # Transports
//!
//! - [`HttpRegistryClient`] -- the OCI distribution API over HTTP(S)
//! - [`InMemoryTransport`] -- `HashMap`-based registry for tests and embedding
//!
//! With the `testkit` feature, [`testkit::TestRegistry`] runs a small OCI
//! registry in-process for end-to-end tests.

pub mod client;
pub mod error;
pub mod manifest;
pub mod memory;
pub mod transport;

#[cfg(any(test, feature = "testkit"))]
pub mod testkit;

pub use client::{ClientConfig, HttpRegistryClient};
pub use error::{OciError, OciResult};
pub use manifest::{Descriptor, Manifest, PreparedArtifact, PushRequest, ANNOTATION_TITLE};
pub use memory::InMemoryTransport;
pub use transport::{validate_reference, ContentSet, PullOptions, PulledArtifact, RegistryTransport};
