//! Synchronization between the on-disk stack catalog and an OCI registry.
//!
//! At startup the registry is awaited, the index is loaded, and every stack's
//! `devfile.yaml` is pushed. Only after all of that succeeds is a
//! [`PublishedCatalog`] handed out, from which stacks are pulled back on
//! demand.

pub mod catalog;
pub mod config;
pub mod error;
pub mod gate;
pub mod pull;
pub mod push;
pub mod reference;
pub mod startup;
pub mod types;

pub use catalog::{sniff_content_type, Catalog, PublishedCatalog};
pub use config::RegistryConfig;
pub use error::{SyncError, SyncResult};
pub use gate::{HealthProbe, HttpProbe, ReadinessGate};
pub use pull::PullResolver;
pub use push::PushSynchronizer;
pub use reference::ReferenceBuilder;
pub use startup::{Startup, StartupFailure, StartupOutcome, StartupStage};
pub use types::{PublishedStack, ResolvedStack, SyncReport};
