//! HTTP façade for the devfile registry.
//!
//! Serves stacks out of the OCI registry by name, plus the raw index and a
//! health check. The router can only be built from a
//! [`PublishedCatalog`](devreg_sync::PublishedCatalog), which makes serving
//! before synchronization impossible.

pub mod config;
pub mod error;
pub mod handler;
pub mod router;
pub mod server;

pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use handler::{AppState, HealthResponse};
pub use router::build_router;
pub use server::DevregServer;
