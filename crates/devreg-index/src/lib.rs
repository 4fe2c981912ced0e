//! Registry index for the devfile registry.
//!
//! The index is a JSON array of stack entries read once at startup. It is
//! turned into an [`IndexSnapshot`]: an immutable catalog shared by every
//! request handler behind an `Arc`, so lookups never take a lock.

pub mod error;
pub mod snapshot;

pub use error::{IndexError, IndexResult};
pub use snapshot::IndexSnapshot;
