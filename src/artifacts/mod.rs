//! Transient artifact storage
//!
//! Every transform writes exactly one artifact into the storage directory.
//! Artifacts live until the sweeper removes them once they outlive the
//! retention window; downloading does not delete them.

pub mod store;
pub mod types;

pub use store::ArtifactStore;
pub use types::*;
