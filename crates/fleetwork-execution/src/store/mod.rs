//! Storage layer for Works and clusters
//!
//! Provides the control-plane reads and conditional writes the execution
//! layer relies on.

mod memory;
mod traits;

pub use memory::{InMemoryClusterStore, InMemoryWorkStore, WorkWatchEvent};
pub use traits::{ClusterStore, StoreError, StoreResult, WorkStore};
