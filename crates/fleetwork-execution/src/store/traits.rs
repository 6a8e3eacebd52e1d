//! Storage trait definitions

use async_trait::async_trait;
use fleetwork_types::{Cluster, ClusterName, Work, WorkKey};
use thiserror::Error;

/// Storage-specific errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Item not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Stale revision or already exists
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Backend failure
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type for storage operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Work records in the control plane
///
/// Both writes are conditional on `metadata.resource_version` and fail
/// with [`StoreError::Conflict`] when the stored revision has moved on.
#[async_trait]
pub trait WorkStore: Send + Sync {
    /// Get a Work by key
    async fn get_work(&self, key: &WorkKey) -> StoreResult<Work>;

    /// Write metadata and spec; status is left as stored
    ///
    /// A Work marked for deletion whose finalizers are now empty is
    /// reclaimed by the store.
    async fn update_work(&self, work: &Work) -> StoreResult<Work>;

    /// Write status only
    async fn update_work_status(&self, work: &Work) -> StoreResult<Work>;
}

/// Read-only view of member clusters
#[async_trait]
pub trait ClusterStore: Send + Sync {
    /// Get a cluster by name
    async fn get_cluster(&self, name: &ClusterName) -> StoreResult<Cluster>;
}
