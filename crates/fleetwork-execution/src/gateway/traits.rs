//! Gateway trait definitions

use async_trait::async_trait;
use fleetwork_types::{ClusterName, GroupVersionKind, Workload};
use std::fmt;
use thiserror::Error;

/// Errors from a member cluster or its cache
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    /// Object absent from the member cluster or cache
    #[error("not found: {0}")]
    NotFound(String),

    /// Write raced another writer
    #[error("conflict: {0}")]
    Conflict(String),

    /// Cluster cannot be reached
    #[error("cluster {0} is unreachable")]
    ClusterUnreachable(ClusterName),

    /// Object cannot be addressed
    #[error("invalid object: {0}")]
    InvalidObject(String),

    /// Any other remote failure
    #[error("{0}")]
    Remote(String),
}

impl GatewayError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, GatewayError::NotFound(_))
    }
}

/// Address of an object inside one member cluster
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FederatedKey {
    pub cluster: ClusterName,
    pub gvk: GroupVersionKind,
    pub namespace: String,
    pub name: String,
}

impl FederatedKey {
    pub fn for_workload(cluster: &ClusterName, workload: &Workload) -> Result<Self, GatewayError> {
        if workload.name().is_empty() {
            return Err(GatewayError::InvalidObject(format!(
                "{} without metadata.name",
                workload.kind()
            )));
        }
        Ok(Self {
            cluster: cluster.clone(),
            gvk: workload.group_version_kind(),
            namespace: workload.namespace().to_string(),
            name: workload.name().to_string(),
        })
    }
}

impl fmt::Display for FederatedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cluster={}, {}, ", self.cluster, self.gvk)?;
        if self.namespace.is_empty() {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{}/{}", self.namespace, self.name)
        }
    }
}

/// Writes single objects into member clusters
#[async_trait]
pub trait ObjectWatcher: Send + Sync {
    /// Create `desired` in `cluster`
    async fn create(&self, cluster: &ClusterName, desired: &Workload) -> Result<(), GatewayError>;

    /// Update the live object from `desired`
    ///
    /// `cached` is the last observed remote copy. Implementations must
    /// write conditionally on its revision rather than blindly overwrite.
    async fn update(
        &self,
        cluster: &ClusterName,
        desired: &Workload,
        cached: &Workload,
    ) -> Result<(), GatewayError>;

    /// Delete the object; an already-absent object is success
    async fn delete(&self, cluster: &ClusterName, desired: &Workload) -> Result<(), GatewayError>;
}

/// Read-only cached view of member cluster objects
#[async_trait]
pub trait ObjectCache: Send + Sync {
    /// Fails with [`GatewayError::NotFound`] when absent
    async fn get_object(&self, key: &FederatedKey) -> Result<Workload, GatewayError>;
}
