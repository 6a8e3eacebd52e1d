//! Resolve the member cluster a Work targets

use crate::error::{ExecutionError, Result};
use crate::store::{ClusterStore, StoreError};
use fleetwork_types::{Cluster, ClusterName, Work};
use std::sync::Arc;

/// What the deletion path may do against a cluster
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TeardownDecision {
    /// Cluster is ready; delete workloads, then drop the finalizer
    Teardown,
    /// Cluster is unready and being removed; only drop the finalizer
    Unfinalize,
    /// Cluster is unready but may come back; retry later
    NotReady,
}

/// A Work's target cluster as read for this reconcile
#[derive(Debug, Clone)]
pub struct ResolvedCluster {
    pub name: ClusterName,
    pub cluster: Cluster,
}

impl ResolvedCluster {
    pub fn is_ready(&self) -> bool {
        self.cluster.is_ready()
    }

    pub fn is_terminating(&self) -> bool {
        self.cluster.is_terminating()
    }

    pub fn may_apply(&self) -> bool {
        self.is_ready()
    }

    pub fn may_teardown(&self) -> TeardownDecision {
        if self.is_ready() {
            TeardownDecision::Teardown
        } else if self.is_terminating() {
            TeardownDecision::Unfinalize
        } else {
            TeardownDecision::NotReady
        }
    }
}

/// Maps a Work's execution namespace to its cluster record
#[derive(Clone)]
pub struct ClusterResolver {
    clusters: Arc<dyn ClusterStore>,
}

impl ClusterResolver {
    pub fn new(clusters: Arc<dyn ClusterStore>) -> Self {
        Self { clusters }
    }

    pub async fn resolve(&self, work: &Work) -> Result<ResolvedCluster> {
        let name = work.cluster_name()?;
        let cluster = self.clusters.get_cluster(&name).await.map_err(|e| match e {
            StoreError::NotFound(_) => ExecutionError::cluster_not_found(&name),
            other => ExecutionError::PersistenceFailed(other.to_string()),
        })?;
        Ok(ResolvedCluster { name, cluster })
    }
}
