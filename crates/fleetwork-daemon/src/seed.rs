//! Preloaded control-plane state
//!
//! A seed file is a JSON document listing member clusters and Works. Every
//! seeded cluster is also registered as a reachable in-memory member
//! cluster so that Works aimed at it can be applied.

use crate::error::{DaemonError, DaemonResult};
use fleetwork_execution::{InMemoryClusterStore, InMemoryMemberClusters, InMemoryWorkStore};
use fleetwork_types::{Cluster, Work};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// Contents of a seed file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Seed {
    #[serde(default)]
    pub clusters: Vec<Cluster>,

    #[serde(default)]
    pub works: Vec<Work>,
}

impl Seed {
    pub fn from_json(json: &str) -> DaemonResult<Self> {
        serde_json::from_str(json).map_err(|e| DaemonError::Seed(e.to_string()))
    }

    pub fn load(path: impl AsRef<Path>) -> DaemonResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| DaemonError::Seed(format!("{}: {}", path.display(), e)))?;
        Self::from_json(&json)
    }

    /// Load everything into the in-memory stores
    pub async fn apply(
        self,
        works: &InMemoryWorkStore,
        clusters: &InMemoryClusterStore,
        members: &InMemoryMemberClusters,
    ) -> DaemonResult<()> {
        let (cluster_count, work_count) = (self.clusters.len(), self.works.len());

        for cluster in self.clusters {
            members.register_cluster(cluster.name.clone()).await;
            clusters.upsert_cluster(cluster).await;
        }
        for work in self.works {
            let key = work.key();
            works
                .create_work(work)
                .await
                .map_err(|e| DaemonError::Seed(format!("Work {}: {}", key, e)))?;
        }

        info!(clusters = cluster_count, works = work_count, "Seeded control plane");
        Ok(())
    }
}
