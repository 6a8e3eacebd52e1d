//! In-memory storage implementation

use super::traits::*;
use async_trait::async_trait;
use fleetwork_types::{Cluster, ClusterName, Manifest, Work, WorkKey};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};

/// Channel capacity for Work change notifications
const WATCH_CHANNEL_CAPACITY: usize = 1024;

/// Change notification for a stored Work
#[derive(Debug, Clone)]
pub enum WorkWatchEvent {
    Added(Work),
    Modified { old: Work, new: Work },
    Deleted(Work),
}

impl WorkWatchEvent {
    pub fn key(&self) -> WorkKey {
        self.work().key()
    }

    /// The Work as it stands after the change
    pub fn work(&self) -> &Work {
        match self {
            WorkWatchEvent::Added(work) | WorkWatchEvent::Deleted(work) => work,
            WorkWatchEvent::Modified { new, .. } => new,
        }
    }
}

/// In-memory Work store for development and testing
///
/// Every successful write takes a fresh revision from a store-wide counter,
/// matching how a real API server hands out resource versions.
#[derive(Debug)]
pub struct InMemoryWorkStore {
    works: Arc<RwLock<HashMap<WorkKey, Work>>>,
    revision: Arc<AtomicU64>,
    watch_tx: broadcast::Sender<WorkWatchEvent>,
}

impl Default for InMemoryWorkStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryWorkStore {
    /// Create a new in-memory store
    pub fn new() -> Self {
        let (watch_tx, _) = broadcast::channel(WATCH_CHANNEL_CAPACITY);
        Self {
            works: Arc::new(RwLock::new(HashMap::new())),
            revision: Arc::new(AtomicU64::new(0)),
            watch_tx,
        }
    }

    /// Subscribe to Work changes
    pub fn watch(&self) -> broadcast::Receiver<WorkWatchEvent> {
        self.watch_tx.subscribe()
    }

    /// Store a new Work
    pub async fn create_work(&self, mut work: Work) -> StoreResult<Work> {
        let key = work.key();
        let mut works = self.works.write().await;
        if works.contains_key(&key) {
            return Err(StoreError::Conflict(format!("Work {} already exists", key)));
        }

        work.metadata.resource_version = self.next_revision();
        work.metadata.generation = 1;
        work.metadata.deletion_timestamp = None;
        works.insert(key, work.clone());

        let _ = self.watch_tx.send(WorkWatchEvent::Added(work.clone()));
        Ok(work)
    }

    /// Replace a Work's manifests, as the placement layer does
    pub async fn update_work_spec(
        &self,
        key: &WorkKey,
        manifests: Vec<Manifest>,
    ) -> StoreResult<Work> {
        let mut works = self.works.write().await;
        let stored = works
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(key.to_string()))?;
        if stored.spec.workload.manifests == manifests {
            return Ok(stored);
        }

        let mut updated = stored.clone();
        updated.spec.workload.manifests = manifests;
        updated.metadata.generation += 1;
        updated.metadata.resource_version = self.next_revision();
        works.insert(key.clone(), updated.clone());

        let _ = self.watch_tx.send(WorkWatchEvent::Modified {
            old: stored,
            new: updated.clone(),
        });
        Ok(updated)
    }

    /// Request deletion; Works without finalizers are removed at once
    pub async fn mark_for_deletion(&self, key: &WorkKey) -> StoreResult<()> {
        let mut works = self.works.write().await;
        let stored = works
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(key.to_string()))?;

        if stored.metadata.finalizers.is_empty() {
            works.remove(key);
            let _ = self.watch_tx.send(WorkWatchEvent::Deleted(stored));
            return Ok(());
        }
        if stored.is_deleting() {
            return Ok(());
        }

        let mut updated = stored.clone();
        updated.metadata.deletion_timestamp = Some(chrono::Utc::now());
        updated.metadata.generation += 1;
        updated.metadata.resource_version = self.next_revision();
        works.insert(key.clone(), updated.clone());

        let _ = self.watch_tx.send(WorkWatchEvent::Modified {
            old: stored,
            new: updated,
        });
        Ok(())
    }

    /// List all Works ordered by key
    pub async fn list_works(&self) -> Vec<Work> {
        let works = self.works.read().await;
        let mut listed: Vec<_> = works.values().cloned().collect();
        listed.sort_by_key(Work::key);
        listed
    }

    fn next_revision(&self) -> u64 {
        self.revision.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn check_revision(stored: &Work, incoming: &Work) -> StoreResult<()> {
        if stored.metadata.resource_version != incoming.metadata.resource_version {
            return Err(StoreError::Conflict(format!(
                "Work {} has been modified; resource version {} is stale (current {})",
                stored.key(),
                incoming.metadata.resource_version,
                stored.metadata.resource_version
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl WorkStore for InMemoryWorkStore {
    async fn get_work(&self, key: &WorkKey) -> StoreResult<Work> {
        let works = self.works.read().await;
        works
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(key.to_string()))
    }

    async fn update_work(&self, work: &Work) -> StoreResult<Work> {
        let key = work.key();
        let mut works = self.works.write().await;
        let stored = works
            .get(&key)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(key.to_string()))?;
        Self::check_revision(&stored, work)?;

        let mut updated = work.clone();
        updated.status = stored.status.clone();
        updated.metadata.deletion_timestamp = stored.metadata.deletion_timestamp;
        updated.metadata.generation = if updated.spec != stored.spec {
            stored.metadata.generation + 1
        } else {
            stored.metadata.generation
        };
        updated.metadata.resource_version = self.next_revision();

        if updated.is_deleting() && updated.metadata.finalizers.is_empty() {
            works.remove(&key);
            let _ = self.watch_tx.send(WorkWatchEvent::Deleted(updated.clone()));
            return Ok(updated);
        }

        works.insert(key, updated.clone());
        let _ = self.watch_tx.send(WorkWatchEvent::Modified {
            old: stored,
            new: updated.clone(),
        });
        Ok(updated)
    }

    async fn update_work_status(&self, work: &Work) -> StoreResult<Work> {
        let key = work.key();
        let mut works = self.works.write().await;
        let stored = works
            .get(&key)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(key.to_string()))?;
        Self::check_revision(&stored, work)?;

        let mut updated = stored.clone();
        updated.status = work.status.clone();
        updated.metadata.resource_version = self.next_revision();
        works.insert(key, updated.clone());

        let _ = self.watch_tx.send(WorkWatchEvent::Modified {
            old: stored,
            new: updated.clone(),
        });
        Ok(updated)
    }
}

/// In-memory cluster registry
#[derive(Debug, Default)]
pub struct InMemoryClusterStore {
    clusters: Arc<RwLock<HashMap<ClusterName, Cluster>>>,
}

impl InMemoryClusterStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create or replace a cluster
    pub async fn upsert_cluster(&self, cluster: Cluster) {
        let mut clusters = self.clusters.write().await;
        clusters.insert(cluster.name.clone(), cluster);
    }

    pub async fn remove_cluster(&self, name: &ClusterName) -> bool {
        let mut clusters = self.clusters.write().await;
        clusters.remove(name).is_some()
    }

    pub async fn list_clusters(&self) -> Vec<Cluster> {
        let clusters = self.clusters.read().await;
        let mut listed: Vec<_> = clusters.values().cloned().collect();
        listed.sort_by(|a, b| a.name.cmp(&b.name));
        listed
    }
}

#[async_trait]
impl ClusterStore for InMemoryClusterStore {
    async fn get_cluster(&self, name: &ClusterName) -> StoreResult<Cluster> {
        let clusters = self.clusters.read().await;
        clusters
            .get(name)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(name.to_string()))
    }
}
