//! In-memory member clusters
//!
//! Backs both gateway traits with one map per registered cluster. The
//! cache and the live objects are the same map, so a cached read is never
//! stale unless another writer raced in between.

use super::traits::*;
use async_trait::async_trait;
use fleetwork_types::{ClusterName, Workload};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug, Default)]
struct MemberCluster {
    objects: BTreeMap<FederatedKey, Workload>,
    revision: u64,
}

impl MemberCluster {
    fn next_revision(&mut self) -> String {
        self.revision += 1;
        self.revision.to_string()
    }
}

/// Fake member clusters for development and testing
#[derive(Debug, Default)]
pub struct InMemoryMemberClusters {
    clusters: Arc<RwLock<HashMap<ClusterName, MemberCluster>>>,
}

impl InMemoryMemberClusters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make a cluster reachable; existing objects are kept
    pub async fn register_cluster(&self, name: ClusterName) {
        let mut clusters = self.clusters.write().await;
        clusters.entry(name).or_default();
    }

    /// Drop a cluster and everything in it
    pub async fn unregister_cluster(&self, name: &ClusterName) -> bool {
        let mut clusters = self.clusters.write().await;
        clusters.remove(name).is_some()
    }

    /// Objects currently in `cluster`, ordered by key
    pub async fn objects(&self, cluster: &ClusterName) -> Vec<Workload> {
        let clusters = self.clusters.read().await;
        clusters
            .get(cluster)
            .map(|c| c.objects.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Live object by key
    pub async fn get(&self, key: &FederatedKey) -> Option<Workload> {
        let clusters = self.clusters.read().await;
        clusters.get(&key.cluster)?.objects.get(key).cloned()
    }
}

#[async_trait]
impl ObjectWatcher for InMemoryMemberClusters {
    async fn create(&self, cluster: &ClusterName, desired: &Workload) -> Result<(), GatewayError> {
        let key = FederatedKey::for_workload(cluster, desired)?;
        let mut clusters = self.clusters.write().await;
        let member = clusters
            .get_mut(cluster)
            .ok_or_else(|| GatewayError::ClusterUnreachable(cluster.clone()))?;
        if member.objects.contains_key(&key) {
            return Err(GatewayError::Conflict(format!("{} already exists", key)));
        }

        let mut object = desired.clone();
        object.set_resource_version(member.next_revision());
        member.objects.insert(key, object);
        Ok(())
    }

    async fn update(
        &self,
        cluster: &ClusterName,
        desired: &Workload,
        cached: &Workload,
    ) -> Result<(), GatewayError> {
        let key = FederatedKey::for_workload(cluster, desired)?;
        let mut clusters = self.clusters.write().await;
        let member = clusters
            .get_mut(cluster)
            .ok_or_else(|| GatewayError::ClusterUnreachable(cluster.clone()))?;
        let live = member
            .objects
            .get(&key)
            .ok_or_else(|| GatewayError::NotFound(key.to_string()))?;

        if live.resource_version() != cached.resource_version() {
            return Err(GatewayError::Conflict(format!(
                "{} changed since it was cached (resource version {} is stale)",
                key,
                cached.resource_version()
            )));
        }

        let mut object = desired.clone();
        object.set_resource_version(member.next_revision());
        member.objects.insert(key, object);
        Ok(())
    }

    async fn delete(&self, cluster: &ClusterName, desired: &Workload) -> Result<(), GatewayError> {
        let key = FederatedKey::for_workload(cluster, desired)?;
        let mut clusters = self.clusters.write().await;
        let member = clusters
            .get_mut(cluster)
            .ok_or_else(|| GatewayError::ClusterUnreachable(cluster.clone()))?;
        member.objects.remove(&key);
        Ok(())
    }
}

#[async_trait]
impl ObjectCache for InMemoryMemberClusters {
    async fn get_object(&self, key: &FederatedKey) -> Result<Workload, GatewayError> {
        let clusters = self.clusters.read().await;
        let member = clusters
            .get(&key.cluster)
            .ok_or_else(|| GatewayError::ClusterUnreachable(key.cluster.clone()))?;
        member
            .objects
            .get(key)
            .cloned()
            .ok_or_else(|| GatewayError::NotFound(key.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn config_map(data: &str) -> Workload {
        Workload::from_value(json!({
            "apiVersion": "v1",
            "kind": "ConfigMap",
            "metadata": {"name": "cfg", "namespace": "default"},
            "data": {"key": data}
        }))
        .unwrap()
    }

    async fn clusters() -> (InMemoryMemberClusters, ClusterName) {
        let clusters = InMemoryMemberClusters::new();
        let name = ClusterName::new("member1");
        clusters.register_cluster(name.clone()).await;
        (clusters, name)
    }

    #[tokio::test]
    async fn test_create_then_cache_lookup() {
        let (clusters, name) = clusters().await;
        let desired = config_map("a");
        clusters.create(&name, &desired).await.unwrap();

        let key = FederatedKey::for_workload(&name, &desired).unwrap();
        let cached = clusters.get_object(&key).await.unwrap();
        assert_eq!(cached.resource_version(), "1");
        assert_eq!(cached.as_object()["data"]["key"], "a");
    }

    #[tokio::test]
    async fn test_update_with_stale_cache_conflicts() {
        let (clusters, name) = clusters().await;
        clusters.create(&name, &config_map("a")).await.unwrap();
        let key = FederatedKey::for_workload(&name, &config_map("a")).unwrap();
        let stale = clusters.get_object(&key).await.unwrap();

        clusters.update(&name, &config_map("b"), &stale).await.unwrap();
        let err = clusters
            .update(&name, &config_map("c"), &stale)
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::Conflict(_)));
        assert_eq!(clusters.get(&key).await.unwrap().as_object()["data"]["key"], "b");
    }

    #[tokio::test]
    async fn test_delete_absent_is_success() {
        let (clusters, name) = clusters().await;
        clusters.delete(&name, &config_map("a")).await.unwrap();
        clusters.create(&name, &config_map("a")).await.unwrap();
        clusters.delete(&name, &config_map("a")).await.unwrap();
        clusters.delete(&name, &config_map("a")).await.unwrap();
        assert!(clusters.objects(&name).await.is_empty());
    }

    #[tokio::test]
    async fn test_unregistered_cluster_unreachable() {
        let clusters = InMemoryMemberClusters::new();
        let err = clusters
            .create(&ClusterName::new("ghost"), &config_map("a"))
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::ClusterUnreachable(_)));
    }

    #[tokio::test]
    async fn test_lookup_absent_is_not_found() {
        let (clusters, name) = clusters().await;
        let key = FederatedKey::for_workload(&name, &config_map("a")).unwrap();
        assert!(clusters.get_object(&key).await.unwrap_err().is_not_found());
    }
}
