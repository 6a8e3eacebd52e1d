//! Shared fixtures for the execution integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use fleetwork_execution::*;
use fleetwork_types::*;
use serde_json::json;
use std::collections::HashSet;
use std::result::Result;
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const CLUSTER: &str = "member1";

// ---------------------------------------------------------------------------
// Recording gateway
// ---------------------------------------------------------------------------

/// Wraps the in-memory member clusters, logging every write and failing
/// writes for selected object names.
pub struct RecordingGateway {
    pub inner: InMemoryMemberClusters,
    calls: Mutex<Vec<(RemoteOperation, String)>>,
    failing: Mutex<HashSet<String>>,
    latency: Mutex<Duration>,
}

impl RecordingGateway {
    pub fn new() -> Self {
        Self {
            inner: InMemoryMemberClusters::new(),
            calls: Mutex::new(Vec::new()),
            failing: Mutex::new(HashSet::new()),
            latency: Mutex::new(Duration::ZERO),
        }
    }

    pub fn fail_object(&self, name: &str) {
        self.failing.lock().unwrap().insert(name.to_string());
    }

    /// Make every write take `latency`
    pub fn set_latency(&self, latency: Duration) {
        *self.latency.lock().unwrap() = latency;
    }

    async fn pause(&self) {
        let latency = *self.latency.lock().unwrap();
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
    }

    /// Names of objects written, in call order
    pub fn written_names(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(_, name)| name.clone())
            .collect()
    }

    pub fn calls(&self) -> Vec<(RemoteOperation, String)> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, op: RemoteOperation, desired: &Workload) -> Result<(), GatewayError> {
        self.calls
            .lock()
            .unwrap()
            .push((op, desired.name().to_string()));
        if self.failing.lock().unwrap().contains(desired.name()) {
            return Err(GatewayError::Remote(format!("injected failure for {}", desired.name())));
        }
        Ok(())
    }
}

#[async_trait]
impl ObjectWatcher for RecordingGateway {
    async fn create(&self, cluster: &ClusterName, desired: &Workload) -> Result<(), GatewayError> {
        self.record(RemoteOperation::Create, desired)?;
        self.pause().await;
        self.inner.create(cluster, desired).await
    }

    async fn update(
        &self,
        cluster: &ClusterName,
        desired: &Workload,
        cached: &Workload,
    ) -> Result<(), GatewayError> {
        self.record(RemoteOperation::Update, desired)?;
        self.pause().await;
        self.inner.update(cluster, desired, cached).await
    }

    async fn delete(&self, cluster: &ClusterName, desired: &Workload) -> Result<(), GatewayError> {
        self.record(RemoteOperation::Delete, desired)?;
        self.pause().await;
        self.inner.delete(cluster, desired).await
    }
}

#[async_trait]
impl ObjectCache for RecordingGateway {
    async fn get_object(&self, key: &FederatedKey) -> Result<Workload, GatewayError> {
        self.inner.get_object(key).await
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

pub struct Harness {
    pub works: Arc<InMemoryWorkStore>,
    pub clusters: Arc<InMemoryClusterStore>,
    pub gateway: Arc<RecordingGateway>,
    pub recorder: CollectingEventRecorder,
    pub controller: Arc<ExecutionController>,
}

impl Harness {
    pub async fn new() -> Self {
        Self::with_config(ExecutionConfig::default()).await
    }

    pub async fn with_config(config: ExecutionConfig) -> Self {
        let works = Arc::new(InMemoryWorkStore::new());
        let clusters = Arc::new(InMemoryClusterStore::new());
        let gateway = Arc::new(RecordingGateway::new());
        gateway.inner.register_cluster(ClusterName::new(CLUSTER)).await;
        let recorder = CollectingEventRecorder::new();

        let controller = ExecutionController::builder()
            .with_config(config)
            .with_work_store(works.clone())
            .with_cluster_store(clusters.clone())
            .with_object_watcher(gateway.clone())
            .with_object_cache(gateway.clone())
            .with_event_recorder(Arc::new(recorder.clone()))
            .with_retry_policy(RetryPolicy::immediate(5))
            .build()
            .unwrap();

        Self {
            works,
            clusters,
            gateway,
            recorder,
            controller: Arc::new(controller),
        }
    }

    pub async fn set_cluster(&self, ready: bool, terminating: bool) {
        self.clusters.upsert_cluster(cluster(ready, terminating)).await;
    }

    pub async fn create_work(&self, name: &str, manifests: Vec<Manifest>) -> WorkKey {
        let work = Work::new(WorkKey::for_cluster(&ClusterName::new(CLUSTER), name), manifests)
            .with_label(WORK_PERMANENT_ID_LABEL, format!("pid-{}", name))
            .with_finalizer(EXECUTION_FINALIZER);
        self.works.create_work(work).await.unwrap().key()
    }

    pub async fn reconcile(&self, key: &WorkKey) -> fleetwork_execution::Result<ReconcileResult> {
        self.controller
            .reconcile(key, &ReconcileContext::background())
            .await
    }

    pub async fn remote_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .gateway
            .inner
            .objects(&ClusterName::new(CLUSTER))
            .await
            .iter()
            .map(|o| o.name().to_string())
            .collect();
        names.sort();
        names
    }
}

pub fn cluster(ready: bool, terminating: bool) -> Cluster {
    let mut cluster = Cluster::new(CLUSTER);
    let status = if ready {
        ConditionStatus::True
    } else {
        ConditionStatus::False
    };
    set_status_condition(
        &mut cluster.status.conditions,
        Condition::new(CLUSTER_CONDITION_READY, status, "ClusterReady", ""),
    );
    if terminating {
        cluster.deletion_timestamp = Some(chrono::Utc::now());
    }
    cluster
}

pub fn config_map(name: &str) -> Manifest {
    Manifest::from_value(&json!({
        "apiVersion": "v1",
        "kind": "ConfigMap",
        "metadata": {"name": name, "namespace": "default"},
        "data": {"owner": name}
    }))
}

pub fn malformed() -> Manifest {
    Manifest::from_raw("{\"kind\": ")
}
