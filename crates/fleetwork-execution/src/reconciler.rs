//! Reconciler for Works
//!
//! Drives one Work toward its desired state per call: apply its manifests
//! to a ready cluster, or tear them down and release the finalizer once the
//! Work is being deleted. Every call is safe to repeat.

use crate::condition::ConditionAggregator;
use crate::config::{ConfigError, ExecutionConfig};
use crate::context::ReconcileContext;
use crate::controller::{PushModeOnly, WorkPredicate};
use crate::deletion::DeletionCoordinator;
use crate::error::{ExecutionError, Result};
use crate::events::{BroadcastEventRecorder, EventRecorder};
use crate::gateway::{ObjectCache, ObjectWatcher};
use crate::metrics::{NoopSyncMetrics, SyncMetrics};
use crate::resolver::{ClusterResolver, TeardownDecision};
use crate::retry::RetryPolicy;
use crate::store::{ClusterStore, StoreError, WorkStore};
use crate::sync::WorkloadSynchronizer;
use fleetwork_types::{
    ClusterName, EventType, ObjectReference, Work, WorkKey, EVENT_REASON_SYNC_WORKLOAD_FAILED,
    EVENT_REASON_SYNC_WORKLOAD_SUCCEED,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, instrument};

/// Name events are recorded under
pub const CONTROLLER_NAME: &str = "execution-controller";

/// Outcome of a successful reconcile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReconcileResult {
    /// Deliver the Work again after this delay even though nothing failed
    pub requeue_after: Option<Duration>,
}

impl ReconcileResult {
    pub fn done() -> Self {
        Self::default()
    }
}

/// Pushes Works to member clusters and tears them down on deletion
pub struct ExecutionController {
    pub(crate) config: ExecutionConfig,
    store: Arc<dyn WorkStore>,
    pub(crate) predicate: Arc<dyn WorkPredicate>,
    resolver: ClusterResolver,
    synchronizer: WorkloadSynchronizer,
    deletion: DeletionCoordinator,
    recorder: Arc<dyn EventRecorder>,
    metrics: Arc<dyn SyncMetrics>,
}

impl ExecutionController {
    pub fn builder() -> ExecutionControllerBuilder {
        ExecutionControllerBuilder::new()
    }

    pub fn config(&self) -> &ExecutionConfig {
        &self.config
    }

    /// Reconcile the Work stored under `key`
    ///
    /// A Work that no longer exists is done. Any error means the Work
    /// should be delivered again.
    #[instrument(skip(self, key, ctx), fields(work = %key))]
    pub async fn reconcile(&self, key: &WorkKey, ctx: &ReconcileContext) -> Result<ReconcileResult> {
        debug!("Reconciling Work");

        let mut work = match self.store.get_work(key).await {
            Ok(work) => work,
            Err(StoreError::NotFound(_)) => return Ok(ReconcileResult::done()),
            Err(err) => return Err(ExecutionError::from_work_store(err)),
        };

        let resolved = self.resolver.resolve(&work).await.map_err(|err| {
            error!(error = %err, "Failed to resolve the member cluster of work");
            err
        })?;
        let cluster = &resolved.name;

        if work.is_deleting() {
            match resolved.may_teardown() {
                TeardownDecision::Teardown => {
                    self.deletion
                        .teardown(cluster, &work, ctx)
                        .await
                        .map_err(|err| {
                            error!(cluster = %cluster, error = %err, "Failed to delete work");
                            err
                        })?;
                }
                TeardownDecision::Unfinalize => {
                    debug!(cluster = %cluster, "Cluster is terminating, skipping teardown");
                }
                TeardownDecision::NotReady => {
                    return Err(ExecutionError::ClusterNotReady(cluster.clone()));
                }
            }
            self.deletion.remove_finalizer(&mut work).await?;
            return Ok(ReconcileResult::done());
        }

        if !resolved.may_apply() {
            error!(
                cluster = %cluster,
                "Stop syncing the work for the cluster as cluster not ready"
            );
            return Err(ExecutionError::ClusterNotReady(cluster.clone()));
        }

        self.sync_work(cluster, &mut work, ctx).await?;
        Ok(ReconcileResult::done())
    }

    async fn sync_work(
        &self,
        cluster: &ClusterName,
        work: &mut Work,
        ctx: &ReconcileContext,
    ) -> Result<()> {
        let start = Instant::now();
        let result = self.synchronizer.sync_manifests(cluster, work, ctx).await;
        self.metrics
            .observe_sync_workload_latency(result.as_ref().err(), start);

        let reference = ObjectReference::for_work(work);
        match result {
            Ok(summary) => {
                let msg = format!("Sync work({}) to cluster({}) successful.", work.key(), cluster);
                debug!(applied = summary.succeeded, "{}", msg);
                self.recorder.event(
                    &reference,
                    EventType::Normal,
                    EVENT_REASON_SYNC_WORKLOAD_SUCCEED,
                    msg,
                );
                Ok(())
            }
            Err(err) => {
                let msg = format!(
                    "Failed to sync work({}) to cluster({}), err: {}",
                    work.key(),
                    cluster,
                    err
                );
                error!("{}", msg);
                self.recorder.event(
                    &reference,
                    EventType::Warning,
                    EVENT_REASON_SYNC_WORKLOAD_FAILED,
                    msg,
                );
                Err(err)
            }
        }
    }
}

/// Builder for [`ExecutionController`]
pub struct ExecutionControllerBuilder {
    config: ExecutionConfig,
    retry: Option<RetryPolicy>,
    store: Option<Arc<dyn WorkStore>>,
    clusters: Option<Arc<dyn ClusterStore>>,
    watcher: Option<Arc<dyn ObjectWatcher>>,
    cache: Option<Arc<dyn ObjectCache>>,
    recorder: Option<Arc<dyn EventRecorder>>,
    metrics: Option<Arc<dyn SyncMetrics>>,
    predicate: Option<Arc<dyn WorkPredicate>>,
}

impl ExecutionControllerBuilder {
    pub fn new() -> Self {
        Self {
            config: ExecutionConfig::default(),
            retry: None,
            store: None,
            clusters: None,
            watcher: None,
            cache: None,
            recorder: None,
            metrics: None,
            predicate: None,
        }
    }

    pub fn with_config(mut self, config: ExecutionConfig) -> Self {
        self.config = config;
        self
    }

    /// Override the conflict retry policy from the config
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = Some(retry);
        self
    }

    pub fn with_work_store(mut self, store: Arc<dyn WorkStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_cluster_store(mut self, clusters: Arc<dyn ClusterStore>) -> Self {
        self.clusters = Some(clusters);
        self
    }

    pub fn with_object_watcher(mut self, watcher: Arc<dyn ObjectWatcher>) -> Self {
        self.watcher = Some(watcher);
        self
    }

    pub fn with_object_cache(mut self, cache: Arc<dyn ObjectCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_event_recorder(mut self, recorder: Arc<dyn EventRecorder>) -> Self {
        self.recorder = Some(recorder);
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<dyn SyncMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Replace the default push-mode filter
    pub fn with_predicate(mut self, predicate: Arc<dyn WorkPredicate>) -> Self {
        self.predicate = Some(predicate);
        self
    }

    pub fn build(self) -> std::result::Result<ExecutionController, ConfigError> {
        self.config.validate()?;

        let store = self
            .store
            .ok_or_else(|| ConfigError("work store is required".into()))?;
        let clusters = self
            .clusters
            .ok_or_else(|| ConfigError("cluster store is required".into()))?;
        let watcher = self
            .watcher
            .ok_or_else(|| ConfigError("object watcher is required".into()))?;
        let cache = self
            .cache
            .ok_or_else(|| ConfigError("object cache is required".into()))?;

        let recorder = self
            .recorder
            .unwrap_or_else(|| Arc::new(BroadcastEventRecorder::new(CONTROLLER_NAME)));
        let metrics = self.metrics.unwrap_or_else(|| Arc::new(NoopSyncMetrics));
        let predicate = self
            .predicate
            .unwrap_or_else(|| Arc::new(PushModeOnly::new(clusters.clone())));
        let retry = self.retry.unwrap_or_else(|| self.config.retry.policy());

        let conditions = ConditionAggregator::new(store.clone(), retry);
        let synchronizer =
            WorkloadSynchronizer::new(watcher.clone(), cache, conditions, recorder.clone());
        let deletion =
            DeletionCoordinator::new(watcher, store.clone(), self.config.finalizer.clone());

        Ok(ExecutionController {
            config: self.config,
            store,
            predicate,
            resolver: ClusterResolver::new(clusters),
            synchronizer,
            deletion,
            recorder,
            metrics,
        })
    }
}

impl Default for ExecutionControllerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
