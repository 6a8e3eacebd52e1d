//! Workload synchronizer
//!
//! Applies a Work's manifests to its member cluster one at a time, in
//! order. A failing manifest never stops the batch; every failure is kept
//! and reported together through the Applied condition.

use crate::condition::ConditionAggregator;
use crate::context::ReconcileContext;
use crate::error::{AggregateError, ExecutionError, RemoteOperation, Result};
use crate::events::EventRecorder;
use crate::gateway::{FederatedKey, GatewayError, ObjectCache, ObjectWatcher};
use fleetwork_types::{
    ClusterName, ConditionStatus, EventType, ObjectReference, Work, Workload,
    EVENT_REASON_SYNC_WORKLOAD_FAILED, EVENT_REASON_SYNC_WORKLOAD_SUCCEED, REASON_APPLIED_FAILED,
    REASON_APPLIED_SUCCESSFUL, WORK_PERMANENT_ID_LABEL,
};
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Applied=True message
pub const MESSAGE_APPLIED_SUCCESSFUL: &str = "Manifest has been successfully applied";

/// Outcome counts of one sync pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncSummary {
    pub total: usize,
    pub succeeded: usize,
}

impl SyncSummary {
    pub fn all_applied(&self) -> bool {
        self.succeeded == self.total
    }
}

/// Pushes manifests into member clusters
#[derive(Clone)]
pub struct WorkloadSynchronizer {
    watcher: Arc<dyn ObjectWatcher>,
    cache: Arc<dyn ObjectCache>,
    conditions: ConditionAggregator,
    recorder: Arc<dyn EventRecorder>,
}

impl WorkloadSynchronizer {
    pub fn new(
        watcher: Arc<dyn ObjectWatcher>,
        cache: Arc<dyn ObjectCache>,
        conditions: ConditionAggregator,
        recorder: Arc<dyn EventRecorder>,
    ) -> Self {
        Self {
            watcher,
            cache,
            conditions,
            recorder,
        }
    }

    /// Apply every manifest of `work` to `cluster` and record the outcome
    ///
    /// Any per-manifest failure yields an [`ExecutionError::Aggregate`] in
    /// manifest order, with a failed condition write appended last. An
    /// expired deadline aborts the pass before the next remote call and
    /// leaves the condition untouched.
    pub async fn sync_manifests(
        &self,
        cluster: &ClusterName,
        work: &mut Work,
        ctx: &ReconcileContext,
    ) -> Result<SyncSummary> {
        let total = work.manifests().len();
        let permanent_id = work.permanent_id().to_string();
        let mut errs = Vec::new();
        let mut succeeded = 0;

        for (index, manifest) in work.manifests().iter().enumerate() {
            let mut workload = match manifest.decode() {
                Ok(workload) => workload,
                Err(source) => {
                    error!(
                        work = %work.key(),
                        index,
                        error = %source,
                        "Failed to decode workload"
                    );
                    errs.push(ExecutionError::ManifestMalformed { index, source });
                    continue;
                }
            };
            workload.merge_label(WORK_PERMANENT_ID_LABEL, permanent_id.as_str());

            match self.create_or_update(cluster, &workload, ctx).await {
                Ok(()) => {
                    self.eventf(
                        &workload,
                        EventType::Normal,
                        EVENT_REASON_SYNC_WORKLOAD_SUCCEED,
                        format!(
                            "Successfully applied resource({}) to cluster {}",
                            workload, cluster
                        ),
                    );
                    succeeded += 1;
                }
                Err(ExecutionError::DeadlineExceeded) => {
                    warn!(
                        work = %work.key(),
                        cluster = %cluster,
                        applied = succeeded,
                        "Deadline passed mid-batch"
                    );
                    return Err(ExecutionError::DeadlineExceeded);
                }
                Err(err) => {
                    error!(
                        work = %work.key(),
                        cluster = %cluster,
                        kind = workload.kind(),
                        object = %workload,
                        error = %err,
                        "Failed to create or update resource"
                    );
                    self.eventf(
                        &workload,
                        EventType::Warning,
                        EVENT_REASON_SYNC_WORKLOAD_FAILED,
                        format!(
                            "Failed to create or update resource({}) in member cluster({}): {}",
                            workload, cluster, err
                        ),
                    );
                    errs.push(err);
                }
            }
        }

        let summary = SyncSummary { total, succeeded };

        if !errs.is_empty() {
            let detail = AggregateError::render(&errs);
            let message = format!(
                "Failed to apply all manifests ({}/{}): {}",
                succeeded, total, detail
            );
            if let Err(err) = self
                .conditions
                .set_applied_condition(work, ConditionStatus::False, REASON_APPLIED_FAILED, message)
                .await
            {
                error!(work = %work.key(), error = %err, "Failed to update applied status");
                errs.push(err);
            }
        }
        if let Some(err) = ExecutionError::aggregate(errs) {
            return Err(err);
        }

        if let Err(err) = self
            .conditions
            .set_applied_condition(
                work,
                ConditionStatus::True,
                REASON_APPLIED_SUCCESSFUL,
                MESSAGE_APPLIED_SUCCESSFUL,
            )
            .await
        {
            error!(work = %work.key(), error = %err, "Failed to update applied status");
            return Err(err);
        }

        debug!(work = %work.key(), cluster = %cluster, total, "All manifests applied");
        Ok(summary)
    }

    /// Create when absent from the cache, otherwise update against the cached copy
    async fn create_or_update(
        &self,
        cluster: &ClusterName,
        workload: &Workload,
        ctx: &ReconcileContext,
    ) -> Result<()> {
        let remote = |operation: RemoteOperation, err: GatewayError| {
            ExecutionError::RemoteApplyFailed {
                cluster: cluster.clone(),
                operation,
                object: workload.to_string(),
                reason: err.to_string(),
            }
        };

        let key = FederatedKey::for_workload(cluster, workload)
            .map_err(|e| remote(RemoteOperation::Lookup, e))?;

        ctx.check()?;
        match self.cache.get_object(&key).await {
            Ok(cached) => {
                ctx.check()?;
                self.watcher
                    .update(cluster, workload, &cached)
                    .await
                    .map_err(|e| remote(RemoteOperation::Update, e))
            }
            Err(err) if err.is_not_found() => {
                ctx.check()?;
                self.watcher
                    .create(cluster, workload)
                    .await
                    .map_err(|e| remote(RemoteOperation::Create, e))
            }
            Err(err) => {
                error!(
                    cluster = %cluster,
                    kind = workload.kind(),
                    object = %workload,
                    error = %err,
                    "Failed to get the resource from member cluster"
                );
                Err(remote(RemoteOperation::Lookup, err))
            }
        }
    }

    fn eventf(&self, workload: &Workload, event_type: EventType, reason: &str, message: String) {
        match ObjectReference::for_workload(workload) {
            Some(reference) => self.recorder.event(&reference, event_type, reason, message),
            None => warn!(
                reason,
                kind = workload.kind(),
                "Ignore event as failed to build event reference"
            ),
        }
    }
}
