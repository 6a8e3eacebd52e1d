//! Workload teardown and finalizer removal

use crate::context::ReconcileContext;
use crate::error::{ExecutionError, RemoteOperation, Result};
use crate::gateway::ObjectWatcher;
use crate::store::WorkStore;
use fleetwork_types::{ClusterName, Work};
use std::sync::Arc;
use tracing::{debug, error};

/// Tears a Work's workloads down and then releases the Work
#[derive(Clone)]
pub struct DeletionCoordinator {
    watcher: Arc<dyn ObjectWatcher>,
    store: Arc<dyn WorkStore>,
    finalizer: String,
}

impl DeletionCoordinator {
    pub fn new(
        watcher: Arc<dyn ObjectWatcher>,
        store: Arc<dyn WorkStore>,
        finalizer: impl Into<String>,
    ) -> Self {
        Self {
            watcher,
            store,
            finalizer: finalizer.into(),
        }
    }

    /// Delete every workload of `work` from `cluster`, in manifest order
    ///
    /// Stops at the first failure. Objects already gone count as deleted.
    pub async fn teardown(
        &self,
        cluster: &ClusterName,
        work: &Work,
        ctx: &ReconcileContext,
    ) -> Result<()> {
        for (index, manifest) in work.manifests().iter().enumerate() {
            let workload = manifest.decode().map_err(|source| {
                error!(work = %work.key(), index, error = %source, "Failed to decode workload");
                ExecutionError::ManifestMalformed { index, source }
            })?;

            ctx.check()?;
            match self.watcher.delete(cluster, &workload).await {
                Ok(()) => {}
                Err(err) if err.is_not_found() => {}
                Err(err) => {
                    error!(
                        work = %work.key(),
                        cluster = %cluster,
                        object = %workload,
                        error = %err,
                        "Failed to delete resource in the given member cluster"
                    );
                    return Err(ExecutionError::RemoteApplyFailed {
                        cluster: cluster.clone(),
                        operation: RemoteOperation::Delete,
                        object: workload.to_string(),
                        reason: err.to_string(),
                    });
                }
            }
            debug!(work = %work.key(), cluster = %cluster, object = %workload, "Deleted resource");
        }
        Ok(())
    }

    /// Drop the execution finalizer and persist the Work
    ///
    /// A Work without the finalizer is left alone. On success `work` holds
    /// what the store wrote; a store that reclaimed the Work returns its
    /// final state.
    pub async fn remove_finalizer(&self, work: &mut Work) -> Result<()> {
        if !work.metadata.finalizers.remove(&self.finalizer) {
            return Ok(());
        }

        match self.store.update_work(work).await {
            Ok(updated) => {
                *work = updated;
                Ok(())
            }
            Err(err) => {
                work.metadata.finalizers.add(self.finalizer.as_str());
                Err(ExecutionError::from_work_store(err))
            }
        }
    }
}
