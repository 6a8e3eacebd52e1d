//! Controller loop
//!
//! Feeds Work changes through the event filters into a [`WorkQueue`] and
//! runs a fixed pool of workers that reconcile one key at a time.

use crate::context::ReconcileContext;
use crate::queue::WorkQueue;
use crate::reconciler::ExecutionController;
use crate::store::{ClusterStore, WorkWatchEvent};
use async_trait::async_trait;
use fleetwork_types::{SyncMode, Work};
use std::sync::Arc;
use tokio::sync::{broadcast, watch};
use tracing::{debug, error, info, trace, warn};

/// Decides whether a Work is handled by this controller at all
#[async_trait]
pub trait WorkPredicate: Send + Sync {
    async fn admit(&self, work: &Work) -> bool;
}

/// Admits Works whose cluster receives pushed workloads
///
/// Works outside an execution namespace, or whose cluster cannot be read,
/// are skipped.
pub struct PushModeOnly {
    clusters: Arc<dyn ClusterStore>,
}

impl PushModeOnly {
    pub fn new(clusters: Arc<dyn ClusterStore>) -> Self {
        Self { clusters }
    }
}

#[async_trait]
impl WorkPredicate for PushModeOnly {
    async fn admit(&self, work: &Work) -> bool {
        let Ok(name) = work.cluster_name() else {
            return false;
        };
        match self.clusters.get_cluster(&name).await {
            Ok(cluster) => cluster.spec.sync_mode == SyncMode::Push,
            Err(err) => {
                debug!(work = %work.key(), cluster = %name, error = %err, "Failed to get cluster");
                false
            }
        }
    }
}

/// Admits every Work
#[derive(Debug, Default, Clone, Copy)]
pub struct AdmitAll;

#[async_trait]
impl WorkPredicate for AdmitAll {
    async fn admit(&self, _work: &Work) -> bool {
        true
    }
}

/// Whether a change should trigger a reconcile
///
/// Creations and deletions always do; updates only when the generation
/// moved, so status and finalizer writes do not feed back into the queue.
pub fn generation_changed(event: &WorkWatchEvent) -> bool {
    match event {
        WorkWatchEvent::Added(_) | WorkWatchEvent::Deleted(_) => true,
        WorkWatchEvent::Modified { old, new } => {
            old.metadata.generation != new.metadata.generation
        }
    }
}

impl ExecutionController {
    /// Run until `shutdown` flips to `true` or the event stream closes
    ///
    /// `initial` is enqueued before any event is read, the way a fresh
    /// informer lists existing objects.
    pub async fn run(
        self: Arc<Self>,
        initial: Vec<Work>,
        mut events: broadcast::Receiver<WorkWatchEvent>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        let queue = WorkQueue::new();
        info!(workers = self.config.workers, "Execution controller started");

        let mut workers = Vec::with_capacity(self.config.workers);
        for id in 0..self.config.workers {
            let controller = self.clone();
            let queue = queue.clone();
            workers.push(tokio::spawn(async move {
                controller.worker(id, queue).await;
            }));
        }

        for work in &initial {
            self.enqueue(&queue, work).await;
        }

        while !*shutdown.borrow() {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                received = events.recv() => match received {
                    Ok(event) if generation_changed(&event) => {
                        self.enqueue(&queue, event.work()).await;
                    }
                    Ok(event) => {
                        trace!(work = %event.key(), "Generation unchanged, skipping");
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!(lagged = n, "Work event stream lagged; some changes were missed");
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        debug!("Work event stream closed");
                        break;
                    }
                }
            }
        }

        queue.shut_down().await;
        for worker in workers {
            if let Err(err) = worker.await {
                error!(error = %err, "Execution worker panicked");
            }
        }
        info!("Execution controller stopped");
    }

    async fn enqueue(&self, queue: &WorkQueue, work: &Work) {
        if self.predicate.admit(work).await {
            queue.add(work.key()).await;
        } else {
            trace!(work = %work.key(), "Work filtered out");
        }
    }

    async fn worker(&self, id: usize, queue: WorkQueue) {
        let timeout = self.config.reconcile_timeout();
        while let Some(key) = queue.get().await {
            let ctx = ReconcileContext::with_timeout(timeout);
            match tokio::time::timeout(timeout, self.reconcile(&key, &ctx)).await {
                Ok(Ok(result)) => {
                    if let Some(delay) = result.requeue_after {
                        queue.add_after(key.clone(), delay);
                    }
                }
                Ok(Err(err)) if err.is_retryable() => {
                    warn!(worker = id, work = %key, error = %err, "Reconcile failed, requeueing");
                    queue.add_after(key.clone(), self.config.requeue_delay());
                }
                Ok(Err(err)) => {
                    warn!(
                        worker = id,
                        work = %key,
                        error = %err,
                        "Reconcile failed until the Work changes, requeueing slowly"
                    );
                    queue.add_after(key.clone(), self.config.stuck_requeue_delay());
                }
                Err(_) => {
                    warn!(worker = id, work = %key, "Reconcile timed out, requeueing");
                    queue.add_after(key.clone(), self.config.requeue_delay());
                }
            }
            queue.done(&key).await;
        }
        debug!(worker = id, "Worker stopped");
    }
}
