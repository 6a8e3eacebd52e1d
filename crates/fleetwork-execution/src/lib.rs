//! fleetwork Execution - Push Work manifests into member clusters
//!
//! The execution controller reconciles each Work against the member cluster
//! its namespace names. While the Work is live it creates or updates every
//! manifest in order and records the outcome in the Work's `Applied`
//! condition. Once the Work is marked for deletion it tears the workloads
//! down and releases the execution finalizer.
//!
//! ## Components
//!
//! - [`ClusterResolver`]: Work namespace to cluster readiness and deletion state
//! - [`ObjectWatcher`] / [`ObjectCache`]: remote writes and cached remote reads
//! - [`WorkloadSynchronizer`]: ordered apply of a manifest batch
//! - [`ConditionAggregator`]: Applied condition with conflict retry
//! - [`DeletionCoordinator`]: teardown and finalizer removal
//! - [`ExecutionController`]: per-Work reconcile plus the worker loop
//!
//! ## Example
//!
//! ```rust,ignore
//! let controller = Arc::new(
//!     ExecutionController::builder()
//!         .with_work_store(works.clone())
//!         .with_cluster_store(clusters)
//!         .with_object_watcher(members.clone())
//!         .with_object_cache(members)
//!         .build()?,
//! );
//! controller.run(works.list_works().await, works.watch(), shutdown_rx).await;
//! ```

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]

pub mod condition;
pub mod config;
pub mod context;
pub mod controller;
pub mod deletion;
pub mod error;
pub mod events;
pub mod gateway;
pub mod metrics;
pub mod queue;
pub mod reconciler;
pub mod resolver;
pub mod retry;
pub mod store;
pub mod sync;

pub use condition::ConditionAggregator;
pub use config::{ConfigError, ExecutionConfig, RetryConfig, MAX_RETRY_FACTOR};
pub use context::ReconcileContext;
pub use controller::{generation_changed, AdmitAll, PushModeOnly, WorkPredicate};
pub use deletion::DeletionCoordinator;
pub use error::{AggregateError, ExecutionError, RemoteOperation, Result};
pub use events::{BroadcastEventRecorder, CollectingEventRecorder, EventRecorder};
pub use gateway::{FederatedKey, GatewayError, InMemoryMemberClusters, ObjectCache, ObjectWatcher};
pub use metrics::{NoopSyncMetrics, PrometheusSyncMetrics, SyncMetrics};
pub use queue::WorkQueue;
pub use reconciler::{
    ExecutionController, ExecutionControllerBuilder, ReconcileResult, CONTROLLER_NAME,
};
pub use resolver::{ClusterResolver, ResolvedCluster, TeardownDecision};
pub use retry::{Backoff, RetryPolicy};
pub use store::{
    ClusterStore, InMemoryClusterStore, InMemoryWorkStore, StoreError, StoreResult, WorkStore,
    WorkWatchEvent,
};
pub use sync::{SyncSummary, WorkloadSynchronizer, MESSAGE_APPLIED_SUCCESSFUL};
