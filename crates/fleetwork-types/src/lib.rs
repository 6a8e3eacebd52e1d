//! fleetwork Types - Core types for pushing Work to member clusters
//!
//! A Work is a namespaced record describing a batch of workload manifests
//! destined for exactly one member cluster. The execution layer reconciles
//! the member cluster against the Work and reports back through the Work's
//! status conditions.
//!
//! ## Architectural Boundaries
//!
//! - **Placement** owns: deciding what runs where, creating and deleting Works
//! - **Cluster lifecycle** owns: joining, readiness and removal of clusters
//! - **fleetwork-execution** owns: applying manifests, the Applied condition,
//!   teardown and finalizer removal
//!
//! ## Key Concepts
//!
//! - **Work**: batch of opaque manifests plus finalizers and status
//! - **Manifest / Workload**: serialized document and its decoded form
//! - **Condition**: typed status entry, at most one per type
//! - **FinalizerSet**: tokens blocking final removal of a Work
//! - **Cluster**: read-only view of a member cluster
//! - **WorkEvent**: human-readable record of what happened to an object

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]

pub mod cluster;
pub mod condition;
pub mod error;
pub mod events;
pub mod finalizer;
pub mod ids;
pub mod manifest;
pub mod work;

// Re-export main types
pub use cluster::{Cluster, ClusterSpec, ClusterStatus, SyncMode, CLUSTER_CONDITION_READY};
pub use condition::{
    find_condition, is_condition_true, set_status_condition, Condition, ConditionStatus,
};
pub use error::{ManifestError, NamespaceError};
pub use events::{
    EventType, ObjectReference, WorkEvent, EVENT_REASON_SYNC_WORKLOAD_FAILED,
    EVENT_REASON_SYNC_WORKLOAD_SUCCEED,
};
pub use finalizer::FinalizerSet;
pub use ids::{
    cluster_name_from_namespace, execution_namespace, ClusterName, WorkKey,
    EXECUTION_SPACE_PREFIX,
};
pub use manifest::{GroupVersionKind, Manifest, Workload};
pub use work::{
    ObjectMeta, Work, WorkPhase, WorkSpec, WorkStatus, WorkloadTemplate, EXECUTION_FINALIZER,
    REASON_APPLIED_FAILED, REASON_APPLIED_SUCCESSFUL, WORK_APPLIED, WORK_PERMANENT_ID_LABEL,
};
