//! Work records
//!
//! A Work carries an ordered batch of manifests for one member cluster. Its
//! namespace encodes the cluster; its finalizer blocks removal until the
//! execution layer has torn the workloads down.

use crate::condition::{find_condition, Condition};
use crate::error::NamespaceError;
use crate::finalizer::FinalizerSet;
use crate::ids::{cluster_name_from_namespace, ClusterName, WorkKey};
use crate::manifest::Manifest;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Condition type summarizing whether every manifest was applied
pub const WORK_APPLIED: &str = "Applied";

/// Applied=True reason
pub const REASON_APPLIED_SUCCESSFUL: &str = "AppliedSuccessful";

/// Applied=False reason
pub const REASON_APPLIED_FAILED: &str = "AppliedFailed";

/// Finalizer held by the execution controller
pub const EXECUTION_FINALIZER: &str = "fleetwork.io/execution-controller";

/// Label carrying a Work's stable identity onto every applied workload
pub const WORK_PERMANENT_ID_LABEL: &str = "work.fleetwork.io/permanent-id";

/// Object metadata shared by stored records
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObjectMeta {
    pub namespace: String,
    pub name: String,

    #[serde(default)]
    pub labels: BTreeMap<String, String>,

    #[serde(default)]
    pub finalizers: FinalizerSet,

    /// Set when deletion has been requested
    #[serde(default)]
    pub deletion_timestamp: Option<DateTime<Utc>>,

    /// Revision used for conditional writes; assigned by the store
    #[serde(default)]
    pub resource_version: u64,

    /// Bumped on spec changes and on deletion requests
    #[serde(default)]
    pub generation: u64,
}

/// Manifests to apply, in order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkloadTemplate {
    #[serde(default)]
    pub manifests: Vec<Manifest>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkSpec {
    #[serde(default)]
    pub workload: WorkloadTemplate,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkStatus {
    #[serde(default)]
    pub conditions: Vec<Condition>,
}

/// A batch of manifests destined for one member cluster
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Work {
    pub metadata: ObjectMeta,

    #[serde(default)]
    pub spec: WorkSpec,

    #[serde(default)]
    pub status: WorkStatus,
}

impl Work {
    pub fn new(key: WorkKey, manifests: Vec<Manifest>) -> Self {
        Self {
            metadata: ObjectMeta {
                namespace: key.namespace,
                name: key.name,
                ..Default::default()
            },
            spec: WorkSpec {
                workload: WorkloadTemplate { manifests },
            },
            status: WorkStatus::default(),
        }
    }

    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.labels.insert(key.into(), value.into());
        self
    }

    pub fn with_finalizer(mut self, token: impl Into<String>) -> Self {
        self.metadata.finalizers.add(token);
        self
    }

    pub fn key(&self) -> WorkKey {
        WorkKey::new(&self.metadata.namespace, &self.metadata.name)
    }

    /// Member cluster encoded in the namespace
    pub fn cluster_name(&self) -> Result<ClusterName, NamespaceError> {
        cluster_name_from_namespace(&self.metadata.namespace)
    }

    pub fn manifests(&self) -> &[Manifest] {
        &self.spec.workload.manifests
    }

    pub fn is_deleting(&self) -> bool {
        self.metadata.deletion_timestamp.is_some()
    }

    /// Value of the permanent-id label, empty when unset
    pub fn permanent_id(&self) -> &str {
        self.metadata
            .labels
            .get(WORK_PERMANENT_ID_LABEL)
            .map(String::as_str)
            .unwrap_or_default()
    }

    pub fn applied_condition(&self) -> Option<&Condition> {
        find_condition(&self.status.conditions, WORK_APPLIED)
    }
}

/// Lifecycle phase as seen by the execution layer
///
/// `Removed` is never observed on a Work value; it is the state once the
/// store has reclaimed the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkPhase {
    Active,
    Terminating,
    Finalizing,
    Removed,
}

impl WorkPhase {
    pub fn observe(work: &Work, finalizer: &str) -> Self {
        match (work.is_deleting(), work.metadata.finalizers.contains(finalizer)) {
            (false, _) => WorkPhase::Active,
            (true, true) => WorkPhase::Terminating,
            (true, false) => WorkPhase::Finalizing,
        }
    }

    /// Phase of a Work that may already be gone from the store
    pub fn observe_stored(work: Option<&Work>, finalizer: &str) -> Self {
        work.map_or(WorkPhase::Removed, |w| Self::observe(w, finalizer))
    }
}
