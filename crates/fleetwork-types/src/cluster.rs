//! Member cluster view
//!
//! Clusters are owned by the membership lifecycle; the execution layer only
//! reads readiness, the deletion marker and the sync mode.

use crate::condition::{is_condition_true, Condition};
use crate::ids::ClusterName;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Condition type reporting cluster readiness
pub const CLUSTER_CONDITION_READY: &str = "Ready";

/// How workloads reach a member cluster
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SyncMode {
    /// Control plane applies workloads directly
    #[default]
    Push,
    /// An agent inside the member cluster pulls Works
    Pull,
}

/// A member cluster
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cluster {
    pub name: ClusterName,

    /// Set once the cluster is being unjoined
    #[serde(default)]
    pub deletion_timestamp: Option<DateTime<Utc>>,

    #[serde(default)]
    pub spec: ClusterSpec,

    #[serde(default)]
    pub status: ClusterStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClusterSpec {
    #[serde(default)]
    pub sync_mode: SyncMode,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClusterStatus {
    #[serde(default)]
    pub conditions: Vec<Condition>,
}

impl Cluster {
    /// A push-mode cluster with no conditions
    pub fn new(name: impl Into<ClusterName>) -> Self {
        Self {
            name: name.into(),
            deletion_timestamp: None,
            spec: ClusterSpec::default(),
            status: ClusterStatus::default(),
        }
    }

    pub fn is_ready(&self) -> bool {
        is_condition_true(&self.status.conditions, CLUSTER_CONDITION_READY)
    }

    pub fn is_terminating(&self) -> bool {
        self.deletion_timestamp.is_some()
    }
}
