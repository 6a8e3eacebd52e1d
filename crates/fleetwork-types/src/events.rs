//! Event types for fleetwork observability
//!
//! Events are the human-readable trail left on Works and on the workloads
//! applied from them.

use crate::manifest::Workload;
use crate::work::Work;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Reason for a successful workload sync
pub const EVENT_REASON_SYNC_WORKLOAD_SUCCEED: &str = "SyncWorkloadSucceed";

/// Reason for a failed workload sync
pub const EVENT_REASON_SYNC_WORKLOAD_FAILED: &str = "SyncWorkloadFailed";

/// Event type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventType {
    Normal,
    Warning,
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventType::Normal => f.write_str("Normal"),
            EventType::Warning => f.write_str("Warning"),
        }
    }
}

/// The object an event is about
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectReference {
    pub api_version: String,
    pub kind: String,
    pub namespace: String,
    pub name: String,
}

impl ObjectReference {
    pub fn for_work(work: &Work) -> Self {
        Self {
            api_version: "work.fleetwork.io/v1alpha1".to_string(),
            kind: "Work".to_string(),
            namespace: work.metadata.namespace.clone(),
            name: work.metadata.name.clone(),
        }
    }

    /// `None` if the workload has no name to point at
    pub fn for_workload(workload: &Workload) -> Option<Self> {
        if workload.name().is_empty() {
            return None;
        }
        Some(Self {
            api_version: workload.api_version().to_string(),
            kind: workload.kind().to_string(),
            namespace: workload.namespace().to_string(),
            name: workload.name().to_string(),
        })
    }
}

impl fmt::Display for ObjectReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.namespace.is_empty() {
            write!(f, "{} {}", self.kind, self.name)
        } else {
            write!(f, "{} {}/{}", self.kind, self.namespace, self.name)
        }
    }
}

/// Envelope for a recorded event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkEvent {
    /// Unique event ID
    pub id: Uuid,

    /// Event timestamp
    pub timestamp: chrono::DateTime<chrono::Utc>,

    /// Component that emitted the event
    pub source: String,

    pub involved_object: ObjectReference,

    pub event_type: EventType,

    pub reason: String,

    pub message: String,
}

impl WorkEvent {
    pub fn new(
        source: impl Into<String>,
        involved_object: ObjectReference,
        event_type: EventType,
        reason: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: chrono::Utc::now(),
            source: source.into(),
            involved_object,
            event_type,
            reason: reason.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_reference_for_named_workload() {
        let workload = Workload::from_value(json!({
            "apiVersion": "apps/v1",
            "kind": "Deployment",
            "metadata": {"name": "nginx", "namespace": "default"}
        }))
        .unwrap();
        let reference = ObjectReference::for_workload(&workload).unwrap();
        assert_eq!(reference.to_string(), "Deployment default/nginx");
    }

    #[test]
    fn test_reference_requires_name() {
        let workload = Workload::from_value(json!({"apiVersion": "v1", "kind": "Pod"})).unwrap();
        assert!(ObjectReference::for_workload(&workload).is_none());
    }
}
