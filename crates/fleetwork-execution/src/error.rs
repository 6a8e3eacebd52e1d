//! Error types for the execution layer

use crate::store::StoreError;
use fleetwork_types::{ClusterName, ManifestError, NamespaceError};
use std::fmt;
use thiserror::Error;

/// Remote operation that failed against a member cluster
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteOperation {
    Lookup,
    Create,
    Update,
    Delete,
}

impl fmt::Display for RemoteOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RemoteOperation::Lookup => "get",
            RemoteOperation::Create => "create",
            RemoteOperation::Update => "update",
            RemoteOperation::Delete => "delete",
        };
        f.write_str(s)
    }
}

/// Execution layer error type
#[derive(Debug, Error)]
pub enum ExecutionError {
    /// A record vanished
    #[error("{kind} {name} not found")]
    NotFound { kind: &'static str, name: String },

    /// Target cluster cannot take writes right now
    #[error("cluster({0}) not ready")]
    ClusterNotReady(ClusterName),

    /// Write rejected against a stale revision
    #[error("conflict: {0}")]
    Conflict(String),

    /// Manifest could not be decoded
    #[error("manifest {index} is malformed: {source}")]
    ManifestMalformed { index: usize, source: ManifestError },

    /// Create/update/delete against the member cluster failed
    #[error("failed to {operation} resource({object}) in cluster({cluster}): {reason}")]
    RemoteApplyFailed {
        cluster: ClusterName,
        operation: RemoteOperation,
        object: String,
        reason: String,
    },

    /// Writing the Work back failed
    #[error("persistence failed: {0}")]
    PersistenceFailed(String),

    /// Work lives outside an execution namespace
    #[error(transparent)]
    InvalidNamespace(#[from] NamespaceError),

    /// Reconcile deadline passed before the next remote call
    #[error("reconcile deadline exceeded")]
    DeadlineExceeded,

    /// Several independent failures from one pass
    #[error(transparent)]
    Aggregate(AggregateError),
}

/// Result type for execution operations
pub type Result<T> = std::result::Result<T, ExecutionError>;

impl ExecutionError {
    pub fn work_not_found(name: impl fmt::Display) -> Self {
        Self::NotFound {
            kind: "Work",
            name: name.to_string(),
        }
    }

    pub fn cluster_not_found(name: &ClusterName) -> Self {
        Self::NotFound {
            kind: "Cluster",
            name: name.to_string(),
        }
    }

    /// Map a Work store failure
    pub fn from_work_store(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(name) => Self::work_not_found(name),
            StoreError::Conflict(msg) => Self::Conflict(msg),
            StoreError::Internal(msg) => Self::PersistenceFailed(msg),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }

    /// Whether redelivering the same Work can succeed without outside changes
    ///
    /// Every failure is redelivered; this only picks the delay.
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            Self::ManifestMalformed { .. } | Self::InvalidNamespace(_)
        )
    }

    /// Collapse a list of errors; `None` when empty
    pub fn aggregate(errors: Vec<ExecutionError>) -> Option<Self> {
        match errors.len() {
            0 => None,
            _ => Some(Self::Aggregate(AggregateError(errors))),
        }
    }
}

/// Ordered collection of errors from one pass
#[derive(Debug)]
pub struct AggregateError(Vec<ExecutionError>);

impl AggregateError {
    /// Render errors the way an aggregate displays them
    pub fn render(errors: &[ExecutionError]) -> String {
        match errors {
            [only] => only.to_string(),
            _ => {
                let parts: Vec<String> = errors.iter().map(ToString::to_string).collect();
                format!("[{}]", parts.join(", "))
            }
        }
    }

    pub fn errors(&self) -> &[ExecutionError] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for AggregateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&Self::render(&self.0))
    }
}

impl std::error::Error for AggregateError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aggregate_single_renders_bare() {
        let err = ExecutionError::aggregate(vec![ExecutionError::Conflict("rv 3".into())]).unwrap();
        assert_eq!(err.to_string(), "conflict: rv 3");
    }

    #[test]
    fn test_aggregate_many_renders_list() {
        let err = ExecutionError::aggregate(vec![
            ExecutionError::ManifestMalformed {
                index: 0,
                source: ManifestError::NotAnObject,
            },
            ExecutionError::ClusterNotReady(ClusterName::new("m1")),
        ])
        .unwrap();
        assert_eq!(
            err.to_string(),
            "[manifest 0 is malformed: manifest is not a JSON object, cluster(m1) not ready]"
        );
    }

    #[test]
    fn test_empty_aggregate_is_none() {
        assert!(ExecutionError::aggregate(Vec::new()).is_none());
    }

    #[test]
    fn test_from_work_store() {
        let err = ExecutionError::from_work_store(StoreError::NotFound("ns/w".into()));
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "Work ns/w not found");
        assert!(ExecutionError::from_work_store(StoreError::Conflict("rv".into())).is_conflict());
        assert!(matches!(
            ExecutionError::from_work_store(StoreError::Internal("disk".into())),
            ExecutionError::PersistenceFailed(_)
        ));
    }

    #[test]
    fn test_retryable() {
        assert!(ExecutionError::ClusterNotReady(ClusterName::new("m")).is_retryable());
        assert!(ExecutionError::Conflict(String::new()).is_retryable());
        assert!(!ExecutionError::ManifestMalformed {
            index: 1,
            source: ManifestError::MissingKind
        }
        .is_retryable());
    }
}
