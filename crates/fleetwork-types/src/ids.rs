//! Identifiers for Works and member clusters
//!
//! Works live in execution namespaces named `fleetwork-es-<cluster>`; the
//! namespace is the only place a Work records its target cluster.

use crate::error::NamespaceError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Prefix of every execution namespace
pub const EXECUTION_SPACE_PREFIX: &str = "fleetwork-es-";

/// Name of a member cluster
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClusterName(String);

impl ClusterName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClusterName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for ClusterName {
    fn from(name: String) -> Self {
        Self(name)
    }
}

impl From<&str> for ClusterName {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// Namespace/name identity of a Work
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WorkKey {
    pub namespace: String,
    pub name: String,
}

impl WorkKey {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Key for a Work targeting `cluster`
    pub fn for_cluster(cluster: &ClusterName, name: impl Into<String>) -> Self {
        Self::new(execution_namespace(cluster), name)
    }
}

impl fmt::Display for WorkKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Execution namespace holding the Works of `cluster`
pub fn execution_namespace(cluster: &ClusterName) -> String {
    format!("{}{}", EXECUTION_SPACE_PREFIX, cluster)
}

/// Recover the member cluster encoded in an execution namespace
pub fn cluster_name_from_namespace(namespace: &str) -> Result<ClusterName, NamespaceError> {
    let name = namespace
        .strip_prefix(EXECUTION_SPACE_PREFIX)
        .ok_or_else(|| NamespaceError::NotExecutionSpace(namespace.to_string()))?;
    if name.is_empty() {
        return Err(NamespaceError::EmptyClusterName(namespace.to_string()));
    }
    Ok(ClusterName::new(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_namespace_round_trip() {
        let cluster = ClusterName::new("member1");
        let ns = execution_namespace(&cluster);
        assert_eq!(ns, "fleetwork-es-member1");
        assert_eq!(cluster_name_from_namespace(&ns).unwrap(), cluster);
    }

    #[test]
    fn test_namespace_without_prefix_rejected() {
        let err = cluster_name_from_namespace("default").unwrap_err();
        assert!(matches!(err, NamespaceError::NotExecutionSpace(_)));
    }

    #[test]
    fn test_bare_prefix_rejected() {
        let err = cluster_name_from_namespace(EXECUTION_SPACE_PREFIX).unwrap_err();
        assert!(matches!(err, NamespaceError::EmptyClusterName(_)));
    }

    #[test]
    fn test_work_key_display() {
        let key = WorkKey::for_cluster(&ClusterName::new("m2"), "nginx-work");
        assert_eq!(key.to_string(), "fleetwork-es-m2/nginx-work");
    }
}
