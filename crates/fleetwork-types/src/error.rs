//! Error types for decoding fleetwork records

use thiserror::Error;

/// A manifest could not be decoded into a workload
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ManifestError {
    /// Raw bytes are not valid JSON
    #[error("invalid JSON: {0}")]
    InvalidJson(String),

    /// Valid JSON but not an object
    #[error("manifest is not a JSON object")]
    NotAnObject,

    /// Object has no `kind`
    #[error("Object 'Kind' is missing in manifest")]
    MissingKind,

    /// Object has no `apiVersion`
    #[error("Object 'apiVersion' is missing in manifest")]
    MissingApiVersion,
}

/// A namespace does not encode a member cluster
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NamespaceError {
    /// Namespace lacks the execution-space prefix
    #[error("namespace {0} is not an execution space")]
    NotExecutionSpace(String),

    /// Prefix present but no cluster name follows
    #[error("namespace {0} has an empty cluster name")]
    EmptyClusterName(String),
}
