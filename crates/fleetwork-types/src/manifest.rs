//! Manifests and decoded workloads
//!
//! A [`Manifest`] is an opaque serialized document carried in a Work. It is
//! only interpreted when decoded into a [`Workload`], an unstructured object
//! exposing the handful of metadata fields the execution layer needs.

use crate::error::ManifestError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::fmt;

/// One serialized workload document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    raw: String,
}

impl Manifest {
    /// Wrap raw text without validating it
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self { raw: raw.into() }
    }

    pub fn from_value(value: &Value) -> Self {
        Self {
            raw: value.to_string(),
        }
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn decode(&self) -> Result<Workload, ManifestError> {
        Workload::from_manifest(self)
    }
}

// Object documents are embedded as JSON objects and come back in compact
// form. Any other raw text, including JSON scalars and arrays, is carried
// verbatim as a string.
impl Serialize for Manifest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match serde_json::from_str::<Value>(&self.raw) {
            Ok(value @ Value::Object(_)) => value.serialize(serializer),
            _ => serializer.serialize_str(&self.raw),
        }
    }
}

impl<'de> Deserialize<'de> for Manifest {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(match value {
            Value::String(raw) => Manifest::from_raw(raw),
            other => Manifest::from_value(&other),
        })
    }
}

/// Group, version and kind of a workload
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GroupVersionKind {
    pub group: String,
    pub version: String,
    pub kind: String,
}

impl GroupVersionKind {
    /// Split an `apiVersion` such as `apps/v1` or `v1`
    pub fn from_api_version(api_version: &str, kind: &str) -> Self {
        let (group, version) = match api_version.split_once('/') {
            Some((group, version)) => (group, version),
            None => ("", api_version),
        };
        Self {
            group: group.to_string(),
            version: version.to_string(),
            kind: kind.to_string(),
        }
    }
}

impl fmt::Display for GroupVersionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.group.is_empty() {
            write!(f, "{}, Kind={}", self.version, self.kind)
        } else {
            write!(f, "{}/{}, Kind={}", self.group, self.version, self.kind)
        }
    }
}

/// A decoded manifest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Workload {
    object: Map<String, Value>,
}

impl Workload {
    pub fn from_manifest(manifest: &Manifest) -> Result<Self, ManifestError> {
        let value: Value = serde_json::from_str(manifest.raw())
            .map_err(|e| ManifestError::InvalidJson(e.to_string()))?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> Result<Self, ManifestError> {
        let Value::Object(object) = value else {
            return Err(ManifestError::NotAnObject);
        };
        let workload = Self { object };
        if workload.kind().is_empty() {
            return Err(ManifestError::MissingKind);
        }
        if workload.api_version().is_empty() {
            return Err(ManifestError::MissingApiVersion);
        }
        Ok(workload)
    }

    pub fn api_version(&self) -> &str {
        self.object
            .get("apiVersion")
            .and_then(Value::as_str)
            .unwrap_or_default()
    }

    pub fn kind(&self) -> &str {
        self.object
            .get("kind")
            .and_then(Value::as_str)
            .unwrap_or_default()
    }

    pub fn group_version_kind(&self) -> GroupVersionKind {
        GroupVersionKind::from_api_version(self.api_version(), self.kind())
    }

    pub fn namespace(&self) -> &str {
        self.metadata_str("namespace")
    }

    pub fn name(&self) -> &str {
        self.metadata_str("name")
    }

    pub fn resource_version(&self) -> &str {
        self.metadata_str("resourceVersion")
    }

    pub fn set_resource_version(&mut self, version: impl Into<String>) {
        let version = version.into();
        self.with_metadata(|metadata| {
            metadata.insert("resourceVersion".to_string(), Value::String(version));
        });
    }

    pub fn label(&self, key: &str) -> Option<&str> {
        self.object
            .get("metadata")
            .and_then(|m| m.get("labels"))
            .and_then(|l| l.get(key))
            .and_then(Value::as_str)
    }

    /// Set a label, creating `metadata.labels` when absent
    pub fn merge_label(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let (key, value) = (key.into(), value.into());
        self.with_metadata(|metadata| {
            let labels = metadata
                .entry("labels")
                .or_insert_with(|| Value::Object(Map::new()));
            match labels {
                Value::Object(labels) => {
                    labels.insert(key, Value::String(value));
                }
                other => {
                    let mut fresh = Map::new();
                    fresh.insert(key, Value::String(value));
                    *other = Value::Object(fresh);
                }
            }
        });
    }

    pub fn as_object(&self) -> &Map<String, Value> {
        &self.object
    }

    fn metadata_str(&self, field: &str) -> &str {
        self.object
            .get("metadata")
            .and_then(|m| m.get(field))
            .and_then(Value::as_str)
            .unwrap_or_default()
    }

    fn with_metadata(&mut self, f: impl FnOnce(&mut Map<String, Value>)) {
        let slot = self
            .object
            .entry("metadata")
            .or_insert_with(|| Value::Object(Map::new()));
        match slot {
            Value::Object(metadata) => f(metadata),
            other => {
                let mut metadata = Map::new();
                f(&mut metadata);
                *other = Value::Object(metadata);
            }
        }
    }
}

impl fmt::Display for Workload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.namespace().is_empty() {
            write!(f, "{}", self.name())
        } else {
            write!(f, "{}/{}", self.namespace(), self.name())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn deployment() -> Value {
        json!({
            "apiVersion": "apps/v1",
            "kind": "Deployment",
            "metadata": {"name": "nginx", "namespace": "default"},
            "spec": {"replicas": 2}
        })
    }

    #[test]
    fn test_decode_deployment() {
        let workload = Manifest::from_value(&deployment()).decode().unwrap();
        assert_eq!(workload.kind(), "Deployment");
        assert_eq!(workload.name(), "nginx");
        assert_eq!(workload.namespace(), "default");
        assert_eq!(workload.to_string(), "default/nginx");

        let gvk = workload.group_version_kind();
        assert_eq!(gvk.group, "apps");
        assert_eq!(gvk.version, "v1");
        assert_eq!(gvk.to_string(), "apps/v1, Kind=Deployment");
    }

    #[test]
    fn test_non_object_raw_text_survives_serde() {
        for raw in ["\"abc\"", "42", "[1, 2]", "{not json", ""] {
            let manifest = Manifest::from_raw(raw);
            let encoded = serde_json::to_string(&manifest).unwrap();
            let decoded: Manifest = serde_json::from_str(&encoded).unwrap();
            assert_eq!(decoded.raw(), raw);
        }
    }

    #[test]
    fn test_core_group_is_empty() {
        let gvk = GroupVersionKind::from_api_version("v1", "ConfigMap");
        assert_eq!(gvk.group, "");
        assert_eq!(gvk.to_string(), "v1, Kind=ConfigMap");
    }

    #[test]
    fn test_malformed_manifests() {
        assert!(matches!(
            Manifest::from_raw("{not json").decode(),
            Err(ManifestError::InvalidJson(_))
        ));
        assert_eq!(
            Manifest::from_raw("[1, 2]").decode(),
            Err(ManifestError::NotAnObject)
        );
        assert_eq!(
            Manifest::from_raw(r#"{"apiVersion": "v1"}"#).decode(),
            Err(ManifestError::MissingKind)
        );
        assert_eq!(
            Manifest::from_raw(r#"{"kind": "Pod"}"#).decode(),
            Err(ManifestError::MissingApiVersion)
        );
    }

    #[test]
    fn test_merge_label_creates_metadata() {
        let mut workload = Workload::from_value(json!({"apiVersion": "v1", "kind": "Pod"})).unwrap();
        workload.merge_label("owner", "work-1");
        assert_eq!(workload.label("owner"), Some("work-1"));

        workload.merge_label("owner", "work-2");
        assert_eq!(workload.label("owner"), Some("work-2"));
    }

    #[test]
    fn test_resource_version() {
        let mut workload = Manifest::from_value(&deployment()).decode().unwrap();
        assert_eq!(workload.resource_version(), "");
        workload.set_resource_version("42");
        assert_eq!(workload.resource_version(), "42");
    }

    #[test]
    fn test_manifest_serde_embeds_json() {
        let manifest = Manifest::from_value(&deployment());
        let encoded = serde_json::to_value(&manifest).unwrap();
        assert_eq!(encoded["kind"], "Deployment");

        let broken = Manifest::from_raw("{oops");
        let encoded = serde_json::to_value(&broken).unwrap();
        assert_eq!(encoded, Value::String("{oops".to_string()));
        let decoded: Manifest = serde_json::from_value(encoded).unwrap();
        assert_eq!(decoded, broken);
    }
}
