//! Client traits consumed by the tool catalog
//!
//! Tools never talk HTTP directly. They go through these two narrow
//! interfaces, which makes every tool testable with an in-memory double.

use crate::error::Result;
use crate::kind::ResourceKind;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Label Karmada checks before propagating a namespace to member clusters
pub const SKIP_AUTO_PROPAGATION_LABEL: &str = "namespace.karmada.io/skip-auto-propagation";

/// Subset of Kubernetes object metadata used by the list tools
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMeta {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creation_timestamp: Option<String>,
}

impl ObjectMeta {
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }
}

/// Karmada API group operations (clusters, propagation policies)
#[async_trait]
pub trait ClusterClient: Send + Sync {
    async fn list_clusters(&self) -> Result<Vec<ObjectMeta>>;

    async fn list_propagation_policies(&self, namespace: &str) -> Result<Vec<ObjectMeta>>;

    async fn get_propagation_policy(&self, namespace: &str, name: &str) -> Result<Value>;

    async fn create_propagation_policy(&self, namespace: &str, policy: Value) -> Result<Value>;

    async fn delete_propagation_policy(&self, namespace: &str, name: &str) -> Result<()>;
}

/// Kubernetes API operations served by the Karmada API server
#[async_trait]
pub trait WorkloadClient: Send + Sync {
    async fn list_namespaces(&self) -> Result<Vec<ObjectMeta>>;

    async fn create_namespace(&self, name: &str, skip_auto_propagation: bool) -> Result<Value>;

    async fn list_deployments(&self, namespace: &str) -> Result<Vec<ObjectMeta>>;

    async fn create_deployment(&self, namespace: &str, deployment: Value) -> Result<Value>;

    async fn get_resource(
        &self,
        kind: ResourceKind,
        namespace: Option<&str>,
        name: &str,
    ) -> Result<Value>;

    /// `delete_now` skips the grace period
    async fn delete_resource(
        &self,
        kind: ResourceKind,
        namespace: Option<&str>,
        name: &str,
        delete_now: bool,
    ) -> Result<()>;
}

/// Body for creating a namespace
pub fn namespace_manifest(name: &str, skip_auto_propagation: bool) -> Value {
    let mut labels = serde_json::Map::new();
    if skip_auto_propagation {
        labels.insert(SKIP_AUTO_PROPAGATION_LABEL.to_string(), Value::from("true"));
    }
    serde_json::json!({
        "apiVersion": "v1",
        "kind": "Namespace",
        "metadata": {
            "name": name,
            "labels": labels,
        }
    })
}

/// Pull object metadata out of a Kubernetes list response
pub fn list_metadata(list: &Value) -> Result<Vec<ObjectMeta>> {
    let items = match list.get("items") {
        Some(Value::Array(items)) => items,
        _ => return Ok(Vec::new()),
    };
    items
        .iter()
        .filter_map(|item| item.get("metadata"))
        .map(|meta| serde_json::from_value(meta.clone()).map_err(Into::into))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_namespace_manifest_label() {
        let ns = namespace_manifest("demo", true);
        assert_eq!(ns["metadata"]["labels"][SKIP_AUTO_PROPAGATION_LABEL], "true");

        let ns = namespace_manifest("demo", false);
        assert_eq!(ns["metadata"]["labels"], json!({}));
    }

    #[test]
    fn test_list_metadata() {
        let list = json!({
            "kind": "ClusterList",
            "items": [
                {"metadata": {"name": "member1", "creationTimestamp": "2024-01-01T00:00:00Z"}},
                {"metadata": {"name": "member2", "labels": {"env": "prod"}}}
            ]
        });
        let metas = list_metadata(&list).unwrap();
        assert_eq!(metas.len(), 2);
        assert_eq!(metas[0].name, "member1");
        assert_eq!(metas[0].creation_timestamp.as_deref(), Some("2024-01-01T00:00:00Z"));
        assert_eq!(metas[1].labels.get("env").map(String::as_str), Some("prod"));

        assert!(list_metadata(&json!({})).unwrap().is_empty());
    }
}
