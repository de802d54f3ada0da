//! Karmada tool catalog
//!
//! One module per toolset. Each builds its [`Toolset`] from a shared
//! [`ClientProviders`], so tests can swap in in-memory clients.

pub mod cluster;
pub mod deployment;
pub mod namespace;
pub mod policy;
pub mod resource;

use kmcp_client::{ClientError, ClientProviders, ClusterClient, ObjectMeta, WorkloadClient};
use kmcp_toolset::{ConstructionError, ToolError, ToolsetGroup, ALL_TOOLSETS};
use serde_json::{json, Map, Value};
use std::future::Future;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

pub const DEFAULT_TOOLSETS: &[&str] = &[ALL_TOOLSETS];

/// Every Karmada toolset, in registration order
pub fn default_toolset_group(
    providers: &ClientProviders,
) -> Result<ToolsetGroup, ConstructionError> {
    let mut group = ToolsetGroup::new();
    group.add_toolset(cluster::toolset(providers))?;
    group.add_toolset(namespace::toolset(providers))?;
    group.add_toolset(deployment::toolset(providers))?;
    group.add_toolset(policy::toolset(providers))?;
    group.add_toolset(resource::toolset(providers))?;
    Ok(group)
}

/// Await a client call unless the request is cancelled first.
///
/// The full client error only goes to the log; callers get the redacted form.
pub(crate) async fn call<T, F>(ctx: &CancellationToken, fut: F) -> Result<T, ToolError>
where
    F: Future<Output = Result<T, ClientError>>,
{
    tokio::select! {
        _ = ctx.cancelled() => Err(ToolError::Cancelled),
        res = fut => res.map_err(client_failure),
    }
}

pub(crate) fn client_failure(err: ClientError) -> ToolError {
    debug!(kind = err.kind(), error = %err, "Client call failed");
    ToolError::failed(err.redacted())
}

pub(crate) async fn cluster_client(
    providers: &ClientProviders,
    ctx: &CancellationToken,
) -> Result<Arc<dyn ClusterClient>, ToolError> {
    tokio::select! {
        _ = ctx.cancelled() => Err(ToolError::Cancelled),
        res = providers.cluster_client(ctx.clone()) => {
            res.map_err(|e| ToolError::client(e.redacted()))
        }
    }
}

pub(crate) async fn workload_client(
    providers: &ClientProviders,
    ctx: &CancellationToken,
) -> Result<Arc<dyn WorkloadClient>, ToolError> {
    tokio::select! {
        _ = ctx.cancelled() => Err(ToolError::Cancelled),
        res = providers.workload_client(ctx.clone()) => {
            res.map_err(|e| ToolError::client(e.redacted()))
        }
    }
}

/// `{"<key>": [name, ...]}`
pub(crate) fn names(key: &str, items: &[ObjectMeta]) -> Value {
    let names: Vec<&str> = items.iter().map(|m| m.name.as_str()).collect();
    json!({ key: names })
}

/// Parse a YAML manifest and pin its identity.
///
/// `metadata.name` and `metadata.namespace` are overwritten; `apiVersion`
/// and `kind` are filled in when the document leaves them out.
pub(crate) fn manifest(
    content: &str,
    name: &str,
    namespace: &str,
    api_version: &str,
    kind: &str,
) -> Result<Value, ToolError> {
    let mut doc: Value = serde_yaml::from_str(content)
        .map_err(|e| ToolError::invalid_content(format!("content is not valid YAML: {e}")))?;

    let Value::Object(obj) = &mut doc else {
        return Err(ToolError::invalid_content("content must be a YAML mapping"));
    };
    obj.entry("apiVersion").or_insert_with(|| Value::from(api_version));
    obj.entry("kind").or_insert_with(|| Value::from(kind));

    let metadata = obj
        .entry("metadata")
        .or_insert_with(|| Value::Object(Map::new()));
    if !metadata.is_object() {
        *metadata = Value::Object(Map::new());
    }
    if let Value::Object(meta) = metadata {
        meta.insert("name".to_string(), Value::from(name));
        meta.insert("namespace".to_string(), Value::from(namespace));
    }
    Ok(doc)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manifest_pins_identity() {
        let doc = manifest(
            "metadata:\n  name: other\nspec:\n  replicas: 2\n",
            "nginx",
            "default",
            "apps/v1",
            "Deployment",
        )
        .unwrap();
        assert_eq!(doc["metadata"]["name"], "nginx");
        assert_eq!(doc["metadata"]["namespace"], "default");
        assert_eq!(doc["apiVersion"], "apps/v1");
        assert_eq!(doc["kind"], "Deployment");
        assert_eq!(doc["spec"]["replicas"], 2);
    }

    #[test]
    fn test_manifest_rejects_bad_content() {
        assert!(matches!(
            manifest("- a\n- b\n", "x", "default", "v1", "Thing"),
            Err(ToolError::InvalidContent(_))
        ));
        assert!(matches!(
            manifest("key: [unclosed", "x", "default", "v1", "Thing"),
            Err(ToolError::InvalidContent(_))
        ));
    }

    #[test]
    fn test_default_group_has_every_toolset() {
        let providers = ClientProviders::lazy(Default::default());
        let group = default_toolset_group(&providers).unwrap();
        let names: Vec<&str> = group.toolsets().map(|t| t.name()).collect();
        assert_eq!(names, ["cluster", "namespace", "deployment", "policy", "resource"]);
    }
}
