//! Resource kinds known to the REST client and their API paths

use crate::error::{ClientError, Result};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Cluster,
    Namespace,
    Deployment,
    StatefulSet,
    DaemonSet,
    Job,
    CronJob,
    Service,
    ConfigMap,
    Secret,
    Ingress,
    PropagationPolicy,
    ClusterPropagationPolicy,
    OverridePolicy,
    ClusterOverridePolicy,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Cluster => "cluster",
            ResourceKind::Namespace => "namespace",
            ResourceKind::Deployment => "deployment",
            ResourceKind::StatefulSet => "statefulset",
            ResourceKind::DaemonSet => "daemonset",
            ResourceKind::Job => "job",
            ResourceKind::CronJob => "cronjob",
            ResourceKind::Service => "service",
            ResourceKind::ConfigMap => "configmap",
            ResourceKind::Secret => "secret",
            ResourceKind::Ingress => "ingress",
            ResourceKind::PropagationPolicy => "propagationpolicy",
            ResourceKind::ClusterPropagationPolicy => "clusterpropagationpolicy",
            ResourceKind::OverridePolicy => "overridepolicy",
            ResourceKind::ClusterOverridePolicy => "clusteroverridepolicy",
        }
    }

    fn api_prefix(&self) -> &'static str {
        match self {
            ResourceKind::Namespace
            | ResourceKind::Service
            | ResourceKind::ConfigMap
            | ResourceKind::Secret => "/api/v1",
            ResourceKind::Deployment | ResourceKind::StatefulSet | ResourceKind::DaemonSet => {
                "/apis/apps/v1"
            }
            ResourceKind::Job | ResourceKind::CronJob => "/apis/batch/v1",
            ResourceKind::Ingress => "/apis/networking.k8s.io/v1",
            ResourceKind::Cluster => "/apis/cluster.karmada.io/v1alpha1",
            ResourceKind::PropagationPolicy
            | ResourceKind::ClusterPropagationPolicy
            | ResourceKind::OverridePolicy
            | ResourceKind::ClusterOverridePolicy => "/apis/policy.karmada.io/v1alpha1",
        }
    }

    pub fn plural(&self) -> &'static str {
        match self {
            ResourceKind::Cluster => "clusters",
            ResourceKind::Namespace => "namespaces",
            ResourceKind::Deployment => "deployments",
            ResourceKind::StatefulSet => "statefulsets",
            ResourceKind::DaemonSet => "daemonsets",
            ResourceKind::Job => "jobs",
            ResourceKind::CronJob => "cronjobs",
            ResourceKind::Service => "services",
            ResourceKind::ConfigMap => "configmaps",
            ResourceKind::Secret => "secrets",
            ResourceKind::Ingress => "ingresses",
            ResourceKind::PropagationPolicy => "propagationpolicies",
            ResourceKind::ClusterPropagationPolicy => "clusterpropagationpolicies",
            ResourceKind::OverridePolicy => "overridepolicies",
            ResourceKind::ClusterOverridePolicy => "clusteroverridepolicies",
        }
    }

    pub fn is_namespaced(&self) -> bool {
        !matches!(
            self,
            ResourceKind::Cluster
                | ResourceKind::Namespace
                | ResourceKind::ClusterPropagationPolicy
                | ResourceKind::ClusterOverridePolicy
        )
    }

    /// Collection URL path. Cluster-scoped kinds ignore `namespace`.
    pub fn collection_path(&self, namespace: Option<&str>) -> Result<String> {
        if !self.is_namespaced() {
            return Ok(format!("{}/{}", self.api_prefix(), self.plural()));
        }
        let namespace = namespace
            .filter(|ns| !ns.is_empty())
            .ok_or(ClientError::NamespaceRequired(self.as_str()))?;
        validate_name(namespace)?;
        Ok(format!(
            "{}/namespaces/{}/{}",
            self.api_prefix(),
            namespace,
            self.plural()
        ))
    }

    pub fn object_path(&self, namespace: Option<&str>, name: &str) -> Result<String> {
        validate_name(name)?;
        Ok(format!("{}/{}", self.collection_path(namespace)?, name))
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceKind {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self> {
        let kind = match s.trim().to_lowercase().as_str() {
            "cluster" | "clusters" => ResourceKind::Cluster,
            "namespace" | "namespaces" | "ns" => ResourceKind::Namespace,
            "deployment" | "deployments" | "deploy" => ResourceKind::Deployment,
            "statefulset" | "statefulsets" | "sts" => ResourceKind::StatefulSet,
            "daemonset" | "daemonsets" | "ds" => ResourceKind::DaemonSet,
            "job" | "jobs" => ResourceKind::Job,
            "cronjob" | "cronjobs" | "cj" => ResourceKind::CronJob,
            "service" | "services" | "svc" => ResourceKind::Service,
            "configmap" | "configmaps" | "cm" => ResourceKind::ConfigMap,
            "secret" | "secrets" => ResourceKind::Secret,
            "ingress" | "ingresses" | "ing" => ResourceKind::Ingress,
            "propagationpolicy" | "propagationpolicies" | "pp" => ResourceKind::PropagationPolicy,
            "clusterpropagationpolicy" | "clusterpropagationpolicies" | "cpp" => {
                ResourceKind::ClusterPropagationPolicy
            }
            "overridepolicy" | "overridepolicies" | "op" => ResourceKind::OverridePolicy,
            "clusteroverridepolicy" | "clusteroverridepolicies" | "cop" => {
                ResourceKind::ClusterOverridePolicy
            }
            _ => return Err(ClientError::UnknownKind(s.to_string())),
        };
        Ok(kind)
    }
}

/// Names end up in URL paths, so anything that could alter the path is rejected.
pub fn validate_name(name: &str) -> Result<()> {
    let bad = name.is_empty()
        || name == "."
        || name == ".."
        || name.chars().any(|c| matches!(c, '/' | '?' | '#' | '%') || c.is_whitespace());
    if bad {
        return Err(ClientError::InvalidName(name.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_kinds() {
        assert_eq!("Deployment".parse::<ResourceKind>().unwrap(), ResourceKind::Deployment);
        assert_eq!("pp".parse::<ResourceKind>().unwrap(), ResourceKind::PropagationPolicy);
        assert!(matches!(
            "widget".parse::<ResourceKind>(),
            Err(ClientError::UnknownKind(_))
        ));
    }

    #[test]
    fn test_paths() {
        assert_eq!(
            ResourceKind::Deployment.object_path(Some("default"), "nginx").unwrap(),
            "/apis/apps/v1/namespaces/default/deployments/nginx"
        );
        assert_eq!(
            ResourceKind::Cluster.collection_path(Some("ignored")).unwrap(),
            "/apis/cluster.karmada.io/v1alpha1/clusters"
        );
        assert_eq!(
            ResourceKind::Namespace.object_path(None, "demo").unwrap(),
            "/api/v1/namespaces/demo"
        );
    }

    #[test]
    fn test_namespace_required() {
        assert!(matches!(
            ResourceKind::ConfigMap.collection_path(None),
            Err(ClientError::NamespaceRequired("configmap"))
        ));
    }

    #[test]
    fn test_rejects_path_tricks() {
        assert!(validate_name("../secrets").is_err());
        assert!(validate_name("a b").is_err());
        assert!(validate_name("nginx-1").is_ok());
    }
}
