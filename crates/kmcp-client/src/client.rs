//! REST client for the Karmada API server

use crate::api::{list_metadata, namespace_manifest, ClusterClient, ObjectMeta, WorkloadClient};
use crate::error::{ClientError, Result};
use crate::kind::ResourceKind;
use crate::kubeconfig::{Auth, ClientConfig};
use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP client bound to one Karmada API server
#[derive(Debug, Clone)]
pub struct KarmadaClient {
    http: reqwest::Client,
    base_url: String,
    auth: Auth,
}

impl KarmadaClient {
    pub fn new(config: ClientConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .use_rustls_tls();

        if let Some(ca) = &config.ca_pem {
            let cert = reqwest::Certificate::from_pem(ca)?;
            builder = builder.add_root_certificate(cert);
        }
        if let Auth::ClientCert { cert_pem, key_pem } = &config.auth {
            let mut pem = key_pem.clone();
            pem.push(b'\n');
            pem.extend_from_slice(cert_pem);
            builder = builder.identity(reqwest::Identity::from_pem(&pem)?);
        }
        if config.insecure_skip_tls_verify {
            warn!("TLS verification of the Karmada API server is disabled");
            builder = builder.danger_accept_invalid_certs(true);
        }

        Ok(Self {
            http: builder.build()?,
            base_url: config.server.trim_end_matches('/').to_string(),
            auth: config.auth,
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        debug!(%method, %url, "Karmada API request");
        let req = self.http.request(method, url);
        match &self.auth {
            Auth::Bearer(token) => req.bearer_auth(token),
            Auth::Basic { username, password } => req.basic_auth(username, Some(password)),
            Auth::None | Auth::ClientCert { .. } => req,
        }
    }

    /// Map non-success responses, using the `message` of a Kubernetes Status body when present
    async fn check(response: Response, what: &str) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<Value>(&body)
            .ok()
            .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
            .unwrap_or(body);
        if status == StatusCode::NOT_FOUND {
            return Err(ClientError::not_found(what));
        }
        Err(ClientError::Api {
            status: status.as_u16(),
            message,
        })
    }

    async fn get_json(&self, path: &str) -> Result<Value> {
        let response = self.request(Method::GET, path).send().await?;
        Ok(Self::check(response, path).await?.json().await?)
    }

    async fn post_json(&self, path: &str, body: &Value) -> Result<Value> {
        let response = self.request(Method::POST, path).json(body).send().await?;
        Ok(Self::check(response, path).await?.json().await?)
    }

    async fn delete(&self, path: &str, grace_period_seconds: Option<i64>) -> Result<()> {
        let mut req = self.request(Method::DELETE, path);
        if let Some(secs) = grace_period_seconds {
            req = req.json(&serde_json::json!({
                "apiVersion": "v1",
                "kind": "DeleteOptions",
                "gracePeriodSeconds": secs,
            }));
        }
        Self::check(req.send().await?, path).await?;
        Ok(())
    }

    async fn list(&self, kind: ResourceKind, namespace: Option<&str>) -> Result<Vec<ObjectMeta>> {
        let list = self.get_json(&kind.collection_path(namespace)?).await?;
        list_metadata(&list)
    }
}

#[async_trait]
impl ClusterClient for KarmadaClient {
    async fn list_clusters(&self) -> Result<Vec<ObjectMeta>> {
        self.list(ResourceKind::Cluster, None).await
    }

    async fn list_propagation_policies(&self, namespace: &str) -> Result<Vec<ObjectMeta>> {
        self.list(ResourceKind::PropagationPolicy, Some(namespace)).await
    }

    async fn get_propagation_policy(&self, namespace: &str, name: &str) -> Result<Value> {
        let path = ResourceKind::PropagationPolicy.object_path(Some(namespace), name)?;
        self.get_json(&path).await
    }

    async fn create_propagation_policy(&self, namespace: &str, policy: Value) -> Result<Value> {
        let path = ResourceKind::PropagationPolicy.collection_path(Some(namespace))?;
        self.post_json(&path, &policy).await
    }

    async fn delete_propagation_policy(&self, namespace: &str, name: &str) -> Result<()> {
        let path = ResourceKind::PropagationPolicy.object_path(Some(namespace), name)?;
        self.delete(&path, None).await
    }
}

#[async_trait]
impl WorkloadClient for KarmadaClient {
    async fn list_namespaces(&self) -> Result<Vec<ObjectMeta>> {
        self.list(ResourceKind::Namespace, None).await
    }

    async fn create_namespace(&self, name: &str, skip_auto_propagation: bool) -> Result<Value> {
        crate::kind::validate_name(name)?;
        let path = ResourceKind::Namespace.collection_path(None)?;
        self.post_json(&path, &namespace_manifest(name, skip_auto_propagation))
            .await
    }

    async fn list_deployments(&self, namespace: &str) -> Result<Vec<ObjectMeta>> {
        self.list(ResourceKind::Deployment, Some(namespace)).await
    }

    async fn create_deployment(&self, namespace: &str, deployment: Value) -> Result<Value> {
        let path = ResourceKind::Deployment.collection_path(Some(namespace))?;
        self.post_json(&path, &deployment).await
    }

    async fn get_resource(
        &self,
        kind: ResourceKind,
        namespace: Option<&str>,
        name: &str,
    ) -> Result<Value> {
        self.get_json(&kind.object_path(namespace, name)?).await
    }

    async fn delete_resource(
        &self,
        kind: ResourceKind,
        namespace: Option<&str>,
        name: &str,
        delete_now: bool,
    ) -> Result<()> {
        let path = kind.object_path(namespace, name)?;
        self.delete(&path, delete_now.then_some(0)).await
    }
}
