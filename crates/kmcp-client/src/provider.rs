//! Injectable client factories
//!
//! Tools receive a [`ClientProviders`] at construction time and ask it for
//! a client on every call. The lazy provider builds the real
//! [`KarmadaClient`] on first use, so the server starts even when the
//! control plane is unreachable.

use crate::api::{ClusterClient, WorkloadClient};
use crate::client::KarmadaClient;
use crate::error::{ClientError, Result};
use crate::kubeconfig::{ClientConfig, ClientSettings};
use futures::future::BoxFuture;
use futures::FutureExt;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tokio_util::sync::CancellationToken;

pub type GetClusterClientFn = Arc<
    dyn Fn(CancellationToken) -> BoxFuture<'static, Result<Arc<dyn ClusterClient>>> + Send + Sync,
>;

pub type GetWorkloadClientFn = Arc<
    dyn Fn(CancellationToken) -> BoxFuture<'static, Result<Arc<dyn WorkloadClient>>> + Send + Sync,
>;

#[derive(Clone)]
pub struct ClientProviders {
    cluster: GetClusterClientFn,
    workload: GetWorkloadClientFn,
}

impl std::fmt::Debug for ClientProviders {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientProviders").finish_non_exhaustive()
    }
}

impl ClientProviders {
    pub fn new(cluster: GetClusterClientFn, workload: GetWorkloadClientFn) -> Self {
        Self { cluster, workload }
    }

    /// Serve both capabilities from one shared client
    pub fn from_client<C>(client: Arc<C>) -> Self
    where
        C: ClusterClient + WorkloadClient + 'static,
    {
        let cluster: Arc<dyn ClusterClient> = client.clone();
        let workload: Arc<dyn WorkloadClient> = client;
        Self {
            cluster: Arc::new(move |_| futures::future::ready(Ok(cluster.clone())).boxed()),
            workload: Arc::new(move |_| futures::future::ready(Ok(workload.clone())).boxed()),
        }
    }

    /// Build a [`KarmadaClient`] on first request and reuse it afterwards.
    /// A failed build is retried on the next request.
    pub fn lazy(settings: ClientSettings) -> Self {
        let cell: Arc<OnceCell<Arc<KarmadaClient>>> = Arc::new(OnceCell::new());
        let settings = Arc::new(settings);

        let get = move || {
            let cell = cell.clone();
            let settings = settings.clone();
            async move {
                let client = cell
                    .get_or_try_init(|| async {
                        let config = ClientConfig::load(&settings).await?;
                        KarmadaClient::new(config).map(Arc::new)
                    })
                    .await?;
                Ok::<_, ClientError>(client.clone())
            }
        };
        let get_cluster = get.clone();

        Self {
            cluster: Arc::new(move |_| {
                get_cluster()
                    .map(|r| r.map(|c| c as Arc<dyn ClusterClient>))
                    .boxed()
            }),
            workload: Arc::new(move |_| {
                get()
                    .map(|r| r.map(|c| c as Arc<dyn WorkloadClient>))
                    .boxed()
            }),
        }
    }

    pub async fn cluster_client(&self, ctx: CancellationToken) -> Result<Arc<dyn ClusterClient>> {
        (self.cluster)(ctx).await
    }

    pub async fn workload_client(&self, ctx: CancellationToken) -> Result<Arc<dyn WorkloadClient>> {
        (self.workload)(ctx).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[tokio::test]
    async fn test_lazy_surfaces_config_error_per_request() {
        let providers = ClientProviders::lazy(ClientSettings {
            kubeconfig: Some(PathBuf::from("/nonexistent/kubeconfig")),
            context: None,
            skip_tls_verify: false,
        });
        let err = providers
            .cluster_client(CancellationToken::new())
            .await
            .err()
            .unwrap();
        assert!(matches!(err, ClientError::Config(_)));

        // Still fails the same way next time, nothing was cached.
        assert!(providers
            .workload_client(CancellationToken::new())
            .await
            .is_err());
    }
}
