//! Connection settings for the Karmada API server
//!
//! Resolution order:
//! 1. explicit kubeconfig path
//! 2. first entry of `$KUBECONFIG`
//! 3. in-cluster service account (when `KUBERNETES_SERVICE_HOST` is set)
//! 4. `$HOME/.kube/config`

use crate::error::{ClientError, Result};
use base64::Engine;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const SERVICE_ACCOUNT_DIR: &str = "/var/run/secrets/kubernetes.io/serviceaccount";

/// User-facing knobs, usually filled from CLI flags
#[derive(Debug, Clone, Default)]
pub struct ClientSettings {
    pub kubeconfig: Option<PathBuf>,
    pub context: Option<String>,
    pub skip_tls_verify: bool,
}

#[derive(Clone)]
pub enum Auth {
    None,
    Bearer(String),
    Basic { username: String, password: String },
    ClientCert { cert_pem: Vec<u8>, key_pem: Vec<u8> },
}

impl std::fmt::Debug for Auth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Auth::None => "None",
            Auth::Bearer(_) => "Bearer(***)",
            Auth::Basic { .. } => "Basic(***)",
            Auth::ClientCert { .. } => "ClientCert(***)",
        };
        f.write_str(name)
    }
}

/// Resolved connection parameters
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub server: String,
    pub auth: Auth,
    pub ca_pem: Option<Vec<u8>>,
    pub insecure_skip_tls_verify: bool,
}

#[derive(Debug, Deserialize)]
struct Kubeconfig {
    #[serde(default)]
    clusters: Vec<NamedCluster>,
    #[serde(default)]
    contexts: Vec<NamedContext>,
    #[serde(default)]
    users: Vec<NamedUser>,
    #[serde(rename = "current-context", default)]
    current_context: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NamedCluster {
    name: String,
    cluster: ClusterEntry,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct ClusterEntry {
    server: String,
    certificate_authority_data: Option<String>,
    certificate_authority: Option<PathBuf>,
    #[serde(default)]
    insecure_skip_tls_verify: bool,
}

#[derive(Debug, Deserialize)]
struct NamedContext {
    name: String,
    context: ContextEntry,
}

#[derive(Debug, Deserialize)]
struct ContextEntry {
    cluster: String,
    #[serde(default)]
    user: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NamedUser {
    name: String,
    user: UserEntry,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct UserEntry {
    token: Option<String>,
    #[serde(rename = "tokenFile")]
    token_file: Option<PathBuf>,
    client_certificate_data: Option<String>,
    client_key_data: Option<String>,
    client_certificate: Option<PathBuf>,
    client_key: Option<PathBuf>,
    username: Option<String>,
    password: Option<String>,
}

fn decode_b64(field: &str, data: &str) -> Result<Vec<u8>> {
    base64::engine::general_purpose::STANDARD
        .decode(data.trim())
        .map_err(|e| ClientError::config(format!("invalid base64 in {field}: {e}")))
}

/// Relative paths in a kubeconfig are relative to the file itself
fn resolve_relative(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.parent().unwrap_or_else(|| Path::new(".")).join(path)
    }
}

impl ClientConfig {
    /// Resolve settings into a concrete configuration
    pub async fn load(settings: &ClientSettings) -> Result<Self> {
        let mut config = if let Some(path) = &settings.kubeconfig {
            Self::from_kubeconfig(path, settings.context.as_deref()).await?
        } else if let Some(path) = std::env::var_os("KUBECONFIG")
            .and_then(|v| std::env::split_paths(&v).next())
            .filter(|p| !p.as_os_str().is_empty())
        {
            Self::from_kubeconfig(&path, settings.context.as_deref()).await?
        } else if std::env::var_os("KUBERNETES_SERVICE_HOST").is_some() {
            Self::in_cluster().await?
        } else if let Some(home) = std::env::var_os("HOME") {
            let path = PathBuf::from(home).join(".kube").join("config");
            Self::from_kubeconfig(&path, settings.context.as_deref()).await?
        } else {
            return Err(ClientError::config(
                "no kubeconfig given and not running inside a cluster",
            ));
        };

        if settings.skip_tls_verify {
            config.insecure_skip_tls_verify = true;
        }
        info!(
            server = %config.server,
            insecure = config.insecure_skip_tls_verify,
            "Resolved Karmada API server"
        );
        Ok(config)
    }

    pub async fn from_kubeconfig(path: &Path, context: Option<&str>) -> Result<Self> {
        debug!(path = %path.display(), "Loading kubeconfig");
        let raw = tokio::fs::read_to_string(path).await.map_err(|e| {
            ClientError::config(format!("failed to read kubeconfig {}: {e}", path.display()))
        })?;
        Self::from_kubeconfig_str(&raw, context, path).await
    }

    async fn from_kubeconfig_str(raw: &str, context: Option<&str>, path: &Path) -> Result<Self> {
        let kubeconfig: Kubeconfig = serde_yaml::from_str(raw)?;

        let context_name = context
            .map(str::to_string)
            .or(kubeconfig.current_context.clone())
            .ok_or_else(|| ClientError::config("kubeconfig has no current-context"))?;

        let ctx = kubeconfig
            .contexts
            .iter()
            .find(|c| c.name == context_name)
            .ok_or_else(|| ClientError::config(format!("context {context_name:?} not found")))?;

        let cluster = kubeconfig
            .clusters
            .iter()
            .find(|c| c.name == ctx.context.cluster)
            .ok_or_else(|| {
                ClientError::config(format!("cluster {:?} not found", ctx.context.cluster))
            })?;

        let anonymous = UserEntry::default();
        let user = match &ctx.context.user {
            Some(name) => kubeconfig
                .users
                .iter()
                .find(|u| &u.name == name)
                .map(|u| &u.user)
                .ok_or_else(|| ClientError::config(format!("user {name:?} not found")))?,
            None => &anonymous,
        };

        let ca_pem = match (
            &cluster.cluster.certificate_authority_data,
            &cluster.cluster.certificate_authority,
        ) {
            (Some(data), _) => Some(decode_b64("certificate-authority-data", data)?),
            (None, Some(file)) => Some(tokio::fs::read(resolve_relative(path, file)).await?),
            (None, None) => None,
        };

        let auth = Self::user_auth(user, path).await?;

        Ok(Self {
            server: cluster.cluster.server.clone(),
            auth,
            ca_pem,
            insecure_skip_tls_verify: cluster.cluster.insecure_skip_tls_verify,
        })
    }

    async fn user_auth(user: &UserEntry, path: &Path) -> Result<Auth> {
        if let Some(token) = &user.token {
            return Ok(Auth::Bearer(token.clone()));
        }
        if let Some(file) = &user.token_file {
            let token = tokio::fs::read_to_string(resolve_relative(path, file)).await?;
            return Ok(Auth::Bearer(token.trim().to_string()));
        }

        let cert = match (&user.client_certificate_data, &user.client_certificate) {
            (Some(data), _) => Some(decode_b64("client-certificate-data", data)?),
            (None, Some(file)) => Some(tokio::fs::read(resolve_relative(path, file)).await?),
            (None, None) => None,
        };
        let key = match (&user.client_key_data, &user.client_key) {
            (Some(data), _) => Some(decode_b64("client-key-data", data)?),
            (None, Some(file)) => Some(tokio::fs::read(resolve_relative(path, file)).await?),
            (None, None) => None,
        };
        match (cert, key) {
            (Some(cert_pem), Some(key_pem)) => return Ok(Auth::ClientCert { cert_pem, key_pem }),
            (Some(_), None) | (None, Some(_)) => {
                return Err(ClientError::config(
                    "client certificate and key must be given together",
                ))
            }
            (None, None) => {}
        }

        if let (Some(username), Some(password)) = (&user.username, &user.password) {
            return Ok(Auth::Basic {
                username: username.clone(),
                password: password.clone(),
            });
        }
        Ok(Auth::None)
    }

    /// Service-account credentials mounted into the pod
    pub async fn in_cluster() -> Result<Self> {
        let host = std::env::var("KUBERNETES_SERVICE_HOST")
            .map_err(|_| ClientError::config("KUBERNETES_SERVICE_HOST is not set"))?;
        let port = std::env::var("KUBERNETES_SERVICE_PORT").unwrap_or_else(|_| "443".into());
        let dir = Path::new(SERVICE_ACCOUNT_DIR);

        let token = tokio::fs::read_to_string(dir.join("token")).await?;
        let ca_pem = tokio::fs::read(dir.join("ca.crt")).await.ok();

        let host = if host.contains(':') {
            format!("[{host}]")
        } else {
            host
        };
        Ok(Self {
            server: format!("https://{host}:{port}"),
            auth: Auth::Bearer(token.trim().to_string()),
            ca_pem,
            insecure_skip_tls_verify: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const KUBECONFIG: &str = r#"
apiVersion: v1
kind: Config
current-context: karmada-apiserver
clusters:
  - name: karmada-apiserver
    cluster:
      server: https://172.18.0.3:5443
      certificate-authority-data: LS0tLS1CRUdJTg==
  - name: member1
    cluster:
      server: https://172.18.0.4:6443
      insecure-skip-tls-verify: true
contexts:
  - name: karmada-apiserver
    context:
      cluster: karmada-apiserver
      user: karmada-admin
  - name: member1
    context:
      cluster: member1
      user: member1-admin
users:
  - name: karmada-admin
    user:
      token: abc123
  - name: member1-admin
    user:
      username: admin
      password: secret
"#;

    fn write_kubeconfig() -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(KUBECONFIG.as_bytes()).unwrap();
        file
    }

    #[tokio::test]
    async fn test_current_context() {
        let file = write_kubeconfig();
        let config = ClientConfig::from_kubeconfig(file.path(), None).await.unwrap();
        assert_eq!(config.server, "https://172.18.0.3:5443");
        assert!(matches!(config.auth, Auth::Bearer(ref t) if t == "abc123"));
        assert_eq!(config.ca_pem.as_deref(), Some(&b"-----BEGIN"[..]));
        assert!(!config.insecure_skip_tls_verify);
    }

    #[tokio::test]
    async fn test_explicit_context() {
        let file = write_kubeconfig();
        let config = ClientConfig::from_kubeconfig(file.path(), Some("member1"))
            .await
            .unwrap();
        assert_eq!(config.server, "https://172.18.0.4:6443");
        assert!(matches!(config.auth, Auth::Basic { .. }));
        assert!(config.insecure_skip_tls_verify);
    }

    #[tokio::test]
    async fn test_missing_context() {
        let file = write_kubeconfig();
        let err = ClientConfig::from_kubeconfig(file.path(), Some("nope"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("nope"));
    }

    #[tokio::test]
    async fn test_skip_tls_verify_override() {
        let file = write_kubeconfig();
        let settings = ClientSettings {
            kubeconfig: Some(file.path().to_path_buf()),
            context: None,
            skip_tls_verify: true,
        };
        let config = ClientConfig::load(&settings).await.unwrap();
        assert!(config.insecure_skip_tls_verify);
    }

    #[test]
    fn test_auth_debug_hides_secrets() {
        let auth = Auth::Bearer("abc123".into());
        assert_eq!(format!("{auth:?}"), "Bearer(***)");
    }
}
