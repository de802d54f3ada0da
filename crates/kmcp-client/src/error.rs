//! Error types for the control-plane client

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("kubeconfig error: {0}")]
    Kubeconfig(#[from] serde_yaml::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("API server returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("unknown resource kind {0:?}")]
    UnknownKind(String),

    #[error("namespace is required for {0} resources")]
    NamespaceRequired(&'static str),

    #[error("invalid resource name {0:?}")]
    InvalidName(String),
}

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, ClientError>;

impl ClientError {
    pub fn config(msg: impl Into<String>) -> Self {
        ClientError::Config(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        ClientError::NotFound(msg.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ClientError::NotFound(_))
    }

    /// Stable identifier for logs and wire payloads
    pub fn kind(&self) -> &'static str {
        match self {
            ClientError::Config(_) => "config",
            ClientError::Kubeconfig(_) => "kubeconfig",
            ClientError::Io(_) => "io",
            ClientError::Http(_) => "http",
            ClientError::Serialization(_) => "serialization",
            ClientError::NotFound(_) => "not_found",
            ClientError::Api { .. } => "api",
            ClientError::UnknownKind(_) => "unknown_kind",
            ClientError::NamespaceRequired(_) => "namespace_required",
            ClientError::InvalidName(_) => "invalid_name",
        }
    }

    /// Message safe to hand back to callers.
    ///
    /// API server messages, request URLs and rejected input all quote
    /// resource names, so those variants keep only their kind and status.
    pub fn redacted(&self) -> String {
        match self {
            ClientError::NotFound(_) => "resource not found".to_string(),
            ClientError::Api { status, .. } => format!("API server returned {status}"),
            ClientError::Http(e) => match e.status() {
                Some(status) => format!("HTTP request failed with {status}"),
                None => "HTTP request to the API server failed".to_string(),
            },
            ClientError::Serialization(_) => "unexpected response from the API server".to_string(),
            ClientError::UnknownKind(_) => "unknown resource kind".to_string(),
            ClientError::InvalidName(_) => "invalid resource name".to_string(),
            ClientError::Config(_)
            | ClientError::Kubeconfig(_)
            | ClientError::Io(_)
            | ClientError::NamespaceRequired(_) => self.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redacted_drops_names() {
        let err = ClientError::Api {
            status: 409,
            message: r#"namespaces "demo" already exists"#.to_string(),
        };
        assert_eq!(err.kind(), "api");
        assert_eq!(err.redacted(), "API server returned 409");

        let err = ClientError::not_found("deployments/default/nginx");
        assert!(!err.redacted().contains("nginx"));
        assert!(!ClientError::UnknownKind("widget".into()).redacted().contains("widget"));
    }

    #[test]
    fn test_redacted_keeps_operator_config() {
        let err = ClientError::config("no context named \"staging\"");
        assert_eq!(err.redacted(), err.to_string());
    }
}
