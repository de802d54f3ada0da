//! Error types for toolset construction and operation dispatch
//!
//! Construction errors abort startup. Everything else is scoped to a single
//! request and is turned into a wire response by the transport layer.

use crate::schema::ParamType;
use thiserror::Error;

/// Errors raised while building the registry or the routing table
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConstructionError {
    #[error("toolset {0:?} is already registered")]
    DuplicateToolset(String),

    #[error("toolset {0:?} does not exist")]
    UnknownToolset(String),

    #[error("operation {name:?} from toolset {toolset:?} collides with the one registered by {existing:?}")]
    DuplicateOperation {
        name: String,
        toolset: String,
        existing: String,
    },
}

impl ConstructionError {
    pub fn kind(&self) -> &'static str {
        match self {
            ConstructionError::DuplicateToolset(_) => "duplicate_toolset",
            ConstructionError::UnknownToolset(_) => "unknown_toolset",
            ConstructionError::DuplicateOperation { .. } => "duplicate_operation",
        }
    }
}

/// Argument validation failures, detected before a handler runs
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("arguments must be a JSON object, got {0}")]
    NotAnObject(&'static str),

    #[error("missing required parameter {0:?}")]
    MissingParameter(String),

    #[error("parameter {name:?} must be a {expected}, got {actual}")]
    InvalidParameterType {
        name: String,
        expected: ParamType,
        actual: &'static str,
    },

    #[error("parameter {name:?} must be one of [{}]", .allowed.join(", "))]
    InvalidParameterValue { name: String, allowed: Vec<String> },
}

impl ValidationError {
    pub fn kind(&self) -> &'static str {
        match self {
            ValidationError::NotAnObject(_) => "invalid_arguments",
            ValidationError::MissingParameter(_) => "missing_parameter",
            ValidationError::InvalidParameterType { .. } => "invalid_parameter_type",
            ValidationError::InvalidParameterValue { .. } => "invalid_parameter_value",
        }
    }
}

/// Failure reported by an operation handler
#[derive(Error, Debug)]
pub enum ToolError {
    /// The handler observed its cancellation token and gave up
    #[error("operation cancelled")]
    Cancelled,

    /// The resource-management client could not be obtained
    #[error("failed to get client: {0}")]
    Client(String),

    /// The downstream call failed
    #[error("{0}")]
    Failed(String),

    #[error("invalid content: {0}")]
    InvalidContent(String),
}

impl ToolError {
    pub fn client(msg: impl Into<String>) -> Self {
        ToolError::Client(msg.into())
    }

    pub fn failed(msg: impl Into<String>) -> Self {
        ToolError::Failed(msg.into())
    }

    pub fn invalid_content(msg: impl Into<String>) -> Self {
        ToolError::InvalidContent(msg.into())
    }
}

/// Everything `Dispatcher::invoke` can return instead of a payload
#[derive(Error, Debug)]
pub enum InvokeError {
    #[error("unknown operation {0:?}")]
    UnknownOperation(String),

    #[error("invalid arguments for {operation:?}: {source}")]
    Validation {
        operation: String,
        #[source]
        source: ValidationError,
    },

    /// Handler failure wrapped with operation context. Only argument names
    /// are kept, never their values.
    #[error("operation {operation:?} failed (arguments: [{}]): {source}", .arguments.join(", "))]
    Handler {
        operation: String,
        arguments: Vec<String>,
        #[source]
        source: ToolError,
    },

    #[error("operation {0:?} cancelled")]
    Cancelled(String),
}

impl InvokeError {
    /// Stable identifier used in wire payloads
    pub fn kind(&self) -> &'static str {
        match self {
            InvokeError::UnknownOperation(_) => "unknown_operation",
            InvokeError::Validation { source, .. } => source.kind(),
            InvokeError::Handler { .. } => "handler_error",
            InvokeError::Cancelled(_) => "cancelled",
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, InvokeError::Cancelled(_))
    }

    pub fn validation_error(&self) -> Option<&ValidationError> {
        match self {
            InvokeError::Validation { source, .. } => Some(source),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handler_error_does_not_echo_values() {
        let err = InvokeError::Handler {
            operation: "create_namespace".into(),
            arguments: vec!["name".into(), "skipAutoPropagation".into()],
            source: ToolError::failed("namespaces \"demo\" already exists"),
        };
        let msg = err.to_string();
        assert!(msg.contains("create_namespace"));
        assert!(msg.contains("name, skipAutoPropagation"));
        assert_eq!(err.kind(), "handler_error");
    }

    #[test]
    fn test_validation_kinds() {
        let err = InvokeError::Validation {
            operation: "create_namespace".into(),
            source: ValidationError::MissingParameter("skipAutoPropagation".into()),
        };
        assert_eq!(err.kind(), "missing_parameter");
        assert!(err.to_string().contains("skipAutoPropagation"));
    }
}
