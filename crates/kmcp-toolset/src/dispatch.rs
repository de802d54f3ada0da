//! Operation dispatch
//!
//! [`RouterBuilder`] collects live operations during startup. Once built,
//! the [`Dispatcher`] is immutable and shared by every transport task, so
//! callers never see a partially registered routing table.

use crate::error::{ConstructionError, InvokeError, ToolError};
use crate::tool::{Operation, ToolInfo};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info_span, warn, Instrument};

struct Route {
    toolset: String,
    operation: Arc<Operation>,
}

/// Mutable routing table used while registering toolsets
#[derive(Default)]
pub struct RouterBuilder {
    routes: Vec<Route>,
    index: HashMap<String, usize>,
}

impl RouterBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one operation. Names must be unique across toolsets.
    pub fn insert(
        &mut self,
        toolset: &str,
        operation: Arc<Operation>,
    ) -> Result<(), ConstructionError> {
        if let Some(&idx) = self.index.get(operation.name()) {
            return Err(ConstructionError::DuplicateOperation {
                name: operation.name().to_string(),
                toolset: toolset.to_string(),
                existing: self.routes[idx].toolset.clone(),
            });
        }
        self.index
            .insert(operation.name().to_string(), self.routes.len());
        self.routes.push(Route {
            toolset: toolset.to_string(),
            operation,
        });
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub fn build(self) -> Dispatcher {
        Dispatcher {
            routes: self.routes,
            index: self.index,
        }
    }
}

/// Immutable routing table plus the invoke pipeline
pub struct Dispatcher {
    routes: Vec<Route>,
    index: HashMap<String, usize>,
}

impl Dispatcher {
    /// Live operations in registration order
    pub fn discovery(&self) -> Vec<ToolInfo> {
        self.routes.iter().map(|r| r.operation.info()).collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn operation(&self, name: &str) -> Option<&Arc<Operation>> {
        self.index.get(name).map(|&idx| &self.routes[idx].operation)
    }

    /// Name of the toolset that contributed `name`
    pub fn toolset_of(&self, name: &str) -> Option<&str> {
        self.index
            .get(name)
            .map(|&idx| self.routes[idx].toolset.as_str())
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Look up, validate and run an operation.
    ///
    /// A token that is already cancelled short-circuits before validation
    /// and before the handler starts.
    pub async fn invoke(
        &self,
        name: &str,
        arguments: &Value,
        ctx: &CancellationToken,
    ) -> Result<Value, InvokeError> {
        let operation = self
            .operation(name)
            .ok_or_else(|| InvokeError::UnknownOperation(name.to_string()))?
            .clone();

        if ctx.is_cancelled() {
            debug!(operation = %name, "Token already cancelled, skipping handler");
            return Err(InvokeError::Cancelled(name.to_string()));
        }

        let args = operation
            .schema()
            .validate(arguments)
            .map_err(|source| InvokeError::Validation {
                operation: name.to_string(),
                source,
            })?;
        let arg_names: Vec<String> = args.names().map(str::to_string).collect();

        let span = info_span!("invoke", operation = %name);
        let result = operation
            .handler()
            .call(ctx.child_token(), args)
            .instrument(span)
            .await;

        match result {
            Ok(value) => Ok(value),
            Err(ToolError::Cancelled) => Err(InvokeError::Cancelled(name.to_string())),
            Err(source) => {
                warn!(operation = %name, error = %source, "Operation failed");
                Err(InvokeError::Handler {
                    operation: name.to_string(),
                    arguments: arg_names,
                    source,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ParamSpec, ToolSchema};
    use crate::error::ValidationError;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_op(name: &str, calls: Arc<AtomicUsize>) -> Arc<Operation> {
        Arc::new(Operation::from_fn(
            name,
            "counts calls",
            ToolSchema::new()
                .param(ParamSpec::string("name").required())
                .param(ParamSpec::boolean("skipAutoPropagation").required()),
            move |_ctx, _args| {
                let calls = calls.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(json!("create namespace success"))
                }
            },
        ))
    }

    fn dispatcher_with(op: Arc<Operation>) -> Dispatcher {
        let mut builder = RouterBuilder::new();
        builder.insert("namespace", op).unwrap();
        builder.build()
    }

    #[tokio::test]
    async fn test_unknown_operation() {
        let dispatcher = RouterBuilder::new().build();
        let err = dispatcher
            .invoke("list_clusters", &json!({}), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, InvokeError::UnknownOperation(ref n) if n == "list_clusters"));
    }

    #[tokio::test]
    async fn test_missing_parameter_skips_handler() {
        let calls = Arc::new(AtomicUsize::new(0));
        let dispatcher = dispatcher_with(counting_op("create_namespace", calls.clone()));

        let err = dispatcher
            .invoke("create_namespace", &json!({"name": "demo"}), &CancellationToken::new())
            .await
            .unwrap_err();

        assert_eq!(
            err.validation_error(),
            Some(&ValidationError::MissingParameter("skipAutoPropagation".into()))
        );
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_cancelled_token_skips_handler() {
        let calls = Arc::new(AtomicUsize::new(0));
        let dispatcher = dispatcher_with(counting_op("create_namespace", calls.clone()));
        let ctx = CancellationToken::new();
        ctx.cancel();

        let err = dispatcher
            .invoke(
                "create_namespace",
                &json!({"name": "demo", "skipAutoPropagation": false}),
                &ctx,
            )
            .await
            .unwrap_err();

        assert!(err.is_cancelled());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_success_returns_payload_unchanged() {
        let calls = Arc::new(AtomicUsize::new(0));
        let dispatcher = dispatcher_with(counting_op("create_namespace", calls.clone()));

        let value = dispatcher
            .invoke(
                "create_namespace",
                &json!({"name": "demo", "skipAutoPropagation": true}),
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(value, json!("create namespace success"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_handler_error_is_wrapped() {
        let op = Arc::new(Operation::from_fn(
            "delete_propagationpolicy",
            "fails",
            ToolSchema::new().param(ParamSpec::string("name").required()),
            |_ctx, _args| async { Err(ToolError::failed("connection refused")) },
        ));
        let dispatcher = dispatcher_with(op);

        let err = dispatcher
            .invoke(
                "delete_propagationpolicy",
                &json!({"name": "super-secret-name"}),
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();

        assert_eq!(err.kind(), "handler_error");
        let msg = err.to_string();
        assert!(msg.contains("delete_propagationpolicy"));
        assert!(msg.contains("connection refused"));
        assert!(!msg.contains("super-secret-name"));
    }

    #[tokio::test]
    async fn test_handler_observing_cancellation() {
        let op = Arc::new(Operation::from_fn(
            "list_clusters",
            "waits for cancellation",
            ToolSchema::new(),
            |ctx, _args| async move {
                ctx.cancelled().await;
                Err(ToolError::Cancelled)
            },
        ));
        let dispatcher = Arc::new(dispatcher_with(op));
        let ctx = CancellationToken::new();

        let task = {
            let dispatcher = dispatcher.clone();
            let ctx = ctx.clone();
            tokio::spawn(async move { dispatcher.invoke("list_clusters", &json!({}), &ctx).await })
        };
        tokio::task::yield_now().await;
        ctx.cancel();

        let err = task.await.unwrap().unwrap_err();
        assert!(err.is_cancelled());
    }

    #[test]
    fn test_duplicate_operation_rejected() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut builder = RouterBuilder::new();
        builder
            .insert("namespace", counting_op("create_namespace", calls.clone()))
            .unwrap();
        let err = builder
            .insert("resource", counting_op("create_namespace", calls))
            .unwrap_err();
        assert_eq!(
            err,
            ConstructionError::DuplicateOperation {
                name: "create_namespace".into(),
                toolset: "resource".into(),
                existing: "namespace".into(),
            }
        );
    }
}
