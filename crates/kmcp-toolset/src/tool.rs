//! Operation type and handler trait
//!
//! An [`Operation`] is the unit callers invoke by name: metadata, a
//! parameter schema and a handler.

use crate::error::ToolError;
use crate::schema::{Arguments, ToolSchema};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Handler behind an operation
#[async_trait]
pub trait ToolHandler: Send + Sync {
    /// Run with validated arguments. Long calls should watch `ctx`.
    async fn call(&self, ctx: CancellationToken, args: Arguments) -> Result<Value, ToolError>;
}

/// Adapter turning an async closure into a [`ToolHandler`]
pub struct FnHandler<F> {
    f: F,
}

#[async_trait]
impl<F, Fut> ToolHandler for FnHandler<F>
where
    F: Fn(CancellationToken, Arguments) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Value, ToolError>> + Send + 'static,
{
    async fn call(&self, ctx: CancellationToken, args: Arguments) -> Result<Value, ToolError> {
        (self.f)(ctx, args).await
    }
}

/// Discovery view of an operation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolInfo {
    pub name: String,
    pub description: String,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

/// A named, invocable server action
#[derive(Clone)]
pub struct Operation {
    name: String,
    description: String,
    schema: ToolSchema,
    handler: Arc<dyn ToolHandler>,
}

impl Operation {
    pub fn new(
        name: &str,
        description: &str,
        schema: ToolSchema,
        handler: Arc<dyn ToolHandler>,
    ) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            schema,
            handler,
        }
    }

    pub fn from_fn<F, Fut>(name: &str, description: &str, schema: ToolSchema, f: F) -> Self
    where
        F: Fn(CancellationToken, Arguments) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, ToolError>> + Send + 'static,
    {
        Self::new(name, description, schema, Arc::new(FnHandler { f }))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn schema(&self) -> &ToolSchema {
        &self.schema
    }

    pub fn handler(&self) -> &Arc<dyn ToolHandler> {
        &self.handler
    }

    pub fn info(&self) -> ToolInfo {
        ToolInfo {
            name: self.name.clone(),
            description: self.description.clone(),
            input_schema: self.schema.to_json_schema(),
        }
    }
}

impl std::fmt::Debug for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Operation")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("params", &self.schema.params().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ParamSpec;
    use serde_json::json;

    #[tokio::test]
    async fn test_fn_operation() {
        let op = Operation::from_fn(
            "echo",
            "Echo input back",
            ToolSchema::new().param(ParamSpec::string("text").required()),
            |_ctx, args| async move {
                let text = args.require_string("text")?.to_string();
                Ok(json!({ "text": text }))
            },
        );

        assert_eq!(op.name(), "echo");
        assert_eq!(op.info().input_schema["required"], json!(["text"]));

        let args = op.schema().validate(&json!({"text": "hello"})).unwrap();
        let result = op
            .handler()
            .call(CancellationToken::new(), args)
            .await
            .unwrap();
        assert_eq!(result, json!({"text": "hello"}));
    }
}
