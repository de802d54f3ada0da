//! MCP Server
//!
//! Transport-agnostic request handling on top of the routing table.
//! Both stdio and SSE feed requests through [`McpServer::handle_request`].

use crate::protocol::{JsonRpcError, McpRequest, McpResponse};
use crate::{PROTOCOL_VERSION, SERVER_NAME, SERVER_VERSION};
use kmcp_toolset::{Dispatcher, InvokeError};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

pub struct McpServer {
    dispatcher: Arc<Dispatcher>,
}

impl McpServer {
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self {
            dispatcher: Arc::new(dispatcher),
        }
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Handle one MCP message. Notifications produce no response.
    pub async fn handle_request(
        &self,
        request: McpRequest,
        ctx: &CancellationToken,
    ) -> Option<McpResponse> {
        debug!(method = %request.method, "Handling MCP request");

        if request.is_notification() {
            debug!(method = %request.method, "Notification received");
            return None;
        }

        let response = match request.method.as_str() {
            "initialize" => self.handle_initialize(request),
            "ping" => McpResponse::success(request.id, json!({})),
            "tools/list" => McpResponse::success(
                request.id,
                json!({ "tools": self.dispatcher.discovery() }),
            ),
            "tools/call" => self.handle_tools_call(request, ctx).await,
            _ => McpResponse::error(request.id, JsonRpcError::method_not_found(&request.method)),
        };
        Some(response)
    }

    fn handle_initialize(&self, request: McpRequest) -> McpResponse {
        let client_info = request.params.as_ref().and_then(|p| p.get("clientInfo"));
        let client_name = client_info
            .and_then(|ci| ci.get("name"))
            .and_then(Value::as_str)
            .unwrap_or("unknown");
        let client_version = client_info
            .and_then(|ci| ci.get("version"))
            .and_then(Value::as_str)
            .unwrap_or("?");

        info!(client = %client_name, version = %client_version, "Client connected");

        McpResponse::success(
            request.id,
            json!({
                "protocolVersion": PROTOCOL_VERSION,
                "capabilities": {
                    "tools": { "listChanged": false }
                },
                "serverInfo": {
                    "name": SERVER_NAME,
                    "version": SERVER_VERSION
                }
            }),
        )
    }

    async fn handle_tools_call(&self, request: McpRequest, ctx: &CancellationToken) -> McpResponse {
        let params = match &request.params {
            Some(p) => p,
            None => {
                return McpResponse::error(
                    request.id,
                    JsonRpcError::invalid_params("Missing params"),
                )
            }
        };

        let tool_name = match params.get("name").and_then(Value::as_str) {
            Some(n) => n,
            None => {
                return McpResponse::error(
                    request.id,
                    JsonRpcError::invalid_params("Missing tool name"),
                )
            }
        };

        let arguments = params.get("arguments").cloned().unwrap_or(Value::Null);

        match self.dispatcher.invoke(tool_name, &arguments, ctx).await {
            Ok(payload) => McpResponse::success(
                request.id,
                json!({
                    "content": [{ "type": "text", "text": payload_text(&payload) }],
                    "isError": false
                }),
            ),
            Err(e) => invoke_error_response(request.id, e),
        }
    }
}

/// Strings are sent verbatim, everything else as compact JSON
fn payload_text(payload: &Value) -> String {
    match payload {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn invoke_error_response(id: Option<Value>, err: InvokeError) -> McpResponse {
    let kind = err.kind();
    match err {
        InvokeError::UnknownOperation(_) | InvokeError::Validation { .. } => {
            McpResponse::error(id, JsonRpcError::invalid_params(err.to_string()).with_kind(kind))
        }
        InvokeError::Cancelled(_) => {
            McpResponse::error(id, JsonRpcError::request_cancelled(err.to_string()))
        }
        InvokeError::Handler { .. } => McpResponse::success(
            id,
            json!({
                "content": [{ "type": "text", "text": err.to_string() }],
                "isError": true,
                "_meta": { "kind": kind }
            }),
        ),
    }
}
