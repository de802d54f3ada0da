//! MCP Protocol Types
//!
//! JSON-RPC 2.0 envelope used by both transports.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// JSON-RPC 2.0 Request (or notification when `id` is absent)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpRequest {
    pub jsonrpc: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl McpRequest {
    pub fn new(method: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id: None,
            method: method.into(),
            params: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<Value>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_params(mut self, params: Value) -> Self {
        self.params = Some(params);
        self
    }

    pub fn is_notification(&self) -> bool {
        self.id.is_none()
    }
}

/// JSON-RPC 2.0 Response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpResponse {
    pub jsonrpc: String,
    pub id: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

impl McpResponse {
    pub fn success(id: Option<Value>, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn error(id: Option<Value>, error: JsonRpcError) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: None,
            error: Some(error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// JSON-RPC 2.0 Error. `data.kind` always names the failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcError {
    pub const PARSE_ERROR: i32 = -32700;
    pub const INVALID_REQUEST: i32 = -32600;
    pub const METHOD_NOT_FOUND: i32 = -32601;
    pub const INVALID_PARAMS: i32 = -32602;
    pub const INTERNAL_ERROR: i32 = -32603;
    pub const REQUEST_CANCELLED: i32 = -32800;

    pub fn new(code: i32, message: impl Into<String>, kind: &str) -> Self {
        Self {
            code,
            message: message.into(),
            data: Some(json!({ "kind": kind })),
        }
    }

    pub fn with_kind(mut self, kind: &str) -> Self {
        match &mut self.data {
            Some(Value::Object(map)) => {
                map.insert("kind".to_string(), Value::from(kind));
            }
            _ => self.data = Some(json!({ "kind": kind })),
        }
        self
    }

    pub fn kind(&self) -> Option<&str> {
        self.data.as_ref()?.get("kind")?.as_str()
    }

    pub fn parse_error(msg: impl Into<String>) -> Self {
        Self::new(Self::PARSE_ERROR, msg, "parse_error")
    }

    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::new(Self::INVALID_REQUEST, msg, "invalid_request")
    }

    pub fn method_not_found(method: &str) -> Self {
        Self::new(
            Self::METHOD_NOT_FOUND,
            format!("Method not found: {}", method),
            "method_not_found",
        )
    }

    pub fn invalid_params(msg: impl Into<String>) -> Self {
        Self::new(Self::INVALID_PARAMS, msg, "invalid_params")
    }

    pub fn internal_error(msg: impl Into<String>) -> Self {
        Self::new(Self::INTERNAL_ERROR, msg, "internal_error")
    }

    pub fn request_cancelled(msg: impl Into<String>) -> Self {
        Self::new(Self::REQUEST_CANCELLED, msg, "cancelled")
    }
}

/// Decode one inbound message.
///
/// Malformed JSON yields a parse error; valid JSON that is not a request
/// yields an invalid-request error carrying the id when one can be read.
pub fn parse_message(raw: &str) -> Result<McpRequest, McpResponse> {
    let value: Value = serde_json::from_str(raw)
        .map_err(|e| McpResponse::error(None, JsonRpcError::parse_error(e.to_string())))?;
    let id = value.get("id").cloned();
    let request: McpRequest = serde_json::from_value(value)
        .map_err(|e| McpResponse::error(id.clone(), JsonRpcError::invalid_request(e.to_string())))?;
    if request.jsonrpc != "2.0" {
        return Err(McpResponse::error(
            id,
            JsonRpcError::invalid_request(format!(
                "unsupported jsonrpc version {:?}",
                request.jsonrpc
            )),
        ));
    }
    Ok(request)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_serialization() {
        let req = McpRequest::new("tools/list")
            .with_id(json!(1))
            .with_params(json!({"cursor": null}));

        let json_str = serde_json::to_string(&req).unwrap();
        assert!(json_str.contains("tools/list"));
        assert!(!req.is_notification());
    }

    #[test]
    fn test_error_carries_kind() {
        let resp = McpResponse::error(Some(json!(1)), JsonRpcError::method_not_found("unknown"));
        assert!(!resp.is_success());
        let err = resp.error.unwrap();
        assert_eq!(err.code, -32601);
        assert_eq!(err.kind(), Some("method_not_found"));

        let err = JsonRpcError::invalid_params("bad").with_kind("missing_parameter");
        assert_eq!(err.kind(), Some("missing_parameter"));
    }

    #[test]
    fn test_parse_message() {
        let req = parse_message(r#"{"jsonrpc":"2.0","id":7,"method":"ping"}"#).unwrap();
        assert_eq!(req.id, Some(json!(7)));

        let resp = parse_message("{not json").unwrap_err();
        assert_eq!(resp.error.unwrap().code, JsonRpcError::PARSE_ERROR);
        assert_eq!(resp.id, None);

        let resp = parse_message(r#"{"jsonrpc":"2.0","id":3}"#).unwrap_err();
        assert_eq!(resp.error.unwrap().code, JsonRpcError::INVALID_REQUEST);
        assert_eq!(resp.id, Some(json!(3)));
    }
}
