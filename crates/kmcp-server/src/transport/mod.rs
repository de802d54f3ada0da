//! Transport Layer
//!
//! - Stdio: newline-delimited JSON-RPC over a byte stream
//! - SSE: HTTP POST in, Server-Sent Events out, one session per connection
//!
//! Both take a shutdown token. Cancelling it stops intake, and every
//! in-flight request observes the cancellation through a child token.

pub mod sse;
pub mod stdio;

pub use sse::{router as sse_router, SseTransport};
pub use stdio::{serve_stream, StdioTransport};

use crate::{McpRequest, McpResponse};
use anyhow::Result;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::error;

/// Generic MCP server trait for transport layer
#[async_trait::async_trait]
pub trait McpHandler: Send + Sync {
    async fn handle_request(
        &self,
        request: McpRequest,
        ctx: CancellationToken,
    ) -> Option<McpResponse>;
}

/// Transport trait - implement for new transport types
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    /// Serve until the input ends, a fatal error occurs or `shutdown` fires
    async fn serve<H: McpHandler + 'static>(
        self,
        handler: Arc<H>,
        shutdown: CancellationToken,
    ) -> Result<()>;
}

#[async_trait::async_trait]
impl McpHandler for crate::McpServer {
    async fn handle_request(
        &self,
        request: McpRequest,
        ctx: CancellationToken,
    ) -> Option<McpResponse> {
        crate::McpServer::handle_request(self, request, &ctx).await
    }
}

/// Per-session failures. These never stop the transport.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("session {0} not found")]
    UnknownSession(String),

    #[error("malformed message")]
    MalformedMessage(McpResponse),

    #[error("session {0} closed")]
    SessionClosed(String),
}

impl TransportError {
    pub fn kind(&self) -> &'static str {
        match self {
            TransportError::UnknownSession(_) => "unknown_session",
            TransportError::MalformedMessage(_) => "malformed_message",
            TransportError::SessionClosed(_) => "session_closed",
        }
    }
}

/// Run one request, converting a handler panic into an internal error
pub(crate) async fn dispatch<H: McpHandler + ?Sized>(
    handler: &H,
    request: McpRequest,
    ctx: CancellationToken,
) -> Option<McpResponse> {
    let id = request.id.clone();
    let method = request.method.clone();
    match AssertUnwindSafe(handler.handle_request(request, ctx))
        .catch_unwind()
        .await
    {
        Ok(response) => response,
        Err(_) => {
            error!(method = %method, "Request handler panicked");
            id.map(|id| {
                McpResponse::error(
                    Some(id),
                    crate::JsonRpcError::internal_error(format!("handler for {method} panicked")),
                )
            })
        }
    }
}
