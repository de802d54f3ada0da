//! kmcp-server: MCP server for the Karmada control plane
//!
//! Architecture:
//! transport (stdio | SSE) → McpServer → Dispatcher → tool handler → Karmada API
//!
//! Methods:
//! - initialize → handshake
//! - ping
//! - tools/list → live operations
//! - tools/call → `Dispatcher::invoke`

pub mod config;
pub mod lifecycle;
pub mod protocol;
pub mod server;
pub mod tools;
pub mod transport;
pub mod version;

pub use config::{Overrides, Settings};
pub use lifecycle::{shutdown_signal, Lifecycle, LifecycleState};
pub use protocol::{JsonRpcError, McpRequest, McpResponse};
pub use server::McpServer;

pub const SERVER_NAME: &str = "karmada-mcp-server";
pub const SERVER_VERSION: &str = version::VERSION;
pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// Prelude for convenient imports
pub mod prelude {
    pub use super::transport::{McpHandler, SseTransport, StdioTransport, Transport};
    pub use super::{Lifecycle, McpRequest, McpResponse, McpServer, Settings};
}
