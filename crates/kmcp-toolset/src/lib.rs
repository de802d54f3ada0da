//! kmcp-toolset: toolset registry and operation dispatch
//!
//! # Modules
//!
//! - `schema`: parameter descriptors and argument validation
//! - `tool`: the `Operation` type and handler trait
//! - `toolset`: read/write grouping of operations
//! - `group`: the registry and enablement resolution
//! - `dispatch`: routing table and the `invoke` pipeline
//! - `error`: construction and per-request error types

pub mod dispatch;
pub mod error;
pub mod group;
pub mod schema;
pub mod tool;
pub mod toolset;

// Re-exports
pub use dispatch::{Dispatcher, RouterBuilder};
pub use error::{ConstructionError, InvokeError, ToolError, ValidationError};
pub use group::{ToolsetGroup, ALL_TOOLSETS};
pub use schema::{ArgValue, Arguments, ParamSpec, ParamType, ToolSchema};
pub use tool::{FnHandler, Operation, ToolHandler, ToolInfo};
pub use toolset::Toolset;

/// Prelude for convenient imports
pub mod prelude {
    pub use super::{
        Arguments, Dispatcher, InvokeError, Operation, ParamSpec, ToolError, ToolSchema, Toolset,
        ToolsetGroup,
    };
    pub use tokio_util::sync::CancellationToken;
}
