//! JSON-RPC 2.0 envelope, content model, and error taxonomy shared by every
//! crate in the mcprt MCP server runtime.
//!
//! This crate deliberately depends only on `serde_json::Value` as an opaque
//! JSON tree (spec §9 "Opaque JSON tree") — it never assumes a specific parser
//! beyond the `get_type`/`get_property`/... capability set `serde_json::Value`
//! already satisfies.

pub mod content;
pub mod error;
pub mod jsonrpc;
pub mod resources;
pub mod tools;

pub use content::{ContentItem, ContentType};
pub use error::{ErrorKind, McpError, Result};
pub use jsonrpc::{
    JsonRpcEnvelope, JsonRpcError, JsonRpcRequest, JsonRpcResponse, JsonRpcResponseEnvelope,
    JsonRpcResponsePayload, JsonRpcVersion, RequestId,
};
pub use resources::{ResourceDescriptor, ResourceTemplateDescriptor};
pub use tools::{ToolDescriptor, ToolParam};

/// Maximum permitted frame payload size in bytes (spec §3, §6): 1 MiB.
pub const MAX_MESSAGE_SIZE: usize = 1024 * 1024;
