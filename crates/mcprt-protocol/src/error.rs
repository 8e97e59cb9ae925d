//! Rich, structured errors for the MCP server core.
//!
//! Every internal failure path produces an [`McpError`] rather than a bare string,
//! so dispatchers can map failures onto JSON-RPC error payloads without guessing at
//! intent (spec §7 "Error Handling Design").

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Result alias used throughout the runtime.
pub type Result<T> = std::result::Result<T, McpError>;

/// Error classification, one variant per spec §7 taxonomy bucket plus the
/// MCP-specific application errors from §6's error code table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Malformed JSON payload (JSON-RPC -32700).
    ParseError,
    /// Envelope shape is invalid (JSON-RPC -32600).
    InvalidRequest,
    /// No handler registered for the method (JSON-RPC -32601).
    MethodNotFound,
    /// Parameters missing or of the wrong type (JSON-RPC -32602).
    InvalidParams,
    /// Unclassified server-side failure (JSON-RPC -32603).
    InternalError,
    /// `call_tool` named a tool that isn't registered.
    ToolNotFound,
    /// `read_resource` named a URI/template with no match.
    ResourceNotFound,
    /// Rate limiter denied the request.
    RateLimited,
    /// Template ACL or validator denied the caller.
    Unauthorized,
    /// Gateway or server configuration was invalid.
    Configuration,
    /// An operation exceeded its allotted time budget.
    Timeout,
    /// A transport-level failure (connection reset, framing violation, ...).
    Transport,
}

impl ErrorKind {
    /// Maps this kind onto the JSON-RPC / MCP error code from spec §6.
    #[must_use]
    pub fn code(self) -> i64 {
        match self {
            Self::ParseError => -32700,
            Self::InvalidRequest => -32600,
            Self::MethodNotFound => -32601,
            Self::InvalidParams => -32602,
            Self::InternalError | Self::Transport | Self::Timeout => -32603,
            Self::ToolNotFound => -32001,
            Self::ResourceNotFound => -32002,
            Self::RateLimited => -32003,
            Self::Unauthorized => -32004,
            Self::Configuration => -32005,
        }
    }
}

/// Contextual metadata attached to an [`McpError`], following the teacher's
/// `ErrorContext` shape but trimmed to what the core actually populates.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ErrorContext {
    /// Operation that was being performed when the error occurred.
    pub operation: Option<String>,
    /// Component that raised the error (e.g. `"dispatcher"`, `"tcp_transport"`).
    pub component: Option<String>,
    /// Additional free-form metadata.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, serde_json::Value>,
}

/// A structured runtime error with an id, classification, message, and context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpError {
    /// Unique identifier for this error instance (useful for log correlation).
    pub id: Uuid,
    /// Classification used to pick a JSON-RPC error code.
    pub kind: ErrorKind,
    /// Human-readable message.
    pub message: String,
    /// Contextual metadata.
    pub context: ErrorContext,
}

impl McpError {
    /// Creates a new error of the given kind with no context.
    #[must_use]
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            message: message.into(),
            context: ErrorContext::default(),
        }
    }

    /// Attaches a component name to the error's context.
    #[must_use]
    pub fn with_component(mut self, component: impl Into<String>) -> Self {
        self.context.component = Some(component.into());
        self
    }

    /// Attaches an operation name to the error's context.
    #[must_use]
    pub fn with_operation(mut self, operation: impl Into<String>) -> Self {
        self.context.operation = Some(operation.into());
        self
    }

    /// Shorthand for [`ErrorKind::InvalidParams`].
    #[must_use]
    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidParams, message)
    }

    /// Shorthand for [`ErrorKind::ToolNotFound`].
    #[must_use]
    pub fn tool_not_found(name: &str) -> Self {
        Self::new(ErrorKind::ToolNotFound, format!("tool not found: {name}"))
    }

    /// Shorthand for [`ErrorKind::ResourceNotFound`].
    #[must_use]
    pub fn resource_not_found(uri: &str) -> Self {
        Self::new(
            ErrorKind::ResourceNotFound,
            format!("resource not found: {uri}"),
        )
    }

    /// Shorthand for [`ErrorKind::MethodNotFound`].
    #[must_use]
    pub fn method_not_found(method: &str) -> Self {
        Self::new(
            ErrorKind::MethodNotFound,
            format!("method not found: {method}"),
        )
    }
}

impl fmt::Display for McpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

impl std::error::Error for McpError {}
