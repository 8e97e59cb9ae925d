//! Tool/resource callback traits (spec §4.7 "Contract": `set_tool_handler`,
//! `set_resource_handler`), shaped as `async_trait` objects following the
//! teacher's `turbomcp-server::handlers::traits` convention rather than its
//! heavier `#[server]`/`#[tool]` proc-macro surface — this runtime has no
//! macro crate, and the literal contract is a plain callback registration.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;

use mcprt_protocol::{ContentItem, McpError};

/// What a tool handler hands back to the dispatcher: content items plus the
/// `is_error`/`error_message` pair the spec's pipeline step 5 describes.
#[derive(Debug, Clone, Default)]
pub struct ToolCallOutcome {
    pub content: Vec<ContentItem>,
    pub is_error: bool,
    pub error_message: Option<String>,
}

impl ToolCallOutcome {
    /// A successful outcome carrying the given content items.
    #[must_use]
    pub fn success(content: Vec<ContentItem>) -> Self {
        Self {
            content,
            is_error: false,
            error_message: None,
        }
    }

    /// A handler-signalled error (spec §4.7 step 6: "on handler-signalled
    /// error set the `isError` flag ... and include textual error").
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            content: Vec::new(),
            is_error: true,
            error_message: Some(message.into()),
        }
    }
}

/// Invoked by `call_tool` with the tool name and its argument object. One
/// handler serves every registered tool; it dispatches internally by name.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn call(&self, name: &str, arguments: Value) -> Result<ToolCallOutcome, McpError>;
}

/// Invoked by `read_resource` with the concrete URI and, for template
/// matches, the extracted parameter map (empty for non-template resources).
#[async_trait]
pub trait ResourceHandler: Send + Sync {
    async fn read(
        &self,
        uri: &str,
        params: HashMap<String, Value>,
    ) -> Result<Vec<ContentItem>, McpError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoHandler;

    #[async_trait]
    impl ToolHandler for EchoHandler {
        async fn call(&self, name: &str, arguments: Value) -> Result<ToolCallOutcome, McpError> {
            if name != "echo" {
                return Err(McpError::tool_not_found(name));
            }
            let text = arguments
                .get("text")
                .and_then(Value::as_str)
                .ok_or_else(|| McpError::invalid_params("missing text"))?;
            Ok(ToolCallOutcome::success(vec![ContentItem::text(text)]))
        }
    }

    #[tokio::test]
    async fn trait_object_is_callable_through_dyn_dispatch() {
        let handler: std::sync::Arc<dyn ToolHandler> = std::sync::Arc::new(EchoHandler);
        let outcome = handler
            .call("echo", serde_json::json!({"text": "hi"}))
            .await
            .unwrap();
        assert!(!outcome.is_error);
        assert_eq!(outcome.content.len(), 1);
    }
}
