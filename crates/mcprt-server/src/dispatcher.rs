//! JSON-RPC request routing, the `call_tool`/`read_resource` pipelines, and
//! the worker-pool hand-off (spec §4.7 "Request routing", "`call_tool`
//! pipeline", "Worker pool").

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use parking_lot::RwLock;
use serde_json::Value;
use tokio::sync::oneshot;

use mcprt_core::{RequestOutcome, ServerMetrics};
use mcprt_protocol::{
    ContentItem, ErrorKind, JsonRpcEnvelope, JsonRpcRequest, JsonRpcResponse,
    JsonRpcResponseEnvelope, McpError, RequestId,
};
use mcprt_ratelimit::{Decision, KeyType, RateLimiter};
use mcprt_template::TemplateCache;
use mcprt_transport::ConnectionContext;

use crate::config::ServerConfig;
use crate::handler::{ResourceHandler, ToolHandler};
use crate::registry::HandlerRegistry;
use crate::security::TemplateSecurity;
use crate::worker_pool::{WorkerPool, WorkerPoolError, WorkerPoolStats};

struct Inner {
    registry: HandlerRegistry,
    security: TemplateSecurity,
    rate_limiter: RateLimiter,
    template_cache: TemplateCache,
    worker_pool: WorkerPool,
    metrics: ServerMetrics,
    tool_handler: RwLock<Option<Arc<dyn ToolHandler>>>,
    resource_handler: RwLock<Option<Arc<dyn ResourceHandler>>>,
}

/// Routes JSON-RPC requests to built-in methods, handing each off to a
/// worker-pool task. Cheap to clone: every field lives behind one `Arc`.
#[derive(Clone)]
pub struct Dispatcher(Arc<Inner>);

impl Dispatcher {
    #[must_use]
    pub fn new(config: &ServerConfig) -> Self {
        let pool_size = if config.auto_adjust_workers {
            WorkerPool::auto_adjust_target()
        } else {
            config.thread_pool_size
        };
        Self(Arc::new(Inner {
            registry: HandlerRegistry::new(),
            security: TemplateSecurity::new(),
            rate_limiter: RateLimiter::new(),
            template_cache: TemplateCache::default(),
            worker_pool: WorkerPool::new(pool_size, config.task_queue_size),
            metrics: ServerMetrics::new(),
            tool_handler: RwLock::new(None),
            resource_handler: RwLock::new(None),
        }))
    }

    #[must_use]
    pub fn registry(&self) -> &HandlerRegistry {
        &self.0.registry
    }

    #[must_use]
    pub fn security(&self) -> &TemplateSecurity {
        &self.0.security
    }

    #[must_use]
    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.0.rate_limiter
    }

    #[must_use]
    pub fn metrics(&self) -> &ServerMetrics {
        &self.0.metrics
    }

    #[must_use]
    pub fn worker_pool_stats(&self) -> WorkerPoolStats {
        self.0.worker_pool.stats()
    }

    pub fn resize_workers(&self, new_size: usize) {
        self.0.worker_pool.resize(new_size);
    }

    pub fn shutdown_workers(&self) {
        self.0.worker_pool.shutdown();
    }

    pub fn set_tool_handler(&self, handler: Arc<dyn ToolHandler>) {
        *self.0.tool_handler.write() = Some(handler);
    }

    pub fn set_resource_handler(&self, handler: Arc<dyn ResourceHandler>) {
        *self.0.resource_handler.write() = Some(handler);
    }

    /// The transport's `on_message` entry point (spec §4.5): parses the
    /// JSON-RPC envelope, routes single or batch requests, and serializes
    /// the response. A malformed envelope yields a `parse_error` response
    /// with a `null` id rather than a dropped connection.
    pub async fn handle_message(&self, ctx: ConnectionContext, bytes: Vec<u8>) -> Option<Vec<u8>> {
        let envelope: JsonRpcEnvelope = match serde_json::from_slice(&bytes) {
            Ok(env) => env,
            Err(_) => return Self::encode_parse_error(),
        };

        match envelope {
            JsonRpcEnvelope::Single(req) => {
                let resp = self.dispatch_with_worker(ctx, req).await;
                serde_json::to_vec(&resp).ok()
            }
            JsonRpcEnvelope::Batch(reqs) => {
                let futures = reqs.into_iter().map(|req| self.dispatch_with_worker(ctx.clone(), req));
                let responses = futures::future::join_all(futures).await;
                serde_json::to_vec(&JsonRpcResponseEnvelope::Batch(responses)).ok()
            }
        }
    }

    fn encode_parse_error() -> Option<Vec<u8>> {
        let err = McpError::new(ErrorKind::ParseError, "malformed JSON-RPC envelope");
        let payload = serde_json::json!({
            "jsonrpc": "2.0",
            "id": Value::Null,
            "error": {"code": err.kind.code(), "message": err.message},
        });
        serde_json::to_vec(&payload).ok()
    }

    /// Hands one request's processing to the worker pool and awaits its
    /// result via a oneshot channel, translating queue-full/shutdown into
    /// the `internal_error` the spec requires rather than silently dropping
    /// the request.
    async fn dispatch_with_worker(&self, ctx: ConnectionContext, req: JsonRpcRequest) -> JsonRpcResponse {
        let id = req.id.clone();
        let (tx, rx) = oneshot::channel();
        let this = self.clone();
        let task = Box::pin(async move {
            let resp = this.route(ctx, req).await;
            let _ = tx.send(resp);
        });

        match self.0.worker_pool.submit(task) {
            Ok(()) => rx.await.unwrap_or_else(|_| {
                JsonRpcResponse::from_error(
                    id.clone(),
                    &McpError::new(ErrorKind::InternalError, "worker task terminated without a response"),
                )
            }),
            Err(WorkerPoolError::QueueFull) => JsonRpcResponse::from_error(
                id,
                &McpError::new(ErrorKind::InternalError, "worker queue is full, retry").with_operation("dispatch"),
            ),
            Err(WorkerPoolError::Closed) => JsonRpcResponse::from_error(
                id,
                &McpError::new(ErrorKind::InternalError, "dispatcher is shutting down").with_operation("dispatch"),
            ),
        }
    }

    async fn route(&self, ctx: ConnectionContext, req: JsonRpcRequest) -> JsonRpcResponse {
        let start = Instant::now();
        let id = req.id.clone();

        let result = match req.method.as_str() {
            "ping" => Ok(Value::String("pong".to_string())),
            "list_resources" => Ok(serde_json::json!({ "resources": self.0.registry.list_resources() })),
            "list_resource_templates" => {
                Ok(serde_json::json!({ "resourceTemplates": self.0.registry.list_resource_templates() }))
            }
            "list_tools" => Ok(serde_json::json!({ "tools": self.0.registry.list_tools() })),
            "read_resource" => self.read_resource(&ctx, req.params.clone()).await,
            "call_tool" => self.call_tool(&ctx, req.params.clone()).await,
            other => Err(McpError::method_not_found(other)),
        };

        let latency_us = start.elapsed().as_micros() as u64;
        let outcome = match &result {
            Ok(_) => RequestOutcome::Success,
            Err(err) if matches!(err.kind, ErrorKind::RateLimited | ErrorKind::Unauthorized) => {
                RequestOutcome::Denied
            }
            Err(err) if err.kind == ErrorKind::Timeout => RequestOutcome::Timeout,
            Err(_) => RequestOutcome::Failure,
        };
        self.0.metrics.record_request(latency_us, outcome);

        match result {
            Ok(value) => JsonRpcResponse::success(id, value),
            Err(err) => JsonRpcResponse::from_error(id, &err),
        }
    }

    /// Resolves the caller's role for template ACL checks from the
    /// transport-provided identity hints: `user_id` doubles as the role
    /// value this reference dispatcher checks against.
    fn caller_role(ctx: &ConnectionContext) -> Option<&str> {
        ctx.user_id.as_deref()
    }

    async fn read_resource(&self, ctx: &ConnectionContext, params: Option<Value>) -> mcprt_protocol::Result<Value> {
        let uri = params
            .as_ref()
            .and_then(|p| p.get("uri"))
            .and_then(Value::as_str)
            .ok_or_else(|| McpError::invalid_params("read_resource requires a string \"uri\""))?;

        let handler = self
            .0
            .resource_handler
            .read()
            .clone()
            .ok_or_else(|| McpError::new(ErrorKind::InternalError, "no resource handler registered"))?;

        if self.0.registry.find_resource(uri).is_some() {
            let contents = handler.read(uri, HashMap::new()).await?;
            return Ok(serde_json::json!({ "contents": wire_contents(&contents) }));
        }

        for template in self.0.registry.list_resource_templates() {
            let Some(parsed) = self.0.template_cache.get_or_parse(&template.uri_template) else {
                continue;
            };
            let Ok(extracted) = parsed.extract(uri) else {
                continue;
            };
            if !self.0.security.check(&template.uri_template, Self::caller_role(ctx), &extracted) {
                return Err(McpError::new(ErrorKind::Unauthorized, "template access denied"));
            }
            let contents = handler.read(uri, extracted).await?;
            return Ok(serde_json::json!({ "contents": wire_contents(&contents) }));
        }

        Err(McpError::resource_not_found(uri))
    }

    async fn call_tool(&self, ctx: &ConnectionContext, params: Option<Value>) -> mcprt_protocol::Result<Value> {
        let params = params.ok_or_else(|| McpError::invalid_params("call_tool requires params"))?;
        let name = params
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| McpError::invalid_params("call_tool requires a string \"name\""))?
            .to_string();
        let arguments = params.get("arguments").cloned().unwrap_or_else(|| serde_json::json!({}));

        self.0.registry.find_tool(&name).ok_or_else(|| McpError::tool_not_found(&name))?;

        // Step 3: template security, when `name` is itself a registered
        // template-addressed resource (spec §4.7 step 3).
        if let Some(template) = self.0.registry.find_resource_template(&name) {
            let args_map: HashMap<String, Value> = arguments
                .as_object()
                .map(|obj| obj.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
                .unwrap_or_default();
            if !self.0.security.check(&template.uri_template, Self::caller_role(ctx), &args_map) {
                return Err(McpError::new(ErrorKind::Unauthorized, "template access denied"));
            }
        }

        // Step 4: rate limiting keyed on transport-provided identity hints.
        let mut keys = HashMap::new();
        if let Some(api_key) = &ctx.api_key {
            keys.insert(KeyType::ApiKey, api_key.clone());
        }
        if let Some(user_id) = &ctx.user_id {
            keys.insert(KeyType::UserId, user_id.clone());
        }
        if let Some(ip) = &ctx.ip {
            keys.insert(KeyType::Ip, ip.clone());
        }
        if self.0.rate_limiter.check(&keys, now_seconds()) == Decision::Deny {
            return Err(McpError::new(ErrorKind::RateLimited, "rate limit exceeded"));
        }

        let handler = self
            .0
            .tool_handler
            .read()
            .clone()
            .ok_or_else(|| McpError::new(ErrorKind::InternalError, "no tool handler registered"))?;
        let outcome = handler.call(&name, arguments).await?;

        Ok(serde_json::json!({
            "isError": outcome.is_error,
            "content": wire_contents(&outcome.content),
        }))
    }
}

fn wire_contents(items: &[ContentItem]) -> Vec<Value> {
    items.iter().map(ContentItem::to_wire).collect()
}

fn now_seconds() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_secs_f64()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use mcprt_protocol::{ToolDescriptor, ToolParam};
    use mcprt_ratelimit::{Algorithm, AlgorithmParams, KeyPattern, Rule};
    use pretty_assertions::assert_eq;

    struct EchoTool;

    #[async_trait]
    impl ToolHandler for EchoTool {
        async fn call(&self, name: &str, arguments: Value) -> mcprt_protocol::Result<crate::handler::ToolCallOutcome> {
            match name {
                "echo" => {
                    let text = arguments
                        .get("text")
                        .and_then(Value::as_str)
                        .ok_or_else(|| McpError::invalid_params("missing text"))?;
                    Ok(crate::handler::ToolCallOutcome::success(vec![ContentItem::text(text)]))
                }
                "reverse" => {
                    let text = arguments
                        .get("text")
                        .and_then(Value::as_str)
                        .ok_or_else(|| McpError::invalid_params("missing text"))?;
                    let reversed: String = text.chars().rev().collect();
                    Ok(crate::handler::ToolCallOutcome::success(vec![ContentItem::text(reversed)]))
                }
                other => Err(McpError::tool_not_found(other)),
            }
        }
    }

    fn dispatcher_with_echo() -> Dispatcher {
        let dispatcher = Dispatcher::new(&ServerConfig::default());
        dispatcher
            .registry()
            .add_tool(ToolDescriptor::new("echo", "echoes text").with_param(ToolParam::required("text", "text to echo")));
        dispatcher
            .registry()
            .add_tool(ToolDescriptor::new("reverse", "reverses text").with_param(ToolParam::required("text", "text to reverse")));
        dispatcher.set_tool_handler(Arc::new(EchoTool));
        dispatcher
    }

    fn request(method: &str, params: Value, id: i64) -> JsonRpcRequest {
        JsonRpcRequest {
            jsonrpc: mcprt_protocol::JsonRpcVersion,
            method: method.to_string(),
            params: Some(params),
            id: RequestId::Number(id),
        }
    }

    #[tokio::test]
    async fn scenario_echo_tool_returns_expected_content() {
        let dispatcher = dispatcher_with_echo();
        let bytes = serde_json::to_vec(&request(
            "call_tool",
            serde_json::json!({"name": "echo", "arguments": {"text": "hi"}}),
            1,
        ))
        .unwrap();
        let response_bytes = dispatcher.handle_message(ConnectionContext::default(), bytes).await.unwrap();
        let value: Value = serde_json::from_slice(&response_bytes).unwrap();
        assert_eq!(value["result"]["isError"], false);
        assert_eq!(value["result"]["content"][0]["text"], "hi");
        assert_eq!(value["result"]["content"][0]["mimeType"], "text/plain");
    }

    #[tokio::test]
    async fn scenario_reverse_tool_reverses_text() {
        let dispatcher = dispatcher_with_echo();
        let bytes = serde_json::to_vec(&request(
            "call_tool",
            serde_json::json!({"name": "reverse", "arguments": {"text": "abc"}}),
            2,
        ))
        .unwrap();
        let response_bytes = dispatcher.handle_message(ConnectionContext::default(), bytes).await.unwrap();
        let value: Value = serde_json::from_slice(&response_bytes).unwrap();
        assert_eq!(value["result"]["content"][0]["text"], "cba");
    }

    #[tokio::test]
    async fn unknown_method_is_method_not_found() {
        let dispatcher = dispatcher_with_echo();
        let bytes = serde_json::to_vec(&request("nonexistent", Value::Null, 3)).unwrap();
        let response_bytes = dispatcher.handle_message(ConnectionContext::default(), bytes).await.unwrap();
        let value: Value = serde_json::from_slice(&response_bytes).unwrap();
        assert_eq!(value["error"]["code"], ErrorKind::MethodNotFound.code());
    }

    #[tokio::test]
    async fn ping_returns_pong() {
        let dispatcher = dispatcher_with_echo();
        let bytes = serde_json::to_vec(&request("ping", Value::Null, 4)).unwrap();
        let response_bytes = dispatcher.handle_message(ConnectionContext::default(), bytes).await.unwrap();
        let value: Value = serde_json::from_slice(&response_bytes).unwrap();
        assert_eq!(value["result"], "pong");
    }

    #[tokio::test]
    async fn call_tool_missing_name_is_invalid_params() {
        let dispatcher = dispatcher_with_echo();
        let bytes = serde_json::to_vec(&request("call_tool", serde_json::json!({}), 5)).unwrap();
        let response_bytes = dispatcher.handle_message(ConnectionContext::default(), bytes).await.unwrap();
        let value: Value = serde_json::from_slice(&response_bytes).unwrap();
        assert_eq!(value["error"]["code"], ErrorKind::InvalidParams.code());
    }

    #[tokio::test]
    async fn call_tool_unregistered_name_is_tool_not_found() {
        let dispatcher = dispatcher_with_echo();
        let bytes = serde_json::to_vec(&request(
            "call_tool",
            serde_json::json!({"name": "nope", "arguments": {}}),
            6,
        ))
        .unwrap();
        let response_bytes = dispatcher.handle_message(ConnectionContext::default(), bytes).await.unwrap();
        let value: Value = serde_json::from_slice(&response_bytes).unwrap();
        assert_eq!(value["error"]["code"], ErrorKind::ToolNotFound.code());
    }

    #[tokio::test]
    async fn malformed_json_yields_parse_error_with_null_id() {
        let dispatcher = dispatcher_with_echo();
        let response_bytes = dispatcher
            .handle_message(ConnectionContext::default(), b"not json".to_vec())
            .await
            .unwrap();
        let value: Value = serde_json::from_slice(&response_bytes).unwrap();
        assert_eq!(value["error"]["code"], ErrorKind::ParseError.code());
        assert!(value["id"].is_null());
    }

    #[tokio::test]
    async fn batch_requests_preserve_input_order() {
        let dispatcher = dispatcher_with_echo();
        let batch = serde_json::json!([
            request("ping", Value::Null, 1),
            request("call_tool", serde_json::json!({"name": "echo", "arguments": {"text": "a"}}), 2),
            request("ping", Value::Null, 3),
        ]);
        let bytes = serde_json::to_vec(&batch).unwrap();
        let response_bytes = dispatcher.handle_message(ConnectionContext::default(), bytes).await.unwrap();
        let value: Value = serde_json::from_slice(&response_bytes).unwrap();
        let ids: Vec<i64> = value.as_array().unwrap().iter().map(|r| r["id"].as_i64().unwrap()).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn scenario_rate_limit_deny_after_third_call() {
        let dispatcher = dispatcher_with_echo();
        dispatcher.rate_limiter().add_rule(Rule {
            key_type: KeyType::Ip,
            algorithm: Algorithm::FixedWindow,
            key_pattern: KeyPattern::MatchAll,
            raw_pattern: None,
            priority: 0,
            params: AlgorithmParams {
                window_seconds: 1.0,
                max_per_window: 2,
                ..Default::default()
            },
        });
        let ctx = ConnectionContext {
            ip: Some("1.2.3.4".to_string()),
            ..Default::default()
        };
        let bytes = serde_json::to_vec(&request(
            "call_tool",
            serde_json::json!({"name": "echo", "arguments": {"text": "hi"}}),
            1,
        ))
        .unwrap();

        let first = dispatcher.handle_message(ctx.clone(), bytes.clone()).await.unwrap();
        let second = dispatcher.handle_message(ctx.clone(), bytes.clone()).await.unwrap();
        let third = dispatcher.handle_message(ctx.clone(), bytes.clone()).await.unwrap();

        let first: Value = serde_json::from_slice(&first).unwrap();
        let second: Value = serde_json::from_slice(&second).unwrap();
        let third: Value = serde_json::from_slice(&third).unwrap();
        assert!(first.get("result").is_some());
        assert!(second.get("result").is_some());
        assert_eq!(third["error"]["code"], ErrorKind::RateLimited.code());
        assert_eq!(dispatcher.metrics().snapshot().denied_requests, 1);
    }

    #[tokio::test]
    async fn read_resource_unknown_uri_is_resource_not_found() {
        let dispatcher = dispatcher_with_echo();
        let bytes = serde_json::to_vec(&request("read_resource", serde_json::json!({"uri": "x://nope"}), 1)).unwrap();
        let response_bytes = dispatcher.handle_message(ConnectionContext::default(), bytes).await.unwrap();
        let value: Value = serde_json::from_slice(&response_bytes).unwrap();
        assert_eq!(value["error"]["code"], ErrorKind::ResourceNotFound.code());
    }
}
