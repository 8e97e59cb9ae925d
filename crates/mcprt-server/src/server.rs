//! Top-level server object binding a [`Dispatcher`] to a transport (spec
//! §4.7 "Server lifecycle", §8 "Idempotence").

use std::sync::Arc;

use mcprt_core::MetricsSnapshot;
use mcprt_protocol::{ResourceDescriptor, ResourceTemplateDescriptor, ToolDescriptor};
use mcprt_transport::{ConnectionContext, OnError, OnMessage, Transport, TransportResult};

use crate::config::ServerConfig;
use crate::dispatcher::Dispatcher;
use crate::handler::{ResourceHandler, ToolHandler};
use crate::security::ValidatorFn;
use crate::worker_pool::WorkerPoolStats;

/// The mcprt MCP server: a [`Dispatcher`] plus the transport it is bound to.
/// `create` builds one with no transport attached yet; `start` attaches a
/// transport and begins serving.
pub struct McpServer {
    dispatcher: Dispatcher,
    transport: parking_lot::Mutex<Option<Arc<dyn Transport>>>,
}

impl McpServer {
    /// Builds a server from `config`, with no tools, resources, or handlers
    /// registered yet (spec §4.7 "Server lifecycle": construction never
    /// touches a transport).
    #[must_use]
    pub fn create(config: &ServerConfig) -> Self {
        Self {
            dispatcher: Dispatcher::new(config),
            transport: parking_lot::Mutex::new(None),
        }
    }

    pub fn set_tool_handler(&self, handler: Arc<dyn ToolHandler>) {
        self.dispatcher.set_tool_handler(handler);
    }

    pub fn set_resource_handler(&self, handler: Arc<dyn ResourceHandler>) {
        self.dispatcher.set_resource_handler(handler);
    }

    pub fn add_tool(&self, tool: ToolDescriptor) {
        self.dispatcher.registry().add_tool(tool);
    }

    pub fn remove_tool(&self, name: &str) -> bool {
        self.dispatcher.registry().remove_tool(name)
    }

    #[must_use]
    pub fn find_tool(&self, name: &str) -> Option<ToolDescriptor> {
        self.dispatcher.registry().find_tool(name)
    }

    #[must_use]
    pub fn list_tools(&self) -> Vec<ToolDescriptor> {
        self.dispatcher.registry().list_tools()
    }

    pub fn add_resource(&self, resource: ResourceDescriptor) {
        self.dispatcher.registry().add_resource(resource);
    }

    pub fn remove_resource(&self, uri: &str) -> bool {
        self.dispatcher.registry().remove_resource(uri)
    }

    #[must_use]
    pub fn list_resources(&self) -> Vec<ResourceDescriptor> {
        self.dispatcher.registry().list_resources()
    }

    pub fn add_resource_template(&self, template: ResourceTemplateDescriptor) {
        self.dispatcher.registry().add_resource_template(template);
    }

    pub fn remove_resource_template(&self, uri_template: &str) -> bool {
        self.dispatcher.registry().remove_resource_template(uri_template)
    }

    #[must_use]
    pub fn list_resource_templates(&self) -> Vec<ResourceTemplateDescriptor> {
        self.dispatcher.registry().list_resource_templates()
    }

    /// Registers the allowed-role set for a template (spec §4.8). An empty
    /// set is permissive.
    pub fn set_template_acl(&self, template_uri: &str, roles: std::collections::HashSet<String>) {
        self.dispatcher.security().set_acl(template_uri, roles);
    }

    /// Registers a per-template validator closure (spec §4.8).
    pub fn set_template_validator(&self, template_uri: &str, validator: ValidatorFn) {
        self.dispatcher.security().set_validator(template_uri, validator);
    }

    /// Adds a rate-limit rule (spec §4.4).
    pub fn add_rate_limit_rule(&self, rule: mcprt_ratelimit::Rule) {
        self.dispatcher.rate_limiter().add_rule(rule);
    }

    #[must_use]
    pub fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.dispatcher.metrics().snapshot()
    }

    #[must_use]
    pub fn worker_pool_stats(&self) -> WorkerPoolStats {
        self.dispatcher.worker_pool_stats()
    }

    /// Binds `transport` and starts it, wiring `dispatcher.handle_message`
    /// as the transport's `on_message` callback (spec §4.5, §4.7).
    pub async fn start(&self, transport: Arc<dyn Transport>) -> TransportResult<()> {
        let dispatcher = self.dispatcher.clone();
        let on_message: OnMessage = Arc::new(move |ctx: ConnectionContext, bytes: Vec<u8>| {
            let dispatcher = dispatcher.clone();
            Box::pin(async move { dispatcher.handle_message(ctx, bytes).await })
        });
        let on_error: OnError = Arc::new(|ctx, err| {
            tracing::warn!(connection_id = ctx.connection_id, error = %err, "transport error");
        });

        transport.start(on_message, on_error).await?;
        *self.transport.lock() = Some(transport);
        Ok(())
    }

    /// Signals the bound transport to stop accepting new work. Idempotent;
    /// a no-op if no transport has been started (spec §8 "Idempotence").
    pub async fn stop(&self) -> TransportResult<()> {
        let transport = self.transport.lock().clone();
        match transport {
            Some(transport) => transport.stop().await,
            None => Ok(()),
        }
    }

    /// Waits for the bound transport to fully wind down and releases it.
    /// Idempotent after `stop`.
    pub async fn destroy(&self) -> TransportResult<()> {
        let transport = self.transport.lock().take();
        match transport {
            Some(transport) => transport.destroy().await,
            None => Ok(()),
        }
    }
}
