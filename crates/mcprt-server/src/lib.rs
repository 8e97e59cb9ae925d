//! Dispatcher, handler registry, worker pool, and template security for the
//! mcprt MCP server runtime (spec §4.7, §4.8).

pub mod config;
pub mod dispatcher;
pub mod handler;
pub mod registry;
pub mod security;
pub mod server;
pub mod worker_pool;

pub use config::{ServerConfig, ServerConfigBuilder};
pub use dispatcher::Dispatcher;
pub use handler::{ResourceHandler, ToolCallOutcome, ToolHandler};
pub use registry::HandlerRegistry;
pub use security::{TemplateSecurity, ValidatorFn};
pub use server::McpServer;
pub use worker_pool::{WorkerPool, WorkerPoolError, WorkerPoolStats};
