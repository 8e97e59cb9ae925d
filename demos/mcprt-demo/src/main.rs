//! Reference driver: a TCP-bound mcprt server with `echo`/`reverse` tools
//! registered, used to exercise the end-to-end scenarios in spec §8.

mod cli;

use std::sync::Arc;

use async_trait::async_trait;
use clap::Parser;
use serde_json::Value;
use tracing_subscriber::EnvFilter;

use mcprt_core::BufferPool;
use mcprt_protocol::{ContentItem, McpError, Result as McpResult, ToolDescriptor, ToolParam};
use mcprt_server::{McpServer, ServerConfig, ToolCallOutcome, ToolHandler};
use mcprt_tcp::TcpServerTransport;
use mcprt_transport::ConnectionConfig;

use cli::Cli;

struct DemoTools;

#[async_trait]
impl ToolHandler for DemoTools {
    async fn call(&self, name: &str, arguments: Value) -> McpResult<ToolCallOutcome> {
        let text = arguments
            .get("text")
            .and_then(Value::as_str)
            .ok_or_else(|| McpError::invalid_params("missing required parameter \"text\""))?;

        let output = match name {
            "echo" => text.to_string(),
            "reverse" => text.chars().rev().collect(),
            other => return Err(McpError::tool_not_found(other)),
        };
        Ok(ToolCallOutcome::success(vec![ContentItem::text(output)]))
    }
}

fn init_logging(cli: &Cli) -> anyhow::Result<()> {
    let filter = EnvFilter::try_new(&cli.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = tracing_subscriber::fmt().with_env_filter(filter);

    match &cli.log_file {
        Some(path) => {
            let file = std::fs::OpenOptions::new().create(true).append(true).open(path)?;
            subscriber.with_writer(file).init();
        }
        None => subscriber.init(),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(&cli)?;

    if cli.ssl || cli.cert.is_some() || cli.key.is_some() {
        tracing::warn!("--ssl/--cert/--key are accepted but have no effect on the TCP reference transport");
    }
    if let Some(doc_root) = &cli.doc_root {
        tracing::info!(path = %doc_root.display(), "--doc-root accepted, unused by this driver's in-memory resources");
    }
    if let Some(config) = &cli.config {
        tracing::warn!(path = %config.display(), "--config accepted, ignored: this driver has no gateway configuration");
    }

    let bind_addr: std::net::SocketAddr = format!("{}:{}", cli.host, cli.port)
        .parse()
        .map_err(|e| anyhow::anyhow!("invalid --host/--port: {e}"))?;

    let server = Arc::new(McpServer::create(&ServerConfig::default()));
    server.add_tool(
        ToolDescriptor::new("echo", "Echoes the given text back unchanged")
            .with_param(ToolParam::required("text", "text to echo")),
    );
    server.add_tool(
        ToolDescriptor::new("reverse", "Reverses the given text")
            .with_param(ToolParam::required("text", "text to reverse")),
    );
    server.set_tool_handler(Arc::new(DemoTools));

    let transport = Arc::new(
        TcpServerTransport::new(bind_addr, ConnectionConfig::default()).with_pool(BufferPool::create(4096, 64)),
    );
    server.start(transport.clone()).await?;
    let bound = transport.bound_addr().unwrap_or(bind_addr);
    tracing::info!(addr = %bound, "mcprt-demo listening");

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutdown signal received");
    server.stop().await?;
    server.destroy().await?;

    Ok(())
}
