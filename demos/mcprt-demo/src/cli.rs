//! CLI argument parsing, following `turbomcp-cli::cli::Cli`'s derive-macro
//! shape (spec §6 "CLI surface").

use std::path::PathBuf;

use clap::Parser;

/// Runs a reference mcprt TCP server with the `echo`/`reverse` demonstration
/// tools registered.
#[derive(Parser, Debug)]
#[command(name = "mcprt-demo", version, about = "Reference mcprt MCP server driver")]
pub struct Cli {
    /// Address to bind the TCP transport to.
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,

    /// Port to bind the TCP transport to.
    #[arg(long, default_value_t = 7890)]
    pub port: u16,

    /// Optional gateway configuration file to load at startup.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Root directory for file-backed resources. Accepted for
    /// forward-compatibility with HTTP/TLS-capable transports; a no-op for
    /// the TCP reference transport.
    #[arg(long)]
    pub doc_root: Option<PathBuf>,

    /// Log level passed to `tracing-subscriber`'s env filter.
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// Optional file to append log output to, instead of stderr.
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Enable TLS termination. Accepted but a no-op: TLS is out of scope for
    /// the TCP reference transport.
    #[arg(long)]
    pub ssl: bool,

    /// TLS certificate path. A no-op unless `--ssl` is also accepted by a
    /// future transport.
    #[arg(long)]
    pub cert: Option<PathBuf>,

    /// TLS private key path. A no-op unless `--ssl` is also accepted by a
    /// future transport.
    #[arg(long)]
    pub key: Option<PathBuf>,
}
