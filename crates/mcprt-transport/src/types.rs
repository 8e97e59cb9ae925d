//! Transport capability/state types (spec §4.5, §4.6).

use serde::{Deserialize, Serialize};

/// Declared transport shape (spec §4.5: "two shapes: server, client").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportKind {
    Server,
    Client,
}

/// Lifecycle state a transport or connection passes through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportState {
    Idle,
    Starting,
    Running,
    Stopping,
    Stopped,
}

/// Static capability description for a transport instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportCapabilities {
    pub kind: TransportKind,
    pub max_message_size: usize,
    pub supports_bidirectional: bool,
}

impl TransportCapabilities {
    #[must_use]
    pub fn server(max_message_size: usize) -> Self {
        Self {
            kind: TransportKind::Server,
            max_message_size,
            supports_bidirectional: true,
        }
    }
}

/// Tuning knobs a connection handler enforces (spec §4.6 "Per-client
/// handler", §5 "Timeouts").
#[derive(Debug, Clone, Copy)]
pub struct ConnectionConfig {
    pub idle_timeout_ms: Option<u64>,
    pub max_message_size: u32,
    pub poll_interval_ms: u64,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            idle_timeout_ms: None,
            max_message_size: mcprt_protocol::MAX_MESSAGE_SIZE as u32,
            poll_interval_ms: 500,
        }
    }
}
