//! Core transport trait (spec §4.5).

use std::future::Future;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;

use crate::error::TransportResult;
use crate::types::{TransportCapabilities, TransportState};

/// Identity hints a transport can supply about the peer on a connection,
/// consumed by the rate limiter and template ACL (spec §4.4, §4.8).
#[derive(Debug, Clone, Default)]
pub struct ConnectionContext {
    pub connection_id: u64,
    pub peer_addr: Option<SocketAddr>,
    pub ip: Option<String>,
    pub user_id: Option<String>,
    pub api_key: Option<String>,
}

/// `on_message(context, bytes) -> optional response bytes` (spec §4.5).
/// A `None` return with a non-zero `error_code` set on the context is logged
/// but not sent back to the peer; callers of a transport supply this as the
/// dispatcher's entry point.
pub type OnMessage = Arc<
    dyn Fn(ConnectionContext, Vec<u8>) -> Pin<Box<dyn Future<Output = Option<Vec<u8>>> + Send>>
        + Send
        + Sync,
>;

/// `on_error(context, error)` — out-of-band transport errors surfaced to the
/// server (spec §7 "Propagation policy").
pub type OnError = Arc<dyn Fn(ConnectionContext, crate::error::TransportError) + Send + Sync>;

/// A transport is polymorphic over start/stop/send/destroy (spec §4.5). Like
/// the async transport traits it is modeled on, every async operation
/// returns a boxed future so the trait stays object-safe.
pub trait Transport: Send + Sync + std::fmt::Debug {
    /// Static capability description (max message size, bidirectional
    /// support).
    fn capabilities(&self) -> &TransportCapabilities;

    /// Current lifecycle state.
    fn state(&self) -> TransportState;

    /// Starts accepting connections (or, for a client transport, connects),
    /// invoking `on_message` for every fully-framed inbound message and
    /// `on_error` for out-of-band failures.
    fn start(
        &self,
        on_message: OnMessage,
        on_error: OnError,
    ) -> Pin<Box<dyn Future<Output = TransportResult<()>> + Send + '_>>;

    /// Cooperative, non-blocking shutdown signal (spec §4.5 "Cancellation").
    /// Idempotent: a second call after the first is a no-op (spec §8
    /// "Idempotence").
    fn stop(&self) -> Pin<Box<dyn Future<Output = TransportResult<()>> + Send + '_>>;

    /// Waits for the accept/handler tasks to exit and releases resources.
    /// Idempotent after `stop` (spec §8 "Idempotence").
    fn destroy(&self) -> Pin<Box<dyn Future<Output = TransportResult<()>> + Send + '_>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn _object_safe(_t: &dyn Transport) {}
}
