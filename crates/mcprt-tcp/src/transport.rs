//! TCP reference transport (spec §4.6).
//!
//! The accept loop is a single `tokio::task` racing `TcpListener::accept`
//! against a `CancellationToken` inside `tokio::select!` — the async
//! equivalent of `poll(listen, stop_pipe)` on POSIX / `select` on Windows,
//! without needing a self-pipe trick. A fixed-size `tokio::sync::Semaphore`
//! stands in for the reference design's mutex-guarded slot array: acquiring
//! a permit is "claiming a free slot", and dropping the owned permit when a
//! handler task exits is "releasing the slot" (spec §4.6 "Accept loop").

use std::future::Future;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::net::TcpListener;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use mcprt_core::BufferPool;
use mcprt_transport::{
    ConnectionConfig, ConnectionContext, OnError, OnMessage, Transport, TransportCapabilities,
    TransportError, TransportResult, TransportState,
};

/// Default bound on simultaneously active client connections (spec §4.6:
/// "fixed slot array (default 10, implementation-configurable)").
pub const DEFAULT_MAX_CONNECTIONS: usize = 10;

/// A TCP server transport: accepts connections on `bind_addr` and spawns one
/// task per client, each running [`mcprt_transport::run_connection`].
#[derive(Debug)]
pub struct TcpServerTransport {
    bind_addr: SocketAddr,
    capabilities: TransportCapabilities,
    connection_config: ConnectionConfig,
    max_connections: usize,
    pool: Option<Arc<BufferPool>>,
    cancellation: CancellationToken,
    accept_handle: Mutex<Option<JoinHandle<()>>>,
    actual_addr: Mutex<Option<SocketAddr>>,
    next_connection_id: AtomicU64,
    stopped: AtomicBool,
    destroyed: AtomicBool,
}

impl TcpServerTransport {
    #[must_use]
    pub fn new(bind_addr: SocketAddr, connection_config: ConnectionConfig) -> Self {
        Self::with_max_connections(bind_addr, connection_config, DEFAULT_MAX_CONNECTIONS)
    }

    #[must_use]
    pub fn with_max_connections(
        bind_addr: SocketAddr,
        connection_config: ConnectionConfig,
        max_connections: usize,
    ) -> Self {
        Self {
            bind_addr,
            capabilities: TransportCapabilities::server(connection_config.max_message_size as usize),
            connection_config,
            max_connections,
            pool: None,
            cancellation: CancellationToken::new(),
            accept_handle: Mutex::new(None),
            actual_addr: Mutex::new(None),
            next_connection_id: AtomicU64::new(1),
            stopped: AtomicBool::new(false),
            destroyed: AtomicBool::new(false),
        }
    }

    /// Attaches a buffer pool used by spawned connection handlers.
    #[must_use]
    pub fn with_pool(mut self, pool: Arc<BufferPool>) -> Self {
        self.pool = Some(pool);
        self
    }

    #[must_use]
    pub fn local_bind_addr(&self) -> SocketAddr {
        self.bind_addr
    }

    /// The address actually bound once `start` has run (resolves ephemeral
    /// `:0` ports). `None` before `start` or after `destroy`.
    #[must_use]
    pub fn bound_addr(&self) -> Option<SocketAddr> {
        *self.actual_addr.lock()
    }
}

async fn accept_loop(
    listener: TcpListener,
    cancellation: CancellationToken,
    semaphore: Arc<Semaphore>,
    connection_config: ConnectionConfig,
    pool: Option<Arc<BufferPool>>,
    on_message: OnMessage,
    on_error: OnError,
    next_connection_id: Arc<AtomicU64>,
) {
    loop {
        let permit = tokio::select! {
            biased;
            () = cancellation.cancelled() => break,
            permit = semaphore.clone().acquire_owned() => permit,
        };
        let Ok(permit) = permit else { break };

        let accepted = tokio::select! {
            biased;
            () = cancellation.cancelled() => break,
            result = listener.accept() => result,
        };

        let (stream, peer_addr) = match accepted {
            Ok(pair) => pair,
            Err(err) => {
                tracing::warn!(error = %err, "accept failed");
                drop(permit);
                continue;
            }
        };

        let connection_id = next_connection_id.fetch_add(1, Ordering::Relaxed);
        let ctx = ConnectionContext {
            connection_id,
            peer_addr: Some(peer_addr),
            ip: Some(peer_addr.ip().to_string()),
            user_id: None,
            api_key: None,
        };

        let conn_cancellation = cancellation.child_token();
        let conn_pool = pool.clone();
        let conn_on_message = on_message.clone();
        let conn_on_error = on_error.clone();

        tokio::spawn(async move {
            let _permit = permit;
            if let Err(err) = mcprt_transport::run_connection(
                stream,
                ctx.clone(),
                connection_config,
                conn_pool,
                conn_on_message,
                conn_on_error.clone(),
                conn_cancellation,
            )
            .await
            {
                tracing::debug!(connection_id = ctx.connection_id, error = %err, "connection closed");
            }
        });
    }
}

impl Transport for TcpServerTransport {
    fn capabilities(&self) -> &TransportCapabilities {
        &self.capabilities
    }

    fn state(&self) -> TransportState {
        if self.destroyed.load(Ordering::Acquire) {
            TransportState::Stopped
        } else if self.stopped.load(Ordering::Acquire) {
            TransportState::Stopping
        } else if self.accept_handle.lock().is_some() {
            TransportState::Running
        } else {
            TransportState::Idle
        }
    }

    fn start(
        &self,
        on_message: OnMessage,
        on_error: OnError,
    ) -> Pin<Box<dyn Future<Output = TransportResult<()>> + Send + '_>> {
        Box::pin(async move {
            let listener = TcpListener::bind(self.bind_addr)
                .await
                .map_err(|e| TransportError::ConnectionFailed(e.to_string()))?;
            let local_addr = listener
                .local_addr()
                .map_err(|e| TransportError::ConnectionFailed(e.to_string()))?;
            *self.actual_addr.lock() = Some(local_addr);
            let semaphore = Arc::new(Semaphore::new(self.max_connections));
            let next_id = Arc::new(AtomicU64::new(self.next_connection_id.load(Ordering::Relaxed)));
            let handle = tokio::spawn(accept_loop(
                listener,
                self.cancellation.clone(),
                semaphore,
                self.connection_config,
                self.pool.clone(),
                on_message,
                on_error,
                next_id,
            ));
            *self.accept_handle.lock() = Some(handle);
            Ok(())
        })
    }

    fn stop(&self) -> Pin<Box<dyn Future<Output = TransportResult<()>> + Send + '_>> {
        Box::pin(async move {
            if self.stopped.swap(true, Ordering::AcqRel) {
                return Ok(());
            }
            self.cancellation.cancel();
            Ok(())
        })
    }

    fn destroy(&self) -> Pin<Box<dyn Future<Output = TransportResult<()>> + Send + '_>> {
        Box::pin(async move {
            if self.destroyed.swap(true, Ordering::AcqRel) {
                return Ok(());
            }
            if !self.stopped.load(Ordering::Acquire) {
                self.stopped.store(true, Ordering::Release);
                self.cancellation.cancel();
            }
            let handle = self.accept_handle.lock().take();
            if let Some(handle) = handle {
                let _ = tokio::time::timeout(std::time::Duration::from_secs(2), handle).await;
            }
            *self.actual_addr.lock() = None;
            Ok(())
        })
    }
}
