//! Per-connection handler loop (spec §4.6 "Per-client handler"), realized as
//! an async task instead of a dedicated OS thread: `tokio::select!` races the
//! next frame against the idle timeout and a `CancellationToken`, which is
//! the idiomatic tokio replacement for polling a `should_stop` flag between
//! bounded `wait_for_readable` slices.

use std::sync::Arc;
use std::time::Duration;

use futures::SinkExt;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite};
use tokio_util::codec::FramedWrite;
use tokio_util::sync::CancellationToken;

use mcprt_core::BufferPool;

use crate::error::{TransportError, TransportResult};
use crate::framing::FrameCodec;
use crate::traits::{ConnectionContext, OnError, OnMessage};
use crate::types::ConnectionConfig;

/// Drives a single framed connection to completion: reads frames, invokes
/// `on_message`, writes back any response, and exits on peer close, protocol
/// violation, idle timeout, or cancellation.
pub async fn run_connection<S>(
    stream: S,
    ctx: ConnectionContext,
    config: ConnectionConfig,
    pool: Option<Arc<BufferPool>>,
    on_message: OnMessage,
    on_error: OnError,
    cancellation: CancellationToken,
) -> TransportResult<()>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    let (mut reader, writer) = tokio::io::split(stream);
    let mut writer = FramedWrite::new(writer, FrameCodec::new(config.max_message_size));
    let idle_timeout = config.idle_timeout_ms.map(Duration::from_millis);

    loop {
        let frame = tokio::select! {
            biased;
            () = cancellation.cancelled() => {
                tracing::debug!(connection_id = ctx.connection_id, "connection cancelled");
                return Ok(());
            }
            next = read_next_frame(&mut reader, &pool, config.max_message_size, idle_timeout) => next,
        };

        let payload = match frame {
            Ok(Some(payload)) => payload,
            Ok(None) => return Ok(()),
            Err(err) => {
                on_error(ctx.clone(), err.clone());
                return Err(err);
            }
        };

        let response = on_message(ctx.clone(), payload).await;

        if let Some(response) = response {
            if response.len() > config.max_message_size as usize {
                tracing::warn!(
                    connection_id = ctx.connection_id,
                    size = response.len(),
                    "dropping oversized response"
                );
                continue;
            }
            if let Err(err) = writer.send(response.as_slice()).await {
                on_error(ctx.clone(), err.clone());
                return Err(err);
            }
        }
    }
}

/// Reads one full frame, racing the read against `idle_timeout` when set
/// (spec §4.6 step 1–2). Returns `Ok(None)` on a clean peer close observed
/// exactly at a frame boundary.
async fn read_next_frame<R>(
    reader: &mut R,
    pool: &Option<Arc<BufferPool>>,
    max_message_size: u32,
    idle_timeout: Option<Duration>,
) -> Result<Option<Vec<u8>>, TransportError>
where
    R: AsyncRead + Unpin,
{
    let read = read_frame_once(reader, pool, max_message_size);
    match idle_timeout {
        Some(d) => match tokio::time::timeout(d, read).await {
            Ok(result) => result,
            Err(_) => Err(TransportError::Timeout),
        },
        None => read.await,
    }
}

async fn read_frame_once<R>(
    reader: &mut R,
    pool: &Option<Arc<BufferPool>>,
    max_message_size: u32,
) -> Result<Option<Vec<u8>>, TransportError>
where
    R: AsyncRead + Unpin,
{
    let mut header = [0u8; 4];
    if read_length_prefix(reader, &mut header).await?.is_none() {
        return Ok(None);
    }
    let length = u32::from_be_bytes(header);
    if length == 0 || length > max_message_size {
        return Err(TransportError::InvalidFrameLength { length, max: max_message_size });
    }
    let payload = read_payload(reader, pool, length as usize).await?;
    Ok(Some(payload))
}

/// Fills `header` byte-by-byte via plain `read` calls (rather than
/// `read_exact`) so a peer close at the very start of a frame — zero bytes
/// consumed so far — can be told apart from a close mid-header, which is a
/// protocol violation rather than a clean shutdown (spec §4.6 step 3).
async fn read_length_prefix<R>(reader: &mut R, header: &mut [u8; 4]) -> Result<Option<()>, TransportError>
where
    R: AsyncRead + Unpin,
{
    let mut filled = 0;
    while filled < header.len() {
        let n = reader.read(&mut header[filled..]).await.map_err(TransportError::from)?;
        if n == 0 {
            return if filled == 0 {
                Ok(None)
            } else {
                Err(TransportError::ConnectionClosed)
            };
        }
        filled += n;
    }
    Ok(Some(()))
}

/// Reads `length` payload bytes directly into an acquired pool buffer when
/// it fits one block (spec §4.6 steps 5–6: "Acquire a buffer... Read
/// `length` bytes"), falling back to a heap allocation — with a warning —
/// when the payload doesn't fit a block or no pool is configured. The
/// socket read lands in the pooled buffer itself; the single copy out to
/// the returned `Vec<u8>` is what crosses into `on_message`'s owned-buffer
/// contract, not a throwaway. The pool buffer's guard releases the block
/// back to the pool on drop, right after that copy.
async fn read_payload<R>(
    reader: &mut R,
    pool: &Option<Arc<BufferPool>>,
    length: usize,
) -> Result<Vec<u8>, TransportError>
where
    R: AsyncRead + Unpin,
{
    if let Some(pool) = pool {
        if length + 1 <= pool.block_size() {
            if let Some(mut buf) = pool.acquire() {
                reader.read_exact(&mut buf[..length]).await.map_err(TransportError::from)?;
                return Ok(buf[..length].to_vec());
            }
        } else {
            tracing::warn!(size = length, "payload exceeds pool block size, using heap buffer");
        }
    }
    let mut payload = vec![0u8; length];
    reader.read_exact(&mut payload).await.map_err(TransportError::from)?;
    Ok(payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::duplex;

    fn echo_handler() -> OnMessage {
        Arc::new(|_ctx, bytes| Box::pin(async move { Some(bytes) }))
    }

    fn noop_error() -> OnError {
        Arc::new(|_ctx, _err| {})
    }

    #[tokio::test]
    async fn echoes_a_single_frame_then_closes_on_eof() {
        let (mut client, server) = duplex(1024);
        let cancellation = CancellationToken::new();
        let ctx = ConnectionContext::default();
        let config = ConnectionConfig {
            idle_timeout_ms: None,
            max_message_size: 1024,
            poll_interval_ms: 500,
        };

        let handle = tokio::spawn(run_connection(
            server,
            ctx,
            config,
            None,
            echo_handler(),
            noop_error(),
            cancellation.clone(),
        ));

        use tokio::io::AsyncWriteExt;
        client.write_u32(4).await.unwrap();
        client.write_all(b"ping").await.unwrap();

        let mut header = [0u8; 4];
        client.read_exact(&mut header).await.unwrap();
        let len = u32::from_be_bytes(header);
        let mut body = vec![0u8; len as usize];
        client.read_exact(&mut body).await.unwrap();
        assert_eq!(body, b"ping");

        drop(client);
        handle.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn cancellation_stops_the_loop_promptly() {
        let (client, server) = duplex(1024);
        let cancellation = CancellationToken::new();
        let ctx = ConnectionContext::default();
        let config = ConnectionConfig::default();

        let handle = tokio::spawn(run_connection(
            server,
            ctx,
            config,
            None,
            echo_handler(),
            noop_error(),
            cancellation.clone(),
        ));

        cancellation.cancel();
        handle.await.unwrap().unwrap();
        drop(client);
    }

    #[tokio::test]
    async fn idle_timeout_closes_connection_with_no_activity() {
        let (_client, server) = duplex(1024);
        let cancellation = CancellationToken::new();
        let ctx = ConnectionContext::default();
        let config = ConnectionConfig {
            idle_timeout_ms: Some(20),
            max_message_size: 1024,
            poll_interval_ms: 500,
        };

        let result = run_connection(server, ctx, config, None, echo_handler(), noop_error(), cancellation).await;
        assert!(matches!(result, Err(TransportError::Timeout)));
    }

    #[tokio::test]
    async fn pool_buffer_is_reused_across_messages_within_block_size() {
        let (mut client, server) = duplex(4096);
        let cancellation = CancellationToken::new();
        let ctx = ConnectionContext::default();
        let config = ConnectionConfig {
            idle_timeout_ms: None,
            max_message_size: 1024,
            poll_interval_ms: 500,
        };
        let pool = BufferPool::create(64, 1);

        let handle = tokio::spawn(run_connection(
            server,
            ctx,
            config,
            Some(pool.clone()),
            echo_handler(),
            noop_error(),
            cancellation.clone(),
        ));

        use tokio::io::AsyncWriteExt;
        for payload in [&b"first"[..], &b"second-msg"[..]] {
            client.write_u32(payload.len() as u32).await.unwrap();
            client.write_all(payload).await.unwrap();

            let mut header = [0u8; 4];
            client.read_exact(&mut header).await.unwrap();
            let len = u32::from_be_bytes(header);
            let mut body = vec![0u8; len as usize];
            client.read_exact(&mut body).await.unwrap();
            assert_eq!(body, payload);
        }

        // both payloads fit the 64-byte block: the pool must have served
        // both reads from its single preallocated block rather than growing.
        assert_eq!(pool.total_blocks(), 1);
        assert_eq!(pool.allocated_blocks(), 0);

        drop(client);
        handle.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn oversized_payload_falls_back_to_heap_without_growing_pool() {
        let (mut client, server) = duplex(4096);
        let cancellation = CancellationToken::new();
        let ctx = ConnectionContext::default();
        let config = ConnectionConfig {
            idle_timeout_ms: None,
            max_message_size: 1024,
            poll_interval_ms: 500,
        };
        let pool = BufferPool::create(4, 1);

        let handle = tokio::spawn(run_connection(
            server,
            ctx,
            config,
            Some(pool.clone()),
            echo_handler(),
            noop_error(),
            cancellation.clone(),
        ));

        use tokio::io::AsyncWriteExt;
        let payload = b"this payload is bigger than the 4-byte pool block";
        client.write_u32(payload.len() as u32).await.unwrap();
        client.write_all(payload).await.unwrap();

        let mut header = [0u8; 4];
        client.read_exact(&mut header).await.unwrap();
        let len = u32::from_be_bytes(header);
        let mut body = vec![0u8; len as usize];
        client.read_exact(&mut body).await.unwrap();
        assert_eq!(&body, payload);

        assert_eq!(pool.total_blocks(), 1);
        assert_eq!(pool.allocated_blocks(), 0);

        drop(client);
        handle.await.unwrap().unwrap();
    }
}
