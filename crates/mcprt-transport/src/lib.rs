//! Transport abstraction, length-prefixed framing, and the per-connection
//! handler loop shared by every concrete transport (spec §4.5, §4.6).

pub mod connection;
pub mod error;
pub mod framing;
pub mod traits;
pub mod types;

pub use connection::run_connection;
pub use error::{TransportError, TransportResult};
pub use framing::FrameCodec;
pub use traits::{ConnectionContext, OnError, OnMessage, Transport};
pub use types::{ConnectionConfig, TransportCapabilities, TransportKind, TransportState};
