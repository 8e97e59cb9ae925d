//! Gateway-style backend routing with hot-reloadable configuration
//! (spec §4.9).

pub mod backend;
pub mod config;
pub mod router;

#[cfg(all(unix, feature = "signal-reload"))]
pub mod signal;

pub use backend::{Backend, BackendEntry, MethodPattern};
pub use config::{ConfigError, GatewayConfig};
pub use router::{GatewayRouter, RouterStats};
