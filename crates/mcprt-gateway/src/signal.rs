//! SIGHUP-triggered reload (spec §6 "Reload on SIGHUP (or equivalent admin
//! API)"), following the teacher's `tokio::signal::unix` usage in
//! `turbomcp-server::server::core` for its own shutdown signal handling.

#![cfg(all(unix, feature = "signal-reload"))]

use std::sync::Arc;

use tokio::signal::unix::{signal, SignalKind};

use crate::router::GatewayRouter;

/// Spawns a task that reloads `router` from its last-loaded config path
/// every time the process receives `SIGHUP`. Returns the task handle so the
/// caller can abort it on shutdown.
pub fn spawn_sighup_reload(router: Arc<GatewayRouter>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut stream = match signal(SignalKind::hangup()) {
            Ok(s) => s,
            Err(err) => {
                tracing::error!(error = %err, "failed to install SIGHUP handler");
                return;
            }
        };
        loop {
            if stream.recv().await.is_none() {
                break;
            }
            match router.reload_from_last_path() {
                Ok(true) => tracing::info!("gateway configuration reloaded on SIGHUP"),
                Ok(false) => tracing::warn!("SIGHUP received but no gateway config path is set"),
                Err(err) => tracing::error!(error = %err, "gateway reload on SIGHUP failed"),
            }
        }
    })
}
