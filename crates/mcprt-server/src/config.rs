//! Server configuration (spec §4.7 "Worker pool", §6), a builder-pattern
//! struct with a `Default` impl following
//! `turbomcp-server::config::ServerConfig`/`ServerConfigBuilder`.

use mcprt_protocol::MAX_MESSAGE_SIZE;

/// Tuning knobs for a [`crate::server::McpServer`].
#[derive(Debug, Clone, Copy)]
pub struct ServerConfig {
    /// Worker pool size (spec §4.7 default 4).
    pub thread_pool_size: usize,
    /// Worker pool bounded-queue capacity (spec §4.7 default 32).
    pub task_queue_size: usize,
    /// Maximum accepted wire frame payload size in bytes.
    pub max_message_size: u32,
    /// Idle-connection timeout; `None` disables idle disconnects.
    pub idle_timeout_ms: Option<u64>,
    /// When true, `thread_pool_size` is overridden at `start()` with the
    /// `2 × cores + 1` auto-adjust heuristic.
    pub auto_adjust_workers: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            thread_pool_size: 4,
            task_queue_size: 32,
            max_message_size: MAX_MESSAGE_SIZE as u32,
            idle_timeout_ms: None,
            auto_adjust_workers: false,
        }
    }
}

impl ServerConfig {
    #[must_use]
    pub fn builder() -> ServerConfigBuilder {
        ServerConfigBuilder::default()
    }
}

/// Builder for [`ServerConfig`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ServerConfigBuilder {
    config: ServerConfigOverrides,
}

#[derive(Debug, Clone, Copy, Default)]
struct ServerConfigOverrides {
    thread_pool_size: Option<usize>,
    task_queue_size: Option<usize>,
    max_message_size: Option<u32>,
    idle_timeout_ms: Option<u64>,
    auto_adjust_workers: Option<bool>,
}

impl ServerConfigBuilder {
    #[must_use]
    pub fn thread_pool_size(mut self, size: usize) -> Self {
        self.config.thread_pool_size = Some(size);
        self
    }

    #[must_use]
    pub fn task_queue_size(mut self, size: usize) -> Self {
        self.config.task_queue_size = Some(size);
        self
    }

    #[must_use]
    pub fn max_message_size(mut self, size: u32) -> Self {
        self.config.max_message_size = Some(size);
        self
    }

    #[must_use]
    pub fn idle_timeout_ms(mut self, timeout: u64) -> Self {
        self.config.idle_timeout_ms = Some(timeout);
        self
    }

    #[must_use]
    pub fn auto_adjust_workers(mut self, enabled: bool) -> Self {
        self.config.auto_adjust_workers = Some(enabled);
        self
    }

    #[must_use]
    pub fn build(self) -> ServerConfig {
        let defaults = ServerConfig::default();
        ServerConfig {
            thread_pool_size: self.config.thread_pool_size.unwrap_or(defaults.thread_pool_size),
            task_queue_size: self.config.task_queue_size.unwrap_or(defaults.task_queue_size),
            max_message_size: self.config.max_message_size.unwrap_or(defaults.max_message_size),
            idle_timeout_ms: self.config.idle_timeout_ms.or(defaults.idle_timeout_ms),
            auto_adjust_workers: self.config.auto_adjust_workers.unwrap_or(defaults.auto_adjust_workers),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_spec_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.thread_pool_size, 4);
        assert_eq!(config.task_queue_size, 32);
    }

    #[test]
    fn builder_overrides_only_what_is_set() {
        let config = ServerConfig::builder().thread_pool_size(8).build();
        assert_eq!(config.thread_pool_size, 8);
        assert_eq!(config.task_queue_size, 32);
    }
}
