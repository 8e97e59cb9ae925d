//! Hot-reloadable method-to-backend router (spec §4.9 "Gateway Router").
//!
//! Open Question (b) is resolved as **RCU via `arc-swap`**: the backend list
//! lives behind an [`ArcSwap`], so a reader that loaded a snapshot before a
//! reload keeps observing valid, non-dangling backends until it drops that
//! snapshot — no refcounted backend pointers need explicit grace-period
//! draining, `ArcSwap` already gives every outstanding `Guard` a live `Arc`.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use arc_swap::ArcSwap;
use dashmap::DashMap;
use parking_lot::Mutex;

use crate::backend::Backend;
use crate::config::{ConfigError, GatewayConfig};

/// Cumulative counters for the method→backend cache, mirroring the template
/// cache's stats shape (spec §4.9 "confirmed by stats `hits == 0`").
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RouterStats {
    pub hits: u64,
    pub misses: u64,
}

struct Counters {
    hits: std::sync::atomic::AtomicU64,
    misses: std::sync::atomic::AtomicU64,
}

impl Default for Counters {
    fn default() -> Self {
        Self {
            hits: std::sync::atomic::AtomicU64::new(0),
            misses: std::sync::atomic::AtomicU64::new(0),
        }
    }
}

/// Routes `(method, request)` to a [`Backend`], hot-reloadable from a
/// configuration file on disk.
pub struct GatewayRouter {
    backends: ArcSwap<Vec<Arc<Backend>>>,
    cache: DashMap<String, Option<Arc<Backend>>>,
    counters: Counters,
    config_path: Mutex<Option<PathBuf>>,
}

impl GatewayRouter {
    /// Creates a router with no backends configured.
    #[must_use]
    pub fn new() -> Self {
        Self {
            backends: ArcSwap::from_pointee(Vec::new()),
            cache: DashMap::new(),
            counters: Counters::default(),
            config_path: Mutex::new(None),
        }
    }

    /// Loads an initial configuration from `path`, remembering the path for
    /// subsequent [`reload`](Self::reload) calls with no argument.
    pub fn from_config_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let router = Self::new();
        router.reload(path.as_ref())?;
        Ok(router)
    }

    fn apply(&self, config: GatewayConfig) {
        let backends: Vec<Arc<Backend>> = config.backend.iter().map(|e| Arc::new(Backend::from(e))).collect();
        self.backends.store(Arc::new(backends));
        self.cache.clear();
    }

    /// Parses `path` and atomically swaps in the new backend list under an
    /// exclusive lock on the config path bookkeeping, clearing the
    /// method→backend cache (both positive and negative entries) — the
    /// spec's only cache-invalidating operation. On parse failure the
    /// existing configuration and cache are left untouched.
    pub fn reload(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let config = GatewayConfig::load(path)?;
        *self.config_path.lock() = Some(path.to_path_buf());
        self.apply(config);
        tracing::info!(path = %path.display(), "gateway configuration reloaded");
        Ok(())
    }

    /// Re-reads the last-loaded config path, for SIGHUP-style reload
    /// triggers. Returns `false` (a no-op) if no path has ever been loaded.
    pub fn reload_from_last_path(&self) -> Result<bool, ConfigError> {
        let path = self.config_path.lock().clone();
        match path {
            Some(path) => {
                self.reload(path)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Looks up the backend for `method`: cache hit returns immediately
    /// (lock-free read); on miss the full backend list is scanned in
    /// priority order and the result — positive or negative — is cached
    /// (spec §4.9 "Lookup").
    #[must_use]
    pub fn find_backend(&self, method: &str) -> Option<Arc<Backend>> {
        if let Some(cached) = self.cache.get(method) {
            self.counters.hits.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
            return cached.clone();
        }
        self.counters.misses.fetch_add(1, std::sync::atomic::Ordering::Relaxed);

        let backends = self.backends.load();
        let found = backends.iter().find(|b| b.routes(method)).cloned();
        self.cache.insert(method.to_string(), found.clone());
        found
    }

    #[must_use]
    pub fn stats(&self) -> RouterStats {
        RouterStats {
            hits: self.counters.hits.load(std::sync::atomic::Ordering::Relaxed),
            misses: self.counters.misses.load(std::sync::atomic::Ordering::Relaxed),
        }
    }

    #[must_use]
    pub fn backend_count(&self) -> usize {
        self.backends.load().len()
    }
}

impl Default for GatewayRouter {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for GatewayRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayRouter")
            .field("backend_count", &self.backend_count())
            .field("stats", &self.stats())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(dir: &tempfile::TempDir, backends_json: &str) -> PathBuf {
        let path = dir.path().join("gateway.json");
        let mut f = std::fs::File::create(&path).unwrap();
        write!(f, r#"{{"backend": {backends_json}}}"#).unwrap();
        path
    }

    #[test]
    fn finds_backend_matching_method_and_caches_negative_result() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            &dir,
            r#"[{"name": "users", "target": "tcp://127.0.0.1:9001", "methods": ["users.*"]}]"#,
        );
        let router = GatewayRouter::from_config_file(&path).unwrap();

        let found = router.find_backend("users.get").unwrap();
        assert_eq!(found.name, "users");

        assert!(router.find_backend("unroutable").is_none());
        // second lookup for the same unroutable method must be a cache hit.
        let misses_before = router.stats().misses;
        assert!(router.find_backend("unroutable").is_none());
        assert_eq!(router.stats().misses, misses_before);
    }

    #[test]
    fn reload_swaps_backend_and_clears_cache() {
        let dir = tempfile::tempdir().unwrap();
        let path_a = write_config(
            &dir,
            r#"[{"name": "a", "target": "tcp://127.0.0.1:9001", "methods": ["m"]}]"#,
        );
        let router = GatewayRouter::from_config_file(&path_a).unwrap();
        assert_eq!(router.find_backend("m").unwrap().name, "a");
        assert!(router.stats().hits == 0);

        let path_b = dir.path().join("gateway2.json");
        std::fs::write(
            &path_b,
            r#"{"backend": [{"name": "b", "target": "tcp://127.0.0.1:9002", "methods": ["m"]}]}"#,
        )
        .unwrap();
        router.reload(&path_b).unwrap();

        // cache was cleared by reload: the very next lookup is a fresh miss.
        assert_eq!(router.stats().hits, 0);
        assert_eq!(router.find_backend("m").unwrap().name, "b");
    }

    #[test]
    fn parse_failure_leaves_existing_configuration_intact() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            &dir,
            r#"[{"name": "a", "target": "tcp://127.0.0.1:9001", "methods": ["m"]}]"#,
        );
        let router = GatewayRouter::from_config_file(&path).unwrap();

        let bad_path = dir.path().join("broken.json");
        std::fs::write(&bad_path, "not json").unwrap();
        assert!(router.reload(&bad_path).is_err());

        // still routes against the original config.
        assert_eq!(router.find_backend("m").unwrap().name, "a");
    }

    #[test]
    fn priority_is_list_order_first_match_wins() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            &dir,
            r#"[
                {"name": "specific", "target": "t1", "methods": ["users.get"]},
                {"name": "catch-all", "target": "t2", "methods": ["*"]}
            ]"#,
        );
        let router = GatewayRouter::from_config_file(&path).unwrap();
        assert_eq!(router.find_backend("users.get").unwrap().name, "specific");
        assert_eq!(router.find_backend("anything_else").unwrap().name, "catch-all");
    }
}
