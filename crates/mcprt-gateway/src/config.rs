//! Gateway configuration file parsing (spec §6 "Configuration file
//! (gateway)").
//!
//! The spec describes the file as "key-value records defining backends and
//! their routing predicates" without mandating a wire format; this uses
//! `serde_json` (already the workspace's JSON value type everywhere else)
//! rather than pulling in a dedicated config-file crate for a shape this
//! simple.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::backend::BackendEntry;

/// Errors encountered while loading a gateway configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read gateway config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse gateway config {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// The on-disk gateway configuration: an ordered list of backends. Order is
/// significant — it is the routing predicate's priority order (first match
/// wins, spec §4.9 "Lookup").
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default)]
    pub backend: Vec<BackendEntry>,
}

impl GatewayConfig {
    /// Loads and parses a configuration file. On any I/O or parse failure the
    /// caller's existing configuration is left untouched (spec §6 "parse
    /// failures leave the existing configuration intact") — this function
    /// only ever returns the *new* config or an error, it never mutates
    /// shared state itself.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path_ref = path.as_ref();
        let raw = std::fs::read_to_string(path_ref).map_err(|source| ConfigError::Read {
            path: path_ref.display().to_string(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path_ref.display().to_string(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_backend_list_preserving_order() {
        let raw = r#"{
            "backend": [
                {"name": "users", "target": "tcp://127.0.0.1:9001", "methods": ["users.*"]},
                {"name": "default", "target": "tcp://127.0.0.1:9000", "methods": ["*"]}
            ]
        }"#;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gateway.json");
        std::fs::write(&path, raw).unwrap();

        let config = GatewayConfig::load(&path).unwrap();
        assert_eq!(config.backend.len(), 2);
        assert_eq!(config.backend[0].name, "users");
        assert_eq!(config.backend[1].name, "default");
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let err = GatewayConfig::load("/nonexistent/gateway.json").unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "{ not json").unwrap();
        let err = GatewayConfig::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }
}
