//! Gateway backend descriptor and its routing predicate (spec §3 "Gateway
//! backend", §4.9).

use serde::{Deserialize, Serialize};

/// A glob restricted to a leading and/or trailing `*`, the same simple
/// pattern syntax spec §4.3/§4.4 use for template globs and rate-limit key
/// patterns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MethodPattern {
    MatchAll,
    Exact(String),
    Prefix(String),
    Suffix(String),
    Contains(String),
}

impl MethodPattern {
    #[must_use]
    pub fn parse(glob: &str) -> Self {
        if glob == "*" {
            return Self::MatchAll;
        }
        let starts = glob.starts_with('*');
        let ends = glob.ends_with('*') && glob.len() > 1;
        match (starts, ends) {
            (true, true) => Self::Contains(glob[1..glob.len() - 1].to_string()),
            (true, false) => Self::Suffix(glob[1..].to_string()),
            (false, true) => Self::Prefix(glob[..glob.len() - 1].to_string()),
            (false, false) => Self::Exact(glob.to_string()),
        }
    }

    #[must_use]
    pub fn is_match(&self, method: &str) -> bool {
        match self {
            Self::MatchAll => true,
            Self::Exact(s) => method == s,
            Self::Prefix(s) => method.starts_with(s.as_str()),
            Self::Suffix(s) => method.ends_with(s.as_str()),
            Self::Contains(s) => method.contains(s.as_str()),
        }
    }
}

/// A downstream target the gateway can route a method to (spec §3 "Gateway
/// backend": `{name, routing_predicate, target_endpoint}`).
#[derive(Debug, Clone)]
pub struct Backend {
    pub name: String,
    pub target_endpoint: String,
    patterns: Vec<MethodPattern>,
}

impl Backend {
    #[must_use]
    pub fn new(name: impl Into<String>, target_endpoint: impl Into<String>, methods: &[String]) -> Self {
        Self {
            name: name.into(),
            target_endpoint: target_endpoint.into(),
            patterns: methods.iter().map(|m| MethodPattern::parse(m)).collect(),
        }
    }

    /// Whether this backend's routing predicate matches `method`.
    #[must_use]
    pub fn routes(&self, method: &str) -> bool {
        self.patterns.iter().any(|p| p.is_match(method))
    }
}

/// On-disk representation of a single backend entry (spec §6 "Configuration
/// file (gateway)").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendEntry {
    pub name: String,
    pub target: String,
    #[serde(default)]
    pub methods: Vec<String>,
}

impl From<&BackendEntry> for Backend {
    fn from(entry: &BackendEntry) -> Self {
        Backend::new(entry.name.clone(), entry.target.clone(), &entry.methods)
    }
}
