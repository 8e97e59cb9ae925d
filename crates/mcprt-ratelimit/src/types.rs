//! Rule and key types for the rate limiter (spec §4.4).

use serde::{Deserialize, Serialize};

/// What a rate-limit key is derived from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyType {
    Ip,
    UserId,
    ApiKey,
    Custom,
}

impl KeyType {
    /// The fixed evaluation order resolved for Open Question (c):
    /// api_key, then user_id, then ip, then custom, first allow wins.
    pub const EVALUATION_ORDER: [KeyType; 4] =
        [KeyType::ApiKey, KeyType::UserId, KeyType::Ip, KeyType::Custom];
}

/// Which algorithm a rule enforces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Algorithm {
    FixedWindow,
    SlidingWindow,
    TokenBucket,
    LeakyBucket,
}

/// Per-algorithm tuning parameters. Only the fields relevant to a rule's
/// `algorithm` are consulted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AlgorithmParams {
    pub window_seconds: f64,
    pub max_per_window: u32,
    pub rate_per_sec: f64,
    pub max_tokens: f64,
    pub leak_rate_per_sec: f64,
    pub burst_capacity: f64,
}

impl Default for AlgorithmParams {
    fn default() -> Self {
        Self {
            window_seconds: 1.0,
            max_per_window: 10,
            rate_per_sec: 10.0,
            max_tokens: 10.0,
            leak_rate_per_sec: 10.0,
            burst_capacity: 10.0,
        }
    }
}

/// A glob pattern restricted to leading/trailing `*` (spec §4.3/§4.4 share
/// the same simple glob syntax).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyPattern {
    MatchAll,
    Exact(String),
    Prefix(String),
    Suffix(String),
    Contains(String),
}

impl KeyPattern {
    #[must_use]
    pub fn parse(pattern: Option<&str>) -> Self {
        let Some(glob) = pattern else {
            return Self::MatchAll;
        };
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
    pub fn is_match(&self, value: &str) -> bool {
        match self {
            Self::MatchAll => true,
            Self::Exact(s) => value == s,
            Self::Prefix(s) => value.starts_with(s.as_str()),
            Self::Suffix(s) => value.ends_with(s.as_str()),
            Self::Contains(s) => value.contains(s.as_str()),
        }
    }
}

/// A single rate-limit rule. Rules per key type are bounded at 32 (spec
/// §4.4), enforced by [`crate::limiter::RateLimiter::add_rule`].
#[derive(Debug, Clone)]
pub struct Rule {
    pub key_type: KeyType,
    pub algorithm: Algorithm,
    pub key_pattern: KeyPattern,
    pub raw_pattern: Option<String>,
    pub priority: i32,
    pub params: AlgorithmParams,
}

/// Maximum number of rules retained per key type (spec §4.4).
pub const MAX_RULES_PER_KEY_TYPE: usize = 32;
