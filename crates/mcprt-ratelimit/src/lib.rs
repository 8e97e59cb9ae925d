//! Rate limiting: fixed/sliding window and token/leaky bucket algorithms,
//! keyed on IP, user ID, API key, or a custom string (spec §4.4).

pub mod algorithms;
pub mod limiter;
pub mod types;

pub use algorithms::ClientState;
pub use limiter::{Decision, LimiterStats, RateLimiter};
pub use types::{Algorithm, AlgorithmParams, KeyPattern, KeyType, Rule, MAX_RULES_PER_KEY_TYPE};
