//! The four rate-limit algorithm state machines (spec §4.4 "Algorithms").

use std::collections::VecDeque;

use crate::types::{Algorithm, AlgorithmParams};

/// Per-client state for whichever algorithm the applicable rule names.
/// A client entry's algorithm must match the currently-applicable rule's
/// algorithm; on mismatch (e.g. after a config reload changes the winning
/// rule) the caller discards and recreates the entry rather than mutating it
/// in place (spec §3 "Rate-limit client entry" invariant).
#[derive(Debug, Clone)]
pub enum ClientState {
    FixedWindow { window_start: f64, count: u32 },
    SlidingWindow { timestamps: VecDeque<f64> },
    TokenBucket { tokens: f64, last_refill: f64 },
    LeakyBucket { water: f64, last_leak: f64 },
}

impl ClientState {
    #[must_use]
    pub fn new(algorithm: Algorithm, now: f64) -> Self {
        match algorithm {
            Algorithm::FixedWindow => Self::FixedWindow {
                window_start: now,
                count: 0,
            },
            Algorithm::SlidingWindow => Self::SlidingWindow {
                timestamps: VecDeque::new(),
            },
            Algorithm::TokenBucket => Self::TokenBucket {
                tokens: 0.0,
                last_refill: now,
            },
            Algorithm::LeakyBucket => Self::LeakyBucket {
                water: 0.0,
                last_leak: now,
            },
        }
    }

    #[must_use]
    pub fn algorithm(&self) -> Algorithm {
        match self {
            Self::FixedWindow { .. } => Algorithm::FixedWindow,
            Self::SlidingWindow { .. } => Algorithm::SlidingWindow,
            Self::TokenBucket { .. } => Algorithm::TokenBucket,
            Self::LeakyBucket { .. } => Algorithm::LeakyBucket,
        }
    }

    /// Checks and updates state for a single request arriving at `now`
    /// (seconds, monotonic). Returns `true` if the request is allowed.
    pub fn check(&mut self, params: &AlgorithmParams, now: f64) -> bool {
        match self {
            Self::FixedWindow { window_start, count } => {
                if now - *window_start >= params.window_seconds {
                    *window_start = now;
                    *count = 0;
                }
                if *count < params.max_per_window {
                    *count += 1;
                    true
                } else {
                    false
                }
            }
            Self::SlidingWindow { timestamps } => {
                while let Some(&front) = timestamps.front() {
                    if now - front >= params.window_seconds {
                        timestamps.pop_front();
                    } else {
                        break;
                    }
                }
                if (timestamps.len() as u32) < params.max_per_window {
                    timestamps.push_back(now);
                    true
                } else {
                    false
                }
            }
            Self::TokenBucket { tokens, last_refill } => {
                let elapsed = (now - *last_refill).max(0.0);
                *tokens = (*tokens + elapsed * params.rate_per_sec).min(params.max_tokens);
                *last_refill = now;
                if *tokens >= 1.0 {
                    *tokens -= 1.0;
                    true
                } else {
                    false
                }
            }
            Self::LeakyBucket { water, last_leak } => {
                let elapsed = (now - *last_leak).max(0.0);
                *water = (*water - elapsed * params.leak_rate_per_sec).max(0.0);
                *last_leak = now;
                if *water + 1.0 <= params.burst_capacity {
                    *water += 1.0;
                    true
                } else {
                    false
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(overrides: impl FnOnce(&mut AlgorithmParams)) -> AlgorithmParams {
        let mut p = AlgorithmParams::default();
        overrides(&mut p);
        p
    }

    #[test]
    fn fixed_window_resets_after_window_elapses() {
        let p = params(|p| {
            p.window_seconds = 1.0;
            p.max_per_window = 2;
        });
        let mut s = ClientState::new(Algorithm::FixedWindow, 0.0);
        assert!(s.check(&p, 0.0));
        assert!(s.check(&p, 0.1));
        assert!(!s.check(&p, 0.2));
        assert!(s.check(&p, 1.1));
    }

    #[test]
    fn sliding_window_denies_at_exact_capacity_all_in_window() {
        let p = params(|p| {
            p.window_seconds = 10.0;
            p.max_per_window = 3;
        });
        let mut s = ClientState::new(Algorithm::SlidingWindow, 0.0);
        assert!(s.check(&p, 0.0));
        assert!(s.check(&p, 1.0));
        assert!(s.check(&p, 2.0));
        assert!(!s.check(&p, 3.0));
    }

    #[test]
    fn sliding_window_allows_once_oldest_timestamp_ages_out() {
        let p = params(|p| {
            p.window_seconds = 5.0;
            p.max_per_window = 1;
        });
        let mut s = ClientState::new(Algorithm::SlidingWindow, 0.0);
        assert!(s.check(&p, 0.0));
        assert!(!s.check(&p, 1.0));
        assert!(s.check(&p, 6.0));
    }

    #[test]
    fn token_bucket_refills_over_time_and_caps_at_max() {
        let p = params(|p| {
            p.rate_per_sec = 1.0;
            p.max_tokens = 2.0;
        });
        let mut s = ClientState::new(Algorithm::TokenBucket, 0.0);
        assert!(!s.check(&p, 0.0)); // starts empty
        assert!(s.check(&p, 5.0)); // refilled to cap, consume one
    }

    #[test]
    fn leaky_bucket_allows_within_burst_capacity() {
        let p = params(|p| {
            p.burst_capacity = 2.0;
            p.leak_rate_per_sec = 1.0;
        });
        let mut s = ClientState::new(Algorithm::LeakyBucket, 0.0);
        assert!(s.check(&p, 0.0));
        assert!(s.check(&p, 0.0));
        assert!(!s.check(&p, 0.0));
        assert!(s.check(&p, 1.0)); // one unit leaked out
    }
}
