//! The rate limiter: rule storage, rule matching, and per-client state
//! (spec §4.4).

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::mapref::entry::Entry as ClientTableEntry;
use dashmap::DashMap;
use parking_lot::RwLock;

use crate::algorithms::ClientState;
use crate::types::{Algorithm, KeyPattern, KeyType, Rule, MAX_RULES_PER_KEY_TYPE};

/// Outcome of a [`RateLimiter::check`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny,
}

/// A single client entry in the limiter's client table, identified by
/// `(key_type, key_string)`.
struct ClientEntry {
    algorithm: Algorithm,
    state: ClientState,
}

/// Cumulative `check()` counters plus the client table's high-water mark
/// (spec §4.4 contract: "Atomically increments total and allowed/denied
/// counters"; "Client table": "Peak client count tracked for metrics").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LimiterStats {
    pub total: u64,
    pub allowed: u64,
    pub denied: u64,
    pub peak_clients: u64,
}

#[derive(Debug, Default)]
struct Counters {
    total: AtomicU64,
    allowed: AtomicU64,
    denied: AtomicU64,
    peak_clients: AtomicU64,
}

/// Four priority-ordered rule lists (one per [`KeyType`]) plus the shared
/// client state table. Rules are mutated under `parking_lot::RwLock`; the
/// client table is a `dashmap::DashMap` so concurrent checks on different
/// clients don't contend a single lock.
pub struct RateLimiter {
    rules: HashMap<KeyType, RwLock<Vec<Rule>>>,
    clients: DashMap<(KeyType, String), ClientEntry>,
    counters: Counters,
}

impl RateLimiter {
    #[must_use]
    pub fn new() -> Self {
        let mut rules = HashMap::new();
        for kt in [KeyType::Ip, KeyType::UserId, KeyType::ApiKey, KeyType::Custom] {
            rules.insert(kt, RwLock::new(Vec::new()));
        }
        Self {
            rules,
            clients: DashMap::new(),
            counters: Counters::default(),
        }
    }

    /// Adds a rule. Rule lists stay priority-sorted (highest first) and
    /// bounded at [`MAX_RULES_PER_KEY_TYPE`] per key type; beyond that an
    /// older, lower-priority rule is evicted to make room. Duplicate
    /// `(key_type, pattern, priority)` triples are *not* deduplicated (spec
    /// §7 "Idempotence").
    pub fn add_rule(&self, mut rule: Rule) {
        rule.key_pattern = KeyPattern::parse(rule.raw_pattern.as_deref());
        let list = &self.rules[&rule.key_type];
        let mut guard = list.write();
        guard.push(rule);
        guard.sort_by(|a, b| b.priority.cmp(&a.priority));
        if guard.len() > MAX_RULES_PER_KEY_TYPE {
            guard.truncate(MAX_RULES_PER_KEY_TYPE);
        }
    }

    /// Removes the first rule matching `key_type`/`pattern`/`priority`.
    /// Returns whether a rule was removed.
    pub fn remove_rule(&self, key_type: KeyType, pattern: Option<&str>, priority: i32) -> bool {
        let list = &self.rules[&key_type];
        let mut guard = list.write();
        if let Some(pos) = guard
            .iter()
            .position(|r| r.raw_pattern.as_deref() == pattern && r.priority == priority)
        {
            guard.remove(pos);
            true
        } else {
            false
        }
    }

    fn applicable_rule(&self, key_type: KeyType, key_value: &str) -> Option<Rule> {
        let list = self.rules[&key_type].read();
        list.iter()
            .find(|r| r.key_pattern.is_match(key_value))
            .cloned()
    }

    /// Evaluates `keys` (one value per key type the caller has available)
    /// against the rule tables, walking [`KeyType::EVALUATION_ORDER`] and
    /// short-circuiting on the first key type whose applicable rule allows
    /// the request (Open Question (c), resolved as "short-circuit-on-allow").
    /// A key type with no applicable rule is, per spec §4.4 "Client table"
    /// ("if no rule applies, the request is implicitly allowed (no
    /// tracking)"), itself an allow and short-circuits the evaluation —
    /// an unconfigured limiter is permissive, not deny-by-default. Only a
    /// key type whose rule's algorithm rejects the request moves evaluation
    /// on to the next key type; if every observed key type's rule denies,
    /// the request is denied.
    ///
    /// Atomically increments the total/allowed/denied counters exposed via
    /// [`stats`](Self::stats) (spec §4.4 contract, §8 invariant #2:
    /// `total_before + 1 == total_after ∧ allowed_after + denied_after ==
    /// total_after`).
    pub fn check(&self, keys: &HashMap<KeyType, String>, now: f64) -> Decision {
        self.counters.total.fetch_add(1, Ordering::Relaxed);
        let decision = self.evaluate(keys, now);
        match decision {
            Decision::Allow => self.counters.allowed.fetch_add(1, Ordering::Relaxed),
            Decision::Deny => self.counters.denied.fetch_add(1, Ordering::Relaxed),
        };
        decision
    }

    fn evaluate(&self, keys: &HashMap<KeyType, String>, now: f64) -> Decision {
        for key_type in KeyType::EVALUATION_ORDER {
            let Some(key_value) = keys.get(&key_type) else {
                continue;
            };
            let Some(rule) = self.applicable_rule(key_type, key_value) else {
                return Decision::Allow;
            };
            let table_key = (key_type, key_value.clone());
            let mut entry = match self.clients.entry(table_key) {
                ClientTableEntry::Occupied(e) => e.into_ref(),
                ClientTableEntry::Vacant(e) => {
                    let inserted = e.insert(ClientEntry {
                        algorithm: rule.algorithm,
                        state: ClientState::new(rule.algorithm, now),
                    });
                    self.track_new_client();
                    inserted
                }
            };
            if entry.algorithm != rule.algorithm {
                entry.algorithm = rule.algorithm;
                entry.state = ClientState::new(rule.algorithm, now);
            }
            if entry.state.check(&rule.params, now) {
                return Decision::Allow;
            }
        }
        Decision::Deny
    }

    /// Updates the peak-client high-water mark after a new `(key_type, key)`
    /// entry is inserted into the client table (spec §4.4 "Client table":
    /// "Peak client count tracked for metrics"), using the same CAS-retry
    /// pattern `mcprt_core::metrics::ServerMetrics` uses for its peak
    /// connection count.
    fn track_new_client(&self) {
        let current_count = self.clients.len() as u64;
        let mut peak = self.counters.peak_clients.load(Ordering::Relaxed);
        while current_count > peak {
            match self.counters.peak_clients.compare_exchange_weak(
                peak,
                current_count,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(observed) => peak = observed,
            }
        }
    }

    /// Drops all per-client state, e.g. after a config reload invalidates
    /// rule assumptions wholesale.
    pub fn clear_clients(&self) {
        self.clients.clear();
    }

    #[must_use]
    pub fn client_count(&self) -> usize {
        self.clients.len()
    }

    /// Cumulative total/allowed/denied `check()` counts plus the client
    /// table's peak size (spec §4.4, §8 invariant #2).
    #[must_use]
    pub fn stats(&self) -> LimiterStats {
        LimiterStats {
            total: self.counters.total.load(Ordering::Relaxed),
            allowed: self.counters.allowed.load(Ordering::Relaxed),
            denied: self.counters.denied.load(Ordering::Relaxed),
            peak_clients: self.counters.peak_clients.load(Ordering::Relaxed),
        }
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AlgorithmParams;

    fn rule(key_type: KeyType, algorithm: Algorithm, priority: i32, params: AlgorithmParams) -> Rule {
        Rule {
            key_type,
            algorithm,
            key_pattern: KeyPattern::MatchAll,
            raw_pattern: None,
            priority,
            params,
        }
    }

    #[test]
    fn fixed_window_deny_after_third_call_scenario() {
        let limiter = RateLimiter::new();
        limiter.add_rule(rule(
            KeyType::Ip,
            Algorithm::FixedWindow,
            0,
            AlgorithmParams {
                window_seconds: 1.0,
                max_per_window: 2,
                ..Default::default()
            },
        ));

        let mut keys = HashMap::new();
        keys.insert(KeyType::Ip, "1.2.3.4".to_string());

        assert_eq!(limiter.check(&keys, 0.0), Decision::Allow);
        assert_eq!(limiter.check(&keys, 0.1), Decision::Allow);
        assert_eq!(limiter.check(&keys, 0.2), Decision::Deny);
    }

    #[test]
    fn higher_priority_rule_wins_when_both_patterns_match() {
        let limiter = RateLimiter::new();
        limiter.add_rule(rule(
            KeyType::ApiKey,
            Algorithm::FixedWindow,
            1,
            AlgorithmParams {
                max_per_window: 100,
                ..Default::default()
            },
        ));
        limiter.add_rule(rule(
            KeyType::ApiKey,
            Algorithm::FixedWindow,
            10,
            AlgorithmParams {
                max_per_window: 1,
                ..Default::default()
            },
        ));

        let mut keys = HashMap::new();
        keys.insert(KeyType::ApiKey, "key-1".to_string());
        assert_eq!(limiter.check(&keys, 0.0), Decision::Allow);
        assert_eq!(limiter.check(&keys, 0.0), Decision::Deny);
    }

    #[test]
    fn no_applicable_rule_is_implicitly_allowed() {
        let limiter = RateLimiter::new();
        let mut keys = HashMap::new();
        keys.insert(KeyType::Ip, "9.9.9.9".to_string());
        assert_eq!(limiter.check(&keys, 0.0), Decision::Allow);
    }

    #[test]
    fn unconfigured_limiter_allows_every_key_type() {
        let limiter = RateLimiter::new();
        assert_eq!(limiter.check(&HashMap::new(), 0.0), Decision::Allow);
    }

    #[test]
    fn rule_present_but_denying_falls_through_to_unconfigured_key_type() {
        let limiter = RateLimiter::new();
        limiter.add_rule(rule(
            KeyType::ApiKey,
            Algorithm::FixedWindow,
            0,
            AlgorithmParams {
                max_per_window: 0,
                ..Default::default()
            },
        ));
        let mut keys = HashMap::new();
        keys.insert(KeyType::ApiKey, "key-1".to_string());
        keys.insert(KeyType::Ip, "1.2.3.4".to_string());
        // api_key's rule denies (max_per_window 0), falls through to ip,
        // which has no rule and is implicitly allowed.
        assert_eq!(limiter.check(&keys, 0.0), Decision::Allow);
    }

    #[test]
    fn api_key_allow_short_circuits_before_ip_is_checked() {
        let limiter = RateLimiter::new();
        limiter.add_rule(rule(
            KeyType::ApiKey,
            Algorithm::FixedWindow,
            0,
            AlgorithmParams {
                max_per_window: 100,
                ..Default::default()
            },
        ));
        limiter.add_rule(rule(
            KeyType::Ip,
            Algorithm::FixedWindow,
            0,
            AlgorithmParams {
                max_per_window: 0,
                ..Default::default()
            },
        ));

        let mut keys = HashMap::new();
        keys.insert(KeyType::ApiKey, "key-1".to_string());
        keys.insert(KeyType::Ip, "1.2.3.4".to_string());
        assert_eq!(limiter.check(&keys, 0.0), Decision::Allow);
    }

    #[test]
    fn duplicate_rules_are_not_deduplicated() {
        let limiter = RateLimiter::new();
        limiter.add_rule(rule(KeyType::Ip, Algorithm::FixedWindow, 5, AlgorithmParams::default()));
        limiter.add_rule(rule(KeyType::Ip, Algorithm::FixedWindow, 5, AlgorithmParams::default()));
        let list = limiter.rules[&KeyType::Ip].read();
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn remove_rule_removes_first_match_only() {
        let limiter = RateLimiter::new();
        limiter.add_rule(rule(KeyType::Ip, Algorithm::FixedWindow, 5, AlgorithmParams::default()));
        limiter.add_rule(rule(KeyType::Ip, Algorithm::FixedWindow, 5, AlgorithmParams::default()));
        assert!(limiter.remove_rule(KeyType::Ip, None, 5));
        let list = limiter.rules[&KeyType::Ip].read();
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn rules_bounded_at_max_per_key_type() {
        let limiter = RateLimiter::new();
        for i in 0..(MAX_RULES_PER_KEY_TYPE + 5) {
            limiter.add_rule(rule(
                KeyType::Custom,
                Algorithm::FixedWindow,
                i as i32,
                AlgorithmParams::default(),
            ));
        }
        let list = limiter.rules[&KeyType::Custom].read();
        assert_eq!(list.len(), MAX_RULES_PER_KEY_TYPE);
    }

    #[test]
    fn invariant_total_equals_allowed_plus_denied() {
        let limiter = RateLimiter::new();
        limiter.add_rule(rule(
            KeyType::Ip,
            Algorithm::FixedWindow,
            0,
            AlgorithmParams {
                window_seconds: 1.0,
                max_per_window: 2,
                ..Default::default()
            },
        ));
        let mut keys = HashMap::new();
        keys.insert(KeyType::Ip, "1.2.3.4".to_string());

        let before = limiter.stats().total;
        assert_eq!(limiter.check(&keys, 0.0), Decision::Allow);
        let after = limiter.stats();
        assert_eq!(before + 1, after.total);
        assert_eq!(after.allowed + after.denied, after.total);

        limiter.check(&keys, 0.1); // allow, 2nd in window
        limiter.check(&keys, 0.2); // deny, 3rd in window
        let stats = limiter.stats();
        assert_eq!(stats.total, 3);
        assert_eq!(stats.allowed, 2);
        assert_eq!(stats.denied, 1);
        assert_eq!(stats.allowed + stats.denied, stats.total);
    }

    #[test]
    fn unconfigured_key_type_still_counts_as_allowed() {
        let limiter = RateLimiter::new();
        let mut keys = HashMap::new();
        keys.insert(KeyType::Ip, "9.9.9.9".to_string());
        limiter.check(&keys, 0.0);
        let stats = limiter.stats();
        assert_eq!(stats.total, 1);
        assert_eq!(stats.allowed, 1);
        assert_eq!(stats.denied, 0);
    }

    #[test]
    fn peak_clients_tracks_high_water_mark_across_distinct_keys() {
        let limiter = RateLimiter::new();
        limiter.add_rule(rule(KeyType::Ip, Algorithm::FixedWindow, 0, AlgorithmParams::default()));

        let mut a = HashMap::new();
        a.insert(KeyType::Ip, "1.1.1.1".to_string());
        let mut b = HashMap::new();
        b.insert(KeyType::Ip, "2.2.2.2".to_string());

        limiter.check(&a, 0.0);
        assert_eq!(limiter.stats().peak_clients, 1);
        limiter.check(&b, 0.0);
        assert_eq!(limiter.stats().peak_clients, 2);

        // clearing clients drops the live count but the peak is a
        // high-water mark, not a current gauge — it must not go back down.
        limiter.clear_clients();
        assert_eq!(limiter.client_count(), 0);
        assert_eq!(limiter.stats().peak_clients, 2);

        // re-observing "a" after the clear creates one new entry; peak
        // stays at 2 since the live count (1) doesn't exceed it.
        limiter.check(&a, 0.0);
        assert_eq!(limiter.stats().peak_clients, 2);
    }
}
