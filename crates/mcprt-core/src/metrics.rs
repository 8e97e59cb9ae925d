//! Process-wide performance metrics (spec §4.10).
//!
//! Mirrors `turbomcp-transport-traits::metrics::AtomicMetrics`'s style: plain
//! atomics for the hot counters, CAS-retry loops for min/max, and a
//! `snapshot()` that's cheap enough to call from a JSON export endpoint.

use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Lock-free, atomic counters backing a server's performance metrics.
#[derive(Debug)]
pub struct ServerMetrics {
    total_requests: AtomicU64,
    successful_requests: AtomicU64,
    failed_requests: AtomicU64,
    timeout_requests: AtomicU64,
    denied_requests: AtomicU64,
    total_latency_us: AtomicU64,
    min_latency_us: AtomicI64,
    max_latency_us: AtomicI64,
    bytes_sent: AtomicU64,
    bytes_received: AtomicU64,
    active_connections: AtomicU64,
    peak_connections: AtomicU64,
    started_at_ms: AtomicU64,
    last_reset_at_ms: AtomicU64,
}

impl Default for ServerMetrics {
    fn default() -> Self {
        let now = now_millis();
        Self {
            total_requests: AtomicU64::new(0),
            successful_requests: AtomicU64::new(0),
            failed_requests: AtomicU64::new(0),
            timeout_requests: AtomicU64::new(0),
            denied_requests: AtomicU64::new(0),
            total_latency_us: AtomicU64::new(0),
            min_latency_us: AtomicI64::new(i64::MAX),
            max_latency_us: AtomicI64::new(0),
            bytes_sent: AtomicU64::new(0),
            bytes_received: AtomicU64::new(0),
            active_connections: AtomicU64::new(0),
            peak_connections: AtomicU64::new(0),
            started_at_ms: AtomicU64::new(now),
            last_reset_at_ms: AtomicU64::new(now),
        }
    }
}

/// A serializable point-in-time snapshot, matching the fixed schema in
/// spec §6.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    pub timeout_requests: u64,
    pub denied_requests: u64,
    pub avg_latency_us: f64,
    pub min_latency_us: i64,
    pub max_latency_us: i64,
    pub bytes_sent: u64,
    pub bytes_received: u64,
    pub active_connections: u64,
    pub peak_connections: u64,
    pub error_rate_percent: f64,
    pub started_at_ms: u64,
    pub last_reset_at_ms: u64,
}

impl ServerMetrics {
    /// Creates a fresh metrics set stamped with the current time.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a completed request's outcome and latency.
    pub fn record_request(&self, latency_us: u64, outcome: RequestOutcome) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        match outcome {
            RequestOutcome::Success => {
                self.successful_requests.fetch_add(1, Ordering::Relaxed);
            }
            RequestOutcome::Failure => {
                self.failed_requests.fetch_add(1, Ordering::Relaxed);
            }
            RequestOutcome::Timeout => {
                self.timeout_requests.fetch_add(1, Ordering::Relaxed);
            }
            RequestOutcome::Denied => {
                self.denied_requests.fetch_add(1, Ordering::Relaxed);
            }
        }
        self.total_latency_us.fetch_add(latency_us, Ordering::Relaxed);
        Self::cas_min(&self.min_latency_us, latency_us as i64);
        Self::cas_max(&self.max_latency_us, latency_us as i64);
    }

    fn cas_min(slot: &AtomicI64, value: i64) {
        let mut current = slot.load(Ordering::Relaxed);
        while value < current {
            match slot.compare_exchange_weak(current, value, Ordering::Relaxed, Ordering::Relaxed) {
                Ok(_) => break,
                Err(observed) => current = observed,
            }
        }
    }

    fn cas_max(slot: &AtomicI64, value: i64) {
        let mut current = slot.load(Ordering::Relaxed);
        while value > current {
            match slot.compare_exchange_weak(current, value, Ordering::Relaxed, Ordering::Relaxed) {
                Ok(_) => break,
                Err(observed) => current = observed,
            }
        }
    }

    /// Records bytes transferred in either direction.
    pub fn record_bytes(&self, sent: u64, received: u64) {
        self.bytes_sent.fetch_add(sent, Ordering::Relaxed);
        self.bytes_received.fetch_add(received, Ordering::Relaxed);
    }

    /// Increments the active-connection count, updating the peak if needed.
    pub fn connection_opened(&self) {
        let active = self.active_connections.fetch_add(1, Ordering::Relaxed) + 1;
        Self::cas_peak(&self.peak_connections, active);
    }

    fn cas_peak(slot: &AtomicU64, value: u64) {
        let mut current = slot.load(Ordering::Relaxed);
        while value > current {
            match slot.compare_exchange_weak(current, value, Ordering::Relaxed, Ordering::Relaxed) {
                Ok(_) => break,
                Err(observed) => current = observed,
            }
        }
    }

    /// Decrements the active-connection count.
    pub fn connection_closed(&self) {
        self.active_connections
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |v| {
                Some(v.saturating_sub(1))
            })
            .ok();
    }

    /// Resets all counters to zero except `active_connections`, which is
    /// preserved; `peak_connections` is snapshotted down to the current
    /// active count (spec §4.10 "Reset").
    pub fn reset(&self) {
        let active = self.active_connections.load(Ordering::Relaxed);
        self.total_requests.store(0, Ordering::Relaxed);
        self.successful_requests.store(0, Ordering::Relaxed);
        self.failed_requests.store(0, Ordering::Relaxed);
        self.timeout_requests.store(0, Ordering::Relaxed);
        self.denied_requests.store(0, Ordering::Relaxed);
        self.total_latency_us.store(0, Ordering::Relaxed);
        self.min_latency_us.store(i64::MAX, Ordering::Relaxed);
        self.max_latency_us.store(0, Ordering::Relaxed);
        self.bytes_sent.store(0, Ordering::Relaxed);
        self.bytes_received.store(0, Ordering::Relaxed);
        self.peak_connections.store(active, Ordering::Relaxed);
        self.last_reset_at_ms.store(now_millis(), Ordering::Relaxed);
    }

    /// Takes a consistent-enough snapshot for JSON export (spec §4.10,
    /// "eventual consistency of counters between snapshot fields is
    /// acceptable").
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        let total = self.total_requests.load(Ordering::Relaxed);
        let failed = self.failed_requests.load(Ordering::Relaxed);
        let total_latency = self.total_latency_us.load(Ordering::Relaxed);
        let min = self.min_latency_us.load(Ordering::Relaxed);
        let avg_latency_us = if total > 0 {
            total_latency as f64 / total as f64
        } else {
            0.0
        };
        let error_rate_percent = if total > 0 {
            (failed as f64 / total as f64) * 100.0
        } else {
            0.0
        };
        MetricsSnapshot {
            total_requests: total,
            successful_requests: self.successful_requests.load(Ordering::Relaxed),
            failed_requests: failed,
            timeout_requests: self.timeout_requests.load(Ordering::Relaxed),
            denied_requests: self.denied_requests.load(Ordering::Relaxed),
            avg_latency_us,
            min_latency_us: if min == i64::MAX { 0 } else { min },
            max_latency_us: self.max_latency_us.load(Ordering::Relaxed),
            bytes_sent: self.bytes_sent.load(Ordering::Relaxed),
            bytes_received: self.bytes_received.load(Ordering::Relaxed),
            active_connections: self.active_connections.load(Ordering::Relaxed),
            peak_connections: self.peak_connections.load(Ordering::Relaxed),
            error_rate_percent,
            started_at_ms: self.started_at_ms.load(Ordering::Relaxed),
            last_reset_at_ms: self.last_reset_at_ms.load(Ordering::Relaxed),
        }
    }

    /// Renders the snapshot as a `serde_json::Value` (spec §6 JSON export).
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self.snapshot()).unwrap_or(serde_json::Value::Null)
    }
}

/// The outcome bucket a completed request falls into (spec §4.10).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestOutcome {
    Success,
    Failure,
    Timeout,
    Denied,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_and_snapshots_counters() {
        let m = ServerMetrics::new();
        m.record_request(100, RequestOutcome::Success);
        m.record_request(300, RequestOutcome::Failure);
        let s = m.snapshot();
        assert_eq!(s.total_requests, 2);
        assert_eq!(s.successful_requests, 1);
        assert_eq!(s.failed_requests, 1);
        assert_eq!(s.min_latency_us, 100);
        assert_eq!(s.max_latency_us, 300);
        assert!((s.error_rate_percent - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn reset_preserves_active_and_snapshots_peak() {
        let m = ServerMetrics::new();
        m.connection_opened();
        m.connection_opened();
        m.connection_closed();
        m.record_request(50, RequestOutcome::Success);
        m.reset();
        let s = m.snapshot();
        assert_eq!(s.total_requests, 0);
        assert_eq!(s.active_connections, 1);
        assert_eq!(s.peak_connections, 1);
    }

    #[test]
    fn peak_connections_tracks_high_water_mark() {
        let m = ServerMetrics::new();
        m.connection_opened();
        m.connection_opened();
        m.connection_opened();
        m.connection_closed();
        let s = m.snapshot();
        assert_eq!(s.active_connections, 2);
        assert_eq!(s.peak_connections, 3);
    }
}
