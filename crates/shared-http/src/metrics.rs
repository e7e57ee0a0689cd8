//! Request counters exposed on `/metrics`.

use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};

/// Per-instance request counters.
#[derive(Debug, Default)]
pub struct ServiceMetrics {
    pub requests_total: AtomicU64,
    pub requests_success: AtomicU64,
    pub requests_client_error: AtomicU64,
    pub requests_server_error: AtomicU64,
    pub rate_limited: AtomicU64,
    pub shed: AtomicU64,

    // Cache-aside
    pub cache_hits: AtomicU64,
    pub cache_misses: AtomicU64,
    pub cache_invalidations: AtomicU64,

    // Transaction participant
    pub txn_prepared: AtomicU64,
    pub txn_committed: AtomicU64,
    pub txn_aborted: AtomicU64,
    pub txn_swept: AtomicU64,

    // Latency tracking (sum and count, average derived on read)
    pub total_latency_ms: AtomicU64,
    pub request_count_for_latency: AtomicU64,
}

impl ServiceMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a finished request by its response status.
    pub fn record_response(&self, status: u16, latency_ms: u64) {
        self.requests_total.fetch_add(1, Ordering::Relaxed);

        match status {
            429 => {
                self.rate_limited.fetch_add(1, Ordering::Relaxed);
                self.requests_client_error.fetch_add(1, Ordering::Relaxed);
            }
            503 => {
                self.shed.fetch_add(1, Ordering::Relaxed);
                self.requests_server_error.fetch_add(1, Ordering::Relaxed);
            }
            400..=499 => {
                self.requests_client_error.fetch_add(1, Ordering::Relaxed);
            }
            500..=599 => {
                self.requests_server_error.fetch_add(1, Ordering::Relaxed);
            }
            _ => {
                self.requests_success.fetch_add(1, Ordering::Relaxed);
            }
        }

        self.total_latency_ms.fetch_add(latency_ms, Ordering::Relaxed);
        self.request_count_for_latency
            .fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cache_miss(&self) {
        self.cache_misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cache_invalidation(&self) {
        self.cache_invalidations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_prepare(&self) {
        self.txn_prepared.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_commit(&self) {
        self.txn_committed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_abort(&self) {
        self.txn_aborted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_swept(&self, count: usize) {
        self.txn_swept.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn avg_latency_ms(&self) -> f64 {
        let total = self.total_latency_ms.load(Ordering::Relaxed);
        let count = self.request_count_for_latency.load(Ordering::Relaxed);
        if count == 0 {
            0.0
        } else {
            total as f64 / count as f64
        }
    }

    pub fn to_json(&self) -> Value {
        json!({
            "requests_total": self.requests_total.load(Ordering::Relaxed),
            "requests_success": self.requests_success.load(Ordering::Relaxed),
            "requests_client_error": self.requests_client_error.load(Ordering::Relaxed),
            "requests_server_error": self.requests_server_error.load(Ordering::Relaxed),
            "rate_limited": self.rate_limited.load(Ordering::Relaxed),
            "shed": self.shed.load(Ordering::Relaxed),
            "avg_latency_ms": self.avg_latency_ms(),
            "cache": {
                "hits": self.cache_hits.load(Ordering::Relaxed),
                "misses": self.cache_misses.load(Ordering::Relaxed),
                "invalidations": self.cache_invalidations.load(Ordering::Relaxed),
            },
            "transactions": {
                "prepared": self.txn_prepared.load(Ordering::Relaxed),
                "committed": self.txn_committed.load(Ordering::Relaxed),
                "aborted": self.txn_aborted.load(Ordering::Relaxed),
                "swept": self.txn_swept.load(Ordering::Relaxed),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_by_status_class() {
        let metrics = ServiceMetrics::new();
        metrics.record_response(200, 10);
        metrics.record_response(201, 20);
        metrics.record_response(404, 5);
        metrics.record_response(429, 1);
        metrics.record_response(500, 3);
        metrics.record_response(503, 1);

        assert_eq!(metrics.requests_total.load(Ordering::Relaxed), 6);
        assert_eq!(metrics.requests_success.load(Ordering::Relaxed), 2);
        assert_eq!(metrics.requests_client_error.load(Ordering::Relaxed), 2);
        assert_eq!(metrics.requests_server_error.load(Ordering::Relaxed), 2);
        assert_eq!(metrics.rate_limited.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.shed.load(Ordering::Relaxed), 1);
        assert!((metrics.avg_latency_ms() - 40.0 / 6.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_domain_counters_in_json() {
        let metrics = ServiceMetrics::new();
        metrics.record_cache_miss();
        metrics.record_cache_hit();
        metrics.record_cache_hit();
        metrics.record_prepare();
        metrics.record_swept(3);

        let json = metrics.to_json();
        assert_eq!(json["cache"]["hits"], 2);
        assert_eq!(json["cache"]["misses"], 1);
        assert_eq!(json["transactions"]["prepared"], 1);
        assert_eq!(json["transactions"]["swept"], 3);
    }

    #[test]
    fn test_empty_average_is_zero() {
        let metrics = ServiceMetrics::new();
        assert_eq!(metrics.avg_latency_ms(), 0.0);
        assert_eq!(metrics.to_json()["requests_total"], 0);
    }
}
