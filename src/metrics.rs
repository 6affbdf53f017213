//! Per-counter request/success/error accounting.
//!
//! Maintained by callers around their own token operations; nothing in the
//! codec or storage paths records here.

use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use dashmap::DashMap;

#[derive(Default)]
pub struct Metric {
    requests: AtomicU64,
    success: AtomicU64,
    errors: AtomicU64,
    // Unix seconds of the last recorded event; 0 = never.
    last_activity: AtomicI64,
}

impl Metric {
    fn touch(&self) {
        self.last_activity
            .store(Utc::now().timestamp(), Ordering::Relaxed);
    }
}

/// Point-in-time copy of one named counter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricSnapshot {
    pub requests: u64,
    pub success: u64,
    pub errors: u64,
    pub last_activity: Option<DateTime<Utc>>,
}

/// Named counters behind a concurrent map; safe to share across tasks.
#[derive(Default)]
pub struct MetricRegistry {
    counters: DashMap<String, Metric>,
}

impl MetricRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_request(&self, name: &str) {
        let metric = self.counters.entry(name.to_string()).or_default();
        metric.requests.fetch_add(1, Ordering::Relaxed);
        metric.touch();
    }

    pub fn record_success(&self, name: &str) {
        let metric = self.counters.entry(name.to_string()).or_default();
        metric.success.fetch_add(1, Ordering::Relaxed);
        metric.touch();
    }

    pub fn record_error(&self, name: &str) {
        let metric = self.counters.entry(name.to_string()).or_default();
        metric.errors.fetch_add(1, Ordering::Relaxed);
        metric.touch();
    }

    pub fn snapshot(&self, name: &str) -> Option<MetricSnapshot> {
        self.counters.get(name).map(|metric| MetricSnapshot {
            requests: metric.requests.load(Ordering::Relaxed),
            success: metric.success.load(Ordering::Relaxed),
            errors: metric.errors.load(Ordering::Relaxed),
            last_activity: match metric.last_activity.load(Ordering::Relaxed) {
                0 => None,
                secs => DateTime::from_timestamp(secs, 0),
            },
        })
    }
}
