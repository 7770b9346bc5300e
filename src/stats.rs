// Keywarden Statistics - Shared request counters

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Monotonic counters updated by the dispatcher. Shared by `Arc` across
/// request tasks; relaxed ordering is enough since the counters are
/// observational and never coordinate anything.
#[derive(Debug, Default)]
pub struct ProxyStats {
    pub requests_processed: AtomicU64,
    pub credentials_injected: AtomicU64,
    pub requests_blocked: AtomicU64,
    pub telemetry_blocked: AtomicU64,
    pub strategy_errors: AtomicU64,
}

/// Point-in-time copy of the counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub requests_processed: u64,
    pub credentials_injected: u64,
    pub requests_blocked: u64,
    pub telemetry_blocked: u64,
    pub strategy_errors: u64,
}

impl ProxyStats {
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            requests_processed: self.requests_processed.load(Ordering::Relaxed),
            credentials_injected: self.credentials_injected.load(Ordering::Relaxed),
            requests_blocked: self.requests_blocked.load(Ordering::Relaxed),
            telemetry_blocked: self.telemetry_blocked.load(Ordering::Relaxed),
            strategy_errors: self.strategy_errors.load(Ordering::Relaxed),
        }
    }

    /// Session summary, logged at shutdown.
    pub fn log_summary(&self) {
        let snapshot = self.snapshot();
        tracing::info!("Session statistics:");
        tracing::info!("  requests_processed: {}", snapshot.requests_processed);
        tracing::info!("  credentials_injected: {}", snapshot.credentials_injected);
        tracing::info!("  requests_blocked: {}", snapshot.requests_blocked);
        tracing::info!("  telemetry_blocked: {}", snapshot.telemetry_blocked);
        tracing::info!("  strategy_errors: {}", snapshot.strategy_errors);
    }
}

pub(crate) fn inc(counter: &AtomicU64) {
    counter.fetch_add(1, Ordering::Relaxed);
}
