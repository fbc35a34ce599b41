//! Lock-free liveness counters, read by `/api/health` and updated by the
//! poller and WebSocket layer.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;

#[derive(Default)]
pub struct HealthState {
    upstream_ok: AtomicBool,
    last_cycle_at_ms: AtomicU64,
    cycles_completed: AtomicU64,
    cycles_failed: AtomicU64,
    clients: AtomicU64,
    drift_suspected: AtomicBool,
}

#[derive(Debug, Serialize)]
pub struct HealthReport {
    pub status: &'static str,
    pub upstream_ok: bool,
    pub last_cycle_at_ms: u64,
    pub last_cycle_age_ms: u64,
    pub cycles_completed: u64,
    pub cycles_failed: u64,
    pub clients: u64,
    pub drift_suspected: bool,
}

pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

impl HealthState {
    pub fn record_cycle_ok(&self) {
        self.upstream_ok.store(true, Ordering::Relaxed);
        self.last_cycle_at_ms.store(now_ms(), Ordering::Relaxed);
        self.cycles_completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cycle_failed(&self) {
        self.upstream_ok.store(false, Ordering::Relaxed);
        self.cycles_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn set_drift_suspected(&self, drift: bool) {
        self.drift_suspected.store(drift, Ordering::Relaxed);
    }

    pub fn client_connected(&self) {
        self.clients.fetch_add(1, Ordering::Relaxed);
    }

    pub fn client_disconnected(&self) {
        self.clients.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn clients(&self) -> u64 {
        self.clients.load(Ordering::Relaxed)
    }

    pub fn report(&self) -> HealthReport {
        let last = self.last_cycle_at_ms.load(Ordering::Relaxed);
        let upstream_ok = self.upstream_ok.load(Ordering::Relaxed);
        HealthReport {
            status: if upstream_ok { "ok" } else { "degraded" },
            upstream_ok,
            last_cycle_at_ms: last,
            last_cycle_age_ms: now_ms().saturating_sub(last),
            cycles_completed: self.cycles_completed.load(Ordering::Relaxed),
            cycles_failed: self.cycles_failed.load(Ordering::Relaxed),
            clients: self.clients(),
            drift_suspected: self.drift_suspected.load(Ordering::Relaxed),
        }
    }
}
