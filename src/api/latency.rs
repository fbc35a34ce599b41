//! Cycle latency percentiles over an HDR histogram, exposed at
//! `/api/stats/latency`.

use std::sync::Mutex;
use std::time::Duration;

use hdrhistogram::Histogram;
use serde::Serialize;
use tracing::warn;

pub struct LatencyStats {
    // 1us to 100s at 3 significant figures.
    histogram: Mutex<Histogram<u64>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LatencyReport {
    pub count: u64,
    pub p50_ms: f64,
    pub p90_ms: f64,
    pub p99_ms: f64,
    pub max_ms: f64,
}

impl LatencyStats {
    pub fn new() -> Self {
        let histogram = Histogram::new_with_bounds(1, 100_000_000, 3)
            .expect("static histogram bounds");
        Self { histogram: Mutex::new(histogram) }
    }

    pub fn record(&self, elapsed: Duration) {
        let micros = elapsed.as_micros().min(u128::from(u64::MAX)) as u64;
        if let Ok(mut hist) = self.histogram.lock() {
            if hist.record(micros.max(1)).is_err() {
                warn!(micros, "latency sample out of histogram range");
            }
        }
    }

    pub fn report(&self) -> LatencyReport {
        let hist = match self.histogram.lock() {
            Ok(h) => h,
            Err(poisoned) => poisoned.into_inner(),
        };
        LatencyReport {
            count: hist.len(),
            p50_ms: hist.value_at_quantile(0.50) as f64 / 1000.0,
            p90_ms: hist.value_at_quantile(0.90) as f64 / 1000.0,
            p99_ms: hist.value_at_quantile(0.99) as f64 / 1000.0,
            max_ms: hist.max() as f64 / 1000.0,
        }
    }
}

impl Default for LatencyStats {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_report_is_zeroed() {
        let stats = LatencyStats::new();
        let report = stats.report();
        assert_eq!(report.count, 0);
        assert_eq!(report.max_ms, 0.0);
    }

    #[test]
    fn percentiles_reflect_recorded_samples() {
        let stats = LatencyStats::new();
        for ms in 1..=100u64 {
            stats.record(Duration::from_millis(ms));
        }
        let report = stats.report();
        assert_eq!(report.count, 100);
        assert!(report.p50_ms >= 45.0 && report.p50_ms <= 55.0);
        assert!(report.p99_ms >= 95.0);
        assert!(report.max_ms >= 99.0);
    }
}
