//! In-process request counters exposed at `GET /metrics` (SPEC_FULL §11:
//! a lightweight struct scoped to this crate, not a general telemetry
//! subsystem). Grounded on `chatcoach-llm`'s `UsageTracker` atomic-counter
//! shape, applied here to request counts/latency instead of token usage.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Fixed latency buckets in milliseconds, upper-bound inclusive; the last
/// bucket catches everything above `BUCKET_BOUNDS_MS`'s final entry.
const BUCKET_BOUNDS_MS: [u64; 6] = [50, 100, 250, 500, 1000, 5000];

#[derive(Debug, Default)]
pub struct Metrics {
    requests_total: AtomicU64,
    requests_failed_total: AtomicU64,
    latency_buckets: [AtomicU64; BUCKET_BOUNDS_MS.len() + 1],
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_request(&self, elapsed: Duration, success: bool) {
        self.requests_total.fetch_add(1, Ordering::Relaxed);
        if !success {
            self.requests_failed_total.fetch_add(1, Ordering::Relaxed);
        }

        let elapsed_ms = elapsed.as_millis() as u64;
        let bucket = BUCKET_BOUNDS_MS.iter().position(|bound| elapsed_ms <= *bound).unwrap_or(BUCKET_BOUNDS_MS.len());
        self.latency_buckets[bucket].fetch_add(1, Ordering::Relaxed);
    }

    /// Renders Prometheus exposition-format text. Bucket boundaries follow
    /// the standard cumulative-histogram convention (`le="..."`, `+Inf`).
    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str("# HELP chatcoach_requests_total Total predict requests handled.\n");
        out.push_str("# TYPE chatcoach_requests_total counter\n");
        out.push_str(&format!("chatcoach_requests_total {}\n", self.requests_total.load(Ordering::Relaxed)));

        out.push_str("# HELP chatcoach_requests_failed_total Predict requests that returned a non-2xx status.\n");
        out.push_str("# TYPE chatcoach_requests_failed_total counter\n");
        out.push_str(&format!("chatcoach_requests_failed_total {}\n", self.requests_failed_total.load(Ordering::Relaxed)));

        out.push_str("# HELP chatcoach_request_duration_ms Predict request latency.\n");
        out.push_str("# TYPE chatcoach_request_duration_ms histogram\n");
        let mut cumulative = 0u64;
        for (index, bound) in BUCKET_BOUNDS_MS.iter().enumerate() {
            cumulative += self.latency_buckets[index].load(Ordering::Relaxed);
            out.push_str(&format!("chatcoach_request_duration_ms_bucket{{le=\"{bound}\"}} {cumulative}\n"));
        }
        cumulative += self.latency_buckets[BUCKET_BOUNDS_MS.len()].load(Ordering::Relaxed);
        out.push_str(&format!("chatcoach_request_duration_ms_bucket{{le=\"+Inf\"}} {cumulative}\n"));
        out.push_str(&format!("chatcoach_request_duration_ms_count {cumulative}\n"));

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_total_and_failure_counts() {
        let metrics = Metrics::new();
        metrics.record_request(Duration::from_millis(10), true);
        metrics.record_request(Duration::from_millis(600), false);

        let rendered = metrics.render();
        assert!(rendered.contains("chatcoach_requests_total 2"));
        assert!(rendered.contains("chatcoach_requests_failed_total 1"));
    }

    #[test]
    fn latency_falls_into_the_matching_cumulative_bucket() {
        let metrics = Metrics::new();
        metrics.record_request(Duration::from_millis(40), true);
        let rendered = metrics.render();
        assert!(rendered.contains("chatcoach_request_duration_ms_bucket{le=\"50\"} 1"));
        assert!(rendered.contains("chatcoach_request_duration_ms_bucket{le=\"+Inf\"} 1"));
    }

    #[test]
    fn request_above_the_largest_bound_only_counts_in_the_inf_bucket() {
        let metrics = Metrics::new();
        metrics.record_request(Duration::from_millis(9000), true);
        let rendered = metrics.render();
        assert!(rendered.contains("chatcoach_request_duration_ms_bucket{le=\"5000\"} 0"));
        assert!(rendered.contains("chatcoach_request_duration_ms_bucket{le=\"+Inf\"} 1"));
    }
}
