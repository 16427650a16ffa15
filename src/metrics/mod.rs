//! Prometheus metrics for analytics recompute passes
//!
//! Call `init_metrics()` at application startup to register all metrics.
//! If initialization fails or never happens, recording functions are no-ops.

use prometheus::{
    register_counter, register_gauge, register_histogram, Counter, Encoder, Gauge, Histogram,
    TextEncoder,
};
use std::sync::OnceLock;

/// Container for all recompute metrics
struct AnalyticsMetrics {
    recompute_total: Counter,
    recompute_failures: Counter,
    recompute_duration: Histogram,
    eligible_records: Gauge,
    coalesced_notifications: Counter,
}

/// Global storage for analytics metrics; `None` when registration failed
static ANALYTICS_METRICS: OnceLock<Option<AnalyticsMetrics>> = OnceLock::new();

/// Initialize all Prometheus metrics
///
/// Safe to call more than once; only the first call registers.
pub fn init_metrics() -> Result<(), Box<dyn std::error::Error>> {
    let registered = ANALYTICS_METRICS.get_or_init(|| match register_metrics() {
        Ok(metrics) => {
            tracing::info!("Prometheus metrics initialized successfully");
            Some(metrics)
        }
        Err(e) => {
            tracing::warn!(error = %e, "Metrics registration failed, metrics disabled");
            None
        }
    });

    if registered.is_some() {
        Ok(())
    } else {
        Err("Analytics metrics registration failed".into())
    }
}

fn register_metrics() -> prometheus::Result<AnalyticsMetrics> {
    Ok(AnalyticsMetrics {
        recompute_total: register_counter!(
            "trendscope_recompute_total",
            "Total successful analytics recompute passes"
        )?,
        recompute_failures: register_counter!(
            "trendscope_recompute_failures_total",
            "Total analytics recompute passes rejected or failed"
        )?,
        recompute_duration: register_histogram!(
            "trendscope_recompute_duration_seconds",
            "Analytics recompute pass duration in seconds",
            vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]
        )?,
        eligible_records: register_gauge!(
            "trendscope_eligible_records",
            "Eligible records in the latest successful pass"
        )?,
        coalesced_notifications: register_counter!(
            "trendscope_coalesced_notifications_total",
            "Change notifications folded into an already scheduled pass"
        )?,
    })
}

fn metrics() -> Option<&'static AnalyticsMetrics> {
    ANALYTICS_METRICS.get().and_then(Option::as_ref)
}

/// Check if metrics have been initialized
pub fn metrics_initialized() -> bool {
    metrics().is_some()
}

/// Encode all metrics to Prometheus text format
pub fn encode_metrics() -> Result<String, Box<dyn std::error::Error>> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}

/// Record a successful recompute pass
pub fn record_recompute(duration_secs: f64, eligible_records: usize) {
    let Some(m) = metrics() else {
        return;
    };

    m.recompute_total.inc();
    m.recompute_duration.observe(duration_secs);
    m.eligible_records.set(eligible_records as f64);
}

/// Record a failed recompute pass
pub fn record_recompute_failure() {
    if let Some(m) = metrics() {
        m.recompute_failures.inc();
    }
}

/// Record notifications merged into one pass
pub fn record_coalesced(count: usize) {
    if count == 0 {
        return;
    }
    if let Some(m) = metrics() {
        m.coalesced_notifications.inc_by(count as f64);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ensure_metrics_initialized() {
        let _ = init_metrics();
    }

    #[test]
    fn test_init_is_idempotent() {
        ensure_metrics_initialized();
        assert!(init_metrics().is_ok());
        assert!(metrics_initialized());
    }

    #[test]
    fn test_recording_and_encoding() {
        ensure_metrics_initialized();
        record_recompute(0.01, 42);
        record_recompute_failure();
        record_coalesced(3);

        let text = encode_metrics().unwrap();
        assert!(text.contains("trendscope_recompute_total"));
        assert!(text.contains("trendscope_eligible_records"));
    }

    #[test]
    fn test_metrics_noop_without_init() {
        // These should not panic even if called before initialization
        record_recompute(0.5, 1);
        record_recompute_failure();
        record_coalesced(0);
        record_coalesced(2);
    }
}
