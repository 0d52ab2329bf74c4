/// Prometheus metrics for buffers and periodic tasks
#[cfg(feature = "metrics")]
use prometheus::{register_histogram_vec, register_int_counter_vec, register_int_gauge_vec};
#[cfg(feature = "metrics")]
use prometheus::{HistogramVec, IntCounterVec, IntGaugeVec};

#[cfg(feature = "metrics")]
use once_cell::sync::Lazy;

use std::time::Duration;

#[cfg(feature = "metrics")]
static BUFFER_DEPTH: Lazy<IntGaugeVec> = Lazy::new(|| {
    register_int_gauge_vec!(
        "pulse_buffer_depth",
        "Number of items waiting in an ingestion buffer",
        &["buffer"]
    )
    .expect("Failed to register buffer depth metric")
});

#[cfg(feature = "metrics")]
static BUFFER_DRAINED: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "pulse_buffer_drained_total",
        "Total number of items handed out by buffer drains",
        &["buffer"]
    )
    .expect("Failed to register buffer drained metric")
});

#[cfg(feature = "metrics")]
static TICK_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "pulse_tick_duration_seconds",
        "Duration of one periodic task tick",
        &["task"],
        vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 10.0]
    )
    .expect("Failed to register tick duration metric")
});

/// Metrics collector for ingestion buffers
#[cfg(feature = "metrics")]
pub struct BufferMetrics;

#[cfg(feature = "metrics")]
impl BufferMetrics {
    pub fn record_depth(buffer: &str, depth: usize) {
        BUFFER_DEPTH
            .with_label_values(&[buffer])
            .set(depth as i64);
    }

    pub fn record_drained(buffer: &str, count: usize) {
        BUFFER_DRAINED
            .with_label_values(&[buffer])
            .inc_by(count as u64);
    }
}

/// Metrics collector for periodic tasks
#[cfg(feature = "metrics")]
pub struct TaskMetrics;

#[cfg(feature = "metrics")]
impl TaskMetrics {
    pub fn record_tick(task: &str, elapsed: Duration) {
        TICK_DURATION
            .with_label_values(&[task])
            .observe(elapsed.as_secs_f64());
    }
}

// No-op implementations when metrics feature is disabled
#[cfg(not(feature = "metrics"))]
pub struct BufferMetrics;

#[cfg(not(feature = "metrics"))]
impl BufferMetrics {
    pub fn record_depth(_buffer: &str, _depth: usize) {}
    pub fn record_drained(_buffer: &str, _count: usize) {}
}

#[cfg(not(feature = "metrics"))]
pub struct TaskMetrics;

#[cfg(not(feature = "metrics"))]
impl TaskMetrics {
    pub fn record_tick(_task: &str, _elapsed: Duration) {}
}
