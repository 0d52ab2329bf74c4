//! Prometheus metrics for the ingestion pipeline
//!
//! Buffer depth and tick duration are registered by `tick-buffer`; this module
//! covers per-item outcomes and subscriber counts.

use once_cell::sync::Lazy;
use prometheus::{register_int_counter_vec, register_int_gauge, Encoder, IntCounterVec, IntGauge, TextEncoder};

use crate::error::{PulseError, Result};

/// Bus messages by topic and whether they decoded
static BUS_MESSAGES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "pulse_bus_messages_total",
        "Bus messages received (accepted/malformed)",
        &["topic", "result"]
    )
    .expect("failed to register pulse_bus_messages_total")
});

/// Drained events by processing outcome
static EVENTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "pulse_events_total",
        "Events handled by the batch processor (applied/skipped/failed)",
        &["outcome"]
    )
    .expect("failed to register pulse_events_total")
});

/// Log frame write attempts by result
static LOG_FRAMES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "pulse_log_frames_total",
        "Log frame writes to subscribers (delivered/failed)",
        &["result"]
    )
    .expect("failed to register pulse_log_frames_total")
});

static LOG_SUBSCRIBERS: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!(
        "pulse_log_subscribers",
        "Currently registered log stream subscribers"
    )
    .expect("failed to register pulse_log_subscribers")
});

pub fn record_bus_message(topic: &str, result: &str) {
    BUS_MESSAGES_TOTAL.with_label_values(&[topic, result]).inc();
}

pub fn record_event_outcome(outcome: &str) {
    EVENTS_TOTAL.with_label_values(&[outcome]).inc();
}

pub fn record_log_frame(result: &str) {
    LOG_FRAMES_TOTAL.with_label_values(&[result]).inc();
}

pub fn set_log_subscribers(count: usize) {
    LOG_SUBSCRIBERS.set(count as i64);
}

/// Render every registered metric in the Prometheus text format
pub fn render() -> Result<String> {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder
        .encode(&prometheus::gather(), &mut buffer)
        .map_err(|e| PulseError::Internal(format!("Failed to encode metrics: {}", e)))?;
    String::from_utf8(buffer).map_err(|e| PulseError::Internal(e.to_string()))
}
