use std::sync::Arc;
use tick_buffer::IngestBuffer;
use tracing::{debug, warn};

use crate::metrics;
use crate::models::LogRecord;
use crate::services::registry::SubscriberRegistry;

/// Outcome counts for one fan-out tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FanOutReport {
    pub records: usize,
    pub subscribers: usize,
    pub attempts: usize,
    pub failures: usize,
}

/// Drains the log buffer and writes every record to every subscriber
///
/// Delivery is at-most-once: a failed write is not retried, and the failing
/// subscriber stays registered until its connection closes.
pub struct LogBroadcaster {
    buffer: Arc<IngestBuffer<LogRecord>>,
    registry: SubscriberRegistry,
}

impl LogBroadcaster {
    pub fn new(buffer: Arc<IngestBuffer<LogRecord>>, registry: SubscriberRegistry) -> Self {
        Self { buffer, registry }
    }

    pub fn buffer(&self) -> &Arc<IngestBuffer<LogRecord>> {
        &self.buffer
    }

    pub fn registry(&self) -> &SubscriberRegistry {
        &self.registry
    }

    pub async fn tick(&self) -> FanOutReport {
        let records = self.buffer.drain_all();
        if records.is_empty() {
            return FanOutReport::default();
        }

        let subscribers = self.registry.snapshot();
        let mut report = FanOutReport {
            records: records.len(),
            subscribers: subscribers.len(),
            ..Default::default()
        };

        for record in &records {
            let frame = match record.to_frame() {
                Ok(frame) => frame,
                Err(e) => {
                    warn!(source = %record.source, error = %e, "Failed to encode log frame");
                    continue;
                }
            };

            for (id, sink) in &subscribers {
                report.attempts += 1;
                match sink.write_frame(&frame).await {
                    Ok(()) => metrics::record_log_frame("delivered"),
                    Err(e) => {
                        report.failures += 1;
                        metrics::record_log_frame("failed");
                        debug!(subscriber = %id, error = %e, "Log frame write failed");
                    }
                }
            }
        }

        debug!(
            records = report.records,
            subscribers = report.subscribers,
            failures = report.failures,
            "Log records fanned out"
        );

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{PulseError, Result};
    use crate::models::LogLevel;
    use crate::services::registry::{FrameSink, SubscriberId};
    use async_trait::async_trait;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct CaptureSink {
        frames: Mutex<Vec<String>>,
        broken: bool,
    }

    #[async_trait]
    impl FrameSink for CaptureSink {
        async fn write_frame(&self, frame: &str) -> Result<()> {
            if self.broken {
                return Err(PulseError::Sink("connection reset".to_string()));
            }
            self.frames.lock().push(frame.to_string());
            Ok(())
        }
    }

    fn broadcaster() -> LogBroadcaster {
        LogBroadcaster::new(Arc::new(IngestBuffer::new("logs")), SubscriberRegistry::new())
    }

    #[tokio::test]
    async fn test_no_records_no_writes() {
        let broadcaster = broadcaster();
        let sink = Arc::new(CaptureSink::default());
        broadcaster.registry().register(SubscriberId::new(), sink.clone());

        assert_eq!(broadcaster.tick().await, FanOutReport::default());
        assert!(sink.frames.lock().is_empty());
    }

    #[tokio::test]
    async fn test_records_without_subscribers_are_discarded() {
        let broadcaster = broadcaster();
        broadcaster
            .buffer()
            .enqueue(LogRecord::new(LogLevel::Info, "nobody listening", "api"));

        let report = broadcaster.tick().await;
        assert_eq!(report.records, 1);
        assert_eq!(report.attempts, 0);
        assert!(broadcaster.buffer().is_empty());
    }

    #[tokio::test]
    async fn test_failing_subscriber_stays_registered() {
        let broadcaster = broadcaster();
        let broken_id = SubscriberId::new();
        let healthy = Arc::new(CaptureSink::default());

        broadcaster.registry().register(
            broken_id,
            Arc::new(CaptureSink {
                broken: true,
                ..Default::default()
            }),
        );
        broadcaster.registry().register(SubscriberId::new(), healthy.clone());

        broadcaster
            .buffer()
            .enqueue(LogRecord::new(LogLevel::Warn, "disk 91%", "node-3"));

        let report = broadcaster.tick().await;

        assert_eq!(report.attempts, 2);
        assert_eq!(report.failures, 1);
        assert_eq!(healthy.frames.lock().len(), 1);
        assert!(broadcaster.registry().contains(broken_id));
    }
}
