use std::sync::Arc;
use tick_buffer::IngestBuffer;
use tracing::{debug, info, warn};

use crate::metrics;
use crate::models::{Event, RawEvent};
use crate::services::analytics::AnalyticsStore;

/// Outcome counts for one batch tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub drained: usize,
    pub applied: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Drains the event buffer and applies each event to the analytics store
pub struct BatchProcessor {
    buffer: Arc<IngestBuffer<RawEvent>>,
    store: Arc<dyn AnalyticsStore>,
}

impl BatchProcessor {
    pub fn new(buffer: Arc<IngestBuffer<RawEvent>>, store: Arc<dyn AnalyticsStore>) -> Self {
        Self { buffer, store }
    }

    pub fn buffer(&self) -> &Arc<IngestBuffer<RawEvent>> {
        &self.buffer
    }

    /// Run one tick. Never fails: every per-item error is logged and counted.
    pub async fn tick(&self) -> BatchReport {
        let batch = self.buffer.drain_all();
        let mut report = BatchReport {
            drained: batch.len(),
            ..Default::default()
        };

        if batch.is_empty() {
            return report;
        }

        debug!(count = batch.len(), "Processing event batch");

        for raw in batch {
            let event = match Event::try_from(raw) {
                Ok(event) => event,
                Err(e) => {
                    debug!(error = %e, "Skipping event");
                    metrics::record_event_outcome("skipped");
                    report.skipped += 1;
                    continue;
                }
            };

            match self.store.apply_event(&event).await {
                Ok(()) => {
                    metrics::record_event_outcome("applied");
                    report.applied += 1;
                }
                Err(e) => {
                    warn!(
                        action = %event.action,
                        product_id = ?event.product_id,
                        error = %e,
                        "Failed to apply event to analytics store"
                    );
                    metrics::record_event_outcome("failed");
                    report.failed += 1;
                }
            }
        }

        info!(
            drained = report.drained,
            applied = report.applied,
            skipped = report.skipped,
            failed = report.failed,
            "Event batch processed"
        );

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{PulseError, Result};
    use crate::models::EventAction;
    use async_trait::async_trait;
    use parking_lot::Mutex;

    /// Records every applied event; fails for products listed in `fail_on`
    #[derive(Default)]
    struct RecordingStore {
        applied: Mutex<Vec<EventAction>>,
        fail_on: Vec<String>,
    }

    #[async_trait]
    impl AnalyticsStore for RecordingStore {
        async fn apply_event(&self, event: &Event) -> Result<()> {
            if let Some(product) = &event.product_id {
                if self.fail_on.contains(product) {
                    return Err(PulseError::Internal("insert rejected".to_string()));
                }
            }
            self.applied.lock().push(event.action);
            Ok(())
        }
    }

    fn processor(store: Arc<RecordingStore>) -> BatchProcessor {
        BatchProcessor::new(Arc::new(IngestBuffer::new("events")), store)
    }

    #[tokio::test]
    async fn test_empty_tick_is_noop() {
        let store = Arc::new(RecordingStore::default());
        let processor = processor(store.clone());

        assert_eq!(processor.tick().await, BatchReport::default());
        assert!(store.applied.lock().is_empty());
    }

    #[tokio::test]
    async fn test_unrecognized_actions_are_skipped() {
        let store = Arc::new(RecordingStore::default());
        let processor = processor(store.clone());

        for action in ["add_to_cart", "bogus", "product_view"] {
            processor.buffer().enqueue(RawEvent::with_action(action));
        }

        let report = processor.tick().await;

        assert_eq!(report.drained, 3);
        assert_eq!(report.applied, 2);
        assert_eq!(report.skipped, 1);
        assert_eq!(
            *store.applied.lock(),
            vec![EventAction::AddToCart, EventAction::ProductView]
        );
    }

    #[tokio::test]
    async fn test_store_failure_does_not_stop_batch() {
        let store = Arc::new(RecordingStore {
            fail_on: vec!["broken".to_string()],
            ..Default::default()
        });
        let processor = processor(store.clone());

        let mut bad = RawEvent::with_action("purchase");
        bad.product_id = Some("broken".to_string());

        processor.buffer().enqueue(RawEvent::with_action("checkout"));
        processor.buffer().enqueue(bad);
        processor.buffer().enqueue(RawEvent::with_action("wishlist_add"));

        let report = processor.tick().await;

        assert_eq!(report.applied, 2);
        assert_eq!(report.failed, 1);
        assert_eq!(
            *store.applied.lock(),
            vec![EventAction::Checkout, EventAction::WishlistAdd]
        );
        assert!(processor.buffer().is_empty());
    }
}
