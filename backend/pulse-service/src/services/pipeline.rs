use std::sync::Arc;
use tick_buffer::{IngestBuffer, PeriodicTask};
use tracing::info;

use crate::config::Config;
use crate::models::{LogRecord, RawEvent};
use crate::services::analytics::AnalyticsStore;
use crate::services::batch_processor::{BatchProcessor, BatchReport};
use crate::services::broadcaster::{FanOutReport, LogBroadcaster};
use crate::services::bus::BusRouter;
use crate::services::registry::SubscriberRegistry;

/// Owns both buffers and the stages that drain them
pub struct Pipeline {
    pub registry: SubscriberRegistry,
    pub router: BusRouter,
    processor: Arc<BatchProcessor>,
    broadcaster: Arc<LogBroadcaster>,
    config: Config,
}

impl Pipeline {
    pub fn new(config: &Config, store: Arc<dyn AnalyticsStore>) -> Self {
        let high_water = config.pipeline.buffer_high_water;
        let events = Arc::new(IngestBuffer::<RawEvent>::new("events").with_high_water(high_water));
        let logs = Arc::new(IngestBuffer::<LogRecord>::new("logs").with_high_water(high_water));
        let registry = SubscriberRegistry::new();

        let router = BusRouter::new(
            config.kafka.events_topic.clone(),
            config.kafka.logs_topic.clone(),
            Arc::clone(&events),
            Arc::clone(&logs),
        );

        Self {
            processor: Arc::new(BatchProcessor::new(events, store)),
            broadcaster: Arc::new(LogBroadcaster::new(logs, registry.clone())),
            registry,
            router,
            config: config.clone(),
        }
    }

    pub fn processor(&self) -> &Arc<BatchProcessor> {
        &self.processor
    }

    pub fn broadcaster(&self) -> &Arc<LogBroadcaster> {
        &self.broadcaster
    }

    /// Start the event and log tick loops
    pub fn spawn_ticks(&self) -> (PeriodicTask, PeriodicTask) {
        let processor = Arc::clone(&self.processor);
        let events = PeriodicTask::spawn("events", self.config.pipeline.event_tick_interval, move || {
            let processor = Arc::clone(&processor);
            async move {
                processor.tick().await;
            }
        });

        let broadcaster = Arc::clone(&self.broadcaster);
        let logs = PeriodicTask::spawn("logs", self.config.pipeline.log_tick_interval, move || {
            let broadcaster = Arc::clone(&broadcaster);
            async move {
                broadcaster.tick().await;
            }
        });

        info!(
            event_interval_ms = self.config.pipeline.event_tick_interval.as_millis() as u64,
            log_interval_ms = self.config.pipeline.log_tick_interval.as_millis() as u64,
            "Pipeline ticks started"
        );

        (events, logs)
    }

    /// Run one tick of each stage, used on shutdown after the loops stop
    pub async fn flush(&self) -> (BatchReport, FanOutReport) {
        let batch = self.processor.tick().await;
        let fan_out = self.broadcaster.tick().await;
        (batch, fan_out)
    }
}
