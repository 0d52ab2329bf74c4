use rdkafka::config::ClientConfig;
use rdkafka::consumer::{Consumer, StreamConsumer};
use rdkafka::message::Message;
use std::sync::Arc;
use std::time::Duration;
use tick_buffer::IngestBuffer;
use tracing::{debug, error, info, warn};

use crate::config::KafkaConfig;
use crate::error::{PulseError, Result};
use crate::metrics;
use crate::models::{LogRecord, RawEvent};

/// Routes bus messages into the event or log buffer by topic
///
/// Payloads are decoded here; action validation for events happens later in
/// the batch processor.
#[derive(Clone)]
pub struct BusRouter {
    events_topic: String,
    logs_topic: String,
    events: Arc<IngestBuffer<RawEvent>>,
    logs: Arc<IngestBuffer<LogRecord>>,
}

impl BusRouter {
    pub fn new(
        events_topic: impl Into<String>,
        logs_topic: impl Into<String>,
        events: Arc<IngestBuffer<RawEvent>>,
        logs: Arc<IngestBuffer<LogRecord>>,
    ) -> Self {
        Self {
            events_topic: events_topic.into(),
            logs_topic: logs_topic.into(),
            events,
            logs,
        }
    }

    pub fn topics(&self) -> [&str; 2] {
        [&self.events_topic, &self.logs_topic]
    }

    /// Decode one message and enqueue it on the matching buffer
    pub fn route(&self, topic: &str, payload: Option<&[u8]>) -> Result<()> {
        let payload =
            payload.ok_or_else(|| PulseError::Validation("Message has no payload".to_string()))?;

        if topic == self.events_topic {
            let event: RawEvent = serde_json::from_slice(payload)?;
            self.events.enqueue(event);
        } else if topic == self.logs_topic {
            let record: LogRecord = serde_json::from_slice(payload)?;
            self.logs.enqueue(record);
        } else {
            return Err(PulseError::Validation(format!("Unexpected topic: {}", topic)));
        }

        Ok(())
    }

    /// Route a message, logging and discarding anything that fails to decode
    pub fn handle(&self, topic: &str, payload: Option<&[u8]>) {
        match self.route(topic, payload) {
            Ok(()) => metrics::record_bus_message(topic, "accepted"),
            Err(e) => {
                metrics::record_bus_message(topic, "malformed");
                warn!(topic = %topic, error = %e, "Discarding malformed bus message");
            }
        }
    }
}

/// Kafka subscription feeding a [`BusRouter`]
pub struct BusSubscriber {
    consumer: StreamConsumer,
    router: BusRouter,
}

impl BusSubscriber {
    pub fn new(config: &KafkaConfig, router: BusRouter) -> Result<Self> {
        let consumer: StreamConsumer = ClientConfig::new()
            .set("group.id", &config.group_id)
            .set("bootstrap.servers", &config.brokers)
            .set("enable.auto.commit", "true")
            .set("auto.commit.interval.ms", "5000")
            .set("auto.offset.reset", "latest")
            .set("session.timeout.ms", "30000")
            .set("enable.partition.eof", "false")
            .create()
            .map_err(|e| {
                error!("Failed to create Kafka consumer: {}", e);
                PulseError::Kafka(e)
            })?;

        consumer.subscribe(&router.topics()).map_err(|e| {
            error!("Failed to subscribe to topics: {}", e);
            PulseError::Kafka(e)
        })?;

        info!(
            events_topic = %config.events_topic,
            logs_topic = %config.logs_topic,
            "Bus subscriber ready"
        );

        Ok(Self { consumer, router })
    }

    /// Receive loop; runs until the task is aborted
    pub async fn run(&self) {
        info!("Starting bus subscriber loop");

        loop {
            match self.consumer.recv().await {
                Ok(msg) => {
                    debug!(
                        topic = msg.topic(),
                        partition = msg.partition(),
                        offset = msg.offset(),
                        "Received bus message"
                    );
                    self.router.handle(msg.topic(), msg.payload());
                }
                Err(e) => {
                    error!("Kafka consumer error: {}", e);
                    tokio::time::sleep(Duration::from_secs(1)).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn router() -> BusRouter {
        BusRouter::new(
            "shop-events",
            "app-logs",
            Arc::new(IngestBuffer::new("events")),
            Arc::new(IngestBuffer::new("logs")),
        )
    }

    #[test]
    fn test_routes_by_topic() {
        let router = router();

        router
            .route("shop-events", Some(br#"{"action":"add_to_cart","productId":"p-1"}"#))
            .unwrap();
        router
            .route(
                "app-logs",
                Some(br#"{"level":"info","message":"ok","timestamp":"2024-05-01T10:15:00Z","source":"api"}"#),
            )
            .unwrap();

        assert_eq!(router.events.len(), 1);
        assert_eq!(router.logs.len(), 1);
    }

    #[test]
    fn test_unknown_action_still_buffered() {
        let router = router();
        router.route("shop-events", Some(br#"{"action":"bogus"}"#)).unwrap();
        assert_eq!(router.events.drain_all()[0].action, "bogus");
    }

    #[test]
    fn test_malformed_messages_are_discarded() {
        let router = router();

        assert!(matches!(
            router.route("shop-events", Some(b"not json")),
            Err(PulseError::Decode(_))
        ));
        assert!(matches!(
            router.route("shop-events", None),
            Err(PulseError::Validation(_))
        ));
        assert!(router.route("other", Some(b"{}")).is_err());

        router.handle("app-logs", Some(br#"{"level":"info"}"#));
        assert!(router.events.is_empty());
        assert!(router.logs.is_empty());
    }
}
