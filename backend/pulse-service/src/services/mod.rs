pub mod analytics;
pub mod batch_processor;
pub mod broadcaster;
pub mod bus;
pub mod pipeline;
pub mod registry;

pub use analytics::{AnalyticsStore, ClickHouseAnalyticsStore, ProductActivityRow};
pub use batch_processor::{BatchProcessor, BatchReport};
pub use broadcaster::{FanOutReport, LogBroadcaster};
pub use bus::{BusRouter, BusSubscriber};
pub use pipeline::Pipeline;
pub use registry::{FrameSink, SubscriberId, SubscriberRegistry};
