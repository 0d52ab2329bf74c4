//! Pulse: shop event and application log ingestion
//!
//! Kafka messages land in one of two buffers. A timer drains the event buffer
//! into ClickHouse; a second timer fans the log buffer out to every connected
//! `/ws/logs` subscriber.

pub mod background;
pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;

pub use config::Config;
pub use error::{PulseError, Result};
