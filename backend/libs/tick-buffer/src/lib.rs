//! Buffering and scheduling primitives for tick-driven pipelines
//!
//! This library provides the two pieces every batching stage in the pipeline
//! is built from:
//! - **IngestBuffer**: unbounded, arrival-ordered accumulator with an atomic
//!   drain-all-and-clear swap
//! - **PeriodicTask**: an owned, stoppable timer loop that runs one tick per
//!   period and never interrupts a tick once started
//!
//! With the `metrics` feature enabled, buffer depth and tick durations are
//! exported as Prometheus metrics.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use tick_buffer::{IngestBuffer, PeriodicTask};
//!
//! #[tokio::main]
//! async fn main() {
//!     let buffer = Arc::new(IngestBuffer::new("events"));
//!     buffer.enqueue("first".to_string());
//!
//!     let drain_from = Arc::clone(&buffer);
//!     let task = PeriodicTask::spawn("events", Duration::from_secs(5), move || {
//!         let buffer = Arc::clone(&drain_from);
//!         async move {
//!             for item in buffer.drain_all() {
//!                 println!("{item}");
//!             }
//!         }
//!     });
//!
//!     task.stop().await;
//! }
//! ```

pub mod buffer;
pub mod metrics;
pub mod task;

pub use buffer::IngestBuffer;
pub use task::PeriodicTask;
