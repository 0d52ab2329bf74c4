//! Background task management
//!
//! Owns the bus subscriber loop and both pipeline tick loops so that `main`
//! can shut them down in order.

use std::sync::Arc;
use std::time::Duration;
use tick_buffer::PeriodicTask;
use tokio::task::JoinHandle;

use crate::config::KafkaConfig;
use crate::error::Result;
use crate::services::{BusSubscriber, Pipeline};

const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

pub struct BackgroundTasks {
    pub bus_handle: JoinHandle<()>,
    pub event_ticks: PeriodicTask,
    pub log_ticks: PeriodicTask,
}

/// Start the bus subscriber and the tick loops
pub fn spawn_background_tasks(
    kafka: &KafkaConfig,
    pipeline: &Arc<Pipeline>,
) -> Result<BackgroundTasks> {
    tracing::info!("Spawning background tasks...");

    let subscriber = BusSubscriber::new(kafka, pipeline.router.clone())?;
    let bus_handle = tokio::spawn(async move {
        subscriber.run().await;
    });

    let (event_ticks, log_ticks) = pipeline.spawn_ticks();

    tracing::info!("All background tasks spawned successfully");

    Ok(BackgroundTasks {
        bus_handle,
        event_ticks,
        log_ticks,
    })
}

/// Stop intake first, then the tick loops, then drain what is left
pub async fn shutdown_background_tasks(tasks: BackgroundTasks, pipeline: &Pipeline) {
    tracing::info!("Shutting down background tasks...");

    tasks.bus_handle.abort();
    match tokio::time::timeout(SHUTDOWN_TIMEOUT, tasks.bus_handle).await {
        Ok(Ok(())) => tracing::info!("Bus subscriber shut down gracefully"),
        Ok(Err(_)) => tracing::info!("Bus subscriber aborted"),
        Err(_) => tracing::warn!("Bus subscriber did not shut down within timeout"),
    }

    for task in [tasks.event_ticks, tasks.log_ticks] {
        let name = task.name();
        if tokio::time::timeout(SHUTDOWN_TIMEOUT, task.stop()).await.is_err() {
            tracing::warn!(task = name, "Tick loop did not stop within timeout");
        }
    }

    let (batch, fan_out) = pipeline.flush().await;
    tracing::info!(
        events = batch.drained,
        logs = fan_out.records,
        "Final pipeline flush complete"
    );

    tracing::info!("All background tasks shut down complete");
}
