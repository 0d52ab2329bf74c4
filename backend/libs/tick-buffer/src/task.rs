/// Owned periodic task with scoped start/stop
///
/// Each tick runs to completion: the shutdown signal is only observed between
/// ticks, so `stop()` returns after the in-flight tick (if any) has finished.
/// A tick that panics is logged and the loop carries on with the next period.
use futures::FutureExt;
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::metrics::TaskMetrics;

pub struct PeriodicTask {
    name: &'static str,
    shutdown: watch::Sender<bool>,
    handle: Option<JoinHandle<()>>,
}

impl PeriodicTask {
    /// Spawn a task that calls `tick` once per `period`.
    ///
    /// The first tick fires one full period after spawning. Ticks that fall
    /// behind are delayed rather than bunched up.
    pub fn spawn<F, Fut>(name: &'static str, period: Duration, mut tick: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (shutdown, mut shutdown_rx) = watch::channel(false);

        let handle = tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // interval() yields immediately on the first call
            ticker.tick().await;

            info!(
                task = name,
                period_ms = period.as_millis() as u64,
                "Periodic task started"
            );

            loop {
                tokio::select! {
                    _ = ticker.tick() => {}
                    changed = shutdown_rx.changed() => {
                        if changed.is_err() || *shutdown_rx.borrow() {
                            break;
                        }
                        continue;
                    }
                }

                let started = Instant::now();
                let outcome = AssertUnwindSafe(async { tick().await }).catch_unwind().await;
                let elapsed = started.elapsed();
                if let Err(panic) = outcome {
                    error!(task = name, "Tick panicked: {}", panic_message(&*panic));
                    continue;
                }
                TaskMetrics::record_tick(name, elapsed);
                debug!(task = name, elapsed_ms = elapsed.as_millis() as u64, "Tick complete");
            }

            info!(task = name, "Periodic task stopped");
        });

        Self {
            name,
            shutdown,
            handle: Some(handle),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn is_running(&self) -> bool {
        self.handle
            .as_ref()
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }

    /// Signal shutdown and wait for the loop to exit
    pub async fn stop(mut self) {
        let _ = self.shutdown.send(true);

        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                warn!(task = self.name, "Periodic task ended abnormally: {}", e);
            }
        }
    }
}

impl Drop for PeriodicTask {
    fn drop(&mut self) {
        // Dropped without stop(): the loop exits at the next tick boundary
        if self.handle.is_some() {
            let _ = self.shutdown.send(true);
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(msg) = panic.downcast_ref::<&'static str>() {
        msg
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg
    } else {
        "non-string panic payload"
    }
}
