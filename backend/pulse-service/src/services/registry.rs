use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::Result;
use crate::metrics;

/// Unique identifier for a connected log subscriber
///
/// Each connection gets its own id when it registers, so removal on close
/// touches exactly that connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(Uuid);

impl SubscriberId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SubscriberId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Outbound half of a live connection
#[async_trait]
pub trait FrameSink: Send + Sync {
    async fn write_frame(&self, frame: &str) -> Result<()>;
}

/// Currently connected real-time log consumers
///
/// Membership follows connection lifecycle callbacks, so it may briefly lag
/// behind the set of sockets that are actually open.
#[derive(Default, Clone)]
pub struct SubscriberRegistry {
    inner: Arc<Mutex<HashMap<SubscriberId, Arc<dyn FrameSink>>>>,
}

impl SubscriberRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a subscriber. Returns false if the id was already registered, in
    /// which case the existing sink is kept.
    pub fn register(&self, id: SubscriberId, sink: Arc<dyn FrameSink>) -> bool {
        let mut guard = self.inner.lock();
        let added = match guard.entry(id) {
            std::collections::hash_map::Entry::Occupied(_) => false,
            std::collections::hash_map::Entry::Vacant(slot) => {
                slot.insert(sink);
                true
            }
        };
        let total = guard.len();
        metrics::set_log_subscribers(total);
        drop(guard);

        if added {
            tracing::debug!(subscriber = %id, total, "Registered log subscriber");
        }
        added
    }

    /// Remove a subscriber. Removing an unknown id is a no-op.
    pub fn unregister(&self, id: SubscriberId) -> bool {
        let mut guard = self.inner.lock();
        let removed = guard.remove(&id).is_some();
        let total = guard.len();
        metrics::set_log_subscribers(total);
        drop(guard);

        if removed {
            tracing::debug!(subscriber = %id, remaining = total, "Unregistered log subscriber");
        }
        removed
    }

    /// Copy of current membership, taken under the lock and iterated without it
    pub fn snapshot(&self) -> Vec<(SubscriberId, Arc<dyn FrameSink>)> {
        self.inner
            .lock()
            .iter()
            .map(|(id, sink)| (*id, Arc::clone(sink)))
            .collect()
    }

    pub fn contains(&self, id: SubscriberId) -> bool {
        self.inner.lock().contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }
}
