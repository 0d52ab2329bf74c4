/// Unbounded ingestion buffer with atomic drain
///
/// Producers append from message-arrival callbacks; a single periodic task
/// takes everything accumulated so far in one swap. The swap and the append
/// share one mutex, so every item lands in exactly one drain.
///
/// Growth is intentionally unbounded. Depth is exported as a gauge and a
/// warning is logged once each time the depth crosses the high-water mark.
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::warn;

use crate::metrics::BufferMetrics;

pub struct IngestBuffer<T> {
    name: &'static str,
    items: Mutex<Vec<T>>,
    high_water: Option<usize>,
    above_high_water: AtomicBool,
}

impl<T> IngestBuffer<T> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            items: Mutex::new(Vec::new()),
            high_water: None,
            above_high_water: AtomicBool::new(false),
        }
    }

    /// Log a warning when the depth reaches `mark` (0 disables the check)
    pub fn with_high_water(mut self, mark: usize) -> Self {
        self.high_water = (mark > 0).then_some(mark);
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Append an item. Never blocks on I/O and never fails.
    pub fn enqueue(&self, item: T) {
        let depth = {
            let mut items = self.items.lock();
            items.push(item);
            BufferMetrics::record_depth(self.name, items.len());
            items.len()
        };

        self.check_high_water(depth);
    }

    /// Take every buffered item in arrival order, leaving the buffer empty
    pub fn drain_all(&self) -> Vec<T> {
        let drained = {
            let mut items = self.items.lock();
            BufferMetrics::record_depth(self.name, 0);
            std::mem::take(&mut *items)
        };

        if !drained.is_empty() {
            BufferMetrics::record_drained(self.name, drained.len());
        }
        self.above_high_water.store(false, Ordering::Relaxed);

        drained
    }

    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }

    fn check_high_water(&self, depth: usize) {
        let Some(mark) = self.high_water else {
            return;
        };

        if depth >= mark && !self.above_high_water.swap(true, Ordering::Relaxed) {
            warn!(
                buffer = self.name,
                depth,
                high_water = mark,
                "Ingestion buffer crossed high-water mark (consumer is falling behind)"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_drain_returns_arrival_order() {
        let buffer = IngestBuffer::new("test");
        buffer.enqueue(1);
        buffer.enqueue(2);
        buffer.enqueue(3);

        assert_eq!(buffer.drain_all(), vec![1, 2, 3]);
    }

    #[test]
    fn test_drain_resets_buffer() {
        let buffer = IngestBuffer::new("test");
        buffer.enqueue("a");
        assert_eq!(buffer.len(), 1);

        let first = buffer.drain_all();
        assert_eq!(first, vec!["a"]);
        assert!(buffer.is_empty());
        assert!(buffer.drain_all().is_empty());

        buffer.enqueue("b");
        assert_eq!(buffer.drain_all(), vec!["b"]);
    }

    #[test]
    fn test_high_water_flag_rearms_after_drain() {
        let buffer = IngestBuffer::new("test").with_high_water(2);
        buffer.enqueue(1);
        assert!(!buffer.above_high_water.load(Ordering::Relaxed));

        buffer.enqueue(2);
        assert!(buffer.above_high_water.load(Ordering::Relaxed));

        buffer.drain_all();
        assert!(!buffer.above_high_water.load(Ordering::Relaxed));
    }

    #[test]
    fn test_zero_high_water_disables_check() {
        let buffer = IngestBuffer::new("test").with_high_water(0);
        for i in 0..10 {
            buffer.enqueue(i);
        }
        assert!(!buffer.above_high_water.load(Ordering::Relaxed));
    }

    #[test]
    fn test_concurrent_enqueue_and_drain_loses_nothing() {
        const PRODUCERS: usize = 4;
        const PER_PRODUCER: usize = 2_000;

        let buffer = Arc::new(IngestBuffer::new("test"));
        let finished = Arc::new(AtomicUsize::new(0));

        let producers: Vec<_> = (0..PRODUCERS)
            .map(|producer| {
                let buffer = Arc::clone(&buffer);
                let finished = Arc::clone(&finished);
                thread::spawn(move || {
                    for seq in 0..PER_PRODUCER {
                        buffer.enqueue((producer, seq));
                    }
                    finished.fetch_add(1, Ordering::SeqCst);
                })
            })
            .collect();

        let mut drains: Vec<Vec<(usize, usize)>> = Vec::new();
        while finished.load(Ordering::SeqCst) < PRODUCERS {
            drains.push(buffer.drain_all());
            thread::yield_now();
        }
        for producer in producers {
            producer.join().unwrap();
        }
        drains.push(buffer.drain_all());

        let all: Vec<(usize, usize)> = drains.into_iter().flatten().collect();
        assert_eq!(all.len(), PRODUCERS * PER_PRODUCER);

        let unique: HashSet<_> = all.iter().copied().collect();
        assert_eq!(unique.len(), all.len(), "no item may be drained twice");

        // Arrival order per producer survives across consecutive drains
        let mut next_seq = vec![0usize; PRODUCERS];
        for (producer, seq) in all {
            assert_eq!(seq, next_seq[producer]);
            next_seq[producer] += 1;
        }
    }
}
