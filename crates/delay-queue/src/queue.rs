use crate::builder::QueueBuilder;
use crate::metrics::{MetricsConfig, QueueObserver};
use delay_queue_core::{composite, Comparator, Equals, Heap, QueueItem, Result};
use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

/// Thread-safe priority queue with optional per-item delays and
/// dequeue-time deduplication.
///
/// Items are ordered by their delay gate first (ungated, then earliest
/// gate) and by the caller's comparator second. Because the gate is the
/// primary key, the heap minimum is always the item that becomes ready
/// first: if it is still gated, nothing in the queue is ready.
pub struct DelayPriorityQueue<T> {
    heap: RwLock<Heap<QueueItem<T>>>,
    comparator: Comparator<T>,
    equals: Option<Equals<T>>,
    dedupe: bool,
    observer: Arc<dyn QueueObserver<T>>,
    pub(crate) poll_interval: Duration,
}

impl<T: Send + Sync + 'static> DelayPriorityQueue<T> {
    /// Create a queue from its parts. `comparator` is required, and
    /// `equals` is required when `dedupe` is set.
    pub fn new(
        comparator: Option<Comparator<T>>,
        dedupe: bool,
        equals: Option<Equals<T>>,
        metrics: MetricsConfig<T>,
    ) -> Result<Self> {
        let mut builder = QueueBuilder::new().dedupe(dedupe).metrics(metrics);
        if let Some(comparator) = comparator {
            builder = builder.with_comparator(comparator);
        }
        if let Some(equals) = equals {
            builder = builder.with_equals(equals);
        }
        builder.build()
    }

    pub fn builder() -> QueueBuilder<T> {
        QueueBuilder::new()
    }
}

impl<T> DelayPriorityQueue<T> {
    pub(crate) fn from_parts(
        comparator: Comparator<T>,
        equals: Option<Equals<T>>,
        dedupe: bool,
        observer: Arc<dyn QueueObserver<T>>,
        poll_interval: Duration,
    ) -> Self {
        DelayPriorityQueue {
            heap: RwLock::new(Heap::new()),
            comparator,
            equals,
            dedupe,
            observer,
            poll_interval,
        }
    }

    /// Insert an item that is ready immediately
    pub fn enqueue(&self, item: T) {
        self.push(QueueItem::new(item));
    }

    /// Insert an item that cannot be dequeued until `delay` has elapsed.
    /// It counts toward `size` right away.
    pub fn enqueue_with_delay(&self, item: T, delay: Duration) {
        self.push(QueueItem::delayed(item, delay));
    }

    fn push(&self, entry: QueueItem<T>) {
        let mut heap = self.heap.write();
        self.observer.on_enqueue(entry.item(), heap.len() + 1);
        trace!("Enqueued item (delayed: {})", entry.not_before().is_some());
        heap.push(entry, composite(&self.comparator));
    }

    /// Remove the minimum item if it is ready. Returns `None` when the
    /// queue is empty or the minimum is still delayed.
    pub fn dequeue(&self) -> Option<T> {
        let mut heap = self.heap.write();
        self.pop_ready(&mut heap, Instant::now())
    }

    /// Dequeue every item that is ready now under a single lock
    pub fn drain_ready(&self) -> Vec<T> {
        let mut heap = self.heap.write();
        let now = Instant::now();
        let mut ready = Vec::new();
        while let Some(item) = self.pop_ready(&mut heap, now) {
            ready.push(item);
        }
        ready
    }

    fn pop_ready(&self, heap: &mut Heap<QueueItem<T>>, now: Instant) -> Option<T> {
        if !heap.peek()?.is_ready_at(now) {
            return None;
        }

        let order = composite(&self.comparator);
        let entry = heap.pop(&order)?;
        trace!("Dequeued item ({} remaining)", heap.len());
        self.observer
            .on_dequeue(entry.item(), entry.residency_at(now), heap.len());

        if self.dedupe {
            if let Some(equals) = &self.equals {
                while heap
                    .peek()
                    .is_some_and(|next| equals(next.item(), entry.item()))
                {
                    if let Some(duplicate) = heap.pop(&order) {
                        trace!("Discarded duplicate item");
                        self.observer.on_dedupe(duplicate.item(), heap.len());
                    }
                }
            }
        }

        Some(entry.into_inner())
    }

    /// Time until the minimum item becomes ready; `None` when empty
    pub fn next_ready_in(&self) -> Option<Duration> {
        let heap = self.heap.read();
        heap.peek().map(|min| min.remaining_at(Instant::now()))
    }

    pub fn empty(&self) -> bool {
        self.heap.read().is_empty()
    }

    pub fn is_empty(&self) -> bool {
        self.empty()
    }

    /// Number of items held, including ones still delayed
    pub fn size(&self) -> usize {
        self.heap.read().len()
    }

    pub fn len(&self) -> usize {
        self.size()
    }

    /// Drop every item. No dequeue or dedupe events are emitted.
    pub fn clear(&self) {
        let mut heap = self.heap.write();
        let discarded = heap.len();
        heap.clear();
        self.observer.on_clear();
        debug!("Cleared queue ({} items discarded)", discarded);
    }

    pub fn dedupe(&self) -> bool {
        self.dedupe
    }
}

impl<T: Clone> DelayPriorityQueue<T> {
    /// The heap minimum, ignoring delay gates
    pub fn peek(&self) -> Option<T> {
        let heap = self.heap.read();
        heap.peek().map(|min| min.item().clone())
    }

    /// Snapshot of all items in heap order (not dequeue order)
    pub fn values(&self) -> Vec<T> {
        let heap = self.heap.read();
        heap.iter().map(|entry| entry.item().clone()).collect()
    }
}

impl<T: fmt::Debug> fmt::Debug for DelayPriorityQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let heap = self.heap.read();
        let values: Vec<&T> = heap.iter().map(|entry| entry.item()).collect();
        f.debug_struct("DelayPriorityQueue")
            .field("size", &heap.len())
            .field("dedupe", &self.dedupe)
            .field("values", &values)
            .finish()
    }
}

impl<T: fmt::Debug> fmt::Display for DelayPriorityQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let heap = self.heap.read();
        write!(f, "DelayPriorityQueue[")?;
        for (i, entry) in heap.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{:?}", entry.item())?;
        }
        write!(f, "]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use delay_queue_core::{natural, reversed, QueueError};
    use proptest::prelude::*;
    use std::thread::sleep;

    fn quiet<T>() -> MetricsConfig<T> {
        MetricsConfig::disabled()
    }

    fn strings(dedupe: bool) -> DelayPriorityQueue<String> {
        QueueBuilder::ordered()
            .dedupe(dedupe)
            .equals(|a: &String, b: &String| a == b)
            .metrics(quiet())
            .build()
            .unwrap()
    }

    #[test]
    fn test_priority_ordering() {
        let queue = DelayPriorityQueue::new(Some(natural::<i32>()), false, None, quiet()).unwrap();

        for value in [5, 1, 4, 2, 3] {
            queue.enqueue(value);
        }

        assert_eq!(queue.size(), 5);
        let drained: Vec<i32> = std::iter::from_fn(|| queue.dequeue()).collect();
        assert_eq!(drained, vec![1, 2, 3, 4, 5]);
        assert!(queue.empty());
    }

    #[test]
    fn test_reversed_comparator() {
        let queue = DelayPriorityQueue::new(Some(reversed(natural::<u8>())), false, None, quiet())
            .unwrap();
        queue.enqueue(1);
        queue.enqueue(200);
        queue.enqueue(150);

        assert_eq!(queue.dequeue(), Some(200));
        assert_eq!(queue.dequeue(), Some(150));
        assert_eq!(queue.dequeue(), Some(1));
    }

    #[test]
    fn test_missing_comparator() {
        let err = DelayPriorityQueue::<i32>::new(None, false, None, quiet()).err().unwrap();
        assert_eq!(err, QueueError::MissingComparator);
    }

    #[test]
    fn test_dedupe_requires_equals() {
        let err = DelayPriorityQueue::new(Some(natural::<i32>()), true, None, quiet())
            .err()
            .unwrap();
        assert_eq!(err, QueueError::MissingEquals);
    }

    #[test]
    fn test_dedupe_collapses_adjacent() {
        let queue = strings(true);
        for item in ["item1", "batch1", "item1", "batch2"] {
            queue.enqueue(item.to_string());
        }
        assert_eq!(queue.size(), 4);

        assert_eq!(queue.dequeue().as_deref(), Some("batch1"));
        assert_eq!(queue.size(), 3);
        assert_eq!(queue.dequeue().as_deref(), Some("batch2"));
        assert_eq!(queue.size(), 2);
        assert_eq!(queue.dequeue().as_deref(), Some("item1"));
        assert_eq!(queue.size(), 0);
        assert_eq!(queue.dequeue(), None);
    }

    #[test]
    fn test_dedupe_only_touches_neighbours() {
        // Ranked by number, deduplicated by name
        let queue = QueueBuilder::<(u32, &'static str)>::new()
            .comparator(|a, b| a.0.cmp(&b.0))
            .dedupe(true)
            .equals(|a, b| a.1 == b.1)
            .metrics(quiet())
            .build()
            .unwrap();

        queue.enqueue((1, "A"));
        queue.enqueue((1, "A"));
        queue.enqueue((2, "B"));
        queue.enqueue((3, "A"));

        assert_eq!(queue.dequeue(), Some((1, "A")));
        assert_eq!(queue.size(), 2);
        assert_eq!(queue.dequeue(), Some((2, "B")));
        assert_eq!(queue.dequeue(), Some((3, "A")));
        assert!(queue.empty());
    }

    #[test]
    fn test_without_dedupe_keeps_duplicates() {
        let queue = strings(false);
        queue.enqueue("x".to_string());
        queue.enqueue("x".to_string());

        assert_eq!(queue.dequeue().as_deref(), Some("x"));
        assert_eq!(queue.dequeue().as_deref(), Some("x"));
    }

    #[test]
    fn test_delay_gate() {
        let queue = QueueBuilder::<&str>::ordered().metrics(quiet()).build().unwrap();

        queue.enqueue_with_delay("slow", Duration::from_secs(60));
        queue.enqueue_with_delay("soon", Duration::from_millis(50));
        queue.enqueue("now");

        assert_eq!(queue.size(), 3);
        assert_eq!(queue.dequeue(), Some("now"));
        assert_eq!(queue.dequeue(), None);
        assert_eq!(queue.size(), 2);

        sleep(Duration::from_millis(80));
        assert_eq!(queue.dequeue(), Some("soon"));
        assert_eq!(queue.dequeue(), None);
        assert_eq!(queue.size(), 1);
    }

    #[test]
    fn test_zero_delay_is_immediate() {
        let queue = QueueBuilder::<i32>::ordered().metrics(quiet()).build().unwrap();
        queue.enqueue_with_delay(2, Duration::ZERO);
        queue.enqueue(1);

        assert_eq!(queue.dequeue(), Some(1));
        assert_eq!(queue.dequeue(), Some(2));
    }

    #[test]
    fn test_peek_ignores_delay() {
        let queue = QueueBuilder::<i32>::ordered().metrics(quiet()).build().unwrap();
        queue.enqueue_with_delay(7, Duration::from_secs(60));

        assert_eq!(queue.peek(), Some(7));
        assert_eq!(queue.dequeue(), None);
        assert!(queue.next_ready_in().unwrap() > Duration::from_secs(59));
    }

    #[test]
    fn test_peek_matches_dequeue() {
        let queue = QueueBuilder::<i32>::ordered().metrics(quiet()).build().unwrap();
        assert_eq!(queue.peek(), None);

        queue.enqueue(3);
        queue.enqueue(1);
        assert_eq!(queue.next_ready_in(), Some(Duration::ZERO));
        let peeked = queue.peek();
        assert_eq!(peeked, queue.dequeue());
    }

    #[test]
    fn test_clear() {
        let queue = QueueBuilder::<i32>::ordered().metrics(quiet()).build().unwrap();
        queue.clear();
        assert!(queue.empty());

        queue.enqueue(1);
        queue.enqueue_with_delay(2, Duration::from_secs(1));
        queue.clear();

        assert_eq!(queue.size(), 0);
        assert_eq!(queue.dequeue(), None);
        assert_eq!(queue.next_ready_in(), None);
    }

    #[test]
    fn test_values_snapshot() {
        let queue = QueueBuilder::<i32>::ordered().metrics(quiet()).build().unwrap();
        for value in [3, 1, 2] {
            queue.enqueue(value);
        }

        let mut values = queue.values();
        assert_eq!(values[0], 1);
        values.sort();
        assert_eq!(values, vec![1, 2, 3]);
        assert_eq!(queue.size(), 3);
    }

    #[test]
    fn test_drain_ready() {
        let queue = QueueBuilder::<i32>::ordered().metrics(quiet()).build().unwrap();
        queue.enqueue(2);
        queue.enqueue(1);
        queue.enqueue_with_delay(0, Duration::from_secs(60));

        assert_eq!(queue.drain_ready(), vec![1, 2]);
        assert_eq!(queue.size(), 1);
    }

    #[test]
    fn test_display_and_debug() {
        let queue = QueueBuilder::<i32>::ordered().metrics(quiet()).build().unwrap();
        assert_eq!(queue.to_string(), "DelayPriorityQueue[]");

        queue.enqueue(1);
        queue.enqueue(2);
        assert_eq!(queue.to_string(), "DelayPriorityQueue[1, 2]");

        let debug = format!("{:?}", queue);
        assert!(debug.contains("size: 2"));
        assert!(debug.contains("dedupe: false"));
    }

    proptest! {
        #[test]
        fn prop_dequeues_in_order(values in proptest::collection::vec(any::<i64>(), 0..100)) {
            let queue = QueueBuilder::<i64>::ordered().metrics(quiet()).build().unwrap();
            for value in &values {
                queue.enqueue(*value);
            }

            let drained: Vec<i64> = std::iter::from_fn(|| queue.dequeue()).collect();
            let mut expected = values.clone();
            expected.sort();
            prop_assert_eq!(drained, expected);
        }

        #[test]
        fn prop_size_accounts_for_dedupe(values in proptest::collection::vec(0u8..8, 0..60)) {
            let queue = QueueBuilder::<u8>::ordered()
                .dedupe_eq()
                .metrics(quiet())
                .build()
                .unwrap();
            for value in &values {
                queue.enqueue(*value);
            }

            // Equal values are adjacent under natural order, so each
            // dequeue collapses every copy of its value.
            let mut distinct = values.clone();
            distinct.sort();
            distinct.dedup();

            let drained: Vec<u8> = std::iter::from_fn(|| queue.dequeue()).collect();
            prop_assert_eq!(drained, distinct);
            prop_assert_eq!(queue.size(), 0);
        }
    }
}
