//! The bounded scheduling queue: a fixed-capacity circular buffer of
//! pending entries, protected by one mutex and two condition variables,
//! supporting two selectable dequeue disciplines.

use std::sync::{Condvar, Mutex};

use crate::config::Discipline;

/// Sentinel weight meaning "unknown / non-classifiable / invalid /
/// not-a-GET / missing-file / path-traversal" — ineligible for SFF
/// ranking.
pub const UNKNOWN_WEIGHT: i64 = -1;

/// Anything the queue schedules must expose a weight so SFF can rank it.
/// FIFO-only callers can always return [`UNKNOWN_WEIGHT`].
pub trait Weighted {
    fn weight(&self) -> i64;
}

struct QueueState<T> {
    slots: Vec<Option<T>>,
    /// Consumer index: the next slot FIFO dequeues from.
    head: usize,
    /// Producer index: the next slot enqueue writes to.
    tail: usize,
    count: usize,
}

/// A fixed-capacity producer/consumer buffer. `enqueue` blocks while full;
/// `dequeue` blocks while empty. Exactly one thread mutates the queue at
/// a time; the discipline's selection scan runs inside that same critical
/// section.
pub struct BoundedQueue<T> {
    capacity: usize,
    discipline: Discipline,
    state: Mutex<QueueState<T>>,
    not_full: Condvar,
    not_empty: Condvar,
}

impl<T: Weighted> BoundedQueue<T> {
    pub fn new(capacity: usize, discipline: Discipline) -> Self {
        assert!(capacity > 0, "queue capacity must be positive");
        let mut slots = Vec::with_capacity(capacity);
        slots.resize_with(capacity, || None);

        Self {
            capacity,
            discipline,
            state: Mutex::new(QueueState {
                slots,
                head: 0,
                tail: 0,
                count: 0,
            }),
            not_full: Condvar::new(),
            not_empty: Condvar::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Current resident count. For diagnostics/tests only — by the time
    /// the caller observes the return value it may already be stale.
    pub fn len(&self) -> usize {
        self.state.lock().unwrap().count
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Blocks while the queue is full, then inserts `entry` at the
    /// producer index and signals `not_empty`.
    pub fn enqueue(&self, entry: T) {
        let mut state = self
            .not_full
            .wait_while(self.state.lock().unwrap(), |s| s.count == self.capacity)
            .unwrap();

        let tail = state.tail;
        state.slots[tail] = Some(entry);
        state.tail = (tail + 1) % self.capacity;
        state.count += 1;

        drop(state);
        self.not_empty.notify_one();
    }

    /// Blocks while the queue is empty, then selects one entry per the
    /// active discipline, removes it, and signals `not_full`.
    pub fn dequeue(&self) -> T {
        let mut state = self
            .not_empty
            .wait_while(self.state.lock().unwrap(), |s| s.count == 0)
            .unwrap();

        let selected = self.select_index(&state);
        let head = state.head;
        if selected != head {
            state.slots.swap(selected, head);
        }

        let entry = state.slots[head]
            .take()
            .expect("selected slot must be occupied under the lock");
        state.head = (head + 1) % self.capacity;
        state.count -= 1;

        drop(state);
        self.not_full.notify_one();
        entry
    }

    /// Index (within `state.slots`) of the entry that should be dequeued
    /// next. Must be called with the lock held.
    fn select_index(&self, state: &QueueState<T>) -> usize {
        match self.discipline {
            Discipline::Fifo => state.head,
            Discipline::Sff => {
                let mut best: Option<(usize, i64)> = None;
                let mut idx = state.head;

                for _ in 0..state.count {
                    if let Some(entry) = &state.slots[idx] {
                        let w = entry.weight();
                        if w >= 0 {
                            let replace = match best {
                                Some((_, best_w)) => w < best_w,
                                None => true,
                            };
                            if replace {
                                best = Some((idx, w));
                            }
                        }
                    }
                    idx = (idx + 1) % self.capacity;
                }

                best.map(|(i, _)| i).unwrap_or(state.head)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[derive(Debug, PartialEq, Eq, Clone)]
    struct TestEntry {
        label: &'static str,
        w: i64,
    }

    impl Weighted for TestEntry {
        fn weight(&self) -> i64 {
            self.w
        }
    }

    fn entry(label: &'static str, w: i64) -> TestEntry {
        TestEntry { label, w }
    }

    #[test]
    fn test_fifo_preserves_order() {
        let q: BoundedQueue<TestEntry> = BoundedQueue::new(4, Discipline::Fifo);
        q.enqueue(entry("a", 100));
        q.enqueue(entry("b", 10));
        q.enqueue(entry("c", 1000));

        assert_eq!(q.dequeue().label, "a");
        assert_eq!(q.dequeue().label, "b");
        assert_eq!(q.dequeue().label, "c");
    }

    #[test]
    fn test_sff_picks_smallest_weight() {
        let q: BoundedQueue<TestEntry> = BoundedQueue::new(4, Discipline::Sff);
        q.enqueue(entry("big", 1000));
        q.enqueue(entry("small", 10));
        q.enqueue(entry("medium", 100));

        assert_eq!(q.dequeue().label, "small");
        assert_eq!(q.dequeue().label, "medium");
        assert_eq!(q.dequeue().label, "big");
    }

    #[test]
    fn test_sff_falls_back_to_consumer_index_when_all_unknown() {
        let q: BoundedQueue<TestEntry> = BoundedQueue::new(4, Discipline::Sff);
        q.enqueue(entry("first", UNKNOWN_WEIGHT));
        q.enqueue(entry("second", UNKNOWN_WEIGHT));

        assert_eq!(q.dequeue().label, "first");
        assert_eq!(q.dequeue().label, "second");
    }

    #[test]
    fn test_sff_ties_broken_by_insertion_order() {
        let q: BoundedQueue<TestEntry> = BoundedQueue::new(4, Discipline::Sff);
        q.enqueue(entry("first", 50));
        q.enqueue(entry("second", 50));

        assert_eq!(q.dequeue().label, "first");
        assert_eq!(q.dequeue().label, "second");
    }

    #[test]
    fn test_sff_keeps_ring_consistent_after_swap() {
        // Selecting an out-of-order entry swaps it into the consumer slot;
        // subsequent enqueues must still land in the correct producer slot.
        let q: BoundedQueue<TestEntry> = BoundedQueue::new(3, Discipline::Sff);
        q.enqueue(entry("a", 100));
        q.enqueue(entry("b", 10));

        assert_eq!(q.dequeue().label, "b");

        q.enqueue(entry("c", 5));
        assert_eq!(q.dequeue().label, "c");
        assert_eq!(q.dequeue().label, "a");
        assert!(q.is_empty());
    }

    #[test]
    fn test_enqueue_blocks_until_space_available() {
        let q = Arc::new(BoundedQueue::<TestEntry>::new(1, Discipline::Fifo));
        q.enqueue(entry("a", 0));

        let q2 = Arc::clone(&q);
        let producer = thread::spawn(move || {
            q2.enqueue(entry("b", 0));
        });

        thread::sleep(Duration::from_millis(50));
        assert_eq!(q.len(), 1);

        assert_eq!(q.dequeue().label, "a");
        producer.join().unwrap();
        assert_eq!(q.len(), 1);
        assert_eq!(q.dequeue().label, "b");
    }

    #[test]
    fn test_dequeue_blocks_until_entry_available() {
        let q = Arc::new(BoundedQueue::<TestEntry>::new(2, Discipline::Fifo));
        let q2 = Arc::clone(&q);

        let consumer = thread::spawn(move || q2.dequeue());

        thread::sleep(Duration::from_millis(50));
        q.enqueue(entry("late", 0));

        let got = consumer.join().unwrap();
        assert_eq!(got.label, "late");
    }

    #[test]
    fn test_count_never_exceeds_capacity_under_contention() {
        let q = Arc::new(BoundedQueue::<TestEntry>::new(4, Discipline::Fifo));
        let producers: Vec<_> = (0..8)
            .map(|i| {
                let q = Arc::clone(&q);
                thread::spawn(move || q.enqueue(entry("x", i)))
            })
            .collect();

        for _ in 0..8 {
            // drain concurrently with producers still running
            loop {
                if !q.is_empty() {
                    let _ = q.dequeue();
                    break;
                }
                thread::yield_now();
            }
            assert!(q.len() <= q.capacity());
        }

        for p in producers {
            p.join().unwrap();
        }
    }
}
