//! FIFO holding area for instances that are currently not leased

use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// An idle instance tagged with the moment it was returned.
pub(crate) struct IdleEntry<T> {
    pub(crate) instance: T,
    pub(crate) returned_at: Instant,
}

impl<T> IdleEntry<T> {
    pub(crate) fn new(instance: T) -> Self {
        Self {
            instance,
            returned_at: Instant::now(),
        }
    }

    pub(crate) fn expired(&self, idle_timeout: Duration) -> bool {
        self.returned_at.elapsed() >= idle_timeout
    }
}

/// Strict FIFO ordered by return time: the front entry is always the
/// oldest-returned and therefore always the first to expire.
pub(crate) struct IdleQueue<T> {
    entries: VecDeque<IdleEntry<T>>,
}

impl<T> IdleQueue<T> {
    pub(crate) fn new() -> Self {
        Self {
            entries: VecDeque::new(),
        }
    }

    pub(crate) fn enqueue(&mut self, instance: T) {
        self.entries.push_back(IdleEntry::new(instance));
    }

    pub(crate) fn dequeue(&mut self) -> Option<IdleEntry<T>> {
        self.entries.pop_front()
    }

    /// Dequeue the front entry if it has expired. Stopping at the first
    /// unexpired entry is correct because entries are FIFO by return time.
    pub(crate) fn dequeue_expired(&mut self, idle_timeout: Duration) -> Option<IdleEntry<T>> {
        if self.entries.front()?.expired(idle_timeout) {
            self.entries.pop_front()
        } else {
            None
        }
    }

    /// Empty the queue, handing every entry to the caller (disposal path).
    pub(crate) fn drain_all(&mut self) -> Vec<IdleEntry<T>> {
        self.entries.drain(..).collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dequeue_is_fifo_by_return_order() {
        let mut queue = IdleQueue::new();
        queue.enqueue("a");
        queue.enqueue("b");
        queue.enqueue("c");
        assert_eq!(queue.dequeue().unwrap().instance, "a");
        assert_eq!(queue.dequeue().unwrap().instance, "b");
        assert_eq!(queue.dequeue().unwrap().instance, "c");
        assert!(queue.dequeue().is_none());
    }

    #[test]
    fn dequeue_expired_stops_at_first_live_entry() {
        let mut queue = IdleQueue::new();
        queue.entries.push_back(IdleEntry {
            instance: 1,
            returned_at: Instant::now() - Duration::from_millis(500),
        });
        queue.entries.push_back(IdleEntry {
            instance: 2,
            returned_at: Instant::now() - Duration::from_millis(300),
        });
        queue.entries.push_back(IdleEntry {
            instance: 3,
            returned_at: Instant::now(),
        });

        let cutoff = Duration::from_millis(200);
        assert_eq!(queue.dequeue_expired(cutoff).unwrap().instance, 1);
        assert_eq!(queue.dequeue_expired(cutoff).unwrap().instance, 2);
        assert!(queue.dequeue_expired(cutoff).is_none());
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn drain_all_empties_the_queue() {
        let mut queue = IdleQueue::new();
        queue.enqueue(1);
        queue.enqueue(2);
        let drained = queue.drain_all();
        assert_eq!(drained.len(), 2);
        assert!(queue.is_empty());
    }
}
