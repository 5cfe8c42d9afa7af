//! Bounded FIFO that drops the oldest item when full.

use std::collections::VecDeque;

#[derive(Debug, Clone)]
pub struct BoundedQueue<T> {
    items: VecDeque<T>,
    capacity: usize,
    dropped: u64,
}

impl<T> BoundedQueue<T> {
    /// A capacity of zero is treated as one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            items: VecDeque::with_capacity(capacity),
            capacity,
            dropped: 0,
        }
    }

    /// Appends `item`, returning the evicted oldest item on overflow.
    pub fn push(&mut self, item: T) -> Option<T> {
        let evicted = if self.items.len() == self.capacity {
            self.dropped += 1;
            self.items.pop_front()
        } else {
            None
        };
        self.items.push_back(item);
        evicted
    }

    /// Removes and returns everything, oldest first.
    pub fn drain(&mut self) -> Vec<T> {
        self.items.drain(..).collect()
    }

    /// Newest item, if any.
    pub fn back(&self) -> Option<&T> {
        self.items.back()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Total evictions since creation.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_and_drain_in_order() {
        let mut q = BoundedQueue::new(3);
        assert!(q.push(1).is_none());
        assert!(q.push(2).is_none());
        assert_eq!(q.len(), 2);
        assert_eq!(q.drain(), vec![1, 2]);
        assert!(q.is_empty());
    }

    #[test]
    fn test_overflow_drops_oldest() {
        let mut q = BoundedQueue::new(2);
        q.push("a");
        q.push("b");
        assert_eq!(q.push("c"), Some("a"));
        assert_eq!(q.dropped(), 1);
        assert_eq!(q.back(), Some(&"c"));
        assert_eq!(q.drain(), vec!["b", "c"]);
    }

    #[test]
    fn test_zero_capacity_holds_one() {
        let mut q = BoundedQueue::new(0);
        assert_eq!(q.capacity(), 1);
        q.push(1);
        assert_eq!(q.push(2), Some(1));
        assert_eq!(q.drain(), vec![2]);
    }

    #[test]
    fn test_clear_keeps_drop_count() {
        let mut q = BoundedQueue::new(1);
        q.push(1);
        q.push(2);
        q.clear();
        assert!(q.is_empty());
        assert_eq!(q.dropped(), 1);
    }
}
