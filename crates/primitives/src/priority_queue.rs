//! Priority queue ordered by descending priority.

/// A priority queue that keeps its elements sorted by descending priority.
///
/// Elements are re-sorted on every insertion. The order of elements sharing a
/// priority is not guaranteed.
#[derive(Debug, Clone)]
pub struct PriorityQueue<T> {
    items: Vec<(T, i64)>,
}

impl<T> Default for PriorityQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> PriorityQueue<T> {
    /// Create an empty queue
    pub const fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Insert `element` with the given `priority`.
    pub fn enqueue(&mut self, element: T, priority: i64) {
        self.items.push((element, priority));
        self.items.sort_unstable_by(|a, b| b.1.cmp(&a.1));
    }

    /// Remove and return the highest-priority element, or `None` if empty.
    pub fn dequeue(&mut self) -> Option<T> {
        if self.items.is_empty() {
            return None;
        }
        Some(self.items.remove(0).0)
    }

    /// Number of queued elements
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the queue is empty
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dequeues_highest_priority_first() {
        let mut queue = PriorityQueue::new();
        queue.enqueue("low", 1);
        queue.enqueue("high", 10);
        queue.enqueue("mid", 5);

        assert_eq!(queue.len(), 3);
        assert_eq!(queue.dequeue(), Some("high"));
        assert_eq!(queue.dequeue(), Some("mid"));
        assert_eq!(queue.dequeue(), Some("low"));
        assert!(queue.is_empty());
    }

    #[test]
    fn dequeue_on_empty_returns_none() {
        let mut queue: PriorityQueue<u64> = PriorityQueue::default();
        assert_eq!(queue.dequeue(), None);
        assert_eq!(queue.len(), 0);
    }

    #[test]
    fn negative_priorities_sort_below_zero() {
        let mut queue = PriorityQueue::new();
        queue.enqueue('a', -3);
        queue.enqueue('b', 0);
        assert_eq!(queue.dequeue(), Some('b'));
        assert_eq!(queue.dequeue(), Some('a'));
    }
}
