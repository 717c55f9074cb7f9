//! Short history of per-frame values that drops the oldest when full.

use std::collections::VecDeque;

/// Fixed-capacity history, oldest first.
#[derive(Debug, Clone, PartialEq)]
pub struct RingBuffer<T> {
    data: VecDeque<T>,
    capacity: usize,
}

impl<T> RingBuffer<T> {
    /// # Panics
    /// Panics if capacity is 0.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "RingBuffer capacity must be > 0");
        Self {
            data: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Push a value, dropping the oldest if at capacity.
    pub fn push(&mut self, value: T) {
        if self.data.len() >= self.capacity {
            self.data.pop_front();
        }
        self.data.push_back(value);
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.data.clear();
    }

    /// Most recently pushed value.
    pub fn latest(&self) -> Option<&T> {
        self.data.back()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_and_len() {
        let mut buf = RingBuffer::new(2);
        assert!(buf.is_empty());
        assert_eq!(buf.capacity(), 2);

        buf.push(1);
        assert_eq!(buf.len(), 1);
        buf.push(2);
        buf.push(3);
        assert_eq!(buf.len(), 2);
    }

    #[test]
    fn test_latest() {
        let mut buf = RingBuffer::new(2);
        assert!(buf.latest().is_none());

        buf.push(10);
        assert_eq!(buf.latest(), Some(&10));

        buf.push(20);
        buf.push(30);
        assert_eq!(buf.latest(), Some(&30));
        assert_eq!(buf.len(), 2);
    }

    #[test]
    fn test_clear() {
        let mut buf = RingBuffer::new(2);
        buf.push(1);
        buf.clear();
        assert!(buf.is_empty());
        assert!(buf.latest().is_none());
    }

    #[test]
    #[should_panic(expected = "capacity must be > 0")]
    fn test_zero_capacity_panics() {
        let _buf: RingBuffer<i32> = RingBuffer::new(0);
    }
}
