use std::collections::VecDeque;

/// Fixed-capacity FIFO; pushing past capacity drops the oldest element.
#[derive(Debug, Clone)]
pub struct RingBuffer<T> {
    items: VecDeque<T>,
    capacity: usize,
}

impl<T> RingBuffer<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            items: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, item: T) {
        if self.capacity == 0 {
            return;
        }
        if self.items.len() == self.capacity {
            self.items.pop_front();
        }
        self.items.push_back(item);
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

    pub fn is_full(&self) -> bool {
        self.items.len() == self.capacity
    }

    /// Element `offset` places back from the newest (0 = newest).
    pub fn back(&self, offset: usize) -> Option<&T> {
        let len = self.items.len();
        if offset >= len {
            return None;
        }
        self.items.get(len - 1 - offset)
    }

    /// The newest `n` elements, oldest first.
    pub fn last_n(&self, n: usize) -> impl Iterator<Item = &T> {
        let skip = self.items.len().saturating_sub(n);
        self.items.iter().skip(skip)
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drops_oldest_beyond_capacity() {
        let mut ring = RingBuffer::new(3);
        for i in 0..5 {
            ring.push(i);
        }
        assert_eq!(ring.len(), 3);
        assert!(ring.is_full());
        assert_eq!(ring.iter().copied().collect::<Vec<_>>(), vec![2, 3, 4]);
    }

    #[test]
    fn back_indexes_from_newest() {
        let mut ring = RingBuffer::new(4);
        for i in 0..4 {
            ring.push(i * 10);
        }
        assert_eq!(ring.back(0), Some(&30));
        assert_eq!(ring.back(3), Some(&0));
        assert_eq!(ring.back(4), None);
    }

    #[test]
    fn last_n_clamps_to_length() {
        let mut ring = RingBuffer::new(10);
        ring.push(1);
        ring.push(2);
        assert_eq!(ring.last_n(5).copied().collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(ring.last_n(1).copied().collect::<Vec<_>>(), vec![2]);
    }
}
