use std::collections::VecDeque;

/// Fixed-capacity FIFO of samples for windowed calculations.
///
/// Once full, every enqueue evicts the oldest sample. `get` accepts negative
/// indices counted from the newest sample and returns NaN when out of range.
#[derive(Clone, Debug, PartialEq)]
pub struct CycledQueue {
    buffer: VecDeque<f64>,
    capacity: usize,
}

impl CycledQueue {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            buffer: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.buffer.len() == self.capacity
    }

    /// Adds a sample, returning the evicted one if the queue was full.
    pub fn enqueue(&mut self, value: f64) -> Option<f64> {
        let evicted = if self.is_full() {
            self.buffer.pop_front()
        } else {
            None
        };
        self.buffer.push_back(value);
        evicted
    }

    pub fn get(&self, index: isize) -> f64 {
        let len = self.buffer.len() as isize;
        let i = if index < 0 { len + index } else { index };
        if i < 0 || i >= len {
            return f64::NAN;
        }
        self.buffer[i as usize]
    }

    /// Oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        self.buffer.iter().copied()
    }

    pub fn sum(&self) -> f64 {
        self.buffer.iter().sum()
    }

    pub fn mean(&self) -> f64 {
        if self.buffer.is_empty() {
            f64::NAN
        } else {
            self.sum() / self.buffer.len() as f64
        }
    }

    /// Empties the queue, keeping its allocation.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rotation() {
        let mut q = CycledQueue::new(3);
        for v in [1.0, 2.0, 3.0] {
            assert_eq!(q.enqueue(v), None);
        }
        assert_eq!(q.enqueue(4.0), Some(1.0));
        assert_eq!(q.len(), 3);
        assert_eq!(q.get(0), 2.0);
        assert_eq!(q.get(-1), 4.0);
        assert_eq!(q.get(-3), 2.0);
        assert!(q.get(3).is_nan());
        assert!(q.get(-4).is_nan());
        assert_eq!(q.iter().collect::<Vec<_>>(), vec![2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_clear_keeps_capacity() {
        let mut q = CycledQueue::new(4);
        q.enqueue(1.0);
        q.enqueue(2.0);
        let allocated = q.buffer.capacity();
        q.clear();
        assert!(q.is_empty());
        assert_eq!(q.buffer.capacity(), allocated);
        assert!(q.mean().is_nan());
        q.enqueue(5.0);
        assert_eq!(q.get(0), 5.0);
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        let mut q = CycledQueue::new(0);
        q.enqueue(1.0);
        q.enqueue(2.0);
        assert_eq!(q.capacity(), 1);
        assert_eq!(q.get(-1), 2.0);
    }
}
