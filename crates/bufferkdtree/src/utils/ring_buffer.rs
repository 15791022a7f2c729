//! A growable circular FIFO of query indices.

/// A first-in first-out queue backed by a circular array.
///
/// The buffer never drops an element: when it is full, the next `push` doubles the capacity first and unrolls the stored elements to the front of the
/// new storage so that FIFO order is preserved.
#[derive(Debug, Clone)]
pub struct RingBuffer {
    /// The backing storage. Its length is the capacity.
    slots: Vec<usize>,
    /// Position of the oldest element.
    head: usize,
    /// Number of stored elements.
    len: usize,
    /// Number of times the buffer has doubled its capacity.
    growths: usize,
}

impl RingBuffer {
    /// Creates an empty buffer with the given capacity (at least 1).
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: vec![0; capacity.max(1)],
            head: 0,
            len: 0,
            growths: 0,
        }
    }

    /// Returns the current capacity.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Returns the number of stored elements.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Returns whether the buffer holds no elements.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns whether the next `push` will grow the buffer.
    #[must_use]
    pub const fn is_full(&self) -> bool {
        self.len == self.slots.len()
    }

    /// Returns how many times the buffer has doubled its capacity.
    #[must_use]
    pub const fn growths(&self) -> usize {
        self.growths
    }

    /// Appends an element at the back, doubling the capacity first if the buffer is full.
    pub fn push(&mut self, value: usize) {
        if self.is_full() {
            self.grow();
        }
        let tail = (self.head + self.len) % self.slots.len();
        self.slots[tail] = value;
        self.len += 1;
    }

    /// Removes and returns the element at the front.
    pub fn pop(&mut self) -> Option<usize> {
        if self.is_empty() {
            return None;
        }
        let value = self.slots[self.head];
        self.head = (self.head + 1) % self.slots.len();
        self.len -= 1;
        Some(value)
    }

    /// Removes up to `n` elements from the front and appends them to `out` in FIFO order.
    ///
    /// Returns the number of elements moved.
    pub fn pop_batch(&mut self, n: usize, out: &mut Vec<usize>) -> usize {
        let count = n.min(self.len);
        out.reserve(count);
        for _ in 0..count {
            out.push(self.slots[self.head]);
            self.head = (self.head + 1) % self.slots.len();
        }
        self.len -= count;
        count
    }

    /// Removes every element, returning them in FIFO order.
    pub fn drain_all(&mut self) -> Vec<usize> {
        let mut out = Vec::with_capacity(self.len);
        self.pop_batch(self.len, &mut out);
        self.head = 0;
        out
    }

    /// Doubles the capacity, moving the stored elements to the front of the new storage.
    fn grow(&mut self) {
        let capacity = self.slots.len();
        let mut slots = vec![0; 2 * capacity];
        for (i, slot) in slots.iter_mut().take(self.len).enumerate() {
            *slot = self.slots[(self.head + i) % capacity];
        }
        self.slots = slots;
        self.head = 0;
        self.growths += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::RingBuffer;

    #[test]
    fn one_doubling_and_no_loss() {
        let mut buffer = RingBuffer::with_capacity(4);
        for i in 0..5 {
            buffer.push(i);
        }

        assert_eq!(buffer.growths(), 1);
        assert_eq!(buffer.capacity(), 8);
        assert_eq!(buffer.len(), 5);
        assert_eq!(buffer.drain_all(), vec![0, 1, 2, 3, 4]);
        assert!(buffer.is_empty());
    }

    #[test]
    fn wraps_around_in_fifo_order() {
        let mut buffer = RingBuffer::with_capacity(3);
        buffer.push(10);
        buffer.push(11);
        assert_eq!(buffer.pop(), Some(10));
        buffer.push(12);
        buffer.push(13);
        assert!(buffer.is_full());

        // The wrapped contents must be unrolled in order when growing.
        buffer.push(14);
        assert_eq!(buffer.growths(), 1);

        let mut out = Vec::new();
        assert_eq!(buffer.pop_batch(2, &mut out), 2);
        assert_eq!(out, vec![11, 12]);
        assert_eq!(buffer.pop(), Some(13));
        assert_eq!(buffer.pop(), Some(14));
        assert_eq!(buffer.pop(), None);
    }

    #[test]
    fn pop_batch_is_bounded_by_len() {
        let mut buffer = RingBuffer::with_capacity(8);
        buffer.push(1);
        buffer.push(2);

        let mut out = vec![0];
        assert_eq!(buffer.pop_batch(5, &mut out), 2);
        assert_eq!(out, vec![0, 1, 2]);
        assert_eq!(buffer.pop_batch(5, &mut out), 0);
    }

    #[test]
    fn zero_capacity_is_promoted() {
        let mut buffer = RingBuffer::with_capacity(0);
        assert_eq!(buffer.capacity(), 1);
        buffer.push(7);
        buffer.push(8);
        assert_eq!(buffer.capacity(), 2);
        assert_eq!(buffer.drain_all(), vec![7, 8]);
    }
}
