//! Binary min-heap over transaction nonces.

/// Min-heap of nonces used by the sorted map to pull transactions out in
/// nonce-incrementing order from the possibly gapped queue.
///
/// The backing vector is exposed just enough for the owner to sort it,
/// truncate it and restore the heap property afterwards; that is how bulk
/// evictions avoid popping one element at a time.
#[derive(Debug, Default)]
pub(crate) struct NonceHeap(Vec<u64>);

impl NonceHeap {
    pub(crate) fn new() -> Self {
        NonceHeap(Vec::new())
    }

    pub(crate) fn len(&self) -> usize {
        self.0.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The smallest nonce, without removing it.
    pub(crate) fn peek(&self) -> Option<u64> {
        self.0.first().copied()
    }

    /// The nonce at position `i` of the backing vector. Only meaningful
    /// after [`sort_unstable`](Self::sort_unstable).
    pub(crate) fn at(&self, i: usize) -> u64 {
        self.0[i]
    }

    pub(crate) fn push(&mut self, nonce: u64) {
        self.0.push(nonce);
        self.sift_up(self.0.len() - 1);
    }

    /// Remove and return the smallest nonce.
    pub(crate) fn pop(&mut self) -> Option<u64> {
        if self.0.is_empty() {
            return None;
        }
        let min = self.0.swap_remove(0);
        if !self.0.is_empty() {
            self.sift_down(0);
        }
        Some(min)
    }

    /// Remove the first occurrence of `nonce`, returning whether it was
    /// found. Linear scan; only used for single-element removals where a
    /// full rebuild would be wasteful.
    pub(crate) fn remove(&mut self, nonce: u64) -> bool {
        let Some(i) = self.0.iter().position(|&n| n == nonce) else {
            return false;
        };
        self.0.swap_remove(i);
        if i < self.0.len() {
            // The element swapped in may violate the property in either
            // direction relative to its new neighbours.
            self.sift_down(i);
            self.sift_up(i);
        }
        true
    }

    /// Sort the backing vector ascending. An ascending slice satisfies the
    /// heap property, so the heap stays usable afterwards.
    pub(crate) fn sort_unstable(&mut self) {
        self.0.sort_unstable();
    }

    /// Keep only the first `len` elements of the backing vector.
    pub(crate) fn truncate(&mut self, len: usize) {
        self.0.truncate(len);
    }

    /// Restore the heap property after arbitrary mutation of the backing
    /// vector.
    pub(crate) fn heapify(&mut self) {
        for i in (0..self.0.len() / 2).rev() {
            self.sift_down(i);
        }
    }

    /// Replace the contents with the given nonces.
    pub(crate) fn rebuild(&mut self, nonces: impl Iterator<Item = u64>) {
        self.0.clear();
        self.0.extend(nonces);
        self.heapify();
    }

    fn sift_up(&mut self, mut i: usize) {
        while i > 0 {
            let parent = (i - 1) / 2;
            if self.0[i] >= self.0[parent] {
                break;
            }
            self.0.swap(i, parent);
            i = parent;
        }
    }

    fn sift_down(&mut self, mut i: usize) {
        loop {
            let left = 2 * i + 1;
            if left >= self.0.len() {
                break;
            }
            let mut child = left;
            let right = left + 1;
            if right < self.0.len() && self.0[right] < self.0[left] {
                child = right;
            }
            if self.0[i] <= self.0[child] {
                break;
            }
            self.0.swap(i, child);
            i = child;
        }
    }
}
