//! Array-backed binary min-heap whose order is supplied per call.
//!
//! The comparator is not stored so the same heap can be driven by a
//! closure that borrows queue state. Callers must pass the same order to
//! every mutating call.

use std::cmp::Ordering;

#[derive(Debug, Clone)]
pub struct Heap<T> {
    data: Vec<T>,
}

impl<T> Heap<T> {
    pub fn new() -> Self {
        Heap { data: Vec::new() }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Heap {
            data: Vec::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The minimum element, if any
    pub fn peek(&self) -> Option<&T> {
        self.data.first()
    }

    /// Insert an element - O(log n)
    pub fn push<F>(&mut self, value: T, cmp: F)
    where
        F: Fn(&T, &T) -> Ordering,
    {
        self.data.push(value);
        let last = self.data.len() - 1;
        self.sift_up(last, &cmp);
    }

    /// Remove and return the minimum - O(log n)
    pub fn pop<F>(&mut self, cmp: F) -> Option<T>
    where
        F: Fn(&T, &T) -> Ordering,
    {
        if self.data.is_empty() {
            return None;
        }

        let last = self.data.len() - 1;
        self.data.swap(0, last);
        let min = self.data.pop();
        if !self.data.is_empty() {
            self.sift_down(0, &cmp);
        }
        min
    }

    /// Drop every element, keeping the allocation
    pub fn clear(&mut self) {
        self.data.clear();
    }

    /// Elements in internal array order (not sorted)
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.data.iter()
    }

    fn sift_up<F>(&mut self, mut child: usize, cmp: &F)
    where
        F: Fn(&T, &T) -> Ordering,
    {
        while child > 0 {
            let parent = (child - 1) / 2;
            if cmp(&self.data[child], &self.data[parent]) != Ordering::Less {
                break;
            }
            self.data.swap(child, parent);
            child = parent;
        }
    }

    fn sift_down<F>(&mut self, mut parent: usize, cmp: &F)
    where
        F: Fn(&T, &T) -> Ordering,
    {
        let len = self.data.len();
        loop {
            let left = 2 * parent + 1;
            if left >= len {
                break;
            }

            let right = left + 1;
            let mut smallest = left;
            if right < len && cmp(&self.data[right], &self.data[left]) == Ordering::Less {
                smallest = right;
            }

            if cmp(&self.data[smallest], &self.data[parent]) != Ordering::Less {
                break;
            }
            self.data.swap(parent, smallest);
            parent = smallest;
        }
    }
}

impl<T> Default for Heap<T> {
    fn default() -> Self {
        Self::new()
    }
}
