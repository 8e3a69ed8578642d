//! Contiguous array with O(1) swap-removal and explicit relocation hooks.
//!
//! Anything that stores a *position* into a [`GrowableArray`] (adjacency slots, walk
//! records) must treat that position as invalid once the element moves. Every operation
//! that moves an element reports it through a callback, so external back-reference
//! tables can repoint in the same step.
//!
//! Capacity doubles when full and halves once occupancy falls to a quarter.

use std::ops::{Index, IndexMut};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrowableArray<T> {
    items: Vec<T>,
}

impl<T> Default for GrowableArray<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> GrowableArray<T> {
    pub const fn new() -> Self {
        Self { items: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.items.capacity()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    pub fn get(&self, idx: usize) -> Option<&T> {
        self.items.get(idx)
    }

    pub fn last(&self) -> Option<&T> {
        self.items.last()
    }

    /// Append `value`, returning its position.
    pub fn push(&mut self, value: T) -> usize {
        let cap = self.items.capacity();
        if self.items.len() == cap {
            self.items.reserve_exact(cap.max(1));
        }
        self.items.push(value);
        self.items.len() - 1
    }

    pub fn pop(&mut self) -> Option<T> {
        let out = self.items.pop();
        self.try_shrink();
        out
    }

    /// Remove the element at `idx` by moving the last element into its slot.
    ///
    /// `on_moved` fires with the relocated element (now living at `idx`) unless `idx`
    /// was already the last slot.
    pub fn swap_remove_with<F>(&mut self, idx: usize, on_moved: F) -> T
    where
        F: FnOnce(&T),
    {
        let last = self.items.len() - 1;
        let out = self.items.swap_remove(idx);
        if idx < last {
            on_moved(&self.items[idx]);
        }
        self.try_shrink();
        out
    }

    /// Exchange slots `i` and `j`, reporting `(now_at_i, now_at_j)`.
    ///
    /// No-op (and no callback) when `i == j`.
    pub fn swap_with<F>(&mut self, i: usize, j: usize, on_swapped: F)
    where
        F: FnOnce(&T, &T),
    {
        assert!(i < self.items.len() && j < self.items.len());
        if i != j {
            self.items.swap(i, j);
            on_swapped(&self.items[i], &self.items[j]);
        }
    }

    fn try_shrink(&mut self) {
        let cap = self.items.capacity();
        if self.items.is_empty() {
            self.items.shrink_to(0);
        } else if self.items.len() * 4 <= cap {
            self.items.shrink_to(cap / 2);
        }
    }
}

impl<T> Index<usize> for GrowableArray<T> {
    type Output = T;

    fn index(&self, idx: usize) -> &T {
        &self.items[idx]
    }
}

impl<T> IndexMut<usize> for GrowableArray<T> {
    fn index_mut(&mut self, idx: usize) -> &mut T {
        &mut self.items[idx]
    }
}

impl<'a, T> IntoIterator for &'a GrowableArray<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
