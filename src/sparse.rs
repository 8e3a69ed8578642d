//! Dense value array that remembers which entries were touched.
//!
//! The touch log holds at most `size / 64` ids. While it has room, iteration visits only
//! the logged ids (sorted and deduplicated by [`SparseVector::iterize`]); once it
//! overflows, iteration falls back to a full scan of ids `1..size`. Callers never pick the
//! strategy themselves.

use std::ops::Index;

#[derive(Debug, Clone)]
pub struct SparseVector {
    data: Vec<f64>,
    touched: Vec<usize>,
    limit: usize,
}

impl SparseVector {
    /// Vector over ids `0..size` (id 0 is never iterated).
    pub fn new(size: usize) -> Self {
        let limit = size >> 6;
        Self { data: vec![0.0; size], touched: Vec::with_capacity(limit), limit }
    }

    pub fn is_sparse(&self) -> bool {
        self.touched.len() < self.limit
    }

    /// Number of ids an iteration will visit.
    pub fn len(&self) -> usize {
        if self.is_sparse() {
            self.touched.len()
        } else {
            self.data.len().saturating_sub(1)
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, v: usize) -> f64 {
        self.data[v]
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    pub fn update(&mut self, v: usize, value: f64) {
        self.data[v] = value;
        self.log(v);
    }

    pub fn accumulate(&mut self, v: usize, value: f64) {
        self.data[v] += value;
        self.log(v);
    }

    fn log(&mut self, v: usize) {
        if self.is_sparse() {
            self.touched.push(v);
        }
    }

    /// Freeze the iteration set for the current phase.
    pub fn iterize(&mut self) {
        if self.is_sparse() {
            self.touched.sort_unstable();
            self.touched.dedup();
        }
    }

    pub fn iter(&self) -> SparseIter<'_> {
        if self.is_sparse() {
            SparseIter::Touched(self.touched.iter())
        } else {
            SparseIter::Dense(1..self.data.len())
        }
    }

    pub fn clear(&mut self) {
        if self.is_sparse() {
            for &v in &self.touched {
                self.data[v] = 0.0;
            }
        } else {
            self.data.fill(0.0);
        }
        self.touched.clear();
    }

    /// Overwrite `self` with `other`'s values and touch log.
    pub fn copy_from(&mut self, other: &SparseVector) {
        if self.data.len() != other.data.len() {
            *self = other.clone();
            return;
        }
        if self.is_sparse() && other.is_sparse() {
            for &v in &self.touched {
                self.data[v] = 0.0;
            }
            for &v in &other.touched {
                self.data[v] = other.data[v];
            }
        } else {
            self.data.copy_from_slice(&other.data);
        }
        self.touched.clear();
        self.touched.extend_from_slice(&other.touched);
    }
}

impl Index<usize> for SparseVector {
    type Output = f64;

    fn index(&self, v: usize) -> &f64 {
        &self.data[v]
    }
}

impl<'a> IntoIterator for &'a SparseVector {
    type Item = usize;
    type IntoIter = SparseIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

pub enum SparseIter<'a> {
    Touched(std::slice::Iter<'a, usize>),
    Dense(std::ops::Range<usize>),
}

impl Iterator for SparseIter<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        match self {
            SparseIter::Touched(it) => it.next().copied(),
            SparseIter::Dense(r) => r.next(),
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match self {
            SparseIter::Touched(it) => it.size_hint(),
            SparseIter::Dense(r) => r.size_hint(),
        }
    }
}
