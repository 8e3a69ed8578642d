//! FIFO worklist over node ids with membership dedup.

use std::collections::VecDeque;

/// A node is queued at most once at a time: `push` of an already-queued node is a no-op,
/// and `pop` clears its membership so it may be queued again later.
#[derive(Debug, Clone)]
pub struct DedupQueue {
    queue: VecDeque<usize>,
    queued: Vec<bool>,
}

impl DedupQueue {
    /// Queue over ids `0..size`.
    pub fn new(size: usize) -> Self {
        Self { queue: VecDeque::new(), queued: vec![false; size] }
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn contains(&self, v: usize) -> bool {
        self.queued[v]
    }

    pub fn push(&mut self, v: usize) {
        if !self.queued[v] {
            self.queued[v] = true;
            self.queue.push_back(v);
        }
    }

    pub fn pop(&mut self) -> Option<usize> {
        let v = self.queue.pop_front()?;
        self.queued[v] = false;
        Some(v)
    }

    pub fn clear(&mut self) {
        while self.pop().is_some() {}
    }
}
