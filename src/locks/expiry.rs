//! Time-ordered queue of expiring locks.
//!
//! A binary min-heap keyed by absolute expiry, with a side table from node to
//! heap position so an arbitrary node can be removed in O(log n) when it is
//! refreshed, held, or unlocked before it expires.

use super::namespace::NodeId;
use chrono::{DateTime, Utc};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy)]
struct Entry {
    at: DateTime<Utc>,
    id: NodeId,
}

#[derive(Debug, Default)]
pub(super) struct ExpiryQueue {
    heap: Vec<Entry>,
    positions: HashMap<NodeId, usize>,
}

impl ExpiryQueue {
    /// Schedule `id` to expire at `at`, replacing any existing entry for it.
    pub fn push(&mut self, id: NodeId, at: DateTime<Utc>) {
        self.remove(id);
        self.heap.push(Entry { at, id });
        let last = self.heap.len() - 1;
        self.positions.insert(id, last);
        self.sift_up(last);
    }

    /// Remove `id` if it is queued. Returns whether it was.
    pub fn remove(&mut self, id: NodeId) -> bool {
        let Some(pos) = self.positions.remove(&id) else {
            return false;
        };

        let last = self.heap.len() - 1;
        if pos != last {
            self.heap.swap(pos, last);
            self.positions.insert(self.heap[pos].id, pos);
        }
        self.heap.pop();

        if pos < self.heap.len() && !self.sift_down(pos) {
            self.sift_up(pos);
        }
        true
    }

    /// The earliest-expiring node and its expiry.
    pub fn peek(&self) -> Option<(NodeId, DateTime<Utc>)> {
        self.heap.first().map(|entry| (entry.id, entry.at))
    }

    #[cfg(test)]
    pub fn contains(&self, id: NodeId) -> bool {
        self.positions.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    fn sift_up(&mut self, mut pos: usize) {
        while pos > 0 {
            let parent = (pos - 1) / 2;
            if self.heap[pos].at >= self.heap[parent].at {
                break;
            }
            self.swap(pos, parent);
            pos = parent;
        }
    }

    /// Returns whether the entry moved.
    fn sift_down(&mut self, start: usize) -> bool {
        let mut pos = start;
        loop {
            let left = 2 * pos + 1;
            if left >= self.heap.len() {
                break;
            }
            let right = left + 1;
            let child = if right < self.heap.len() && self.heap[right].at < self.heap[left].at {
                right
            } else {
                left
            };
            if self.heap[child].at >= self.heap[pos].at {
                break;
            }
            self.swap(pos, child);
            pos = child;
        }
        pos != start
    }

    fn swap(&mut self, a: usize, b: usize) {
        self.heap.swap(a, b);
        self.positions.insert(self.heap[a].id, a);
        self.positions.insert(self.heap[b].id, b);
    }
}
