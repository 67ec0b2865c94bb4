// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Run queue.
//!
//! Plain FIFO of entity keys. Push to the back, pop from the front; no
//! priorities, no stealing. One thread only, so no locking either.
use std::collections::VecDeque;

use crate::entity::EntityKey;

#[derive(Debug, Default)]
pub(crate) struct RunQueue {
    deque: VecDeque<EntityKey>,
}

impl RunQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, key: EntityKey) {
        self.deque.push_back(key);
    }

    pub fn pop(&mut self) -> Option<EntityKey> {
        self.deque.pop_front()
    }

    pub fn len(&self) -> usize {
        self.deque.len()
    }

    pub fn is_empty(&self) -> bool {
        self.deque.is_empty()
    }

    /// Forget every queued key (the arena still owns the entities).
    pub fn clear(&mut self) {
        self.deque.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_pop_is_fifo() {
        let mut q = RunQueue::new();
        for i in 0..4 {
            q.push(EntityKey(i));
        }
        assert_eq!(q.len(), 4);
        let order: Vec<_> = std::iter::from_fn(|| q.pop()).collect();
        assert_eq!(order, vec![EntityKey(0), EntityKey(1), EntityKey(2), EntityKey(3)]);
        assert!(q.is_empty());
    }

    #[test]
    fn requeued_goes_to_tail() {
        let mut q = RunQueue::new();
        q.push(EntityKey(0));
        q.push(EntityKey(1));
        let first = q.pop().unwrap();
        q.push(first);
        assert_eq!(q.pop(), Some(EntityKey(1)));
        assert_eq!(q.pop(), Some(EntityKey(0)));
        assert_eq!(q.pop(), None);
    }
}
