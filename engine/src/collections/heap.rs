use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, VecDeque};

use crate::collections::store::Key;

/// An entry of the [BucketQueue]: a node together with its priority key.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
struct Bucket<K, P> {
    prio: P,
    node: K,
}

impl<K: Eq, P: Ord> PartialOrd for Bucket<K, P> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<K: Eq, P: Ord> Ord for Bucket<K, P> {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max-heap; reverse the priority so pops are min-first
        Reverse(&self.prio).cmp(&Reverse(&other.prio))
    }
}

/// Priority queue of (node, key) pairs popped in ascending key order.
///
/// A node may be enqueued several times with different keys; only the entry with
/// the smallest key matters. The queue does not deduplicate: the caller marks a
/// node when inserting it and unmarks it on the first pop, and stale pops are
/// filtered out with [BucketQueue::pop] returning entries for the caller to test.
/// This mirrors the shortest-path usage where re-inserting is cheaper than a
/// decrease-key operation.
#[derive(Clone)]
pub struct BucketQueue<K, P> {
    heap: BinaryHeap<Bucket<K, P>>,
}

impl<K: Eq, P: Ord> Default for BucketQueue<K, P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Eq, P: Ord> BucketQueue<K, P> {
    pub fn new() -> Self {
        BucketQueue { heap: BinaryHeap::new() }
    }

    pub fn clear(&mut self) {
        self.heap.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub fn insert(&mut self, node: K, prio: P) {
        self.heap.push(Bucket { prio, node });
    }

    /// Removes and returns the entry with the smallest key.
    pub fn pop(&mut self) -> Option<(K, P)> {
        self.heap.pop().map(|b| (b.node, b.prio))
    }
}

/// FIFO worklist in which every node appears at most once.
///
/// Membership is tracked with a per-node flag indexed by the key, so both
/// enqueue and the duplicate check are constant time.
#[derive(Clone)]
pub struct Dqueue<K> {
    queue: VecDeque<K>,
    enqueued: Vec<bool>,
}

impl<K> Default for Dqueue<K> {
    fn default() -> Self {
        Dqueue {
            queue: VecDeque::new(),
            enqueued: Vec::new(),
        }
    }
}

impl<K: Key> Dqueue<K> {
    pub fn new() -> Self {
        Dqueue {
            queue: VecDeque::new(),
            enqueued: Vec::new(),
        }
    }

    pub fn reset(&mut self) {
        for &k in &self.queue {
            self.enqueued[k.into()] = false;
        }
        self.queue.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Appends the node unless it is already queued.
    pub fn push(&mut self, node: K) {
        let i = node.into();
        if self.enqueued.len() <= i {
            self.enqueued.resize(i + 1, false);
        }
        if !self.enqueued[i] {
            self.enqueued[i] = true;
            self.queue.push_back(node);
        }
    }

    pub fn pop(&mut self) -> Option<K> {
        let node = self.queue.pop_front()?;
        self.enqueued[node.into()] = false;
        Some(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::create_key_type;
    use rand::prelude::*;

    create_key_type!(Node);

    #[test]
    fn bucket_queue_pops_in_key_order() {
        let mut rng = SmallRng::seed_from_u64(0x5eed);
        let mut queue: BucketQueue<Node, i64> = BucketQueue::new();
        let mut keys: Vec<i64> = (0..200).map(|_| rng.random_range(-1000..1000)).collect();
        for (i, &k) in keys.iter().enumerate() {
            queue.insert(Node::from(i), k);
        }
        keys.sort_unstable();
        for expected in keys {
            let (_, popped) = queue.pop().unwrap();
            assert_eq!(popped, expected);
        }
        assert!(queue.is_empty());
    }

    #[test]
    fn bucket_queue_duplicate_entries_surface_min_first() {
        let mut queue: BucketQueue<Node, i64> = BucketQueue::new();
        let n = Node::from(3usize);
        queue.insert(n, 10);
        queue.insert(n, 4);
        queue.insert(n, 7);
        assert_eq!(queue.pop(), Some((n, 4)));
        assert_eq!(queue.pop(), Some((n, 7)));
        assert_eq!(queue.pop(), Some((n, 10)));
    }

    #[test]
    fn dqueue_is_fifo_without_duplicates() {
        let mut queue: Dqueue<Node> = Dqueue::new();
        let a = Node::from(0usize);
        let b = Node::from(5usize);
        queue.push(a);
        queue.push(b);
        queue.push(a); // ignored, already queued
        assert_eq!(queue.pop(), Some(a));
        queue.push(a); // allowed again after the pop
        assert_eq!(queue.pop(), Some(b));
        assert_eq!(queue.pop(), Some(a));
        assert!(queue.is_empty());
    }

    #[test]
    fn dqueue_reset_clears_membership() {
        let mut queue: Dqueue<Node> = Dqueue::new();
        let a = Node::from(2usize);
        queue.push(a);
        queue.reset();
        assert!(queue.is_empty());
        queue.push(a);
        assert_eq!(queue.pop(), Some(a));
    }
}
