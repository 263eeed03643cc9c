//! Indexed binary min-heap over item ids in [0, capacity).
//! 1-based pair array plus a position table, so decrease-key finds its item
//! in O(1). Ties on equal keys break arbitrarily.

use crate::{Node, Weight};

pub struct IndexedHeap {
    /// (item, key) pairs, 1-based; slot 0 is unused.
    a: Vec<(Node, Weight)>,
    /// item -> index into `a`; 0 means absent.
    pos: Vec<usize>,
    n: usize,
}

impl IndexedHeap {
    pub fn new(capacity: usize) -> Self {
        IndexedHeap {
            a: vec![(0, 0); capacity + 1],
            pos: vec![0; capacity],
            n: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.n
    }

    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    pub fn contains(&self, item: Node) -> bool {
        self.pos[item] != 0
    }

    /// Insert `item` with `key`. The item must not already be present.
    pub fn insert(&mut self, item: Node, key: Weight) {
        assert!(!self.contains(item), "heap insert of a present item");
        self.n += 1;
        self.a[self.n] = (item, key);
        self.pos[item] = self.n;
        self.sift_up(self.n);
    }

    /// Remove and return a minimum-key entry, or `None` if empty.
    pub fn extract_min(&mut self) -> Option<(Node, Weight)> {
        if self.n == 0 {
            return None;
        }
        let min = self.a[1];
        self.pos[min.0] = 0;
        let last = self.a[self.n];
        self.n -= 1;
        if self.n > 0 {
            self.a[1] = last;
            self.pos[last.0] = 1;
            self.sift_down(1);
        }
        Some(min)
    }

    /// Lower `item`'s key to `new_key`. The item must be present and
    /// `new_key` must not exceed its current key.
    pub fn decrease_key(&mut self, item: Node, new_key: Weight) {
        let i = self.pos[item];
        assert!(i != 0, "decrease_key on an absent item");
        assert!(new_key <= self.a[i].1, "decrease_key raising a key");
        self.a[i].1 = new_key;
        self.sift_up(i);
    }

    fn sift_up(&mut self, mut i: usize) {
        let e = self.a[i];
        while i >= 2 {
            let j = i / 2;
            if self.a[j].1 <= e.1 {
                break;
            }
            self.a[i] = self.a[j];
            self.pos[self.a[i].0] = i;
            i = j;
        }
        self.a[i] = e;
        self.pos[e.0] = i;
    }

    fn sift_down(&mut self, mut i: usize) {
        let e = self.a[i];
        loop {
            let mut j = 2 * i;
            if j > self.n {
                break;
            }
            if j < self.n && self.a[j + 1].1 < self.a[j].1 {
                j += 1;
            }
            if e.1 <= self.a[j].1 {
                break;
            }
            self.a[i] = self.a[j];
            self.pos[self.a[i].0] = i;
            i = j;
        }
        self.a[i] = e;
        self.pos[e.0] = i;
    }
}
