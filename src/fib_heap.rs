//! Fibonacci heap with the same operation set as the indexed binary heap.
//! Nodes live in an arena indexed by item id; sibling lists are circular and
//! index-linked, so the structure stays free of raw pointers.

use crate::{Node, Weight};

const NIL: usize = usize::MAX;

struct FibNode {
    parent: usize,
    child: usize,
    left: usize,
    right: usize,
    degree: usize,
    marked: bool,
    key: Weight,
    present: bool,
}

pub struct FibHeap {
    nodes: Vec<FibNode>,
    min: usize,
    n: usize,
}

impl FibHeap {
    pub fn new(capacity: usize) -> Self {
        let nodes = (0..capacity)
            .map(|_| FibNode {
                parent: NIL,
                child: NIL,
                left: NIL,
                right: NIL,
                degree: 0,
                marked: false,
                key: 0,
                present: false,
            })
            .collect();
        FibHeap {
            nodes,
            min: NIL,
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
        self.nodes[item].present
    }

    /// Insert `item` with `key`. The item must not already be present.
    pub fn insert(&mut self, item: Node, key: Weight) {
        assert!(!self.contains(item), "heap insert of a present item");
        let node = &mut self.nodes[item];
        node.parent = NIL;
        node.child = NIL;
        node.degree = 0;
        node.marked = false;
        node.key = key;
        node.present = true;
        self.add_root(item);
        self.n += 1;
    }

    /// Remove and return a minimum-key entry, or `None` if empty.
    pub fn extract_min(&mut self) -> Option<(Node, Weight)> {
        if self.min == NIL {
            return None;
        }
        let z = self.min;
        let key = self.nodes[z].key;

        // Surviving roots plus z's children all become candidate roots.
        let mut roots = Vec::new();
        let mut w = self.nodes[z].right;
        while w != z {
            roots.push(w);
            w = self.nodes[w].right;
        }
        let child = self.nodes[z].child;
        if child != NIL {
            let mut c = child;
            loop {
                let next = self.nodes[c].right;
                self.nodes[c].parent = NIL;
                self.nodes[c].marked = false;
                roots.push(c);
                c = next;
                if c == child {
                    break;
                }
            }
        }
        self.nodes[z].present = false;
        self.nodes[z].child = NIL;
        self.nodes[z].degree = 0;
        self.n -= 1;

        self.consolidate(roots);
        Some((z, key))
    }

    /// Lower `item`'s key to `new_key`. The item must be present and
    /// `new_key` must not exceed its current key.
    pub fn decrease_key(&mut self, item: Node, new_key: Weight) {
        assert!(self.contains(item), "decrease_key on an absent item");
        assert!(new_key <= self.nodes[item].key, "decrease_key raising a key");
        self.nodes[item].key = new_key;
        let parent = self.nodes[item].parent;
        if parent != NIL && new_key < self.nodes[parent].key {
            self.cut(item, parent);
            self.cascading_cut(parent);
        }
        if new_key < self.nodes[self.min].key {
            self.min = item;
        }
    }

    /// Splice `x` into the root list as a singleton tree.
    fn add_root(&mut self, x: usize) {
        self.nodes[x].parent = NIL;
        if self.min == NIL {
            self.nodes[x].left = x;
            self.nodes[x].right = x;
            self.min = x;
        } else {
            let m = self.min;
            let r = self.nodes[m].right;
            self.nodes[x].left = m;
            self.nodes[x].right = r;
            self.nodes[m].right = x;
            self.nodes[r].left = x;
            if self.nodes[x].key < self.nodes[m].key {
                self.min = x;
            }
        }
    }

    /// Link equal-degree trees until all root degrees are distinct, then
    /// rebuild the root list and the min pointer.
    fn consolidate(&mut self, roots: Vec<usize>) {
        let cap = 2 + 2 * (usize::BITS - self.n.leading_zeros()) as usize;
        let mut by_degree = vec![NIL; cap];
        for r in roots {
            let mut x = r;
            let mut d = self.nodes[x].degree;
            loop {
                if d >= by_degree.len() {
                    by_degree.resize(d + 1, NIL);
                }
                let y = by_degree[d];
                if y == NIL {
                    break;
                }
                by_degree[d] = NIL;
                let (root, child) = if self.nodes[y].key < self.nodes[x].key {
                    (y, x)
                } else {
                    (x, y)
                };
                self.attach_child(child, root);
                x = root;
                d = self.nodes[x].degree;
            }
            by_degree[d] = x;
        }
        self.min = NIL;
        for d in 0..by_degree.len() {
            if by_degree[d] != NIL {
                self.add_root(by_degree[d]);
            }
        }
    }

    /// Make detached tree `y` a child of `x`.
    fn attach_child(&mut self, y: usize, x: usize) {
        self.nodes[y].parent = x;
        self.nodes[y].marked = false;
        let c = self.nodes[x].child;
        if c == NIL {
            self.nodes[x].child = y;
            self.nodes[y].left = y;
            self.nodes[y].right = y;
        } else {
            let r = self.nodes[c].right;
            self.nodes[y].left = c;
            self.nodes[y].right = r;
            self.nodes[c].right = y;
            self.nodes[r].left = y;
        }
        self.nodes[x].degree += 1;
    }

    /// Detach `x` from its parent `p` and promote it to the root list.
    fn cut(&mut self, x: usize, p: usize) {
        if self.nodes[x].right == x {
            self.nodes[p].child = NIL;
        } else {
            let l = self.nodes[x].left;
            let r = self.nodes[x].right;
            self.nodes[l].right = r;
            self.nodes[r].left = l;
            if self.nodes[p].child == x {
                self.nodes[p].child = r;
            }
        }
        self.nodes[p].degree -= 1;
        self.nodes[x].marked = false;
        self.add_root(x);
    }

    fn cascading_cut(&mut self, mut y: usize) {
        loop {
            let p = self.nodes[y].parent;
            if p == NIL {
                break;
            }
            if !self.nodes[y].marked {
                self.nodes[y].marked = true;
                break;
            }
            self.cut(y, p);
            y = p;
        }
    }
}
