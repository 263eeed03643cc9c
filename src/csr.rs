//! Compressed-sparse-row adjacency: an offsets array plus packed
//! (neighbour, weight) runs, each undirected edge stored once per endpoint.
//! The structure is immutable after the build; super-source rows used by the
//! DP live outside it, owned by the worker that mutates them.

use std::thread;

use crate::{chunk_ranges, Graph, Node, Weight};

#[derive(Debug)]
pub struct Csr {
    n: usize,
    m: usize,
    /// Offsets into `adj`, length n + 1.
    pos: Vec<usize>,
    /// Packed neighbour runs, length 2m.
    adj: Vec<(Node, Weight)>,
}

impl Csr {
    /// Build from an edge list. With `threads > 1` the degree count and the
    /// adjacency fill are partitioned across workers by contiguous vertex
    /// ranges; every cell is written by exactly one worker.
    pub fn build(g: &Graph, threads: usize) -> Self {
        let n = g.n;
        let m = g.edges.len();

        let mut deg = vec![0usize; n];
        if threads > 1 {
            count_degrees_parallel(g, &mut deg, threads);
        } else {
            for &(u, v, _) in &g.edges {
                deg[u] += 1;
                deg[v] += 1;
            }
        }

        // serial exclusive scan stitches the per-range counts together
        let mut pos = Vec::with_capacity(n + 1);
        let mut run = 0usize;
        for u in 0..n {
            pos.push(run);
            run += deg[u];
        }
        pos.push(run);
        assert_eq!(run, 2 * m, "degree sum disagrees with the edge list");

        let mut adj = vec![(0 as Node, 0 as Weight); 2 * m];
        if threads > 1 {
            fill_adj_parallel(g, &pos, &mut adj, threads);
        } else {
            let mut cur = pos[..n].to_vec();
            for &(u, v, w) in &g.edges {
                adj[cur[u]] = (v, w);
                cur[u] += 1;
                adj[cur[v]] = (u, w);
                cur[v] += 1;
            }
        }

        Csr { n, m, pos, adj }
    }

    pub fn n(&self) -> usize {
        self.n
    }

    pub fn m(&self) -> usize {
        self.m
    }

    pub fn degree(&self, u: Node) -> usize {
        self.pos[u + 1] - self.pos[u]
    }

    pub fn neighbors(&self, u: Node) -> &[(Node, Weight)] {
        &self.adj[self.pos[u]..self.pos[u + 1]]
    }

    pub fn memory_estimate_bytes(&self) -> usize {
        let pos_bytes = self.pos.len() * std::mem::size_of::<usize>();
        let adj_bytes = self.adj.len() * std::mem::size_of::<(Node, Weight)>();
        let headers = 2 * 3 * std::mem::size_of::<usize>();
        pos_bytes + adj_bytes + headers
    }
}

/// Each worker sweeps the whole edge list and counts only the endpoints in
/// its vertex range, writing into its disjoint slice of `deg`.
fn count_degrees_parallel(g: &Graph, deg: &mut [usize], threads: usize) {
    let ranges = chunk_ranges(g.n, threads);
    thread::scope(|s| {
        let mut rest: &mut [usize] = deg;
        let mut base = 0usize;
        for r in ranges {
            let (chunk, tail) = rest.split_at_mut(r.end - base);
            rest = tail;
            base = r.end;
            let edges = &g.edges;
            s.spawn(move || {
                for &(u, v, _) in edges {
                    if r.contains(&u) {
                        chunk[u - r.start] += 1;
                    }
                    if r.contains(&v) {
                        chunk[v - r.start] += 1;
                    }
                }
            });
        }
    });
}

/// Same partitioning for the fill: worker t owns adj[pos[r.start]..pos[r.end])
/// and keeps its own running cursor per vertex.
fn fill_adj_parallel(g: &Graph, pos: &[usize], adj: &mut [(Node, Weight)], threads: usize) {
    let ranges = chunk_ranges(g.n, threads);
    thread::scope(|s| {
        let mut rest: &mut [(Node, Weight)] = adj;
        let mut base = 0usize;
        for r in ranges {
            let (chunk, tail) = rest.split_at_mut(pos[r.end] - base);
            rest = tail;
            base = pos[r.end];
            let edges = &g.edges;
            let chunk_base = pos[r.start];
            let mut cur = pos[r.start..r.end].to_vec();
            s.spawn(move || {
                for &(u, v, w) in edges {
                    if r.contains(&u) {
                        let c = &mut cur[u - r.start];
                        chunk[*c - chunk_base] = (v, w);
                        *c += 1;
                    }
                    if r.contains(&v) {
                        let c = &mut cur[v - r.start];
                        chunk[*c - chunk_base] = (u, w);
                        *c += 1;
                    }
                }
            });
        }
    });
}
