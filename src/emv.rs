//! Erickson-Monma-Veinott dynamic program over terminal subsets.
//!
//! f[X][v] is the minimum weight of a tree containing v and exactly the
//! terminals selected by X; the layout is subset-major (X * n + v). Each
//! subset size is one fork-join phase: masks of equal popcount are
//! independent and are sharded across workers. Every worker owns its
//! Dijkstra scratch and super-source row, computes whole rows, and the main
//! thread commits them after the join; that join orders all writes at size
//! m before any read at size m + 1.

use std::thread;

use crate::dijkstra::dijkstra;
use crate::{
    chunk_ranges, Csr, Mask, Node, Weight, MAX_DISTANCE, MAX_K, MAX_THREADS, NO_VERTEX,
};

/// Minimum cost plus, when solution tracking is on and the terminals are
/// connected, the Steiner tree edge set (0-based, unordered endpoints).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SteinerResult {
    pub cost: Weight,
    pub edges: Option<Vec<(Node, Node)>>,
}

/// Per-worker arrays, allocated once per query and reused by every Dijkstra
/// invocation of that worker.
struct Scratch {
    dist: Vec<Weight>,
    visited: Vec<bool>,
    parent: Vec<Node>,
    super_row: Vec<Weight>,
}

impl Scratch {
    fn new(n: usize) -> Self {
        Scratch {
            dist: vec![0; n + 1],
            visited: vec![false; n + 1],
            parent: vec![NO_VERTEX; n + 1],
            super_row: vec![MAX_DISTANCE; n],
        }
    }
}

/// Checked size in bytes of the DP tables for an (n, k) instance; `None`
/// when the tables cannot be addressed.
pub fn dp_table_bytes(n: usize, k: usize, track_solution: bool) -> Option<u64> {
    let rows = 1u64.checked_shl(k as u32)?;
    let cells = rows.checked_mul(n as u64)?;
    let f = cells.checked_mul(std::mem::size_of::<Weight>() as u64)?;
    if !track_solution {
        return Some(f);
    }
    let b = cells.checked_mul(std::mem::size_of::<(Node, Mask)>() as u64)?;
    f.checked_add(b)
}

fn binomial(n: usize, mut r: usize) -> usize {
    if r > n {
        return 0;
    }
    if r > n - r {
        r = n - r;
    }
    let mut ans: usize = 1;
    for i in 1..=r {
        ans = ans * (n - r + i) / i;
    }
    ans
}

/// Next integer with the same popcount (Gosper's hack).
fn next_same_popcount(x: Mask) -> Mask {
    let z = x | (x - 1);
    (z + 1) | ((((!z) & (!z).wrapping_neg()) - 1) >> (x.trailing_zeros() + 1))
}

/// All k-bit masks of popcount m, ascending.
fn masks_of_size(k: usize, m: usize) -> Vec<Mask> {
    let mut out = Vec::with_capacity(binomial(k, m));
    let top = 1usize << k;
    let mut x = (1usize << m) - 1;
    while x < top {
        out.push(x);
        x = next_same_popcount(x);
    }
    out
}

/// One EMV step for a fixed subset X: submask convolution, then the
/// super-source relaxation. Reads rows of smaller popcount from `f` and
/// returns the finished row (plus back-pointers when tracked) for X.
fn emv_step(
    csr: &Csr,
    kk: &[Node],
    x: Mask,
    f: &[Weight],
    sc: &mut Scratch,
    track: bool,
) -> (Vec<Weight>, Option<Vec<(Node, Mask)>>) {
    let n = csr.n();
    let mut frow = vec![MAX_DISTANCE; n];
    let mut brow = track.then(|| vec![(NO_VERTEX, 0 as Mask); n]);

    // proper submasks in descending order; strict < keeps the first writer
    let mut xd = (x - 1) & x;
    while xd != 0 {
        let y = x & !xd;
        let fx = &f[xd * n..xd * n + n];
        let fy = &f[y * n..y * n + n];
        for v in 0..n {
            let cand = fx[v].saturating_add(fy[v]);
            if cand < frow[v] {
                frow[v] = cand;
                if let Some(b) = brow.as_deref_mut() {
                    b[v] = (v, xd);
                }
            }
        }
        xd = (xd - 1) & x;
    }

    // super-source edge to v carries the best tree rooted at v; terminals in
    // X are instead offered as "attach that terminal last"
    sc.super_row.copy_from_slice(&frow);
    for (t, &u) in kk.iter().enumerate() {
        if x & (1 << t) != 0 {
            let xu = x & !(1 << t);
            sc.super_row[u] = f[xu * n + u];
        }
    }
    dijkstra(
        csr,
        n,
        Some(&sc.super_row),
        &mut sc.dist,
        &mut sc.visited,
        track.then(|| sc.parent.as_mut_slice()),
    );

    frow.copy_from_slice(&sc.dist[..n]);
    if let Some(b) = brow.as_deref_mut() {
        for v in 0..n {
            let u = sc.parent[v];
            if u != n {
                b[v] = (u, x);
            }
        }
    }
    (frow, brow)
}

/// Exact optimal Steiner tree for the terminals `kk` in the CSR graph.
/// `threads` bounds the worker pool; with `track_solution` the edge set is
/// reconstructed from back-pointers. A disconnected terminal set yields
/// cost MAX_DISTANCE and no edges.
pub fn erickson_monma_veinott(
    csr: &Csr,
    kk: &[Node],
    threads: usize,
    track_solution: bool,
) -> SteinerResult {
    let n = csr.n();
    let k = kk.len();
    assert!(k >= 1 && k <= MAX_K, "terminal count out of range");
    for &t in kk {
        assert!(t < n, "terminal out of range");
    }
    let threads = threads.clamp(1, MAX_THREADS);

    // a single terminal spans itself; two reduce to one shortest path
    if k == 1 {
        return SteinerResult {
            cost: 0,
            edges: track_solution.then(Vec::new),
        };
    }
    if k == 2 {
        return two_terminal(csr, kk[0], kk[1], track_solution);
    }

    assert!(
        dp_table_bytes(n, k, track_solution)
            .map_or(false, |bytes| bytes <= usize::MAX as u64),
        "DP tables are not addressable for n = {n}, k = {k}"
    );
    let cells = n << k;
    let mut f: Vec<Weight> = vec![MAX_DISTANCE; cells];
    let mut b: Option<Vec<(Node, Mask)>> =
        track_solution.then(|| vec![(NO_VERTEX, 0 as Mask); cells]);

    let mut scratch: Vec<Scratch> = (0..threads).map(|_| Scratch::new(n)).collect();

    // size 1: one Dijkstra per terminal on the real graph
    let mut singleton_rows: Vec<(usize, Vec<Weight>)> = Vec::with_capacity(k);
    thread::scope(|s| {
        let mut handles = Vec::new();
        for (sc, r) in scratch.iter_mut().zip(chunk_ranges(k, threads)) {
            handles.push(s.spawn(move || {
                let mut out = Vec::with_capacity(r.len());
                for t in r {
                    dijkstra(csr, kk[t], None, &mut sc.dist, &mut sc.visited, None);
                    out.push((t, sc.dist[..n].to_vec()));
                }
                out
            }));
        }
        for h in handles {
            singleton_rows.extend(h.join().expect("worker thread panicked"));
        }
    });
    for (t, row) in singleton_rows {
        let x = 1usize << t;
        f[x * n..x * n + n].copy_from_slice(&row);
        if let Some(b) = b.as_deref_mut() {
            for v in 0..n {
                b[x * n + v] = (kk[t], x);
            }
        }
    }

    // sizes 2..=k; the scope join is the barrier between cardinalities
    for m in 2..=k {
        let masks = masks_of_size(k, m);
        let mut rows: Vec<(Mask, Vec<Weight>, Option<Vec<(Node, Mask)>>)> =
            Vec::with_capacity(masks.len());
        thread::scope(|s| {
            let f = &f;
            let mut handles = Vec::new();
            for (sc, r) in scratch.iter_mut().zip(chunk_ranges(masks.len(), threads)) {
                let shard = &masks[r.start..r.end];
                handles.push(s.spawn(move || {
                    let mut out = Vec::with_capacity(shard.len());
                    for &x in shard {
                        let (frow, brow) = emv_step(csr, kk, x, f, sc, track_solution);
                        out.push((x, frow, brow));
                    }
                    out
                }));
            }
            for h in handles {
                rows.extend(h.join().expect("worker thread panicked"));
            }
        });
        for (x, frow, brow) in rows {
            f[x * n..x * n + n].copy_from_slice(&frow);
            if let (Some(b), Some(brow)) = (b.as_deref_mut(), brow) {
                b[x * n..x * n + n].copy_from_slice(&brow);
            }
        }
    }

    // the root terminal's own bit is not in the final mask: f[C][q] already
    // means "a tree through q spanning the terminals of C"
    let c_mask: Mask = (1 << (k - 1)) - 1;
    let q = kk[k - 1];
    let cost = f[c_mask * n + q];

    let edges = match &b {
        Some(b) if cost < MAX_DISTANCE => Some(build_tree(n, q, c_mask, b)),
        _ => None,
    };
    SteinerResult { cost, edges }
}

/// k = 2 fast path: one Dijkstra, the tree is the parent chain.
fn two_terminal(csr: &Csr, s: Node, t: Node, track: bool) -> SteinerResult {
    let n = csr.n();
    let mut dist = vec![0; n];
    let mut visited = vec![false; n];
    let mut parent = vec![NO_VERTEX; n];
    dijkstra(csr, s, None, &mut dist, &mut visited, Some(&mut parent));
    let cost = dist[t];
    let edges = (track && cost < MAX_DISTANCE).then(|| trace_path(s, t, &parent));
    SteinerResult { cost, edges }
}

fn trace_path(s: Node, t: Node, parent: &[Node]) -> Vec<(Node, Node)> {
    let mut edges = Vec::new();
    let mut v = t;
    while v != s {
        let u = parent[v];
        edges.push((v, u));
        v = u;
    }
    edges
}

fn build_tree(n: usize, q: Node, c: Mask, b: &[(Node, Mask)]) -> Vec<(Node, Node)> {
    let mut edges = Vec::new();
    backtrack(n, q, c, b, &mut edges);
    edges
}

/// Walk the back-pointers from (q, C). A cell (u, X') with u != v is the
/// tree edge v-u; (v, X') with X' != X splits v's subtree into X' and X\X'.
fn backtrack(n: usize, v: Node, x: Mask, b: &[(Node, Mask)], edges: &mut Vec<(Node, Node)>) {
    if x == 0 || v == NO_VERTEX {
        return;
    }
    let (u, xd) = b[x * n + v];
    if u != v {
        assert!(u < n, "dangling back-pointer");
        edges.push((v, u));
        backtrack(n, u, xd, b, edges);
    } else {
        if xd == x {
            return;
        }
        backtrack(n, v, xd, b, edges);
        backtrack(n, v, x & !xd, b, edges);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Graph;
    use rand::{rngs::StdRng, Rng, SeedableRng};
    use std::collections::HashMap;

    fn csr(g: &Graph) -> Csr {
        Csr::build(g, 1)
    }

    fn solve(g: &Graph, threads: usize) -> SteinerResult {
        erickson_monma_veinott(&csr(g), &g.terminals, threads, true)
    }

    /// Edge weight in g, minimum over parallel edges, either orientation.
    fn edge_weight(g: &Graph, u: Node, v: Node) -> Option<Weight> {
        g.edges
            .iter()
            .filter(|&&(a, b, _)| (a == u && b == v) || (a == v && b == u))
            .map(|&(_, _, w)| w)
            .min()
    }

    /// The reconstructed edge list must be a tree of g spanning the
    /// terminals whose total weight equals the reported cost.
    fn check_tree(g: &Graph, result: &SteinerResult) {
        let edges = result.edges.as_ref().expect("no edge list");
        if g.k() == 1 {
            assert!(edges.is_empty());
            assert_eq!(result.cost, 0);
            return;
        }
        let mut weight: Weight = 0;
        let mut vertices: Vec<Node> = Vec::new();
        let mut parent_uf: HashMap<Node, Node> = HashMap::new();
        fn find(uf: &mut HashMap<Node, Node>, v: Node) -> Node {
            let p = *uf.entry(v).or_insert(v);
            if p == v {
                v
            } else {
                let r = find(uf, p);
                uf.insert(v, r);
                r
            }
        }
        for &(u, v) in edges {
            let w = edge_weight(g, u, v).expect("edge not in graph");
            weight += w;
            vertices.push(u);
            vertices.push(v);
            let (ru, rv) = (find(&mut parent_uf, u), find(&mut parent_uf, v));
            assert_ne!(ru, rv, "cycle in reconstructed tree");
            parent_uf.insert(ru, rv);
        }
        vertices.sort_unstable();
        vertices.dedup();
        assert_eq!(edges.len() + 1, vertices.len(), "not a tree");
        for &t in &g.terminals {
            assert!(vertices.contains(&t), "terminal {t} missing from tree");
        }
        let root = find(&mut parent_uf, g.terminals[0]);
        for &t in &g.terminals {
            assert_eq!(find(&mut parent_uf, t), root, "tree not connected");
        }
        assert_eq!(weight, result.cost, "tree weight disagrees with cost");
    }

    /// Spanning tree weight of the subgraph induced by vertex set `s`
    /// (bitmask over at most 16 vertices); None if it is not connected.
    fn induced_tree_weight(g: &Graph, s: u32) -> Option<Weight> {
        let verts: Vec<Node> = (0..g.n).filter(|&v| s & (1 << v) != 0).collect();
        if verts.is_empty() {
            return None;
        }
        // Prim over the induced subgraph
        let mut in_tree = vec![false; g.n];
        let mut best = vec![MAX_DISTANCE; g.n];
        best[verts[0]] = 0;
        let mut total: Weight = 0;
        for _ in 0..verts.len() {
            let u = verts
                .iter()
                .copied()
                .filter(|&v| !in_tree[v])
                .min_by_key(|&v| best[v])?;
            if best[u] == MAX_DISTANCE {
                return None;
            }
            total += best[u];
            in_tree[u] = true;
            for &(a, b, w) in &g.edges {
                let (x, y) = (a, b);
                for (p, q) in [(x, y), (y, x)] {
                    if p == u && s & (1 << q) != 0 && !in_tree[q] && w < best[q] {
                        best[q] = w;
                    }
                }
            }
        }
        Some(total)
    }

    /// Exact optimum by enumerating every vertex superset of the terminals.
    fn brute_force_cost(g: &Graph) -> Weight {
        assert!(g.n <= 16);
        let term_mask: u32 = g.terminals.iter().fold(0, |m, &t| m | 1 << t);
        let mut best = MAX_DISTANCE;
        for s in 0..(1u32 << g.n) {
            if s & term_mask != term_mask {
                continue;
            }
            if let Some(w) = induced_tree_weight(g, s) {
                best = best.min(w);
            }
        }
        best
    }

    fn triangle() -> Graph {
        let mut g = Graph::new(3);
        g.add_edge(0, 1, 1);
        g.add_edge(1, 2, 1);
        g.add_edge(0, 2, 5);
        g.add_terminal(0);
        g.add_terminal(2);
        g
    }

    #[test]
    fn triangle_two_terminals() {
        let g = triangle();
        let r = solve(&g, 1);
        assert_eq!(r.cost, 2);
        let mut edges = r.edges.clone().unwrap();
        edges.iter_mut().for_each(|e| {
            if e.0 > e.1 {
                *e = (e.1, e.0);
            }
        });
        edges.sort_unstable();
        assert_eq!(edges, vec![(0, 1), (1, 2)]);
        check_tree(&g, &r);
    }

    #[test]
    fn star_three_terminals() {
        let mut g = Graph::new(4);
        g.add_edge(0, 1, 1);
        g.add_edge(0, 2, 1);
        g.add_edge(0, 3, 1);
        g.add_terminal(1);
        g.add_terminal(2);
        g.add_terminal(3);
        let r = solve(&g, 1);
        assert_eq!(r.cost, 3);
        assert_eq!(r.edges.as_ref().unwrap().len(), 3);
        check_tree(&g, &r);
    }

    #[test]
    fn diamond_two_routes() {
        let mut g = Graph::new(4);
        g.add_edge(0, 1, 1);
        g.add_edge(0, 2, 2);
        g.add_edge(1, 3, 2);
        g.add_edge(2, 3, 1);
        g.add_terminal(0);
        g.add_terminal(3);
        let r = solve(&g, 1);
        assert_eq!(r.cost, 3);
        assert_eq!(r.edges.as_ref().unwrap().len(), 2);
        check_tree(&g, &r);
    }

    #[test]
    fn path_graph_end_terminals() {
        let mut g = Graph::new(6);
        for i in 0..5 {
            g.add_edge(i, i + 1, 1);
        }
        g.add_terminal(0);
        g.add_terminal(5);
        let r = solve(&g, 1);
        assert_eq!(r.cost, 5);
        assert_eq!(r.edges.as_ref().unwrap().len(), 5);
        check_tree(&g, &r);
    }

    #[test]
    fn single_terminal_is_free() {
        let mut g = triangle();
        g.terminals = vec![1];
        let r = solve(&g, 1);
        assert_eq!(r.cost, 0);
        assert_eq!(r.edges, Some(vec![]));
    }

    #[test]
    fn three_terminals_on_a_path() {
        // forces a split at the middle terminal
        let mut g = Graph::new(5);
        for i in 0..4 {
            g.add_edge(i, i + 1, 2);
        }
        g.add_terminal(0);
        g.add_terminal(2);
        g.add_terminal(4);
        let r = solve(&g, 1);
        assert_eq!(r.cost, 8);
        assert_eq!(r.edges.as_ref().unwrap().len(), 4);
        check_tree(&g, &r);
    }

    #[test]
    fn steiner_vertex_used() {
        // optimal tree goes through the non-terminal hub
        let mut g = Graph::new(4);
        g.add_edge(0, 3, 1);
        g.add_edge(1, 3, 1);
        g.add_edge(2, 3, 1);
        g.add_edge(0, 1, 10);
        g.add_edge(1, 2, 10);
        g.add_terminal(0);
        g.add_terminal(1);
        g.add_terminal(2);
        let r = solve(&g, 1);
        assert_eq!(r.cost, 3);
        check_tree(&g, &r);
    }

    #[test]
    fn disconnected_terminals_unreachable() {
        let mut g = Graph::new(6);
        g.add_edge(0, 1, 1);
        g.add_edge(2, 3, 1);
        g.add_edge(4, 5, 1);
        g.add_terminal(0);
        g.add_terminal(2);
        g.add_terminal(4);
        let r = solve(&g, 1);
        assert_eq!(r.cost, MAX_DISTANCE);
        assert!(r.edges.is_none());

        // k = 2 fast path reports the same condition
        g.terminals = vec![0, 3];
        let r = solve(&g, 1);
        assert_eq!(r.cost, MAX_DISTANCE);
        assert!(r.edges.is_none());
    }

    #[test]
    fn two_terminal_fast_path_matches_dijkstra() {
        let mut rng = StdRng::seed_from_u64(99);
        for _ in 0..10 {
            let g = random_connected(10, 18, rng.gen());
            let c = csr(&g);
            let mut dist = vec![0; 10];
            let mut visited = vec![false; 10];
            for s in 0..3usize {
                for t in 4..7usize {
                    dijkstra(&c, s, None, &mut dist, &mut visited, None);
                    let r = erickson_monma_veinott(&c, &[s, t], 1, false);
                    assert_eq!(r.cost, dist[t]);
                }
            }
        }
    }

    fn random_connected(n: usize, extra: usize, seed: u64) -> Graph {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut g = Graph::new(n);
        // spanning path keeps it connected, then random chords
        for i in 0..n - 1 {
            g.add_edge(i, i + 1, rng.gen_range(1..20));
        }
        for _ in 0..extra {
            let u = rng.gen_range(0..n);
            let mut v = rng.gen_range(0..n);
            while v == u {
                v = rng.gen_range(0..n);
            }
            g.add_edge(u, v, rng.gen_range(1..20));
        }
        g
    }

    #[test]
    fn agrees_with_brute_force() {
        let mut rng = StdRng::seed_from_u64(2024);
        for round in 0..15 {
            let n = rng.gen_range(5..11);
            let mut g = random_connected(n, rng.gen_range(0..8), rng.gen());
            let k = rng.gen_range(1..=5.min(n));
            let mut picked: Vec<Node> = (0..n).collect();
            for i in 0..k {
                let j = rng.gen_range(i..n);
                picked.swap(i, j);
            }
            g.terminals = picked[..k].to_vec();
            let expected = brute_force_cost(&g);
            let r = solve(&g, 1);
            assert_eq!(r.cost, expected, "round {round}: n = {n}, k = {k}");
            if k >= 2 {
                check_tree(&g, &r);
            }
        }
    }

    #[test]
    fn root_choice_is_irrelevant() {
        let g0 = random_connected(12, 14, 321);
        for rot in 0..4 {
            let mut g = g0.clone();
            let mut kk: Vec<Node> = vec![0, 3, 6, 9];
            kk.rotate_left(rot);
            g.terminals = kk;
            let r = solve(&g, 1);
            let baseline = {
                let mut g = g0.clone();
                g.terminals = vec![0, 3, 6, 9];
                solve(&g, 1)
            };
            assert_eq!(r.cost, baseline.cost, "rotation {rot}");
            check_tree(&g, &r);
        }
    }

    #[test]
    fn repeat_runs_are_identical() {
        let mut g = random_connected(15, 25, 777);
        g.terminals = vec![1, 4, 8, 12, 14];
        let a = solve(&g, 1);
        let b = solve(&g, 1);
        assert_eq!(a.cost, b.cost);
        assert_eq!(a.edges, b.edges);
    }

    #[test]
    fn thread_count_does_not_change_the_answer() {
        let mut g = random_connected(20, 35, 4242);
        g.terminals = vec![0, 5, 9, 13, 17, 19];
        let serial = solve(&g, 1);
        for threads in [2usize, 4, 8] {
            let pooled = solve(&g, threads);
            assert_eq!(serial.cost, pooled.cost, "threads = {threads}");
            assert_eq!(serial.edges, pooled.edges, "threads = {threads}");
            check_tree(&g, &pooled);
        }
    }

    #[test]
    fn pair_step_refines_convolution() {
        let mut g = random_connected(9, 10, 11);
        g.terminals = vec![2, 5, 7];
        let c = csr(&g);
        let n = c.n();
        let mut f = vec![MAX_DISTANCE; n << 3];
        let mut dist = vec![0; n + 1];
        let mut visited = vec![false; n + 1];
        for (t, &u) in g.terminals.iter().enumerate() {
            dijkstra(&c, u, None, &mut dist, &mut visited, None);
            f[(1 << t) * n..(1 << t) * n + n].copy_from_slice(&dist[..n]);
        }
        // a pair step can only refine: it is bounded by the sum of the halves
        let mut sc = Scratch::new(n);
        let (frow, _) = emv_step(&c, &g.terminals, 0b011, &f, &mut sc, false);
        for v in 0..n {
            let sum = f[n + v].saturating_add(f[2 * n + v]);
            assert!(frow[v] <= sum, "v = {v}");
        }
    }

    #[test]
    fn mask_enumeration_counts_and_order() {
        for k in 1..=6usize {
            for m in 1..=k {
                let masks = masks_of_size(k, m);
                assert_eq!(masks.len(), binomial(k, m));
                for w in masks.windows(2) {
                    assert!(w[0] < w[1]);
                }
                for &x in &masks {
                    assert_eq!(x.count_ones() as usize, m);
                    assert!(x < 1 << k);
                }
            }
        }
        assert_eq!(masks_of_size(4, 2), vec![0b0011, 0b0101, 0b0110, 0b1001, 0b1010, 0b1100]);
    }

    #[test]
    fn table_size_overflows_cleanly() {
        assert!(dp_table_bytes(100, 10, true).is_some());
        assert_eq!(dp_table_bytes(usize::MAX, 32, false), None);
    }
}
