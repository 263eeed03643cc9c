//! Single-source shortest paths over the CSR adjacency.
//! An optional super-source row extends the graph with one pseudo-vertex
//! (id = n) whose out-edges are (v, super_row[v]) for every real vertex v;
//! the row is owned by the calling worker, so the CSR itself stays immutable.

use crate::{Csr, DijkstraHeap, Node, Weight, MAX_DISTANCE, NO_VERTEX};

/// Classical Dijkstra with an indexed heap: every vertex is seeded at
/// MAX_DISTANCE (the source at 0) and settled by extract-min. Unreachable
/// vertices keep MAX_DISTANCE and, when parents are tracked, NO_VERTEX.
pub fn dijkstra(
    csr: &Csr,
    source: Node,
    super_row: Option<&[Weight]>,
    dist: &mut [Weight],
    visited: &mut [bool],
    mut parent: Option<&mut [Node]>,
) {
    let n = csr.n();
    let nv = n + super_row.is_some() as usize;
    assert!(source < nv, "source out of range");
    if let Some(row) = super_row {
        assert_eq!(row.len(), n, "super-source row length");
    }
    assert!(dist.len() >= nv && visited.len() >= nv);

    for v in 0..nv {
        dist[v] = MAX_DISTANCE;
        visited[v] = false;
    }
    if let Some(p) = parent.as_deref_mut() {
        assert!(p.len() >= nv);
        for v in 0..nv {
            p[v] = NO_VERTEX;
        }
    }
    dist[source] = 0;

    let mut heap = DijkstraHeap::new(nv);
    for v in 0..nv {
        heap.insert(v, dist[v]);
    }

    while let Some((u, du)) = heap.extract_min() {
        visited[u] = true;
        if u < n {
            for &(v, w) in csr.neighbors(u) {
                let dv = du.saturating_add(w);
                if !visited[v] && dv < dist[v] {
                    dist[v] = dv;
                    heap.decrease_key(v, dv);
                    if let Some(p) = parent.as_deref_mut() {
                        p[v] = u;
                    }
                }
            }
        } else if let Some(row) = super_row {
            for (v, &w) in row.iter().enumerate() {
                let dv = du.saturating_add(w);
                if !visited[v] && dv < dist[v] {
                    dist[v] = dv;
                    heap.decrease_key(v, dv);
                    if let Some(p) = parent.as_deref_mut() {
                        p[v] = u;
                    }
                }
            }
        }
    }
}
