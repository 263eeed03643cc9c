//! steiner-el: exact Steiner trees in undirected edge-weighted graphs.
//! Erickson-Monma-Veinott subset dynamic program; the exponential part is
//! confined to the number of terminal vertices. Subsets of equal cardinality
//! are independent and sharded across worker threads.

pub mod csr;
pub mod dijkstra;
pub mod emv;
#[cfg(feature = "fib-heap")]
pub mod fib_heap;
pub mod graph;
pub mod heap;

pub type Node = usize;
pub type Weight = u64;
/// Terminal-subset bitmask; bit t selects the t-th terminal.
pub type Mask = usize;

/// Infinity sentinel for distances and DP cells. Additions saturate, so no
/// sum ever crosses it.
pub const MAX_DISTANCE: Weight = Weight::MAX;
/// Sentinel for an unset vertex in parent arrays and back-pointer slots.
pub const NO_VERTEX: Node = Node::MAX;

pub const MAX_K: usize = 32;
pub const MAX_THREADS: usize = 128;

#[cfg(not(feature = "fib-heap"))]
pub use heap::IndexedHeap as DijkstraHeap;

#[cfg(feature = "fib-heap")]
pub use fib_heap::FibHeap as DijkstraHeap;

pub use csr::Csr;
pub use emv::{erickson_monma_veinott, SteinerResult};
pub use graph::{load_stp, Graph};

/// Contiguous work ranges for up to `parts` workers; the last range absorbs
/// the remainder. Empty ranges are never returned.
pub(crate) fn chunk_ranges(len: usize, parts: usize) -> Vec<std::ops::Range<usize>> {
    let parts = parts.clamp(1, len.max(1));
    let block = len / parts;
    let mut out = Vec::with_capacity(parts);
    for t in 0..parts {
        let start = t * block;
        let stop = if t == parts - 1 { len } else { start + block };
        if start < stop {
            out.push(start..stop);
        }
    }
    out
}
