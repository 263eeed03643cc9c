//! Edge-list graph and DIMACS STP loader.
//! Wire format is 1-based and lowercase; everything downstream is 0-based.

use std::io::BufRead;

use anyhow::{anyhow, bail, Context, Result};

use crate::{Node, Weight, MAX_K};

#[derive(Clone, Debug)]
pub struct Graph {
    pub n: usize,
    pub edges: Vec<(Node, Node, Weight)>,
    pub terminals: Vec<Node>,
    /// Known optimum from a `cost` line, cross-checked by the driver.
    pub cost_hint: Option<Weight>,
}

impl Graph {
    pub fn new(n: usize) -> Self {
        Graph {
            n,
            edges: Vec::new(),
            terminals: Vec::new(),
            cost_hint: None,
        }
    }

    pub fn m(&self) -> usize {
        self.edges.len()
    }

    pub fn k(&self) -> usize {
        self.terminals.len()
    }

    pub fn add_edge(&mut self, u: Node, v: Node, w: Weight) {
        assert!(u < self.n && v < self.n, "edge endpoint out of range");
        self.edges.push((u, v, w));
    }

    pub fn add_terminal(&mut self, u: Node) {
        assert!(u < self.n, "terminal out of range");
        self.terminals.push(u);
    }
}

fn field<T: std::str::FromStr>(
    tok: Option<&str>,
    what: &str,
    lineno: usize,
) -> Result<T> {
    tok.with_context(|| format!("line {lineno}: missing {what}"))?
        .parse()
        .map_err(|_| anyhow!("line {lineno}: malformed {what}"))
}

/// Parse DIMACS STP. Recognised sections: `comment` (ignored), `graph`
/// (`nodes`, `edges`, `e u v w` lines), `terminals` (`terminals`, `t u`
/// lines), `coordinates` (ignored). An optional `cost` line carries the
/// known optimum. Unrecognised lines are skipped.
pub fn load_stp<R: BufRead>(input: R) -> Result<Graph> {
    let mut n: usize = 0;
    let mut m_declared: Option<usize> = None;
    let mut k_declared: Option<usize> = None;
    let mut edges: Vec<(Node, Node, Weight)> = Vec::new();
    let mut terminals: Vec<Node> = Vec::new();
    let mut cost_hint: Option<Weight> = None;
    let mut in_section = false;
    let mut saw_graph = false;
    let mut saw_terminals = false;

    for (i, line) in input.lines().enumerate() {
        let lineno = i + 1;
        let line = line.with_context(|| format!("line {lineno}: read error"))?;
        let mut it = line.split_whitespace();
        let Some(tok) = it.next() else { continue };
        match tok {
            "section" => {
                if in_section {
                    bail!("line {lineno}: nested sections");
                }
                in_section = true;
                let name: String = field(it.next(), "section name", lineno)?;
                match name.as_str() {
                    "comment" | "coordinates" => {}
                    "graph" => saw_graph = true,
                    "terminals" => saw_terminals = true,
                    _ => bail!("line {lineno}: invalid section '{name}'"),
                }
            }
            "end" => {
                if !in_section {
                    bail!("line {lineno}: no section to end");
                }
                in_section = false;
            }
            "nodes" => {
                n = field(it.next(), "node count", lineno)?;
            }
            "edges" => {
                m_declared = Some(field(it.next(), "edge count", lineno)?);
            }
            "terminals" => {
                let k: usize = field(it.next(), "terminal count", lineno)?;
                if k > MAX_K {
                    bail!("line {lineno}: {k} terminals exceeds the limit of {MAX_K}");
                }
                k_declared = Some(k);
            }
            "e" => {
                let u: usize = field(it.next(), "edge endpoint", lineno)?;
                let v: usize = field(it.next(), "edge endpoint", lineno)?;
                let w: Weight = field(it.next(), "edge weight", lineno)?;
                if u < 1 || u > n || v < 1 || v > n {
                    bail!("line {lineno}: edge endpoint out of range 1..={n}");
                }
                edges.push((u - 1, v - 1, w));
            }
            "t" => {
                if k_declared.is_none() {
                    bail!("line {lineno}: terminal before the terminals count");
                }
                let u: usize = field(it.next(), "terminal id", lineno)?;
                if u < 1 || u > n {
                    bail!("line {lineno}: terminal out of range 1..={n}");
                }
                terminals.push(u - 1);
            }
            "cost" => {
                cost_hint = Some(field(it.next(), "cost", lineno)?);
            }
            // coordinates and end-of-file markers carry no graph data
            "dd" | "eof" => {}
            _ => {}
        }
    }

    if !saw_graph {
        bail!("missing section graph");
    }
    if !saw_terminals {
        bail!("missing section terminals");
    }
    if n == 0 {
        bail!("missing or zero node count");
    }
    match m_declared {
        Some(m) if m == edges.len() && m != 0 => {}
        Some(m) => bail!("edge count mismatch: declared {m}, read {}", edges.len()),
        None => bail!("missing edge count"),
    }
    match k_declared {
        Some(k) if k == terminals.len() && k != 0 => {}
        Some(k) => bail!(
            "terminal count mismatch: declared {k}, read {}",
            terminals.len()
        ),
        None => bail!("missing terminal count"),
    }

    let mut g = Graph::new(n);
    for (u, v, w) in edges {
        g.add_edge(u, v, w);
    }
    for u in terminals {
        g.add_terminal(u);
    }
    g.cost_hint = cost_hint;
    Ok(g)
}
