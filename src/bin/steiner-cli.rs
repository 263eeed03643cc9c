use std::env;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::time::Instant;

use anyhow::{bail, Context, Result};
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::Serialize;

use steiner_el::dijkstra::dijkstra;
use steiner_el::emv::{dp_table_bytes, erickson_monma_veinott};
use steiner_el::{Csr, MAX_DISTANCE, MAX_THREADS};

#[derive(Debug, Clone, Copy, PartialEq)]
enum Command {
    Nop,
    Dijkstra,
    Erickson,
}

#[derive(Serialize)]
struct RunSummary {
    n: usize,
    m: usize,
    k: usize,
    threads: usize,
    /// None when the terminals are not connected.
    cost: Option<u64>,
    tree_edges: Option<usize>,
    time_ms: f64,
}

struct Args {
    cmd: Command,
    input: Option<String>,
    seed: u64,
    threads: usize,
    list: bool,
    json: bool,
}

fn usage(prog: &str) {
    println!(
        "usage: {prog} -in <input graph> <arguments>\n\
         \n\
         arguments :\n\
         \t-seed : seed value\n\
         \t-el : Erickson-Monma-Veinott algorithm\n\
         \t-dijkstra : Dijkstra single source shortest path\n\
         \t-list : output Steiner tree\n\
         \t-json : machine-readable summary row\n\
         \t-threads : worker count\n"
    );
}

// Minimal flag walk, no clap; unknown arguments are ignored.
fn parse_args() -> Result<Option<Args>> {
    let default_threads = std::thread::available_parallelism()
        .map(|p| p.get())
        .unwrap_or(1)
        .min(MAX_THREADS);
    let mut args = Args {
        cmd: Command::Nop,
        input: None,
        seed: 123_456_789,
        threads: default_threads,
        list: false,
        json: false,
    };
    let mut it = env::args().skip(1);
    while let Some(a) = it.next() {
        match a.as_str() {
            "-dijkstra" => args.cmd = Command::Dijkstra,
            "-el" | "-erickson" => args.cmd = Command::Erickson,
            "-list" => args.list = true,
            "-json" => args.json = true,
            "-in" => {
                let v = it.next().context("file name missing from command line")?;
                args.input = Some(v);
            }
            "-seed" => {
                let v = it.next().context("random seed missing from command line")?;
                args.seed = v.parse().context("malformed random seed")?;
            }
            "-threads" => {
                let v = it.next().context("thread count missing from command line")?;
                let t: usize = v.parse().context("malformed thread count")?;
                if t < 1 || t > MAX_THREADS {
                    bail!("thread count out of range 1..={MAX_THREADS}");
                }
                args.threads = t;
            }
            "-h" | "-help" => {
                usage(&env::args().next().unwrap_or_else(|| "steiner-cli".into()));
                return Ok(None);
            }
            _ => {}
        }
    }
    Ok(Some(args))
}

fn ms(t: Instant) -> f64 {
    t.elapsed().as_secs_f64() * 1e3
}

fn hostname() -> String {
    env::var("HOSTNAME")
        .ok()
        .filter(|h| !h.is_empty())
        .or_else(|| {
            std::fs::read_to_string("/etc/hostname")
                .ok()
                .map(|h| h.trim().to_string())
        })
        .unwrap_or_else(|| "unknown".to_string())
}

fn main() -> Result<()> {
    let total = Instant::now();
    println!(
        "invoked as: {}",
        env::args().collect::<Vec<_>>().join(" ")
    );
    let Some(args) = parse_args()? else {
        return Ok(());
    };

    let reader: Box<dyn BufRead> = match &args.input {
        Some(path) => Box::new(BufReader::new(
            File::open(path).with_context(|| format!("unable to open file '{path}'"))?,
        )),
        None => {
            println!("no input file specified, defaulting to stdin");
            Box::new(BufReader::new(io::stdin()))
        }
    };
    println!("random seed = {}", args.seed);

    let t_load = Instant::now();
    let g = steiner_el::load_stp(reader)?;
    println!(
        "input: n = {}, m = {}, k = {}, cost = {} [{:.2} ms]",
        g.n,
        g.m(),
        g.k(),
        g.cost_hint.map_or(-1i64, |c| c as i64),
        ms(t_load)
    );
    let terms: Vec<String> = g.terminals.iter().map(|t| (t + 1).to_string()).collect();
    println!("terminals: {}", terms.join(" "));

    let t_build = Instant::now();
    let csr = Csr::build(&g, args.threads);
    println!("root build: done. [{:.2} ms]", ms(t_build));

    match args.cmd {
        Command::Nop => {}
        Command::Dijkstra => {
            let mut rng = StdRng::seed_from_u64(args.seed);
            let source = rng.gen_range(0..g.n);
            let mut dist = vec![0; g.n];
            let mut visited = vec![false; g.n];
            let t_run = Instant::now();
            dijkstra(&csr, source, None, &mut dist, &mut visited, None);
            let reached = dist.iter().filter(|&&d| d < MAX_DISTANCE).count();
            println!(
                "dijkstra: [source: {}] done. [{:.2} ms] [reached: {}]",
                source + 1,
                ms(t_run),
                reached
            );
        }
        Command::Erickson => {
            match dp_table_bytes(g.n, g.k(), args.list) {
                Some(bytes) if bytes <= usize::MAX as u64 => {}
                _ => bail!(
                    "DP tables for n = {}, k = {} are not addressable",
                    g.n,
                    g.k()
                ),
            }
            let t_run = Instant::now();
            let result = erickson_monma_veinott(&csr, &g.terminals, args.threads, args.list);
            let kernel_ms = ms(t_run);
            let cost_str = if result.cost == MAX_DISTANCE {
                "inf".to_string()
            } else {
                result.cost.to_string()
            };
            println!(
                "erickson: [kernel: {kernel_ms:.2} ms] done. [{:.2} ms] [cost: {cost_str}]",
                ms(t_run)
            );

            if let Some(hint) = g.cost_hint {
                if result.cost != hint {
                    bail!("cost mismatch: input claims {hint}, computed {cost_str}");
                }
            }
            if args.list {
                match &result.edges {
                    Some(edges) => {
                        let list: Vec<String> = edges
                            .iter()
                            .map(|&(u, v)| format!("{} {}", u + 1, v + 1))
                            .collect();
                        println!("solution: {}", serde_json::to_string(&list)?);
                    }
                    None => eprintln!("terminals are not connected; no solution to list"),
                }
            }
            if args.json {
                let summary = RunSummary {
                    n: g.n,
                    m: g.m(),
                    k: g.k(),
                    threads: args.threads,
                    cost: (result.cost < MAX_DISTANCE).then_some(result.cost),
                    tree_edges: result.edges.as_ref().map(|e| e.len()),
                    time_ms: kernel_ms,
                };
                println!("{}", serde_json::to_string(&summary)?);
            }
        }
    }

    println!("grand total [{:.2} ms]", ms(total));
    println!("host: {}", hostname());
    println!(
        "build: edge-linear kernel, {}, {}",
        if args.threads > 1 {
            "multi-threaded"
        } else {
            "single thread"
        },
        if cfg!(feature = "fib-heap") {
            "Fibonacci heap"
        } else {
            "binary heap"
        }
    );
    println!("list solution: {}", args.list);
    println!("num threads: {}", args.threads);
    println!("compiler: {}", env!("STEINER_RUSTC_VERSION"));
    Ok(())
}
