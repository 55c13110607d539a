//! Small CLI front-end over [`adup_sim::builder`], useful for eyeballing a
//! generated topology before wiring it into a full simulation run.
//!
//! ```text
//! generate-topology --kind custom --nodes 10 --density 0.3 --seed 42
//! ```

use adup_sim::config::Config;
use adup_sim::prelude::TopologyKind;
use adup_sim::{builder, types::NodeId};
use itertools::Itertools;
use rand::rngs::StdRng;
use rand::SeedableRng;

struct Args {
    kind: TopologyKind,
    node_count: usize,
    seed: u64,
}

fn parse_args() -> Args {
    let mut kind_name = "linear".to_string();
    let mut node_count = 5usize;
    let mut density = 0.3f64;
    let mut seed = 42u64;

    let mut args = std::env::args().skip(1);
    while let Some(flag) = args.next() {
        let Some(value) = args.next() else {
            eprintln!("missing value for {flag}");
            std::process::exit(2);
        };
        match flag.as_str() {
            "--kind" => kind_name = value,
            "--nodes" => node_count = value.parse().unwrap_or_else(|_| invalid("--nodes", &value)),
            "--density" => density = value.parse().unwrap_or_else(|_| invalid("--density", &value)),
            "--seed" => seed = value.parse().unwrap_or_else(|_| invalid("--seed", &value)),
            other => {
                eprintln!("unknown flag {other}");
                std::process::exit(2);
            }
        }
    }

    let kind = match kind_name.as_str() {
        "linear" => TopologyKind::Linear,
        "ring" => TopologyKind::Ring,
        "star" => TopologyKind::Star,
        "mesh" => TopologyKind::Mesh,
        "custom" => TopologyKind::Custom {
            connection_factor: density,
        },
        other => {
            eprintln!("unknown topology kind {other} (expected linear|ring|star|mesh|custom)");
            std::process::exit(2);
        }
    };

    Args {
        kind,
        node_count,
        seed,
    }
}

fn invalid(flag: &str, value: &str) -> ! {
    eprintln!("invalid value for {flag}: {value}");
    std::process::exit(2);
}

fn main() {
    env_logger::init();
    let args = parse_args();

    let mut cfg = Config::default();
    cfg.rng_seed = args.seed;
    let mut rng = StdRng::seed_from_u64(cfg.rng_seed);

    let topology = match builder::build(args.node_count, args.kind, &mut rng) {
        Ok(t) => t,
        Err(e) => {
            eprintln!("failed to build topology: {e}");
            std::process::exit(1);
        }
    };

    println!("{} routers, {} links", topology.routers.len(), topology.links.len());
    for (id, router) in &topology.routers {
        let neighbors: Vec<NodeId> = router
            .live_interfaces()
            .filter_map(|(_, link_id)| topology.links.get(&link_id))
            .map(|link| {
                let (a, b) = link.endpoints();
                if a == id {
                    b.clone()
                } else {
                    a.clone()
                }
            })
            .collect();
        println!(
            "  {id}: {}",
            neighbors.iter().map(|n| n.to_string()).join(", ")
        );
    }
}
