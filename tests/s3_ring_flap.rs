//! S3 — ring of 4 routers survives a single link flap (`SPEC_FULL.md` §8).
//!
//! A severed link is treated as an immediate topology change rather than a
//! HELLO-driven hold-timer expiry (see `Router::handle_neighbor_lost`), so
//! every FIB entry that depended on the severed neighbor is either
//! recomputed onto a surviving path or evicted — it is never left dangling
//! on a next hop that no longer exists.
//!
//! `spec.md`'s literal "+1 hop" expectation for R1/R2's rerouted prefixes is
//! graph-theoretically unsatisfiable for a true 4-cycle missing one edge
//! (the only surviving path is the long way around, +2 hops, not +1), so
//! that exact clause is not asserted here. Full reachability is asserted
//! instead: once R4's own best path to R2's prefix moves off R1 and onto
//! R3, split horizon no longer blocks R4 from re-advertising that prefix to
//! R1, so R1 recovers a legal path around the ring with no lasting
//! deadlock.

use adup_sim::prelude::*;
use adup_sim::types::NodeId;

#[test]
fn ring_four_survives_one_link_failure() {
    let mut sim = Simulation::new(4, TopologyKind::Ring, Config::default())
        .expect("4-node ring topology is always valid");
    sim.run(40.0);

    let r1 = NodeId::new("R1");
    let r2 = NodeId::new("R2");
    let link = sim
        .find_link(&r1, &r2)
        .expect("R1 and R2 are directly connected in a ring");
    sim.sever_link(link).expect("link exists");

    sim.run(90.0);

    // The severed neighbor relationship is gone on both sides.
    assert!(!sim.router(&r1).unwrap().neighbor_table.contains_key(&r2));
    assert!(!sim.router(&r2).unwrap().neighbor_table.contains_key(&r1));

    for (id, router) in sim.routers() {
        for (prefix, entry) in router.fib.iter() {
            // No self-loop (testable property 1).
            assert_ne!(entry.next_hop, NextHop::Node(id.clone()));

            // Cost bound (testable property 3).
            assert!(
                entry.total_cost <= 80.0,
                "{id}: cost for {prefix} exceeds the hard ceiling after reroute: {}",
                entry.total_cost
            );

            // No dangling next hop: every learned route's next hop must
            // still be a live neighbor. A severed link must never leave a
            // FIB entry pointing at a neighbor that no longer exists.
            if let NextHop::Node(next_hop) = &entry.next_hop {
                assert!(
                    router.neighbor_table.contains_key(next_hop),
                    "{id}: FIB for {prefix} points at {next_hop}, which is not a live neighbor"
                );
            }
        }
    }

    // Neither endpoint of the severed link can still be routing through the
    // other directly.
    let r1_router = sim.router(&r1).unwrap();
    let r2_router = sim.router(&r2).unwrap();
    assert!(r1_router
        .fib
        .values()
        .all(|e| e.next_hop != NextHop::Node(r2.clone())));
    assert!(r2_router
        .fib
        .values()
        .all(|e| e.next_hop != NextHop::Node(r1.clone())));

    // Full reachability still holds: once R4 reroutes its own path to R2's
    // prefix onto R3 (no longer via R1), split horizon no longer blocks R4
    // from re-advertising that prefix back to R1, so R1 recovers a legal
    // 3-hop path around the ring. Every router ends up with all 4 prefixes.
    for (id, router) in sim.routers() {
        assert_eq!(
            router.fib.len(),
            4,
            "{id}: expected all 4 prefixes reachable after rerouting around the severed link, found {}",
            router.fib.len()
        );
    }
}
