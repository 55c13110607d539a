//! S2 — split horizon on the linear 3-router topology (`SPEC_FULL.md` §8).
//!
//! At quiescence, inspect every UPDATE R2 sent toward R1 over the trailing
//! window of the packet log: none of them may carry a route whose FIB next
//! hop at R2 is R1 (testable property 2).

use adup_sim::prelude::*;
use adup_sim::router::Direction;
use adup_sim::types::NodeId;

#[test]
fn r2_never_advertises_a_route_back_through_r1() {
    let mut sim = Simulation::new(3, TopologyKind::Linear, Config::default())
        .expect("3-node linear topology is always valid");
    sim.run(30.0);

    let r1 = NodeId::new("R1");
    let r2 = sim.router(&NodeId::new("R2")).expect("R2 exists");

    let sent_to_r1_since_t20 = r2.packet_log.iter().filter(|entry| {
        entry.packet_type == "UPDATE"
            && entry.direction == Direction::Sent
            && entry.neighbor.as_ref() == Some(&r1)
            && entry.time.into_inner() >= 20.0
    });

    for entry in sent_to_r1_since_t20 {
        let prefix_r1 = adup_sim::types::PrefixId::new("192.168.1.0/24");
        assert!(
            !entry.details.contains(&prefix_r1.0),
            "R2 advertised R1's own prefix back to it: {entry:?}"
        );
        // The structural guarantee: whatever prefix this UPDATE carries, R2's
        // FIB for it must not currently forward through R1.
        for (prefix, fib_entry) in r2.fib.iter() {
            if fib_entry.next_hop == NextHop::Node(r1.clone()) {
                assert!(
                    !entry.details.contains(&prefix.0),
                    "R2 advertised {prefix} to R1 while forwarding {prefix} through R1"
                );
            }
        }
    }
}

#[test]
fn split_horizon_blocks_matches_installed_next_hop() {
    let mut sim = Simulation::new(3, TopologyKind::Linear, Config::default())
        .expect("3-node linear topology is always valid");
    sim.run(30.0);

    let r2 = sim.router(&NodeId::new("R2")).expect("R2 exists");
    let r1 = NodeId::new("R1");
    for (prefix, entry) in r2.fib.iter() {
        let expected_block = entry.next_hop == NextHop::Node(r1.clone());
        assert_eq!(r2.split_horizon_blocks(prefix, &r1), expected_block);
    }
}
