//! S1 — linear 3-router convergence (`SPEC_FULL.md` §8).

use adup_sim::prelude::*;

#[test]
fn linear_three_routers_converge_by_t30() {
    let mut sim = Simulation::new(3, TopologyKind::Linear, Config::default())
        .expect("3-node linear topology is always valid");
    sim.run(30.0);

    let r1 = sim.router(&NodeId::new("R1")).expect("R1 exists");
    assert_eq!(r1.fib.len(), 3, "R1 should know all three prefixes: {:?}", r1.fib);

    let to_r3 = r1
        .fib
        .get(&adup_sim::types::PrefixId::new("192.168.3.0/24"))
        .expect("R1 has a route to R3's prefix");
    assert_eq!(to_r3.next_hop, NextHop::Node(NodeId::new("R2")));

    let to_r1 = r1
        .fib
        .get(&adup_sim::types::PrefixId::new("192.168.1.0/24"))
        .expect("R1 has a SELF route for its own prefix");
    assert!(to_r1.next_hop.is_self());
    assert_eq!(to_r1.total_cost, 0.0);

    for (router_id, router) in sim.routers() {
        for (prefix, entry) in router.fib.iter() {
            assert!(
                entry.total_cost <= 80.0,
                "{router_id}: cost for {prefix} exceeds the hard ceiling: {}",
                entry.total_cost
            );
        }
    }
}
