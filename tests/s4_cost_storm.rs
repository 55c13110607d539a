//! S4 — cost storm suppression (`SPEC_FULL.md` §8, §4.4.4).
//!
//! A synthetic UPDATE storm of reported costs 10, 25, 90 for one prefix:
//! the third value passes the absolute ceiling (100) but trips the
//! rapid-increase cap (90 > 2*25), so it is replaced by `min(25*1.5, 80) =
//! 37.5`.

use approx::assert_abs_diff_eq;

use adup_sim::config::Config;
use adup_sim::packet::RouteEntry;
use adup_sim::router::Router;
use adup_sim::types::{vtime, NodeId, PrefixId};

#[test]
fn rapid_increase_cap_fires_on_third_update() {
    let cfg = Config::default();
    let mut r2 = Router::new(
        NodeId::new("R2"),
        vec!["eth0".to_string()],
        vec![PrefixId::new("192.168.2.0/24")],
    );
    let prefix_x = PrefixId::new("10.0.0.0/24");
    let r1 = NodeId::new("R1");

    // R1 must be a known neighbor before its UPDATEs are admitted (§4.4.4
    // step 1, unknown neighbor guard).
    r2.handle_hello(
        vtime(0.0),
        r1.clone(),
        adup_sim::metrics::LinkMetrics::baseline(),
        &cfg,
    );

    r2.handle_update(
        vtime(1.0),
        r1.clone(),
        &[RouteEntry {
            prefix: prefix_x.clone(),
            total_cost: 10.0,
        }],
        &cfg,
    );
    assert_eq!(
        r2.topology_table.get(&prefix_x).and_then(|m| m.get(&r1)).copied(),
        Some(10.0)
    );

    r2.handle_update(
        vtime(2.0),
        r1.clone(),
        &[RouteEntry {
            prefix: prefix_x.clone(),
            total_cost: 25.0,
        }],
        &cfg,
    );
    assert_eq!(
        r2.topology_table.get(&prefix_x).and_then(|m| m.get(&r1)).copied(),
        Some(25.0)
    );

    r2.handle_update(
        vtime(3.0),
        r1.clone(),
        &[RouteEntry {
            prefix: prefix_x.clone(),
            total_cost: 90.0,
        }],
        &cfg,
    );
    let after_storm = r2
        .topology_table
        .get(&prefix_x)
        .and_then(|m| m.get(&r1))
        .copied()
        .expect("prefix X is still known after the storm");
    assert_abs_diff_eq!(after_storm, 37.5, epsilon = 1e-9);
}

#[test]
fn absolute_ceiling_drops_entries_above_one_hundred() {
    let cfg = Config::default();
    let mut r2 = Router::new(
        NodeId::new("R2"),
        vec!["eth0".to_string()],
        vec![PrefixId::new("192.168.2.0/24")],
    );
    let prefix_x = PrefixId::new("10.0.0.0/24");
    let r1 = NodeId::new("R1");
    r2.handle_hello(
        vtime(0.0),
        r1.clone(),
        adup_sim::metrics::LinkMetrics::baseline(),
        &cfg,
    );

    r2.handle_update(
        vtime(1.0),
        r1.clone(),
        &[RouteEntry {
            prefix: prefix_x.clone(),
            total_cost: 150.0,
        }],
        &cfg,
    );
    assert!(r2.topology_table.get(&prefix_x).is_none());
}
