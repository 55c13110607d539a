//! Topology construction (§4.5 of `SPEC_FULL.md`).
//!
//! Grounded in `original_source/adup/simulation.py`'s five `create_*_topology`
//! methods; the wiring logic (interface counts, which interface gets which
//! link) follows that file almost mechanically. The custom builder's
//! spanning-tree-then-random-edges algorithm is reproduced with a seeded
//! [`rand::Rng`] rather than Python's `random` module, since only
//! within-this-crate seed reproducibility is required (§8, testable
//! property 8), not cross-language bit parity.

use std::collections::{BTreeMap, BTreeSet};

use rand::Rng;

use crate::error::SimError;
use crate::link::Link;
use crate::router::Router;
use crate::types::{LinkId, NodeId, PrefixId};

/// The shape of topology to build (§4.5).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TopologyKind {
    Linear,
    Ring,
    Star,
    /// Clique, capped at 6 nodes for tractability (§4.5).
    Mesh,
    /// Seeded spanning-tree-then-random-edges graph. `connection_factor` is
    /// clamped to `[0.1, 1.0]` and names the target edge density.
    Custom { connection_factor: f64 },
}

/// The wired output of [`build`]: routers and links ready to be handed to
/// [`crate::simulation::Simulation`].
#[derive(Debug)]
pub struct BuiltTopology {
    pub routers: BTreeMap<NodeId, Router>,
    pub links: BTreeMap<LinkId, Link>,
}

fn node_id(i: usize) -> NodeId {
    NodeId::new(format!("R{}", i + 1))
}

fn prefix_for(i: usize) -> PrefixId {
    PrefixId::new(format!("192.168.{}.0/24", i + 1))
}

fn router_with_interfaces(i: usize, interface_names: Vec<String>) -> Router {
    Router::new(node_id(i), interface_names, vec![prefix_for(i)])
}

fn set_interface(router: &mut Router, name: &str, link: LinkId) {
    let iface = router
        .interfaces
        .iter_mut()
        .find(|i| i.name == name)
        .unwrap_or_else(|| panic!("router {} has no interface {name}", router.id));
    iface.link = Some(link);
}

fn add_link(
    links: &mut BTreeMap<LinkId, Link>,
    a: NodeId,
    b: NodeId,
) -> LinkId {
    let id = LinkId(links.len());
    links.insert(id, Link::new(a, b));
    id
}

/// Build a fully wired topology, per §4.5.
///
/// `rng` is only consumed by [`TopologyKind::Custom`]; it is accepted
/// unconditionally so callers always thread the simulation's single seeded
/// PRNG through, rather than special-casing which topology kinds need
/// randomness (§9).
pub fn build(
    node_count: usize,
    kind: TopologyKind,
    rng: &mut impl Rng,
) -> Result<BuiltTopology, SimError> {
    if node_count < 2 {
        return Err(SimError::InvalidTopologyParams(format!(
            "node_count must be at least 2, got {node_count}"
        )));
    }
    match kind {
        TopologyKind::Linear => Ok(build_linear(node_count)),
        TopologyKind::Ring => Ok(build_ring(node_count)),
        TopologyKind::Star => Ok(build_star(node_count)),
        TopologyKind::Mesh => Ok(build_mesh(node_count)),
        TopologyKind::Custom { connection_factor } => {
            Ok(build_custom(node_count, connection_factor, rng))
        }
    }
}

fn build_linear(node_count: usize) -> BuiltTopology {
    let mut routers = BTreeMap::new();
    for i in 0..node_count {
        let names = if i == 0 || i == node_count - 1 {
            vec!["eth0".to_string()]
        } else {
            vec!["eth0".to_string(), "eth1".to_string()]
        };
        routers.insert(node_id(i), router_with_interfaces(i, names));
    }

    let mut links = BTreeMap::new();
    for i in 0..node_count - 1 {
        let link_id = add_link(&mut links, node_id(i), node_id(i + 1));
        let out_iface = if i == 0 { "eth0" } else { "eth1" };
        set_interface(routers.get_mut(&node_id(i)).unwrap(), out_iface, link_id);
        set_interface(routers.get_mut(&node_id(i + 1)).unwrap(), "eth0", link_id);
    }

    BuiltTopology { routers, links }
}

fn build_ring(node_count: usize) -> BuiltTopology {
    let mut routers = BTreeMap::new();
    for i in 0..node_count {
        routers.insert(
            node_id(i),
            router_with_interfaces(i, vec!["eth0".to_string(), "eth1".to_string()]),
        );
    }

    let mut links = BTreeMap::new();
    for i in 0..node_count {
        let j = (i + 1) % node_count;
        let link_id = add_link(&mut links, node_id(i), node_id(j));
        set_interface(routers.get_mut(&node_id(i)).unwrap(), "eth1", link_id);
        set_interface(routers.get_mut(&node_id(j)).unwrap(), "eth0", link_id);
    }

    BuiltTopology { routers, links }
}

fn build_star(node_count: usize) -> BuiltTopology {
    let mut routers = BTreeMap::new();
    let central_names: Vec<String> = (0..node_count - 1).map(|i| format!("eth{i}")).collect();
    routers.insert(node_id(0), router_with_interfaces(0, central_names));
    for i in 1..node_count {
        routers.insert(node_id(i), router_with_interfaces(i, vec!["eth0".to_string()]));
    }

    let mut links = BTreeMap::new();
    for i in 1..node_count {
        let link_id = add_link(&mut links, node_id(0), node_id(i));
        set_interface(routers.get_mut(&node_id(0)).unwrap(), &format!("eth{}", i - 1), link_id);
        set_interface(routers.get_mut(&node_id(i)).unwrap(), "eth0", link_id);
    }

    BuiltTopology { routers, links }
}

fn build_mesh(node_count: usize) -> BuiltTopology {
    let node_count = node_count.min(6);
    let mut routers = BTreeMap::new();
    for i in 0..node_count {
        let names: Vec<String> = (0..node_count - 1).map(|j| format!("eth{j}")).collect();
        routers.insert(node_id(i), router_with_interfaces(i, names));
    }

    let mut links = BTreeMap::new();
    let mut interface_counters: BTreeMap<NodeId, usize> =
        (0..node_count).map(|i| (node_id(i), 0)).collect();

    for i in 0..node_count {
        for j in (i + 1)..node_count {
            let link_id = add_link(&mut links, node_id(i), node_id(j));
            let ci = interface_counters[&node_id(i)];
            let cj = interface_counters[&node_id(j)];
            set_interface(routers.get_mut(&node_id(i)).unwrap(), &format!("eth{ci}"), link_id);
            set_interface(routers.get_mut(&node_id(j)).unwrap(), &format!("eth{cj}"), link_id);
            *interface_counters.get_mut(&node_id(i)).unwrap() += 1;
            *interface_counters.get_mut(&node_id(j)).unwrap() += 1;
        }
    }

    BuiltTopology { routers, links }
}

fn build_custom(node_count: usize, connection_factor: f64, rng: &mut impl Rng) -> BuiltTopology {
    // Unlike `Mesh` (§4.5, capped at 6 "for tractability"), the spec places
    // no upper bound on `Custom`'s node count, so none is imposed here.
    let connection_factor = connection_factor.clamp(0.1, 1.0);

    let max_possible_connections = node_count - 1;
    let mut routers = BTreeMap::new();
    for i in 0..node_count {
        let names: Vec<String> = (0..max_possible_connections).map(|j| format!("eth{j}")).collect();
        routers.insert(node_id(i), router_with_interfaces(i, names));
    }

    let total_possible_connections = node_count * (node_count - 1) / 2;
    let target_total_connections = ((total_possible_connections as f64) * connection_factor)
        .ceil() as usize;
    let target_total_connections = target_total_connections.max(node_count - 1);

    let mut links = BTreeMap::new();
    let mut interface_counters: BTreeMap<NodeId, usize> =
        (0..node_count).map(|i| (node_id(i), 0)).collect();
    let mut created_links: BTreeSet<(NodeId, NodeId)> = BTreeSet::new();

    let mut connect = |links: &mut BTreeMap<LinkId, Link>,
                        routers: &mut BTreeMap<NodeId, Router>,
                        interface_counters: &mut BTreeMap<NodeId, usize>,
                        created_links: &mut BTreeSet<(NodeId, NodeId)>,
                        a: NodeId,
                        b: NodeId| {
        let link_id = add_link(links, a.clone(), b.clone());
        let ca = interface_counters[&a];
        let cb = interface_counters[&b];
        set_interface(routers.get_mut(&a).unwrap(), &format!("eth{ca}"), link_id);
        set_interface(routers.get_mut(&b).unwrap(), &format!("eth{cb}"), link_id);
        *interface_counters.get_mut(&a).unwrap() += 1;
        *interface_counters.get_mut(&b).unwrap() += 1;
        let key = if a < b { (a, b) } else { (b, a) };
        created_links.insert(key);
    };

    // Step 1: spanning tree, connecting a random already-connected node to a
    // random not-yet-connected node until every node is reachable.
    let mut connected: Vec<NodeId> = vec![node_id(0)];
    let mut unconnected: Vec<NodeId> = (1..node_count).map(node_id).collect();

    while !unconnected.is_empty() {
        let from = connected[rng.gen_range(0..connected.len())].clone();
        let to_idx = rng.gen_range(0..unconnected.len());
        let to = unconnected.remove(to_idx);
        connect(
            &mut links,
            &mut routers,
            &mut interface_counters,
            &mut created_links,
            from,
            to.clone(),
        );
        connected.push(to);
    }

    // Step 2: top up to the target density with random additional edges.
    let all_nodes: Vec<NodeId> = (0..node_count).map(node_id).collect();
    let mut connections_created = created_links.len();
    while connections_created < target_total_connections {
        let mut placed = false;
        for _ in 0..100 {
            let a = all_nodes[rng.gen_range(0..all_nodes.len())].clone();
            let b = all_nodes[rng.gen_range(0..all_nodes.len())].clone();
            if a == b {
                continue;
            }
            if interface_counters[&a] >= max_possible_connections
                || interface_counters[&b] >= max_possible_connections
            {
                continue;
            }
            let key = if a < b { (a.clone(), b.clone()) } else { (b.clone(), a.clone()) };
            if created_links.contains(&key) {
                continue;
            }
            connect(&mut links, &mut routers, &mut interface_counters, &mut created_links, a, b);
            connections_created += 1;
            placed = true;
            break;
        }
        if !placed {
            break;
        }
    }

    BuiltTopology { routers, links }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn linear_end_routers_have_one_interface() {
        let t = build_linear(4);
        assert_eq!(t.routers[&node_id(0)].interfaces.len(), 1);
        assert_eq!(t.routers[&node_id(3)].interfaces.len(), 1);
        assert_eq!(t.routers[&node_id(1)].interfaces.len(), 2);
        assert_eq!(t.links.len(), 3);
    }

    #[test]
    fn ring_has_node_count_links() {
        let t = build_ring(5);
        assert_eq!(t.links.len(), 5);
    }

    #[test]
    fn star_central_has_n_minus_one_interfaces() {
        let t = build_star(5);
        assert_eq!(t.routers[&node_id(0)].interfaces.len(), 4);
        assert_eq!(t.links.len(), 4);
    }

    #[test]
    fn mesh_is_capped_at_six() {
        let t = build_mesh(10);
        assert_eq!(t.routers.len(), 6);
        assert_eq!(t.links.len(), 15);
    }

    #[test]
    fn custom_topology_is_connected() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(42);
        let t = build_custom(8, 0.3, &mut rng);
        assert!(t.links.len() >= 7);
        for router in t.routers.values() {
            assert!(router.interfaces.iter().any(|i| i.link.is_some()));
        }
    }

    #[test]
    fn custom_topology_is_seed_reproducible() {
        let mut rng1 = rand::rngs::StdRng::seed_from_u64(42);
        let mut rng2 = rand::rngs::StdRng::seed_from_u64(42);
        let a = build_custom(8, 0.3, &mut rng1);
        let b = build_custom(8, 0.3, &mut rng2);
        assert_eq!(a.links.len(), b.links.len());
        let endpoints = |t: &BuiltTopology| {
            let mut v: Vec<(NodeId, NodeId)> = t
                .links
                .values()
                .map(|l| {
                    let (x, y) = l.endpoints();
                    (x.clone(), y.clone())
                })
                .collect();
            v.sort();
            v
        };
        assert_eq!(endpoints(&a), endpoints(&b));
    }
}
