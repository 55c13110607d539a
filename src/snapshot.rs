//! Read-only, serializable views of simulation state (§4.6 of
//! `SPEC_FULL.md`), exported to external UI/dashboard collaborators.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::link::Link;
use crate::router::{Direction, FibEntry, NeighborEntry, Router, RouterState, SelectionReason};
use crate::types::{LinkId, NextHop, NodeId, PrefixId, RouteChangeKind};

/// Snapshot of one neighbor table entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NeighborSnapshot {
    pub neighbor: NodeId,
    pub last_seen: f64,
    pub delay_ms: f64,
    pub jitter_ms: f64,
    pub packet_loss_pct: f64,
    pub congestion_pct: f64,
    pub link_stability_pct: f64,
}

impl NeighborSnapshot {
    fn from_entry(neighbor: &NodeId, entry: &NeighborEntry) -> Self {
        Self {
            neighbor: neighbor.clone(),
            last_seen: entry.last_seen.into_inner(),
            delay_ms: entry.metrics.delay_ms,
            jitter_ms: entry.metrics.jitter_ms,
            packet_loss_pct: entry.metrics.packet_loss_pct,
            congestion_pct: entry.metrics.congestion_pct,
            link_stability_pct: entry.metrics.link_stability_pct,
        }
    }
}

/// Snapshot of one FIB entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FibSnapshot {
    pub prefix: PrefixId,
    pub next_hop: NextHop,
    pub total_cost: f64,
    pub stability: f64,
    pub congestion: f64,
    pub packet_loss: f64,
    pub selection_reason: SelectionReason,
}

impl FibSnapshot {
    fn from_entry(prefix: &PrefixId, entry: &FibEntry) -> Self {
        Self {
            prefix: prefix.clone(),
            next_hop: entry.next_hop.clone(),
            total_cost: entry.total_cost,
            stability: entry.stability,
            congestion: entry.congestion,
            packet_loss: entry.packet_loss,
            selection_reason: entry.selection_reason,
        }
    }
}

/// One tail entry of a router's packet log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PacketLogSnapshot {
    pub time: f64,
    pub packet_type: &'static str,
    pub direction: &'static str,
    pub neighbor: Option<NodeId>,
    pub details: String,
}

/// One tail entry of a router's route-change log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteChangeSnapshot {
    pub time: f64,
    pub prefix: PrefixId,
    pub old_next_hop: Option<NextHop>,
    pub new_next_hop: Option<NextHop>,
    pub info: String,
    pub classification: RouteChangeKind,
}

/// Deep, read-only view of one router (§4.6).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouterSnapshot {
    pub id: NodeId,
    pub state: RouterState,
    pub directly_attached: Vec<PrefixId>,
    pub neighbors: Vec<NeighborSnapshot>,
    pub fib: Vec<FibSnapshot>,
    pub packet_log_tail: Vec<PacketLogSnapshot>,
    pub route_change_log_tail: Vec<RouteChangeSnapshot>,
    pub last_route_change: Option<f64>,
    /// The virtual time since which this router's FIB has been unchanged,
    /// once that quiet period has lasted at least one `hello_interval`.
    /// Purely observational bookkeeping for UI collaborators, carried over
    /// from `original_source/adup/router.py`'s `convergence_start_time` /
    /// `is_converged` fields; it has no effect on FIB computation or any
    /// invariant in `SPEC_FULL.md` §8.
    pub quiescent_since: Option<f64>,
}

/// Deep, read-only view of one link (§4.6).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkSnapshot {
    pub id: LinkId,
    pub a: NodeId,
    pub b: NodeId,
    pub in_flight: usize,
}

/// A full, point-in-time view of the simulation, safe to serialize and ship
/// to an external collaborator (§4.6). Nothing in this type can mutate the
/// live simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub now: f64,
    pub routers: Vec<RouterSnapshot>,
    pub links: Vec<LinkSnapshot>,
}

const LOG_TAIL_LEN: usize = 20;

impl Snapshot {
    pub(crate) fn capture(
        now: f64,
        routers: &BTreeMap<NodeId, Router>,
        links: &BTreeMap<LinkId, Link>,
        config: &Config,
    ) -> Self {
        let routers = routers
            .values()
            .map(|r| RouterSnapshot {
                id: r.id.clone(),
                state: r.state,
                directly_attached: r.directly_attached.clone(),
                neighbors: r
                    .neighbor_table
                    .iter()
                    .map(|(n, e)| NeighborSnapshot::from_entry(n, e))
                    .collect(),
                fib: r
                    .fib
                    .iter()
                    .map(|(p, e)| FibSnapshot::from_entry(p, e))
                    .collect(),
                packet_log_tail: r
                    .packet_log
                    .iter()
                    .rev()
                    .take(LOG_TAIL_LEN)
                    .map(|e| PacketLogSnapshot {
                        time: e.time.into_inner(),
                        packet_type: e.packet_type,
                        direction: match e.direction {
                            Direction::Sent => "sent",
                            Direction::Received => "received",
                        },
                        neighbor: e.neighbor.clone(),
                        details: e.details.clone(),
                    })
                    .collect(),
                route_change_log_tail: r
                    .route_change_log
                    .iter()
                    .rev()
                    .take(LOG_TAIL_LEN)
                    .map(|e| RouteChangeSnapshot {
                        time: e.time.into_inner(),
                        prefix: e.prefix.clone(),
                        old_next_hop: e.old_next_hop.clone(),
                        new_next_hop: e.new_next_hop.clone(),
                        info: e.info.clone(),
                        classification: e.classification,
                    })
                    .collect(),
                last_route_change: r.last_route_change.map(|t| t.into_inner()),
                quiescent_since: r.last_route_change.and_then(|t| {
                    let since = t.into_inner();
                    (now - since >= config.hello_interval).then_some(since)
                }),
            })
            .collect();

        let links = links
            .iter()
            .map(|(id, l)| {
                let (a, b) = l.endpoints();
                LinkSnapshot {
                    id: *id,
                    a: a.clone(),
                    b: b.clone(),
                    in_flight: l.in_flight_len(),
                }
            })
            .collect();

        Self { now, routers, links }
    }
}
