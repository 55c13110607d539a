//! The router protocol state machine (§4.4 of `SPEC_FULL.md`).

pub mod cost;

use std::collections::{BTreeMap, VecDeque};

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::RouterError;
use crate::metrics::LinkMetrics;
use crate::packet::RouteEntry;
use crate::types::{vtime, LinkId, NextHop, NodeId, PrefixId, RouteChangeKind, VirtualTime};

use cost::{CostHistory, LoopDetectionHistory};

const PACKET_LOG_CAPACITY: usize = 100;
const ROUTE_CHANGE_LOG_CAPACITY: usize = 50;

/// Observational protocol state (§4.4.10). Never regresses; does not gate
/// correctness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RouterState {
    Initializing,
    Advertising,
    Active,
}

/// One named interface slot. Holds a [`LinkId`], not the link itself
/// (§9: the router/link graph is cyclic; links live in the arena owned by
/// [`crate::simulation::Simulation`]).
#[derive(Debug, Clone)]
pub struct Interface {
    pub name: String,
    pub link: Option<LinkId>,
}

/// A single neighbor's most recently advertised metrics (§3, `NeighborTable`).
#[derive(Debug, Clone)]
pub struct NeighborEntry {
    pub metrics: LinkMetrics,
    pub last_seen: VirtualTime,
}

/// The installed best route for one prefix (§3, `FIBEntry`).
#[derive(Debug, Clone)]
pub struct FibEntry {
    pub next_hop: NextHop,
    pub total_cost: f64,
    pub stability: f64,
    pub congestion: f64,
    pub packet_loss: f64,
    pub selection_reason: SelectionReason,
}

// `SelectionReason` lives in `crate::types`; re-export it under `router` so
// callers can write `FibEntry { selection_reason: SelectionReason::... }`
// without an extra import.
pub use crate::types::SelectionReason;

/// Direction of a logged packet (§3, `PacketLog`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Sent,
    Received,
}

/// One entry in the bounded packet log (§3, `PacketLog`).
#[derive(Debug, Clone)]
pub struct PacketLogEntry {
    pub time: VirtualTime,
    pub router: NodeId,
    pub packet_type: &'static str,
    pub direction: Direction,
    pub neighbor: Option<NodeId>,
    pub details: String,
    pub composite_cost: Option<f64>,
    pub reason: Option<String>,
}

/// One entry in the bounded route-change log (§3, `RouteChangeLog`).
#[derive(Debug, Clone)]
pub struct RouteChangeEntry {
    pub time: VirtualTime,
    pub router: NodeId,
    pub prefix: PrefixId,
    pub old_next_hop: Option<NextHop>,
    pub new_next_hop: Option<NextHop>,
    pub info: String,
    pub classification: RouteChangeKind,
}

fn push_bounded<T>(deque: &mut VecDeque<T>, item: T, capacity: usize) {
    deque.push_back(item);
    while deque.len() > capacity {
        deque.pop_front();
    }
}

/// The protocol core. One instance per simulated router, owning its tables
/// and logs exclusively (§3, Ownership).
#[derive(Debug, Clone)]
pub struct Router {
    pub id: NodeId,
    pub interfaces: Vec<Interface>,
    pub directly_attached: Vec<PrefixId>,

    pub neighbor_table: BTreeMap<NodeId, NeighborEntry>,
    pub topology_table: BTreeMap<PrefixId, BTreeMap<NodeId, f64>>,
    pub fib: BTreeMap<PrefixId, FibEntry>,

    cost_history: BTreeMap<(PrefixId, NodeId), CostHistory>,
    loop_history: BTreeMap<(PrefixId, NodeId), LoopDetectionHistory>,
    path_usage: BTreeMap<(NodeId, PrefixId), u32>,

    pub packet_log: VecDeque<PacketLogEntry>,
    pub route_change_log: VecDeque<RouteChangeEntry>,

    pub state: RouterState,
    pub last_route_change: Option<VirtualTime>,
}

impl Router {
    /// Create a new router with the given interface names and directly
    /// attached prefixes. The FIB is seeded with `SELF` entries for each
    /// attached prefix at cost 0, per §3's lifecycle note.
    pub fn new(
        id: NodeId,
        interface_names: impl IntoIterator<Item = String>,
        directly_attached: Vec<PrefixId>,
    ) -> Self {
        let interfaces = interface_names
            .into_iter()
            .map(|name| Interface { name, link: None })
            .collect();
        let mut router = Self {
            id,
            interfaces,
            directly_attached,
            neighbor_table: BTreeMap::new(),
            topology_table: BTreeMap::new(),
            fib: BTreeMap::new(),
            cost_history: BTreeMap::new(),
            loop_history: BTreeMap::new(),
            path_usage: BTreeMap::new(),
            packet_log: VecDeque::new(),
            route_change_log: VecDeque::new(),
            state: RouterState::Initializing,
            last_route_change: None,
        };
        for prefix in router.directly_attached.clone() {
            router.install_self(&prefix);
        }
        router
    }

    fn install_self(&mut self, prefix: &PrefixId) {
        self.fib.insert(
            prefix.clone(),
            FibEntry {
                next_hop: NextHop::SelfRoute,
                total_cost: 0.0,
                stability: 100.0,
                congestion: 0.0,
                packet_loss: 0.0,
                selection_reason: SelectionReason::Optimal,
            },
        );
    }

    fn log_packet(
        &mut self,
        time: VirtualTime,
        packet_type: &'static str,
        direction: Direction,
        neighbor: Option<NodeId>,
        details: String,
        composite_cost: Option<f64>,
        reason: Option<String>,
    ) {
        push_bounded(
            &mut self.packet_log,
            PacketLogEntry {
                time,
                router: self.id.clone(),
                packet_type,
                direction,
                neighbor,
                details,
                composite_cost,
                reason,
            },
            PACKET_LOG_CAPACITY,
        );
    }

    fn log_route_change(
        &mut self,
        time: VirtualTime,
        prefix: PrefixId,
        old_next_hop: Option<NextHop>,
        new_next_hop: Option<NextHop>,
        info: String,
        classification: RouteChangeKind,
    ) {
        push_bounded(
            &mut self.route_change_log,
            RouteChangeEntry {
                time,
                router: self.id.clone(),
                prefix,
                old_next_hop,
                new_next_hop,
                info,
                classification,
            },
            ROUTE_CHANGE_LOG_CAPACITY,
        );
    }

    /// §4.4.3: handle an inbound HELLO from `from`.
    pub fn handle_hello(&mut self, now: VirtualTime, from: NodeId, metrics: LinkMetrics, cfg: &Config) {
        self.neighbor_table.insert(
            from.clone(),
            NeighborEntry {
                metrics,
                last_seen: now,
            },
        );
        self.log_packet(
            now,
            "HELLO",
            Direction::Received,
            Some(from.clone()),
            format!("delay={:.1}ms loss={:.3}%", metrics.delay_ms, metrics.packet_loss_pct),
            Some(metrics.composite_cost(&cfg.metric_weights)),
            None,
        );
        debug!("{}: HELLO from {} recorded", self.id, from);
        self.prune_neighbors(now, cfg);
    }

    /// §4.4.3 step 3: prune neighbors not heard from within `hold_time`.
    pub fn prune_neighbors(&mut self, now: VirtualTime, cfg: &Config) -> Vec<NodeId> {
        let dead: Vec<NodeId> = self
            .neighbor_table
            .iter()
            .filter(|(_, e)| now.into_inner() - e.last_seen.into_inner() > cfg.hold_time)
            .map(|(n, _)| n.clone())
            .collect();
        for name in &dead {
            debug!("{}: timing out neighbor {}", self.id, name);
            self.neighbor_table.remove(name);
        }
        dead
    }

    /// React to the immediate, explicit loss of a neighbor (e.g. a severed
    /// link), as distinct from the lazy hold-timer expiry of
    /// [`Self::prune_neighbors`].
    ///
    /// §4.4.3 is explicit that a HELLO never directly modifies the FIB, so
    /// `prune_neighbors` deliberately leaves stale FIB entries for
    /// [`Self::recompute_path`] to sort out whenever the next UPDATE
    /// arrives. An outright link failure is a different kind of event: it
    /// is not "processing a HELLO", it is the topology itself changing, and
    /// DUAL-style protocols react to losing a successor immediately rather
    /// than waiting on a timer. This method drops `neighbor` from every
    /// table, recomputes every prefix that referenced it, and evicts (with a
    /// `Lost` route-change entry) any prefix left with no remaining
    /// candidate. Returns the prefixes that need re-advertising.
    pub fn handle_neighbor_lost(
        &mut self,
        neighbor: &NodeId,
        now: VirtualTime,
        cfg: &Config,
    ) -> Vec<PrefixId> {
        self.neighbor_table.remove(neighbor);

        let mut affected = Vec::new();
        for (prefix, neighbors) in self.topology_table.iter_mut() {
            if neighbors.remove(neighbor).is_some() {
                affected.push(prefix.clone());
            }
        }

        let mut changed = Vec::new();
        for prefix in affected {
            let was_via_lost = self
                .fib
                .get(&prefix)
                .map(|e| e.next_hop == NextHop::Node(neighbor.clone()))
                .unwrap_or(false);

            if self.recompute_path(&prefix, now, cfg) {
                changed.push(prefix);
            } else if was_via_lost {
                let old = self.fib.remove(&prefix);
                warn!("{}: lost route to {} ({} had no alternate path)", self.id, prefix, neighbor);
                self.log_route_change(
                    now,
                    prefix.clone(),
                    old.map(|e| e.next_hop),
                    None,
                    format!("next hop {neighbor} lost and no alternate path remains"),
                    RouteChangeKind::Lost,
                );
                changed.push(prefix);
            }
        }
        changed
    }

    /// Composite link cost to a known neighbor (§4.4.2), or `None` if the
    /// neighbor is unknown.
    pub fn composite_cost_to(&self, neighbor: &NodeId, cfg: &Config) -> Option<f64> {
        self.neighbor_table
            .get(neighbor)
            .map(|e| e.metrics.composite_cost(&cfg.metric_weights))
    }

    fn link_stability_score(&self, neighbor: &NodeId, now: VirtualTime) -> f64 {
        let Some(entry) = self.neighbor_table.get(neighbor) else {
            return 0.0;
        };
        let elapsed = now.into_inner() - entry.last_seen.into_inner();
        if elapsed < 20.0 {
            100.0
        } else if elapsed < 40.0 {
            75.0
        } else if elapsed < 80.0 {
            50.0
        } else {
            25.0
        }
    }

    /// §4.4.4: ingress admission of one advertised route from neighbor `from`.
    /// Returns `Ok(true)` if the topology table changed and path selection
    /// should run, `Ok(false)` if nothing changed, `Err` if the entry was
    /// rejected (already logged at `debug`/`warn` level; never propagated
    /// further, per §7).
    fn admit_route(
        &mut self,
        from: &NodeId,
        entry: &RouteEntry,
        cfg: &Config,
    ) -> Result<bool, RouterError> {
        let prefix = &entry.prefix;

        if !self.neighbor_table.contains_key(from) {
            return Err(RouterError::UnknownNeighbor {
                neighbor: from.clone(),
                prefix: prefix.clone(),
            });
        }

        if let Some(fib_entry) = self.fib.get(prefix) {
            if fib_entry.next_hop == NextHop::Node(from.clone()) {
                return Err(RouterError::SplitHorizonRejection {
                    neighbor: from.clone(),
                    prefix: prefix.clone(),
                });
            }
        }

        if entry.total_cost > cfg.admission_ceiling {
            return Err(RouterError::ExcessiveCost {
                neighbor: from.clone(),
                prefix: prefix.clone(),
                cost: entry.total_cost,
            });
        }

        let mut reported_cost = entry.total_cost;
        if let Some(old) = self
            .topology_table
            .get(prefix)
            .and_then(|m| m.get(from))
            .copied()
        {
            reported_cost = match cost::cap_rapid_increase(old, reported_cost, cfg, prefix, from) {
                Ok(cost) => cost,
                Err(e @ RouterError::RapidIncrease { new, .. }) => {
                    warn!("{}: {e}", self.id);
                    new
                }
                Err(_) => unreachable!("cap_rapid_increase only returns RapidIncrease"),
            };
        }

        self.topology_table
            .entry(prefix.clone())
            .or_default()
            .insert(from.clone(), reported_cost);

        Ok(true)
    }

    /// §4.4.4: handle an inbound UPDATE from `from`. Returns the set of
    /// prefixes whose FIB changed, so the caller can schedule the staggered
    /// re-advertisement (§4.4.5, §4.4.8).
    pub fn handle_update(
        &mut self,
        now: VirtualTime,
        from: NodeId,
        routes: &[RouteEntry],
        cfg: &Config,
    ) -> Vec<PrefixId> {
        let mut changed = Vec::new();
        for route in routes {
            match self.admit_route(&from, route, cfg) {
                Ok(true) => {
                    if self.recompute_path(&route.prefix, now, cfg) {
                        changed.push(route.prefix.clone());
                    }
                }
                Ok(false) => {}
                Err(e) => debug!("{}: {e}", self.id),
            }
        }
        changed
    }

    /// §4.4.5: recompute the best path for `prefix`, installing it into the
    /// FIB if it differs meaningfully from the current entry. Returns `true`
    /// if the FIB was modified.
    pub fn recompute_path(&mut self, prefix: &PrefixId, now: VirtualTime, cfg: &Config) -> bool {
        let Some(candidates) = self.topology_table.get(prefix).cloned() else {
            return false;
        };

        let mut best: Option<(NodeId, cost::Candidate)> = None;

        for (neighbor, &reported_cost) in candidates.iter() {
            let Some(link_cost) = self.composite_cost_to(neighbor, cfg) else {
                continue;
            };
            let raw_total = link_cost + reported_cost;

            let loop_key = (prefix.clone(), neighbor.clone());
            let loop_hist = self.loop_history.entry(loop_key.clone()).or_default();
            loop_hist.record(now.into_inner(), raw_total);
            if let Err(e) = loop_hist.check(cfg, prefix, neighbor) {
                debug!("{}: {e}", self.id);
                continue;
            }

            let post_damp = cost::cap_and_damp(raw_total, cfg);
            let history = self.cost_history.entry(loop_key.clone()).or_default();
            let stabilized = cost::stabilize(history, post_damp, cfg);
            history.push(post_damp);

            let neighbor_metrics = self.neighbor_table.get(neighbor).map(|e| e.metrics);
            let Some(metrics) = neighbor_metrics else {
                continue;
            };
            let stability = self.link_stability_score(neighbor, now);
            let usage = self
                .path_usage
                .get(&(neighbor.clone(), prefix.clone()))
                .copied()
                .unwrap_or(0);
            let score = cost::selection_score(
                stabilized,
                stability,
                metrics.congestion_pct,
                metrics.packet_loss_pct,
                usage,
            );
            let reason =
                cost::selection_reason(stabilized, stability, metrics.congestion_pct, metrics.packet_loss_pct);

            let candidate = cost::Candidate {
                total_cost: stabilized,
                score,
                stability,
                congestion: metrics.congestion_pct,
                packet_loss: metrics.packet_loss_pct,
                selection_reason: reason,
            };

            if best.as_ref().map(|(_, b)| candidate.score < b.score).unwrap_or(true) {
                best = Some((neighbor.clone(), candidate));
            }
        }

        let Some((best_neighbor, candidate)) = best else {
            return false;
        };

        let current = self.fib.get(prefix);
        let current_next_hop = current.map(|e| e.next_hop.clone());
        let current_cost = current.map(|e| e.total_cost).unwrap_or(f64::INFINITY);
        let new_next_hop = NextHop::Node(best_neighbor.clone());

        if current_next_hop.as_ref() == Some(&new_next_hop)
            && (candidate.total_cost - current_cost).abs() <= 0.1
        {
            return false;
        }

        let classification = match &current_next_hop {
            None => RouteChangeKind::New,
            Some(prev) if prev == &new_next_hop => RouteChangeKind::Updated,
            Some(NextHop::SelfRoute) => RouteChangeKind::Better,
            Some(_) if candidate.total_cost < 50.0 => RouteChangeKind::Better,
            Some(_) => RouteChangeKind::SwitchedDueToFailure,
        };

        *self.path_usage.entry((best_neighbor.clone(), prefix.clone())).or_insert(0) += 1;

        self.log_route_change(
            now,
            prefix.clone(),
            current_next_hop.clone(),
            Some(new_next_hop.clone()),
            format!(
                "{} cost={:.2} stability={:.0} congestion={:.1}% loss={:.1}%",
                candidate.selection_reason,
                candidate.total_cost,
                candidate.stability,
                candidate.congestion,
                candidate.packet_loss
            ),
            classification,
        );

        self.fib.insert(
            prefix.clone(),
            FibEntry {
                next_hop: new_next_hop,
                total_cost: candidate.total_cost,
                stability: candidate.stability,
                congestion: candidate.congestion,
                packet_loss: candidate.packet_loss,
                selection_reason: candidate.selection_reason,
            },
        );
        self.last_route_change = Some(now);
        true
    }

    /// §4.4.8: (re)install `SELF` FIB entries for every directly attached
    /// network. Returns the affected prefixes so the caller can advertise
    /// them.
    pub fn reinstall_self_routes(&mut self) -> Vec<PrefixId> {
        let prefixes = self.directly_attached.clone();
        for prefix in &prefixes {
            self.install_self(prefix);
        }
        prefixes
    }

    /// First successful initial advertisement moves the router to `Advertising`
    /// then `Active` (§4.4.10).
    pub fn mark_advertising(&mut self) {
        self.state = RouterState::Advertising;
    }

    pub fn mark_active(&mut self) {
        self.state = RouterState::Active;
    }

    /// §4.4.8: build the UPDATE payload for `prefix`, or `None` if there is
    /// no route to advertise or its cost exceeds the suppression threshold.
    pub fn build_update_payload(&self, prefix: &PrefixId, cfg: &Config) -> Option<RouteEntry> {
        let entry = self.fib.get(prefix)?;
        if entry.total_cost > cfg.advertise_suppression_threshold {
            warn!(
                "{}: suppressing update for {} (cost {:.1} over threshold)",
                self.id, prefix, entry.total_cost
            );
            return None;
        }
        Some(RouteEntry {
            prefix: prefix.clone(),
            total_cost: entry.total_cost,
        })
    }

    /// §4.4.4 step 2 egress counterpart: true if `prefix`'s installed next
    /// hop is `neighbor`, in which case an outbound UPDATE toward that
    /// neighbor must omit the route entirely (split horizon, testable
    /// property #2 of `SPEC_FULL.md` §8).
    pub fn split_horizon_blocks(&self, prefix: &PrefixId, neighbor: &NodeId) -> bool {
        self.fib
            .get(prefix)
            .map(|e| e.next_hop == NextHop::Node(neighbor.clone()))
            .unwrap_or(false)
    }

    /// §4.4.9 decay sweep: halve the drift of learned costs every
    /// `decay_period`. Returns the prefixes that changed so the caller can
    /// re-advertise them.
    pub fn decay_sweep(&mut self, cfg: &Config) -> Vec<PrefixId> {
        let mut affected = Vec::new();
        for (prefix, entry) in self.fib.iter_mut() {
            if entry.next_hop.is_self() || entry.total_cost <= 10.0 {
                continue;
            }
            entry.total_cost *= cfg.decay_factor;
            affected.push(prefix.clone());
        }
        for prefix in &affected {
            if let Some(neighbors) = self.topology_table.get_mut(prefix) {
                for cost in neighbors.values_mut() {
                    if *cost > 10.0 {
                        *cost *= cfg.decay_factor;
                    }
                }
            }
        }
        if !affected.is_empty() {
            debug!("{}: applied cost decay to {} prefixes", self.id, affected.len());
        }
        affected
    }

    /// §4.4.9 reset sweep: evict any learned FIB/topology entry whose cost
    /// exceeds `reset_threshold`. Returns `true` if anything was evicted, in
    /// which case the caller must re-advertise `SELF` routes.
    pub fn reset_sweep(&mut self, cfg: &Config) -> bool {
        let to_remove: Vec<PrefixId> = self
            .fib
            .iter()
            .filter(|(_, e)| !e.next_hop.is_self() && e.total_cost > cfg.reset_threshold)
            .map(|(p, _)| p.clone())
            .collect();

        for prefix in &to_remove {
            warn!("{}: resetting high-cost route for {}", self.id, prefix);
            self.fib.remove(prefix);
            self.topology_table.remove(prefix);
        }

        if !to_remove.is_empty() {
            self.cost_history.clear();
        }

        !to_remove.is_empty()
    }

    /// §4.4.1: perturb every known neighbor's metrics (the dynamic metric
    /// mutator).
    pub fn mutate_neighbor_metrics(&mut self, now: VirtualTime, rng: &mut impl rand::Rng) {
        for entry in self.neighbor_table.values_mut() {
            entry.metrics.mutate(now, rng);
        }
    }

    /// A HELLO was sent; record it in the packet log (§4.4.1).
    pub fn log_hello_sent(&mut self, now: VirtualTime, neighbor: NodeId, metrics: LinkMetrics, cfg: &Config) {
        self.log_packet(
            now,
            "HELLO",
            Direction::Sent,
            Some(neighbor),
            format!("delay={:.1}ms loss={:.3}%", metrics.delay_ms, metrics.packet_loss_pct),
            Some(metrics.composite_cost(&cfg.metric_weights)),
            None,
        );
    }

    /// An UPDATE was sent; record it in the packet log (§4.4.8).
    pub fn log_update_sent(&mut self, now: VirtualTime, neighbor: NodeId, prefix: &PrefixId, cost: f64) {
        self.log_packet(
            now,
            "UPDATE",
            Direction::Sent,
            Some(neighbor),
            format!("{prefix} cost={cost:.2}"),
            Some(cost),
            None,
        );
    }

    /// An UPDATE was received; record it in the packet log (§4.4.4).
    pub fn log_update_received(&mut self, now: VirtualTime, neighbor: NodeId, routes: &[RouteEntry]) {
        self.log_packet(
            now,
            "UPDATE",
            Direction::Received,
            Some(neighbor),
            format!("{} route(s)", routes.len()),
            None,
            None,
        );
    }

    /// A reserved QUERY/REPLY/ACK packet was received; accepted and ignored
    /// without error, per §6.
    pub fn log_reserved_received(&mut self, now: VirtualTime, neighbor: NodeId, kind: &'static str) {
        self.log_packet(now, kind, Direction::Received, Some(neighbor), String::new(), None, None);
    }

    /// Interfaces that currently have a live link attached.
    pub fn live_interfaces(&self) -> impl Iterator<Item = (&str, LinkId)> {
        self.interfaces
            .iter()
            .filter_map(|i| i.link.map(|l| (i.name.as_str(), l)))
    }

    /// True if every prefix known to the network (passed in by the caller,
    /// which has global visibility for test purposes only) has a FIB entry.
    pub fn has_route_for_all(&self, prefixes: &[PrefixId]) -> bool {
        prefixes.iter().all(|p| self.fib.contains_key(p))
    }

    /// Virtual time at which the clock reads `t`, helper for callers that
    /// only have a raw `f64` (e.g. deserialized test fixtures).
    pub fn at(t: f64) -> VirtualTime {
        vtime(t)
    }
}
