//! The simulation façade (§4.6 of `SPEC_FULL.md`).
//!
//! Owns the [`Kernel`], the router and link registries, the single seeded
//! PRNG, and the process [`Config`]. This is the only place that ties
//! [`KernelEvent`] variants to concrete [`Router`]/[`Link`] method calls —
//! neither of those types knows the other exists.

use std::collections::BTreeMap;

use log::{error, info};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::builder::{self, BuiltTopology, TopologyKind};
use crate::config::Config;
use crate::error::SimError;
use crate::event::KernelEvent;
use crate::kernel::Kernel;
use crate::link::Link;
use crate::metrics::LinkMetrics;
use crate::packet::Packet;
use crate::router::Router;
use crate::snapshot::Snapshot;
use crate::types::{vtime, LinkId, NodeId, PrefixId};

/// Owns everything needed to run one simulation: the event kernel, the
/// router/link arenas, the seeded PRNG, and the tunable configuration.
#[derive(Debug)]
pub struct Simulation {
    kernel: Kernel,
    routers: BTreeMap<NodeId, Router>,
    links: BTreeMap<LinkId, Link>,
    rng: StdRng,
    config: Config,
    running: bool,
}

impl Simulation {
    /// Build a simulation over a fresh topology of `node_count` routers
    /// shaped by `kind`, using `config`. The seeded PRNG is the single
    /// source of randomness for this simulation's whole lifetime (§9),
    /// including the custom topology builder itself.
    pub fn new(node_count: usize, kind: TopologyKind, config: Config) -> Result<Self, SimError> {
        let mut rng = StdRng::seed_from_u64(config.rng_seed);
        let BuiltTopology { routers, links } = builder::build(node_count, kind, &mut rng)?;

        let mut sim = Self {
            kernel: Kernel::new(),
            routers,
            links,
            rng,
            config,
            running: false,
        };
        sim.schedule_initial_processes();
        Ok(sim)
    }

    fn schedule_initial_processes(&mut self) {
        let router_ids: Vec<NodeId> = self.routers.keys().cloned().collect();
        for id in router_ids {
            let hello_start = self.rng.gen_range(0.5..2.0);
            self.kernel
                .schedule_after(hello_start, KernelEvent::HelloTimer { router: id.clone() });

            let advertise_start = self.rng.gen_range(1.0..3.0);
            self.kernel.schedule_after(
                advertise_start,
                KernelEvent::InitialAdvertiseTimer { router: id.clone() },
            );

            let mutate_start = self.rng.gen_range(20.0..40.0);
            self.kernel.schedule_after(
                mutate_start,
                KernelEvent::MetricMutateTimer { router: id.clone() },
            );

            self.kernel.schedule_after(
                self.config.reset_period,
                KernelEvent::CostMonitorTimer { router: id.clone() },
            );
            self.kernel.schedule_after(
                self.config.decay_period,
                KernelEvent::CostDecayTimer { router: id.clone() },
            );
        }
    }

    /// The simulation clock.
    pub fn now(&self) -> f64 {
        self.kernel.now().into_inner()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Direct, read-only access to one router, for introspection and tests
    /// that need more than [`Self::snapshot`]'s bounded log tails expose.
    pub fn router(&self, id: &NodeId) -> Option<&Router> {
        self.routers.get(id)
    }

    /// Iterate over every router in the registry.
    pub fn routers(&self) -> impl Iterator<Item = (&NodeId, &Router)> {
        self.routers.iter()
    }

    /// Run the simulation until virtual time `until` (§4.1's `run(until)`).
    pub fn run(&mut self, until: f64) {
        self.running = true;
        let until = vtime(until);
        while self.running {
            let Some(event) = self.kernel.pop_due(until) else {
                break;
            };
            self.dispatch(event);
        }
        self.running = false;
    }

    /// Discard the kernel and all processes (§4.1, §5 stop semantics).
    pub fn stop(&mut self) {
        self.running = false;
    }

    /// Discard the kernel and registries entirely (§4.6's `reset()`).
    pub fn reset(&mut self, node_count: usize, kind: TopologyKind) -> Result<(), SimError> {
        let mut rng = StdRng::seed_from_u64(self.config.rng_seed);
        let BuiltTopology { routers, links } = builder::build(node_count, kind, &mut rng)?;
        self.kernel = Kernel::new();
        self.routers = routers;
        self.links = links;
        self.rng = rng;
        self.running = false;
        self.schedule_initial_processes();
        Ok(())
    }

    /// Sever an existing link, simulating a hard failure: the link is
    /// removed from the registry, both endpoints' interfaces are cleared,
    /// and each endpoint immediately reacts to losing that neighbor
    /// ([`Router::handle_neighbor_lost`]) rather than waiting out the
    /// lazy HELLO-triggered hold timer (§5) — a severed link is a topology
    /// change, not a missed HELLO. Any packets already in flight on it are
    /// lost.
    pub fn sever_link(&mut self, link_id: LinkId) -> Result<(), SimError> {
        let Some(link) = self.links.remove(&link_id) else {
            return Err(SimError::UnknownLink(
                NodeId::new("?"),
                NodeId::new("?"),
            ));
        };
        let (a, b) = link.endpoints();
        let (a, b) = (a.clone(), b.clone());
        for endpoint in [a.clone(), b.clone()] {
            if let Some(router) = self.routers.get_mut(&endpoint) {
                for iface in router.interfaces.iter_mut() {
                    if iface.link == Some(link_id) {
                        iface.link = None;
                    }
                }
            }
        }

        let now = self.kernel.now();
        for (endpoint, lost_neighbor) in [(a.clone(), b.clone()), (b, a)] {
            let changed = match self.routers.get_mut(&endpoint) {
                Some(router) => router.handle_neighbor_lost(&lost_neighbor, now, &self.config),
                None => continue,
            };
            for prefix in changed {
                self.trigger_update(endpoint.clone(), Some(prefix));
            }
        }
        Ok(())
    }

    /// Look up the link between two routers, if one exists and is live.
    pub fn find_link(&self, a: &NodeId, b: &NodeId) -> Option<LinkId> {
        self.links.iter().find_map(|(id, l)| {
            let (x, y) = l.endpoints();
            if (x == a && y == b) || (x == b && y == a) {
                Some(*id)
            } else {
                None
            }
        })
    }

    /// A deep, read-only view of the current state (§4.6).
    pub fn snapshot(&self) -> Snapshot {
        Snapshot::capture(self.now(), &self.routers, &self.links, &self.config)
    }

    fn dispatch(&mut self, event: KernelEvent) {
        match event {
            KernelEvent::Deliver { link, from, .. } => self.dispatch_deliver(link, from),
            KernelEvent::HelloTimer { router } => self.dispatch_hello_timer(router),
            KernelEvent::InitialAdvertiseTimer { router } => self.dispatch_initial_advertise(router),
            KernelEvent::MetricMutateTimer { router } => self.dispatch_metric_mutate(router),
            KernelEvent::CostMonitorTimer { router } => self.dispatch_cost_monitor(router),
            KernelEvent::CostDecayTimer { router } => self.dispatch_cost_decay(router),
            KernelEvent::TriggerUpdate { router, prefix } => self.do_broadcast_update(router, prefix),
        }
    }

    fn dispatch_deliver(&mut self, link_id: LinkId, _from: NodeId) {
        let now = self.kernel.now();
        let Some(link) = self.links.get_mut(&link_id) else {
            error!("deliver on unknown link {link_id:?}");
            return;
        };
        let Some((sender, packet)) = link.drain_one() else {
            return;
        };
        let dest = link.other_end(&sender).clone();
        let Some(router) = self.routers.get_mut(&dest) else {
            error!("deliver to unknown router {dest}");
            return;
        };

        match packet {
            Packet::Hello { metrics } => {
                router.handle_hello(now, sender, metrics, &self.config);
            }
            Packet::Update { routes } => {
                router.log_update_received(now, sender.clone(), &routes);
                let changed = router.handle_update(now, sender, &routes, &self.config);
                for prefix in changed {
                    self.trigger_update(dest.clone(), Some(prefix));
                }
            }
            Packet::Query { .. } => router.log_reserved_received(now, sender, "QUERY"),
            Packet::Reply { .. } => router.log_reserved_received(now, sender, "REPLY"),
            Packet::Ack { .. } => router.log_reserved_received(now, sender, "ACK"),
        }
    }

    fn live_interfaces_of(&self, router: &NodeId) -> Vec<(LinkId, NodeId)> {
        let Some(r) = self.routers.get(router) else {
            return Vec::new();
        };
        r.live_interfaces()
            .filter_map(|(_, link_id)| {
                self.links
                    .get(&link_id)
                    .map(|l| (link_id, l.other_end(router).clone()))
            })
            .collect()
    }

    /// Enqueue `packet` on `link` and schedule its one-scheduling-step
    /// delivery (§4.3: never delayed beyond one scheduling step).
    fn send_on_interface(&mut self, link_id: LinkId, from: NodeId, packet: Packet) {
        if let Some(link) = self.links.get_mut(&link_id) {
            link.enqueue(from.clone(), packet.clone());
            self.kernel.schedule_after(
                0.0,
                KernelEvent::Deliver {
                    link: link_id,
                    from,
                    packet,
                },
            );
        }
    }

    fn dispatch_hello_timer(&mut self, router_id: NodeId) {
        let now = self.kernel.now();
        let interfaces = self.live_interfaces_of(&router_id);
        for (link_id, neighbor) in interfaces {
            let metrics = LinkMetrics::sample_hello(now, &mut self.rng);
            if let Some(router) = self.routers.get_mut(&router_id) {
                router.log_hello_sent(now, neighbor.clone(), metrics, &self.config);
            }
            self.send_on_interface(link_id, router_id.clone(), Packet::Hello { metrics });
        }
        self.kernel.schedule_after(
            self.config.hello_interval,
            KernelEvent::HelloTimer { router: router_id },
        );
    }

    fn dispatch_initial_advertise(&mut self, router_id: NodeId) {
        if let Some(router) = self.routers.get_mut(&router_id) {
            router.mark_advertising();
            router.mark_active();
        }
        info!("{router_id}: initial advertisement");
        self.trigger_update(router_id, None);
    }

    fn dispatch_metric_mutate(&mut self, router_id: NodeId) {
        let now = self.kernel.now();
        if let Some(router) = self.routers.get_mut(&router_id) {
            router.mutate_neighbor_metrics(now, &mut self.rng);
        }
        let next = self.rng.gen_range(20.0..40.0);
        self.kernel
            .schedule_after(next, KernelEvent::MetricMutateTimer { router: router_id });
    }

    fn dispatch_cost_monitor(&mut self, router_id: NodeId) {
        let changed = self
            .routers
            .get_mut(&router_id)
            .map(|r| r.reset_sweep(&self.config))
            .unwrap_or(false);
        if changed {
            self.trigger_update(router_id.clone(), None);
        }
        self.kernel.schedule_after(
            self.config.reset_period,
            KernelEvent::CostMonitorTimer { router: router_id },
        );
    }

    fn dispatch_cost_decay(&mut self, router_id: NodeId) {
        let affected = self
            .routers
            .get_mut(&router_id)
            .map(|r| r.decay_sweep(&self.config))
            .unwrap_or_default();
        for prefix in affected {
            self.trigger_update(router_id.clone(), Some(prefix));
        }
        self.kernel.schedule_after(
            self.config.decay_period,
            KernelEvent::CostDecayTimer { router: router_id },
        );
    }

    /// §4.4.8: schedule a staggered broadcast UPDATE after a random delay in
    /// `[0.1, 0.5]`. `prefix = None` means "advertise all directly attached
    /// networks".
    fn trigger_update(&mut self, router: NodeId, prefix: Option<PrefixId>) {
        let delay = self.rng.gen_range(0.1..0.5);
        self.kernel
            .schedule_after(delay, KernelEvent::TriggerUpdate { router, prefix });
    }

    fn do_broadcast_update(&mut self, router_id: NodeId, prefix: Option<PrefixId>) {
        let now = self.kernel.now();
        let prefixes = match prefix {
            Some(p) => vec![p],
            None => self
                .routers
                .get_mut(&router_id)
                .map(|r| r.reinstall_self_routes())
                .unwrap_or_default(),
        };

        for prefix in prefixes {
            let Some(entry) = self
                .routers
                .get(&router_id)
                .and_then(|r| r.build_update_payload(&prefix, &self.config))
            else {
                continue;
            };

            let interfaces = self.live_interfaces_of(&router_id);
            for (link_id, neighbor) in interfaces {
                let blocked = self
                    .routers
                    .get(&router_id)
                    .map(|r| r.split_horizon_blocks(&prefix, &neighbor))
                    .unwrap_or(false);
                if blocked {
                    continue;
                }
                if let Some(router) = self.routers.get_mut(&router_id) {
                    router.log_update_sent(now, neighbor.clone(), &prefix, entry.total_cost);
                }
                self.send_on_interface(
                    link_id,
                    router_id.clone(),
                    Packet::Update {
                        routes: vec![entry.clone()],
                    },
                );
            }
        }
    }
}
