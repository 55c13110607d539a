//! Bidirectional router-to-router link (§4.3 of `SPEC_FULL.md`).

use crate::channel::Channel;
use crate::packet::Packet;
use crate::types::NodeId;

/// A logical link between exactly two routers. Links reference their
/// endpoints by [`NodeId`] rather than owning the routers (§9: routers and
/// links form a cyclic graph, so ownership lives in the arena — see
/// [`crate::simulation::Simulation`]).
#[derive(Debug, Clone)]
pub struct Link {
    a: NodeId,
    b: NodeId,
    /// Packets in flight, tagged with their sender, preserving per-direction
    /// FIFO order as required by §4.3 and §5.
    channel: Channel<(NodeId, Packet)>,
}

impl Link {
    /// Create a new link between `a` and `b`.
    pub fn new(a: NodeId, b: NodeId) -> Self {
        Self {
            a,
            b,
            channel: Channel::new(),
        }
    }

    /// The two endpoints of this link, in creation order.
    pub fn endpoints(&self) -> (&NodeId, &NodeId) {
        (&self.a, &self.b)
    }

    /// Given one endpoint, return the other. Panics if `from` is not an
    /// endpoint of this link — a programming error, since every caller
    /// looks the link up through one of its own interfaces.
    pub fn other_end(&self, from: &NodeId) -> &NodeId {
        if *from == self.a {
            &self.b
        } else if *from == self.b {
            &self.a
        } else {
            panic!("{from} is not an endpoint of this link");
        }
    }

    /// Enqueue a packet sent by `from`. Non-blocking (§4.2); the caller is
    /// responsible for scheduling the kernel event that will drain it (see
    /// `crate::simulation::Simulation::send_on_interface`).
    pub fn enqueue(&mut self, from: NodeId, packet: Packet) {
        self.channel.put((from, packet));
    }

    /// Drain the oldest in-flight packet, if any. Used by the kernel's
    /// `Deliver` dispatch once the one-scheduling-step hop has elapsed.
    pub fn drain_one(&mut self) -> Option<(NodeId, Packet)> {
        self.channel.try_get()
    }

    /// Number of packets currently in flight on this link, for snapshots.
    pub fn in_flight_len(&self) -> usize {
        self.channel.len()
    }
}
