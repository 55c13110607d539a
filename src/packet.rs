//! Logical packet schema (§6 of `SPEC_FULL.md`).
//!
//! Wire encoding is explicitly unspecified by the spec; these are the
//! in-memory, fully-typed shapes every packet is constructed as. Field names
//! and widths follow the `original_source/adup/packets.py` scapy layer
//! definitions, which are the ground truth for the exact field list.

use serde::{Deserialize, Serialize};

use crate::metrics::LinkMetrics;
use crate::types::PrefixId;

/// A single advertised route inside an [`Packet::Update`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteEntry {
    /// Destination prefix being advertised.
    pub prefix: PrefixId,
    /// The advertiser's total cost to this prefix (maps to `total_delay` in
    /// the wire schema; this engine folds the whole composite cost into one
    /// field rather than separately carrying bandwidth/jitter/loss/
    /// congestion subtotals, since admission re-derives those from the
    /// receiver's own neighbor metrics).
    pub total_cost: f64,
}

/// The five packet types of §6. `Query`/`Reply`/`Ack` are defined for wire
/// compatibility with a full DUAL active-phase extension but are never
/// emitted by this engine (§9, Open Questions) — routers MUST accept and
/// ignore them without error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Packet {
    /// Periodic liveness/metric advertisement (§4.4.1, §4.4.3).
    Hello {
        /// Observed link metrics at the time of sending.
        metrics: LinkMetrics,
    },
    /// Route advertisement, one entry per destination (§4.4.8).
    Update {
        /// The advertised routes, always non-empty.
        routes: Vec<RouteEntry>,
    },
    /// Reserved: DUAL active-phase query. Never emitted; see §9.
    Query {
        /// Destination being queried.
        prefix: PrefixId,
        /// The querying router's feasible distance.
        feasible_distance: u32,
    },
    /// Reserved: DUAL active-phase reply. Never emitted; see §9.
    Reply {
        /// Destination being replied about.
        prefix: PrefixId,
        /// The reported distance.
        reported_distance: u32,
        /// Whether the prefix is reachable at all.
        reachable: bool,
    },
    /// Reserved: DUAL active-phase acknowledgment. Never emitted; see §9.
    Ack {
        /// Sequence number being acknowledged.
        sequence_number: u32,
    },
}

impl Packet {
    /// Short tag used by the packet log (§3's `PacketLog`).
    pub fn kind_name(&self) -> &'static str {
        match self {
            Packet::Hello { .. } => "HELLO",
            Packet::Update { .. } => "UPDATE",
            Packet::Query { .. } => "QUERY",
            Packet::Reply { .. } => "REPLY",
            Packet::Ack { .. } => "ACK",
        }
    }
}
