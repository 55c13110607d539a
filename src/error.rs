//! Error types (§7 of `SPEC_FULL.md`).
//!
//! The crate splits errors the same way the teacher splits `DeviceError`
//! from `NetworkError`: [`RouterError`] covers admission/selection rejections
//! inside a single router's protocol pipeline, and [`SimError`] covers
//! failures at the level of the simulation façade and topology builder.

use thiserror::Error;

use crate::types::{NodeId, PrefixId};

/// Non-fatal rejections produced while admitting an UPDATE or selecting a
/// path. Per §7, the first five kinds are silent to the protocol: the
/// caller drops or adjusts the offending route entry and (at most) logs the
/// rejection; none of these are ever surfaced to a peer.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum RouterError {
    /// The packet's fields could not be interpreted (reserved for future
    /// wire-format validation; the in-memory `Packet` enum in this crate is
    /// always well-formed by construction).
    #[error("malformed packet from {0}")]
    MalformedPacket(NodeId),

    /// An UPDATE arrived from a router not present in the neighbor table.
    #[error("update for {prefix} from unknown neighbor {neighbor}")]
    UnknownNeighbor { neighbor: NodeId, prefix: PrefixId },

    /// The advertised prefix's current FIB next hop is the advertising
    /// neighbor; accepting it would learn a route back through the path we
    /// forward on.
    #[error("split horizon: {prefix} already forwards through {neighbor}")]
    SplitHorizonRejection { neighbor: NodeId, prefix: PrefixId },

    /// The advertised cost exceeded the admission ceiling (default 100).
    #[error("excessive cost {cost} for {prefix} from {neighbor}")]
    ExcessiveCost {
        neighbor: NodeId,
        prefix: PrefixId,
        cost: f64,
    },

    /// The advertised cost more than doubled the previously stored value;
    /// the caller substitutes a capped value rather than rejecting outright.
    #[error("rapid cost increase for {prefix} from {neighbor}: {old} -> {new}")]
    RapidIncrease {
        neighbor: NodeId,
        prefix: PrefixId,
        old: f64,
        new: f64,
    },

    /// The candidate triggered oscillation or accumulation detection
    /// (§4.4.6) and was skipped during path selection.
    #[error("loop/oscillation detected for {prefix} via {neighbor}")]
    LoopDetected { neighbor: NodeId, prefix: PrefixId },
}

/// Errors from the simulation façade and topology builder.
#[derive(Debug, Error)]
pub enum SimError {
    /// A router id was referenced that does not exist in the registry.
    #[error("unknown router: {0}")]
    UnknownRouter(NodeId),

    /// A link between the given endpoints does not exist.
    #[error("no link between {0} and {1}")]
    UnknownLink(NodeId, NodeId),

    /// Topology-builder parameters were out of their allowed range.
    #[error("invalid topology parameters: {0}")]
    InvalidTopologyParams(String),

    /// A background process raised and was terminated; the kernel and all
    /// other processes keep running (§7, `KernelProcessFault`).
    #[error("process fault in {router}: {detail}")]
    KernelProcessFault { router: NodeId, detail: String },
}
