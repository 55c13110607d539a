//! Core identifier and value types shared across the engine.

use std::fmt;

use ordered_float::NotNan;
use serde::{Deserialize, Serialize};

/// Opaque, unique label identifying a router (e.g. `"R1"`).
///
/// Routers are addressed by name rather than by an arena index because the
/// protocol itself (HELLO/UPDATE payloads, the FIB's `next_hop` field) is
/// defined in terms of these labels — there is no separate wire identifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub String);

impl NodeId {
    /// Build a node id from anything string-like.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for NodeId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Opaque destination network identifier (e.g. `"192.168.1.0/24"`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PrefixId(pub String);

impl PrefixId {
    /// Build a prefix id from anything string-like.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }
}

impl fmt::Display for PrefixId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PrefixId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for PrefixId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Identifier for a [`crate::link::Link`] inside the arena owned by
/// [`crate::simulation::Simulation`]. Interfaces store this, not the link
/// itself, so that the router/link graph can be cyclic without shared
/// ownership (see `DESIGN.md`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LinkId(pub usize);

/// The simulation clock. Monotonically non-decreasing, never tied to
/// wall-clock time (§9 of `SPEC_FULL.md`).
pub type VirtualTime = NotNan<f64>;

/// Build a [`VirtualTime`] from a plain `f64`. Panics if given NaN, which
/// can only happen from a programming error (NaN never legitimately arises
/// from the arithmetic in this crate).
pub fn vtime(t: f64) -> VirtualTime {
    NotNan::new(t).expect("virtual time must not be NaN")
}

/// The next hop installed in a [`crate::router::FibEntry`]: either another
/// router, reached through a neighbor relationship, or the synthetic
/// `SELF` marker for a directly attached network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum NextHop {
    /// Route is reachable through this neighboring router.
    Node(NodeId),
    /// Directly attached network; cost is fixed at zero.
    SelfRoute,
}

impl NextHop {
    /// True if this is the `SELF` marker.
    pub fn is_self(&self) -> bool {
        matches!(self, NextHop::SelfRoute)
    }

    /// The neighbor id, if this next hop is not `SELF`.
    pub fn node(&self) -> Option<&NodeId> {
        match self {
            NextHop::Node(n) => Some(n),
            NextHop::SelfRoute => None,
        }
    }
}

impl fmt::Display for NextHop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NextHop::Node(n) => write!(f, "{n}"),
            NextHop::SelfRoute => write!(f, "SELF"),
        }
    }
}

/// Human-readable classification of why a path was chosen, surfaced in the
/// route-change log and the FIB entry itself.
///
/// Carried over from the original Python implementation's
/// `determine_selection_reason` (see `SPEC_FULL.md`, "Supplemented
/// features"), since `spec.md` requires the field but leaves its shape
/// unspecified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SelectionReason {
    /// Low cost and high stability.
    Optimal,
    /// Below-average congestion was the deciding factor.
    LowCongestion,
    /// Below-average packet loss was the deciding factor.
    LowPacketLoss,
    /// High stability was the deciding factor.
    HighStability,
    /// None of the above stood out; this was simply the best-scoring
    /// candidate.
    BestAvailable,
}

impl fmt::Display for SelectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SelectionReason::Optimal => "optimal path (low cost, high stability)",
            SelectionReason::LowCongestion => "low congestion path",
            SelectionReason::LowPacketLoss => "low packet loss path",
            SelectionReason::HighStability => "high stability path",
            SelectionReason::BestAvailable => "best available path",
        };
        f.write_str(s)
    }
}

/// Classification of a route change, used by the route-change log and by
/// the §8 per-update monotone-cap invariant (a `Reset`/`Decay` classified
/// change is exempt from the 1.20x cap).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RouteChangeKind {
    /// No previous route existed for this prefix.
    New,
    /// The route was withdrawn entirely (no more candidates).
    Lost,
    /// A strictly better path was found on top of an existing one.
    Better,
    /// The previous next hop disappeared (timed out or was evicted); the
    /// replacement may be worse.
    SwitchedDueToFailure,
    /// Same next hop, cost changed enough to reinstall.
    Updated,
}

impl fmt::Display for RouteChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RouteChangeKind::New => "new route discovered",
            RouteChangeKind::Lost => "route lost",
            RouteChangeKind::Better => "better path found",
            RouteChangeKind::SwitchedDueToFailure => "path switched due to failure",
            RouteChangeKind::Updated => "route updated",
        };
        f.write_str(s)
    }
}
