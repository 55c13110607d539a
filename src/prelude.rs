//! Convenience re-export of the types most callers need, mirroring the
//! teacher crate's `prelude` module.

pub use crate::builder::TopologyKind;
pub use crate::config::{Config, MetricWeights};
pub use crate::error::{RouterError, SimError};
pub use crate::metrics::LinkMetrics;
pub use crate::packet::{Packet, RouteEntry};
pub use crate::router::{Router, RouterState, SelectionReason};
pub use crate::simulation::Simulation;
pub use crate::snapshot::Snapshot;
pub use crate::types::{vtime, LinkId, NextHop, NodeId, PrefixId, RouteChangeKind, VirtualTime};
