//! Kernel event definitions (§4.1 of `SPEC_FULL.md`).
//!
//! The source system models routers as cooperative coroutines suspending on
//! `timeout`/channel `get`. Per the re-architecture guidance in `spec.md`
//! §9, this crate instead represents every suspension point as a typed,
//! resumable event pushed back onto the kernel's queue — there are no real
//! coroutines or OS threads anywhere in this crate.

mod queue;
pub use queue::TimeQueue;

use serde::{Deserialize, Serialize};

use crate::packet::Packet;
use crate::types::{LinkId, NodeId, PrefixId};

/// Every event the kernel can dispatch. Each variant corresponds to either a
/// periodic background process (§4.4.1) waking up, or a packet completing
/// its one-scheduling-step hop across a [`crate::link::Link`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum KernelEvent {
    /// A link finished transporting `packet` from `from` and delivers it to
    /// the opposite endpoint. Folds together the channel `get` and the
    /// listener's dispatch in one step, since both happen at the same
    /// virtual time with nothing observable in between (§4.3).
    Deliver {
        link: LinkId,
        from: NodeId,
        packet: Packet,
    },
    /// Hello emitter process wakes (§4.4.1, every `hello_interval`).
    HelloTimer { router: NodeId },
    /// One-shot initial advertiser process wakes (§4.4.1, staggered 1-3).
    InitialAdvertiseTimer { router: NodeId },
    /// Dynamic metric mutator wakes (§4.4.1, every 20-40).
    MetricMutateTimer { router: NodeId },
    /// High-cost reset sweeper wakes (§4.4.1/§4.4.9, every 30).
    CostMonitorTimer { router: NodeId },
    /// Cost decay sweeper wakes (§4.4.1/§4.4.9, every 120).
    CostDecayTimer { router: NodeId },
    /// A staggered UPDATE triggered by `trigger_update` fires (§4.4.5, §4.4.8).
    TriggerUpdate {
        router: NodeId,
        /// `None` means "advertise all directly connected networks".
        prefix: Option<PrefixId>,
    },
}

impl KernelEvent {
    /// The router this event is ultimately processed by, used only for
    /// diagnostics/logging.
    pub fn router(&self) -> Option<&NodeId> {
        match self {
            KernelEvent::Deliver { .. } => None,
            KernelEvent::HelloTimer { router }
            | KernelEvent::InitialAdvertiseTimer { router }
            | KernelEvent::MetricMutateTimer { router }
            | KernelEvent::CostMonitorTimer { router }
            | KernelEvent::CostDecayTimer { router }
            | KernelEvent::TriggerUpdate { router, .. } => Some(router),
        }
    }
}
