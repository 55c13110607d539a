#![deny(missing_debug_implementations)]

//! # adup-sim
//!
//! A discrete-event simulation engine for ADUP, a DUAL-style diffusing
//! update distance-vector routing protocol: neighbor discovery over
//! periodic HELLOs, a composite multi-metric link cost, loop/oscillation
//! detection, exponential cost damping and stabilization, split-horizon
//! advertisement, and background sweepers for cost decay and high-cost
//! route eviction.
//!
//! Everything runs over a single-threaded virtual-time [`kernel::Kernel`];
//! there is no wall-clock dependency anywhere in this crate, which is what
//! makes its event ordering (and therefore its convergence behavior)
//! reproducible given a seed (see [`config::Config::rng_seed`]).
//!
//! ## Example
//!
//! ```
//! use adup_sim::prelude::*;
//!
//! let mut sim = Simulation::new(3, TopologyKind::Linear, Config::default())
//!     .expect("linear topology with 3 nodes is always valid");
//! sim.run(60.0);
//! let snapshot = sim.snapshot();
//! assert!(!snapshot.routers.is_empty());
//! ```
//!
//! This library never initializes a logger; wire up [`log`]'s facade (e.g.
//! with `env_logger`) in the binary that embeds it if you want diagnostics.

pub mod builder;
pub mod channel;
pub mod config;
pub mod error;
pub mod event;
pub mod kernel;
pub mod link;
pub mod metrics;
pub mod packet;
pub mod prelude;
pub mod router;
pub mod simulation;
pub mod snapshot;
pub mod types;
