//! Process-wide configuration (§6, §12 of `SPEC_FULL.md`).
//!
//! `Config` is a plain value type passed into [`crate::simulation::Simulation`]
//! and [`crate::builder::TopologyBuilder`]; there is no global mutable
//! configuration state (§9).

use serde::{Deserialize, Serialize};

/// Weights for the composite link cost of §4.4.2.
///
/// `C_link = delay*w_delay + jitter*w_jitter + (packet_loss*10)*w_loss + congestion*w_congestion`
///
/// The weights MUST sum to 1.0 and the packet-loss scaling factor of 10 is
/// fixed; `debug_assert`s enforce this on construction since a silently
/// miscalibrated cost function would be far harder to diagnose than an
/// early panic in a debug build.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricWeights {
    /// Weight applied to `delay_ms`. Default 0.40.
    pub delay: f64,
    /// Weight applied to `jitter_ms`. Default 0.20.
    pub jitter: f64,
    /// Weight applied to `packet_loss_pct * 10`. Default 0.25.
    pub packet_loss: f64,
    /// Weight applied to `congestion_pct`. Default 0.15.
    pub congestion: f64,
}

impl MetricWeights {
    /// The fixed packet-loss scaling factor from §4.4.2.
    pub const PACKET_LOSS_SCALE: f64 = 10.0;

    /// Construct a set of weights, checking (in debug builds) that they sum
    /// to 1.0.
    pub fn new(delay: f64, jitter: f64, packet_loss: f64, congestion: f64) -> Self {
        let w = Self {
            delay,
            jitter,
            packet_loss,
            congestion,
        };
        debug_assert!(
            (w.sum() - 1.0).abs() < 1e-9,
            "metric weights must sum to 1.0, got {}",
            w.sum()
        );
        w
    }

    fn sum(&self) -> f64 {
        self.delay + self.jitter + self.packet_loss + self.congestion
    }
}

impl Default for MetricWeights {
    fn default() -> Self {
        Self::new(0.40, 0.20, 0.25, 0.15)
    }
}

/// Every tunable named in §6, all overridable before [`crate::simulation::Simulation::run`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Composite link cost weights (§4.4.2).
    pub metric_weights: MetricWeights,
    /// HELLO emission period. Default 5.0.
    pub hello_interval: f64,
    /// Neighbor hold time before pruning. Default 15.0.
    pub hold_time: f64,
    /// Cost decay sweep period. Default 120.0.
    pub decay_period: f64,
    /// Multiplicative decay factor applied per sweep. Default 0.95.
    pub decay_factor: f64,
    /// High-cost reset sweep period. Default 30.0.
    pub reset_period: f64,
    /// FIB cost above which an entry is reset and re-advertised. Default 60.0.
    pub reset_threshold: f64,
    /// FIB cost above which an UPDATE is suppressed entirely. Default 70.0.
    pub advertise_suppression_threshold: f64,
    /// Absolute ceiling above which an advertised cost is dropped. Default 100.0.
    pub admission_ceiling: f64,
    /// Cost above which exponential damping kicks in. Default 50.0.
    pub damping_knee: f64,
    /// Damping factor applied above the knee. Default 0.7.
    pub damping_factor: f64,
    /// Maximum allowed per-update increase ratio during stabilization. Default 1.20.
    pub per_update_increase_cap: f64,
    /// Multiplier above which a reported cost increase is capped. Default 2.0.
    pub rapid_increase_multiplier: f64,
    /// Absolute cap applied to brand-new candidates (<3 history samples). Default 60.0.
    pub new_path_cap: f64,
    /// Number of trailing samples inspected for oscillation detection. Default 5.
    pub oscillation_window: usize,
    /// Max-min spread above which oscillation is declared. Default 30.0.
    pub oscillation_threshold: f64,
    /// Number of trailing samples inspected for accumulation detection. Default 4.
    pub accumulation_window: usize,
    /// Number of strict increases within the window that counts as accumulation. Default 3.
    pub accumulation_threshold: usize,
    /// Absolute ceiling applied to every candidate cost, post-loop-check. Default 80.0.
    pub hard_cost_ceiling: f64,
    /// Seed for the single process-wide PRNG (§9). Default 42.
    pub rng_seed: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            metric_weights: MetricWeights::default(),
            hello_interval: 5.0,
            hold_time: 15.0,
            decay_period: 120.0,
            decay_factor: 0.95,
            reset_period: 30.0,
            reset_threshold: 60.0,
            advertise_suppression_threshold: 70.0,
            admission_ceiling: 100.0,
            damping_knee: 50.0,
            damping_factor: 0.7,
            per_update_increase_cap: 1.20,
            rapid_increase_multiplier: 2.0,
            new_path_cap: 60.0,
            oscillation_window: 5,
            oscillation_threshold: 30.0,
            accumulation_window: 4,
            accumulation_threshold: 3,
            hard_cost_ceiling: 80.0,
            rng_seed: 42,
        }
    }
}
