//! Time-varying per-neighbor link metrics (§3 of `SPEC_FULL.md`).

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::MetricWeights;
use crate::types::VirtualTime;

/// Raw, per-neighbor metrics carried on a HELLO packet and stored in the
/// [`crate::router::NeighborTable`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinkMetrics {
    /// One-way delay, `[1, 120]` ms.
    pub delay_ms: f64,
    /// Jitter, `[0.1, 20]` ms.
    pub jitter_ms: f64,
    /// Packet loss, `[0.01, 8.0]` percent.
    pub packet_loss_pct: f64,
    /// Congestion, `[0, 50]` percent.
    pub congestion_pct: f64,
    /// Link stability, `[50, 100]` percent.
    pub link_stability_pct: f64,
}

impl LinkMetrics {
    /// Bounds enforced on every field, per §3.
    pub const DELAY_RANGE: (f64, f64) = (1.0, 120.0);
    pub const JITTER_RANGE: (f64, f64) = (0.1, 20.0);
    pub const PACKET_LOSS_RANGE: (f64, f64) = (0.01, 8.0);
    pub const CONGESTION_RANGE: (f64, f64) = (0.0, 50.0);
    pub const STABILITY_RANGE: (f64, f64) = (50.0, 100.0);

    /// A reasonable starting point for a freshly discovered neighbor,
    /// roughly matching the `original_source/adup/router.py` base values
    /// before the first perturbation pass.
    pub fn baseline() -> Self {
        Self {
            delay_ms: 15.0,
            jitter_ms: 8.0,
            packet_loss_pct: 0.5,
            congestion_pct: 8.0,
            link_stability_pct: 90.0,
        }
    }

    /// Composite link cost, §4.4.2:
    /// `C_link = w_delay*delay + w_jitter*jitter + w_loss*(loss*10) + w_congestion*congestion`.
    pub fn composite_cost(&self, weights: &MetricWeights) -> f64 {
        weights.delay * self.delay_ms
            + weights.jitter * self.jitter_ms
            + weights.packet_loss * (self.packet_loss_pct * MetricWeights::PACKET_LOSS_SCALE)
            + weights.congestion * self.congestion_pct
    }

    /// Draw a randomized set of metrics for a HELLO packet sent at `now`,
    /// following the time- and load-based variation of
    /// `original_source/adup/router.py::send_hellos`.
    pub fn sample_hello(now: VirtualTime, rng: &mut impl Rng) -> Self {
        let t = now.into_inner();
        let time_factor = 1.0 + 0.6 * (t / 15.0).sin() + 0.3 * (t / 10.0).cos();
        let network_load = rng.gen_range(0.5..2.0);
        let congestion_spike = if rng.gen_bool(0.3) {
            rng.gen_range(0.8..1.5)
        } else {
            1.0
        };

        let base_loss = rng.gen_range(0.1..2.5);
        let mut dynamic_loss = base_loss * time_factor.abs() * network_load * congestion_spike;
        if rng.gen_bool(0.15) {
            dynamic_loss += rng.gen_range(1.0..4.0);
        }

        let delay = (rng.gen_range(10..80) as f64 * time_factor).clamp(5.0, 120.0);
        let jitter = (rng.gen_range(2..15) as f64 * network_load).clamp(1.0, 20.0);
        let packet_loss = dynamic_loss.clamp(0.05, 8.0);
        let congestion = (rng.gen_range(5..35) as f64 * network_load).clamp(0.0, 50.0);
        let stability = (rng.gen_range(80..98) as f64 / time_factor.max(0.1)).clamp(70.0, 100.0);

        Self {
            delay_ms: delay,
            jitter_ms: jitter,
            packet_loss_pct: packet_loss,
            congestion_pct: congestion,
            link_stability_pct: stability,
        }
    }

    /// Perturb an already-known neighbor's metrics in place, following the
    /// periodic dynamic metric mutator (§4.4.1, every 20-40 time units).
    /// Grounded in `original_source/adup/router.py::update_dynamic_metrics`.
    pub fn mutate(&mut self, now: VirtualTime, rng: &mut impl Rng) {
        let t = now.into_inner();
        let time_factor = 1.0 + 0.4 * (t / 25.0).sin() + 0.2 * (t / 18.0).cos();
        let random_factor = rng.gen_range(0.3..2.5);
        let congestion_factor = rng.gen_range(0.8..2.0);
        let spike_factor = if rng.gen_bool(0.1) {
            rng.gen_range(2.0..5.0)
        } else {
            1.0
        };

        let base_delay = 15.0;
        let base_jitter = 8.0;
        let base_loss = 0.005;
        let base_congestion = 0.08;

        self.delay_ms = (base_delay * time_factor.abs() * random_factor).clamp(1.0, 120.0);
        self.jitter_ms = Self::jittered(base_jitter * random_factor, rng).clamp(0.1, 20.0);
        let loss_raw =
            base_loss * 100.0 * time_factor.abs() * random_factor * congestion_factor * spike_factor;
        self.packet_loss_pct = loss_raw.clamp(0.01, 8.0);
        self.congestion_pct =
            (base_congestion * 100.0 * time_factor.abs() * random_factor).clamp(0.0, 50.0);
        self.link_stability_pct = (100.0 - (time_factor - 1.0).abs() * 30.0).clamp(50.0, 100.0);
    }

    /// Jitter around `mean`. With the `rand_queue` feature enabled this
    /// draws from a normal distribution centered on `mean` (closer to the
    /// queueing-delay models the teacher crate's own `rand_queue` feature
    /// uses for link timing); otherwise it returns `mean` unchanged, matching
    /// this crate's default deterministic-shape perturbation.
    #[cfg(feature = "rand_queue")]
    fn jittered(mean: f64, rng: &mut impl Rng) -> f64 {
        use rand_distr::{Distribution, Normal};
        Normal::new(mean, mean * 0.15)
            .map(|d| d.sample(rng))
            .unwrap_or(mean)
    }

    #[cfg(not(feature = "rand_queue"))]
    fn jittered(mean: f64, _rng: &mut impl Rng) -> f64 {
        mean
    }
}
