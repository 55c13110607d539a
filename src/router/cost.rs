//! The composite cost pipeline (§4.4.2, §4.4.5, §4.4.6, §4.4.7 of
//! `SPEC_FULL.md`): raw link metrics -> composite link cost -> stabilized
//! candidate cost -> loop-safe FIB cost.
//!
//! Kept free of the `Router` struct so the pipeline stages can be unit
//! tested in isolation, the way the teacher keeps `bgp::BgpRoute` ordering
//! logic separate from `router::Router`.

use std::collections::VecDeque;

use crate::config::Config;
use crate::error::RouterError;
use crate::types::{NodeId, PrefixId, SelectionReason};

/// Bounded history of the last `n` admitted candidate costs for one
/// `(prefix, neighbor)` pair (§3, `CostHistory`).
#[derive(Debug, Clone, Default)]
pub struct CostHistory {
    samples: VecDeque<f64>,
}

impl CostHistory {
    const CAPACITY: usize = 5;

    pub fn push(&mut self, cost: f64) {
        self.samples.push_back(cost);
        if self.samples.len() > Self::CAPACITY {
            self.samples.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }

    pub fn last(&self) -> Option<f64> {
        self.samples.back().copied()
    }

    fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        self.samples.iter().copied()
    }
}

/// Bounded history of `(time, cost)` samples for one `(prefix, neighbor)`
/// pair, used for loop/oscillation detection (§3, `LoopDetectionHistory`).
#[derive(Debug, Clone, Default)]
pub struct LoopDetectionHistory {
    samples: VecDeque<(f64, f64)>,
}

impl LoopDetectionHistory {
    const CAPACITY: usize = 10;

    pub fn record(&mut self, time: f64, cost: f64) {
        self.samples.push_back((time, cost));
        if self.samples.len() > Self::CAPACITY {
            self.samples.pop_front();
        }
    }

    /// §4.4.6: `Err(LoopDetected)` if this history's most recent samples
    /// trip either the oscillation or accumulation check; `Ok(())` if the
    /// candidate may proceed to stabilization. The single call site in
    /// `Router::recompute_path` logs the concrete error and skips the
    /// candidate (§11: pipeline stages return `Result` internally so every
    /// rejection is logged with its kind at one place, never a bare `bool`).
    pub fn check(
        &self,
        cfg: &Config,
        prefix: &PrefixId,
        neighbor: &NodeId,
    ) -> Result<(), RouterError> {
        let rejected = self.is_oscillating(cfg.oscillation_window, cfg.oscillation_threshold)
            || self.is_accumulating(cfg.accumulation_window, cfg.accumulation_threshold);
        if rejected {
            Err(RouterError::LoopDetected {
                neighbor: neighbor.clone(),
                prefix: prefix.clone(),
            })
        } else {
            Ok(())
        }
    }

    /// §4.4.6: reject if, over the last `window` recorded costs, the spread
    /// exceeds `threshold`.
    fn is_oscillating(&self, window: usize, threshold: f64) -> bool {
        if self.samples.len() < window {
            return false;
        }
        let recent: Vec<f64> = self
            .samples
            .iter()
            .rev()
            .take(window)
            .map(|(_, c)| *c)
            .collect();
        let max = recent.iter().cloned().fold(f64::MIN, f64::max);
        let min = recent.iter().cloned().fold(f64::MAX, f64::min);
        (max - min) > threshold
    }

    /// §4.4.6: reject if, over the last `window` recorded costs, at least
    /// `threshold` of the consecutive steps were strict increases.
    fn is_accumulating(&self, window: usize, threshold: usize) -> bool {
        if self.samples.len() < window {
            return false;
        }
        let recent: Vec<f64> = self
            .samples
            .iter()
            .rev()
            .take(window)
            .map(|(_, c)| *c)
            .collect();
        // `recent` is newest-first; walk oldest-to-newest to count increases.
        let mut increases = 0;
        for pair in recent.windows(2).rev() {
            let (newer, older) = (pair[0], pair[1]);
            if newer > older {
                increases += 1;
            }
        }
        increases >= threshold
    }
}

/// A fully-evaluated candidate next hop for a prefix, ready to be compared
/// against its peers (§4.4.5, step 6).
#[derive(Debug, Clone)]
pub struct Candidate {
    pub total_cost: f64,
    pub score: f64,
    pub stability: f64,
    pub congestion: f64,
    pub packet_loss: f64,
    pub selection_reason: SelectionReason,
}

/// §4.4.7: stabilize a freshly admitted candidate cost against its history.
/// Returns the stabilized cost; does not mutate `history` (the caller pushes
/// the *stabilized* value after the fact, once it knows the candidate will
/// actually be admitted).
pub fn stabilize(history: &CostHistory, new_cost: f64, cfg: &Config) -> f64 {
    if history.len() + 1 >= 3 {
        // Exponential moving average, alpha = 0.5, folding the new sample in
        // as the most recent point.
        let mut samples: Vec<f64> = history.iter().collect();
        samples.push(new_cost);
        let alpha = 0.5;
        let mut smoothed = *samples.last().unwrap();
        for &s in samples.iter().rev().skip(1) {
            smoothed = alpha * s + (1.0 - alpha) * smoothed;
        }

        if let Some(prev) = history.last() {
            let max_increase = prev * cfg.per_update_increase_cap;
            if smoothed > max_increase {
                smoothed = max_increase;
            }
        }

        smoothed.min(cfg.hard_cost_ceiling)
    } else {
        new_cost.min(cfg.new_path_cap)
    }
}

/// §4.4.5 steps 3-4: hard ceiling then exponential damping above the knee.
pub fn cap_and_damp(total: f64, cfg: &Config) -> f64 {
    let capped = total.min(cfg.hard_cost_ceiling);
    if capped > cfg.damping_knee {
        cfg.damping_knee + (capped - cfg.damping_knee) * cfg.damping_factor
    } else {
        capped
    }
}

/// §4.4.5 step 6: the exploration bonus term, encouraging occasional
/// off-best trials without dominating selection.
pub fn exploration_bonus(usage_count: u32) -> f64 {
    match usage_count {
        0 => 10.0,
        1..=2 => 5.0,
        3..=9 => 2.0,
        _ => 0.0,
    }
}

/// §4.4.5 step 6: the composite selection score (lower is better).
pub fn selection_score(
    total_cost: f64,
    stability: f64,
    congestion: f64,
    packet_loss: f64,
    usage_count: u32,
) -> f64 {
    0.60 * total_cost
        + 0.15 * (100.0 - stability)
        + 0.10 * congestion
        + 0.10 * (packet_loss * 10.0)
        + 0.05 * exploration_bonus(usage_count)
}

/// Carried over from `original_source/adup/router.py::determine_selection_reason`.
pub fn selection_reason(
    total_cost: f64,
    stability: f64,
    congestion: f64,
    packet_loss: f64,
) -> SelectionReason {
    if total_cost < 50.0 && stability > 80.0 {
        SelectionReason::Optimal
    } else if congestion < 20.0 {
        SelectionReason::LowCongestion
    } else if packet_loss < 2.0 {
        SelectionReason::LowPacketLoss
    } else if stability > 90.0 {
        SelectionReason::HighStability
    } else {
        SelectionReason::BestAvailable
    }
}

/// §4.4.4 step 4: the rapid-increase cap. `Ok(reported)` unchanged if the
/// increase is within bounds; `Err(RapidIncrease)` carrying the capped
/// replacement value if it fired. The single call site in
/// `Router::admit_route` logs the error and substitutes the capped value
/// rather than dropping the route outright (§11).
pub fn cap_rapid_increase(
    old: f64,
    reported: f64,
    cfg: &Config,
    prefix: &PrefixId,
    neighbor: &NodeId,
) -> Result<f64, RouterError> {
    if reported > old * cfg.rapid_increase_multiplier {
        Err(RouterError::RapidIncrease {
            neighbor: neighbor.clone(),
            prefix: prefix.clone(),
            old,
            new: (old * 1.5).min(cfg.hard_cost_ceiling),
        })
    } else {
        Ok(reported)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> Config {
        Config::default()
    }

    #[test]
    fn damping_only_applies_above_knee() {
        let c = cfg();
        assert_eq!(cap_and_damp(30.0, &c), 30.0);
        // 50 + (70-50)*0.7 = 64
        assert!((cap_and_damp(70.0, &c) - 64.0).abs() < 1e-9);
        // hard ceiling applies before damping
        assert!((cap_and_damp(200.0, &c) - (50.0 + 30.0 * 0.7)).abs() < 1e-9);
    }

    #[test]
    fn rapid_increase_cap_fires_above_double() {
        let c = cfg();
        let prefix = PrefixId::new("10.0.0.0/24");
        let neighbor = NodeId::new("R1");
        let err = cap_rapid_increase(25.0, 90.0, &c, &prefix, &neighbor)
            .expect_err("90 > 2*25 must fire the rapid-increase cap");
        match err {
            RouterError::RapidIncrease { old, new, .. } => {
                assert_eq!(old, 25.0);
                assert!((new - 37.5).abs() < 1e-9);
            }
            other => panic!("expected RapidIncrease, got {other:?}"),
        }
        let unchanged = cap_rapid_increase(25.0, 40.0, &c, &prefix, &neighbor)
            .expect("40 is not more than double 25, must not fire");
        assert_eq!(unchanged, 40.0);
    }

    #[test]
    fn oscillation_detected_on_wide_spread() {
        let mut h = LoopDetectionHistory::default();
        for (t, c) in [(0.0, 10.0), (1.0, 45.0), (2.0, 5.0), (3.0, 50.0), (4.0, 8.0)] {
            h.record(t, c);
        }
        let prefix = PrefixId::new("10.0.0.0/24");
        let neighbor = NodeId::new("R1");
        assert!(matches!(
            h.check(&cfg(), &prefix, &neighbor),
            Err(RouterError::LoopDetected { .. })
        ));
    }

    #[test]
    fn accumulation_detected_on_monotone_increase() {
        let mut h = LoopDetectionHistory::default();
        for (t, c) in [(0.0, 10.0), (1.0, 15.0), (2.0, 20.0), (3.0, 25.0)] {
            h.record(t, c);
        }
        let prefix = PrefixId::new("10.0.0.0/24");
        let neighbor = NodeId::new("R1");
        assert!(matches!(
            h.check(&cfg(), &prefix, &neighbor),
            Err(RouterError::LoopDetected { .. })
        ));
    }

    #[test]
    fn new_candidate_uses_conservative_cap() {
        let c = cfg();
        let h = CostHistory::default();
        assert_eq!(stabilize(&h, 90.0, &c), 60.0);
    }

    #[test]
    fn stabilized_candidate_cannot_jump_more_than_cap() {
        let c = cfg();
        let mut h = CostHistory::default();
        h.push(20.0);
        h.push(20.0);
        // third sample triggers the EMA branch
        let out = stabilize(&h, 20.0, &c);
        assert!(out <= 20.0 * c.per_update_increase_cap + 1e-9);
    }
}
