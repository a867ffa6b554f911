//! Adaptive context overlay: counters that push the agent out of passivity.
//!
//! Tracks ticks since the last successful agentic action against a dynamic
//! threshold learned from recent gaps, and a frustration level that builds
//! while the agent stays past that threshold.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::debug;
use volition_config::GateConfig;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextOverlay {
    /// Ticks since an agentic action last succeeded
    pub cycles_since_agentic: u32,
    /// Change in `cycles_since_agentic` over the last tick
    pub cycles_derivative: i64,
    /// Frustration in [0, 1]
    pub frustration: f64,
    /// Recent gaps between agentic successes, oldest first
    pub agentic_gaps: VecDeque<u32>,
}

impl ContextOverlay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mean recent gap scaled by the threshold factor, floored. Before any
    /// gap is known the initial threshold applies.
    pub fn dynamic_threshold(&self, config: &GateConfig) -> f64 {
        if self.agentic_gaps.is_empty() {
            return config.initial_threshold;
        }
        let window = config.gap_window.max(1);
        let skip = self.agentic_gaps.len().saturating_sub(window);
        let recent: Vec<f64> = self.agentic_gaps.iter().skip(skip).map(|g| f64::from(*g)).collect();
        let mean = recent.iter().sum::<f64>() / recent.len() as f64;
        (mean * config.threshold_factor).max(config.threshold_floor)
    }

    pub fn past_threshold(&self, config: &GateConfig) -> bool {
        f64::from(self.cycles_since_agentic) > self.dynamic_threshold(config)
    }

    /// Within one tick of the threshold.
    pub fn near_threshold(&self, config: &GateConfig) -> bool {
        f64::from(self.cycles_since_agentic) + 1.0 >= self.dynamic_threshold(config)
    }

    /// Frustration clamped into [0, 1].
    pub fn frustration(&self) -> f64 {
        if self.frustration.is_finite() {
            self.frustration.clamp(0.0, 1.0)
        } else {
            0.0
        }
    }

    /// Fold one tick into the counters.
    ///
    /// `agentic_success` resets the counter and records the gap; `forced`
    /// resets the counter and relieves frustration. Otherwise frustration
    /// grows past the threshold and decays below it.
    pub fn record_tick(&mut self, agentic_success: bool, forced: bool, config: &GateConfig) {
        let prev = self.cycles_since_agentic;

        if agentic_success {
            self.agentic_gaps.push_back(prev.saturating_add(1));
            while self.agentic_gaps.len() > config.gap_window.max(1) {
                self.agentic_gaps.pop_front();
            }
        }
        self.cycles_since_agentic = if agentic_success || forced {
            0
        } else {
            prev.saturating_add(1)
        };
        self.cycles_derivative = i64::from(self.cycles_since_agentic) - i64::from(prev);

        let frustration = self.frustration();
        self.frustration = if forced {
            (frustration - config.forced_frustration_relief).max(0.0)
        } else if self.past_threshold(config) {
            (frustration + config.frustration_step).min(1.0)
        } else {
            frustration * config.frustration_decay.clamp(0.0, 1.0)
        };

        debug!(
            cycles = self.cycles_since_agentic,
            frustration = self.frustration,
            threshold = self.dynamic_threshold(config),
            "Overlay updated"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_threshold_until_gaps_known() {
        let overlay = ContextOverlay::new();
        assert_eq!(overlay.dynamic_threshold(&GateConfig::default()), 4.0);
    }

    #[test]
    fn threshold_follows_recent_gaps() {
        let cfg = GateConfig::default();
        let mut overlay = ContextOverlay::new();
        overlay.agentic_gaps = VecDeque::from(vec![10, 2, 4, 4, 2, 8]);
        // last five: 2, 4, 4, 2, 8 => mean 4 => 6
        assert!((overlay.dynamic_threshold(&cfg) - 6.0).abs() < 1e-12);

        overlay.agentic_gaps = VecDeque::from(vec![1, 1]);
        assert_eq!(overlay.dynamic_threshold(&cfg), cfg.threshold_floor);
    }

    #[test]
    fn frustration_builds_only_past_threshold() {
        let cfg = GateConfig::default();
        let mut overlay = ContextOverlay::new();
        for _ in 0..4 {
            overlay.record_tick(false, false, &cfg);
        }
        assert_eq!(overlay.cycles_since_agentic, 4);
        assert_eq!(overlay.frustration(), 0.0);

        overlay.record_tick(false, false, &cfg);
        overlay.record_tick(false, false, &cfg);
        assert!((overlay.frustration() - 0.2).abs() < 1e-12);
        assert_eq!(overlay.cycles_derivative, 1);
    }

    #[test]
    fn agentic_success_resets_and_records_gap() {
        let cfg = GateConfig::default();
        let mut overlay = ContextOverlay::new();
        for _ in 0..6 {
            overlay.record_tick(false, false, &cfg);
        }
        let before = overlay.frustration();
        overlay.record_tick(true, false, &cfg);
        assert_eq!(overlay.cycles_since_agentic, 0);
        assert_eq!(overlay.cycles_derivative, -6);
        assert_eq!(overlay.agentic_gaps.back(), Some(&7));
        assert!(overlay.frustration() < before);
    }

    #[test]
    fn forced_tick_relieves_frustration() {
        let cfg = GateConfig::default();
        let mut overlay = ContextOverlay {
            cycles_since_agentic: 9,
            frustration: 0.5,
            ..ContextOverlay::default()
        };
        overlay.record_tick(false, true, &cfg);
        assert_eq!(overlay.cycles_since_agentic, 0);
        assert!((overlay.frustration() - 0.2).abs() < 1e-12);
        assert!(overlay.agentic_gaps.is_empty());
    }
}
