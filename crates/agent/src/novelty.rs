//! Novelty scoring and stagnation detection.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use volition_config::NoveltyConfig;
use volition_core::affect::{AffectDimension, AffectState};

/// Novelty adjustment for `candidate`.
///
/// `recent` holds the latest executed action names, oldest first. Repeating
/// the last action is penalised hardest, anything in the recent window less,
/// and actions absent from the window earn a bonus that grows with how long
/// they have been absent. A small relapse chance skips the adjustment
/// entirely.
pub fn novelty_score<R: Rng>(
    candidate: &str,
    last_action: Option<&str>,
    recent: &[String],
    affect: &AffectState,
    config: &NoveltyConfig,
    rng: &mut R,
) -> f64 {
    if rng.random_bool(config.relapse_probability.clamp(0.0, 1.0)) {
        return 0.0;
    }

    if last_action == Some(candidate) {
        let anxiety = affect.get(AffectDimension::Anxiety);
        return -config.repeat_penalty * (1.0 - 0.5 * anxiety);
    }

    let window_start = recent.len().saturating_sub(config.recent_window);
    if recent[window_start..].iter().any(|a| a == candidate) {
        let restless = affect
            .get(AffectDimension::Curiosity)
            .max(affect.get(AffectDimension::Boredom));
        let sadness = affect.get(AffectDimension::Sadness);
        return -config.recent_penalty * (1.0 + 0.5 * restless) * (1.0 - 0.5 * sadness);
    }

    let gap = recent
        .iter()
        .rev()
        .position(|a| a == candidate)
        .map_or(recent.len() + 1, |p| p + 1);
    let mut bonus = (config.absent_bonus_per_tick * gap as f64).min(config.absent_bonus_cap);
    if affect.get(AffectDimension::Curiosity) > 0.7 {
        bonus *= config.curiosity_boost;
    }
    bonus.max(0.0)
}

/// Sliding window of context fingerprints.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StagnationDetector {
    #[serde(default)]
    fingerprints: VecDeque<u64>,
}

impl StagnationDetector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, fingerprint: u64, window: usize) {
        self.fingerprints.push_back(fingerprint);
        while self.fingerprints.len() > window.max(1) {
            self.fingerprints.pop_front();
        }
    }

    /// Occurrences of the most repeated fingerprint in the window.
    pub fn max_collisions(&self) -> usize {
        let mut counts: HashMap<u64, usize> = HashMap::new();
        for fp in &self.fingerprints {
            *counts.entry(*fp).or_insert(0) += 1;
        }
        counts.into_values().max().unwrap_or(0)
    }

    /// Stagnant when the same action keeps winning, or the same context
    /// keeps coming back.
    pub fn is_stagnant(&self, repeat_streak: u32, config: &NoveltyConfig) -> bool {
        repeat_streak >= config.repeat_limit || self.max_collisions() >= config.hash_collision_limit
    }

    pub fn clear(&mut self) {
        self.fingerprints.clear();
    }

    pub fn len(&self) -> usize {
        self.fingerprints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fingerprints.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    fn config() -> NoveltyConfig {
        NoveltyConfig {
            relapse_probability: 0.0,
            ..NoveltyConfig::default()
        }
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn exact_repeat_is_penalised() {
        let mut rng = SmallRng::seed_from_u64(1);
        let recent = names(&["plan", "log", "speak"]);
        let affect = AffectState {
            anxiety: 0.0,
            ..AffectState::default()
        };
        let score = novelty_score("speak", Some("speak"), &recent, &affect, &config(), &mut rng);
        assert!((score + 0.6).abs() < 1e-12);
    }

    #[test]
    fn anxiety_softens_repeat_penalty() {
        let mut rng = SmallRng::seed_from_u64(1);
        let recent = names(&["speak"]);
        let anxious = AffectState {
            anxiety: 1.0,
            ..AffectState::default()
        };
        let score = novelty_score("speak", Some("speak"), &recent, &anxious, &config(), &mut rng);
        assert!((score + 0.3).abs() < 1e-12);
    }

    #[test]
    fn recent_window_penalty_scales_with_restlessness() {
        let mut rng = SmallRng::seed_from_u64(1);
        let recent = names(&["plan", "log", "speak"]);
        let affect = AffectState {
            curiosity: 1.0,
            boredom: 0.0,
            sadness: 0.0,
            ..AffectState::default()
        };
        let score = novelty_score("plan", Some("speak"), &recent, &affect, &config(), &mut rng);
        assert!((score + 0.45).abs() < 1e-12);
    }

    #[test]
    fn absent_actions_earn_capped_bonus() {
        let mut rng = SmallRng::seed_from_u64(1);
        let affect = AffectState {
            curiosity: 0.5,
            ..AffectState::default()
        };
        let recent = names(&["dream", "a", "b", "c", "d", "e"]);
        let score = novelty_score("dream", Some("e"), &recent, &affect, &config(), &mut rng);
        assert!((score - 0.30).abs() < 1e-12);

        let long: Vec<String> = (0..20).map(|i| format!("x{i}")).collect();
        let score = novelty_score("dream", Some("x19"), &long, &affect, &config(), &mut rng);
        assert!((score - 0.4).abs() < 1e-12);

        let curious = AffectState {
            curiosity: 0.9,
            ..AffectState::default()
        };
        let score = novelty_score("dream", Some("x19"), &long, &curious, &config(), &mut rng);
        assert!((score - 0.5).abs() < 1e-12);
    }

    #[test]
    fn never_executed_action_is_never_penalised() {
        let mut rng = SmallRng::seed_from_u64(9);
        let recent = names(&["plan", "plan", "log"]);
        let noisy = NoveltyConfig::default();
        for _ in 0..200 {
            let score = novelty_score("explore", Some("log"), &recent, &AffectState::default(), &noisy, &mut rng);
            assert!(score >= 0.0);
        }
    }

    #[test]
    fn relapse_skips_adjustment() {
        let mut rng = SmallRng::seed_from_u64(1);
        let always = NoveltyConfig {
            relapse_probability: 1.0,
            ..NoveltyConfig::default()
        };
        let recent = names(&["speak"]);
        let score = novelty_score("speak", Some("speak"), &recent, &AffectState::default(), &always, &mut rng);
        assert_eq!(score, 0.0);
    }

    #[test]
    fn detector_fires_on_streak_or_collisions() {
        let cfg = config();
        let mut detector = StagnationDetector::new();
        assert!(!detector.is_stagnant(2, &cfg));
        assert!(detector.is_stagnant(3, &cfg));

        for fp in [1, 2, 1, 3] {
            detector.observe(fp, cfg.hash_window);
        }
        assert!(!detector.is_stagnant(0, &cfg));
        detector.observe(1, cfg.hash_window);
        assert!(detector.is_stagnant(0, &cfg));

        detector.clear();
        assert!(detector.is_empty());
        assert!(!detector.is_stagnant(0, &cfg));
    }

    #[test]
    fn detector_window_slides() {
        let mut detector = StagnationDetector::new();
        for fp in 0..30u64 {
            detector.observe(fp % 10, 12);
        }
        assert_eq!(detector.len(), 12);
        assert_eq!(detector.max_collisions(), 2);
    }
}
