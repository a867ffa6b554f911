//! Linear contextual bandit.
//!
//! Each action owns a weight vector over [`FeatureVector`] names. Scores are
//! dot products; choice is epsilon-greedy; updates apply weight decay plus a
//! reward-scaled step along the feature vector.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, warn};
use volition_core::error::AgentError;

use crate::features::FeatureVector;

/// One arm: a weight per feature and a use counter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Arm {
    #[serde(default)]
    pub weights: BTreeMap<String, f64>,
    #[serde(default)]
    pub uses: u64,
}

/// Per-action linear models, persisted as one document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContextualBandit {
    arms: BTreeMap<String, Arm>,
}

fn unit(value: f64) -> f64 {
    if value.is_finite() { value.clamp(0.0, 1.0) } else { 0.0 }
}

impl ContextualBandit {
    pub fn new() -> Self {
        Self::default()
    }

    /// Predicted value of `action` in this context. Unknown actions score 0.
    pub fn score(&self, action: &str, features: &FeatureVector) -> f64 {
        let Some(arm) = self.arms.get(action) else {
            return 0.0;
        };
        let total: f64 = features
            .iter()
            .filter_map(|(name, x)| arm.weights.get(name).map(|w| w * x))
            .filter(|v| v.is_finite())
            .sum();
        if total.is_finite() { total } else { 0.0 }
    }

    /// Epsilon-greedy choice among `actions`.
    ///
    /// With probability `epsilon` a uniformly random action is returned,
    /// otherwise the highest scoring one. Ties keep input order.
    pub fn choose<'a, S, R>(
        &self,
        actions: &'a [S],
        features: &FeatureVector,
        epsilon: f64,
        rng: &mut R,
    ) -> Result<&'a str, AgentError>
    where
        S: AsRef<str>,
        R: Rng,
    {
        if actions.is_empty() {
            return Err(AgentError::NoCandidates);
        }

        if rng.random_bool(unit(epsilon)) {
            let pick = actions[rng.random_range(0..actions.len())].as_ref();
            debug!(action = pick, "Bandit exploring");
            return Ok(pick);
        }

        let mut best = actions[0].as_ref();
        let mut best_score = self.score(best, features);
        for action in &actions[1..] {
            let score = self.score(action.as_ref(), features);
            if score > best_score {
                best = action.as_ref();
                best_score = score;
            }
        }
        Ok(best)
    }

    /// Move `action`'s weights toward the observed reward.
    ///
    /// `w = w * (1 - decay) + learning_rate * reward * x` for every feature
    /// present. Reward is clamped to [-1, 1]; rates to [0, 1].
    pub fn update(&mut self, action: &str, features: &FeatureVector, reward: f64, learning_rate: f64, decay: f64) {
        let reward = if reward.is_finite() { reward.clamp(-1.0, 1.0) } else { 0.0 };
        let lr = unit(learning_rate);
        let keep = 1.0 - unit(decay);

        let arm = self.arms.entry(action.to_string()).or_default();
        for (name, x) in features.iter() {
            let w = arm.weights.entry(name.to_string()).or_insert(0.0);
            let next = *w * keep + lr * reward * x;
            *w = if next.is_finite() { next } else { 0.0 };
        }
        arm.uses = arm.uses.saturating_add(1);
    }

    pub fn arm(&self, action: &str) -> Option<&Arm> {
        self.arms.get(action)
    }

    pub fn uses(&self, action: &str) -> u64 {
        self.arms.get(action).map_or(0, |a| a.uses)
    }

    pub fn arms(&self) -> impl Iterator<Item = (&str, &Arm)> {
        self.arms.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.arms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arms.is_empty()
    }

    /// Forget one arm, or every arm when `action` is `None`. Returns how many
    /// arms were removed.
    pub fn reset(&mut self, action: Option<&str>) -> usize {
        match action {
            Some(name) => usize::from(self.arms.remove(name).is_some()),
            None => {
                let n = self.arms.len();
                self.arms.clear();
                n
            }
        }
    }

    /// Zero out any non-finite weight loaded from storage.
    pub fn sanitize(&mut self) -> usize {
        let mut repaired = 0;
        for (action, arm) in &mut self.arms {
            for (feature, w) in &mut arm.weights {
                if !w.is_finite() {
                    warn!(action = %action, feature = %feature, "Non-finite bandit weight reset to 0");
                    *w = 0.0;
                    repaired += 1;
                }
            }
        }
        repaired
    }
}
