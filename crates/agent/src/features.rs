//! Context features fed to the contextual bandit.
//!
//! A [`FeatureVector`] is a small named map of values in [-1, 1]. It always
//! carries a constant `bias` feature so every arm has an intercept.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use volition_core::affect::{AffectDimension, AffectState};
use volition_core::goal::Goal;

/// Named context features, clamped to [-1, 1].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureVector {
    values: BTreeMap<String, f64>,
}

impl FeatureVector {
    pub const BIAS: &'static str = "bias";

    /// An empty vector holding only the bias term.
    pub fn new() -> Self {
        let mut values = BTreeMap::new();
        values.insert(Self::BIAS.to_string(), 1.0);
        Self { values }
    }

    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        let mut vector = Self::new();
        for (name, value) in pairs {
            vector.set(name, value);
        }
        vector
    }

    /// Set a feature. Non-finite values become 0; the bias stays at 1.
    pub fn set(&mut self, name: impl Into<String>, value: f64) {
        let name = name.into();
        if name == Self::BIAS {
            return;
        }
        let value = if value.is_finite() { value.clamp(-1.0, 1.0) } else { 0.0 };
        self.values.insert(name, value);
    }

    /// A feature's value, 0 when absent.
    pub fn get(&self, name: &str) -> f64 {
        self.values.get(name).copied().unwrap_or(0.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.values.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Stable fingerprint of the coarse context plus the last action.
    ///
    /// Values are bucketed to tenths so small drifts still count as the
    /// same context.
    pub fn fingerprint(&self, last_action: Option<&str>) -> u64 {
        let mut hasher = Sha256::new();
        for (name, value) in &self.values {
            hasher.update(name.as_bytes());
            hasher.update((value * 10.0).round().to_le_bytes());
        }
        hasher.update(b"|");
        hasher.update(last_action.unwrap_or("").as_bytes());
        let digest = hasher.finalize();
        let mut head = [0u8; 8];
        head.copy_from_slice(&digest[..8]);
        u64::from_le_bytes(head)
    }
}

impl Default for FeatureVector {
    fn default() -> Self {
        Self::new()
    }
}

/// Build the feature vector for the current tick.
///
/// `agentic_mode` is set when the overlay is close to forcing an agentic
/// action, so arms can learn a preference for acting under that pressure.
pub fn extract(affect: &AffectState, goals: &[Goal], frustration: f64, agentic_mode: bool) -> FeatureVector {
    let mut features = FeatureVector::new();
    for dim in [
        AffectDimension::Motivation,
        AffectDimension::Curiosity,
        AffectDimension::Stability,
        AffectDimension::Stress,
        AffectDimension::Boredom,
    ] {
        features.set(dim.as_str(), affect.get(dim));
    }

    let goal_tier = goals
        .iter()
        .filter(|g| !g.completed)
        .map(Goal::normalized_tier)
        .fold(0.0, f64::max);
    features.set("goal_tier", goal_tier);
    features.set("frustration", frustration);
    if agentic_mode {
        features.set("agentic_mode", 1.0);
    }
    features
}
