//! Per-action fatigue with affect-modulated recovery.
//!
//! Every successful execution adds to an action's fatigue score (0 to 10).
//! Between uses the score decays exponentially. The decay rate falls as
//! fatigue grows and rises with arousal; a long idle gap halves whatever
//! is left. The gate turns the decayed score into a penalty in
//! `[-max_penalty, 0]`.

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};
use tracing::debug;
use volition_config::FatigueConfig;
use volition_core::action::ActionKind;
use volition_core::affect::{AffectDimension, AffectState};

pub const MAX_FATIGUE: f64 = 10.0;

/// Fatigue bookkeeping for one action.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FatigueRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_used: Option<DateTime<Utc>>,
    #[serde(default)]
    pub uses: u64,
    /// Score as of `last_used`
    #[serde(default)]
    pub score: f64,
    /// Recent (timestamp, score after use) pairs, oldest first
    #[serde(default)]
    pub history: VecDeque<(DateTime<Utc>, f64)>,
}

/// Fatigue records for every action, persisted as one document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FatigueTracker {
    records: BTreeMap<String, FatigueRecord>,
}

fn stored_score(score: f64) -> f64 {
    if score.is_finite() { score.clamp(0.0, MAX_FATIGUE) } else { 0.0 }
}

/// Score after decaying `record` from its last use until `now`.
fn decayed(record: &FatigueRecord, affect: &AffectState, now: DateTime<Utc>, config: &FatigueConfig) -> f64 {
    let score = stored_score(record.score);
    let Some(last) = record.last_used else {
        return score;
    };
    let minutes = (now - last).num_milliseconds().max(0) as f64 / 60_000.0;

    let arousal = 0.5 + affect.arousal();
    let rate = config.base_decay_rate.max(0.0) / (1.0 + score.ln_1p()) * arousal;
    let mut value = score * (-rate * minutes).exp();
    if minutes >= config.idle_recovery_minutes {
        value *= config.idle_recovery_factor.clamp(0.0, 1.0);
    }
    stored_score(value)
}

impl FatigueTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, action: &str) -> Option<&FatigueRecord> {
        self.records.get(action)
    }

    /// Decayed fatigue of `action` at `now`, 0 for actions never used.
    pub fn level(&self, action: &str, affect: &AffectState, now: DateTime<Utc>, config: &FatigueConfig) -> f64 {
        self.records
            .get(action)
            .map_or(0.0, |record| decayed(record, affect, now, config))
    }

    /// Scoring penalty in `[-max_penalty, 0]`.
    pub fn penalty_at(&self, action: &str, affect: &AffectState, now: DateTime<Utc>, config: &FatigueConfig) -> f64 {
        -config.max_penalty.abs() * self.level(action, affect, now, config) / MAX_FATIGUE
    }

    /// Record a use: decay to `now`, then add one increment (or the smaller
    /// push-through increment, occasionally). Returns the new score.
    pub fn touch<R: Rng>(
        &mut self,
        action: &str,
        affect: &AffectState,
        now: DateTime<Utc>,
        config: &FatigueConfig,
        rng: &mut R,
    ) -> f64 {
        let record = self.records.entry(action.to_string()).or_default();
        let base = decayed(record, affect, now, config);

        let push_through = rng.random_bool(config.push_through_probability.clamp(0.0, 1.0));
        let increment = if push_through {
            config.push_through_increment
        } else {
            config.increment
        };
        let score = stored_score(base + increment);

        record.score = score;
        record.uses = record.uses.saturating_add(1);
        record.last_used = Some(now);
        record.history.push_back((now, score));
        while record.history.len() > config.history_len {
            record.history.pop_front();
        }

        debug!(action, score, push_through, "Fatigue updated");
        score
    }

    /// Forget one action, or all of them.
    pub fn reset(&mut self, action: Option<&str>) -> usize {
        match action {
            Some(name) => usize::from(self.records.remove(name).is_some()),
            None => {
                let n = self.records.len();
                self.records.clear();
                n
            }
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FatigueRecord)> {
        self.records.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// Penalty from stress and overwhelm, in [0, 1]. Agentic actions feel the
/// full load; cognitive ones half of it.
pub fn context_penalty(affect: &AffectState, kind: ActionKind) -> f64 {
    let load = (affect.get(AffectDimension::Stress) + affect.get(AffectDimension::Overwhelm)) / 2.0;
    let scale = if kind.is_agentic() { 1.0 } else { 0.5 };
    (load * scale).clamp(0.0, 1.0)
}
