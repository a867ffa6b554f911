//! Reward propagation: prediction-error signals mapped onto affect.
//!
//! A release compares the actual outcome with the expectation, scales the
//! positive surprise by effort, and nudges the affect dimension the signal
//! targets. Every release is kept on a bounded trace whose strengths decay
//! over time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::debug;
use volition_config::RewardConfig;
use volition_core::affect::{AffectDimension, AffectState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalType {
    Dopamine,
    Serotonin,
    Novelty,
    Connection,
}

impl SignalType {
    /// The affect dimension this signal moves.
    pub fn target(self) -> AffectDimension {
        match self {
            Self::Dopamine => AffectDimension::Motivation,
            Self::Serotonin => AffectDimension::Stability,
            Self::Novelty => AffectDimension::Curiosity,
            Self::Connection => AffectDimension::Connection,
        }
    }

    /// Signals amplified when released phasically.
    pub fn is_phasic_sensitive(self) -> bool {
        matches!(self, Self::Dopamine | Self::Novelty)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalMode {
    /// A sharp burst tied to one event
    Phasic,
    /// Background level
    #[default]
    Tonic,
}

/// A reward to release.
#[derive(Debug, Clone, PartialEq)]
pub struct RewardEvent {
    pub signal: SignalType,
    pub actual: f64,
    pub expected: f64,
    pub effort: f64,
    pub mode: SignalMode,
    pub tags: Vec<String>,
}

impl RewardEvent {
    pub fn new(signal: SignalType, actual: f64, expected: f64) -> Self {
        Self {
            signal,
            actual,
            expected,
            effort: 0.0,
            mode: SignalMode::Tonic,
            tags: Vec::new(),
        }
    }

    pub fn with_effort(mut self, effort: f64) -> Self {
        self.effort = effort;
        self
    }

    pub fn phasic(mut self) -> Self {
        self.mode = SignalMode::Phasic;
        self
    }

    pub fn tagged(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }
}

/// One remembered release.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceEntry {
    pub signal: SignalType,
    pub strength: f64,
    pub prediction_error: f64,
    /// Inputs as received, with non-finite values zeroed.
    #[serde(default)]
    pub actual: f64,
    #[serde(default)]
    pub expected: f64,
    #[serde(default)]
    pub effort: f64,
    #[serde(default)]
    pub mode: SignalMode,
    #[serde(default)]
    pub tags: Vec<String>,
    pub timestamp: DateTime<Utc>,
}

/// Bounded release history, persisted as one document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RewardTrace {
    pub entries: VecDeque<TraceEntry>,
    pub last_decay: Option<DateTime<Utc>>,
}

impl RewardTrace {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum of current strengths for one signal.
    pub fn level(&self, signal: SignalType) -> f64 {
        self.entries
            .iter()
            .filter(|e| e.signal == signal)
            .map(|e| e.strength)
            .sum()
    }
}

/// The change a release made.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AffectDelta {
    pub dimension: AffectDimension,
    /// Delta before clamping
    pub requested: f64,
    /// Delta actually applied
    pub applied: f64,
}

fn finite(value: f64) -> f64 {
    if value.is_finite() { value } else { 0.0 }
}

pub struct RewardPropagator {
    config: RewardConfig,
}

impl RewardPropagator {
    pub fn new(config: RewardConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RewardConfig {
        &self.config
    }

    fn gain(&self, signal: SignalType) -> f64 {
        match signal {
            SignalType::Dopamine => self.config.dopamine_gain,
            SignalType::Serotonin => self.config.serotonin_gain,
            SignalType::Novelty => self.config.novelty_gain,
            SignalType::Connection => self.config.connection_gain,
        }
    }

    /// Release a reward: apply the surprise to affect and remember it.
    pub fn release(
        &self,
        affect: &mut AffectState,
        trace: &mut RewardTrace,
        event: &RewardEvent,
        now: DateTime<Utc>,
    ) -> AffectDelta {
        let actual = finite(event.actual);
        let expected = finite(event.expected);
        let prediction_error = actual - expected;
        let effort = finite(event.effort).clamp(0.0, 1.0);
        let strength = prediction_error.max(0.0) * (1.0 + effort);

        let multiplier = if event.mode == SignalMode::Phasic && event.signal.is_phasic_sensitive() {
            self.config.phasic_multiplier
        } else {
            1.0
        };
        let requested = strength * self.gain(event.signal) * multiplier;
        let dimension = event.signal.target();
        let applied = affect.adjust(dimension, requested);

        trace.entries.push_back(TraceEntry {
            signal: event.signal,
            strength,
            prediction_error,
            actual,
            expected,
            effort: finite(event.effort),
            mode: event.mode,
            tags: event.tags.clone(),
            timestamp: now,
        });
        while trace.entries.len() > self.config.trace_capacity {
            trace.entries.pop_front();
        }

        debug!(signal = ?event.signal, prediction_error, applied, "Reward released");
        AffectDelta {
            dimension,
            requested,
            applied,
        }
    }

    /// Decay trace strengths for the time since the last pass. Stable mood
    /// holds signals longer.
    pub fn decay(&self, trace: &mut RewardTrace, affect: &AffectState, now: DateTime<Utc>) {
        let Some(last) = trace.last_decay else {
            trace.last_decay = Some(now);
            return;
        };
        let minutes = (now - last).num_milliseconds().max(0) as f64 / 60_000.0;
        let stability = affect.get(AffectDimension::Stability);
        let k = self.config.trace_decay_per_minute.max(0.0) * (1.5 - stability);
        let factor = (-k * minutes).exp();
        for entry in &mut trace.entries {
            entry.strength = finite(entry.strength * factor);
        }
        trace.last_decay = Some(now);
    }

    /// Pull affect back toward its resting levels.
    pub fn drift(&self, affect: &mut AffectState) {
        affect.drift_toward_baseline(self.config.affect_drift);
    }
}
