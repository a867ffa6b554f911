//! Affect state: the bounded emotional scalars that bias action scoring.
//!
//! Every scalar lives in [0, 1]. Reads coerce non-finite values to the
//! dimension's neutral baseline so a corrupted persisted state can never
//! poison scoring arithmetic.

use serde::{Deserialize, Serialize};

/// One named affect scalar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AffectDimension {
    Motivation,
    Stability,
    Curiosity,
    Connection,
    Anxiety,
    Sadness,
    Boredom,
    Excitement,
    Stress,
    Overwhelm,
}

impl AffectDimension {
    pub const ALL: [AffectDimension; 10] = [
        Self::Motivation,
        Self::Stability,
        Self::Curiosity,
        Self::Connection,
        Self::Anxiety,
        Self::Sadness,
        Self::Boredom,
        Self::Excitement,
        Self::Stress,
        Self::Overwhelm,
    ];

    /// Resting level the scalar drifts back toward.
    pub fn baseline(self) -> f64 {
        match self {
            Self::Motivation | Self::Stability | Self::Curiosity | Self::Connection => 0.5,
            Self::Excitement => 0.4,
            Self::Boredom => 0.3,
            Self::Anxiety | Self::Sadness | Self::Stress => 0.2,
            Self::Overwhelm => 0.1,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Motivation => "motivation",
            Self::Stability => "stability",
            Self::Curiosity => "curiosity",
            Self::Connection => "connection",
            Self::Anxiety => "anxiety",
            Self::Sadness => "sadness",
            Self::Boredom => "boredom",
            Self::Excitement => "excitement",
            Self::Stress => "stress",
            Self::Overwhelm => "overwhelm",
        }
    }
}

impl std::fmt::Display for AffectDimension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The agent's current affect levels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AffectState {
    pub motivation: f64,
    pub stability: f64,
    pub curiosity: f64,
    pub connection: f64,
    pub anxiety: f64,
    pub sadness: f64,
    pub boredom: f64,
    pub excitement: f64,
    pub stress: f64,
    pub overwhelm: f64,
}

impl Default for AffectState {
    fn default() -> Self {
        Self {
            motivation: AffectDimension::Motivation.baseline(),
            stability: AffectDimension::Stability.baseline(),
            curiosity: AffectDimension::Curiosity.baseline(),
            connection: AffectDimension::Connection.baseline(),
            anxiety: AffectDimension::Anxiety.baseline(),
            sadness: AffectDimension::Sadness.baseline(),
            boredom: AffectDimension::Boredom.baseline(),
            excitement: AffectDimension::Excitement.baseline(),
            stress: AffectDimension::Stress.baseline(),
            overwhelm: AffectDimension::Overwhelm.baseline(),
        }
    }
}

impl AffectState {
    fn slot(&mut self, dim: AffectDimension) -> &mut f64 {
        match dim {
            AffectDimension::Motivation => &mut self.motivation,
            AffectDimension::Stability => &mut self.stability,
            AffectDimension::Curiosity => &mut self.curiosity,
            AffectDimension::Connection => &mut self.connection,
            AffectDimension::Anxiety => &mut self.anxiety,
            AffectDimension::Sadness => &mut self.sadness,
            AffectDimension::Boredom => &mut self.boredom,
            AffectDimension::Excitement => &mut self.excitement,
            AffectDimension::Stress => &mut self.stress,
            AffectDimension::Overwhelm => &mut self.overwhelm,
        }
    }

    /// Read a scalar, coerced into [0, 1].
    pub fn get(&self, dim: AffectDimension) -> f64 {
        let raw = match dim {
            AffectDimension::Motivation => self.motivation,
            AffectDimension::Stability => self.stability,
            AffectDimension::Curiosity => self.curiosity,
            AffectDimension::Connection => self.connection,
            AffectDimension::Anxiety => self.anxiety,
            AffectDimension::Sadness => self.sadness,
            AffectDimension::Boredom => self.boredom,
            AffectDimension::Excitement => self.excitement,
            AffectDimension::Stress => self.stress,
            AffectDimension::Overwhelm => self.overwhelm,
        };
        if raw.is_finite() {
            raw.clamp(0.0, 1.0)
        } else {
            dim.baseline()
        }
    }

    /// Overwrite a scalar (clamped).
    pub fn set(&mut self, dim: AffectDimension, value: f64) {
        let value = if value.is_finite() { value.clamp(0.0, 1.0) } else { dim.baseline() };
        *self.slot(dim) = value;
    }

    /// Add `delta` to a scalar and return the change actually applied after
    /// clamping.
    pub fn adjust(&mut self, dim: AffectDimension, delta: f64) -> f64 {
        if !delta.is_finite() {
            return 0.0;
        }
        let before = self.get(dim);
        let after = (before + delta).clamp(0.0, 1.0);
        *self.slot(dim) = after;
        after - before
    }

    /// Coerce every scalar into range; returns how many needed repair.
    pub fn sanitize(&mut self) -> usize {
        let mut repaired = 0;
        for dim in AffectDimension::ALL {
            let raw = *self.slot(dim);
            let fixed = self.get(dim);
            if raw.to_bits() != fixed.to_bits() {
                *self.slot(dim) = fixed;
                repaired += 1;
            }
        }
        repaired
    }

    /// Pull every scalar a fraction `rate` of the way back to its baseline.
    pub fn drift_toward_baseline(&mut self, rate: f64) {
        let rate = if rate.is_finite() { rate.clamp(0.0, 1.0) } else { 0.0 };
        for dim in AffectDimension::ALL {
            let current = self.get(dim);
            let next = current + (dim.baseline() - current) * rate;
            *self.slot(dim) = next;
        }
    }

    /// Mean arousal used by recovery models.
    pub fn arousal(&self) -> f64 {
        (self.get(AffectDimension::Motivation) + self.get(AffectDimension::Excitement)) / 2.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adjust_clamps_and_reports_applied_delta() {
        let mut affect = AffectState::default();
        let applied = affect.adjust(AffectDimension::Motivation, 0.8);
        assert!((applied - 0.5).abs() < 1e-12);
        assert!((affect.motivation - 1.0).abs() < 1e-12);
    }

    #[test]
    fn non_finite_values_read_as_baseline() {
        let mut affect = AffectState {
            curiosity: f64::NAN,
            stress: f64::INFINITY,
            ..AffectState::default()
        };
        assert!((affect.get(AffectDimension::Curiosity) - 0.5).abs() < 1e-12);
        assert!((affect.get(AffectDimension::Stress) - 0.2).abs() < 1e-12);
        assert_eq!(affect.sanitize(), 2);
        assert!(affect.curiosity.is_finite());
    }

    #[test]
    fn drift_moves_toward_baseline() {
        let mut affect = AffectState::default();
        affect.set(AffectDimension::Anxiety, 1.0);
        affect.drift_toward_baseline(0.5);
        assert!((affect.anxiety - 0.6).abs() < 1e-12);
    }

    #[test]
    fn missing_fields_take_defaults() {
        let affect: AffectState = serde_json::from_str(r#"{"curiosity":0.9}"#).unwrap();
        assert!((affect.curiosity - 0.9).abs() < 1e-12);
        assert!((affect.motivation - 0.5).abs() < 1e-12);
    }
}
