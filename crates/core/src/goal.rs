//! Goals: what the agent is working toward.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A goal the agent may pursue; higher tier means more important.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Goal {
    pub id: String,
    pub description: String,
    /// Importance tier, 1 (low) to 5 (critical)
    #[serde(default = "default_tier")]
    pub tier: u8,
    #[serde(default)]
    pub completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

fn default_tier() -> u8 {
    1
}

impl Goal {
    pub const MAX_TIER: u8 = 5;

    pub fn new(id: impl Into<String>, description: impl Into<String>, tier: u8) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            tier: tier.clamp(1, Self::MAX_TIER),
            completed: false,
            completed_at: None,
        }
    }

    /// Mark complete; returns false if it already was.
    pub fn complete(&mut self, at: DateTime<Utc>) -> bool {
        if self.completed {
            return false;
        }
        self.completed = true;
        self.completed_at = Some(at);
        true
    }

    /// Tier scaled into [0, 1].
    pub fn normalized_tier(&self) -> f64 {
        f64::from(self.tier.clamp(1, Self::MAX_TIER)) / f64::from(Self::MAX_TIER)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn complete_is_one_shot() {
        let mut goal = Goal::new("g1", "Write the weekly summary", 3);
        assert!(goal.complete(Utc::now()));
        assert!(!goal.complete(Utc::now()));
        assert!(goal.completed_at.is_some());
    }

    #[test]
    fn tier_is_clamped() {
        assert_eq!(Goal::new("g", "x", 9).tier, 5);
        assert!((Goal::new("g", "x", 0).normalized_tier() - 0.2).abs() < 1e-12);
    }
}
