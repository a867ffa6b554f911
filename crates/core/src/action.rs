//! Actions: the unit of choice for the decision loop.
//!
//! An [`Action`] is constructed per tick (by the proposer or the fixed
//! catalog), optionally parked on the pending queue, and eventually handed
//! to the catalog for execution, which yields an [`ActionOutcome`].

use serde::{Deserialize, Serialize};

/// Whether an action changes external state or only internal cognition.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    /// Purely internal (reflection, planning, dreaming).
    #[default]
    Cognitive,
    /// State-changing in the world (speaking, writing, asking the user).
    Agentic,
}

impl ActionKind {
    pub fn from_agentic(agentic: bool) -> Self {
        if agentic { Self::Agentic } else { Self::Cognitive }
    }

    pub fn is_agentic(self) -> bool {
        matches!(self, Self::Agentic)
    }
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cognitive => write!(f, "cognitive"),
            Self::Agentic => write!(f, "agentic"),
        }
    }
}

/// States of the action gate. A tick ends in `Idle` (nothing ran) or in one
/// of the four resolution states.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateState {
    #[default]
    Idle,
    Scoring,
    Executing,
    Succeeded,
    Retrying,
    Escalating,
    Dropped,
}

impl GateState {
    /// Whether an action was executed to reach this state.
    pub fn executed(self) -> bool {
        matches!(
            self,
            Self::Succeeded | Self::Retrying | Self::Escalating | Self::Dropped
        )
    }
}

impl std::fmt::Display for GateState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Scoring => "scoring",
            Self::Executing => "executing",
            Self::Succeeded => "succeeded",
            Self::Retrying => "retrying",
            Self::Escalating => "escalating",
            Self::Dropped => "dropped",
        };
        f.write_str(s)
    }
}

/// A candidate or queued action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    /// Catalog name of the behavior to run (e.g. "reflect", "speak")
    pub name: String,

    /// Cognitive vs. agentic
    #[serde(default)]
    pub kind: ActionKind,

    /// Free-form arguments passed to the behavior
    #[serde(default)]
    pub payload: serde_json::Value,

    /// Base urgency in [0, 1]
    #[serde(default)]
    pub urgency: f64,

    /// Goal this action works toward, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub goal_ref: Option<String>,

    /// Direct response to the user
    #[serde(default)]
    pub user_facing: bool,

    /// How many times this action has already been retried
    #[serde(default)]
    pub retries: u32,

    /// Why the proposer suggested it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rationale: Option<String>,
}

impl Action {
    /// Create a cognitive action with no payload.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: ActionKind::Cognitive,
            payload: serde_json::Value::Null,
            urgency: 0.0,
            goal_ref: None,
            user_facing: false,
            retries: 0,
            rationale: None,
        }
    }

    pub fn agentic(mut self) -> Self {
        self.kind = ActionKind::Agentic;
        self
    }

    pub fn with_kind(mut self, kind: ActionKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_urgency(mut self, urgency: f64) -> Self {
        self.urgency = if urgency.is_finite() { urgency.clamp(0.0, 1.0) } else { 0.0 };
        self
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }

    pub fn with_goal(mut self, goal_id: impl Into<String>) -> Self {
        self.goal_ref = Some(goal_id.into());
        self
    }

    pub fn with_rationale(mut self, rationale: impl Into<String>) -> Self {
        self.rationale = Some(rationale.into());
        self
    }

    pub fn user_facing(mut self, user_facing: bool) -> Self {
        self.user_facing = user_facing;
        self
    }

    pub fn is_agentic(&self) -> bool {
        self.kind.is_agentic()
    }

    /// The same action with its retry counter bumped.
    pub fn retried(&self) -> Self {
        let mut next = self.clone();
        next.retries = next.retries.saturating_add(1);
        next
    }
}

/// What happened when an action ran.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionOutcome {
    /// Whether the behavior reports success
    pub success: bool,

    /// Human-readable output or failure reason
    pub output: String,

    /// Optional structured data
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl ActionOutcome {
    pub fn ok(output: impl Into<String>) -> Self {
        Self {
            success: true,
            output: output.into(),
            data: None,
        }
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        Self {
            success: false,
            output: reason.into(),
            data: None,
        }
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }
}
