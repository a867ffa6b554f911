//! Data model for decision events, tick traces and run summaries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use volition_core::action::{ActionKind, GateState};

// ── Decision event ────────────────────────────────────────────────────────

/// A candidate as the gate scored it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredCandidate {
    pub name: String,
    pub score: f64,
    #[serde(default)]
    pub agentic: bool,
}

/// The single record emitted for every tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionEvent {
    pub id: String,
    pub tick: u64,
    pub timestamp: DateTime<Utc>,

    /// The executed action; `None` on a no-op tick.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chosen: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<ActionKind>,

    /// Whether stagnation forced the choice.
    #[serde(default)]
    pub forced: bool,

    /// Whether the action came off the pending queue instead of scoring.
    #[serde(default)]
    pub from_queue: bool,

    pub gate_state: GateState,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success: Option<bool>,

    /// Candidates in descending score order.
    #[serde(default)]
    pub candidates: Vec<ScoredCandidate>,

    /// Satisfaction fed to the bandit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reward: Option<f64>,

    /// Names on the pending queue after this tick, head first.
    #[serde(default)]
    pub followups: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rationale: Option<String>,
}

impl DecisionEvent {
    /// An event for a tick where nothing ran.
    pub fn idle(tick: u64) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            tick,
            timestamp: Utc::now(),
            chosen: None,
            kind: None,
            forced: false,
            from_queue: false,
            gate_state: GateState::Idle,
            success: None,
            candidates: Vec::new(),
            reward: None,
            followups: Vec::new(),
            rationale: None,
        }
    }

    /// An event for a tick that executed `chosen`.
    pub fn executed(tick: u64, chosen: impl Into<String>, kind: ActionKind, gate_state: GateState) -> Self {
        Self {
            chosen: Some(chosen.into()),
            kind: Some(kind),
            gate_state,
            ..Self::idle(tick)
        }
    }

    pub fn is_idle(&self) -> bool {
        self.chosen.is_none()
    }

    /// Top scored candidate, if scoring ran.
    pub fn top_candidate(&self) -> Option<&ScoredCandidate> {
        self.candidates.first()
    }
}

// ── Span ──────────────────────────────────────────────────────────────────

/// The pipeline stage a span covers.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SpanKind {
    /// Candidate proposal (generator or catalog fallback).
    Proposal,
    /// Catalog execution of the chosen action.
    Execution,
    /// Outcome classification.
    Judgment,
    /// Satisfaction scoring.
    Satisfaction,
    /// State load/save.
    Persistence,
}

impl std::fmt::Display for SpanKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Proposal => write!(f, "proposal"),
            Self::Execution => write!(f, "execution"),
            Self::Judgment => write!(f, "judgment"),
            Self::Satisfaction => write!(f, "satisfaction"),
            Self::Persistence => write!(f, "persistence"),
        }
    }
}

/// A single timed pipeline stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Span {
    pub id: String,
    pub kind: SpanKind,
    /// e.g. the action name or generator name
    pub label: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub duration_ms: Option<u64>,
    pub success: Option<bool>,
    /// Set when the stage fell back to its default.
    #[serde(default)]
    pub fallback: bool,
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl Span {
    pub fn new(kind: SpanKind, label: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            kind,
            label: label.into(),
            started_at: Utc::now(),
            ended_at: None,
            duration_ms: None,
            success: None,
            fallback: false,
            metadata: serde_json::Map::new(),
        }
    }

    /// Mark the span as ended with the given success status.
    pub fn end(&mut self, success: bool) {
        let now = Utc::now();
        self.ended_at = Some(now);
        self.duration_ms = Some(
            now.signed_duration_since(self.started_at)
                .num_milliseconds()
                .max(0) as u64,
        );
        self.success = Some(success);
    }

    /// End the span as a fallback to the stage's safe default.
    pub fn end_fallback(&mut self) {
        self.fallback = true;
        self.end(false);
    }

    pub fn with_meta(mut self, key: &str, value: serde_json::Value) -> Self {
        self.metadata.insert(key.to_string(), value);
        self
    }
}

// ── Trace ─────────────────────────────────────────────────────────────────

/// All spans of one tick.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trace {
    pub id: String,
    pub tick: u64,
    pub spans: Vec<Span>,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl Trace {
    pub fn new(tick: u64) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            tick,
            spans: Vec::new(),
            started_at: Utc::now(),
            ended_at: None,
        }
    }

    pub fn add_span(&mut self, span: Span) {
        self.spans.push(span);
    }

    pub fn end(&mut self) {
        self.ended_at = Some(Utc::now());
    }

    /// Total duration in milliseconds.
    pub fn total_duration_ms(&self) -> u64 {
        self.spans.iter().filter_map(|s| s.duration_ms).sum()
    }

    /// Number of stages that fell back.
    pub fn fallback_count(&self) -> usize {
        self.spans.iter().filter(|s| s.fallback).count()
    }

    pub fn spans_of(&self, kind: SpanKind) -> impl Iterator<Item = &Span> {
        self.spans.iter().filter(move |s| s.kind == kind)
    }
}

// ── Summary ───────────────────────────────────────────────────────────────

/// Counters over every decision recorded since the engine started.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub ticks: u64,
    pub idle_ticks: u64,
    pub executions: u64,
    pub successes: u64,
    pub forced: u64,
    pub from_queue: u64,
    pub retries: u64,
    pub escalations: u64,
    pub dropped: u64,
    pub fallbacks: u64,
    /// Mean reward over ticks that produced one.
    pub mean_reward: Option<f64>,
    /// Execution counts per action, most frequent first.
    pub by_action: Vec<(String, u64)>,
}

impl RunSummary {
    pub fn success_rate(&self) -> Option<f64> {
        (self.executions > 0).then(|| self.successes as f64 / self.executions as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idle_event_has_no_choice() {
        let event = DecisionEvent::idle(7);
        assert!(event.is_idle());
        assert_eq!(event.gate_state, GateState::Idle);
        let json = serde_json::to_string(&event).unwrap();
        assert!(!json.contains("chosen"));
        assert!(json.contains("\"gate_state\":\"idle\""));
    }

    #[test]
    fn executed_event_serializes_candidates_in_order() {
        let mut event = DecisionEvent::executed(3, "dream", ActionKind::Cognitive, GateState::Succeeded);
        event.candidates = vec![
            ScoredCandidate { name: "dream".into(), score: 0.82, agentic: false },
            ScoredCandidate { name: "log".into(), score: 0.5, agentic: false },
        ];
        event.followups = vec!["log".into()];
        assert_eq!(event.top_candidate().unwrap().name, "dream");

        let back: DecisionEvent = serde_json::from_str(&serde_json::to_string(&event).unwrap()).unwrap();
        assert_eq!(back, event);
    }

    #[test]
    fn span_lifecycle() {
        let mut span = Span::new(SpanKind::Judgment, "rule").with_meta("verdict", "retry".into());
        assert!(span.ended_at.is_none());
        span.end_fallback();
        assert!(span.fallback);
        assert_eq!(span.success, Some(false));
        assert!(span.duration_ms.is_some());
    }

    #[test]
    fn trace_counts_fallbacks() {
        let mut trace = Trace::new(1);
        let mut ok = Span::new(SpanKind::Proposal, "catalog");
        ok.end(true);
        let mut fb = Span::new(SpanKind::Satisfaction, "scorer");
        fb.end_fallback();
        trace.add_span(ok);
        trace.add_span(fb);
        assert_eq!(trace.fallback_count(), 1);
        assert_eq!(trace.spans_of(SpanKind::Proposal).count(), 1);
    }

    #[test]
    fn success_rate_none_without_executions() {
        assert!(RunSummary::default().success_rate().is_none());
    }
}
