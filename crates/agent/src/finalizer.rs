//! Closing out a tick: satisfaction, history, bandit learning and the
//! decision event.

use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, warn};
use volition_config::{BanditConfig, RewardConfig};
use volition_core::action::{Action, ActionOutcome, GateState};
use volition_core::store::{self, StateStore, keys};
use volition_telemetry::{DecisionEvent, ScoredCandidate};

use crate::features::FeatureVector;
use crate::judgment::{SatisfactionScorer, Verdict};
use crate::state::{AgentState, HistoryEntry};

/// Everything known about an executed action at the end of its tick.
pub struct ExecutedTick<'a> {
    pub tick: u64,
    pub action: &'a Action,
    pub outcome: &'a ActionOutcome,
    pub verdict: Verdict,
    pub gate_state: GateState,
    pub forced: bool,
    pub from_queue: bool,
    pub candidates: Vec<ScoredCandidate>,
    pub features: &'a FeatureVector,
}

/// Result of finalizing an executed tick.
#[derive(Debug, Clone)]
pub struct Finalized {
    pub event: DecisionEvent,
    pub satisfaction: f64,
    /// The scorer failed and the neutral value was used
    pub scorer_fallback: bool,
}

pub struct DecisionFinalizer {
    scorer: Arc<dyn SatisfactionScorer>,
    reward: RewardConfig,
    bandit: BanditConfig,
    history_max_entries: usize,
}

impl DecisionFinalizer {
    pub fn new(
        scorer: Arc<dyn SatisfactionScorer>,
        reward: RewardConfig,
        bandit: BanditConfig,
        history_max_entries: usize,
    ) -> Self {
        Self {
            scorer,
            reward,
            bandit,
            history_max_entries,
        }
    }

    pub fn scorer_name(&self) -> &str {
        self.scorer.name()
    }

    /// Score, record, learn, and build the decision event.
    ///
    /// Satisfaction is the scorer's answer (neutral on failure) plus a bonus
    /// for agentic actions and another for accepted outcomes, clamped to
    /// [0, 1]. It becomes the bandit's reward. The bandit is saved right
    /// away; the rest of the state is saved by the caller.
    pub async fn finalize(&self, store: &dyn StateStore, state: &mut AgentState, tick: ExecutedTick<'_>) -> Finalized {
        let action = tick.action;
        let rationale = action
            .rationale
            .clone()
            .unwrap_or_else(|| format!("{} selected by the gate", action.name));

        let (base, scorer_fallback) = match self.scorer.score(action, &rationale, tick.outcome).await {
            Ok(score) => (score, false),
            Err(e) => {
                warn!(action = %action.name, error = %e, "Satisfaction scoring failed, using neutral value");
                (self.reward.neutral_satisfaction, true)
            }
        };
        let mut satisfaction = base;
        if action.is_agentic() {
            satisfaction += self.reward.agentic_bonus;
        }
        if tick.verdict == Verdict::Success {
            satisfaction += self.reward.acceptance_bonus;
        }
        let satisfaction = if satisfaction.is_finite() {
            satisfaction.clamp(0.0, 1.0)
        } else {
            self.reward.neutral_satisfaction
        };

        let entry = HistoryEntry {
            tick: tick.tick,
            timestamp: Utc::now(),
            action: action.name.clone(),
            kind: action.kind,
            success: tick.outcome.success,
            forced: tick.forced,
            rationale: Some(rationale.clone()),
            satisfaction: Some(satisfaction),
        };
        self.append_history(store, &entry).await;

        state.bandit.update(
            &action.name,
            tick.features,
            satisfaction,
            self.bandit.learning_rate,
            self.bandit.decay,
        );
        if let Err(e) = store::save(store, keys::BANDIT, &state.bandit).await {
            warn!(error = %e, "Failed to persist bandit");
        }

        state.meta.record_execution(&action.name);

        let mut event = DecisionEvent::executed(tick.tick, &action.name, action.kind, tick.gate_state);
        event.forced = tick.forced;
        event.from_queue = tick.from_queue;
        event.success = Some(tick.outcome.success);
        event.candidates = tick.candidates;
        event.reward = Some(satisfaction);
        event.followups = state.pending.names();
        event.rationale = Some(rationale);

        debug!(action = %action.name, satisfaction, state = %tick.gate_state, "Tick finalized");
        Finalized {
            event,
            satisfaction,
            scorer_fallback,
        }
    }

    /// Close a tick where nothing ran.
    pub fn finalize_idle(&self, state: &AgentState, tick: u64, candidates: Vec<ScoredCandidate>) -> DecisionEvent {
        let mut event = DecisionEvent::idle(tick);
        event.candidates = candidates;
        event.followups = state.pending.names();
        event
    }

    async fn append_history(&self, store: &dyn StateStore, entry: &HistoryEntry) {
        if let Err(e) = store::append(store, keys::HISTORY, entry).await {
            warn!(error = %e, "Failed to append decision history");
            return;
        }
        match store.trim(keys::HISTORY, self.history_max_entries).await {
            Ok(0) => {}
            Ok(dropped) => debug!(dropped, "Trimmed decision history"),
            Err(e) => warn!(error = %e, "Failed to trim decision history"),
        }
    }
}
