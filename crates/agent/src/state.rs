//! Persisted agent state: one struct per tick, loaded at startup and saved
//! artifact by artifact.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use volition_core::action::ActionKind;
use volition_core::affect::AffectState;
use volition_core::goal::Goal;
use volition_core::store::{self, StateStore, keys};

use crate::bandit::ContextualBandit;
use crate::fatigue::FatigueTracker;
use crate::gate::PendingQueue;
use crate::novelty::StagnationDetector;
use crate::overlay::ContextOverlay;
use crate::reward::RewardTrace;

/// Loop bookkeeping carried across ticks.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoopMeta {
    pub tick: u64,
    pub last_action: Option<String>,
    /// Consecutive executions of `last_action`
    pub repeat_streak: u32,
    pub last_tick_at: Option<DateTime<Utc>>,
    pub stagnation: StagnationDetector,
}

impl LoopMeta {
    /// Note an execution of `action`.
    pub fn record_execution(&mut self, action: &str) {
        if self.last_action.as_deref() == Some(action) {
            self.repeat_streak = self.repeat_streak.saturating_add(1);
        } else {
            self.last_action = Some(action.to_string());
            self.repeat_streak = 1;
        }
    }
}

/// One line of the decision history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub tick: u64,
    pub timestamp: DateTime<Utc>,
    pub action: String,
    pub kind: ActionKind,
    pub success: bool,
    #[serde(default)]
    pub forced: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rationale: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub satisfaction: Option<f64>,
}

/// Every document the loop keeps between ticks.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AgentState {
    pub bandit: ContextualBandit,
    pub fatigue: FatigueTracker,
    pub affect: AffectState,
    pub pending: PendingQueue,
    pub trace: RewardTrace,
    pub meta: LoopMeta,
    pub overlay: ContextOverlay,
    pub goals: Vec<Goal>,
}

impl AgentState {
    /// Load every artifact. Missing or malformed ones start fresh.
    pub async fn load(store: &dyn StateStore) -> Self {
        let mut state = Self {
            bandit: store::load_or_default(store, keys::BANDIT).await,
            fatigue: store::load_or_default(store, keys::FATIGUE).await,
            affect: store::load_or_default(store, keys::AFFECT).await,
            pending: store::load_or_default(store, keys::PENDING).await,
            trace: store::load_or_default(store, keys::REWARD_TRACE).await,
            meta: store::load_or_default(store, keys::LOOP_META).await,
            overlay: store::load_or_default(store, keys::OVERLAY).await,
            goals: store::load_or_default(store, keys::GOALS).await,
        };

        let repaired = state.affect.sanitize() + state.bandit.sanitize();
        if repaired > 0 {
            warn!(repaired, "Repaired non-finite values in loaded state");
        }
        debug!(
            tick = state.meta.tick,
            arms = state.bandit.len(),
            pending = state.pending.len(),
            "Agent state loaded"
        );
        state
    }

    /// Save every artifact. Failures are logged and counted; the rest are
    /// still written.
    pub async fn save(&self, store: &dyn StateStore) -> usize {
        let results = [
            (keys::BANDIT, store::save(store, keys::BANDIT, &self.bandit).await),
            (keys::FATIGUE, store::save(store, keys::FATIGUE, &self.fatigue).await),
            (keys::AFFECT, store::save(store, keys::AFFECT, &self.affect).await),
            (keys::PENDING, store::save(store, keys::PENDING, &self.pending).await),
            (keys::REWARD_TRACE, store::save(store, keys::REWARD_TRACE, &self.trace).await),
            (keys::LOOP_META, store::save(store, keys::LOOP_META, &self.meta).await),
            (keys::OVERLAY, store::save(store, keys::OVERLAY, &self.overlay).await),
            (keys::GOALS, store::save(store, keys::GOALS, &self.goals).await),
        ];

        let mut failures = 0;
        for (key, result) in results {
            if let Err(e) = result {
                warn!(key, error = %e, "Failed to persist state");
                failures += 1;
            }
        }
        failures
    }

    /// Mark a goal complete. Returns false for unknown or finished goals.
    pub fn complete_goal(&mut self, goal_id: &str, at: DateTime<Utc>) -> bool {
        self.goals
            .iter_mut()
            .find(|g| g.id == goal_id)
            .is_some_and(|g| g.complete(at))
    }

    /// Add configured goals that are not tracked yet.
    pub fn seed_goals(&mut self, goals: impl IntoIterator<Item = Goal>) -> usize {
        let mut added = 0;
        for goal in goals {
            if !self.goals.iter().any(|g| g.id == goal.id) {
                self.goals.push(goal);
                added += 1;
            }
        }
        added
    }
}

/// Executed action names from the newest `n` history entries, oldest first.
pub async fn recent_actions(store: &dyn StateStore, n: usize) -> Vec<String> {
    store::load_tail::<HistoryEntry>(store, keys::HISTORY, n)
        .await
        .into_iter()
        .map(|entry| entry.action)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::FeatureVector;
    use volition_core::action::Action;
    use volition_store::MemoryStore;

    #[test]
    fn repeat_streak_counts_consecutive_runs() {
        let mut meta = LoopMeta::default();
        meta.record_execution("plan");
        meta.record_execution("plan");
        assert_eq!(meta.repeat_streak, 2);
        meta.record_execution("log");
        assert_eq!(meta.repeat_streak, 1);
        assert_eq!(meta.last_action.as_deref(), Some("log"));
    }

    #[tokio::test]
    async fn save_then_load_restores_everything() {
        let store = MemoryStore::new();
        let mut state = AgentState::default();
        state.bandit.update("plan", &FeatureVector::new(), 0.8, 0.1, 0.0);
        state.affect.motivation = 0.9;
        state.pending.push_back(Action::new("log"), 16);
        state.meta.tick = 12;
        state.overlay.cycles_since_agentic = 3;
        state.seed_goals([Goal::new("g1", "Write notes", 2)]);

        assert_eq!(state.save(&store).await, 0);
        let loaded = AgentState::load(&store).await;
        assert_eq!(loaded, state);
    }

    #[tokio::test]
    async fn corrupted_documents_start_fresh() {
        let store = MemoryStore::new();
        store.put(keys::BANDIT, serde_json::json!("not a bandit")).await.unwrap();
        store
            .put(keys::AFFECT, serde_json::json!({"motivation": 7.0}))
            .await
            .unwrap();
        let state = AgentState::load(&store).await;
        assert!(state.bandit.is_empty());
        assert_eq!(state.affect.motivation, 1.0);
    }

    #[tokio::test]
    async fn goals_seed_once_and_complete_once() {
        let mut state = AgentState::default();
        assert_eq!(state.seed_goals([Goal::new("g1", "A", 1), Goal::new("g2", "B", 2)]), 2);
        assert_eq!(state.seed_goals([Goal::new("g1", "A again", 1)]), 0);
        assert!(state.complete_goal("g1", Utc::now()));
        assert!(!state.complete_goal("g1", Utc::now()));
        assert!(!state.complete_goal("nope", Utc::now()));
    }

    #[tokio::test]
    async fn recent_actions_reads_history_tail() {
        let store = MemoryStore::new();
        for (tick, name) in ["plan", "log", "speak"].iter().enumerate() {
            let entry = HistoryEntry {
                tick: tick as u64,
                timestamp: Utc::now(),
                action: name.to_string(),
                kind: ActionKind::Cognitive,
                success: true,
                forced: false,
                rationale: None,
                satisfaction: None,
            };
            store::append(&store, keys::HISTORY, &entry).await.unwrap();
        }
        assert_eq!(recent_actions(&store, 2).await, vec!["log", "speak"]);
    }
}
