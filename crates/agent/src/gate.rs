//! The action gate: scores candidates, decides whether anything runs, and
//! resolves executed actions into success, retry or escalation.
//!
//! ```text
//! Idle ─▶ Scoring ─▶ Executing ─▶ Succeeded
//!   ▲        │           │──────▶ Retrying   (requeued at the head)
//!   │        │           │──────▶ Escalating (clarification at the head)
//!   │        │           └──────▶ Dropped    (failed clarification)
//!   └────────┘ nothing above threshold and no stagnation
//! ```

use chrono::{DateTime, Utc};
use rand::Rng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::{debug, info, warn};
use volition_config::{FatigueConfig, GateConfig, NoveltyConfig};
use volition_core::action::{Action, GateState};
use volition_core::affect::{AffectDimension, AffectState};

use crate::bandit::ContextualBandit;
use crate::fatigue::{FatigueTracker, context_penalty};
use crate::features::FeatureVector;
use crate::judgment::Verdict;
use crate::novelty::novelty_score;
use crate::overlay::ContextOverlay;

// ── Pending queue ─────────────────────────────────────────────────────────

/// Actions waiting to run, head first. Persisted as one document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PendingQueue {
    items: VecDeque<Action>,
}

impl PendingQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert at the head. Returns whatever fell off the tail.
    pub fn push_front(&mut self, action: Action, capacity: usize) -> Option<Action> {
        self.items.push_front(action);
        if self.items.len() > capacity.max(1) {
            self.items.pop_back()
        } else {
            None
        }
    }

    /// Append at the tail; returns false when the queue is full.
    pub fn push_back(&mut self, action: Action, capacity: usize) -> bool {
        if self.items.len() >= capacity.max(1) {
            return false;
        }
        self.items.push_back(action);
        true
    }

    pub fn pop_front(&mut self) -> Option<Action> {
        self.items.pop_front()
    }

    pub fn peek(&self) -> Option<&Action> {
        self.items.front()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.items.iter().any(|a| a.name == name)
    }

    pub fn names(&self) -> Vec<String> {
        self.items.iter().map(|a| a.name.clone()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Action> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}

// ── Scoring ───────────────────────────────────────────────────────────────

/// Everything the gate reads while scoring one tick's candidates.
pub struct ScoringContext<'a> {
    pub affect: &'a AffectState,
    pub fatigue: &'a FatigueTracker,
    pub bandit: &'a ContextualBandit,
    pub features: &'a FeatureVector,
    pub overlay: &'a ContextOverlay,
    pub last_action: Option<&'a str>,
    /// Recent executed action names, oldest first
    pub recent: &'a [String],
    pub now: DateTime<Utc>,
}

/// The terms that make up a candidate's score.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ScoreBreakdown {
    pub urgency: f64,
    pub affect_bonus: f64,
    pub context_penalty: f64,
    pub fatigue: f64,
    pub novelty: f64,
    pub bandit: f64,
    pub stagnation_bonus: f64,
    pub frustration_penalty: f64,
    pub user_facing_bonus: f64,
    pub noise: f64,
    pub total: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScoredAction {
    pub action: Action,
    pub score: ScoreBreakdown,
}

impl ScoredAction {
    pub fn total(&self) -> f64 {
        self.score.total
    }
}

/// What the gate decided for a scored tick.
#[derive(Debug, Clone, PartialEq)]
pub enum Selection {
    Execute {
        chosen: ScoredAction,
        /// Stagnation overrode the threshold
        forced: bool,
        /// The other candidates, best first
        leftovers: Vec<ScoredAction>,
    },
    Idle,
}

pub struct ActionGate {
    config: GateConfig,
    fatigue: FatigueConfig,
    novelty: NoveltyConfig,
    noise: Option<Normal<f64>>,
}

impl ActionGate {
    pub fn new(config: GateConfig, fatigue: FatigueConfig, novelty: NoveltyConfig) -> Self {
        let noise = (config.noise_std.is_finite() && config.noise_std > 0.0)
            .then(|| Normal::new(0.0, config.noise_std).ok())
            .flatten();
        Self {
            config,
            fatigue,
            novelty,
            noise,
        }
    }

    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    pub fn novelty_config(&self) -> &NoveltyConfig {
        &self.novelty
    }

    fn is_passive(&self, name: &str) -> bool {
        self.config.passive_actions.iter().any(|p| p == name)
    }

    /// Score one candidate.
    pub fn score<R: Rng>(&self, action: &Action, ctx: &ScoringContext<'_>, rng: &mut R) -> ScoreBreakdown {
        let cfg = &self.config;
        let mut s = ScoreBreakdown {
            urgency: action.urgency,
            ..ScoreBreakdown::default()
        };

        s.context_penalty = context_penalty(ctx.affect, action.kind);
        s.affect_bonus = cfg.motivation_weight * ctx.affect.get(AffectDimension::Motivation)
            + cfg.curiosity_weight * ctx.affect.get(AffectDimension::Curiosity);
        s.fatigue = ctx
            .fatigue
            .penalty_at(&action.name, ctx.affect, ctx.now, &self.fatigue);
        s.novelty = novelty_score(&action.name, ctx.last_action, ctx.recent, ctx.affect, &self.novelty, rng);
        s.bandit = cfg.bandit_weight * ctx.bandit.score(&action.name, ctx.features);

        if action.is_agentic() {
            s.stagnation_bonus = (cfg.stagnation_bonus_per_cycle * f64::from(ctx.overlay.cycles_since_agentic))
                .min(cfg.stagnation_bonus_cap);
        }
        if self.is_passive(&action.name) {
            s.frustration_penalty = -cfg.frustration_penalty * ctx.overlay.frustration();
        }
        if action.user_facing {
            s.user_facing_bonus = cfg.user_facing_bonus;
        }
        if let Some(noise) = &self.noise {
            s.noise = noise.sample(rng);
        }

        let total = s.urgency
            + s.affect_bonus * (1.0 - s.context_penalty)
            + s.fatigue
            + s.novelty
            + s.bandit
            + s.stagnation_bonus
            + s.frustration_penalty
            + s.user_facing_bonus
            + s.noise;
        s.total = if total.is_finite() { total } else { f64::MIN };
        s
    }

    /// Score every candidate; best first, ties in proposal order.
    pub fn rank<R: Rng>(&self, candidates: Vec<Action>, ctx: &ScoringContext<'_>, rng: &mut R) -> Vec<ScoredAction> {
        let mut ranked: Vec<ScoredAction> = candidates
            .into_iter()
            .map(|action| {
                let score = self.score(&action, ctx, rng);
                ScoredAction { action, score }
            })
            .collect();
        ranked.sort_by(|a, b| b.total().total_cmp(&a.total()));
        ranked
    }

    /// Decide what, if anything, runs this tick.
    ///
    /// When the agent is stagnant or has gone too long without acting, the
    /// best agentic candidate is forced regardless of its score, preferring
    /// one that differs from the last action. Otherwise the best candidate
    /// runs when it clears the confidence threshold. Under pressure with no
    /// agentic candidate and nothing above the threshold, a random candidate
    /// is forced.
    pub fn select<R: Rng>(
        &self,
        mut ranked: Vec<ScoredAction>,
        stagnant: bool,
        overlay: &ContextOverlay,
        last_action: Option<&str>,
        rng: &mut R,
    ) -> Selection {
        if ranked.is_empty() {
            return Selection::Idle;
        }

        let pressured = stagnant || overlay.past_threshold(&self.config);
        let fresh = |s: &ScoredAction| Some(s.action.name.as_str()) != last_action;

        let agentic = ranked
            .iter()
            .position(|s| s.action.is_agentic() && fresh(s))
            .or_else(|| ranked.iter().position(|s| s.action.is_agentic()));
        let forced_index = match agentic {
            Some(index) if pressured => Some(index),
            _ if ranked[0].total() >= self.config.confidence_threshold => {
                let chosen = ranked.remove(0);
                return Selection::Execute {
                    chosen,
                    forced: false,
                    leftovers: ranked,
                };
            }
            _ if pressured => {
                let others: Vec<usize> = (0..ranked.len()).filter(|&i| fresh(&ranked[i])).collect();
                Some(if others.is_empty() {
                    rng.random_range(0..ranked.len())
                } else {
                    others[rng.random_range(0..others.len())]
                })
            }
            _ => None,
        };

        let Some(index) = forced_index else {
            debug!(best = ranked[0].total(), "Nothing cleared the threshold");
            return Selection::Idle;
        };
        let chosen = ranked.remove(index);
        info!(
            action = %chosen.action.name,
            stagnant,
            cycles = overlay.cycles_since_agentic,
            "Forcing action to break stagnation"
        );
        Selection::Execute {
            chosen,
            forced: true,
            leftovers: ranked,
        }
    }

    /// Park the non-chosen candidates at the tail, best first. Names
    /// already queued are skipped. Returns how many were queued.
    pub fn enqueue_leftovers(&self, queue: &mut PendingQueue, leftovers: Vec<ScoredAction>, chosen: &str) -> usize {
        let mut queued = 0;
        for scored in leftovers {
            let name = scored.action.name.clone();
            if name == chosen || queue.contains(&name) {
                continue;
            }
            if queue.push_back(scored.action, self.config.pending_capacity) {
                queued += 1;
            } else {
                debug!(action = %name, "Pending queue full, candidate discarded");
            }
        }
        queued
    }

    /// The clarification request that replaces a failing action.
    pub fn clarification_for(&self, action: &Action, reason: &str) -> Action {
        Action::new(self.config.clarification_action.clone())
            .agentic()
            .with_urgency(1.0)
            .user_facing(true)
            .with_payload(serde_json::json!({
                "regarding": action.name,
                "question": format!(
                    "I could not complete '{}' after {} attempt(s): {}. How should I proceed?",
                    action.name,
                    action.retries + 1,
                    reason
                ),
            }))
            .with_rationale(format!("escalating repeated failure of {}", action.name))
    }

    /// Resolve an executed action against the pending queue.
    pub fn resolve(&self, queue: &mut PendingQueue, action: &Action, verdict: Verdict, reason: &str) -> GateState {
        let capacity = self.config.pending_capacity;
        let is_clarification = action.name == self.config.clarification_action;

        let state = match verdict {
            Verdict::Success => GateState::Succeeded,
            _ if is_clarification => {
                warn!(action = %action.name, "Clarification request failed, dropping it");
                GateState::Dropped
            }
            Verdict::Retry if action.retries.saturating_add(1) < self.config.retry_ceiling => {
                if let Some(lost) = queue.push_front(action.retried(), capacity) {
                    warn!(action = %lost.name, "Pending queue overflow, dropped tail entry");
                }
                GateState::Retrying
            }
            Verdict::Retry | Verdict::Escalate => {
                if let Some(lost) = queue.push_front(self.clarification_for(action, reason), capacity) {
                    warn!(action = %lost.name, "Pending queue overflow, dropped tail entry");
                }
                GateState::Escalating
            }
        };
        debug!(action = %action.name, retries = action.retries, %state, "Gate resolved");
        state
    }
}
