//! The Volition decision loop.
//!
//! Each tick runs one pass of **Propose → Score → Gate → Act → Judge → Learn**:
//!
//! 1. **Propose** candidate actions, through the text generator when one is
//!    configured and from the catalog otherwise
//! 2. **Score** each candidate: urgency, affect, fatigue, novelty, the
//!    contextual bandit, stagnation pressure and a little noise
//! 3. **Gate**: run the best candidate if it clears the confidence threshold,
//!    force an agentic one when the agent has stalled, otherwise idle
//! 4. **Act** through the action catalog
//! 5. **Judge** the outcome, retrying and finally escalating to the operator
//! 6. **Learn**: release rewards into affect, score satisfaction, update the
//!    bandit and persist everything
//!
//! Pending work (retries, clarifications, runner-up candidates) always runs
//! before anything new is proposed.

pub mod bandit;
pub mod features;
pub mod fatigue;
pub mod finalizer;
pub mod gate;
pub mod judgment;
pub mod loop_runner;
pub mod novelty;
pub mod overlay;
pub mod proposer;
pub mod reward;
pub mod state;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use bandit::{Arm, ContextualBandit};
pub use fatigue::{FatigueRecord, FatigueTracker};
pub use features::FeatureVector;
pub use finalizer::{DecisionFinalizer, ExecutedTick, Finalized};
pub use gate::{ActionGate, PendingQueue, ScoreBreakdown, ScoredAction, ScoringContext, Selection};
pub use judgment::{GeneratorJudge, GeneratorScorer, Judge, RuleJudge, RuleScorer, SatisfactionScorer, Verdict};
pub use loop_runner::{AgentLoop, TickReport};
pub use novelty::{StagnationDetector, novelty_score};
pub use overlay::ContextOverlay;
pub use proposer::{CatalogProposer, GeneratorProposer, ProposalContext, Proposer};
pub use reward::{AffectDelta, RewardEvent, RewardPropagator, RewardTrace, SignalMode, SignalType, TraceEntry};
pub use state::{AgentState, HistoryEntry, LoopMeta};
