//! The decision loop implementation.

use chrono::{DateTime, Utc};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use volition_config::AppConfig;
use volition_core::action::{Action, ActionOutcome, GateState};
use volition_core::catalog::ActionCatalog;
use volition_core::error::AgentError;
use volition_core::event::{DomainEvent, EventBus};
use volition_core::generator::TextGenerator;
use volition_core::goal::Goal;
use volition_core::store::{self, StateStore, keys};
use volition_telemetry::{
    DecisionEvent, DecisionSink, JsonlDecisionSink, RunSummary, ScoredCandidate, Span, SpanKind, TelemetryEngine,
};

use crate::features::{self, FeatureVector};
use crate::finalizer::{DecisionFinalizer, ExecutedTick};
use crate::gate::{ActionGate, ScoringContext, Selection};
use crate::judgment::{GeneratorJudge, GeneratorScorer, Judge, RuleJudge, RuleScorer, SatisfactionScorer, Verdict};
use crate::proposer::{CatalogProposer, GeneratorProposer, ProposalContext, Proposer};
use crate::reward::{RewardEvent, RewardPropagator, SignalType};
use crate::state::{self, AgentState};

/// What one tick did.
#[derive(Debug, Clone)]
pub struct TickReport {
    pub tick: u64,
    pub event: DecisionEvent,
    pub outcome: Option<ActionOutcome>,
    pub verdict: Option<Verdict>,
    /// Artifacts that failed to save
    pub persistence_failures: usize,
}

impl TickReport {
    pub fn gate_state(&self) -> GateState {
        self.event.gate_state
    }
}

/// The action chosen for a tick and how it was chosen.
struct Chosen {
    action: Action,
    forced: bool,
    from_queue: bool,
    novelty: f64,
}

/// The autonomous decision loop.
pub struct AgentLoop {
    config: AppConfig,
    store: Arc<dyn StateStore>,
    catalog: ActionCatalog,

    /// Generator-backed proposer; the catalog proposer is the fallback
    proposer: Option<Arc<dyn Proposer>>,
    catalog_proposer: CatalogProposer,
    judge: Arc<dyn Judge>,
    finalizer: DecisionFinalizer,
    gate: ActionGate,
    rewards: RewardPropagator,

    sink: Option<Arc<dyn DecisionSink>>,
    telemetry: Arc<TelemetryEngine>,
    event_bus: Arc<EventBus>,
    rng: StdRng,

    /// Loaded on the first tick
    state: Option<AgentState>,
}

impl AgentLoop {
    /// Create a loop with deterministic collaborators: the catalog
    /// proposer, the rule judge and the rule scorer.
    pub fn new(config: AppConfig, store: Arc<dyn StateStore>, catalog: ActionCatalog) -> Self {
        let rng = match config.agent.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self {
            catalog_proposer: CatalogProposer::new(config.gate.proposal_size, config.bandit.epsilon),
            judge: Arc::new(RuleJudge),
            finalizer: Self::build_finalizer(&config, Arc::new(RuleScorer::default())),
            gate: ActionGate::new(config.gate.clone(), config.fatigue.clone(), config.novelty.clone()),
            rewards: RewardPropagator::new(config.reward.clone()),
            proposer: None,
            sink: None,
            telemetry: Arc::new(TelemetryEngine::new()),
            event_bus: Arc::new(EventBus::default()),
            rng,
            state: None,
            config,
            store,
            catalog,
        }
    }

    /// Wire a loop from configuration: generator router, built-in catalog
    /// and, when enabled, the JSONL decision log.
    pub fn from_config(config: AppConfig, store: Arc<dyn StateStore>) -> Self {
        let router = volition_providers::build_from_config(&config);
        let generator = router.default_generator();
        let online = generator.name() != "disabled";
        let catalog = volition_actions::build_catalog(&config.catalog, store.clone(), online.then(|| generator.clone()));

        let sink = config
            .telemetry
            .enabled
            .then(|| Arc::new(JsonlDecisionSink::new(config.events_path())) as Arc<dyn DecisionSink>);

        let mut agent = Self::new(config, store, catalog);
        if online {
            agent = agent.with_generator(generator);
        } else {
            info!("No text generator configured, running on deterministic fallbacks");
        }
        if let Some(sink) = sink {
            agent = agent.with_sink(sink);
        }
        agent
    }

    fn build_finalizer(config: &AppConfig, scorer: Arc<dyn SatisfactionScorer>) -> DecisionFinalizer {
        DecisionFinalizer::new(
            scorer,
            config.reward.clone(),
            config.bandit.clone(),
            config.storage.history_max_entries,
        )
    }

    /// Use the generator for the stages the config assigns to it.
    pub fn with_generator(mut self, generator: Arc<dyn TextGenerator>) -> Self {
        if self.config.agent.proposer == "generator" {
            let proposer = GeneratorProposer::new(generator.clone())
                .with_sampling(self.config.generator.temperature, self.config.generator.max_tokens);
            self.proposer = Some(Arc::new(proposer));
        }
        if self.config.agent.judge == "generator" {
            self.judge = Arc::new(GeneratorJudge::new(generator.clone()));
            self.finalizer = Self::build_finalizer(&self.config, Arc::new(GeneratorScorer::new(generator)));
        }
        self
    }

    pub fn with_proposer(mut self, proposer: Arc<dyn Proposer>) -> Self {
        self.proposer = Some(proposer);
        self
    }

    pub fn with_judge(mut self, judge: Arc<dyn Judge>) -> Self {
        self.judge = judge;
        self
    }

    pub fn with_scorer(mut self, scorer: Arc<dyn SatisfactionScorer>) -> Self {
        self.finalizer = Self::build_finalizer(&self.config, scorer);
        self
    }

    pub fn with_sink(mut self, sink: Arc<dyn DecisionSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn with_event_bus(mut self, event_bus: Arc<EventBus>) -> Self {
        self.event_bus = event_bus;
        self
    }

    pub fn with_telemetry(mut self, telemetry: Arc<TelemetryEngine>) -> Self {
        self.telemetry = telemetry;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    // ── Accessors ─────────────────────────────────────────────────────────

    /// State as of the last tick; `None` before the first one.
    pub fn state(&self) -> Option<&AgentState> {
        self.state.as_ref()
    }

    pub fn catalog(&self) -> &ActionCatalog {
        &self.catalog
    }

    pub fn telemetry(&self) -> &Arc<TelemetryEngine> {
        &self.telemetry
    }

    pub fn summary(&self) -> RunSummary {
        self.telemetry.summary()
    }

    /// State as of now, loading it from the store if no tick has run yet.
    pub async fn current_state(&mut self) -> &AgentState {
        if self.state.is_none() {
            self.state = Some(self.load_state().await);
        }
        self.state.get_or_insert_with(AgentState::default)
    }

    // ── Maintenance ───────────────────────────────────────────────────────

    /// Delete one persisted artifact. The cached state is dropped so the
    /// next tick reloads from the store.
    pub async fn reset_artifact(&mut self, key: &str) -> volition_core::Result<bool> {
        if !keys::DOCUMENTS.contains(&key) && !keys::LISTS.contains(&key) {
            return Err(AgentError::InvalidParameter {
                name: "artifact".into(),
                reason: format!("unknown artifact '{key}'"),
            }
            .into());
        }
        let removed = self.store.remove(key).await?;
        self.state = None;
        self.event_bus.publish(DomainEvent::ArtifactReset {
            key: key.to_string(),
            timestamp: Utc::now(),
        });
        info!(key, removed, "Artifact reset");
        Ok(removed)
    }

    /// Forget what the bandit learned, for one action or for all of them.
    pub async fn reset_bandit(&mut self, action: Option<&str>) -> volition_core::Result<usize> {
        let mut state = match self.state.take() {
            Some(state) => state,
            None => self.load_state().await,
        };
        let cleared = state.bandit.reset(action);
        let saved = store::save(self.store.as_ref(), keys::BANDIT, &state.bandit).await;
        self.state = Some(state);
        saved?;

        self.event_bus.publish(DomainEvent::ArtifactReset {
            key: keys::BANDIT.to_string(),
            timestamp: Utc::now(),
        });
        info!(action = action.unwrap_or("*"), cleared, "Bandit reset");
        Ok(cleared)
    }

    // ── Running ───────────────────────────────────────────────────────────

    /// Run `ticks` ticks, pausing `tick_interval_ms` between them.
    pub async fn run(&mut self, ticks: u64) -> Vec<TickReport> {
        let pause = Duration::from_millis(self.config.agent.tick_interval_ms);
        let mut reports = Vec::new();
        for i in 0..ticks {
            if i > 0 && !pause.is_zero() {
                tokio::time::sleep(pause).await;
            }
            reports.push(self.tick().await);
        }
        reports
    }

    /// Run one tick. Never fails: every collaborator failure degrades to a
    /// fallback and is logged.
    pub async fn tick(&mut self) -> TickReport {
        let mut state = match self.state.take() {
            Some(state) => state,
            None => self.load_state().await,
        };

        let now = Utc::now();
        state.meta.tick += 1;
        state.meta.last_tick_at = Some(now);
        let tick = state.meta.tick;
        let trace_id = self.telemetry.start_trace(tick);
        self.event_bus.publish(DomainEvent::TickStarted {
            tick,
            pending: state.pending.len(),
            timestamp: now,
        });
        info!(tick, pending = state.pending.len(), "Tick started");

        self.rewards.decay(&mut state.trace, &state.affect, now);
        self.rewards.drift(&mut state.affect);

        let recent = state::recent_actions(self.store.as_ref(), self.config.storage.history_window).await;
        let features = features::extract(
            &state.affect,
            &state.goals,
            state.overlay.frustration(),
            state.overlay.near_threshold(&self.config.gate),
        );
        let fingerprint = features.fingerprint(state.meta.last_action.as_deref());
        state
            .meta
            .stagnation
            .observe(fingerprint, self.config.novelty.hash_window);
        let stagnant = state
            .meta
            .stagnation
            .is_stagnant(state.meta.repeat_streak, &self.config.novelty);

        let (chosen, candidates) = match state.pending.pop_front() {
            Some(action) => {
                debug!(action = %action.name, retries = action.retries, "Running queued action");
                let chosen = Chosen {
                    action,
                    forced: false,
                    from_queue: true,
                    novelty: 0.0,
                };
                (chosen, Vec::new())
            }
            None => {
                let proposals = self.propose(&state, &recent, &features, tick, &trace_id).await;
                match self.choose(&mut state, proposals, &recent, &features, stagnant, tick, now) {
                    (Some(chosen), candidates) => (chosen, candidates),
                    (None, candidates) => {
                        return self.finish_idle(state, tick, candidates, &trace_id).await;
                    }
                }
            }
        };

        self.execute(state, chosen, candidates, &features, tick, now, &trace_id)
            .await
    }

    async fn load_state(&self) -> AgentState {
        let mut state = AgentState::load(self.store.as_ref()).await;
        let configured: Vec<Goal> = self
            .config
            .goals
            .iter()
            .map(|g| Goal::new(g.id.clone(), g.description.clone(), g.tier))
            .collect();
        let added = state.seed_goals(configured);
        if added > 0 {
            debug!(added, "Seeded goals from config");
        }
        state
    }

    async fn propose(
        &mut self,
        state: &AgentState,
        recent: &[String],
        features: &FeatureVector,
        tick: u64,
        trace_id: &str,
    ) -> Vec<Action> {
        let ctx = ProposalContext {
            tick,
            catalog: &self.catalog,
            affect: &state.affect,
            goals: &state.goals,
            recent,
            features,
            bandit: &state.bandit,
            clarification_action: &self.config.gate.clarification_action,
        };

        if let Some(proposer) = &self.proposer {
            let mut span = Span::new(SpanKind::Proposal, proposer.name());
            match proposer.propose(&ctx).await {
                Ok(actions) => {
                    span.end(true);
                    let span = span.with_meta("count", actions.len().into());
                    if let Err(e) = self.telemetry.record_span(trace_id, span) {
                        debug!(error = %e, "Span dropped");
                    }
                    return actions;
                }
                Err(e) => {
                    warn!(error = %e, "Proposal failed, falling back to the catalog");
                    span.end_fallback();
                    if let Err(e) = self.telemetry.record_span(trace_id, span) {
                        debug!(error = %e, "Span dropped");
                    }
                    self.event_bus.publish(DomainEvent::CollaboratorFallback {
                        stage: "proposal".into(),
                        error_message: e.to_string(),
                        timestamp: Utc::now(),
                    });
                }
            }
        }

        let mut span = Span::new(SpanKind::Proposal, "catalog");
        let actions = self.catalog_proposer.propose(&ctx, &mut self.rng);
        span.end(!actions.is_empty());
        let span = span.with_meta("count", actions.len().into());
        if let Err(e) = self.telemetry.record_span(trace_id, span) {
            debug!(error = %e, "Span dropped");
        }
        actions
    }

    /// Score the proposals and let the gate pick one.
    #[allow(clippy::too_many_arguments)]
    fn choose(
        &mut self,
        state: &mut AgentState,
        proposals: Vec<Action>,
        recent: &[String],
        features: &FeatureVector,
        stagnant: bool,
        tick: u64,
        now: DateTime<Utc>,
    ) -> (Option<Chosen>, Vec<ScoredCandidate>) {
        let ctx = ScoringContext {
            affect: &state.affect,
            fatigue: &state.fatigue,
            bandit: &state.bandit,
            features,
            overlay: &state.overlay,
            last_action: state.meta.last_action.as_deref(),
            recent,
            now,
        };
        let ranked = self.gate.rank(proposals, &ctx, &mut self.rng);
        let candidates: Vec<ScoredCandidate> = ranked
            .iter()
            .map(|s| ScoredCandidate {
                name: s.action.name.clone(),
                score: s.total(),
                agentic: s.action.is_agentic(),
            })
            .collect();

        let selection = self.gate.select(
            ranked,
            stagnant,
            &state.overlay,
            state.meta.last_action.as_deref(),
            &mut self.rng,
        );
        let Selection::Execute {
            chosen,
            forced,
            leftovers,
        } = selection
        else {
            return (None, candidates);
        };

        let queued = self
            .gate
            .enqueue_leftovers(&mut state.pending, leftovers, &chosen.action.name);
        if forced {
            self.event_bus.publish(DomainEvent::StagnationForced {
                tick,
                action: chosen.action.name.clone(),
                cycles_since_agentic: state.overlay.cycles_since_agentic,
                threshold: state.overlay.dynamic_threshold(&self.config.gate),
                timestamp: now,
            });
            state.meta.stagnation.clear();
        }
        debug!(action = %chosen.action.name, score = chosen.total(), forced, queued, "Gate selected action");

        let chosen = Chosen {
            novelty: chosen.score.novelty,
            action: chosen.action,
            forced,
            from_queue: false,
        };
        (Some(chosen), candidates)
    }

    #[allow(clippy::too_many_arguments)]
    async fn execute(
        &mut self,
        mut state: AgentState,
        chosen: Chosen,
        candidates: Vec<ScoredCandidate>,
        features: &FeatureVector,
        tick: u64,
        now: DateTime<Utc>,
        trace_id: &str,
    ) -> TickReport {
        let action = chosen.action;
        let expected = state.bandit.score(&action.name, features).clamp(0.0, 1.0);

        let mut span = Span::new(SpanKind::Execution, action.name.clone());
        let outcome = self.catalog.execute(&action.name, action.payload.clone()).await;
        span.end(outcome.success);
        let duration_ms = span.duration_ms.unwrap_or(0);
        self.record_span(trace_id, span);
        self.event_bus.publish(DomainEvent::ActionExecuted {
            tick,
            action: action.name.clone(),
            success: outcome.success,
            forced: chosen.forced,
            duration_ms,
            timestamp: Utc::now(),
        });

        let verdict = self.judge_outcome(&action, &outcome, trace_id).await;
        let gate_state = self
            .gate
            .resolve(&mut state.pending, &action, verdict, &outcome.output);
        info!(tick, action = %action.name, success = outcome.success, %verdict, state = %gate_state, "Action resolved");

        match gate_state {
            GateState::Succeeded => self.apply_success(&mut state, &action, expected, chosen.novelty, now),
            GateState::Escalating => {
                self.event_bus.publish(DomainEvent::Escalated {
                    tick,
                    action: action.name.clone(),
                    reason: outcome.output.clone(),
                    timestamp: Utc::now(),
                });
            }
            _ => {}
        }

        let agentic_success = gate_state == GateState::Succeeded && action.is_agentic();
        state
            .overlay
            .record_tick(agentic_success, chosen.forced, &self.config.gate);

        let mut span = Span::new(SpanKind::Satisfaction, self.finalizer.scorer_name());
        let finalized = self
            .finalizer
            .finalize(
                self.store.as_ref(),
                &mut state,
                ExecutedTick {
                    tick,
                    action: &action,
                    outcome: &outcome,
                    verdict,
                    gate_state,
                    forced: chosen.forced,
                    from_queue: chosen.from_queue,
                    candidates,
                    features,
                },
            )
            .await;
        if finalized.scorer_fallback {
            span.end_fallback();
            self.event_bus.publish(DomainEvent::CollaboratorFallback {
                stage: "satisfaction".into(),
                error_message: "scorer unavailable".into(),
                timestamp: Utc::now(),
            });
        } else {
            span.end(true);
        }
        self.record_span(trace_id, span.with_meta("satisfaction", finalized.satisfaction.into()));

        let persistence_failures = self.persist(&state, trace_id).await;
        self.emit(&finalized.event, trace_id).await;
        self.state = Some(state);

        TickReport {
            tick,
            event: finalized.event,
            outcome: Some(outcome),
            verdict: Some(verdict),
            persistence_failures,
        }
    }

    async fn judge_outcome(&self, action: &Action, outcome: &ActionOutcome, trace_id: &str) -> Verdict {
        let mut span = Span::new(SpanKind::Judgment, self.judge.name());
        let verdict = match self.judge.judge(action, outcome).await {
            Ok(verdict) => {
                span.end(true);
                verdict
            }
            Err(e) => {
                warn!(action = %action.name, error = %e, "Judgment failed, using the rule judge");
                span.end_fallback();
                self.event_bus.publish(DomainEvent::CollaboratorFallback {
                    stage: "judgment".into(),
                    error_message: e.to_string(),
                    timestamp: Utc::now(),
                });
                RuleJudge::verdict(outcome)
            }
        };
        self.record_span(trace_id, span.with_meta("verdict", verdict.to_string().into()));
        verdict
    }

    /// Fatigue and reward side effects of a successful execution.
    fn apply_success(
        &mut self,
        state: &mut AgentState,
        action: &Action,
        expected: f64,
        novelty: f64,
        now: DateTime<Utc>,
    ) {
        state
            .fatigue
            .touch(&action.name, &state.affect, now, &self.config.fatigue, &mut self.rng);

        let effort = action
            .payload
            .get("effort")
            .and_then(serde_json::Value::as_f64)
            .unwrap_or(self.config.reward.default_effort);

        let mut releases = vec![
            RewardEvent::new(SignalType::Dopamine, 1.0, expected)
                .with_effort(effort)
                .phasic()
                .tagged(action.name.clone()),
        ];
        if novelty > 0.0 {
            releases.push(
                RewardEvent::new(SignalType::Novelty, novelty, 0.0)
                    .phasic()
                    .tagged(action.name.clone()),
            );
        }
        if action.user_facing {
            releases.push(RewardEvent::new(SignalType::Connection, 1.0, 0.5).tagged(action.name.clone()));
        }
        if let Some(goal_id) = &action.goal_ref {
            if state.complete_goal(goal_id, now) {
                info!(goal = %goal_id, action = %action.name, "Goal completed");
                releases.push(RewardEvent::new(SignalType::Serotonin, 1.0, 0.0).tagged(goal_id.clone()));
            }
        }

        for release in &releases {
            self.rewards.release(&mut state.affect, &mut state.trace, release, now);
        }
    }

    async fn finish_idle(
        &mut self,
        mut state: AgentState,
        tick: u64,
        candidates: Vec<ScoredCandidate>,
        trace_id: &str,
    ) -> TickReport {
        state.overlay.record_tick(false, false, &self.config.gate);
        let event = self.finalizer.finalize_idle(&state, tick, candidates);
        info!(tick, cycles = state.overlay.cycles_since_agentic, "Idle tick");

        let persistence_failures = self.persist(&state, trace_id).await;
        self.emit(&event, trace_id).await;
        self.state = Some(state);

        TickReport {
            tick,
            event,
            outcome: None,
            verdict: None,
            persistence_failures,
        }
    }

    async fn persist(&self, state: &AgentState, trace_id: &str) -> usize {
        let mut span = Span::new(SpanKind::Persistence, self.store.name());
        let failures = state.save(self.store.as_ref()).await;
        span.end(failures == 0);
        self.record_span(trace_id, span.with_meta("failures", failures.into()));
        failures
    }

    async fn emit(&self, event: &DecisionEvent, trace_id: &str) {
        self.telemetry.record_decision(event);
        if let Some(sink) = &self.sink {
            if let Err(e) = sink.record(event).await {
                warn!(sink = sink.name(), error = %e, "Failed to record decision event");
            }
        }
        self.telemetry.end_trace(trace_id);
    }

    fn record_span(&self, trace_id: &str, span: Span) {
        if let Err(e) = self.telemetry.record_span(trace_id, span) {
            debug!(error = %e, "Span dropped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{ScriptedBehavior, ScriptedGenerator, deterministic_config};
    use async_trait::async_trait;
    use volition_core::error::StoreError;
    use volition_store::MemoryStore;
    use volition_telemetry::MemoryDecisionSink;

    use crate::gate::PendingQueue;
    use crate::overlay::ContextOverlay;

    fn catalog(behaviors: Vec<ScriptedBehavior>) -> ActionCatalog {
        let mut catalog = ActionCatalog::new();
        for behavior in behaviors {
            catalog.register(Arc::new(behavior));
        }
        catalog
    }

    #[tokio::test]
    async fn failing_speak_escalates_to_clarification() {
        let store: Arc<dyn StateStore> = Arc::new(MemoryStore::new());
        let mut queue = PendingQueue::new();
        queue.push_back(Action::new("speak").agentic().with_urgency(0.6), 16);
        store::save(store.as_ref(), keys::PENDING, &queue).await.unwrap();

        let bus = Arc::new(EventBus::new(64));
        let mut events = bus.subscribe();
        let sink = Arc::new(MemoryDecisionSink::new());
        let mut agent = AgentLoop::new(
            deterministic_config(),
            store,
            catalog(vec![
                ScriptedBehavior::failing("speak", true).user_facing(),
                ScriptedBehavior::succeeding("ask_user", true).user_facing(),
            ]),
        )
        .with_event_bus(bus)
        .with_sink(sink.clone());

        let states: Vec<GateState> = agent.run(3).await.iter().map(TickReport::gate_state).collect();
        assert_eq!(
            states,
            vec![GateState::Retrying, GateState::Retrying, GateState::Escalating]
        );

        let head = agent.state().unwrap().pending.peek().unwrap().clone();
        assert_eq!(head.name, "ask_user");
        assert_eq!(head.urgency, 1.0);
        assert!(head.is_agentic());
        assert_eq!(head.payload["regarding"], "speak");

        let report = agent.tick().await;
        assert_eq!(report.event.chosen.as_deref(), Some("ask_user"));
        assert_eq!(report.gate_state(), GateState::Succeeded);
        assert!(report.event.from_queue);
        assert_eq!(sink.len().await, 4);

        let mut escalated = false;
        while let Ok(event) = events.try_recv() {
            if matches!(event.as_ref(), DomainEvent::Escalated { action, .. } if action == "speak") {
                escalated = true;
            }
        }
        assert!(escalated);
    }

    #[tokio::test]
    async fn stagnation_forces_an_agentic_action() {
        let store: Arc<dyn StateStore> = Arc::new(MemoryStore::new());
        let overlay = ContextOverlay {
            cycles_since_agentic: 9,
            ..ContextOverlay::default()
        };
        store::save(store.as_ref(), keys::OVERLAY, &overlay).await.unwrap();

        // every candidate clears the threshold; the agentic one must still win
        let mut config = deterministic_config();
        config.gate.confidence_threshold = -10.0;
        let mut agent = AgentLoop::new(
            config,
            store,
            catalog(vec![
                ScriptedBehavior::succeeding("reflect", false),
                ScriptedBehavior::succeeding("explore", true),
            ]),
        );

        let report = agent.tick().await;
        assert!(report.event.forced);
        assert_eq!(report.event.chosen.as_deref(), Some("explore"));
        assert_eq!(agent.state().unwrap().overlay.cycles_since_agentic, 0);
        assert_eq!(agent.summary().forced, 1);
    }

    #[tokio::test]
    async fn confident_candidate_runs_and_the_other_waits() {
        let reply = r#"{"candidates": [
            {"name": "log", "urgency": 0.5},
            {"name": "dream", "urgency": 0.82}
        ]}"#;
        let generator = Arc::new(ScriptedGenerator::new(vec![Ok(reply.into())]));

        let mut config = deterministic_config();
        config.gate.motivation_weight = 0.0;
        config.gate.curiosity_weight = 0.0;
        config.gate.bandit_weight = 0.0;
        config.gate.passive_actions.clear();
        config.novelty.relapse_probability = 1.0;

        let mut agent = AgentLoop::new(
            config,
            Arc::new(MemoryStore::new()),
            catalog(vec![
                ScriptedBehavior::succeeding("dream", false),
                ScriptedBehavior::succeeding("log", false),
            ]),
        )
        .with_proposer(Arc::new(GeneratorProposer::new(generator)));

        let first = agent.tick().await;
        assert_eq!(first.event.chosen.as_deref(), Some("dream"));
        assert_eq!(first.event.followups, vec!["log"]);
        assert!((first.event.top_candidate().unwrap().score - 0.82).abs() < 1e-12);

        let second = agent.tick().await;
        assert_eq!(second.event.chosen.as_deref(), Some("log"));
        assert!(second.event.from_queue);
    }

    #[tokio::test]
    async fn leftovers_drain_in_descending_score_order() {
        let reply = r#"{"candidates": [
            {"name": "reflect", "urgency": 0.9},
            {"name": "plan", "urgency": 0.4},
            {"name": "log", "urgency": 0.6}
        ]}"#;
        let generator = Arc::new(ScriptedGenerator::new(vec![Ok(reply.into())]));

        let mut config = deterministic_config();
        config.gate.motivation_weight = 0.0;
        config.gate.curiosity_weight = 0.0;
        config.gate.bandit_weight = 0.0;
        config.gate.passive_actions.clear();
        config.novelty.relapse_probability = 1.0;

        let mut agent = AgentLoop::new(
            config,
            Arc::new(MemoryStore::new()),
            catalog(vec![
                ScriptedBehavior::succeeding("reflect", false),
                ScriptedBehavior::succeeding("plan", false),
                ScriptedBehavior::succeeding("log", false),
            ]),
        )
        .with_proposer(Arc::new(GeneratorProposer::new(generator)));

        let first = agent.tick().await;
        assert_eq!(first.event.chosen.as_deref(), Some("reflect"));
        assert_eq!(first.event.followups, vec!["log", "plan"]);

        let drained: Vec<String> = agent
            .run(2)
            .await
            .into_iter()
            .filter(|r| r.event.from_queue)
            .filter_map(|r| r.event.chosen)
            .collect();
        assert_eq!(drained, vec!["log", "plan"]);
    }

    #[tokio::test]
    async fn generator_outage_degrades_to_fallbacks() {
        let mut config = deterministic_config();
        config.gate.confidence_threshold = 0.0;
        let generator: Arc<dyn TextGenerator> = Arc::new(ScriptedGenerator::failing());
        let mut agent = AgentLoop::new(
            config,
            Arc::new(MemoryStore::new()),
            catalog(vec![ScriptedBehavior::succeeding("plan", false)]),
        )
        .with_generator(generator);

        let report = agent.tick().await;
        assert_eq!(report.event.chosen.as_deref(), Some("plan"));
        assert_eq!(report.verdict, Some(Verdict::Success));
        // 0.5 neutral + 0.1 accepted
        assert!((report.event.reward.unwrap() - 0.6).abs() < 1e-12);
        assert_eq!(agent.summary().fallbacks, 3);
    }

    #[tokio::test]
    async fn idle_ticks_still_persist_and_count() {
        let store: Arc<dyn StateStore> = Arc::new(MemoryStore::new());
        let mut config = deterministic_config();
        config.gate.confidence_threshold = 5.0;
        let mut agent = AgentLoop::new(
            config,
            store.clone(),
            catalog(vec![ScriptedBehavior::succeeding("log", false)]),
        );

        let report = agent.tick().await;
        assert!(report.event.is_idle());
        assert_eq!(report.persistence_failures, 0);
        assert!(!report.event.candidates.is_empty());

        let overlay: ContextOverlay = store::load_or_default(store.as_ref(), keys::OVERLAY).await;
        assert_eq!(overlay.cycles_since_agentic, 1);
    }

    #[tokio::test]
    async fn state_survives_a_restart() {
        let store: Arc<dyn StateStore> = Arc::new(MemoryStore::new());
        let mut config = deterministic_config();
        config.gate.confidence_threshold = 0.0;
        config.goals.push(volition_config::GoalConfig {
            id: "g1".into(),
            description: "Keep notes tidy".into(),
            tier: 2,
        });

        let behaviors = || catalog(vec![ScriptedBehavior::succeeding("plan", false)]);
        let mut first = AgentLoop::new(config.clone(), store.clone(), behaviors());
        first.run(2).await;

        let mut second = AgentLoop::new(config, store, behaviors());
        let report = second.tick().await;
        assert_eq!(report.tick, 3);
        let state = second.state().unwrap();
        assert_eq!(state.bandit.uses("plan"), 3);
        assert_eq!(state.goals.len(), 1);
        assert!(state.goals[0].completed);
        assert_eq!(state.meta.repeat_streak, 3);
    }

    #[tokio::test]
    async fn resets_clear_artifacts_and_arms() {
        let store: Arc<dyn StateStore> = Arc::new(MemoryStore::new());
        let mut config = deterministic_config();
        config.gate.confidence_threshold = 0.0;
        let bus = Arc::new(EventBus::new(64));
        let mut events = bus.subscribe();
        let mut agent = AgentLoop::new(
            config,
            store.clone(),
            catalog(vec![ScriptedBehavior::succeeding("plan", false)]),
        )
        .with_event_bus(bus);
        agent.run(2).await;

        assert_eq!(agent.reset_bandit(Some("plan")).await.unwrap(), 1);
        assert_eq!(agent.current_state().await.bandit.uses("plan"), 0);

        assert!(agent.reset_artifact(keys::LOOP_META).await.unwrap());
        assert!(agent.state().is_none());
        assert_eq!(agent.current_state().await.meta.tick, 0);
        assert!(agent.reset_artifact("secrets").await.is_err());

        let mut resets = Vec::new();
        while let Ok(event) = events.try_recv() {
            if let DomainEvent::ArtifactReset { key, .. } = event.as_ref() {
                resets.push(key.clone());
            }
        }
        assert_eq!(resets, vec![keys::BANDIT.to_string(), keys::LOOP_META.to_string()]);
    }

    /// A store where every write fails.
    struct ReadOnlyStore;

    #[async_trait]
    impl StateStore for ReadOnlyStore {
        fn name(&self) -> &str {
            "read_only"
        }

        async fn get(&self, _key: &str) -> Result<Option<serde_json::Value>, StoreError> {
            Ok(None)
        }

        async fn put(&self, key: &str, _value: serde_json::Value) -> Result<(), StoreError> {
            Err(StoreError::Io {
                key: key.into(),
                reason: "read-only".into(),
            })
        }

        async fn append(&self, key: &str, _value: serde_json::Value) -> Result<(), StoreError> {
            Err(StoreError::Io {
                key: key.into(),
                reason: "read-only".into(),
            })
        }

        async fn list(&self, _key: &str) -> Result<Vec<serde_json::Value>, StoreError> {
            Ok(Vec::new())
        }

        async fn trim(&self, _key: &str, _keep: usize) -> Result<usize, StoreError> {
            Ok(0)
        }

        async fn remove(&self, _key: &str) -> Result<bool, StoreError> {
            Ok(false)
        }
    }

    #[tokio::test]
    async fn write_failures_do_not_abort_the_tick() {
        let mut config = deterministic_config();
        config.gate.confidence_threshold = 0.0;
        let mut agent = AgentLoop::new(
            config,
            Arc::new(ReadOnlyStore),
            catalog(vec![ScriptedBehavior::succeeding("reflect", false)]),
        );
        let report = agent.tick().await;
        assert_eq!(report.event.chosen.as_deref(), Some("reflect"));
        assert_eq!(report.persistence_failures, 8);

        let report = agent.tick().await;
        assert_eq!(report.tick, 2);
    }
}
