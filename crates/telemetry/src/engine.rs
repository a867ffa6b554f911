//! Thread-safe telemetry engine. Collects per-tick traces and keeps running
//! counters over decision events.

use crate::TelemetryError;
use crate::model::*;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use volition_core::action::GateState;

/// Oldest traces are pruned past this count.
const MAX_TRACES: usize = 5_000;

/// The core telemetry engine.
pub struct TelemetryEngine {
    traces: RwLock<Vec<Trace>>,
    totals: RwLock<RunningTotals>,
}

#[derive(Debug, Default)]
struct RunningTotals {
    ticks: u64,
    idle_ticks: u64,
    executions: u64,
    successes: u64,
    forced: u64,
    from_queue: u64,
    retries: u64,
    escalations: u64,
    dropped: u64,
    fallbacks: u64,
    reward_sum: f64,
    rewarded: u64,
    by_action: HashMap<String, u64>,
}

impl TelemetryEngine {
    pub fn new() -> Self {
        Self {
            traces: RwLock::new(Vec::new()),
            totals: RwLock::new(RunningTotals::default()),
        }
    }

    // ── Trace management ──────────────────────────────────────────────

    /// Start the trace for a tick. Returns its id.
    pub fn start_trace(&self, tick: u64) -> String {
        let trace = Trace::new(tick);
        let id = trace.id.clone();
        let mut traces = self.traces.write().unwrap_or_else(PoisonError::into_inner);

        if traces.len() >= MAX_TRACES {
            let drain = MAX_TRACES / 10;
            traces.drain(..drain);
        }

        traces.push(trace);
        id
    }

    pub fn end_trace(&self, trace_id: &str) {
        let mut traces = self.traces.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(trace) = traces.iter_mut().find(|t| t.id == trace_id) {
            trace.end();
        }
    }

    /// Record a completed span in a trace.
    pub fn record_span(&self, trace_id: &str, span: Span) -> Result<(), TelemetryError> {
        if span.fallback {
            self.totals
                .write()
                .unwrap_or_else(PoisonError::into_inner)
                .fallbacks += 1;
        }

        let mut traces = self.traces.write().unwrap_or_else(PoisonError::into_inner);
        let trace = traces
            .iter_mut()
            .rev()
            .find(|t| t.id == trace_id)
            .ok_or_else(|| TelemetryError::UnknownTrace(trace_id.to_string()))?;
        trace.add_span(span);
        Ok(())
    }

    /// Fold one decision event into the running counters.
    pub fn record_decision(&self, event: &DecisionEvent) {
        let mut totals = self.totals.write().unwrap_or_else(PoisonError::into_inner);
        totals.ticks += 1;

        let Some(chosen) = &event.chosen else {
            totals.idle_ticks += 1;
            return;
        };

        totals.executions += 1;
        *totals.by_action.entry(chosen.clone()).or_insert(0) += 1;
        if event.success == Some(true) {
            totals.successes += 1;
        }
        if event.forced {
            totals.forced += 1;
        }
        if event.from_queue {
            totals.from_queue += 1;
        }
        match event.gate_state {
            GateState::Retrying => totals.retries += 1,
            GateState::Escalating => totals.escalations += 1,
            GateState::Dropped => totals.dropped += 1,
            _ => {}
        }
        if let Some(reward) = event.reward.filter(|r| r.is_finite()) {
            totals.reward_sum += reward;
            totals.rewarded += 1;
        }
    }

    // ── Queries ───────────────────────────────────────────────────────

    pub fn get_trace(&self, trace_id: &str) -> Option<Trace> {
        let traces = self.traces.read().unwrap_or_else(PoisonError::into_inner);
        traces.iter().find(|t| t.id == trace_id).cloned()
    }

    /// Recent traces, most recent first.
    pub fn recent_traces(&self, limit: usize) -> Vec<Trace> {
        let traces = self.traces.read().unwrap_or_else(PoisonError::into_inner);
        traces.iter().rev().take(limit).cloned().collect()
    }

    pub fn trace_count(&self) -> usize {
        self.traces.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Snapshot of the running counters.
    pub fn summary(&self) -> RunSummary {
        let totals = self.totals.read().unwrap_or_else(PoisonError::into_inner);

        let mut by_action: Vec<(String, u64)> = totals
            .by_action
            .iter()
            .map(|(name, count)| (name.clone(), *count))
            .collect();
        by_action.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

        RunSummary {
            ticks: totals.ticks,
            idle_ticks: totals.idle_ticks,
            executions: totals.executions,
            successes: totals.successes,
            forced: totals.forced,
            from_queue: totals.from_queue,
            retries: totals.retries,
            escalations: totals.escalations,
            dropped: totals.dropped,
            fallbacks: totals.fallbacks,
            mean_reward: (totals.rewarded > 0).then(|| totals.reward_sum / totals.rewarded as f64),
            by_action,
        }
    }
}

impl Default for TelemetryEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use volition_core::action::ActionKind;

    fn executed(tick: u64, name: &str, state: GateState, success: bool, reward: Option<f64>) -> DecisionEvent {
        let mut event = DecisionEvent::executed(tick, name, ActionKind::Cognitive, state);
        event.success = Some(success);
        event.reward = reward;
        event
    }

    #[test]
    fn start_and_end_trace() {
        let engine = TelemetryEngine::new();
        let id = engine.start_trace(1);
        assert_eq!(engine.trace_count(), 1);
        engine.end_trace(&id);
        assert!(engine.get_trace(&id).unwrap().ended_at.is_some());
    }

    #[test]
    fn spans_attach_to_their_trace() {
        let engine = TelemetryEngine::new();
        let id = engine.start_trace(1);
        let mut span = Span::new(SpanKind::Execution, "plan");
        span.end(true);
        engine.record_span(&id, span).unwrap();

        let mut fb = Span::new(SpanKind::Judgment, "generator");
        fb.end_fallback();
        engine.record_span(&id, fb).unwrap();

        let trace = engine.get_trace(&id).unwrap();
        assert_eq!(trace.spans.len(), 2);
        assert_eq!(engine.summary().fallbacks, 1);
    }

    #[test]
    fn unknown_trace_is_an_error() {
        let engine = TelemetryEngine::new();
        let err = engine
            .record_span("missing", Span::new(SpanKind::Proposal, "x"))
            .unwrap_err();
        assert!(matches!(err, TelemetryError::UnknownTrace(_)));
    }

    #[test]
    fn counters_follow_gate_states() {
        let engine = TelemetryEngine::new();
        engine.record_decision(&DecisionEvent::idle(1));
        engine.record_decision(&executed(2, "speak", GateState::Retrying, false, Some(0.3)));
        engine.record_decision(&executed(3, "speak", GateState::Escalating, false, Some(0.3)));
        engine.record_decision(&executed(4, "ask_user", GateState::Succeeded, true, Some(0.9)));
        let mut forced = executed(5, "explore", GateState::Succeeded, true, None);
        forced.forced = true;
        engine.record_decision(&forced);

        let summary = engine.summary();
        assert_eq!(summary.ticks, 5);
        assert_eq!(summary.idle_ticks, 1);
        assert_eq!(summary.executions, 4);
        assert_eq!(summary.successes, 2);
        assert_eq!(summary.retries, 1);
        assert_eq!(summary.escalations, 1);
        assert_eq!(summary.forced, 1);
        assert!((summary.mean_reward.unwrap() - 0.5).abs() < 1e-10);
        assert_eq!(summary.by_action[0], ("speak".to_string(), 2));
        assert_eq!(summary.success_rate(), Some(0.5));
    }

    #[test]
    fn recent_traces_newest_first() {
        let engine = TelemetryEngine::new();
        for tick in 0..5 {
            engine.start_trace(tick);
        }
        let recent = engine.recent_traces(3);
        assert_eq!(recent.iter().map(|t| t.tick).collect::<Vec<_>>(), vec![4, 3, 2]);
    }
}
