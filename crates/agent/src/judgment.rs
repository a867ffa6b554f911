//! Outcome judgment and satisfaction scoring.
//!
//! Both stages can consult the text generator, and both have a
//! deterministic rule to fall back on when it is unavailable or answers
//! with something unparseable.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;
use volition_core::action::{Action, ActionOutcome};
use volition_core::error::GenerationError;
use volition_core::generator::{GenerationRequest, TextGenerator};

/// How an executed action should be resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Success,
    Retry,
    Escalate,
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::Retry => write!(f, "retry"),
            Self::Escalate => write!(f, "escalate"),
        }
    }
}

/// Cut the first JSON object out of generator text, tolerating code fences
/// and chatter around it.
pub(crate) fn json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

// ── Judges ────────────────────────────────────────────────────────────────

#[async_trait]
pub trait Judge: Send + Sync {
    fn name(&self) -> &str;

    async fn judge(&self, action: &Action, outcome: &ActionOutcome) -> Result<Verdict, GenerationError>;
}

/// Deterministic judge: success is success, anything else is retried and
/// left to the gate's ceiling to escalate. Behaviors can request immediate
/// escalation with `{"escalate": true}` in the outcome data.
pub struct RuleJudge;

impl RuleJudge {
    pub fn verdict(outcome: &ActionOutcome) -> Verdict {
        if outcome.success {
            return Verdict::Success;
        }
        let wants_escalation = outcome
            .data
            .as_ref()
            .and_then(|d| d.get("escalate"))
            .and_then(serde_json::Value::as_bool)
            .unwrap_or(false);
        if wants_escalation { Verdict::Escalate } else { Verdict::Retry }
    }
}

#[async_trait]
impl Judge for RuleJudge {
    fn name(&self) -> &str {
        "rule"
    }

    async fn judge(&self, _action: &Action, outcome: &ActionOutcome) -> Result<Verdict, GenerationError> {
        Ok(Self::verdict(outcome))
    }
}

#[derive(Deserialize)]
struct VerdictReply {
    verdict: Verdict,
}

/// Asks the generator to classify the outcome.
pub struct GeneratorJudge {
    generator: Arc<dyn TextGenerator>,
}

impl GeneratorJudge {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator }
    }

    fn request(action: &Action, outcome: &ActionOutcome) -> GenerationRequest {
        let prompt = format!(
            "Action: {name}\nAttempt: {attempt}\nReported success: {success}\nOutput: {output}\n\n\
             Classify the result. Reply with JSON: {{\"verdict\": \"success\" | \"retry\" | \"escalate\"}}",
            name = action.name,
            attempt = action.retries + 1,
            success = outcome.success,
            output = outcome.output,
        );
        GenerationRequest::new(prompt)
            .with_system("You review the results of an autonomous agent's actions.")
            .with_temperature(0.0)
            .with_max_tokens(64)
            .json()
    }
}

#[async_trait]
impl Judge for GeneratorJudge {
    fn name(&self) -> &str {
        "generator"
    }

    async fn judge(&self, action: &Action, outcome: &ActionOutcome) -> Result<Verdict, GenerationError> {
        let text = self.generator.generate(Self::request(action, outcome)).await?;
        let body = json_object(&text).ok_or_else(|| GenerationError::Malformed("no JSON object in verdict".into()))?;
        let reply: VerdictReply =
            serde_json::from_str(body).map_err(|e| GenerationError::Malformed(e.to_string()))?;

        // A failed execution is never accepted as a success.
        let verdict = match reply.verdict {
            Verdict::Success if !outcome.success => Verdict::Retry,
            v => v,
        };
        debug!(action = %action.name, %verdict, "Generator verdict");
        Ok(verdict)
    }
}

// ── Satisfaction ──────────────────────────────────────────────────────────

#[async_trait]
pub trait SatisfactionScorer: Send + Sync {
    fn name(&self) -> &str;

    /// Satisfaction in [0, 1].
    async fn score(&self, action: &Action, rationale: &str, outcome: &ActionOutcome) -> Result<f64, GenerationError>;
}

/// Offline scorer: a fixed value per outcome.
pub struct RuleScorer {
    pub on_success: f64,
    pub on_failure: f64,
}

impl Default for RuleScorer {
    fn default() -> Self {
        Self {
            on_success: 0.6,
            on_failure: 0.2,
        }
    }
}

#[async_trait]
impl SatisfactionScorer for RuleScorer {
    fn name(&self) -> &str {
        "rule"
    }

    async fn score(&self, _action: &Action, _rationale: &str, outcome: &ActionOutcome) -> Result<f64, GenerationError> {
        Ok(if outcome.success { self.on_success } else { self.on_failure })
    }
}

#[derive(Deserialize)]
struct ScoreReply {
    score: f64,
}

/// Asks the generator how well the outcome served the rationale.
pub struct GeneratorScorer {
    generator: Arc<dyn TextGenerator>,
}

impl GeneratorScorer {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator }
    }
}

#[async_trait]
impl SatisfactionScorer for GeneratorScorer {
    fn name(&self) -> &str {
        "generator"
    }

    async fn score(&self, action: &Action, rationale: &str, outcome: &ActionOutcome) -> Result<f64, GenerationError> {
        let prompt = format!(
            "The agent chose '{name}' because: {rationale}\nSuccess: {success}\nOutput: {output}\n\n\
             How satisfying was this outcome, from 0.0 to 1.0? Reply with JSON: {{\"score\": <number>}}",
            name = action.name,
            success = outcome.success,
            output = outcome.output,
        );
        let request = GenerationRequest::new(prompt)
            .with_temperature(0.0)
            .with_max_tokens(32)
            .json();
        let text = self.generator.generate(request).await?;
        let body = json_object(&text).ok_or_else(|| GenerationError::Malformed("no JSON object in score".into()))?;
        let reply: ScoreReply = serde_json::from_str(body).map_err(|e| GenerationError::Malformed(e.to_string()))?;
        if !reply.score.is_finite() {
            return Err(GenerationError::Malformed(format!("non-finite score {}", reply.score)));
        }
        Ok(reply.score.clamp(0.0, 1.0))
    }
}
