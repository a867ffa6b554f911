//! Candidate proposal.
//!
//! The generator proposer asks the text generator for a short JSON list of
//! candidates. When it is unavailable, or its reply cannot be used, the loop
//! falls back to [`CatalogProposer`], which shortlists catalog actions with
//! the bandit.

use async_trait::async_trait;
use rand::Rng;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, warn};
use volition_core::action::Action;
use volition_core::affect::{AffectDimension, AffectState};
use volition_core::catalog::ActionCatalog;
use volition_core::error::GenerationError;
use volition_core::generator::{GenerationRequest, TextGenerator};
use volition_core::goal::Goal;

use crate::bandit::ContextualBandit;
use crate::features::FeatureVector;
use crate::judgment::json_object;

/// Proposals beyond this many are ignored.
const MAX_PROPOSALS: usize = 8;

/// What a proposer sees.
pub struct ProposalContext<'a> {
    pub tick: u64,
    pub catalog: &'a ActionCatalog,
    pub affect: &'a AffectState,
    pub goals: &'a [Goal],
    /// Recent executed action names, oldest first
    pub recent: &'a [String],
    pub features: &'a FeatureVector,
    pub bandit: &'a ContextualBandit,
    /// Never proposed directly; only the gate's escalation uses it
    pub clarification_action: &'a str,
}

impl ProposalContext<'_> {
    fn highest_goal(&self) -> Option<&Goal> {
        self.goals
            .iter()
            .filter(|g| !g.completed)
            .max_by_key(|g| g.tier)
    }

    fn proposable(&self) -> Vec<String> {
        self.catalog
            .list_candidates()
            .into_iter()
            .filter(|name| name != self.clarification_action)
            .collect()
    }
}

#[async_trait]
pub trait Proposer: Send + Sync {
    fn name(&self) -> &str;

    async fn propose(&self, ctx: &ProposalContext<'_>) -> Result<Vec<Action>, GenerationError>;
}

#[derive(Deserialize)]
struct ProposalReply {
    #[serde(default)]
    candidates: Vec<ProposalItem>,
}

#[derive(Deserialize)]
struct ProposalItem {
    name: String,
    #[serde(default)]
    urgency: Option<f64>,
    #[serde(default)]
    payload: serde_json::Value,
    #[serde(default)]
    goal: Option<String>,
    #[serde(default)]
    rationale: Option<String>,
}

pub struct GeneratorProposer {
    generator: Arc<dyn TextGenerator>,
    temperature: f32,
    max_tokens: u32,
}

impl GeneratorProposer {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self {
            generator,
            temperature: 0.7,
            max_tokens: 512,
        }
    }

    pub fn with_sampling(mut self, temperature: f32, max_tokens: u32) -> Self {
        self.temperature = temperature;
        self.max_tokens = max_tokens;
        self
    }

    fn prompt(ctx: &ProposalContext<'_>) -> String {
        let mut prompt = String::from("Available actions:\n");
        for name in ctx.proposable() {
            let summary = ctx.catalog.summary(&name).unwrap_or("");
            prompt.push_str(&format!("- {name} ({}): {summary}\n", ctx.catalog.kind_of(&name)));
        }

        prompt.push_str("\nCurrent affect:\n");
        for dim in AffectDimension::ALL {
            prompt.push_str(&format!("- {dim}: {:.2}\n", ctx.affect.get(dim)));
        }

        let open: Vec<&Goal> = ctx.goals.iter().filter(|g| !g.completed).collect();
        if !open.is_empty() {
            prompt.push_str("\nOpen goals:\n");
            for goal in open {
                prompt.push_str(&format!("- [{}] tier {}: {}\n", goal.id, goal.tier, goal.description));
            }
        }

        if !ctx.recent.is_empty() {
            prompt.push_str(&format!("\nRecent actions: {}\n", ctx.recent.join(", ")));
        }

        prompt.push_str(
            "\nPropose up to three next actions. Reply with JSON: \
             {\"candidates\": [{\"name\": ..., \"urgency\": 0.0-1.0, \"payload\": {...}, \
             \"goal\": <goal id or null>, \"rationale\": ...}]}",
        );
        prompt
    }
}

#[async_trait]
impl Proposer for GeneratorProposer {
    fn name(&self) -> &str {
        "generator"
    }

    async fn propose(&self, ctx: &ProposalContext<'_>) -> Result<Vec<Action>, GenerationError> {
        let request = GenerationRequest::new(Self::prompt(ctx))
            .with_system("You decide what an autonomous agent should do next.")
            .with_temperature(self.temperature)
            .with_max_tokens(self.max_tokens)
            .json();
        let text = self.generator.generate(request).await?;
        let body = json_object(&text).ok_or_else(|| GenerationError::Malformed("no JSON object in proposal".into()))?;
        let reply: ProposalReply = serde_json::from_str(body).map_err(|e| GenerationError::Malformed(e.to_string()))?;

        let actions: Vec<Action> = reply
            .candidates
            .into_iter()
            .filter(|item| !item.name.trim().is_empty())
            .take(MAX_PROPOSALS)
            .map(|item| {
                if !ctx.catalog.contains(&item.name) {
                    warn!(action = %item.name, "Proposer named an action outside the catalog");
                }
                let mut action = Action::new(item.name.trim())
                    .with_kind(ctx.catalog.kind_of(item.name.trim()))
                    .user_facing(ctx.catalog.is_user_facing(item.name.trim()))
                    .with_urgency(item.urgency.unwrap_or(0.5))
                    .with_payload(item.payload);
                if let Some(goal) = item.goal.filter(|g| !g.is_empty()) {
                    action = action.with_goal(goal);
                }
                if let Some(rationale) = item.rationale {
                    action = action.with_rationale(rationale);
                }
                action
            })
            .collect();

        if actions.is_empty() {
            return Err(GenerationError::Malformed("proposal listed no candidates".into()));
        }
        debug!(count = actions.len(), "Generator proposed candidates");
        Ok(actions)
    }
}

/// Bandit-driven shortlist over the catalog.
pub struct CatalogProposer {
    size: usize,
    epsilon: f64,
}

impl CatalogProposer {
    pub fn new(size: usize, epsilon: f64) -> Self {
        Self {
            size: size.max(1),
            epsilon,
        }
    }

    /// Pick up to `size` distinct actions, one bandit choice at a time.
    /// Earlier picks get higher urgency.
    pub fn propose<R: Rng>(&self, ctx: &ProposalContext<'_>, rng: &mut R) -> Vec<Action> {
        let mut remaining = ctx.proposable();
        let mut picks = Vec::new();
        while picks.len() < self.size {
            let Ok(name) = ctx.bandit.choose(&remaining, ctx.features, self.epsilon, rng) else {
                break;
            };
            let name = name.to_string();
            remaining.retain(|n| *n != name);
            let urgency = 0.6 - 0.05 * picks.len() as f64;
            picks.push(self.build(ctx, &name, urgency));
        }
        picks
    }

    fn build(&self, ctx: &ProposalContext<'_>, name: &str, urgency: f64) -> Action {
        let goal = ctx.highest_goal();
        let topic = goal.map_or("whatever seems most pressing", |g| g.description.as_str());
        let payload = match name {
            "speak" => serde_json::json!({ "text": format!("Checking in at tick {}: working on {topic}.", ctx.tick) }),
            "explore" | "plan" => serde_json::json!({ "topic": topic }),
            "dream" => serde_json::json!({ "seed": topic }),
            "reflect" => serde_json::json!({ "focus": topic }),
            _ => serde_json::json!({}),
        };

        let mut action = Action::new(name)
            .with_kind(ctx.catalog.kind_of(name))
            .user_facing(ctx.catalog.is_user_facing(name))
            .with_urgency(urgency)
            .with_payload(payload)
            .with_rationale(format!("bandit shortlist for tick {}", ctx.tick));
        if let Some(goal) = goal.filter(|_| matches!(name, "plan" | "explore")) {
            action = action.with_goal(goal.id.clone());
        }
        action
    }
}
