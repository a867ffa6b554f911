//! Cognitive behaviors: internal work that changes no external state.
//!
//! `reflect` and `dream` ask the generator for a few sentences and fall back
//! to a fixed template when it is unavailable. `plan` and `log` are pure
//! journal writes.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;
use volition_core::action::ActionOutcome;
use volition_core::catalog::Behavior;
use volition_core::error::ActionError;
use volition_core::generator::{GenerationRequest, TextGenerator};
use volition_core::store::{StateStore, keys};

use crate::journal::{self, JournalEntry, payload_str};

/// Generate text, or use `fallback` when no generator is wired in or it fails.
async fn generate_or(
    generator: Option<&Arc<dyn TextGenerator>>,
    action: &str,
    prompt: String,
    fallback: String,
) -> String {
    let Some(generator) = generator else {
        return fallback;
    };
    match generator
        .generate(GenerationRequest::new(prompt).with_max_tokens(160))
        .await
    {
        Ok(text) => text.trim().to_string(),
        Err(e) => {
            debug!(action, error = %e, "Generator unavailable, using template");
            fallback
        }
    }
}

/// Looks back over recent journal entries and writes a reflection.
pub struct ReflectBehavior {
    store: Arc<dyn StateStore>,
    generator: Option<Arc<dyn TextGenerator>>,
}

impl ReflectBehavior {
    pub fn new(store: Arc<dyn StateStore>) -> Self {
        Self {
            store,
            generator: None,
        }
    }

    pub fn with_generator(mut self, generator: Arc<dyn TextGenerator>) -> Self {
        self.generator = Some(generator);
        self
    }
}

#[async_trait]
impl Behavior for ReflectBehavior {
    fn name(&self) -> &str {
        "reflect"
    }

    fn summary(&self) -> &str {
        "Review recent journal entries and note what stands out"
    }

    async fn execute(&self, payload: serde_json::Value) -> Result<ActionOutcome, ActionError> {
        let topic = payload_str(&payload, "topic");
        let recent = journal::recent(self.store.as_ref(), 5).await;
        let context: Vec<&str> = recent.iter().map(|e| e.text.as_str()).collect();

        let prompt = format!(
            "Reflect briefly on these recent notes{}:\n{}",
            topic.as_deref().map(|t| format!(" about {t}")).unwrap_or_default(),
            context.join("\n")
        );
        let fallback = format!(
            "Reflected on {} recent note(s){}.",
            recent.len(),
            topic.as_deref().map(|t| format!(" about {t}")).unwrap_or_default()
        );
        let text = generate_or(self.generator.as_ref(), self.name(), prompt, fallback).await;

        let entry = JournalEntry::new(self.name(), text.clone()).with_topic(topic);
        journal::write(self.store.as_ref(), keys::JOURNAL, self.name(), &entry).await?;
        Ok(ActionOutcome::ok(text).with_data(serde_json::json!({"considered": recent.len()})))
    }
}

/// Writes a short plan of next steps for a goal or topic.
pub struct PlanBehavior {
    store: Arc<dyn StateStore>,
}

impl PlanBehavior {
    pub fn new(store: Arc<dyn StateStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Behavior for PlanBehavior {
    fn name(&self) -> &str {
        "plan"
    }

    fn summary(&self) -> &str {
        "Outline next steps toward an open goal"
    }

    async fn execute(&self, payload: serde_json::Value) -> Result<ActionOutcome, ActionError> {
        let topic = payload_str(&payload, "goal").or_else(|| payload_str(&payload, "topic"));
        let steps: Vec<String> = payload
            .get("steps")
            .and_then(|s| s.as_array())
            .map(|steps| {
                steps
                    .iter()
                    .filter_map(|s| s.as_str().map(String::from))
                    .collect()
            })
            .unwrap_or_default();

        let text = match (&topic, steps.is_empty()) {
            (Some(t), false) => format!("Plan for {t}: {}", steps.join("; ")),
            (Some(t), true) => format!("Plan for {t}: break it down next cycle"),
            (None, false) => format!("Plan: {}", steps.join("; ")),
            (None, true) => "Plan: pick the highest-tier open goal".to_string(),
        };

        let entry = JournalEntry::new(self.name(), text.clone()).with_topic(topic);
        journal::write(self.store.as_ref(), keys::JOURNAL, self.name(), &entry).await?;
        Ok(ActionOutcome::ok(text).with_data(serde_json::json!({"steps": steps.len()})))
    }
}

/// Records a status note.
pub struct LogBehavior {
    store: Arc<dyn StateStore>,
}

impl LogBehavior {
    pub fn new(store: Arc<dyn StateStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Behavior for LogBehavior {
    fn name(&self) -> &str {
        "log"
    }

    fn summary(&self) -> &str {
        "Write a status note to the journal"
    }

    async fn execute(&self, payload: serde_json::Value) -> Result<ActionOutcome, ActionError> {
        let text = payload_str(&payload, "text").unwrap_or_else(|| "status checkpoint".to_string());
        let entry = JournalEntry::new(self.name(), text.clone());
        journal::write(self.store.as_ref(), keys::JOURNAL, self.name(), &entry).await?;
        Ok(ActionOutcome::ok(format!("logged: {text}")))
    }
}

/// Free association over a seed phrase.
pub struct DreamBehavior {
    store: Arc<dyn StateStore>,
    generator: Option<Arc<dyn TextGenerator>>,
}

impl DreamBehavior {
    pub fn new(store: Arc<dyn StateStore>) -> Self {
        Self {
            store,
            generator: None,
        }
    }

    pub fn with_generator(mut self, generator: Arc<dyn TextGenerator>) -> Self {
        self.generator = Some(generator);
        self
    }
}

#[async_trait]
impl Behavior for DreamBehavior {
    fn name(&self) -> &str {
        "dream"
    }

    fn summary(&self) -> &str {
        "Free-associate from a seed phrase to surface new ideas"
    }

    async fn execute(&self, payload: serde_json::Value) -> Result<ActionOutcome, ActionError> {
        let seed = payload_str(&payload, "seed").unwrap_or_else(|| "something unexplored".to_string());
        let prompt = format!("Free-associate for three short lines starting from: {seed}");
        let fallback = format!("Drifted from \"{seed}\" without settling anywhere.");
        let text = generate_or(self.generator.as_ref(), self.name(), prompt, fallback).await;

        let entry = JournalEntry::new(self.name(), text.clone()).with_topic(Some(seed));
        journal::write(self.store.as_ref(), keys::JOURNAL, self.name(), &entry).await?;
        Ok(ActionOutcome::ok(text))
    }
}
