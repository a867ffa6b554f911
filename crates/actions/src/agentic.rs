//! Agentic behaviors: actions that reach outside the agent.

use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use tracing::info;
use volition_core::action::ActionOutcome;
use volition_core::catalog::Behavior;
use volition_core::error::ActionError;
use volition_core::store::{StateStore, keys};

use crate::journal::{self, ClarificationRequest, JournalEntry, payload_str};

/// Says something to the operator. Fails without text.
pub struct SpeakBehavior {
    store: Arc<dyn StateStore>,
}

impl SpeakBehavior {
    pub fn new(store: Arc<dyn StateStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Behavior for SpeakBehavior {
    fn name(&self) -> &str {
        "speak"
    }

    fn summary(&self) -> &str {
        "Say something to the operator"
    }

    fn is_agentic(&self) -> bool {
        true
    }

    fn is_user_facing(&self) -> bool {
        true
    }

    async fn execute(&self, payload: serde_json::Value) -> Result<ActionOutcome, ActionError> {
        let text = payload_str(&payload, "text").ok_or_else(|| ActionError::InvalidPayload {
            action: self.name().into(),
            reason: "nothing to say (missing 'text')".into(),
        })?;

        info!(target: "volition::speech", "{text}");
        let entry = JournalEntry::new(self.name(), text.clone());
        journal::write(self.store.as_ref(), keys::JOURNAL, self.name(), &entry).await?;
        Ok(ActionOutcome::ok(text))
    }
}

/// Picks a topic the journal has not touched recently and records it as
/// explored.
pub struct ExploreBehavior {
    store: Arc<dyn StateStore>,
}

impl ExploreBehavior {
    pub fn new(store: Arc<dyn StateStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Behavior for ExploreBehavior {
    fn name(&self) -> &str {
        "explore"
    }

    fn summary(&self) -> &str {
        "Investigate a topic not touched recently"
    }

    fn is_agentic(&self) -> bool {
        true
    }

    async fn execute(&self, payload: serde_json::Value) -> Result<ActionOutcome, ActionError> {
        let recent = journal::recent(self.store.as_ref(), 20).await;
        let topic = payload_str(&payload, "topic");

        let already = topic
            .as_deref()
            .is_some_and(|t| recent.iter().any(|e| e.topic.as_deref() == Some(t)));
        let text = match &topic {
            Some(t) if already => format!("Revisited {t}"),
            Some(t) => format!("Explored {t}"),
            None => "Explored an open question".to_string(),
        };

        let entry = JournalEntry::new(self.name(), text.clone()).with_topic(topic);
        journal::write(self.store.as_ref(), keys::JOURNAL, self.name(), &entry).await?;
        Ok(ActionOutcome::ok(text).with_data(serde_json::json!({"revisited": already})))
    }
}

/// Queues a clarification request for the operator.
///
/// This is the escalation target of the action gate, so it carries the
/// failed action's name in `regarding`.
pub struct AskUserBehavior {
    store: Arc<dyn StateStore>,
}

impl AskUserBehavior {
    pub fn new(store: Arc<dyn StateStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Behavior for AskUserBehavior {
    fn name(&self) -> &str {
        "ask_user"
    }

    fn summary(&self) -> &str {
        "Ask the operator for clarification"
    }

    fn is_agentic(&self) -> bool {
        true
    }

    fn is_user_facing(&self) -> bool {
        true
    }

    async fn execute(&self, payload: serde_json::Value) -> Result<ActionOutcome, ActionError> {
        let regarding = payload_str(&payload, "regarding");
        let question = payload_str(&payload, "question").unwrap_or_else(|| match &regarding {
            Some(action) => format!("I could not complete '{action}'. How should I proceed?"),
            None => "What should I focus on next?".to_string(),
        });

        let request = ClarificationRequest {
            id: uuid::Uuid::new_v4().to_string(),
            question: question.clone(),
            regarding,
            timestamp: Utc::now(),
        };
        journal::write(self.store.as_ref(), keys::CLARIFICATIONS, self.name(), &request).await?;
        info!(target: "volition::speech", "{question}");
        Ok(ActionOutcome::ok(question).with_data(serde_json::json!({"request_id": request.id})))
    }
}
