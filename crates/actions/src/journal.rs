//! The journal: an append-only record of what behaviors produced.
//!
//! Cognitive behaviors write notes here; speech and clarification requests
//! are journaled too so the CLI can show them after a run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use volition_core::error::ActionError;
use volition_core::store::{self, StateStore, keys};

/// One journal record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub id: String,
    /// The behavior that wrote the entry
    pub action: String,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl JournalEntry {
    pub fn new(action: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            action: action.into(),
            text: text.into(),
            topic: None,
            timestamp: Utc::now(),
        }
    }

    pub fn with_topic(mut self, topic: Option<String>) -> Self {
        self.topic = topic;
        self
    }
}

/// A request for operator input, queued by `ask_user`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClarificationRequest {
    pub id: String,
    pub question: String,
    /// The action that could not be completed, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regarding: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// Append `entry` to the journal list under `key`.
pub(crate) async fn write<T: Serialize>(
    store: &dyn StateStore,
    key: &str,
    action: &str,
    entry: &T,
) -> Result<(), ActionError> {
    store::append(store, key, entry)
        .await
        .map_err(|e| ActionError::ExecutionFailed {
            action: action.to_string(),
            reason: e.to_string(),
        })
}

/// The newest `n` journal entries, oldest first.
pub async fn recent(store: &dyn StateStore, n: usize) -> Vec<JournalEntry> {
    store::load_tail(store, keys::JOURNAL, n).await
}

/// The newest `n` clarification requests, oldest first.
pub async fn recent_clarifications(store: &dyn StateStore, n: usize) -> Vec<ClarificationRequest> {
    store::load_tail(store, keys::CLARIFICATIONS, n).await
}

/// Read an optional trimmed string field from a payload.
pub(crate) fn payload_str(payload: &serde_json::Value, field: &str) -> Option<String> {
    payload
        .get(field)
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
}
