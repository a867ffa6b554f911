//! Action catalog: the registry of executable behaviors.
//!
//! Behaviors are what give the agent the ability to act: reflect, plan,
//! speak, ask the user for clarification, and so on. They are registered
//! statically (or from configuration) in an [`ActionCatalog`], which the
//! decision loop consumes through three questions: which actions exist,
//! which of them are agentic, and "run this one".

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::warn;

use crate::action::{ActionKind, ActionOutcome};
use crate::error::ActionError;

/// The core Behavior trait.
///
/// Each catalog entry (reflect, speak, plan, ...) implements this trait.
#[async_trait]
pub trait Behavior: Send + Sync {
    /// The unique name of this behavior (e.g. "reflect").
    fn name(&self) -> &str;

    /// A short human-readable summary (shown to the proposer).
    fn summary(&self) -> &str;

    /// Whether running this changes external state.
    fn is_agentic(&self) -> bool {
        false
    }

    /// Whether this is a direct response to the user.
    fn is_user_facing(&self) -> bool {
        false
    }

    /// Run the behavior.
    async fn execute(&self, payload: serde_json::Value) -> std::result::Result<ActionOutcome, ActionError>;
}

/// A registered behavior plus its (possibly config-overridden) flags.
#[derive(Clone)]
pub struct CatalogEntry {
    pub behavior: Arc<dyn Behavior>,
    pub agentic: bool,
    pub user_facing: bool,
    pub summary: String,
}

impl CatalogEntry {
    pub fn new(behavior: Arc<dyn Behavior>) -> Self {
        Self {
            agentic: behavior.is_agentic(),
            user_facing: behavior.is_user_facing(),
            summary: behavior.summary().to_string(),
            behavior,
        }
    }

    pub fn kind(&self) -> ActionKind {
        ActionKind::from_agentic(self.agentic)
    }
}

impl std::fmt::Debug for CatalogEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogEntry")
            .field("name", &self.behavior.name())
            .field("agentic", &self.agentic)
            .field("user_facing", &self.user_facing)
            .field("summary", &self.summary)
            .finish()
    }
}

/// A name-ordered registry of behaviors.
#[derive(Default)]
pub struct ActionCatalog {
    entries: BTreeMap<String, CatalogEntry>,
}

impl ActionCatalog {
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Register a behavior with its own flags. Replaces any existing entry
    /// with the same name.
    pub fn register(&mut self, behavior: Arc<dyn Behavior>) {
        self.insert(CatalogEntry::new(behavior));
    }

    /// Register a fully specified entry.
    pub fn insert(&mut self, entry: CatalogEntry) {
        let name = entry.behavior.name().to_string();
        self.entries.insert(name, entry);
    }

    /// Swap the whole registry for a freshly built set of entries.
    pub fn reload(&mut self, entries: impl IntoIterator<Item = CatalogEntry>) {
        self.entries = entries
            .into_iter()
            .map(|e| (e.behavior.name().to_string(), e))
            .collect();
    }

    pub fn get(&self, name: &str) -> Option<&CatalogEntry> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Every action name, in name order.
    pub fn list_candidates(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    /// Unknown names are never agentic.
    pub fn is_agentic(&self, name: &str) -> bool {
        self.entries.get(name).is_some_and(|e| e.agentic)
    }

    pub fn is_user_facing(&self, name: &str) -> bool {
        self.entries.get(name).is_some_and(|e| e.user_facing)
    }

    pub fn kind_of(&self, name: &str) -> ActionKind {
        ActionKind::from_agentic(self.is_agentic(name))
    }

    pub fn summary(&self, name: &str) -> Option<&str> {
        self.entries.get(name).map(|e| e.summary.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Run an action by name.
    ///
    /// Never fails: unknown names and behavior errors come back as a failed
    /// outcome so they travel the normal retry/escalate path.
    pub async fn execute(&self, name: &str, payload: serde_json::Value) -> ActionOutcome {
        let Some(entry) = self.entries.get(name) else {
            warn!(action = name, "Unknown action requested");
            return ActionOutcome::failed(ActionError::Unknown(name.to_string()).to_string());
        };
        match entry.behavior.execute(payload).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(action = name, error = %e, "Action execution failed");
                ActionOutcome::failed(e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A simple behavior for unit tests.
    struct EchoBehavior;

    #[async_trait]
    impl Behavior for EchoBehavior {
        fn name(&self) -> &str { "echo" }
        fn summary(&self) -> &str { "Echoes back the payload text" }
        fn is_agentic(&self) -> bool { true }
        async fn execute(&self, payload: serde_json::Value) -> std::result::Result<ActionOutcome, ActionError> {
            match payload["text"].as_str() {
                Some(text) => Ok(ActionOutcome::ok(text)),
                None => Err(ActionError::InvalidPayload {
                    action: "echo".into(),
                    reason: "missing text".into(),
                }),
            }
        }
    }

    #[test]
    fn register_and_lookup() {
        let mut catalog = ActionCatalog::new();
        catalog.register(Arc::new(EchoBehavior));
        assert!(catalog.contains("echo"));
        assert!(catalog.is_agentic("echo"));
        assert!(!catalog.is_agentic("nonexistent"));
        assert_eq!(catalog.list_candidates(), vec!["echo".to_string()]);
    }

    #[tokio::test]
    async fn execute_known_action() {
        let mut catalog = ActionCatalog::new();
        catalog.register(Arc::new(EchoBehavior));
        let outcome = catalog.execute("echo", serde_json::json!({"text": "hi"})).await;
        assert!(outcome.success);
        assert_eq!(outcome.output, "hi");
    }

    #[tokio::test]
    async fn unknown_action_is_a_failed_outcome() {
        let catalog = ActionCatalog::new();
        let outcome = catalog.execute("teleport", serde_json::Value::Null).await;
        assert!(!outcome.success);
        assert!(outcome.output.contains("teleport"));
    }

    #[tokio::test]
    async fn behavior_error_is_a_failed_outcome() {
        let mut catalog = ActionCatalog::new();
        catalog.register(Arc::new(EchoBehavior));
        let outcome = catalog.execute("echo", serde_json::json!({})).await;
        assert!(!outcome.success);
        assert!(outcome.output.contains("missing text"));
    }

    #[test]
    fn reload_replaces_entries() {
        let mut catalog = ActionCatalog::new();
        catalog.register(Arc::new(EchoBehavior));
        let mut entry = CatalogEntry::new(Arc::new(EchoBehavior));
        entry.agentic = false;
        catalog.reload(vec![entry]);
        assert_eq!(catalog.len(), 1);
        assert!(!catalog.is_agentic("echo"));
    }
}
