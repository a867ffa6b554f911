//! State store trait: the key-value persistence layer.
//!
//! One logical key per state artifact (bandit weights, fatigue table, affect
//! state, pending queue, decision history, reward trace). Values are whole
//! JSON documents overwritten atomically; history-style artifacts are
//! append-only lists.
//!
//! Corrupted or malformed stored values are treated as absent: the typed
//! helpers below log a warning and fall back to the artifact's default
//! instead of failing the tick.

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::warn;

use crate::error::StoreError;

/// Well-known artifact keys.
pub mod keys {
    pub const BANDIT: &str = "bandit";
    pub const FATIGUE: &str = "fatigue";
    pub const AFFECT: &str = "affect";
    pub const PENDING: &str = "pending_queue";
    pub const HISTORY: &str = "decision_history";
    pub const REWARD_TRACE: &str = "reward_trace";
    pub const LOOP_META: &str = "loop_meta";
    pub const OVERLAY: &str = "context_overlay";
    pub const GOALS: &str = "goals";
    pub const JOURNAL: &str = "journal";
    pub const CLARIFICATIONS: &str = "clarifications";

    /// Every document-style artifact (resettable from the CLI).
    pub const DOCUMENTS: [&str; 8] = [
        BANDIT,
        FATIGUE,
        AFFECT,
        PENDING,
        REWARD_TRACE,
        LOOP_META,
        OVERLAY,
        GOALS,
    ];

    /// Every list-style artifact.
    pub const LISTS: [&str; 3] = [HISTORY, JOURNAL, CLARIFICATIONS];
}

/// Reject keys that could escape a storage directory.
pub fn validate_key(key: &str) -> Result<(), StoreError> {
    let ok = !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-');
    if ok {
        Ok(())
    } else {
        Err(StoreError::InvalidKey(key.to_string()))
    }
}

/// The core StateStore trait.
///
/// Implementations: file-backed (JSON + JSONL), in-memory (for testing).
#[async_trait]
pub trait StateStore: Send + Sync {
    /// The backend name (e.g. "file", "memory").
    fn name(&self) -> &str;

    /// Read a document; `None` when missing or unreadable.
    async fn get(&self, key: &str) -> Result<Option<serde_json::Value>, StoreError>;

    /// Atomically overwrite a document.
    async fn put(&self, key: &str, value: serde_json::Value) -> Result<(), StoreError>;

    /// Append one record to a list artifact.
    async fn append(&self, key: &str, value: serde_json::Value) -> Result<(), StoreError>;

    /// Read every record of a list artifact, oldest first.
    async fn list(&self, key: &str) -> Result<Vec<serde_json::Value>, StoreError>;

    /// Read the newest `n` records of a list artifact, oldest first.
    async fn tail(&self, key: &str, n: usize) -> Result<Vec<serde_json::Value>, StoreError> {
        let mut all = self.list(key).await?;
        let skip = all.len().saturating_sub(n);
        Ok(all.split_off(skip))
    }

    /// Keep only the newest `keep` records; returns how many were dropped.
    async fn trim(&self, key: &str, keep: usize) -> Result<usize, StoreError>;

    /// Delete a document or list. Returns whether anything existed.
    async fn remove(&self, key: &str) -> Result<bool, StoreError>;
}

/// Load a typed document, falling back to `T::default()` when it is
/// missing, unreadable, or does not match the expected shape.
pub async fn load_or_default<T>(store: &dyn StateStore, key: &str) -> T
where
    T: DeserializeOwned + Default,
{
    match store.get(key).await {
        Ok(Some(value)) => match serde_json::from_value(value) {
            Ok(typed) => typed,
            Err(e) => {
                warn!(key, error = %e, "Malformed stored state, resetting to default");
                T::default()
            }
        },
        Ok(None) => T::default(),
        Err(e) => {
            warn!(key, error = %e, "Failed to read stored state, using default");
            T::default()
        }
    }
}

/// Serialize and overwrite a typed document.
pub async fn save<T: Serialize + ?Sized>(store: &dyn StateStore, key: &str, value: &T) -> Result<(), StoreError> {
    let json = serde_json::to_value(value).map_err(|e| StoreError::Encode {
        key: key.to_string(),
        reason: e.to_string(),
    })?;
    store.put(key, json).await
}

/// Serialize and append a typed record.
pub async fn append<T: Serialize + ?Sized>(store: &dyn StateStore, key: &str, value: &T) -> Result<(), StoreError> {
    let json = serde_json::to_value(value).map_err(|e| StoreError::Encode {
        key: key.to_string(),
        reason: e.to_string(),
    })?;
    store.append(key, json).await
}

/// Read the newest `n` typed records, skipping any that fail to decode.
pub async fn load_tail<T: DeserializeOwned>(store: &dyn StateStore, key: &str, n: usize) -> Vec<T> {
    let raw = match store.tail(key, n).await {
        Ok(raw) => raw,
        Err(e) => {
            warn!(key, error = %e, "Failed to read stored list, treating as empty");
            return Vec::new();
        }
    };
    raw.into_iter()
        .filter_map(|value| match serde_json::from_value(value) {
            Ok(typed) => Some(typed),
            Err(e) => {
                warn!(key, error = %e, "Skipping malformed list record");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_validation() {
        assert!(validate_key(keys::BANDIT).is_ok());
        assert!(validate_key("decision_history").is_ok());
        assert!(validate_key("../secrets").is_err());
        assert!(validate_key("").is_err());
        assert!(validate_key("Bandit").is_err());
    }

    #[test]
    fn well_known_keys_are_valid() {
        for key in keys::DOCUMENTS.iter().chain(keys::LISTS.iter()) {
            assert!(validate_key(key).is_ok(), "{key} should be a valid key");
        }
    }
}
