//! File-based state store: one file per artifact under a state directory.
//!
//! Documents are stored as `<key>.json` and overwritten atomically (write to
//! a temp file, then rename). List artifacts are stored as `<key>.jsonl`, one
//! JSON record per line, and grow by appending.
//!
//! Storage location: `~/.volition/state/`
//!
//! All operations on one `FileStore` are serialized behind a mutex. This is
//! sufficient for a single writer per state directory; running several
//! agents requires one directory each.

use async_trait::async_trait;
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, warn};
use uuid::Uuid;
use volition_core::error::StoreError;
use volition_core::store::{StateStore, validate_key};

/// A file-backed key-value store.
pub struct FileStore {
    dir: PathBuf,
    lock: Mutex<()>,
}

impl FileStore {
    /// Create a store rooted at `dir`. The directory is created on first write.
    pub fn new(dir: PathBuf) -> Self {
        debug!(dir = %dir.display(), "File state store opened");
        Self {
            dir,
            lock: Mutex::new(()),
        }
    }

    /// Default location: `~/.volition/state`
    pub fn default_dir() -> PathBuf {
        let home = std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string());
        PathBuf::from(home).join(".volition").join("state")
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn document_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    fn list_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.jsonl"))
    }

    fn io_error(key: &str, e: impl std::fmt::Display) -> StoreError {
        StoreError::Io {
            key: key.to_string(),
            reason: e.to_string(),
        }
    }

    fn ensure_dir(&self, key: &str) -> Result<(), StoreError> {
        std::fs::create_dir_all(&self.dir).map_err(|e| Self::io_error(key, format!("create dir: {e}")))
    }

    /// Write `content` to `path` via a temp file + rename.
    fn write_atomic(&self, key: &str, path: &Path, content: &str) -> Result<(), StoreError> {
        self.ensure_dir(key)?;
        let tmp = self.dir.join(format!(".{key}.{}.tmp", Uuid::new_v4()));
        std::fs::write(&tmp, content).map_err(|e| Self::io_error(key, e))?;
        std::fs::rename(&tmp, path).map_err(|e| {
            let _ = std::fs::remove_file(&tmp);
            Self::io_error(key, e)
        })
    }

    /// Read a list file, skipping corrupted lines.
    fn read_lines(&self, key: &str) -> Result<Vec<serde_json::Value>, StoreError> {
        let content = match std::fs::read_to_string(self.list_path(key)) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(Self::io_error(key, e)),
        };

        Ok(content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .filter_map(|line| match serde_json::from_str(line) {
                Ok(value) => Some(value),
                Err(e) => {
                    warn!(key, error = %e, "Skipping corrupted list record");
                    None
                }
            })
            .collect())
    }

    fn encode_lines(key: &str, records: &[serde_json::Value]) -> Result<String, StoreError> {
        let mut content = String::new();
        for record in records {
            let line = serde_json::to_string(record).map_err(|e| StoreError::Encode {
                key: key.to_string(),
                reason: e.to_string(),
            })?;
            content.push_str(&line);
            content.push('\n');
        }
        Ok(content)
    }
}

#[async_trait]
impl StateStore for FileStore {
    fn name(&self) -> &str {
        "file"
    }

    async fn get(&self, key: &str) -> Result<Option<serde_json::Value>, StoreError> {
        validate_key(key)?;
        let _guard = self.lock.lock().await;

        let content = match std::fs::read_to_string(self.document_path(key)) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(Self::io_error(key, e)),
        };

        match serde_json::from_str(&content) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                warn!(key, error = %e, "Corrupted state document, treating as absent");
                Ok(None)
            }
        }
    }

    async fn put(&self, key: &str, value: serde_json::Value) -> Result<(), StoreError> {
        validate_key(key)?;
        let _guard = self.lock.lock().await;

        let content = serde_json::to_string_pretty(&value).map_err(|e| StoreError::Encode {
            key: key.to_string(),
            reason: e.to_string(),
        })?;
        self.write_atomic(key, &self.document_path(key), &content)
    }

    async fn append(&self, key: &str, value: serde_json::Value) -> Result<(), StoreError> {
        validate_key(key)?;
        let _guard = self.lock.lock().await;
        self.ensure_dir(key)?;

        let mut line = serde_json::to_string(&value).map_err(|e| StoreError::Encode {
            key: key.to_string(),
            reason: e.to_string(),
        })?;
        line.push('\n');

        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.list_path(key))
            .map_err(|e| Self::io_error(key, e))?;
        file.write_all(line.as_bytes()).map_err(|e| Self::io_error(key, e))
    }

    async fn list(&self, key: &str) -> Result<Vec<serde_json::Value>, StoreError> {
        validate_key(key)?;
        let _guard = self.lock.lock().await;
        self.read_lines(key)
    }

    async fn trim(&self, key: &str, keep: usize) -> Result<usize, StoreError> {
        validate_key(key)?;
        let _guard = self.lock.lock().await;

        let mut records = self.read_lines(key)?;
        let excess = records.len().saturating_sub(keep);
        if excess == 0 {
            return Ok(0);
        }
        let kept = records.split_off(excess);
        let content = Self::encode_lines(key, &kept)?;
        self.write_atomic(key, &self.list_path(key), &content)?;
        debug!(key, dropped = excess, "Trimmed list artifact");
        Ok(excess)
    }

    async fn remove(&self, key: &str) -> Result<bool, StoreError> {
        validate_key(key)?;
        let _guard = self.lock.lock().await;

        let mut removed = false;
        for path in [self.document_path(key), self.list_path(key)] {
            match std::fs::remove_file(&path) {
                Ok(()) => removed = true,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(Self::io_error(key, e)),
            }
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;
    use volition_core::store::{keys, load_or_default, load_tail};

    #[tokio::test]
    async fn put_and_get_persist_across_instances() {
        let tmp = TempDir::new().unwrap();
        let store = FileStore::new(tmp.path().to_path_buf());
        store.put(keys::AFFECT, json!({"curiosity": 0.8})).await.unwrap();

        let reopened = FileStore::new(tmp.path().to_path_buf());
        let value = reopened.get(keys::AFFECT).await.unwrap().unwrap();
        assert_eq!(value["curiosity"], 0.8);
    }

    #[tokio::test]
    async fn missing_document_is_none() {
        let tmp = TempDir::new().unwrap();
        let store = FileStore::new(tmp.path().join("not-yet-created"));
        assert!(store.get(keys::BANDIT).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn corrupted_document_reads_as_absent() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("bandit.json"), "{not json").unwrap();
        let store = FileStore::new(tmp.path().to_path_buf());
        assert!(store.get(keys::BANDIT).await.unwrap().is_none());

        let typed: std::collections::HashMap<String, f64> = load_or_default(&store, keys::BANDIT).await;
        assert!(typed.is_empty());
    }

    #[tokio::test]
    async fn append_list_and_skip_corrupted_lines() {
        let tmp = TempDir::new().unwrap();
        let store = FileStore::new(tmp.path().to_path_buf());
        store.append(keys::HISTORY, json!({"tick": 1})).await.unwrap();

        let path = tmp.path().join("decision_history.jsonl");
        let mut file = std::fs::OpenOptions::new().append(true).open(&path).unwrap();
        writeln!(file, "this is not json").unwrap();
        drop(file);

        store.append(keys::HISTORY, json!({"tick": 2})).await.unwrap();
        let records = store.list(keys::HISTORY).await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1]["tick"], 2);
    }

    #[tokio::test]
    async fn trim_keeps_newest_records() {
        let tmp = TempDir::new().unwrap();
        let store = FileStore::new(tmp.path().to_path_buf());
        for tick in 0..10 {
            store.append(keys::HISTORY, json!({"tick": tick})).await.unwrap();
        }
        assert_eq!(store.trim(keys::HISTORY, 4).await.unwrap(), 6);

        let ticks: Vec<serde_json::Value> = load_tail(&store, keys::HISTORY, 100).await;
        let ticks: Vec<i64> = ticks.iter().map(|v| v["tick"].as_i64().unwrap()).collect();
        assert_eq!(ticks, vec![6, 7, 8, 9]);
    }

    #[tokio::test]
    async fn remove_deletes_both_shapes() {
        let tmp = TempDir::new().unwrap();
        let store = FileStore::new(tmp.path().to_path_buf());
        store.put(keys::GOALS, json!([])).await.unwrap();
        assert!(store.remove(keys::GOALS).await.unwrap());
        assert!(!store.remove(keys::GOALS).await.unwrap());
        assert!(store.get(keys::GOALS).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn overwrite_leaves_no_temp_files() {
        let tmp = TempDir::new().unwrap();
        let store = FileStore::new(tmp.path().to_path_buf());
        for i in 0..3 {
            store.put(keys::LOOP_META, json!({"tick": i})).await.unwrap();
        }
        let names: Vec<String> = std::fs::read_dir(tmp.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["loop_meta.json".to_string()]);
    }
}
