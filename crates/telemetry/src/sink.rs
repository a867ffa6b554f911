//! Decision sinks: where the per-tick decision events go.
//!
//! `JsonlDecisionSink` appends one JSON line per event to a file, the same
//! way the file store keeps list artifacts. `MemoryDecisionSink` is for
//! tests and `--offline` dry runs.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::sync::{Mutex, RwLock};
use tracing::warn;

use crate::TelemetryError;
use crate::model::DecisionEvent;

/// Append-only decision event stream.
#[async_trait]
pub trait DecisionSink: Send + Sync {
    fn name(&self) -> &str;

    /// Record one event.
    async fn record(&self, event: &DecisionEvent) -> Result<(), TelemetryError>;

    /// The newest `n` events, oldest first.
    async fn recent(&self, n: usize) -> Result<Vec<DecisionEvent>, TelemetryError>;
}

/// File-backed JSONL sink.
pub struct JsonlDecisionSink {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonlDecisionSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, e: impl std::fmt::Display) -> TelemetryError {
        TelemetryError::Io {
            path: self.path.display().to_string(),
            reason: e.to_string(),
        }
    }
}

#[async_trait]
impl DecisionSink for JsonlDecisionSink {
    fn name(&self) -> &str {
        "jsonl"
    }

    async fn record(&self, event: &DecisionEvent) -> Result<(), TelemetryError> {
        let mut line = serde_json::to_string(event)?;
        line.push('\n');

        let _guard = self.lock.lock().await;
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| self.io_error(e))?;
        }
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| self.io_error(e))?;
        file.write_all(line.as_bytes())
            .await
            .map_err(|e| self.io_error(e))?;
        file.flush().await.map_err(|e| self.io_error(e))
    }

    async fn recent(&self, n: usize) -> Result<Vec<DecisionEvent>, TelemetryError> {
        let _guard = self.lock.lock().await;
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(self.io_error(e)),
        };

        let events: Vec<DecisionEvent> = content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .filter_map(|line| match serde_json::from_str(line) {
                Ok(event) => Some(event),
                Err(e) => {
                    warn!(path = %self.path.display(), error = %e, "Skipping corrupted decision event");
                    None
                }
            })
            .collect();
        let skip = events.len().saturating_sub(n);
        Ok(events.into_iter().skip(skip).collect())
    }
}

/// In-memory sink.
#[derive(Default)]
pub struct MemoryDecisionSink {
    events: RwLock<Vec<DecisionEvent>>,
}

impl MemoryDecisionSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every recorded event.
    pub async fn all(&self) -> Vec<DecisionEvent> {
        self.events.read().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.events.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.events.read().await.is_empty()
    }
}

#[async_trait]
impl DecisionSink for MemoryDecisionSink {
    fn name(&self) -> &str {
        "memory"
    }

    async fn record(&self, event: &DecisionEvent) -> Result<(), TelemetryError> {
        self.events.write().await.push(event.clone());
        Ok(())
    }

    async fn recent(&self, n: usize) -> Result<Vec<DecisionEvent>, TelemetryError> {
        let events = self.events.read().await;
        let skip = events.len().saturating_sub(n);
        Ok(events[skip..].to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use volition_core::action::{ActionKind, GateState};

    #[tokio::test]
    async fn jsonl_sink_appends_one_line_per_event() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("logs").join("events.jsonl");
        let sink = JsonlDecisionSink::new(&path);

        sink.record(&DecisionEvent::idle(1)).await.unwrap();
        sink.record(&DecisionEvent::executed(2, "plan", ActionKind::Cognitive, GateState::Succeeded))
            .await
            .unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 2);

        let recent = sink.recent(1).await.unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].chosen.as_deref(), Some("plan"));
    }

    #[tokio::test]
    async fn jsonl_sink_skips_corrupted_lines() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("events.jsonl");
        let sink = JsonlDecisionSink::new(&path);
        sink.record(&DecisionEvent::idle(1)).await.unwrap();
        {
            let mut file = std::fs::OpenOptions::new().append(true).open(&path).unwrap();
            writeln!(file, "{{truncated").unwrap();
        }
        sink.record(&DecisionEvent::idle(2)).await.unwrap();

        let events = sink.recent(10).await.unwrap();
        assert_eq!(events.iter().map(|e| e.tick).collect::<Vec<_>>(), vec![1, 2]);
    }

    #[tokio::test]
    async fn missing_file_reads_empty() {
        let sink = JsonlDecisionSink::new("/nonexistent/volition/events.jsonl");
        assert!(sink.recent(5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn memory_sink_keeps_order() {
        let sink = MemoryDecisionSink::new();
        for tick in 0..4 {
            sink.record(&DecisionEvent::idle(tick)).await.unwrap();
        }
        assert_eq!(sink.len().await, 4);
        let recent = sink.recent(2).await.unwrap();
        assert_eq!(recent[0].tick, 2);
        assert_eq!(recent[1].tick, 3);
    }
}
