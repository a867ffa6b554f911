//! Domain event system: decoupled notifications out of the decision loop.
//!
//! Events are published when something interesting happens inside a tick.
//! Observers (the CLI, dashboards, tests) subscribe without the loop
//! knowing who listens.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;

/// Something observable that happened in or around a tick.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DomainEvent {
    /// A tick began
    TickStarted {
        tick: u64,
        pending: usize,
        timestamp: DateTime<Utc>,
    },

    /// An action was executed
    ActionExecuted {
        tick: u64,
        action: String,
        success: bool,
        forced: bool,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },

    /// The gate escalated to the operator
    Escalated {
        tick: u64,
        action: String,
        reason: String,
        timestamp: DateTime<Utc>,
    },

    /// Stagnation forced an action regardless of its score
    StagnationForced {
        tick: u64,
        action: String,
        cycles_since_agentic: u32,
        threshold: f64,
        timestamp: DateTime<Utc>,
    },

    /// A collaborator call failed and a fallback was used
    CollaboratorFallback {
        stage: String,
        error_message: String,
        timestamp: DateTime<Utc>,
    },

    /// A persisted artifact was reset
    ArtifactReset {
        key: String,
        timestamp: DateTime<Utc>,
    },
}

impl DomainEvent {
    /// Short name for log lines and filters.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::TickStarted { .. } => "tick_started",
            Self::ActionExecuted { .. } => "action_executed",
            Self::Escalated { .. } => "escalated",
            Self::StagnationForced { .. } => "stagnation_forced",
            Self::CollaboratorFallback { .. } => "collaborator_fallback",
            Self::ArtifactReset { .. } => "artifact_reset",
        }
    }

    /// The tick the event belongs to, if it happened inside one.
    pub fn tick(&self) -> Option<u64> {
        match self {
            Self::TickStarted { tick, .. }
            | Self::ActionExecuted { tick, .. }
            | Self::Escalated { tick, .. }
            | Self::StagnationForced { tick, .. } => Some(*tick),
            Self::CollaboratorFallback { .. } | Self::ArtifactReset { .. } => None,
        }
    }
}

/// Fan-out of loop events over a `tokio` broadcast channel. Slow observers
/// lag and lose the oldest events; the loop never waits for them.
pub struct EventBus {
    tx: broadcast::Sender<Arc<DomainEvent>>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Send to every current observer. Returns how many received it.
    pub fn publish(&self, event: DomainEvent) -> usize {
        let kind = event.kind();
        match self.tx.send(Arc::new(event)) {
            Ok(observers) => observers,
            Err(_) => {
                tracing::trace!(kind, "Event published with no observers");
                0
            }
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Arc<DomainEvent>> {
        self.tx.subscribe()
    }

    pub fn observer_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
