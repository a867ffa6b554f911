//! End-to-end tests for the Volition decision loop.
//!
//! These drive the loop the way the CLI does: config, file store, built-in
//! catalog, JSONL decision log, and no text generator.

use std::path::Path;
use std::sync::Arc;

use tempfile::TempDir;
use volition_agent::{AgentLoop, ContextOverlay, HistoryEntry, PendingQueue};
use volition_config::AppConfig;
use volition_core::action::{Action, GateState};
use volition_core::store::{self, StateStore, keys};
use volition_store::FileStore;
use volition_telemetry::DecisionEvent;

fn offline_config(dir: &Path) -> AppConfig {
    let mut config = AppConfig::default();
    config.agent.seed = Some(42);
    config.generator.provider = "disabled".into();
    config.storage.state_dir = Some(dir.join("state").to_string_lossy().into_owned());
    config.telemetry.enabled = true;
    config.telemetry.events_path = Some(dir.join("events.jsonl").to_string_lossy().into_owned());
    config.gate.noise_std = 0.0;
    config
}

fn file_store(config: &AppConfig) -> Arc<dyn StateStore> {
    Arc::new(FileStore::new(config.state_dir()))
}

fn read_events(path: &Path) -> Vec<DecisionEvent> {
    std::fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

#[tokio::test]
async fn e2e_offline_run_persists_history_and_events() {
    let dir = TempDir::new().unwrap();
    let mut config = offline_config(dir.path());
    config.gate.confidence_threshold = -10.0;

    let mut agent = AgentLoop::from_config(config.clone(), file_store(&config));
    let reports = agent.run(5).await;
    assert_eq!(reports.len(), 5);
    assert!(reports.iter().all(|r| r.event.chosen.is_some()));
    assert!(reports.iter().all(|r| r.persistence_failures == 0));

    let store = file_store(&config);
    let history: Vec<HistoryEntry> = store::load_tail(store.as_ref(), keys::HISTORY, 50).await;
    assert_eq!(history.len(), 5);
    assert_eq!(history.last().unwrap().tick, 5);
    assert!(history.iter().all(|h| h.action != "ask_user"));

    let events = read_events(&config.events_path());
    assert_eq!(events.len(), 5);
    assert!(events.iter().all(|e| e.reward.is_some()));

    // A fresh process picks up where the last one stopped
    let mut again = AgentLoop::from_config(config.clone(), file_store(&config));
    assert_eq!(again.current_state().await.meta.tick, 5);
    let report = again.tick().await;
    assert_eq!(report.tick, 6);
}

#[tokio::test]
async fn e2e_unsayable_speech_escalates_to_operator() {
    let dir = TempDir::new().unwrap();
    let config = offline_config(dir.path());
    let store = file_store(&config);

    // `speak` without text fails every time
    let mut queue = PendingQueue::new();
    queue.push_back(Action::new("speak").agentic().user_facing(true), 16);
    store::save(store.as_ref(), keys::PENDING, &queue).await.unwrap();

    let mut agent = AgentLoop::from_config(config.clone(), store.clone());
    let states: Vec<GateState> = agent.run(4).await.iter().map(|r| r.gate_state()).collect();
    assert_eq!(
        states,
        vec![
            GateState::Retrying,
            GateState::Retrying,
            GateState::Escalating,
            GateState::Succeeded,
        ]
    );

    let requests: Vec<serde_json::Value> = store::load_tail(store.as_ref(), keys::CLARIFICATIONS, 10).await;
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0]["regarding"], "speak");

    let events = read_events(&config.events_path());
    assert_eq!(events[3].chosen.as_deref(), Some("ask_user"));
    assert!(events[3].from_queue);
}

#[tokio::test]
async fn e2e_long_passivity_forces_an_agentic_action() {
    let dir = TempDir::new().unwrap();
    let mut config = offline_config(dir.path());
    config.bandit.epsilon = 0.0;
    let store = file_store(&config);

    let overlay = ContextOverlay {
        cycles_since_agentic: 12,
        ..ContextOverlay::default()
    };
    store::save(store.as_ref(), keys::OVERLAY, &overlay).await.unwrap();

    let mut agent = AgentLoop::from_config(config.clone(), store.clone());
    let report = agent.tick().await;
    assert!(report.event.forced);
    assert_eq!(report.gate_state(), GateState::Succeeded);
    let chosen = report.event.chosen.clone().unwrap();
    assert!(agent.catalog().is_agentic(&chosen));

    let overlay: ContextOverlay = store::load_or_default(store.as_ref(), keys::OVERLAY).await;
    assert_eq!(overlay.cycles_since_agentic, 0);
    assert_eq!(overlay.agentic_gaps.back(), Some(&13));
}

#[tokio::test]
async fn e2e_reset_all_starts_over() {
    let dir = TempDir::new().unwrap();
    let mut config = offline_config(dir.path());
    config.gate.confidence_threshold = -10.0;
    config.telemetry.enabled = false;

    let mut agent = AgentLoop::from_config(config.clone(), file_store(&config));
    agent.run(2).await;

    for key in keys::DOCUMENTS.iter().chain(keys::LISTS.iter()) {
        agent.reset_artifact(key).await.unwrap();
    }
    let state = agent.current_state().await;
    assert_eq!(state.meta.tick, 0);
    assert!(state.bandit.is_empty());

    let store = file_store(&config);
    let history: Vec<HistoryEntry> = store::load_tail(store.as_ref(), keys::HISTORY, 10).await;
    assert!(history.is_empty());
}
