//! Shared test helpers for the decision loop tests.

use async_trait::async_trait;
use std::sync::Mutex;
use volition_config::AppConfig;
use volition_core::action::ActionOutcome;
use volition_core::catalog::Behavior;
use volition_core::error::{ActionError, GenerationError};
use volition_core::generator::{GenerationRequest, TextGenerator};

/// A generator that returns a sequence of scripted replies.
///
/// Each call returns the next reply; once the script runs out every call
/// fails with `GenerationError::Empty`.
pub struct ScriptedGenerator {
    replies: Mutex<Vec<Result<String, GenerationError>>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedGenerator {
    pub fn new(replies: Vec<Result<String, GenerationError>>) -> Self {
        Self {
            replies: Mutex::new(replies),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// A generator that is always down.
    pub fn failing() -> Self {
        Self::new(Vec::new())
    }

    pub fn call_count(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    #[allow(dead_code)]
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn generate(&self, request: GenerationRequest) -> Result<String, GenerationError> {
        let mut prompts = self.prompts.lock().unwrap();
        let index = prompts.len();
        prompts.push(request.prompt);
        let replies = self.replies.lock().unwrap();
        replies.get(index).cloned().unwrap_or(Err(GenerationError::Empty))
    }
}

/// A behavior whose outcome is scripted per call. Repeats the last outcome
/// once the script runs out.
pub struct ScriptedBehavior {
    name: String,
    agentic: bool,
    user_facing: bool,
    outcomes: Vec<bool>,
    calls: Mutex<usize>,
}

impl ScriptedBehavior {
    pub fn new(name: &str, agentic: bool, outcomes: Vec<bool>) -> Self {
        Self {
            name: name.to_string(),
            agentic,
            user_facing: false,
            outcomes,
            calls: Mutex::new(0),
        }
    }

    pub fn succeeding(name: &str, agentic: bool) -> Self {
        Self::new(name, agentic, vec![true])
    }

    pub fn failing(name: &str, agentic: bool) -> Self {
        Self::new(name, agentic, vec![false])
    }

    pub fn user_facing(mut self) -> Self {
        self.user_facing = true;
        self
    }

    #[allow(dead_code)]
    pub fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl Behavior for ScriptedBehavior {
    fn name(&self) -> &str {
        &self.name
    }

    fn summary(&self) -> &str {
        "scripted test behavior"
    }

    fn is_agentic(&self) -> bool {
        self.agentic
    }

    fn is_user_facing(&self) -> bool {
        self.user_facing
    }

    async fn execute(&self, _payload: serde_json::Value) -> Result<ActionOutcome, ActionError> {
        let mut calls = self.calls.lock().unwrap();
        let ok = self
            .outcomes
            .get(*calls)
            .or(self.outcomes.last())
            .copied()
            .unwrap_or(true);
        *calls += 1;
        if ok {
            Ok(ActionOutcome::ok(format!("{} done", self.name)))
        } else {
            Err(ActionError::ExecutionFailed {
                action: self.name.clone(),
                reason: "scripted failure".into(),
            })
        }
    }
}

/// Config with every source of randomness switched off.
pub fn deterministic_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.agent.seed = Some(7);
    config.agent.tick_interval_ms = 0;
    config.bandit.epsilon = 0.0;
    config.fatigue.push_through_probability = 0.0;
    config.novelty.relapse_probability = 0.0;
    config.gate.noise_std = 0.0;
    config.telemetry.enabled = false;
    config
}
