//! Configuration loading, validation, and management for Volition.
//!
//! Loads configuration from `~/.volition/config.toml` with environment
//! variable overrides. Every tuning constant of the decision loop lives here
//! so a run can be reproduced from its config file and seed.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.volition/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Loop-level settings
    #[serde(default)]
    pub agent: AgentConfig,

    /// Text-generation collaborator
    #[serde(default)]
    pub generator: GeneratorConfig,

    /// Persistence
    #[serde(default)]
    pub storage: StorageConfig,

    /// Contextual bandit
    #[serde(default)]
    pub bandit: BanditConfig,

    /// Fatigue tracker
    #[serde(default)]
    pub fatigue: FatigueConfig,

    /// Stagnation detector and novelty scorer
    #[serde(default)]
    pub novelty: NoveltyConfig,

    /// Action gate
    #[serde(default)]
    pub gate: GateConfig,

    /// Reward propagation and satisfaction
    #[serde(default)]
    pub reward: RewardConfig,

    /// Action catalog overrides
    #[serde(default)]
    pub catalog: CatalogConfig,

    /// Decision event stream
    #[serde(default)]
    pub telemetry: TelemetryConfig,

    /// Goals seeded into an empty goal book
    #[serde(default)]
    pub goals: Vec<GoalConfig>,
}

fn default_true() -> bool {
    true
}

// ── Agent ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// RNG seed; `None` seeds from the OS
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,

    /// Pause between ticks when running continuously
    #[serde(default)]
    pub tick_interval_ms: u64,

    /// How candidates are proposed: "generator" or "catalog"
    #[serde(default = "default_proposer")]
    pub proposer: String,

    /// How outcomes are judged: "generator" or "rule"
    #[serde(default = "default_judge")]
    pub judge: String,
}

fn default_proposer() -> String {
    "generator".into()
}
fn default_judge() -> String {
    "generator".into()
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            seed: None,
            tick_interval_ms: 0,
            proposer: default_proposer(),
            judge: default_judge(),
        }
    }
}

// ── Generator ─────────────────────────────────────────────────────────────

#[derive(Clone, Serialize, Deserialize)]
pub struct GeneratorConfig {
    /// "openai_compat" or "disabled"
    #[serde(default = "default_generator_provider")]
    pub provider: String,

    #[serde(default = "default_api_url")]
    pub api_url: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Upper bound on any single collaborator call
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_generator_provider() -> String {
    "openai_compat".into()
}
fn default_api_url() -> String {
    "https://api.openai.com/v1".into()
}
fn default_model() -> String {
    "gpt-4o-mini".into()
}
fn default_temperature() -> f32 {
    0.7
}
fn default_max_tokens() -> u32 {
    512
}
fn default_timeout_secs() -> u64 {
    30
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            provider: default_generator_provider(),
            api_url: default_api_url(),
            api_key: None,
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl std::fmt::Debug for GeneratorConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeneratorConfig")
            .field("provider", &self.provider)
            .field("api_url", &self.api_url)
            .field("api_key", &redact(&self.api_key))
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// Redact a secret for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

// ── Storage ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// "file" or "memory"
    #[serde(default = "default_storage_backend")]
    pub backend: String,

    /// Override for the state directory (defaults to ~/.volition/state)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_dir: Option<String>,

    /// Decision history retention; older entries are trimmed
    #[serde(default = "default_history_max_entries")]
    pub history_max_entries: usize,

    /// How many recent decisions feed novelty scoring
    #[serde(default = "default_history_window")]
    pub history_window: usize,
}

fn default_storage_backend() -> String {
    "file".into()
}
fn default_history_max_entries() -> usize {
    5000
}
fn default_history_window() -> usize {
    20
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: default_storage_backend(),
            state_dir: None,
            history_max_entries: default_history_max_entries(),
            history_window: default_history_window(),
        }
    }
}

// ── Bandit ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BanditConfig {
    #[serde(default = "default_epsilon")]
    pub epsilon: f64,

    #[serde(default = "default_learning_rate")]
    pub learning_rate: f64,

    /// L2 shrinkage applied on every update
    #[serde(default = "default_weight_decay")]
    pub decay: f64,
}

fn default_epsilon() -> f64 {
    0.1
}
fn default_learning_rate() -> f64 {
    0.1
}
fn default_weight_decay() -> f64 {
    0.01
}

impl Default for BanditConfig {
    fn default() -> Self {
        Self {
            epsilon: default_epsilon(),
            learning_rate: default_learning_rate(),
            decay: default_weight_decay(),
        }
    }
}

// ── Fatigue ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FatigueConfig {
    #[serde(default = "default_fatigue_increment")]
    pub increment: f64,

    #[serde(default = "default_push_through_increment")]
    pub push_through_increment: f64,

    #[serde(default = "default_push_through_probability")]
    pub push_through_probability: f64,

    /// Recovery rate per minute at zero fatigue
    #[serde(default = "default_fatigue_decay_rate")]
    pub base_decay_rate: f64,

    #[serde(default = "default_idle_recovery_minutes")]
    pub idle_recovery_minutes: f64,

    #[serde(default = "default_idle_recovery_factor")]
    pub idle_recovery_factor: f64,

    /// Magnitude of the penalty at maximum fatigue
    #[serde(default = "default_max_fatigue_penalty")]
    pub max_penalty: f64,

    #[serde(default = "default_fatigue_history_len")]
    pub history_len: usize,
}

fn default_fatigue_increment() -> f64 {
    1.0
}
fn default_push_through_increment() -> f64 {
    0.5
}
fn default_push_through_probability() -> f64 {
    0.1
}
fn default_fatigue_decay_rate() -> f64 {
    0.15
}
fn default_idle_recovery_minutes() -> f64 {
    10.0
}
fn default_idle_recovery_factor() -> f64 {
    0.5
}
fn default_max_fatigue_penalty() -> f64 {
    0.6
}
fn default_fatigue_history_len() -> usize {
    20
}

impl Default for FatigueConfig {
    fn default() -> Self {
        Self {
            increment: default_fatigue_increment(),
            push_through_increment: default_push_through_increment(),
            push_through_probability: default_push_through_probability(),
            base_decay_rate: default_fatigue_decay_rate(),
            idle_recovery_minutes: default_idle_recovery_minutes(),
            idle_recovery_factor: default_idle_recovery_factor(),
            max_penalty: default_max_fatigue_penalty(),
            history_len: default_fatigue_history_len(),
        }
    }
}

// ── Novelty / stagnation ──────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoveltyConfig {
    /// Chance of skipping the penalty entirely (relapse into repetition)
    #[serde(default = "default_relapse_probability")]
    pub relapse_probability: f64,

    #[serde(default = "default_repeat_penalty")]
    pub repeat_penalty: f64,

    #[serde(default = "default_recent_window")]
    pub recent_window: usize,

    #[serde(default = "default_recent_penalty")]
    pub recent_penalty: f64,

    #[serde(default = "default_absent_bonus_per_tick")]
    pub absent_bonus_per_tick: f64,

    #[serde(default = "default_absent_bonus_cap")]
    pub absent_bonus_cap: f64,

    #[serde(default = "default_curiosity_boost")]
    pub curiosity_boost: f64,

    /// Consecutive identical choices before forcing a loop break
    #[serde(default = "default_repeat_limit")]
    pub repeat_limit: u32,

    #[serde(default = "default_hash_window")]
    pub hash_window: usize,

    /// Identical context hashes within the window before forcing a loop break
    #[serde(default = "default_hash_collision_limit")]
    pub hash_collision_limit: usize,
}

fn default_relapse_probability() -> f64 {
    0.07
}
fn default_repeat_penalty() -> f64 {
    0.6
}
fn default_recent_window() -> usize {
    4
}
fn default_recent_penalty() -> f64 {
    0.3
}
fn default_absent_bonus_per_tick() -> f64 {
    0.05
}
fn default_absent_bonus_cap() -> f64 {
    0.4
}
fn default_curiosity_boost() -> f64 {
    1.25
}
fn default_repeat_limit() -> u32 {
    3
}
fn default_hash_window() -> usize {
    12
}
fn default_hash_collision_limit() -> usize {
    3
}

impl Default for NoveltyConfig {
    fn default() -> Self {
        Self {
            relapse_probability: default_relapse_probability(),
            repeat_penalty: default_repeat_penalty(),
            recent_window: default_recent_window(),
            recent_penalty: default_recent_penalty(),
            absent_bonus_per_tick: default_absent_bonus_per_tick(),
            absent_bonus_cap: default_absent_bonus_cap(),
            curiosity_boost: default_curiosity_boost(),
            repeat_limit: default_repeat_limit(),
            hash_window: default_hash_window(),
            hash_collision_limit: default_hash_collision_limit(),
        }
    }
}

// ── Gate ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateConfig {
    /// Minimum score for the top candidate to execute
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f64,

    #[serde(default = "default_retry_ceiling")]
    pub retry_ceiling: u32,

    #[serde(default = "default_pending_capacity")]
    pub pending_capacity: usize,

    /// Std-dev of the tie-breaking Gaussian noise
    #[serde(default = "default_noise_std")]
    pub noise_std: f64,

    #[serde(default = "default_user_facing_bonus")]
    pub user_facing_bonus: f64,

    #[serde(default = "default_motivation_weight")]
    pub motivation_weight: f64,

    #[serde(default = "default_curiosity_weight")]
    pub curiosity_weight: f64,

    #[serde(default = "default_bandit_weight")]
    pub bandit_weight: f64,

    #[serde(default = "default_stagnation_bonus_per_cycle")]
    pub stagnation_bonus_per_cycle: f64,

    #[serde(default = "default_stagnation_bonus_cap")]
    pub stagnation_bonus_cap: f64,

    #[serde(default = "default_frustration_penalty")]
    pub frustration_penalty: f64,

    /// Passive actions penalized by frustration
    #[serde(default = "default_passive_actions")]
    pub passive_actions: Vec<String>,

    /// Action queued when escalating to the operator
    #[serde(default = "default_clarification_action")]
    pub clarification_action: String,

    /// Multiplier on the average agentic gap
    #[serde(default = "default_threshold_factor")]
    pub threshold_factor: f64,

    #[serde(default = "default_threshold_floor")]
    pub threshold_floor: f64,

    /// Threshold before any agentic gap has been observed
    #[serde(default = "default_initial_threshold")]
    pub initial_threshold: f64,

    #[serde(default = "default_gap_window")]
    pub gap_window: usize,

    #[serde(default = "default_frustration_step")]
    pub frustration_step: f64,

    #[serde(default = "default_frustration_decay")]
    pub frustration_decay: f64,

    #[serde(default = "default_forced_relief")]
    pub forced_frustration_relief: f64,

    /// Shortlist size for the catalog proposer
    #[serde(default = "default_proposal_size")]
    pub proposal_size: usize,
}

fn default_confidence_threshold() -> f64 {
    0.75
}
fn default_retry_ceiling() -> u32 {
    3
}
fn default_pending_capacity() -> usize {
    16
}
fn default_noise_std() -> f64 {
    0.02
}
fn default_user_facing_bonus() -> f64 {
    0.3
}
fn default_motivation_weight() -> f64 {
    0.15
}
fn default_curiosity_weight() -> f64 {
    0.1
}
fn default_bandit_weight() -> f64 {
    0.5
}
fn default_stagnation_bonus_per_cycle() -> f64 {
    0.05
}
fn default_stagnation_bonus_cap() -> f64 {
    0.5
}
fn default_frustration_penalty() -> f64 {
    0.4
}
fn default_passive_actions() -> Vec<String> {
    vec!["reflect".into(), "speak".into(), "plan".into(), "log".into()]
}
fn default_clarification_action() -> String {
    "ask_user".into()
}
fn default_threshold_factor() -> f64 {
    1.5
}
fn default_threshold_floor() -> f64 {
    2.0
}
fn default_initial_threshold() -> f64 {
    4.0
}
fn default_gap_window() -> usize {
    5
}
fn default_frustration_step() -> f64 {
    0.1
}
fn default_frustration_decay() -> f64 {
    0.9
}
fn default_forced_relief() -> f64 {
    0.3
}
fn default_proposal_size() -> usize {
    3
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: default_confidence_threshold(),
            retry_ceiling: default_retry_ceiling(),
            pending_capacity: default_pending_capacity(),
            noise_std: default_noise_std(),
            user_facing_bonus: default_user_facing_bonus(),
            motivation_weight: default_motivation_weight(),
            curiosity_weight: default_curiosity_weight(),
            bandit_weight: default_bandit_weight(),
            stagnation_bonus_per_cycle: default_stagnation_bonus_per_cycle(),
            stagnation_bonus_cap: default_stagnation_bonus_cap(),
            frustration_penalty: default_frustration_penalty(),
            passive_actions: default_passive_actions(),
            clarification_action: default_clarification_action(),
            threshold_factor: default_threshold_factor(),
            threshold_floor: default_threshold_floor(),
            initial_threshold: default_initial_threshold(),
            gap_window: default_gap_window(),
            frustration_step: default_frustration_step(),
            frustration_decay: default_frustration_decay(),
            forced_frustration_relief: default_forced_relief(),
            proposal_size: default_proposal_size(),
        }
    }
}

// ── Reward ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewardConfig {
    #[serde(default = "default_trace_capacity")]
    pub trace_capacity: usize,

    /// Trace strength decay per minute at neutral stability
    #[serde(default = "default_trace_decay")]
    pub trace_decay_per_minute: f64,

    /// Fraction of the way affect drifts back to baseline each tick
    #[serde(default = "default_affect_drift")]
    pub affect_drift: f64,

    #[serde(default = "default_phasic_multiplier")]
    pub phasic_multiplier: f64,

    #[serde(default = "default_dopamine_gain")]
    pub dopamine_gain: f64,

    #[serde(default = "default_serotonin_gain")]
    pub serotonin_gain: f64,

    #[serde(default = "default_novelty_gain")]
    pub novelty_gain: f64,

    #[serde(default = "default_connection_gain")]
    pub connection_gain: f64,

    /// Effort assumed when an action carries none
    #[serde(default = "default_effort")]
    pub default_effort: f64,

    #[serde(default = "default_agentic_bonus")]
    pub agentic_bonus: f64,

    #[serde(default = "default_acceptance_bonus")]
    pub acceptance_bonus: f64,

    /// Satisfaction used when the scorer is unavailable
    #[serde(default = "default_neutral_satisfaction")]
    pub neutral_satisfaction: f64,
}

fn default_trace_capacity() -> usize {
    50
}
fn default_trace_decay() -> f64 {
    0.05
}
fn default_affect_drift() -> f64 {
    0.05
}
fn default_phasic_multiplier() -> f64 {
    1.5
}
fn default_dopamine_gain() -> f64 {
    0.15
}
fn default_serotonin_gain() -> f64 {
    0.10
}
fn default_novelty_gain() -> f64 {
    0.12
}
fn default_connection_gain() -> f64 {
    0.10
}
fn default_effort() -> f64 {
    0.3
}
fn default_agentic_bonus() -> f64 {
    0.2
}
fn default_acceptance_bonus() -> f64 {
    0.1
}
fn default_neutral_satisfaction() -> f64 {
    0.5
}

impl Default for RewardConfig {
    fn default() -> Self {
        Self {
            trace_capacity: default_trace_capacity(),
            trace_decay_per_minute: default_trace_decay(),
            affect_drift: default_affect_drift(),
            phasic_multiplier: default_phasic_multiplier(),
            dopamine_gain: default_dopamine_gain(),
            serotonin_gain: default_serotonin_gain(),
            novelty_gain: default_novelty_gain(),
            connection_gain: default_connection_gain(),
            default_effort: default_effort(),
            agentic_bonus: default_agentic_bonus(),
            acceptance_bonus: default_acceptance_bonus(),
            neutral_satisfaction: default_neutral_satisfaction(),
        }
    }
}

// ── Catalog ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Per-action overrides; built-ins not listed keep their defaults
    #[serde(default)]
    pub actions: Vec<ActionConfig>,
}

/// Override for one catalog entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionConfig {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agentic: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_facing: Option<bool>,

    #[serde(default = "default_true")]
    pub enabled: bool,
}

// ── Telemetry ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Decision event file (defaults to ~/.volition/events.jsonl)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub events_path: Option<String>,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            events_path: None,
        }
    }
}

// ── Goals ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoalConfig {
    pub id: String,
    pub description: String,
    #[serde(default = "default_goal_tier")]
    pub tier: u8,
}

fn default_goal_tier() -> u8 {
    1
}

impl AppConfig {
    /// Load configuration from the default path (~/.volition/config.toml).
    ///
    /// Environment overrides:
    /// - `VOLITION_API_KEY` (highest priority), then `OPENAI_API_KEY`
    /// - `VOLITION_MODEL`
    /// - `VOLITION_STATE_DIR`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;

        if config.generator.api_key.is_none() {
            config.generator.api_key = std::env::var("VOLITION_API_KEY")
                .ok()
                .or_else(|| std::env::var("OPENAI_API_KEY").ok());
        }

        if let Ok(model) = std::env::var("VOLITION_MODEL") {
            config.generator.model = model;
        }

        if let Ok(dir) = std::env::var("VOLITION_STATE_DIR") {
            config.storage.state_dir = Some(dir);
        }

        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        Self::from_toml_str(&content).map_err(|e| match e {
            ConfigError::ParseError { reason, .. } => ConfigError::ParseError {
                path: path.to_path_buf(),
                reason,
            },
            other => other,
        })
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content).map_err(|e| ConfigError::ParseError {
            path: PathBuf::from("<inline>"),
            reason: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".volition")
    }

    /// Resolved state directory for the file store.
    pub fn state_dir(&self) -> PathBuf {
        self.storage
            .state_dir
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(|| Self::config_dir().join("state"))
    }

    /// Resolved decision event file.
    pub fn events_path(&self) -> PathBuf {
        self.telemetry
            .events_path
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(|| Self::config_dir().join("events.jsonl"))
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        fn unit(name: &str, value: f64) -> Result<(), ConfigError> {
            if value.is_finite() && (0.0..=1.0).contains(&value) {
                Ok(())
            } else {
                Err(ConfigError::ValidationError(format!("{name} must be between 0.0 and 1.0")))
            }
        }
        fn non_negative(name: &str, value: f64) -> Result<(), ConfigError> {
            if value.is_finite() && value >= 0.0 {
                Ok(())
            } else {
                Err(ConfigError::ValidationError(format!("{name} must be a finite value >= 0")))
            }
        }

        if !(0.0..=2.0).contains(&self.generator.temperature) {
            return Err(ConfigError::ValidationError(
                "generator.temperature must be between 0.0 and 2.0".into(),
            ));
        }
        if self.generator.timeout_secs == 0 {
            return Err(ConfigError::ValidationError("generator.timeout_secs must be > 0".into()));
        }
        if !matches!(self.storage.backend.as_str(), "file" | "memory") {
            return Err(ConfigError::ValidationError(format!(
                "storage.backend must be \"file\" or \"memory\", got \"{}\"",
                self.storage.backend
            )));
        }
        if !matches!(self.agent.proposer.as_str(), "generator" | "catalog") {
            return Err(ConfigError::ValidationError(
                "agent.proposer must be \"generator\" or \"catalog\"".into(),
            ));
        }
        if !matches!(self.agent.judge.as_str(), "generator" | "rule") {
            return Err(ConfigError::ValidationError(
                "agent.judge must be \"generator\" or \"rule\"".into(),
            ));
        }

        unit("bandit.epsilon", self.bandit.epsilon)?;
        unit("bandit.learning_rate", self.bandit.learning_rate)?;
        unit("bandit.decay", self.bandit.decay)?;

        unit("fatigue.push_through_probability", self.fatigue.push_through_probability)?;
        unit("fatigue.idle_recovery_factor", self.fatigue.idle_recovery_factor)?;
        non_negative("fatigue.increment", self.fatigue.increment)?;
        non_negative("fatigue.base_decay_rate", self.fatigue.base_decay_rate)?;

        unit("novelty.relapse_probability", self.novelty.relapse_probability)?;
        if self.novelty.recent_window == 0 {
            return Err(ConfigError::ValidationError("novelty.recent_window must be > 0".into()));
        }

        non_negative("gate.noise_std", self.gate.noise_std)?;
        unit("gate.frustration_decay", self.gate.frustration_decay)?;
        if self.gate.retry_ceiling == 0 {
            return Err(ConfigError::ValidationError("gate.retry_ceiling must be > 0".into()));
        }
        if self.gate.threshold_floor < 1.0 {
            return Err(ConfigError::ValidationError("gate.threshold_floor must be >= 1".into()));
        }
        if self.gate.proposal_size == 0 {
            return Err(ConfigError::ValidationError("gate.proposal_size must be > 0".into()));
        }

        if self.reward.trace_capacity == 0 {
            return Err(ConfigError::ValidationError("reward.trace_capacity must be > 0".into()));
        }
        unit("reward.affect_drift", self.reward.affect_drift)?;
        unit("reward.neutral_satisfaction", self.reward.neutral_satisfaction)?;

        for goal in &self.goals {
            if !(1..=5).contains(&goal.tier) {
                return Err(ConfigError::ValidationError(format!(
                    "goal '{}' tier must be between 1 and 5",
                    goal.id
                )));
            }
        }

        Ok(())
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.generator.api_key.is_some()
    }

    /// Generate a default config TOML string (for the `init` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert!((config.gate.confidence_threshold - 0.75).abs() < f64::EPSILON);
        assert_eq!(config.gate.retry_ceiling, 3);
        assert_eq!(config.reward.trace_capacity, 50);
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.gate.passive_actions, config.gate.passive_actions);
        assert_eq!(parsed.storage.backend, "file");
    }

    #[test]
    fn invalid_epsilon_rejected() {
        let mut config = AppConfig::default();
        config.bandit.epsilon = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn unknown_backend_rejected() {
        let err = AppConfig::from_toml_str("[storage]\nbackend = \"redis\"\n").unwrap_err();
        assert!(err.to_string().contains("storage.backend"));
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let result = AppConfig::load_from(Path::new("/nonexistent/volition/config.toml"));
        let config = result.unwrap();
        assert_eq!(config.generator.provider, "openai_compat");
    }

    #[test]
    fn partial_sections_keep_defaults() {
        let config = AppConfig::from_toml_str(
            r#"
[bandit]
epsilon = 0.0

[gate]
retry_ceiling = 5

[[catalog.actions]]
name = "dream"
agentic = false
summary = "Free association over recent memories"

[[catalog.actions]]
name = "log"
enabled = false

[[goals]]
id = "weekly-summary"
description = "Write the weekly summary"
tier = 4
"#,
        )
        .unwrap();
        assert_eq!(config.bandit.epsilon, 0.0);
        assert!((config.bandit.learning_rate - 0.1).abs() < f64::EPSILON);
        assert_eq!(config.gate.retry_ceiling, 5);
        assert_eq!(config.catalog.actions.len(), 2);
        assert!(config.catalog.actions[0].enabled);
        assert!(!config.catalog.actions[1].enabled);
        assert_eq!(config.goals[0].tier, 4);
    }

    #[test]
    fn goal_tier_out_of_range_rejected() {
        let err = AppConfig::from_toml_str(
            "[[goals]]\nid = \"g\"\ndescription = \"x\"\ntier = 9\n",
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn load_from_file_reports_path_on_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[bandit\nepsilon = ").unwrap();
        let err = AppConfig::load_from(&path).unwrap_err();
        assert!(err.to_string().contains("config.toml"));
    }

    #[test]
    fn api_key_is_redacted_in_debug() {
        let mut config = AppConfig::default();
        config.generator.api_key = Some("sk-secret".into());
        let debug = format!("{config:?}");
        assert!(!debug.contains("sk-secret"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn default_toml_generation() {
        let toml_str = AppConfig::default_toml();
        assert!(toml_str.contains("confidence_threshold"));
        assert!(toml_str.contains("ask_user"));
    }
}
