//! Text generator trait: the abstraction over the language-model collaborator.
//!
//! The decision loop treats generation as opaque and unreliable: every call
//! site must degrade to a safe default when `generate` fails.
//!
//! Implementations: OpenAI-compatible HTTP, timeout guard, disabled (offline).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::GenerationError;

/// A single prompt sent to the generator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// Optional system instruction
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,

    /// The prompt text
    pub prompt: String,

    /// Temperature (0.0 = deterministic, 1.0 = creative)
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum tokens to generate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Ask the backend for a JSON object response
    #[serde(default)]
    pub json: bool,
}

fn default_temperature() -> f32 {
    0.7
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            system: None,
            prompt: prompt.into(),
            temperature: default_temperature(),
            max_tokens: None,
            json: false,
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Request a structured JSON object.
    pub fn json(mut self) -> Self {
        self.json = true;
        self
    }
}

/// The core TextGenerator trait.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// A human-readable name for this backend (e.g. "openai", "disabled").
    fn name(&self) -> &str;

    /// Generate a completion for the request.
    async fn generate(&self, request: GenerationRequest) -> std::result::Result<String, GenerationError>;

    /// Health check: can we reach the backend?
    async fn health_check(&self) -> std::result::Result<bool, GenerationError> {
        Ok(true)
    }
}
