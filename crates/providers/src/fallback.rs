//! Generator fallback: an ordered chain with per-backend timeouts.
//!
//! Every collaborator call in the decision loop goes through this wrapper so
//! a hung backend costs at most its timeout. A single-entry chain is just a
//! timeout guard.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use volition_core::error::GenerationError;
use volition_core::generator::{GenerationRequest, TextGenerator};

/// A generator that tries each backend in order until one answers.
pub struct FallbackGenerator {
    name: String,
    chain: Vec<FallbackEntry>,
}

struct FallbackEntry {
    generator: Arc<dyn TextGenerator>,
    timeout: Duration,
}

impl FallbackGenerator {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            chain: Vec::new(),
        }
    }

    /// Add a backend with a custom timeout.
    pub fn add(mut self, generator: Arc<dyn TextGenerator>, timeout: Duration) -> Self {
        self.chain.push(FallbackEntry { generator, timeout });
        self
    }

    /// Add a backend with the default timeout (30s).
    pub fn add_default(self, generator: Arc<dyn TextGenerator>) -> Self {
        self.add(generator, Duration::from_secs(30))
    }

    pub fn len(&self) -> usize {
        self.chain.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chain.is_empty()
    }
}

#[async_trait]
impl TextGenerator for FallbackGenerator {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate(&self, request: GenerationRequest) -> Result<String, GenerationError> {
        let mut last_error = GenerationError::NotConfigured("No generators in fallback chain".into());

        for (i, entry) in self.chain.iter().enumerate() {
            let backend = entry.generator.name().to_string();

            debug!(
                generator = %backend,
                attempt = i + 1,
                total = self.chain.len(),
                "Trying generator"
            );

            match tokio::time::timeout(entry.timeout, entry.generator.generate(request.clone())).await {
                Ok(Ok(text)) => return Ok(text),
                Ok(Err(e)) => {
                    warn!(generator = %backend, error = %e, "Generator failed");
                    last_error = e;
                }
                Err(_) => {
                    warn!(
                        generator = %backend,
                        timeout_secs = entry.timeout.as_secs(),
                        "Generator timed out"
                    );
                    last_error = GenerationError::Timeout(entry.timeout.as_secs());
                }
            }
        }

        Err(last_error)
    }

    async fn health_check(&self) -> Result<bool, GenerationError> {
        for entry in &self.chain {
            if let Ok(true) = entry.generator.health_check().await {
                return Ok(true);
            }
        }
        Ok(false)
    }
}
