//! A generator that always refuses. Used for offline runs and when no API
//! key is configured; every caller then takes its fallback path.

use async_trait::async_trait;
use volition_core::error::GenerationError;
use volition_core::generator::{GenerationRequest, TextGenerator};

#[derive(Debug, Clone)]
pub struct DisabledGenerator {
    reason: String,
}

impl DisabledGenerator {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl Default for DisabledGenerator {
    fn default() -> Self {
        Self::new("generator disabled")
    }
}

#[async_trait]
impl TextGenerator for DisabledGenerator {
    fn name(&self) -> &str {
        "disabled"
    }

    async fn generate(&self, _request: GenerationRequest) -> Result<String, GenerationError> {
        Err(GenerationError::NotConfigured(self.reason.clone()))
    }

    async fn health_check(&self) -> Result<bool, GenerationError> {
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn always_not_configured() {
        let generator = DisabledGenerator::new("offline run");
        let err = generator.generate(GenerationRequest::new("x")).await.unwrap_err();
        assert!(matches!(err, GenerationError::NotConfigured(ref r) if r == "offline run"));
        assert!(!generator.health_check().await.unwrap());
    }
}
