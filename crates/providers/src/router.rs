//! Generator router: selects the generator backend based on config.

use crate::disabled::DisabledGenerator;
use crate::fallback::FallbackGenerator;
use crate::openai_compat::OpenAiCompatGenerator;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use volition_core::generator::TextGenerator;

/// Named generator backends with a default.
pub struct GeneratorRouter {
    generators: HashMap<String, Arc<dyn TextGenerator>>,
    default_generator: String,
}

impl GeneratorRouter {
    pub fn new(default_generator: impl Into<String>) -> Self {
        Self {
            generators: HashMap::new(),
            default_generator: default_generator.into(),
        }
    }

    pub fn register(&mut self, name: impl Into<String>, generator: Arc<dyn TextGenerator>) {
        self.generators.insert(name.into(), generator);
    }

    /// The default backend, or a disabled generator if none is registered.
    pub fn default_generator(&self) -> Arc<dyn TextGenerator> {
        self.generators
            .get(&self.default_generator)
            .cloned()
            .unwrap_or_else(|| Arc::new(DisabledGenerator::new("no default generator registered")))
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn TextGenerator>> {
        self.generators.get(name).cloned()
    }
}

/// Build the generator the decision loop uses.
///
/// The configured backend is always wrapped in a timeout guard. Without an
/// API key (or with `provider = "disabled"`), the loop runs offline against
/// a [`DisabledGenerator`].
pub fn build_from_config(config: &volition_config::AppConfig) -> GeneratorRouter {
    let gen_cfg = &config.generator;

    let backend: Option<Arc<dyn TextGenerator>> = match gen_cfg.provider.as_str() {
        "disabled" => None,
        name => match &gen_cfg.api_key {
            Some(key) => Some(Arc::new(OpenAiCompatGenerator::new(
                name,
                gen_cfg.api_url.clone(),
                key.clone(),
                gen_cfg.model.clone(),
            ))),
            None if is_local(&gen_cfg.api_url) => Some(Arc::new(OpenAiCompatGenerator::new(
                name,
                gen_cfg.api_url.clone(),
                "local",
                gen_cfg.model.clone(),
            ))),
            None => {
                info!("No API key configured, running without a generator");
                None
            }
        },
    };

    let Some(backend) = backend else {
        let mut router = GeneratorRouter::new("disabled");
        router.register("disabled", Arc::new(DisabledGenerator::new("generator not configured")));
        return router;
    };

    let mut router = GeneratorRouter::new(gen_cfg.provider.clone());
    let guarded = FallbackGenerator::new(gen_cfg.provider.clone())
        .add(backend, Duration::from_secs(gen_cfg.timeout_secs));
    router.register(gen_cfg.provider.clone(), Arc::new(guarded));
    router.register("disabled", Arc::new(DisabledGenerator::new("offline mode")));
    router
}

fn is_local(url: &str) -> bool {
    url.contains("localhost") || url.contains("127.0.0.1")
}

#[cfg(test)]
mod tests {
    use super::*;
    use volition_core::generator::GenerationRequest;
    use volition_core::error::GenerationError;

    #[test]
    fn router_register_and_lookup() {
        let mut router = GeneratorRouter::new("openai");
        router.register("openai", Arc::new(OpenAiCompatGenerator::openai("sk-test", "m")));
        assert!(router.get("openai").is_some());
        assert!(router.get("nonexistent").is_none());
        assert_eq!(router.default_generator().name(), "openai");
    }

    #[test]
    fn missing_default_is_disabled() {
        let router = GeneratorRouter::new("nothing");
        assert_eq!(router.default_generator().name(), "disabled");
    }

    #[tokio::test]
    async fn no_api_key_builds_offline_generator() {
        let config = volition_config::AppConfig::default();
        let router = build_from_config(&config);
        let generator = router.default_generator();
        assert_eq!(generator.name(), "disabled");
        let err = generator.generate(GenerationRequest::new("x")).await.unwrap_err();
        assert!(matches!(err, GenerationError::NotConfigured(_)));
    }

    #[test]
    fn api_key_builds_guarded_backend() {
        let mut config = volition_config::AppConfig::default();
        config.generator.api_key = Some("sk-test".into());
        let router = build_from_config(&config);
        assert_eq!(router.default_generator().name(), "openai_compat");
        assert!(router.get("disabled").is_some());
    }

    #[test]
    fn disabled_provider_ignores_api_key() {
        let mut config = volition_config::AppConfig::default();
        config.generator.provider = "disabled".into();
        config.generator.api_key = Some("sk-test".into());
        let router = build_from_config(&config);
        assert_eq!(router.default_generator().name(), "disabled");
    }

    #[test]
    fn local_urls_need_no_key() {
        assert!(is_local("http://localhost:11434/v1"));
        assert!(!is_local("https://api.openai.com/v1"));
    }
}
