//! OpenAI-compatible generator backend.
//!
//! Works with OpenAI, OpenRouter, Ollama, vLLM and any endpoint exposing
//! `/v1/chat/completions`. Only non-streaming completions are used: the
//! decision loop needs whole answers (proposals, verdicts, scores).

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};
use volition_core::error::GenerationError;
use volition_core::generator::{GenerationRequest, TextGenerator};

/// A text generator backed by an OpenAI-compatible chat endpoint.
pub struct OpenAiCompatGenerator {
    name: String,
    base_url: String,
    api_key: String,
    model: String,
    client: reqwest::Client,
}

impl OpenAiCompatGenerator {
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .unwrap_or_else(|e| {
                warn!(error = %e, "Falling back to default HTTP client");
                reqwest::Client::new()
            });

        Self {
            name: name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: model.into(),
            client,
        }
    }

    /// OpenAI with the given key and model.
    pub fn openai(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self::new("openai", "https://api.openai.com/v1", api_key, model)
    }

    /// Local Ollama server; no key needed.
    pub fn ollama(base_url: Option<&str>, model: impl Into<String>) -> Self {
        Self::new(
            "ollama",
            base_url.unwrap_or("http://localhost:11434/v1"),
            "ollama",
            model,
        )
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Build the chat-completions body for a request.
    fn request_body(&self, request: &GenerationRequest) -> serde_json::Value {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = &request.system {
            messages.push(serde_json::json!({"role": "system", "content": system}));
        }
        messages.push(serde_json::json!({"role": "user", "content": request.prompt}));

        let mut body = serde_json::json!({
            "model": self.model,
            "messages": messages,
            "temperature": request.temperature,
            "stream": false,
        });

        if let Some(max_tokens) = request.max_tokens {
            body["max_tokens"] = serde_json::json!(max_tokens);
        }
        if request.json {
            body["response_format"] = serde_json::json!({"type": "json_object"});
        }
        body
    }

    /// Extract the first choice's text.
    fn extract_text(response: ApiResponse) -> Result<String, GenerationError> {
        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| GenerationError::Malformed("No choices in response".into()))?;

        let content = choice.message.content.unwrap_or_default();
        if content.trim().is_empty() {
            return Err(GenerationError::Empty);
        }
        Ok(content)
    }
}

#[async_trait]
impl TextGenerator for OpenAiCompatGenerator {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate(&self, request: GenerationRequest) -> Result<String, GenerationError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = self.request_body(&request);

        debug!(generator = %self.name, model = %self.model, json = request.json, "Sending completion request");

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    GenerationError::Timeout(120)
                } else {
                    GenerationError::Network(e.to_string())
                }
            })?;

        let status = response.status().as_u16();

        if status == 429 {
            return Err(GenerationError::RateLimited { retry_after_secs: 5 });
        }

        if status == 401 || status == 403 {
            return Err(GenerationError::AuthenticationFailed(
                "Invalid API key or insufficient permissions".into(),
            ));
        }

        if status != 200 {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, body = %error_body, "Generator returned error");
            return Err(GenerationError::ApiError {
                status_code: status,
                message: error_body,
            });
        }

        let api_response: ApiResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::Malformed(format!("Failed to parse response: {e}")))?;

        Self::extract_text(api_response)
    }

    async fn health_check(&self) -> Result<bool, GenerationError> {
        let url = format!("{}/models", self.base_url);
        let response = self
            .client
            .get(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .send()
            .await
            .map_err(|e| GenerationError::Network(e.to_string()))?;

        Ok(response.status().is_success())
    }
}

// --- OpenAI API types (internal) ---

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    choices: Vec<ApiChoice>,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    message: ApiMessage,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    #[serde(default)]
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ollama_constructor() {
        let generator = OpenAiCompatGenerator::ollama(None, "llama3");
        assert_eq!(generator.name(), "ollama");
        assert!(generator.base_url.contains("localhost:11434"));
        assert_eq!(generator.model(), "llama3");
    }

    #[test]
    fn trailing_slash_is_trimmed() {
        let generator = OpenAiCompatGenerator::new("custom", "http://localhost:8000/v1/", "", "m");
        assert_eq!(generator.base_url, "http://localhost:8000/v1");
    }

    #[test]
    fn body_includes_system_and_json_mode() {
        let generator = OpenAiCompatGenerator::openai("sk-test", "gpt-4o-mini");
        let request = GenerationRequest::new("Pick the next action")
            .with_system("Answer in JSON")
            .with_max_tokens(128)
            .json();
        let body = generator.request_body(&request);

        assert_eq!(body["model"], "gpt-4o-mini");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "Pick the next action");
        assert_eq!(body["max_tokens"], 128);
        assert_eq!(body["response_format"]["type"], "json_object");
    }

    #[test]
    fn plain_body_has_no_response_format() {
        let generator = OpenAiCompatGenerator::openai("sk-test", "gpt-4o-mini");
        let body = generator.request_body(&GenerationRequest::new("hi"));
        assert_eq!(body["messages"].as_array().unwrap().len(), 1);
        assert!(body.get("response_format").is_none());
        assert!(body.get("max_tokens").is_none());
    }

    #[test]
    fn extract_first_choice() {
        let response: ApiResponse = serde_json::from_str(
            r#"{"choices":[{"message":{"role":"assistant","content":"{\"score\":0.8}"}}]}"#,
        )
        .unwrap();
        assert_eq!(
            OpenAiCompatGenerator::extract_text(response).unwrap(),
            "{\"score\":0.8}"
        );
    }

    #[test]
    fn empty_or_missing_choices_are_errors() {
        let none: ApiResponse = serde_json::from_str(r#"{"choices":[]}"#).unwrap();
        assert!(matches!(
            OpenAiCompatGenerator::extract_text(none),
            Err(GenerationError::Malformed(_))
        ));

        let blank: ApiResponse =
            serde_json::from_str(r#"{"choices":[{"message":{"content":"   "}}]}"#).unwrap();
        assert!(matches!(
            OpenAiCompatGenerator::extract_text(blank),
            Err(GenerationError::Empty)
        ));
    }
}
