//! Text-generation backends.
//!
//! The [`Generator`] trait is the only thing the answer path needs from a
//! language model: a prompt in, generated text out, or a typed
//! [`GenerationError`]. [`OllamaGenerator`] calls Ollama's non-streaming
//! `POST /api/generate` endpoint.

use anyhow::{bail, Result};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use crate::config::GenerationConfig;
use crate::error::GenerationError;

/// A text-generation capability.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Returns the model identifier (e.g. `"mistral"`).
    fn model_name(&self) -> &str;

    /// Generate a completion for `prompt`.
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError>;
}

/// Used when `generation.provider = "disabled"`. Every call fails.
pub struct DisabledGenerator;

#[async_trait]
impl Generator for DisabledGenerator {
    fn model_name(&self) -> &str {
        "disabled"
    }
    async fn generate(&self, _prompt: &str) -> Result<String, GenerationError> {
        Err(GenerationError::Disabled)
    }
}

/// Generation backend using a local Ollama instance.
pub struct OllamaGenerator {
    client: reqwest::Client,
    url: String,
    model: String,
    timeout: Duration,
}

impl OllamaGenerator {
    pub fn new(config: &GenerationConfig) -> Result<Self> {
        let timeout = Duration::from_secs(config.timeout_secs);
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: config.url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            timeout,
        })
    }
}

#[async_trait]
impl Generator for OllamaGenerator {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        let body = serde_json::json!({
            "model": self.model,
            "prompt": prompt,
            "stream": false,
        });

        let response = self
            .client
            .post(format!("{}/api/generate", self.url))
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    GenerationError::Timeout(self.timeout)
                } else {
                    GenerationError::Transport(format!(
                        "Ollama connection error (is Ollama running at {}?): {}",
                        self.url, e
                    ))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(GenerationError::Backend {
                status: status.as_u16(),
                message,
            });
        }

        let json: serde_json::Value = response.json().await.map_err(|e| {
            if e.is_timeout() {
                GenerationError::Timeout(self.timeout)
            } else {
                GenerationError::MalformedResponse(e.to_string())
            }
        })?;
        parse_generate_response(&json)
    }
}

fn parse_generate_response(json: &serde_json::Value) -> Result<String, GenerationError> {
    json.get("response")
        .and_then(|r| r.as_str())
        .map(str::to_string)
        .ok_or_else(|| {
            GenerationError::MalformedResponse("missing string field 'response'".to_string())
        })
}

/// Create the [`Generator`] selected by configuration.
pub fn create_generator(config: &GenerationConfig) -> Result<Arc<dyn Generator>> {
    match config.provider.as_str() {
        "ollama" => Ok(Arc::new(OllamaGenerator::new(config)?)),
        "disabled" => Ok(Arc::new(DisabledGenerator)),
        other => bail!("Unknown generation provider: {}", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_generate_response() {
        let json = serde_json::json!({
            "model": "mistral",
            "response": "The sky is blue.",
            "done": true
        });
        assert_eq!(parse_generate_response(&json).unwrap(), "The sky is blue.");
    }

    #[test]
    fn test_parse_generate_response_missing_field() {
        let json = serde_json::json!({ "error": "model 'mistral' not found" });
        assert!(matches!(
            parse_generate_response(&json),
            Err(GenerationError::MalformedResponse(_))
        ));
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_transport_error() {
        let config = GenerationConfig {
            url: "http://127.0.0.1:9".to_string(),
            timeout_secs: 5,
            ..GenerationConfig::default()
        };
        let generator = OllamaGenerator::new(&config).unwrap();
        let err = generator.generate("hello").await.unwrap_err();
        assert!(matches!(
            err,
            GenerationError::Transport(_) | GenerationError::Timeout(_)
        ));
    }

    #[test]
    fn test_create_generator() {
        let g = create_generator(&GenerationConfig::default()).unwrap();
        assert_eq!(g.model_name(), "mistral");
        let config = GenerationConfig {
            provider: "disabled".to_string(),
            ..GenerationConfig::default()
        };
        assert_eq!(create_generator(&config).unwrap().model_name(), "disabled");
    }
}
