//! Ollama Provider Implementation
//!
//! Runs the decision agents against a local Ollama instance, so claim text
//! never leaves the host.
//!
//! # Features
//!
//! - Async HTTP communication with the Ollama API
//! - Configurable endpoint, model and timeout
//! - Retry logic with exponential backoff
//! - Blocking `LlmProvider` implementation for use from `spawn_blocking`
//!
//! # Examples
//!
//! ```no_run
//! use claimline_llm::OllamaProvider;
//!
//! let provider = OllamaProvider::new("http://localhost:11434", "llama3");
//! ```

use crate::LlmError;
use claimline_domain::traits::LlmProvider;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

/// Default Ollama API endpoint
pub const DEFAULT_ENDPOINT: &str = "http://localhost:11434";

/// Default timeout for LLM requests (seconds)
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Default number of attempts per request
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Connection settings for [`OllamaProvider`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OllamaConfig {
    /// API endpoint
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Model name
    pub model: String,

    /// Per-request timeout (seconds)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Attempts per request before giving up
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            model: "llama3".to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }
}

/// Ollama API provider for local LLM inference
pub struct OllamaProvider {
    endpoint: String,
    model: String,
    client: reqwest::Client,
    max_retries: u32,
}

/// Request body for the Ollama generate API
#[derive(Serialize)]
struct OllamaGenerateRequest {
    model: String,
    prompt: String,
    stream: bool,
}

/// Response from the Ollama generate API
#[derive(Deserialize)]
struct OllamaGenerateResponse {
    response: String,
}

impl OllamaProvider {
    /// Create a new Ollama provider with the default timeout
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use claimline_llm::OllamaProvider;
    ///
    /// let provider = OllamaProvider::new("http://localhost:11434", "mistral");
    /// ```
    pub fn new(endpoint: impl Into<String>, model: impl Into<String>) -> Self {
        Self::from_config(&OllamaConfig {
            endpoint: endpoint.into(),
            model: model.into(),
            ..OllamaConfig::default()
        })
    }

    /// Create a provider from configuration
    pub fn from_config(config: &OllamaConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|e| {
                warn!("Falling back to default HTTP client: {}", e);
                reqwest::Client::new()
            });

        Self {
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            client,
            max_retries: config.max_retries.max(1),
        }
    }

    /// Set the maximum number of attempts
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries.max(1);
        self
    }

    /// Model this provider talks to
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Generate a completion via the Ollama API
    ///
    /// # Errors
    ///
    /// - `ModelNotAvailable` if Ollama does not know the model
    /// - `InvalidResponse` if the body cannot be decoded
    /// - `Communication` once all attempts have failed
    pub async fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        let url = format!("{}/api/generate", self.endpoint);

        let request_body = OllamaGenerateRequest {
            model: self.model.clone(),
            prompt: prompt.to_string(),
            stream: false,
        };

        let mut attempts = 0;
        let mut last_error = None;

        while attempts < self.max_retries {
            match self.client.post(&url).json(&request_body).send().await {
                Ok(response) if response.status().is_success() => {
                    return response
                        .json::<OllamaGenerateResponse>()
                        .await
                        .map(|body| body.response)
                        .map_err(|e| {
                            LlmError::InvalidResponse(format!("Failed to parse response: {}", e))
                        });
                }
                Ok(response) if response.status() == reqwest::StatusCode::NOT_FOUND => {
                    return Err(LlmError::ModelNotAvailable(self.model.clone()));
                }
                Ok(response) if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS => {
                    last_error = Some(LlmError::RateLimitExceeded);
                }
                Ok(response) => {
                    let status = response.status();
                    let error_text = response
                        .text()
                        .await
                        .unwrap_or_else(|_| "Unknown error".to_string());
                    last_error = Some(LlmError::Communication(format!(
                        "HTTP {}: {}",
                        status, error_text
                    )));
                }
                Err(e) => {
                    last_error = Some(LlmError::Communication(format!("Request failed: {}", e)));
                }
            }

            attempts += 1;
            if attempts < self.max_retries {
                // Exponential backoff: 1s, 2s, 4s, ...
                let delay = Duration::from_secs(2u64.pow(attempts - 1));
                debug!("Ollama attempt {} failed, retrying in {:?}", attempts, delay);
                tokio::time::sleep(delay).await;
            }
        }

        Err(last_error
            .unwrap_or_else(|| LlmError::Communication("Max retries exceeded".to_string())))
    }
}

impl LlmProvider for OllamaProvider {
    type Error = LlmError;

    fn generate(&self, prompt: &str) -> Result<String, Self::Error> {
        // Blocking threads spawned by the runtime can drive futures through
        // its handle; outside a runtime a private one is built.
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle.block_on(self.complete(prompt)),
            Err(_) => tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .map_err(|e| LlmError::Other(format!("Runtime error: {}", e)))?
                .block_on(self.complete(prompt)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ollama_provider_creation() {
        let provider = OllamaProvider::new("http://localhost:11434/", "llama2");
        assert_eq!(provider.endpoint, "http://localhost:11434");
        assert_eq!(provider.model(), "llama2");
        assert_eq!(provider.max_retries, DEFAULT_MAX_RETRIES);
    }

    #[test]
    fn test_ollama_with_max_retries_never_zero() {
        let provider = OllamaProvider::new(DEFAULT_ENDPOINT, "llama2").with_max_retries(0);
        assert_eq!(provider.max_retries, 1);
    }

    #[test]
    fn test_config_defaults_from_toml_fields() {
        let config: OllamaConfig = serde_json::from_str(r#"{"model": "mistral"}"#).unwrap();
        assert_eq!(config.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(config.timeout_secs, DEFAULT_TIMEOUT_SECS);
    }

    #[tokio::test]
    async fn test_ollama_error_handling() {
        let provider = OllamaProvider::new("http://127.0.0.1:1", "llama2").with_max_retries(1);

        let result = provider.complete("test").await;
        assert!(matches!(result, Err(LlmError::Communication(_))));
    }

    #[test]
    fn test_blocking_generate_outside_runtime() {
        let provider = OllamaProvider::new("http://127.0.0.1:1", "llama2").with_max_retries(1);
        assert!(provider.generate("test").is_err());
    }
}
