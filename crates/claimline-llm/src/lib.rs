//! Claimline LLM Provider Layer
//!
//! Implementations of the `LlmProvider` trait from `claimline-domain`.
//!
//! # Providers
//!
//! - `MockProvider`: scripted, deterministic responses for tests
//! - `OllamaProvider`: local Ollama API integration
//!
//! # Examples
//!
//! ```
//! use claimline_llm::MockProvider;
//! use claimline_domain::traits::LlmProvider;
//!
//! let provider = MockProvider::new(r#"{"decision": "CONTINUE"}"#);
//! let result = provider.generate("screen this claim").unwrap();
//! assert_eq!(result, r#"{"decision": "CONTINUE"}"#);
//! ```

#![warn(missing_docs)]

pub mod ollama;

use claimline_domain::traits::LlmProvider;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use thiserror::Error;

pub use ollama::{OllamaConfig, OllamaProvider};

/// Errors that can occur during LLM operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LlmError {
    /// Network or API communication error
    #[error("Communication error: {0}")]
    Communication(String),

    /// Invalid response from the LLM service
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Rate limit exceeded
    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    /// Model not available
    #[error("Model not available: {0}")]
    ModelNotAvailable(String),

    /// Generic error
    #[error("LLM error: {0}")]
    Other(String),
}

/// One scripted reply
#[derive(Debug, Clone)]
enum Reply {
    Text(String),
    Fail(String),
}

#[derive(Debug, Default)]
struct Script {
    queue: VecDeque<Reply>,
    by_prompt: HashMap<String, Reply>,
    prompts: Vec<String>,
}

/// Mock LLM provider for deterministic testing
///
/// Replies are chosen in this order: a reply registered for the exact
/// prompt, then the next queued reply, then the default response. Clones
/// share state, so a test can keep a handle while the pipeline owns another.
///
/// # Examples
///
/// ```
/// use claimline_llm::MockProvider;
/// use claimline_domain::traits::LlmProvider;
///
/// let provider = MockProvider::new("fallback");
/// provider.push_response("first");
/// provider.push_response("second");
///
/// assert_eq!(provider.generate("a").unwrap(), "first");
/// assert_eq!(provider.generate("b").unwrap(), "second");
/// assert_eq!(provider.generate("c").unwrap(), "fallback");
/// assert_eq!(provider.call_count(), 3);
/// ```
#[derive(Debug, Clone)]
pub struct MockProvider {
    default_response: String,
    script: Arc<Mutex<Script>>,
}

impl MockProvider {
    /// Create a MockProvider with a fixed response for all prompts
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            default_response: response.into(),
            script: Arc::new(Mutex::new(Script::default())),
        }
    }

    /// Queue a response for the next unmatched call
    pub fn push_response(&self, response: impl Into<String>) {
        if let Ok(mut script) = self.script.lock() {
            script.queue.push_back(Reply::Text(response.into()));
        }
    }

    /// Queue an error for the next unmatched call
    pub fn push_error(&self, message: impl Into<String>) {
        if let Ok(mut script) = self.script.lock() {
            script.queue.push_back(Reply::Fail(message.into()));
        }
    }

    /// Add a specific response for a given prompt
    pub fn add_response(&self, prompt: impl Into<String>, response: impl Into<String>) {
        if let Ok(mut script) = self.script.lock() {
            script.by_prompt.insert(prompt.into(), Reply::Text(response.into()));
        }
    }

    /// Number of times generate was called
    pub fn call_count(&self) -> usize {
        self.script.lock().map(|s| s.prompts.len()).unwrap_or(0)
    }

    /// Every prompt received, in order
    pub fn prompts(&self) -> Vec<String> {
        self.script.lock().map(|s| s.prompts.clone()).unwrap_or_default()
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new("Default mock response")
    }
}

impl LlmProvider for MockProvider {
    type Error = LlmError;

    fn generate(&self, prompt: &str) -> Result<String, Self::Error> {
        let mut script = self
            .script
            .lock()
            .map_err(|_| LlmError::Other("Mock lock poisoned".to_string()))?;
        script.prompts.push(prompt.to_string());

        let reply = match script.by_prompt.get(prompt) {
            Some(reply) => Some(reply.clone()),
            None => script.queue.pop_front(),
        };

        match reply {
            Some(Reply::Text(text)) => Ok(text),
            Some(Reply::Fail(message)) => Err(LlmError::Communication(message)),
            None => Ok(self.default_response.clone()),
        }
    }
}
