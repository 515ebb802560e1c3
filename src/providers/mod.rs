/*!
 * Completion service clients.
 *
 * - `openai`: any OpenAI-compatible chat completions endpoint (OpenAI, Ollama,
 *   LM Studio, vLLM, ...)
 * - `mock`: scriptable in-process provider used by the test suite
 */

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::time::Duration;

use crate::errors::ProviderError;

/// Chat message object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Role of the message sender (system, user or assistant)
    pub role: String,
    /// Content of the message
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: "system".to_string(), content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: "user".to_string(), content: content.into() }
    }
}

/// One completion request, independent of the wire format
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    /// Model name to use for generation
    pub model: String,
    /// Messages of the conversation, in order
    pub messages: Vec<ChatMessage>,
    /// Sampling temperature
    pub temperature: f32,
    /// Upper bound for the whole round trip
    pub timeout: Duration,
}

impl CompletionRequest {
    /// Content of the last user message, if any
    pub fn user_content(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == "user")
            .map(|m| m.content.as_str())
    }
}

/// Common trait for all completion providers
///
/// Implementations perform exactly one request per call; retrying is the
/// caller's decision, driven by [`ProviderError::kind`].
#[async_trait]
pub trait Provider: Send + Sync + Debug {
    /// Send the request and return the generated text
    async fn complete(&self, request: CompletionRequest) -> Result<String, ProviderError>;

    /// Human readable provider name for log lines
    fn name(&self) -> &str;
}

pub mod mock;
pub mod openai;
