use async_trait::async_trait;
use log::debug;
use reqwest::{Client, StatusCode, header};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::errors::ProviderError;
use crate::providers::{ChatMessage, CompletionRequest, Provider};

/// Client for OpenAI-compatible chat completion APIs
#[derive(Debug)]
pub struct OpenAiCompatible {
    /// HTTP client for API requests
    client: Client,
    /// API key sent as a bearer token
    api_key: String,
    /// Base URL, e.g. `http://localhost:11434/v1`
    base_url: String,
}

/// Chat completion request body
#[derive(Debug, Serialize)]
pub struct ChatCompletionRequest<'a> {
    /// The model to use
    model: &'a str,
    /// The messages for the conversation
    messages: &'a [ChatMessage],
    /// Temperature for generation
    temperature: f32,
    /// Always false, the whole completion is read at once
    stream: bool,
}

/// Token usage information
#[derive(Debug, Deserialize)]
pub struct TokenUsage {
    #[serde(default)]
    pub prompt_tokens: u64,
    #[serde(default)]
    pub completion_tokens: u64,
}

/// Message inside a choice; content can be null
#[derive(Debug, Deserialize)]
pub struct ResponseMessage {
    #[serde(default)]
    pub content: Option<String>,
}

/// Individual choice in a chat completion response
#[derive(Debug, Deserialize)]
pub struct Choice {
    pub message: ResponseMessage,
}

/// Chat completion response
#[derive(Debug, Deserialize)]
pub struct ChatCompletionResponse {
    #[serde(default)]
    pub choices: Vec<Choice>,
    #[serde(default)]
    pub usage: Option<TokenUsage>,
}

impl OpenAiCompatible {
    /// Create a new client. Timeouts are set per request.
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client: Client::builder()
                .connect_timeout(Duration::from_secs(30))
                .pool_idle_timeout(Duration::from_secs(90))
                .build()
                .unwrap_or_default(),
            api_key: api_key.into(),
            base_url: base_url.into(),
        }
    }

    /// Full URL of the chat completions endpoint
    pub fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }

    /// Map a transport level failure to the provider error taxonomy
    fn classify_transport_error(error: reqwest::Error, timeout: Duration) -> ProviderError {
        if error.is_timeout() {
            ProviderError::Timeout(format!("no response within {}s: {}", timeout.as_secs(), error))
        } else if error.is_connect() || error.is_request() || error.is_body() {
            ProviderError::ConnectionError(error.to_string())
        } else {
            ProviderError::RequestFailed(error.to_string())
        }
    }

    /// Map a non-success HTTP status to the provider error taxonomy
    fn classify_status(status: StatusCode, retry_after_secs: Option<u64>, body: String) -> ProviderError {
        match status {
            StatusCode::TOO_MANY_REQUESTS => ProviderError::RateLimitExceeded {
                message: body,
                retry_after_secs,
            },
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ProviderError::AuthenticationError(body),
            _ => ProviderError::ApiError {
                status_code: status.as_u16(),
                message: body,
            },
        }
    }

    /// Extract the generated text from a decoded response
    pub fn extract_text(response: &ChatCompletionResponse) -> Result<String, ProviderError> {
        let content = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.as_deref())
            .map(str::trim)
            .unwrap_or_default();

        if content.is_empty() {
            return Err(ProviderError::EmptyResponse);
        }

        Ok(content.to_string())
    }
}

#[async_trait]
impl Provider for OpenAiCompatible {
    async fn complete(&self, request: CompletionRequest) -> Result<String, ProviderError> {
        let body = ChatCompletionRequest {
            model: &request.model,
            messages: &request.messages,
            temperature: request.temperature,
            stream: false,
        };

        let response = self.client.post(self.completions_url())
            .header(header::CONTENT_TYPE, "application/json")
            .bearer_auth(&self.api_key)
            .timeout(request.timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| Self::classify_transport_error(e, request.timeout))?;

        let status = response.status();
        if !status.is_success() {
            let retry_after_secs = response.headers()
                .get(header::RETRY_AFTER)
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.trim().parse::<u64>().ok());
            let error_text = response.text().await
                .unwrap_or_else(|_| "Failed to get error response text".to_string());
            debug!("Completion API error ({}): {}", status, error_text);
            return Err(Self::classify_status(status, retry_after_secs, error_text));
        }

        let response_text = response.text().await
            .map_err(|e| Self::classify_transport_error(e, request.timeout))?;

        let completion: ChatCompletionResponse = serde_json::from_str(&response_text)
            .map_err(|e| {
                let preview: String = response_text.chars().take(500).collect();
                ProviderError::ParseError(format!("{} (first 500 chars: {})", e, preview))
            })?;

        if let Some(usage) = &completion.usage {
            debug!("Token usage: {} prompt, {} completion", usage.prompt_tokens, usage.completion_tokens);
        }

        Self::extract_text(&completion)
    }

    fn name(&self) -> &str {
        "OpenAI-compatible"
    }
}
