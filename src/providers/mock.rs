/*!
 * Mock provider implementations for testing.
 *
 * This module provides a provider that simulates different service behaviors
 * without any network traffic:
 * - `MockProvider::working()` - Always succeeds, echoing each input line as a translation
 * - `MockProvider::scripted(..)` - Plays back a fixed list of outcomes, then works
 * - `MockProvider::failing(..)` - Always fails with the given error
 *
 * Every request is recorded together with the (tokio) instant it arrived, so
 * tests can assert on prompts, timeouts and backoff spacing.
 */

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::time::Instant;

use crate::errors::ProviderError;
use crate::providers::{CompletionRequest, Provider};
use crate::translation::prompts::INPUT_MARKER;

/// Behavior mode for the mock provider
#[derive(Debug, Clone)]
pub enum MockBehavior {
    /// Always succeeds with one "[TRANSLATED] <line>" per input line
    Working,
    /// Always fails with this error
    Failing(ProviderError),
    /// Always succeeds with this exact text
    Fixed(String),
    /// Simulates slow response (for timeout testing)
    Slow { delay_ms: u64 },
}

/// A request observed by the mock
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub request: CompletionRequest,
    pub received_at: Instant,
}

#[derive(Debug, Default)]
struct MockState {
    script: VecDeque<Result<String, ProviderError>>,
    requests: Vec<RecordedRequest>,
}

type CallHook = Arc<dyn Fn(usize) + Send + Sync>;

/// Mock provider for testing translation behavior
#[derive(Clone)]
pub struct MockProvider {
    /// Behavior once the script is used up
    behavior: MockBehavior,
    /// Shared between clones so a test can keep a handle after moving one into the translator
    state: Arc<Mutex<MockState>>,
    /// Called with the 1-based request number before the response is produced
    on_call: Option<CallHook>,
}

impl std::fmt::Debug for MockProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockProvider")
            .field("behavior", &self.behavior)
            .field("request_count", &self.request_count())
            .finish()
    }
}

impl MockProvider {
    /// Create a new mock provider with the specified behavior
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            state: Arc::new(Mutex::new(MockState::default())),
            on_call: None,
        }
    }

    /// Create a working mock provider that always succeeds
    pub fn working() -> Self {
        Self::new(MockBehavior::Working)
    }

    /// Create a failing mock provider that always returns `error`
    pub fn failing(error: ProviderError) -> Self {
        Self::new(MockBehavior::Failing(error))
    }

    /// Create a provider that always answers with `text`
    pub fn fixed(text: impl Into<String>) -> Self {
        Self::new(MockBehavior::Fixed(text.into()))
    }

    /// Play back `outcomes` in order, then behave like `working()`
    pub fn scripted(outcomes: Vec<Result<String, ProviderError>>) -> Self {
        let provider = Self::working();
        if let Ok(mut state) = provider.state.lock() {
            state.script = outcomes.into();
        }
        provider
    }

    /// Run `hook` with the request number on every call
    pub fn with_call_hook(mut self, hook: impl Fn(usize) + Send + Sync + 'static) -> Self {
        self.on_call = Some(Arc::new(hook));
        self
    }

    /// Number of requests received so far
    pub fn request_count(&self) -> usize {
        self.state.lock().map(|s| s.requests.len()).unwrap_or(0)
    }

    /// Every request received so far, oldest first
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.lock().map(|s| s.requests.clone()).unwrap_or_default()
    }

    /// Lines following the input marker of a prompt
    pub fn input_lines(request: &CompletionRequest) -> Vec<String> {
        request
            .user_content()
            .and_then(|content| content.rsplit_once(INPUT_MARKER))
            .map(|(_, input)| input.lines().map(str::to_string).collect())
            .unwrap_or_default()
    }

    /// Generate a well-formed response for the given input lines
    pub fn generate_batch_response(lines: &[String]) -> String {
        lines
            .iter()
            .map(|line| format!("[TRANSLATED] {}", line))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[async_trait]
impl Provider for MockProvider {
    async fn complete(&self, request: CompletionRequest) -> Result<String, ProviderError> {
        let (call_number, scripted) = {
            let mut state = self.state.lock()
                .map_err(|_| ProviderError::RequestFailed("mock state poisoned".to_string()))?;
            state.requests.push(RecordedRequest {
                request: request.clone(),
                received_at: Instant::now(),
            });
            (state.requests.len(), state.script.pop_front())
        };

        if let Some(hook) = &self.on_call {
            hook(call_number);
        }

        if let Some(outcome) = scripted {
            return outcome;
        }

        match &self.behavior {
            MockBehavior::Working => Ok(Self::generate_batch_response(&Self::input_lines(&request))),
            MockBehavior::Failing(error) => Err(error.clone()),
            MockBehavior::Fixed(text) => Ok(text.clone()),
            MockBehavior::Slow { delay_ms } => {
                tokio::time::sleep(tokio::time::Duration::from_millis(*delay_ms)).await;
                Ok(Self::generate_batch_response(&Self::input_lines(&request)))
            }
        }
    }

    fn name(&self) -> &str {
        "Mock"
    }
}
