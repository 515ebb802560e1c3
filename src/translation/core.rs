/*!
 * Core translation service implementation.
 *
 * `TranslationService` sends one batch per request and owns the retry policy:
 * transient failures (timeout, connection, rate limit) are retried with
 * exponential backoff, everything else fails the batch at once.
 */

use log::{debug, info, warn};
use std::time::Duration;

use crate::app_config::{Config, RetryConfig, ServiceConfig};
use crate::errors::TranslationError;
use crate::providers::{CompletionRequest, Provider};
use crate::session::Interrupt;

use super::prompts;

/// Which timeout a request runs under
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeoutClass {
    /// Until the first success; the model may still be loading
    First,
    /// After the service has answered once
    Normal,
}

/// Translates batches through a completion provider with bounded retries
#[derive(Debug)]
pub struct TranslationService {
    provider: Box<dyn Provider>,
    service: ServiceConfig,
    retry: RetryConfig,
    first_timeout: Duration,
    normal_timeout: Duration,
    source_language: Option<String>,
    target_language: String,
    /// Set after the first successful request of the run
    warmed_up: bool,
}

impl TranslationService {
    pub fn new(provider: Box<dyn Provider>, config: &Config) -> Self {
        Self {
            provider,
            service: config.service.clone(),
            retry: config.retry,
            first_timeout: config.first_timeout(),
            normal_timeout: config.normal_timeout(),
            source_language: config.source_language.clone(),
            target_language: config.target_language.clone(),
            warmed_up: false,
        }
    }

    /// Name of the underlying provider
    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    pub fn model(&self) -> &str {
        &self.service.model
    }

    /// Timeout class the next batch will use
    pub fn timeout_class(&self) -> TimeoutClass {
        if self.warmed_up {
            TimeoutClass::Normal
        } else {
            TimeoutClass::First
        }
    }

    pub fn timeout_for(&self, class: TimeoutClass) -> Duration {
        match class {
            TimeoutClass::First => self.first_timeout,
            TimeoutClass::Normal => self.normal_timeout,
        }
    }

    /// Translate one batch, picking the timeout class from the run's history
    pub async fn translate_batch(
        &mut self,
        texts: &[String],
        interrupt: &Interrupt,
    ) -> Result<Vec<String>, TranslationError> {
        let lines = self.translate_with_retry(texts, self.timeout_class(), interrupt).await?;
        self.warmed_up = true;
        Ok(lines)
    }

    /// Translate one batch under an explicit timeout class.
    ///
    /// Every attempt sends the identical prompt. Before retry `k` the service
    /// waits `base_delay * 2^(k-1)`; an interrupt during that wait ends the
    /// batch with [`TranslationError::Interrupted`].
    pub async fn translate_with_retry(
        &self,
        texts: &[String],
        class: TimeoutClass,
        interrupt: &Interrupt,
    ) -> Result<Vec<String>, TranslationError> {
        let messages = prompts::build_messages(texts, self.source_language.as_deref(), &self.target_language);
        let timeout = self.timeout_for(class);
        let mut retries = 0u32;

        loop {
            if class == TimeoutClass::First {
                info!("First request, waking up model (timeout limit: {}s)...", timeout.as_secs());
            }

            let request = CompletionRequest {
                model: self.service.model.clone(),
                messages: messages.clone(),
                temperature: self.service.temperature,
                timeout,
            };

            let error = match self.provider.complete(request).await {
                Ok(content) => return Ok(prompts::parse_response_lines(&content)),
                Err(e) => e,
            };

            // Fatal outcomes are reported by the caller that receives them
            if !error.is_transient() {
                debug!("Unexpected error occurred: {}", error);
                return Err(TranslationError::Provider(error));
            }

            retries += 1;
            if retries > self.retry.max_retries {
                debug!(
                    "API request failed ({}): {}. No retries left after {} attempts",
                    error.label(), error, retries
                );
                return Err(TranslationError::RetriesExhausted {
                    attempts: retries,
                    last_error: error,
                });
            }

            let wait = self.retry.delay_before_retry(retries);
            let server_hint = error
                .retry_after()
                .map(|after| format!(" (server asked for {}s)", after.as_secs()))
                .unwrap_or_default();
            warn!(
                "API request failed ({}): {}. Retry {}/{}, wait {:.1}s{}...",
                error.label(), error, retries, self.retry.max_retries, wait.as_secs_f64(), server_hint
            );

            tokio::select! {
                _ = tokio::time::sleep(wait) => {}
                _ = interrupt.triggered() => return Err(TranslationError::Interrupted),
            }
        }
    }
}
