/*!
 * Tests for the retrying translation service
 */

use log::Level;
use std::time::Duration;
use srtrelay::app_config::{Config, RetryConfig};
use srtrelay::errors::{ProviderError, TranslationError};
use srtrelay::providers::mock::{MockBehavior, MockProvider};
use srtrelay::session::Interrupt;
use srtrelay::translation::prompts::SYSTEM_PROMPT;
use srtrelay::translation::{TimeoutClass, TranslationService};
use crate::common;

fn service(provider: &MockProvider, max_retries: u32, base_delay_ms: u64) -> TranslationService {
    let mut config = Config::new("German");
    config.source_language = Some("English".to_string());
    config.retry = RetryConfig { max_retries, base_delay_ms };
    TranslationService::new(Box::new(provider.clone()), &config)
}

fn lines(texts: &[&str]) -> Vec<String> {
    texts.iter().map(|t| t.to_string()).collect()
}

#[tokio::test(start_paused = true)]
async fn test_translate_batch_withAlwaysTransient_shouldBackOffExponentially() {
    let provider = MockProvider::failing(ProviderError::Timeout("read timed out".into()));
    let mut service = service(&provider, 3, 2000);

    let result = service.translate_batch(&lines(&["Hello"]), &Interrupt::new()).await;

    match result {
        Err(TranslationError::RetriesExhausted { attempts, last_error }) => {
            assert_eq!(attempts, 4);
            assert!(matches!(last_error, ProviderError::Timeout(_)));
        }
        other => panic!("expected exhausted retries, got {:?}", other),
    }

    let requests = provider.requests();
    assert_eq!(requests.len(), 4);
    let gaps: Vec<Duration> = requests
        .windows(2)
        .map(|pair| pair[1].received_at - pair[0].received_at)
        .collect();
    assert_eq!(
        gaps,
        vec![Duration::from_secs(2), Duration::from_secs(4), Duration::from_secs(8)]
    );
}

#[tokio::test(start_paused = true)]
async fn test_translate_batch_withRecoveringService_shouldResendIdenticalPrompt() {
    let provider = MockProvider::scripted(vec![
        Err(ProviderError::ConnectionError("reset".into())),
        Err(ProviderError::RateLimitExceeded { message: "slow down".into(), retry_after_secs: None }),
        Ok("Hallo\nWelt".to_string()),
    ]);
    let mut service = service(&provider, 3, 100);

    let translated = service
        .translate_batch(&lines(&["Hello", "World"]), &Interrupt::new())
        .await
        .expect("third attempt should succeed");

    assert_eq!(translated, lines(&["Hallo", "Welt"]));
    let requests = provider.requests();
    assert_eq!(requests.len(), 3);
    assert!(requests.iter().all(|r| r.request.messages == requests[0].request.messages));
    assert_eq!(requests[0].request.messages[0].content, SYSTEM_PROMPT);
    assert!(requests[0].request.messages[1].content.contains("from English into German"));
}

#[test]
fn test_translate_batch_withNonTransientError_shouldMakeSingleAttempt() {
    let provider = MockProvider::failing(ProviderError::AuthenticationError("bad key".into()));
    let mut service = service(&provider, 3, 100);

    let result = tokio_test::block_on(service.translate_batch(&lines(&["Hello"]), &Interrupt::new()));

    assert!(matches!(
        result,
        Err(TranslationError::Provider(ProviderError::AuthenticationError(_)))
    ));
    assert_eq!(provider.request_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_translate_batch_withEmptyContent_shouldFailWithoutRetry() {
    let provider = MockProvider::scripted(vec![Err(ProviderError::EmptyResponse)]);
    let mut service = service(&provider, 3, 100);

    let result = service.translate_batch(&lines(&["Hello"]), &Interrupt::new()).await;

    assert!(matches!(result, Err(TranslationError::Provider(ProviderError::EmptyResponse))));
    assert_eq!(provider.request_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_timeout_class_withRetriesBeforeFirstSuccess_shouldStayFirst() {
    let provider = MockProvider::scripted(vec![Err(ProviderError::Timeout("loading model".into()))]);
    let mut service = service(&provider, 3, 100);
    let interrupt = Interrupt::new();

    service.translate_batch(&lines(&["a"]), &interrupt).await.expect("retry should succeed");
    service.translate_batch(&lines(&["b"]), &interrupt).await.expect("second batch should succeed");

    let timeouts: Vec<Duration> = provider.requests().iter().map(|r| r.request.timeout).collect();
    assert_eq!(
        timeouts,
        vec![Duration::from_secs(300), Duration::from_secs(300), Duration::from_secs(60)]
    );
    assert_eq!(service.timeout_class(), TimeoutClass::Normal);
}

#[tokio::test(start_paused = true)]
async fn test_translate_batch_withBlankLinesInResponse_shouldDropThem() {
    let provider = MockProvider::fixed("\n  Eins \n\n Zwei\n\n");
    let mut service = service(&provider, 0, 100);

    let translated = service
        .translate_batch(&lines(&["One", "Two"]), &Interrupt::new())
        .await
        .expect("fixed response should succeed");

    assert_eq!(translated, lines(&["Eins", "Zwei"]));
}

#[tokio::test(start_paused = true)]
async fn test_translate_batch_withInterruptDuringRequest_shouldLetRequestFinish() {
    let provider = MockProvider::new(MockBehavior::Slow { delay_ms: 5_000 });
    let mut service = service(&provider, 3, 100);
    let interrupt = Interrupt::new();

    let trigger = interrupt.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(1)).await;
        trigger.trigger();
    });

    let translated = service
        .translate_batch(&lines(&["Hello"]), &interrupt)
        .await
        .expect("in-flight request is not cancelled");

    assert_eq!(translated, lines(&["[TRANSLATED] Hello"]));
    assert!(interrupt.is_triggered());
}

#[tokio::test(start_paused = true)]
async fn test_translate_batch_withRetryAfterHeader_shouldMentionItAndKeepBackoff() {
    let provider = MockProvider::scripted(vec![Err(ProviderError::RateLimitExceeded {
        message: "slow down".into(),
        retry_after_secs: Some(7),
    })]);
    let mut service = service(&provider, 3, 2000);

    common::capture_logs();
    service
        .translate_batch(&lines(&["Hello"]), &Interrupt::new())
        .await
        .expect("second attempt should succeed");

    let warnings = common::captured_logs(Level::Warn);
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].contains("wait 2.0s (server asked for 7s)"), "{}", warnings[0]);

    let requests = provider.requests();
    assert_eq!(requests[1].received_at - requests[0].received_at, Duration::from_secs(2));
}
