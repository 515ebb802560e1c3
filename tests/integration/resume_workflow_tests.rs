/*!
 * End-to-end tests of the checkpoint and resume protocol
 */

use anyhow::Result;
use std::cell::Cell;
use std::fs;

use srtrelay::app_config::OutputMode;
use srtrelay::errors::ProviderError;
use srtrelay::providers::mock::MockProvider;
use srtrelay::session::{Checkpoint, FixedPrompt, Interrupt, ProgressTracker, ResumePrompt, RunOutcome};
use srtrelay::subtitle_processor::SubtitleCollection;
use crate::common;

/// Counts how often it was asked and answers with a fixed value
struct CountingPrompt {
    answer: bool,
    asked: Cell<usize>,
}

impl CountingPrompt {
    fn new(answer: bool) -> Self {
        Self { answer, asked: Cell::new(0) }
    }
}

impl ResumePrompt for CountingPrompt {
    fn confirm_resume(&self, _checkpoint: &Checkpoint, _total: usize) -> anyhow::Result<bool> {
        self.asked.set(self.asked.get() + 1);
        Ok(self.answer)
    }
}

fn cue_lines(range: std::ops::Range<usize>) -> Vec<String> {
    range.map(|i| format!("Line {}", i)).collect()
}

fn checkpoint_json(tracker: &ProgressTracker) -> Result<serde_json::Value> {
    Ok(serde_json::from_str(&fs::read_to_string(tracker.path())?)?)
}

#[tokio::test]
async fn test_run_withCrashAfterFirstBatch_shouldResumeWithoutRetranslating() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_subtitle(temp_dir.path(), "movie.srt", 25)?;
    let output = temp_dir.path().join("movie.German.srt");
    let tracker = ProgressTracker::for_input(&input);

    // First run: batch 1 succeeds, batch 2 hits a fatal service error
    let first_provider = MockProvider::scripted(vec![
        Ok(MockProvider::generate_batch_response(&cue_lines(0..10))),
        Err(ProviderError::ApiError { status_code: 500, message: "model crashed".into() }),
    ]);
    let mut first_run = common::controller(common::test_config(10), &first_provider);
    let result = first_run.run(&input, &FixedPrompt(true), &Interrupt::new()).await;
    assert!(result.is_err());
    assert_eq!(first_provider.request_count(), 2);

    let checkpoint = checkpoint_json(&tracker)?;
    assert_eq!(checkpoint["processed_count"], 10);
    assert_eq!(checkpoint["output_file"], output.to_string_lossy().to_string());

    let partial = SubtitleCollection::load(&output)?;
    assert_eq!(partial.len(), 25);
    assert_eq!(partial.entries[9].text, "[TRANSLATED] Line 9\nLine 9");
    assert_eq!(partial.entries[10].text, "Line 10");

    // Second run picks up at cue 10
    let second_provider = MockProvider::working();
    let prompt = CountingPrompt::new(true);
    let mut second_run = common::controller(common::test_config(10), &second_provider);
    let outcome = second_run.run(&input, &prompt, &Interrupt::new()).await?;

    assert_eq!(prompt.asked.get(), 1);
    assert_eq!(outcome, RunOutcome::Completed { output_file: output.clone(), translated: 15 });
    assert_eq!(second_provider.request_count(), 2);
    assert_eq!(common::requested_lines(&second_provider), cue_lines(10..25));

    let finished = SubtitleCollection::load(&output)?;
    for (i, entry) in finished.entries.iter().enumerate() {
        assert_eq!(entry.text, format!("[TRANSLATED] Line {}\nLine {}", i, i));
        assert_eq!(entry.seq_num, i + 1);
    }
    assert!(!tracker.path().exists());
    Ok(())
}

#[tokio::test]
async fn test_run_withFreshInput_shouldSendBatchesInOrderAndDeleteCheckpoint() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_subtitle(temp_dir.path(), "movie.srt", 25)?;
    let provider = MockProvider::working();
    let prompt = CountingPrompt::new(true);

    let mut controller = common::controller(common::test_config(10), &provider);
    let outcome = controller.run(&input, &prompt, &Interrupt::new()).await?;

    assert_eq!(prompt.asked.get(), 0);
    let batch_sizes: Vec<usize> = provider
        .requests()
        .iter()
        .map(|r| MockProvider::input_lines(&r.request).len())
        .collect();
    assert_eq!(batch_sizes, vec![10, 10, 5]);
    assert_eq!(outcome.output_file(), &temp_dir.path().join("movie.German.srt"));
    assert!(!ProgressTracker::for_input(&input).path().exists());
    Ok(())
}

#[tokio::test]
async fn test_run_withDeclinedResume_shouldRestartFromFirstCue() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_subtitle(temp_dir.path(), "movie.srt", 12)?;
    let tracker = ProgressTracker::for_input(&input);
    let stale_output = temp_dir.path().join("stale.srt");
    fs::copy(&input, &stale_output)?;
    tracker.save(10, &stale_output)?;

    let provider = MockProvider::working();
    let mut controller = common::controller(common::test_config(10), &provider);
    let outcome = controller.run(&input, &FixedPrompt(false), &Interrupt::new()).await?;

    assert_eq!(common::requested_lines(&provider), cue_lines(0..12));
    assert_eq!(outcome.output_file(), &temp_dir.path().join("movie.German.srt"));
    assert!(!tracker.path().exists());
    Ok(())
}

#[tokio::test]
async fn test_run_withMissingSavedOutput_shouldRestartIntoSavedLocation() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_subtitle(temp_dir.path(), "movie.srt", 7)?;
    let tracker = ProgressTracker::for_input(&input);
    let saved_output = temp_dir.path().join("custom").join("movie.de.srt");
    tracker.save(5, &saved_output)?;

    let provider = MockProvider::working();
    let mut controller = common::controller(common::test_config(5), &provider);
    let outcome = controller.run(&input, &FixedPrompt(true), &Interrupt::new()).await?;

    assert_eq!(common::requested_lines(&provider), cue_lines(0..7));
    assert_eq!(outcome, RunOutcome::Completed { output_file: saved_output.clone(), translated: 7 });
    assert_eq!(SubtitleCollection::load(&saved_output)?.len(), 7);
    assert!(!tracker.path().exists());
    Ok(())
}

#[tokio::test]
async fn test_run_withCorruptedCheckpoint_shouldStartFreshWithoutAsking() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_subtitle(temp_dir.path(), "movie.srt", 3)?;
    let tracker = ProgressTracker::for_input(&input);
    fs::write(tracker.path(), "{\"processed_count\": \"ten\"")?;

    let provider = MockProvider::working();
    let prompt = CountingPrompt::new(true);
    let mut controller = common::controller(common::test_config(10), &provider);
    controller.run(&input, &prompt, &Interrupt::new()).await?;

    assert_eq!(prompt.asked.get(), 0);
    assert_eq!(common::requested_lines(&provider), cue_lines(0..3));
    assert!(!tracker.path().exists());
    Ok(())
}

#[tokio::test]
async fn test_run_withCheckpointPastEnd_shouldFinishWithoutRequests() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_subtitle(temp_dir.path(), "movie.srt", 4)?;
    let tracker = ProgressTracker::for_input(&input);
    let output = temp_dir.path().join("movie.German.srt");
    fs::copy(&input, &output)?;
    tracker.save(9, &output)?;

    let provider = MockProvider::working();
    let mut controller = common::controller(common::test_config(10), &provider);
    let outcome = controller.run(&input, &FixedPrompt(true), &Interrupt::new()).await?;

    assert_eq!(provider.request_count(), 0);
    assert_eq!(outcome, RunOutcome::Completed { output_file: output, translated: 0 });
    assert!(!tracker.path().exists());
    Ok(())
}

#[tokio::test]
async fn test_run_withMonoModeAndShortAnswer_shouldPadWithEmptyCues() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_subtitle(temp_dir.path(), "movie.srt", 3)?;
    let provider = MockProvider::fixed("Eins");

    let mut config = common::test_config(10);
    config.output_mode = OutputMode::Mono;
    config.output = Some(temp_dir.path().join("mono.srt"));
    let mut controller = common::controller(config, &provider);
    let outcome = controller.run(&input, &FixedPrompt(true), &Interrupt::new()).await?;

    let written = SubtitleCollection::load(outcome.output_file())?;
    let original = SubtitleCollection::load(&input)?;
    let texts: Vec<&str> = written.entries.iter().map(|e| e.text.as_str()).collect();
    assert_eq!(texts, vec!["Eins", "", ""]);
    for (a, b) in written.entries.iter().zip(&original.entries) {
        assert_eq!((a.start_time_ms, a.end_time_ms), (b.start_time_ms, b.end_time_ms));
    }
    Ok(())
}

#[tokio::test]
async fn test_run_withOutputDirectory_shouldNameFileAfterInput() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_subtitle(temp_dir.path(), "episode.srt", 2)?;
    let out_dir = temp_dir.path().join("out");
    fs::create_dir(&out_dir)?;

    let provider = MockProvider::working();
    let mut config = common::test_config(10);
    config.target_language = "Portuguese (Brazil)".to_string();
    config.output = Some(out_dir.clone());
    let mut controller = common::controller(config, &provider);
    let outcome = controller.run(&input, &FixedPrompt(true), &Interrupt::new()).await?;

    assert_eq!(outcome.output_file(), &out_dir.join("episode.PortugueseBrazil.srt"));
    assert!(outcome.output_file().exists());
    Ok(())
}

#[tokio::test]
async fn test_run_withEmptyCues_shouldSkipThemInRequestsAndKeepAlignment() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_subtitle(temp_dir.path(), "movie.srt", 5)?;
    let mut subtitles = SubtitleCollection::load(&input)?;
    subtitles.entries[2].text.clear();
    subtitles.entries[3].text.clear();
    subtitles.write_to_srt(&input)?;

    let provider = MockProvider::working();
    let mut controller = common::controller(common::test_config(2), &provider);
    let outcome = controller.run(&input, &FixedPrompt(true), &Interrupt::new()).await?;

    // The batch holding only cues 2 and 3 is never sent
    assert_eq!(provider.request_count(), 2);
    assert_eq!(common::requested_lines(&provider), vec!["Line 0", "Line 1", "Line 4"]);

    let written = SubtitleCollection::load(outcome.output_file())?;
    let texts: Vec<&str> = written.entries.iter().map(|e| e.text.as_str()).collect();
    assert_eq!(
        texts,
        vec![
            "[TRANSLATED] Line 0\nLine 0",
            "[TRANSLATED] Line 1\nLine 1",
            "",
            "",
            "[TRANSLATED] Line 4\nLine 4",
        ]
    );
    Ok(())
}

#[tokio::test]
async fn test_run_withEmptyCueInsideBatch_shouldNotShiftLaterTranslations() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_subtitle(temp_dir.path(), "movie.srt", 3)?;
    let mut subtitles = SubtitleCollection::load(&input)?;
    subtitles.entries[1].text.clear();
    subtitles.write_to_srt(&input)?;

    let provider = MockProvider::fixed("Null\n\nZwei");
    let mut config = common::test_config(10);
    config.output_mode = OutputMode::Mono;
    let mut controller = common::controller(config, &provider);
    let outcome = controller.run(&input, &FixedPrompt(true), &Interrupt::new()).await?;

    assert_eq!(common::requested_lines(&provider), vec!["Line 0", "Line 2"]);
    let written = SubtitleCollection::load(outcome.output_file())?;
    let texts: Vec<&str> = written.entries.iter().map(|e| e.text.as_str()).collect();
    assert_eq!(texts, vec!["Null", "", "Zwei"]);
    Ok(())
}

#[tokio::test]
async fn test_prepare_withCheckpoint_shouldSettleResumeBeforeAnyRequest() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_subtitle(temp_dir.path(), "movie.srt", 25)?;
    let tracker = ProgressTracker::for_input(&input);
    let output = temp_dir.path().join("movie.German.srt");
    fs::copy(&input, &output)?;
    tracker.save(10, &output)?;

    let provider = MockProvider::working();
    let prompt = CountingPrompt::new(true);
    let mut controller = common::controller(common::test_config(10), &provider);

    let prepared = controller.prepare(&input, &prompt)?;
    assert_eq!(prompt.asked.get(), 1);
    assert_eq!(prepared.start_index(), 10);
    assert_eq!(prepared.output_file(), output.as_path());
    assert_eq!(provider.request_count(), 0);

    // Ctrl+C pressed right after answering stops before the first batch
    let interrupt = Interrupt::new();
    interrupt.trigger();
    let outcome = controller.execute(prepared, &interrupt).await?;

    assert_eq!(outcome, RunOutcome::Interrupted { output_file: output.clone(), processed_count: 10 });
    assert_eq!(provider.request_count(), 0);
    assert_eq!(tracker.load().map(|c| c.processed_count), Some(10));
    Ok(())
}
