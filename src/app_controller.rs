use log::{debug, info, warn};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::app_config::Config;
use crate::errors::{AppError, TranslationError};
use crate::file_utils::FileManager;
use crate::providers::Provider;
use crate::session::{Checkpoint, Interrupt, ProgressTracker, ResumePrompt, RunOutcome, RunState};
use crate::subtitle_processor::SubtitleCollection;
use crate::translation::materializer::translatable_texts;
use crate::translation::{BatchPlan, OutputMaterializer, TranslationService};

// @module: Application controller driving one resumable translation run

/// Where a run starts after the checkpoint has been looked at
struct StartPoint {
    subtitles: SubtitleCollection,
    output_file: PathBuf,
    start_index: usize,
}

/// A loaded input with its resume decision made, ready for [`Controller::execute`]
pub struct PreparedRun {
    start: StartPoint,
    tracker: ProgressTracker,
}

impl PreparedRun {
    /// First cue that still needs translating
    pub fn start_index(&self) -> usize {
        self.start.start_index
    }

    pub fn output_file(&self) -> &Path {
        &self.start.output_file
    }
}

/// Main application controller for subtitle translation
pub struct Controller {
    // @field: App configuration
    config: Config,
    // @field: Batch translator, keeps the timeout class across batches
    translator: TranslationService,
    // @field: Draw an indicatif progress bar on stderr
    show_progress: bool,
}

impl Controller {
    // @method: Create a controller translating through `provider`
    pub fn new(config: Config, provider: Box<dyn Provider>) -> Self {
        let translator = TranslationService::new(provider, &config);
        Self {
            config,
            translator,
            show_progress: true,
        }
    }

    /// Enable or disable the progress bar
    pub fn with_progress_bar(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Translate `input_file`, resuming from its checkpoint if the prompt agrees.
    ///
    /// Each batch is merged and the whole output file rewritten before the
    /// checkpoint moves forward. On success the checkpoint is removed; on an
    /// interrupt it is kept and [`RunOutcome::Interrupted`] is returned.
    pub async fn run(
        &mut self,
        input_file: &Path,
        prompt: &dyn ResumePrompt,
        interrupt: &Interrupt,
    ) -> Result<RunOutcome, AppError> {
        let prepared = self.prepare(input_file, prompt)?;
        self.execute(prepared, interrupt).await
    }

    /// Load the input and settle the resume question. Sends no requests, so
    /// the caller can install its Ctrl+C handler only after the prompt.
    pub fn prepare(&self, input_file: &Path, prompt: &dyn ResumePrompt) -> Result<PreparedRun, AppError> {
        if !FileManager::file_exists(input_file) {
            return Err(AppError::InputNotFound(input_file.to_path_buf()));
        }

        let input = SubtitleCollection::load(input_file).map_err(|e| AppError::InvalidInput {
            path: input_file.to_path_buf(),
            message: format!("{:#}", e),
        })?;
        let total = input.len();
        info!("Loaded {} subtitles from {}", total, input_file.display());

        let tracker = ProgressTracker::for_input(input_file);
        let state = match tracker.load() {
            Some(checkpoint) => RunState::ResumePending(checkpoint),
            None => RunState::FreshStart,
        };
        debug!("Run state: {}", state);

        let start = match state {
            RunState::ResumePending(checkpoint) => self.resolve_resume(input, checkpoint, &tracker, prompt)?,
            _ => StartPoint {
                output_file: self.default_output_path(input_file),
                subtitles: input,
                start_index: 0,
            },
        };

        Ok(PreparedRun { start, tracker })
    }

    /// Translate the cues a [`PreparedRun`] still has ahead of it
    pub async fn execute(&mut self, prepared: PreparedRun, interrupt: &Interrupt) -> Result<RunOutcome, AppError> {
        let start_time = Instant::now();
        let PreparedRun { start, tracker } = prepared;
        let total = start.subtitles.len();
        debug!("Run state: {}", RunState::Running { start_index: start.start_index });

        let outcome = self.translate_from(start, &tracker, interrupt).await;
        match &outcome {
            Ok(RunOutcome::Completed { output_file, translated }) => {
                debug!("Run state: {}", RunState::Completed);
                info!(
                    "Translated {} subtitles in {}",
                    translated,
                    Self::format_duration(start_time.elapsed())
                );
                info!("Translation completed! File saved to: {}", output_file.display());
            }
            Ok(RunOutcome::Interrupted { processed_count, .. }) => {
                debug!("Run state: {}", RunState::Aborted);
                warn!(
                    "Stopped after {}/{} subtitles. Run the same command again to continue.",
                    processed_count, total
                );
            }
            Err(_) => {
                // The error itself is reported once, by whoever receives it
                debug!("Run state: {}", RunState::Aborted);
                if tracker.path().exists() {
                    info!("Progress saved in {}", tracker.path().display());
                }
            }
        }

        outcome
    }

    /// Turn a found checkpoint into a start point, asking the operator first
    fn resolve_resume(
        &self,
        input: SubtitleCollection,
        checkpoint: Checkpoint,
        tracker: &ProgressTracker,
        prompt: &dyn ResumePrompt,
    ) -> Result<StartPoint, AppError> {
        let total = input.len();
        info!(
            "Found unfinished translation: {}/{} subtitles done, output {}",
            checkpoint.processed_count.min(total),
            total,
            checkpoint.output_file.display()
        );

        let accepted = prompt.confirm_resume(&checkpoint, total).unwrap_or_else(|e| {
            warn!("Could not read answer, continuing last progress: {:#}", e);
            true
        });

        if !accepted {
            info!("Starting over, previous progress discarded");
            tracker.delete()?;
            return Ok(StartPoint {
                output_file: self.default_output_path(&input.source_file),
                subtitles: input,
                start_index: 0,
            });
        }

        let output_file = checkpoint.output_file;
        let restart = |reason: String, input: SubtitleCollection| -> Result<StartPoint, AppError> {
            warn!("{}, restarting from the first subtitle", reason);
            tracker.delete()?;
            Ok(StartPoint {
                subtitles: input,
                output_file: output_file.clone(),
                start_index: 0,
            })
        };

        if !FileManager::file_exists(&output_file) {
            return restart(format!("Output file {} is missing", output_file.display()), input);
        }

        let partial = match SubtitleCollection::load(&output_file) {
            Ok(partial) => partial,
            Err(e) => return restart(format!("Output file is unreadable ({:#})", e), input),
        };

        if partial.len() != total {
            return restart(
                format!("Output file has {} subtitles but the input has {}", partial.len(), total),
                input,
            );
        }

        if checkpoint.processed_count > total {
            warn!(
                "Checkpoint claims {} subtitles but the input has {}",
                checkpoint.processed_count, total
            );
        }

        let start_index = checkpoint.processed_count.min(total);
        info!("Resuming from subtitle {}", start_index + 1);
        Ok(StartPoint {
            subtitles: partial,
            output_file,
            start_index,
        })
    }

    /// The batch loop: interrupt check, translate, write output, save checkpoint
    async fn translate_from(
        &mut self,
        start: StartPoint,
        tracker: &ProgressTracker,
        interrupt: &Interrupt,
    ) -> Result<RunOutcome, AppError> {
        let StartPoint { mut subtitles, output_file, start_index } = start;
        let total = subtitles.len();

        let plan = BatchPlan::new(total, start_index, self.config.batch_size)
            .map_err(|e| AppError::Config(e.to_string()))?;
        let batches_total = total.div_ceil(plan.batch_size());

        if let Some(parent) = output_file.parent().filter(|p| !p.as_os_str().is_empty()) {
            FileManager::ensure_dir(parent).map_err(|e| AppError::Storage(format!("{:#}", e)))?;
        }

        let materializer = OutputMaterializer::new(self.config.output_mode, &output_file);
        if plan.batch_count() == 0 {
            // Nothing left to translate; still leave a complete output behind
            materializer.persist(&subtitles)?;
        }

        info!(
            "Translating to {} with {} ({}), {} batches of up to {}",
            self.config.target_language,
            self.translator.provider_name(),
            self.translator.model(),
            plan.batch_count(),
            plan.batch_size()
        );

        let progress_bar = self.progress_bar(total as u64, start_index as u64);
        let mut translated = 0;

        for batch in &plan {
            if interrupt.is_triggered() {
                progress_bar.abandon();
                return Ok(RunOutcome::Interrupted {
                    output_file,
                    processed_count: batch.start(),
                });
            }

            debug!(
                "Batch {}/{}: subtitles {}-{}",
                batch.number,
                batches_total,
                batch.start() + 1,
                batch.end()
            );

            let originals = subtitles.texts(batch.range.clone());
            let pending = translatable_texts(&originals);
            let result = if pending.is_empty() {
                Ok(Vec::new())
            } else {
                self.translator.translate_batch(&pending, interrupt).await
            };
            let lines = match result {
                Ok(lines) => lines,
                Err(TranslationError::Interrupted) => {
                    progress_bar.abandon();
                    return Ok(RunOutcome::Interrupted {
                        output_file,
                        processed_count: batch.start(),
                    });
                }
                Err(e) => {
                    progress_bar.abandon();
                    debug!("Batch {}/{} failed", batch.number, batches_total);
                    return Err(e.into());
                }
            };

            materializer.apply(&mut subtitles, batch.range.clone(), &originals, lines)?;
            tracker.save(batch.end(), &output_file)?;

            translated += batch.len();
            progress_bar.inc(batch.len() as u64);
        }

        progress_bar.finish_and_clear();
        tracker.delete()?;

        Ok(RunOutcome::Completed { output_file, translated })
    }

    /// Output path derived from the input file and the configuration
    fn default_output_path(&self, input_file: &Path) -> PathBuf {
        FileManager::generate_output_path(
            input_file,
            &self.config.target_language,
            self.config.output.as_deref(),
        )
    }

    fn progress_bar(&self, total: u64, position: u64) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }

        let progress_bar = ProgressBar::new(total);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} subtitles ({percent}%) {eta}")
            .or_else(|_| ProgressStyle::default_bar().template("{spinner} [{elapsed_precise}] [{bar:40}] {pos}/{len} ({percent}%)"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        progress_bar.set_style(style.progress_chars("█▓▒░"));
        progress_bar.set_position(position);
        progress_bar
    }

    /// Format a duration as "1h 2m 3s", "2m 3s" or "3s"
    fn format_duration(duration: std::time::Duration) -> String {
        let total_seconds = duration.as_secs();
        let hours = total_seconds / 3600;
        let minutes = (total_seconds % 3600) / 60;
        let seconds = total_seconds % 60;

        if hours > 0 {
            format!("{}h {}m {}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}s", seconds)
        }
    }
}
