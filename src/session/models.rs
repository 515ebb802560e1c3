/*!
 * Session-specific models.
 *
 * The persisted checkpoint, the states a run moves through and the value a
 * finished run reports back.
 */

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Persisted resume cursor of an unfinished run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Index of the first cue not yet translated in `output_file`
    pub processed_count: usize,
    /// Output file holding the translated prefix
    pub output_file: PathBuf,
}

impl Checkpoint {
    pub fn new(processed_count: usize, output_file: impl Into<PathBuf>) -> Self {
        Self {
            processed_count,
            output_file: output_file.into(),
        }
    }
}

impl fmt::Display for Checkpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} processed -> {}", self.processed_count, self.output_file.display())
    }
}

/// Lifecycle of a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunState {
    /// No checkpoint, translating from the first cue
    FreshStart,
    /// A checkpoint exists and the operator has not answered yet
    ResumePending(Checkpoint),
    /// Translating batches starting at `start_index`
    Running { start_index: usize },
    /// All cues translated, checkpoint removed
    Completed,
    /// Stopped by a fatal error or an interrupt, checkpoint kept
    Aborted,
}

impl RunState {
    /// Completed and Aborted never transition further
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Aborted)
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FreshStart => write!(f, "FRESH_START"),
            Self::ResumePending(_) => write!(f, "RESUME_PENDING"),
            Self::Running { start_index } => write!(f, "RUNNING from {}", start_index),
            Self::Completed => write!(f, "COMPLETED"),
            Self::Aborted => write!(f, "ABORTED"),
        }
    }
}

/// How a run ended when it did not fail
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every cue is translated and written to `output_file`
    Completed {
        output_file: PathBuf,
        /// Cues translated during this run (excludes resumed ones)
        translated: usize,
    },
    /// The user interrupted; the checkpoint stays for the next run
    Interrupted {
        output_file: PathBuf,
        processed_count: usize,
    },
}

impl RunOutcome {
    pub fn output_file(&self) -> &PathBuf {
        match self {
            Self::Completed { output_file, .. } | Self::Interrupted { output_file, .. } => output_file,
        }
    }
}
