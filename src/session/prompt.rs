/*!
 * Operator confirmation for resuming an unfinished run.
 */

use anyhow::{Context, Result};
use std::io::{BufRead, Write};

use super::models::Checkpoint;

/// Asks whether a found checkpoint should be resumed
pub trait ResumePrompt {
    /// `total` is the number of cues in the input file
    fn confirm_resume(&self, checkpoint: &Checkpoint, total: usize) -> Result<bool>;
}

/// Interactive prompt on stdin/stdout; an empty answer means yes
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalPrompt;

impl TerminalPrompt {
    /// Interpret an answer to "Continue last progress? (y/n) [y]"
    pub fn parse_answer(answer: &str) -> bool {
        matches!(answer.trim().to_lowercase().as_str(), "" | "y" | "yes")
    }
}

impl ResumePrompt for TerminalPrompt {
    fn confirm_resume(&self, _checkpoint: &Checkpoint, _total: usize) -> Result<bool> {
        let mut stdout = std::io::stdout();
        write!(stdout, "Continue last progress? (y/n) [y]: ")?;
        stdout.flush()?;

        let mut answer = String::new();
        let read = std::io::stdin()
            .lock()
            .read_line(&mut answer)
            .context("Failed to read answer from stdin")?;

        // Closed stdin counts as the default answer
        if read == 0 {
            return Ok(true);
        }

        Ok(Self::parse_answer(&answer))
    }
}

/// Fixed answer, used for `--resume yes|no` and in tests
#[derive(Debug, Clone, Copy)]
pub struct FixedPrompt(pub bool);

impl ResumePrompt for FixedPrompt {
    fn confirm_resume(&self, _checkpoint: &Checkpoint, _total: usize) -> Result<bool> {
        Ok(self.0)
    }
}
