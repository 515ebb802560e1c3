/*!
 * Session management for resumable translation runs.
 *
 * This module provides:
 * - Checkpoint persistence next to the input file
 * - Run states and outcomes
 * - The operator prompt deciding whether to resume
 * - Cooperative interruption
 */

pub mod interrupt;
pub mod manager;
pub mod models;
pub mod prompt;

// Re-export main types
pub use interrupt::Interrupt;
pub use manager::ProgressTracker;
pub use models::{Checkpoint, RunOutcome, RunState};
pub use prompt::{FixedPrompt, ResumePrompt, TerminalPrompt};
