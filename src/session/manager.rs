/*!
 * Checkpoint persistence.
 *
 * The checkpoint of `movie.srt` lives next to it in `movie.srt.progress.json`.
 * It is written only after the output file of the same batch is on disk, so
 * on resume the output is never behind the checkpoint.
 */

use log::{debug, warn};
use std::path::{Path, PathBuf};

use crate::errors::AppError;
use crate::file_utils::FileManager;

use super::models::Checkpoint;

/// Suffix appended to the input file name
pub const PROGRESS_SUFFIX: &str = ".progress.json";

/// Loads, saves and removes the checkpoint of one input file
#[derive(Debug, Clone)]
pub struct ProgressTracker {
    progress_file: PathBuf,
}

impl ProgressTracker {
    /// Tracker for the checkpoint belonging to `input_file`
    pub fn for_input(input_file: &Path) -> Self {
        let mut file_name = input_file.file_name().unwrap_or_default().to_os_string();
        file_name.push(PROGRESS_SUFFIX);

        Self {
            progress_file: input_file.with_file_name(file_name),
        }
    }

    /// Location of the checkpoint file
    pub fn path(&self) -> &Path {
        &self.progress_file
    }

    /// Read the checkpoint. Missing or unreadable checkpoints both mean "no progress".
    pub fn load(&self) -> Option<Checkpoint> {
        if !self.progress_file.exists() {
            return None;
        }

        let content = match FileManager::read_to_string(&self.progress_file) {
            Ok(content) => content,
            Err(e) => {
                warn!("Failed to read progress file, will restart: {:#}", e);
                return None;
            }
        };

        match serde_json::from_str::<Checkpoint>(&content) {
            Ok(checkpoint) => {
                debug!("Loaded checkpoint from {:?}: {}", self.progress_file, checkpoint);
                Some(checkpoint)
            }
            Err(e) => {
                warn!("Failed to read progress file, will restart: {}", e);
                None
            }
        }
    }

    /// Overwrite the checkpoint
    pub fn save(&self, processed_count: usize, output_file: &Path) -> Result<(), AppError> {
        let checkpoint = Checkpoint::new(processed_count, output_file);
        let json = serde_json::to_string_pretty(&checkpoint).map_err(AppError::storage)?;

        FileManager::write_atomically(&self.progress_file, json.as_bytes())
            .map_err(|e| AppError::Storage(format!("{:#}", e)))?;

        debug!("Checkpoint saved: {}", checkpoint);
        Ok(())
    }

    /// Remove the checkpoint; nothing to do when it is already gone
    pub fn delete(&self) -> Result<(), AppError> {
        FileManager::remove_if_exists(&self.progress_file)
            .map_err(|e| AppError::Storage(format!("{:#}", e)))
    }
}
