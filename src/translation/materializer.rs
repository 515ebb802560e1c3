/*!
 * Writing translated batches back into the subtitle collection.
 *
 * After every batch the whole collection is serialized to the output file,
 * so an interrupted run leaves a complete SRT whose first cues are translated
 * and whose remaining cues are still the originals.
 */

use log::warn;
use std::ops::Range;
use std::path::{Path, PathBuf};

use crate::app_config::OutputMode;
use crate::errors::AppError;
use crate::subtitle_processor::SubtitleCollection;

/// Force the model's answer to exactly one line per cue
pub fn normalize_line_count(mut lines: Vec<String>, expected: usize) -> Vec<String> {
    if lines.len() != expected {
        warn!(
            "Line count mismatch (original {} vs translated {}), padding...",
            expected,
            lines.len()
        );
        lines.resize(expected, String::new());
    }
    lines
}

/// Cues with nothing to translate are left out of the request; the model
/// tends to drop blank lines, which would shift every following answer.
pub fn translatable_texts(originals: &[String]) -> Vec<String> {
    originals
        .iter()
        .filter(|text| !text.trim().is_empty())
        .cloned()
        .collect()
}

/// Cue text for one translated line. Blank parts are left out so a cue never
/// contains an empty line, which would end the cue in SRT.
pub fn compose_text(mode: OutputMode, translated: &str, original: &str) -> String {
    let translated = translated.trim();
    match mode {
        OutputMode::Mono => translated.to_string(),
        OutputMode::Bilingual => [translated, original.trim()]
            .into_iter()
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join("\n"),
    }
}

/// Merges translations into the collection and persists it
#[derive(Debug, Clone)]
pub struct OutputMaterializer {
    mode: OutputMode,
    output_file: PathBuf,
}

impl OutputMaterializer {
    pub fn new(mode: OutputMode, output_file: impl Into<PathBuf>) -> Self {
        Self {
            mode,
            output_file: output_file.into(),
        }
    }

    pub fn output_file(&self) -> &Path {
        &self.output_file
    }

    /// Replace the text of the cues in `range`. `originals` holds the flattened
    /// text of every cue in the range; `translated` answers only the non-empty
    /// ones (see [`translatable_texts`]). Empty cues stay empty.
    pub fn merge(
        &self,
        collection: &mut SubtitleCollection,
        range: Range<usize>,
        originals: &[String],
        translated: Vec<String>,
    ) {
        let expected = originals.iter().filter(|text| !text.trim().is_empty()).count();
        let mut translated = normalize_line_count(translated, expected).into_iter();
        let entries = &mut collection.entries[range];

        for (entry, original) in entries.iter_mut().zip(originals) {
            let translation = if original.trim().is_empty() {
                String::new()
            } else {
                translated.next().unwrap_or_default()
            };
            entry.text = compose_text(self.mode, &translation, original);
        }
    }

    /// Overwrite the output file with the whole collection
    pub fn persist(&self, collection: &SubtitleCollection) -> Result<(), AppError> {
        collection
            .write_to_srt(&self.output_file)
            .map_err(|e| AppError::Storage(format!("{:#}", e)))
    }

    /// Merge one batch and write the result
    pub fn apply(
        &self,
        collection: &mut SubtitleCollection,
        range: Range<usize>,
        originals: &[String],
        translated: Vec<String>,
    ) -> Result<(), AppError> {
        self.merge(collection, range, originals, translated);
        self.persist(collection)
    }
}
