use std::fmt;
use std::ops::Range;
use regex::Regex;
use once_cell::sync::Lazy;
use anyhow::{Result, Context, anyhow};
use std::path::{Path, PathBuf};
use log::{warn, debug};
use crate::file_utils::FileManager;

// @module: Subtitle processing and manipulation

// @const: SRT timestamp regex, tolerant of '.' as millisecond separator and trailing position hints
static TIMESTAMP_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d+):(\d{2}):(\d{2})[,.](\d{3})\s*-->\s*(\d+):(\d{2}):(\d{2})[,.](\d{3})")
        .expect("timestamp regex is valid")
});

// @struct: Single subtitle entry
#[derive(Debug, Clone, PartialEq)]
pub struct SubtitleEntry {
    // @field: Sequence number as written in the file
    pub seq_num: usize,

    // @field: Start time in ms
    pub start_time_ms: u64,

    // @field: End time in ms
    pub end_time_ms: u64,

    // @field: Subtitle text, lines separated by '\n'
    pub text: String,
}

impl SubtitleEntry {
    /// Creates a new subtitle entry
    pub fn new(seq_num: usize, start_time_ms: u64, end_time_ms: u64, text: String) -> Self {
        SubtitleEntry {
            seq_num,
            start_time_ms,
            end_time_ms,
            text,
        }
    }

    /// Parse an SRT timestamp (HH:MM:SS,mmm) to milliseconds
    pub fn parse_timestamp(timestamp: &str) -> Result<u64> {
        let parts: Vec<&str> = timestamp.trim().split(&[':', ',', '.'][..]).collect();

        if parts.len() != 4 {
            return Err(anyhow!("Invalid timestamp format: {}", timestamp));
        }

        let hours: u64 = parts[0].parse().context("Failed to parse hours")?;
        let minutes: u64 = parts[1].parse().context("Failed to parse minutes")?;
        let seconds: u64 = parts[2].parse().context("Failed to parse seconds")?;
        let millis: u64 = parts[3].parse().context("Failed to parse milliseconds")?;

        // Validate time components
        if minutes >= 60 || seconds >= 60 || millis >= 1000 {
            return Err(anyhow!("Invalid time components in timestamp: {}", timestamp));
        }

        Ok(hours * 3_600_000 + minutes * 60_000 + seconds * 1_000 + millis)
    }

    /// Convert start time to formatted SRT timestamp
    pub fn format_start_time(&self) -> String {
        Self::format_timestamp(self.start_time_ms)
    }

    /// Convert end time to formatted SRT timestamp
    pub fn format_end_time(&self) -> String {
        Self::format_timestamp(self.end_time_ms)
    }

    /// Format a timestamp in milliseconds to SRT format (HH:MM:SS,mmm)
    pub fn format_timestamp(ms: u64) -> String {
        let hours = ms / 3_600_000;
        let minutes = (ms % 3_600_000) / 60_000;
        let seconds = (ms % 60_000) / 1_000;
        let millis = ms % 1_000;

        format!("{:02}:{:02}:{:02},{:03}", hours, minutes, seconds, millis)
    }

    /// The text collapsed onto one line, the form sent to the model
    pub fn flattened_text(&self) -> String {
        self.text.replace('\n', " ")
    }
}

impl fmt::Display for SubtitleEntry {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "{}", self.seq_num)?;
        writeln!(f, "{} --> {}", self.format_start_time(), self.format_end_time())?;
        // An empty cue is written without a text line so the file stays parseable
        if !self.text.is_empty() {
            writeln!(f, "{}", self.text)?;
        }
        writeln!(f)
    }
}

/// Collection of subtitle entries with metadata
#[derive(Debug, Clone)]
pub struct SubtitleCollection {
    /// File the entries were loaded from
    pub source_file: PathBuf,

    /// List of subtitle entries, in file order
    pub entries: Vec<SubtitleEntry>,
}

impl SubtitleCollection {
    /// Create a new, empty subtitle collection
    pub fn new(source_file: PathBuf) -> Self {
        SubtitleCollection {
            source_file,
            entries: Vec::new(),
        }
    }

    /// Load and parse an SRT file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = FileManager::read_to_string(path)?;
        let entries = Self::parse_srt_string(&content)
            .with_context(|| format!("Failed to parse SRT file: {:?}", path))?;

        debug!("Parsed {} subtitle entries from {:?}", entries.len(), path);

        Ok(SubtitleCollection {
            source_file: path.to_path_buf(),
            entries,
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Flattened texts of the entries in `range`
    pub fn texts(&self, range: Range<usize>) -> Vec<String> {
        self.entries[range].iter().map(SubtitleEntry::flattened_text).collect()
    }

    /// Render the whole collection as SRT text
    pub fn to_srt_string(&self) -> String {
        self.entries.iter().map(|entry| entry.to_string()).collect()
    }

    /// Write subtitles to an SRT file (UTF-8), replacing it atomically
    pub fn write_to_srt<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        FileManager::write_atomically(path, self.to_srt_string().as_bytes())
            .with_context(|| format!("Failed to write subtitle file: {}", path.display()))
    }

    /// Parse SRT format string into subtitle entries
    ///
    /// Cues without text are kept so positions line up between the input file
    /// and any output written from it.
    pub fn parse_srt_string(content: &str) -> Result<Vec<SubtitleEntry>> {
        #[derive(PartialEq)]
        enum State {
            Sequence,
            Timestamp,
            Text,
        }

        let mut entries = Vec::new();
        let mut state = State::Sequence;

        let mut current_seq_num = 0usize;
        let mut current_start_ms = 0u64;
        let mut current_end_ms = 0u64;
        let mut current_text = String::new();

        for (line_idx, line) in content.lines().enumerate() {
            let line_number = line_idx + 1;
            let trimmed = line.trim();

            match state {
                State::Sequence => {
                    if trimmed.is_empty() {
                        continue;
                    }

                    if let Ok(num) = trimmed.parse::<usize>() {
                        current_seq_num = num;
                        state = State::Timestamp;
                    } else if let Some((start_ms, end_ms)) = Self::parse_timing_line(trimmed, line_number)? {
                        // Missing sequence number, number it ourselves
                        warn!("Missing sequence number before line {}", line_number);
                        current_seq_num = entries.len() + 1;
                        current_start_ms = start_ms;
                        current_end_ms = end_ms;
                        state = State::Text;
                    } else {
                        warn!("Unexpected text at line {} before sequence number: {}", line_number, trimmed);
                    }
                }
                State::Timestamp => {
                    match Self::parse_timing_line(trimmed, line_number)? {
                        Some((start_ms, end_ms)) => {
                            current_start_ms = start_ms;
                            current_end_ms = end_ms;
                            state = State::Text;
                        }
                        None => {
                            return Err(anyhow!(
                                "Expected timestamp after sequence number {} at line {}, found: {}",
                                current_seq_num, line_number, trimmed
                            ));
                        }
                    }
                }
                State::Text => {
                    if trimmed.is_empty() {
                        entries.push(SubtitleEntry::new(
                            current_seq_num,
                            current_start_ms,
                            current_end_ms,
                            std::mem::take(&mut current_text),
                        ));
                        state = State::Sequence;
                    } else {
                        if !current_text.is_empty() {
                            current_text.push('\n');
                        }
                        current_text.push_str(trimmed);
                    }
                }
            }
        }

        match state {
            State::Text => entries.push(SubtitleEntry::new(
                current_seq_num,
                current_start_ms,
                current_end_ms,
                current_text,
            )),
            State::Timestamp => {
                return Err(anyhow!("File ends after sequence number {} without a timestamp", current_seq_num));
            }
            State::Sequence => {}
        }

        if entries.is_empty() && !content.trim().is_empty() {
            return Err(anyhow!("No subtitle entries found"));
        }

        Ok(entries)
    }

    /// Parse a `start --> end` line; `Ok(None)` when the line is not a timing line
    fn parse_timing_line(line: &str, line_number: usize) -> Result<Option<(u64, u64)>> {
        let Some(caps) = TIMESTAMP_REGEX.captures(line) else {
            return Ok(None);
        };

        let start = Self::parse_timestamp_to_ms(&caps, 1)
            .with_context(|| format!("Invalid start time at line {}", line_number))?;
        let end = Self::parse_timestamp_to_ms(&caps, 5)
            .with_context(|| format!("Invalid end time at line {}", line_number))?;

        Ok(Some((start, end)))
    }

    fn parse_timestamp_to_ms(caps: &regex::Captures, start_idx: usize) -> Result<u64> {
        let part = |offset: usize| -> Result<u64> {
            caps.get(start_idx + offset)
                .ok_or_else(|| anyhow!("Missing timestamp component"))?
                .as_str()
                .parse::<u64>()
                .context("Timestamp component is not a number")
        };

        let (hours, minutes, seconds, millis) = (part(0)?, part(1)?, part(2)?, part(3)?);
        if minutes >= 60 || seconds >= 60 {
            return Err(anyhow!("Invalid time components {:02}:{:02}", minutes, seconds));
        }

        Ok(hours * 3_600_000 + minutes * 60_000 + seconds * 1_000 + millis)
    }
}

impl fmt::Display for SubtitleCollection {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} ({} entries)", self.source_file.display(), self.entries.len())
    }
}
