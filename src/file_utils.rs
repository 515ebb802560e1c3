use anyhow::{Result, Context};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

// @module: File and directory utilities

// @struct: File operations utility
pub struct FileManager;

impl FileManager {
    // @checks: File existence
    pub fn file_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().exists() && path.as_ref().is_file()
    }

    // @checks: Directory existence
    pub fn dir_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().exists() && path.as_ref().is_dir()
    }

    // @creates: Directory and parents if needed
    pub fn ensure_dir<P: AsRef<Path>>(path: P) -> Result<()> {
        let path = path.as_ref();
        if !path.as_os_str().is_empty() && !path.exists() {
            fs::create_dir_all(path)
                .with_context(|| format!("Failed to create directory: {:?}", path))?;
        }
        Ok(())
    }

    /// Keep only alphanumeric characters of a language name so it is safe in a file name
    pub fn sanitize_language(language: &str) -> String {
        language.chars().filter(|c| c.is_alphanumeric()).collect()
    }

    // @generates: Output path for translated subtitle
    // @rules: existing directory -> <dir>/<stem>.<lang>.srt, other path -> used as is,
    //         none -> next to the input file
    pub fn generate_output_path<P: AsRef<Path>>(
        input_file: P,
        target_language: &str,
        output_arg: Option<&Path>,
    ) -> PathBuf {
        let input_file = input_file.as_ref();

        let stem = input_file.file_stem().unwrap_or_default();
        let default_name = format!(
            "{}.{}.srt",
            stem.to_string_lossy(),
            Self::sanitize_language(target_language)
        );

        if let Some(output) = output_arg {
            if Self::dir_exists(output) {
                return output.join(default_name);
            }
            return output.to_path_buf();
        }

        input_file
            .parent()
            .unwrap_or_else(|| Path::new(""))
            .join(default_name)
    }

    /// Read a file to a string, dropping a leading UTF-8 byte order mark
    pub fn read_to_string<P: AsRef<Path>>(path: P) -> Result<String> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read file: {:?}", path.as_ref()))?;

        Ok(match content.strip_prefix('\u{feff}') {
            Some(stripped) => stripped.to_string(),
            None => content,
        })
    }

    /// Replace a file's content in one step.
    ///
    /// The data goes to a temporary file in the destination directory, is
    /// flushed to disk and then renamed over the target, so readers see either
    /// the previous content or the new one, never a torn write.
    pub fn write_atomically<P: AsRef<Path>>(path: P, content: &[u8]) -> Result<()> {
        let path = path.as_ref();
        let parent = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        Self::ensure_dir(&parent)?;

        let mut temp = NamedTempFile::new_in(&parent)
            .with_context(|| format!("Failed to create temporary file in {:?}", parent))?;
        temp.write_all(content)
            .with_context(|| format!("Failed to write temporary file for {:?}", path))?;
        temp.as_file()
            .sync_all()
            .with_context(|| format!("Failed to flush temporary file for {:?}", path))?;
        temp.persist(path)
            .map_err(|e| e.error)
            .with_context(|| format!("Failed to replace file: {:?}", path))?;

        Ok(())
    }

    /// Remove a file, treating an already missing file as success
    pub fn remove_if_exists<P: AsRef<Path>>(path: P) -> Result<()> {
        let path = path.as_ref();
        match fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("Failed to remove file: {:?}", path)),
        }
    }
}
