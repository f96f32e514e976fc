//! In-memory zip archive assembly for batch results

use crate::error::{ProcessingError, Result};
use std::collections::HashSet;
use std::io::{Cursor, Write};
use tracing::debug;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// `chrono` format used for archive entry prefixes and download names
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Longest sanitized filename kept, in characters
const MAX_FILENAME_CHARS: usize = 100;

/// Fallback for names that sanitize to nothing
const FALLBACK_FILENAME: &str = "image";

/// Builds a zip archive in memory, one entry per processed image
///
/// Entries are named `processed_<timestamp>_<sanitized filename>`. A name that
/// is already taken in this archive gets `_2`, `_3`, ... before its extension.
pub struct ArchiveBuilder {
    writer: ZipWriter<Cursor<Vec<u8>>>,
    timestamp: String,
    used_names: HashSet<String>,
}

impl std::fmt::Debug for ArchiveBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArchiveBuilder")
            .field("timestamp", &self.timestamp)
            .field("entries", &self.used_names.len())
            .finish_non_exhaustive()
    }
}

impl ArchiveBuilder {
    /// Start an empty archive whose entries share `timestamp`
    #[must_use]
    pub fn new(timestamp: impl Into<String>) -> Self {
        Self {
            writer: ZipWriter::new(Cursor::new(Vec::new())),
            timestamp: timestamp.into(),
            used_names: HashSet::new(),
        }
    }

    /// Number of entries written so far
    #[must_use]
    pub fn len(&self) -> usize {
        self.used_names.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.used_names.is_empty()
    }

    /// Add `bytes` under a name derived from `original_filename`
    ///
    /// Returns the entry name actually used.
    ///
    /// # Errors
    /// - Zip writer failure
    pub fn add(&mut self, original_filename: &str, bytes: &[u8]) -> Result<String> {
        let base = format!(
            "processed_{}_{}",
            self.timestamp,
            sanitize_filename(original_filename)
        );
        let name = self.unique_name(&base);

        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
        self.writer
            .start_file(name.as_str(), options)
            .map_err(|e| ProcessingError::archive(format!("Failed to start entry {name}: {e}")))?;
        self.writer
            .write_all(bytes)
            .map_err(|e| ProcessingError::archive(format!("Failed to write entry {name}: {e}")))?;

        debug!(entry = %name, size = bytes.len(), "Added archive entry");
        self.used_names.insert(name.clone());
        Ok(name)
    }

    /// Finalize the archive and return its bytes
    ///
    /// # Errors
    /// - Zip writer failure while writing the central directory
    pub fn finish(self) -> Result<Vec<u8>> {
        let cursor = self
            .writer
            .finish()
            .map_err(|e| ProcessingError::archive(format!("Failed to finalize archive: {e}")))?;
        Ok(cursor.into_inner())
    }

    fn unique_name(&self, base: &str) -> String {
        if !self.used_names.contains(base) {
            return base.to_string();
        }

        let (stem, extension) = match base.rfind('.') {
            Some(index) if index > 0 => base.split_at(index),
            _ => (base, ""),
        };

        (2..)
            .map(|index| format!("{stem}_{index}{extension}"))
            .find(|candidate| !self.used_names.contains(candidate))
            .unwrap_or_else(|| base.to_string())
    }
}

/// Reduce an uploaded filename to a safe archive entry name
///
/// Keeps only the final path component, drops control characters and leading
/// dots, and truncates to 100 characters. Spaces, punctuation and non-ASCII
/// characters pass through.
#[must_use]
pub fn sanitize_filename(name: &str) -> String {
    let last_component = name
        .rsplit(|c| c == '/' || c == '\\')
        .next()
        .unwrap_or(name);

    let sanitized: String = last_component
        .chars()
        .filter(|c| !c.is_control())
        .collect::<String>()
        .trim_start_matches('.')
        .chars()
        .take(MAX_FILENAME_CHARS)
        .collect();

    if sanitized.trim().is_empty() {
        FALLBACK_FILENAME.into()
    } else {
        sanitized
    }
}
