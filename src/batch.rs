//! Batch processing of uploaded images into a zip archive
//!
//! A batch never aborts on a bad file: each upload is decoded, processed and
//! encoded on its own, failures are logged and reported, and the archive is
//! always finished.

use crate::{
    config::ProcessorConfig,
    error::{ProcessingError, Result},
    pipeline::ImagePipeline,
    services::{ArchiveBuilder, OutputEncoder, TIMESTAMP_FORMAT},
};
use std::time::Instant;
use tracing::{debug, error, info, instrument};

/// One uploaded file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upload {
    /// Client-supplied filename; empty names are skipped
    pub filename: String,
    pub bytes: Vec<u8>,
}

impl Upload {
    #[must_use]
    pub fn new(filename: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            filename: filename.into(),
            bytes: bytes.into(),
        }
    }
}

/// Outcome for a single upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileStatus {
    /// Written to the archive under `entry_name`
    Processed { entry_name: String },
    /// Left out of the archive
    Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileReport {
    pub filename: String,
    pub status: FileStatus,
}

/// Per-file results of a batch, in upload order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub files: Vec<FileReport>,
}

impl BatchReport {
    #[must_use]
    pub fn processed_count(&self) -> usize {
        self.files
            .iter()
            .filter(|file| matches!(file.status, FileStatus::Processed { .. }))
            .count()
    }

    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.files
            .iter()
            .filter(|file| matches!(file.status, FileStatus::Failed { .. }))
            .count()
    }
}

/// Finished archive plus the per-file report
#[derive(Debug, Clone)]
pub struct BatchOutcome {
    pub archive: Vec<u8>,
    pub report: BatchReport,
}

/// Fans uploads through the pipeline and packages the results
#[derive(Debug, Clone)]
pub struct BatchProcessor {
    pipeline: ImagePipeline,
}

impl BatchProcessor {
    #[must_use]
    pub fn new(pipeline: ImagePipeline) -> Self {
        Self { pipeline }
    }

    #[must_use]
    pub fn pipeline(&self) -> &ImagePipeline {
        &self.pipeline
    }

    /// Process `uploads` with `config`, stamping entries with the current local time
    ///
    /// # Errors
    /// - Archive could not be finalized; per-file failures are only reported
    pub fn run(&self, uploads: Vec<Upload>, config: &ProcessorConfig) -> Result<BatchOutcome> {
        let timestamp = chrono::Local::now().format(TIMESTAMP_FORMAT).to_string();
        self.run_with_progress(uploads, config, &timestamp, |_| {})
    }

    /// Same as [`Self::run`] with an explicit entry timestamp
    ///
    /// # Errors
    /// - Archive could not be finalized
    pub fn run_with_timestamp(
        &self,
        uploads: Vec<Upload>,
        config: &ProcessorConfig,
        timestamp: &str,
    ) -> Result<BatchOutcome> {
        self.run_with_progress(uploads, config, timestamp, |_| {})
    }

    /// Process the batch, calling `on_file` after each reported upload
    ///
    /// # Errors
    /// - Archive could not be finalized
    #[instrument(skip(self, uploads, config, on_file), fields(uploads = uploads.len()))]
    pub fn run_with_progress<F>(
        &self,
        uploads: Vec<Upload>,
        config: &ProcessorConfig,
        timestamp: &str,
        mut on_file: F,
    ) -> Result<BatchOutcome>
    where
        F: FnMut(&FileReport),
    {
        let start = Instant::now();
        let mut archive = ArchiveBuilder::new(timestamp);
        let mut report = BatchReport::default();

        for upload in uploads {
            if upload.filename.is_empty() {
                debug!("Skipping upload without a filename");
                continue;
            }

            let status = match self.process_one(&upload, config) {
                Ok(bytes) => match archive.add(&upload.filename, &bytes) {
                    Ok(entry_name) => FileStatus::Processed { entry_name },
                    Err(e) => {
                        error!(filename = %upload.filename, category = e.category(), error = %e, "Failed to archive image");
                        FileStatus::Failed {
                            reason: e.to_string(),
                        }
                    },
                },
                Err(e) => {
                    error!(filename = %upload.filename, category = e.category(), error = %e, "Error processing image");
                    FileStatus::Failed {
                        reason: e.to_string(),
                    }
                },
            };

            let file_report = FileReport {
                filename: upload.filename,
                status,
            };
            on_file(&file_report);
            report.files.push(file_report);
        }

        let archive = archive.finish()?;
        info!(
            processed = report.processed_count(),
            failed = report.failed_count(),
            archive_bytes = archive.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Batch complete"
        );

        Ok(BatchOutcome { archive, report })
    }

    fn process_one(&self, upload: &Upload, config: &ProcessorConfig) -> Result<Vec<u8>> {
        let image = image::load_from_memory(&upload.bytes).map_err(|e| {
            ProcessingError::decode(format!("Failed to decode {}: {}", upload.filename, e))
        })?;
        let processed = self.pipeline.process(image, config)?;
        OutputEncoder::encode(&processed, config.output_format, config.quality)
    }
}
