//! Tracing configuration for structured logging
//!
//! The binary configures subscribers here; the library itself only emits
//! events. Output goes to the console and, unless disabled, to an
//! append-only plain-text log file.

use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

/// Default log file name, created in the working directory
pub const DEFAULT_LOG_FILE: &str = "image_processor.log";

/// Console output style
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TracingFormat {
    /// Colored console output (default for interactive use)
    Console,
    /// Plain console output for CI environments and log collectors
    Compact,
}

/// Tracing configuration builder
#[derive(Debug)]
pub struct TracingConfig {
    /// Verbosity level (maps to log levels)
    pub verbosity: u8,
    pub format: TracingFormat,
    /// Append-only log file; `None` logs to the console only
    pub log_file: Option<PathBuf>,
    /// Environment filter string (overrides verbosity if set)
    pub env_filter: Option<String>,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            verbosity: 0,
            format: TracingFormat::Console,
            log_file: Some(PathBuf::from(DEFAULT_LOG_FILE)),
            env_filter: None,
        }
    }
}

impl TracingConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set verbosity level (0-2+)
    #[must_use]
    pub fn with_verbosity(mut self, verbosity: u8) -> Self {
        self.verbosity = verbosity;
        self
    }

    #[must_use]
    pub fn with_format(mut self, format: TracingFormat) -> Self {
        self.format = format;
        self
    }

    /// Set or clear the log file
    #[must_use]
    pub fn with_log_file(mut self, log_file: Option<PathBuf>) -> Self {
        self.log_file = log_file;
        self
    }

    /// Set custom environment filter
    #[must_use]
    pub fn with_env_filter<S: Into<String>>(mut self, filter: S) -> Self {
        self.env_filter = Some(filter.into());
        self
    }

    /// Convert verbosity level to tracing filter string
    #[must_use]
    pub fn verbosity_to_filter(&self) -> &'static str {
        match self.verbosity {
            0 => "info",  // Default: request and batch summaries
            1 => "debug", // -v: per-stage and per-entry detail
            _ => "trace", // -vv+: everything, including dependencies
        }
    }

    /// Install the global subscriber
    ///
    /// The returned guard flushes the log file writer when dropped; keep it
    /// alive for the lifetime of the program.
    ///
    /// # Errors
    /// - Invalid filter directive
    /// - A global subscriber is already installed
    pub fn init(self) -> anyhow::Result<Option<WorkerGuard>> {
        let filter = match &self.env_filter {
            Some(env_filter) => EnvFilter::try_new(env_filter)?,
            None => EnvFilter::try_new(self.verbosity_to_filter())?,
        };

        let console_layer = fmt::layer()
            .with_ansi(self.format == TracingFormat::Console)
            .with_target(false)
            .compact();

        let (file_layer, guard) = match &self.log_file {
            Some(path) => {
                let (directory, file_name) = split_log_path(path);
                let file_appender = tracing_appender::rolling::never(directory, file_name);
                let (file_writer, guard) = tracing_appender::non_blocking(file_appender);
                let layer = fmt::layer()
                    .with_ansi(false)
                    .with_target(true)
                    .with_writer(file_writer);
                (Some(layer), Some(guard))
            },
            None => (None, None),
        };

        Registry::default()
            .with(filter)
            .with(console_layer)
            .with(file_layer)
            .try_init()?;

        if let Some(path) = &self.log_file {
            tracing::debug!(log_file = %path.display(), "File logging enabled");
        }

        Ok(guard)
    }
}

/// Split a log path into the directory and file name `tracing-appender` expects
fn split_log_path(path: &Path) -> (PathBuf, PathBuf) {
    let directory = path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
    let file_name = path
        .file_name()
        .map_or_else(|| PathBuf::from(DEFAULT_LOG_FILE), PathBuf::from);
    (directory, file_name)
}

/// Span creation helpers for common operations
pub mod spans {
    use tracing::{Level, Span};

    /// Span for the entire CLI invocation
    pub fn session(session_id: &str, command: &str) -> Span {
        tracing::span!(
            Level::INFO,
            "session",
            session_id = %session_id,
            command = %command
        )
    }

    /// Span for an offline batch run
    pub fn batch_processing(file_count: usize) -> Span {
        tracing::span!(Level::INFO, "batch_processing", file_count = %file_count)
    }
}
