//! Product image processor CLI
//!
//! `serve` runs the HTTP upload service; `process` runs the same batch
//! pipeline over local files and writes the zip archive to disk.

use super::config::CliConfigBuilder;
use crate::{
    batch::{BatchProcessor, FileStatus, Upload},
    config::ProcessorConfig,
    inference::build_remover,
    pipeline::ImagePipeline,
    server::{self, AppState},
    tracing_config::{spans, TracingConfig, TracingFormat},
};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn, Instrument};
use tracing_appender::non_blocking::WorkerGuard;

/// Product image processing service and batch tool
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(name = "product-image-processor")]
pub struct Cli {
    /// Configuration override file (JSON, or TOML with a .toml extension)
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Append-only log file
    #[arg(long, global = true, value_name = "FILE", default_value = crate::tracing_config::DEFAULT_LOG_FILE)]
    pub log_file: PathBuf,

    /// Log to the console only
    #[arg(long, global = true)]
    pub no_log_file: bool,

    /// Plain console output without colors
    #[arg(long, global = true)]
    pub plain: bool,

    /// Enable verbose logging (-v: DEBUG, -vv: TRACE)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve the upload form and processing endpoint over HTTP
    Serve {
        /// Listen address [default: from configuration, 0.0.0.0]
        #[arg(long)]
        host: Option<String>,

        /// Listen port [default: from configuration, 5000]
        #[arg(short, long)]
        port: Option<u16>,

        /// ONNX segmentation model used for background removal
        #[arg(short, long, value_name = "FILE")]
        model: Option<PathBuf>,
    },

    /// Process local images into a zip archive
    Process {
        /// Input images or directories (directories are scanned one level deep)
        #[arg(value_name = "INPUT", required = true)]
        inputs: Vec<PathBuf>,

        /// Output archive path
        #[arg(short, long, value_name = "OUTPUT", default_value = "processed_images.zip")]
        output: PathBuf,

        /// Skip the resize stage
        #[arg(long)]
        no_resize: bool,

        /// Run background removal (requires a segmentation model)
        #[arg(long)]
        remove_background: bool,

        /// Skip the enhance stage
        #[arg(long)]
        no_enhance: bool,

        /// ONNX segmentation model used for background removal
        #[arg(short, long, value_name = "FILE")]
        model: Option<PathBuf>,
    },
}

impl Command {
    fn name(&self) -> &'static str {
        match self {
            Self::Serve { .. } => "serve",
            Self::Process { .. } => "process",
        }
    }
}

pub async fn main() -> Result<()> {
    let cli = Cli::parse();

    let _guard = init_tracing(&cli).context("Failed to initialize tracing")?;
    let session_id = uuid::Uuid::new_v4().to_string();
    let span = spans::session(&session_id, cli.command.name());

    async move {
        let config = CliConfigBuilder::from_cli(&cli).context("Failed to build configuration")?;
        debug!(?config, "Effective configuration");

        match &cli.command {
            Command::Serve { .. } => run_server(config).await,
            Command::Process { inputs, output, .. } => {
                let overrides = CliConfigBuilder::process_overrides(&cli.command);
                run_batch(config.with_overrides(overrides), inputs, output).await
            },
        }
    }
    .instrument(span)
    .await
}

fn init_tracing(cli: &Cli) -> Result<Option<WorkerGuard>> {
    let format = if cli.plain {
        TracingFormat::Compact
    } else {
        TracingFormat::Console
    };
    let log_file = (!cli.no_log_file).then(|| cli.log_file.clone());

    TracingConfig::new()
        .with_verbosity(cli.verbose)
        .with_format(format)
        .with_log_file(log_file)
        .init()
        .context("Failed to initialize tracing subscriber")
}

async fn run_server(config: ProcessorConfig) -> Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .with_context(|| {
            format!(
                "Invalid listen address {}:{}",
                config.server.host, config.server.port
            )
        })?;

    let state = AppState::new(config).context("Failed to initialize image pipeline")?;
    server::serve(state, addr)
        .await
        .context("Image processing server stopped")
}

async fn run_batch(
    config: ProcessorConfig,
    inputs: &[PathBuf],
    output: &Path,
) -> Result<()> {
    let start = Instant::now();
    let files = CliConfigBuilder::collect_input_files(inputs)?;
    if files.is_empty() {
        anyhow::bail!("No image files found in the given inputs");
    }

    let mut uploads = Vec::with_capacity(files.len());
    for path in &files {
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        uploads.push(Upload::new(filename, bytes));
    }

    let remover =
        build_remover(&config.segmentation).context("Failed to initialize background remover")?;
    let batch = BatchProcessor::new(ImagePipeline::new(remover));

    let pb = ProgressBar::new(uploads.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .context("Invalid progress bar template")?
            .progress_chars("#>-"),
    );

    let file_count = uploads.len();
    let progress = pb.clone();
    let span = spans::batch_processing(file_count);
    let outcome = tokio::task::spawn_blocking(move || {
        let _entered = span.enter();
        let timestamp = chrono::Local::now()
            .format(crate::services::TIMESTAMP_FORMAT)
            .to_string();
        batch.run_with_progress(uploads, &config, &timestamp, |file| {
            progress.set_message(file.filename.clone());
            progress.inc(1);
        })
    })
    .await
    .context("Batch task panicked")??;

    let processed = outcome.report.processed_count();
    let failed = outcome.report.failed_count();
    pb.finish_with_message(format!("Completed! Processed: {processed}, Failed: {failed}"));

    for file in &outcome.report.files {
        if let FileStatus::Failed { reason } = &file.status {
            warn!(filename = %file.filename, reason = %reason, "Image left out of archive");
        }
    }

    tokio::fs::write(output, &outcome.archive)
        .await
        .with_context(|| format!("Failed to write {}", output.display()))?;

    info!(
        output = %output.display(),
        processed,
        failed,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Archive written"
    );
    Ok(())
}
