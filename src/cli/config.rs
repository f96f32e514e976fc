//! Configuration conversion utilities for CLI arguments

use crate::cli::main_impl::{Cli, Command};
use crate::config::{OperationOverrides, ProcessorConfig};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Extensions picked up when scanning input directories
const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "tiff", "tif", "bmp"];

/// Convert CLI arguments to the processor configuration
pub(crate) struct CliConfigBuilder;

impl CliConfigBuilder {
    /// Load the configuration file and apply command-line overrides on top
    pub(crate) fn from_cli(cli: &Cli) -> Result<ProcessorConfig> {
        let mut config =
            ProcessorConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;

        match &cli.command {
            Command::Serve { host, port, model } => {
                if let Some(host) = host {
                    config.server.host.clone_from(host);
                }
                if let Some(port) = port {
                    config.server.port = *port;
                }
                Self::apply_model(&mut config, model.as_deref());
            },
            Command::Process { model, .. } => Self::apply_model(&mut config, model.as_deref()),
        }

        config.validate().context("Invalid configuration")?;
        Ok(config)
    }

    /// Operation flags for an offline `process` run
    ///
    /// Resize and enhance default on, background removal defaults off.
    pub(crate) fn process_overrides(command: &Command) -> OperationOverrides {
        match command {
            Command::Process {
                no_resize,
                remove_background,
                no_enhance,
                ..
            } => OperationOverrides {
                resize: !no_resize,
                remove_background: *remove_background,
                enhance: !no_enhance,
            },
            Command::Serve { .. } => OperationOverrides::default(),
        }
    }

    /// Expand inputs into a sorted list of image files
    ///
    /// Files are taken as given; directories contribute their direct children
    /// with a known image extension.
    pub(crate) fn collect_input_files(inputs: &[PathBuf]) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();

        for input in inputs {
            if input.is_dir() {
                let mut found: Vec<PathBuf> = std::fs::read_dir(input)
                    .with_context(|| format!("Failed to read directory {}", input.display()))?
                    .filter_map(|entry| entry.ok().map(|entry| entry.path()))
                    .filter(|path| path.is_file() && has_image_extension(path))
                    .collect();
                found.sort();
                debug!(directory = %input.display(), files = found.len(), "Scanned input directory");
                files.extend(found);
            } else if input.is_file() {
                files.push(input.clone());
            } else {
                anyhow::bail!("Input not found: {}", input.display());
            }
        }

        Ok(files)
    }

    fn apply_model(config: &mut ProcessorConfig, model: Option<&Path>) {
        if let Some(model) = model {
            config.segmentation.model_path = Some(model.to_path_buf());
        }
    }
}

fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
}
