//! HTTP front end
//!
//! Serves the upload form at `GET /imageprocess` and processes batches at
//! `POST /process`. The configuration is shared read-only; each request
//! works on its own snapshot with the submitted operation flags applied.

pub mod error;
pub mod form;
pub mod handlers;

pub use error::ApiError;

use crate::{
    batch::BatchProcessor,
    config::ProcessorConfig,
    error::Result,
    inference::{build_remover, BackgroundRemover},
    pipeline::ImagePipeline,
};
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

/// State shared by every request
#[derive(Debug, Clone)]
pub struct AppState {
    pub config: Arc<ProcessorConfig>,
    pub batch: Arc<BatchProcessor>,
}

impl AppState {
    /// Build state with the remover described by `config.segmentation`
    ///
    /// # Errors
    /// - Configured segmentation model cannot be loaded
    pub fn new(config: ProcessorConfig) -> Result<Self> {
        let remover = build_remover(&config.segmentation)?;
        Ok(Self::with_remover(config, remover))
    }

    #[must_use]
    pub fn with_remover(config: ProcessorConfig, remover: Arc<dyn BackgroundRemover>) -> Self {
        Self {
            config: Arc::new(config),
            batch: Arc::new(BatchProcessor::new(ImagePipeline::new(remover))),
        }
    }
}

/// Build the application router
pub fn build_router(state: AppState) -> Router {
    let body_limit = state.config.server.max_upload_bytes;

    Router::new()
        .route("/imageprocess", get(handlers::upload_form))
        .route("/process", post(handlers::process_images))
        .route("/health", get(handlers::health))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}

/// Bind `addr` and serve until the process exits
///
/// # Errors
/// - Address cannot be bound
/// - Listener failure
pub async fn serve(state: AppState, addr: SocketAddr) -> Result<()> {
    let remover = state.batch.pipeline().remover_name().to_string();
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let local_addr = listener.local_addr()?;
    info!(addr = %local_addr, remover = %remover, "Image processing server listening");

    axum::serve(listener, build_router(state)).await?;
    Ok(())
}
