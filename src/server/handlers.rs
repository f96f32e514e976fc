//! Route handlers

use super::error::ApiError;
use super::form::{ProcessForm, UPLOAD_FORM_HTML};
use super::AppState;
use crate::services::TIMESTAMP_FORMAT;
use axum::extract::multipart::MultipartRejection;
use axum::extract::{Multipart, State};
use axum::http::{header, HeaderName, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use tracing::{debug, info, info_span, Instrument, Span};
use uuid::Uuid;

/// Number of uploads written to the archive
pub const PROCESSED_COUNT_HEADER: &str = "x-processed-count";
/// Number of uploads left out of the archive
pub const FAILED_COUNT_HEADER: &str = "x-failed-count";

/// `GET /imageprocess`
pub async fn upload_form() -> Html<&'static str> {
    Html(UPLOAD_FORM_HTML)
}

/// `GET /health`
pub async fn health() -> &'static str {
    "ok"
}

/// `POST /process`: run every uploaded image through the pipeline and return a zip
///
/// A body that is not multipart at all cannot carry an `images` part, so it
/// is answered like any other request without files.
pub async fn process_images(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, ApiError> {
    let request_id = Uuid::new_v4();
    let span = info_span!("process_request", %request_id);

    let multipart = match multipart {
        Ok(multipart) => multipart,
        Err(rejection) => {
            span.in_scope(|| {
                debug!(reason = %rejection.body_text(), "Request body is not multipart");
            });
            return Err(ApiError::NoFiles);
        },
    };

    process_batch(state, multipart).instrument(span).await
}

async fn process_batch(state: AppState, mut multipart: Multipart) -> Result<Response, ApiError> {
    let form = ProcessForm::from_multipart(&mut multipart).await?;
    if !form.images_present {
        return Err(ApiError::NoFiles);
    }

    info!(
        uploads = form.uploads.len(),
        resize = form.overrides.resize,
        remove_background = form.overrides.remove_background,
        enhance = form.overrides.enhance,
        "Processing upload batch"
    );

    let snapshot = state.config.with_overrides(form.overrides);
    let batch = state.batch.clone();
    let uploads = form.uploads;
    let span = Span::current();
    // Carry the caller's subscriber onto the blocking thread with the span
    let dispatch = tracing::dispatcher::get_default(Clone::clone);
    let outcome = tokio::task::spawn_blocking(move || {
        tracing::dispatcher::with_default(&dispatch, || span.in_scope(|| batch.run(uploads, &snapshot)))
    })
    .await
    .map_err(|e| ApiError::Internal(format!("Processing task failed: {e}")))??;

    let download_name = format!(
        "processed_images_{}.zip",
        chrono::Local::now().format(TIMESTAMP_FORMAT)
    );

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "application/zip".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{download_name}\""),
            ),
            (
                HeaderName::from_static(PROCESSED_COUNT_HEADER),
                outcome.report.processed_count().to_string(),
            ),
            (
                HeaderName::from_static(FAILED_COUNT_HEADER),
                outcome.report.failed_count().to_string(),
            ),
        ],
        outcome.archive,
    )
        .into_response())
}
