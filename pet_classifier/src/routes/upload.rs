use crate::{
    image_file::ImageFile,
    server::SharedState,
    upload::{PredictOutcome, UploadError},
    view::{render_page, StateView},
};
use axum::{
    extract::{multipart::MultipartError, Multipart, State},
    http::StatusCode,
    response::{Html, IntoResponse, Json, Redirect, Response},
};
use bytes::BytesMut;
use std::time::Instant;
use thiserror::Error;
use tracing::instrument;

#[derive(Error, Debug)]
pub enum UploadRouteError {
    #[error("Failed to read multipart body: {0}")]
    Multipart(#[from] MultipartError),
}

impl IntoResponse for UploadRouteError {
    fn into_response(self) -> Response {
        tracing::warn!("{}", self);
        (
            StatusCode::BAD_REQUEST,
            format!("Something went wrong: {}", self),
        )
            .into_response()
    }
}

/// Reads the first file part of the form. Parts without a file name (an
/// empty file input) are skipped, and later parts are passed over without
/// being buffered. A body over `max_bytes` is drained and only its size is
/// kept, so validation still reports it as too large.
async fn read_first_file(
    mut multipart: Multipart,
    max_bytes: u64,
) -> Result<Option<ImageFile>, UploadRouteError> {
    let mut first = None;
    while let Some(mut field) = multipart.next_field().await? {
        if first.is_some() {
            continue;
        }
        let name = match field.file_name() {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => continue,
        };
        let content_type = field.content_type().unwrap_or_default().to_string();

        let mut buffer = BytesMut::new();
        let mut size: u64 = 0;
        while let Some(chunk) = field.chunk().await? {
            size += chunk.len() as u64;
            if size <= max_bytes {
                buffer.extend_from_slice(&chunk);
            } else if !buffer.is_empty() {
                buffer = BytesMut::new();
            }
        }

        first = Some(if size <= max_bytes {
            ImageFile::new(name, content_type, buffer.freeze())
        } else {
            tracing::debug!("Discarded {} bytes of {}", size, name);
            ImageFile::discarded(name, content_type, size)
        });
    }
    Ok(first)
}

fn record_selection(state: &SharedState, outcome: Option<Result<(), UploadError>>) {
    if let Some(Err(err)) = outcome {
        let reason = match err {
            UploadError::NotAnImage => "not_an_image",
            UploadError::TooLarge { .. } => "too_large",
        };
        state.metrics.record_upload_rejection(reason);
    }
}

pub async fn page(State(state): State<SharedState>) -> Html<String> {
    state.metrics.record_request("/");
    Html(render_page(&state.controller.snapshot()))
}

pub async fn state(State(state): State<SharedState>) -> Json<StateView> {
    Json(StateView::from(&state.controller.snapshot()))
}

#[instrument(skip(state, multipart))]
pub async fn upload(
    State(state): State<SharedState>,
    multipart: Multipart,
) -> Result<Redirect, UploadRouteError> {
    state.metrics.record_request("/upload");
    let file = read_first_file(multipart, state.controller.max_file_size_bytes()).await?;
    let outcome = state.controller.on_file_selected(file.into_iter().collect()).await;
    record_selection(&state, outcome);
    Ok(Redirect::to("/"))
}

#[instrument(skip(state, multipart))]
pub async fn drop_files(
    State(state): State<SharedState>,
    multipart: Multipart,
) -> Result<Redirect, UploadRouteError> {
    state.metrics.record_request("/drop");
    let file = read_first_file(multipart, state.controller.max_file_size_bytes()).await?;
    let outcome = state.controller.on_drop(file.into_iter().collect()).await;
    record_selection(&state, outcome);
    Ok(Redirect::to("/"))
}

pub async fn drag_over(State(state): State<SharedState>) -> StatusCode {
    state.controller.on_drag_over();
    StatusCode::NO_CONTENT
}

pub async fn drag_leave(State(state): State<SharedState>) -> StatusCode {
    state.controller.on_drag_leave();
    StatusCode::NO_CONTENT
}

fn record_prediction(state: &SharedState, route: &str, outcome: PredictOutcome, started: Instant) {
    match outcome {
        PredictOutcome::Predicted => state
            .metrics
            .record_prediction_duration(started.elapsed().as_millis() as u64, route),
        PredictOutcome::Failed => state.metrics.record_prediction_failure(route),
        PredictOutcome::Skipped => tracing::debug!("Prediction skipped on {}", route),
    }
}

#[instrument(skip(state))]
pub async fn predict(State(state): State<SharedState>) -> Redirect {
    state.metrics.record_request("/predict");
    let started = Instant::now();
    let outcome = state.controller.predict().await;
    record_prediction(&state, "/predict", outcome, started);
    Redirect::to("/")
}

#[instrument(skip(state))]
pub async fn predict_preview(State(state): State<SharedState>) -> Redirect {
    state.metrics.record_request("/predict/preview");
    let started = Instant::now();
    let outcome = state.controller.predict_preview().await;
    record_prediction(&state, "/predict/preview", outcome, started);
    Redirect::to("/")
}

pub async fn clear(State(state): State<SharedState>) -> Redirect {
    state.metrics.record_request("/clear");
    state.controller.clear_image();
    Redirect::to("/")
}

#[instrument(skip(state))]
pub async fn refresh_health(State(state): State<SharedState>) -> Redirect {
    state.metrics.record_request("/health/refresh");
    state.controller.check_server_health().await;
    Redirect::to("/")
}
