mod health;
mod metrics;
mod upload;

use crate::server::SharedState;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

pub fn api_routes() -> Router<SharedState> {
    Router::new()
        .route("/", get(upload::page))
        .route("/state", get(upload::state))
        // uploads are size-checked while streaming
        .route(
            "/upload",
            post(upload::upload).layer(DefaultBodyLimit::disable()),
        )
        .route(
            "/drop",
            post(upload::drop_files).layer(DefaultBodyLimit::disable()),
        )
        .route("/drag/over", post(upload::drag_over))
        .route("/drag/leave", post(upload::drag_leave))
        .route("/predict", post(upload::predict))
        .route("/predict/preview", post(upload::predict_preview))
        .route("/clear", post(upload::clear))
        .route("/health/refresh", post(upload::refresh_health))
        .route("/health", get(health::healthcheck))
        .route("/metrics", get(metrics::metrics_handler))
}
