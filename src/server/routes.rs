//! # HTTP Surface
//!
//! ```text
//! POST /        multi-part submission  -> 200 | 400 | 500
//! OPTIONS *     CORS answer            -> 200
//! ```
//!
//! File parts are buffered in memory up to `upload.memory_limit_bytes` per
//! request and spill to temporary files beyond that. Only bodies over the
//! separate hard cap `upload.max_body_bytes` ([`DefaultBodyLimit`]) are
//! rejected.

use axum::extract::{DefaultBodyLimit, Multipart, Request, State};
use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::Router;
use log::info;
use std::time::Instant;
use tower_http::cors::{Any, CorsLayer};

use super::form::SubmissionForm;
use super::ingest::{IngestError, SampleIngestor};
use crate::common::config::UploadSection;

#[derive(Clone)]
struct AppState {
    ingestor: SampleIngestor,
    memory_limit: usize,
}

/// Build the service router around a shared ingestor.
///
/// # Example
/// ```ignore
/// let app = build_router(ingestor, &config.upload);
/// axum::serve(listener, app).await?;
/// ```
pub fn build_router(ingestor: SampleIngestor, upload: &UploadSection) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::POST])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/", post(submit_sample).options(answer_options))
        .fallback(fallback)
        .layer(DefaultBodyLimit::max(upload.max_body_bytes))
        .layer(cors)
        .layer(middleware::from_fn(log_requests))
        .with_state(AppState {
            ingestor,
            memory_limit: upload.memory_limit_bytes,
        })
}

async fn submit_sample(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<StatusCode, IngestError> {
    let form = SubmissionForm::read(multipart, state.memory_limit).await?;
    state.ingestor.ingest(form).await?;
    Ok(StatusCode::OK)
}

/// Non-preflight `OPTIONS` requests still get the CORS headers and a 200.
async fn answer_options() -> Response {
    (
        StatusCode::OK,
        [
            (header::ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*")),
            (header::ACCESS_CONTROL_ALLOW_METHODS, HeaderValue::from_static("POST")),
            (
                header::ACCESS_CONTROL_ALLOW_HEADERS,
                HeaderValue::from_static("Content-Type"),
            ),
        ],
    )
        .into_response()
}

async fn fallback(method: Method) -> Response {
    if method == Method::OPTIONS {
        answer_options().await
    } else {
        StatusCode::NOT_FOUND.into_response()
    }
}

async fn log_requests(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let start = Instant::now();

    info!("Started {} {}", method, path);
    let response = next.run(request).await;
    info!(
        "Completed {} {} with {} in {:?}",
        method,
        path,
        response.status().as_u16(),
        start.elapsed()
    );

    response
}
