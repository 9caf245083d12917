// 🌐 HTTP API - meter reading uploads over Axum
//
// POST /api/meter-reading-uploads  (multipart, field "file")
// GET  /api/health

use crate::error::UploadError;
use crate::parser::parse_readings_bytes;
use crate::store::ReadingStore;
use crate::upload::process_batch;
use axum::{
    body::Bytes,
    extract::{
        multipart::{MultipartError, MultipartRejection},
        Multipart, State,
    },
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub const NO_FILE_MESSAGE: &str = "No file was uploaded.";
pub const UNPROCESSABLE_FILE_MESSAGE: &str = "The file cannot be processed. Please ensure the content of the file is in the correct format, or have at least one filled entry in the CSV file.";
pub const STORE_FAILURE_MESSAGE: &str = "The readings could not be stored.";

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ReadingStore + Send + Sync>,
}

impl AppState {
    pub fn new<S>(store: S) -> Self
    where
        S: ReadingStore + Send + Sync + 'static,
    {
        AppState {
            store: Arc::new(store),
        }
    }
}

/// Body of every API response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadResponse {
    pub message: String,
    pub success: bool,
}

impl UploadResponse {
    fn ok(message: impl Into<String>) -> Self {
        UploadResponse {
            message: message.into(),
            success: true,
        }
    }

    fn failed(message: impl Into<String>) -> Self {
        UploadResponse {
            message: message.into(),
            success: false,
        }
    }
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    Json(UploadResponse::ok("OK"))
}

/// POST /api/meter-reading-uploads - Validate and store a CSV batch
async fn upload_readings(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> (StatusCode, Json<UploadResponse>) {
    let Ok(multipart) = multipart else {
        return (StatusCode::BAD_REQUEST, Json(UploadResponse::failed(NO_FILE_MESSAGE)));
    };

    let bytes = match read_file_field(multipart).await {
        Ok(Some(bytes)) => bytes,
        Ok(None) => {
            return (StatusCode::BAD_REQUEST, Json(UploadResponse::failed(NO_FILE_MESSAGE)));
        }
        Err(e) => {
            tracing::warn!(error = %e, "multipart upload could not be read");
            return (
                StatusCode::BAD_REQUEST,
                Json(UploadResponse::failed(UNPROCESSABLE_FILE_MESSAGE)),
            );
        }
    };

    let candidates = match parse_readings_bytes(&bytes) {
        Ok(candidates) => candidates,
        Err(e) => {
            tracing::warn!(error = %e, "uploaded file rejected by parser");
            return (
                StatusCode::BAD_REQUEST,
                Json(UploadResponse::failed(UNPROCESSABLE_FILE_MESSAGE)),
            );
        }
    };

    // SQLite calls block, keep them off the async workers
    let store = state.store.clone();
    let result = tokio::task::spawn_blocking(move || process_batch(store.as_ref(), &candidates)).await;

    match result {
        Ok(Ok(report)) if report.success => (StatusCode::OK, Json(UploadResponse::ok(report.message))),
        Ok(Ok(report)) => (StatusCode::BAD_REQUEST, Json(UploadResponse::failed(report.message))),
        Ok(Err(UploadError::Store(e))) => {
            tracing::error!(error = %e, "failed to store readings");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(UploadResponse::failed(STORE_FAILURE_MESSAGE)),
            )
        }
        Err(e) => {
            tracing::error!(error = %e, "upload task panicked");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(UploadResponse::failed(STORE_FAILURE_MESSAGE)),
            )
        }
    }
}

/// Contents of the first field named `file`, if any
async fn read_file_field(mut multipart: Multipart) -> Result<Option<Bytes>, MultipartError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() == Some("file") {
            return Ok(Some(field.bytes().await?));
        }
    }
    Ok(None)
}

// ============================================================================
// Router
// ============================================================================

pub fn router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/meter-reading-uploads", post(upload_readings))
        .with_state(state);

    Router::new()
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

// ============================================================================
// TESTS
// ============================================================================
