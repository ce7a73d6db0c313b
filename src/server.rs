//! HTTP front end for the decision engine.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/check-plagiarism` | Multipart upload (`file` field), returns a decision |
//! | `GET`  | `/stats` | Index name and number of admitted documents |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "invalid_input", "message": "unsupported document type: notes.txt" } }
//! ```
//!
//! | Code | Status |
//! |------|--------|
//! | `invalid_input` | 400 |
//! | `payload_too_large` | 413 |
//! | `unreadable_document` | 422 |
//! | `collaborator_unavailable` | 503 |
//! | `index_unavailable` | 503 |
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted.

use axum::{
    extract::{multipart::MultipartRejection, DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use srs_guard_core::models::Decision;
use srs_guard_core::{DecisionEngine, ErrorKind, PipelineError};

use crate::app;
use crate::config::Config;
use crate::extract::DocumentType;

/// Room for multipart boundaries and part headers on top of the file itself.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

#[derive(Clone)]
struct AppState {
    engine: Arc<DecisionEngine>,
}

/// Build the router around an existing engine.
pub fn router(engine: Arc<DecisionEngine>) -> Router {
    let body_limit = engine.config().max_upload_bytes as usize + MULTIPART_OVERHEAD_BYTES;

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/check-plagiarism", post(handle_check))
        .route("/stats", get(handle_stats))
        .route("/health", get(handle_health))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(AppState { engine })
}

/// Starts the HTTP server on `[server].bind`.
///
/// The index is ensured before the listener is bound, so a misconfigured
/// backend fails at startup rather than on the first upload.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let engine = Arc::new(app::build_engine(config).await?);
    engine.ensure_index().await?;

    let app = router(engine);
    let bind_addr = &config.server.bind;

    tracing::info!(%bind_addr, "server listening");
    println!("SRS Guard listening on http://{}", bind_addr);

    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: ErrorKind::InvalidInput.code().to_string(),
        message: message.into(),
    }
}

fn payload_too_large(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::PAYLOAD_TOO_LARGE,
        code: "payload_too_large".to_string(),
        message: message.into(),
    }
}

impl From<PipelineError> for AppError {
    fn from(err: PipelineError) -> Self {
        let kind = err.kind();
        let status = match kind {
            ErrorKind::InvalidInput => StatusCode::BAD_REQUEST,
            ErrorKind::UnreadableDocument => StatusCode::UNPROCESSABLE_ENTITY,
            ErrorKind::CollaboratorUnavailable | ErrorKind::IndexUnavailable => {
                StatusCode::SERVICE_UNAVAILABLE
            }
        };
        AppError {
            status,
            code: kind.code().to_string(),
            message: err.to_string(),
        }
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ GET /stats ============

#[derive(Serialize)]
struct StatsResponse {
    index: String,
    entries: u64,
}

async fn handle_stats(State(state): State<AppState>) -> Result<Json<StatsResponse>, AppError> {
    let entries = state.engine.corpus_size().await?;
    Ok(Json(StatsResponse {
        index: state.engine.index_spec().name.clone(),
        entries,
    }))
}

// ============ POST /check-plagiarism ============

/// The `file` part of the upload.
struct Upload {
    filename: String,
    bytes: Vec<u8>,
}

/// Handler for `POST /check-plagiarism`.
///
/// Validates the upload (present, named, PDF or DOCX, within the size
/// limit) and hands it to the engine.
async fn handle_check(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<Decision>, AppError> {
    let mut multipart = multipart.map_err(|e| bad_request(e.body_text()))?;
    let max_bytes = state.engine.config().max_upload_bytes;

    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| bad_request(format!("malformed multipart body: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let filename = field
            .file_name()
            .map(str::to_string)
            .filter(|n| !n.trim().is_empty())
            .ok_or_else(|| bad_request("file must have a filename"))?;

        let by_name = DocumentType::from_filename(&filename);
        let by_type = field.content_type().and_then(DocumentType::from_content_type);
        if by_name.or(by_type).is_none() {
            return Err(bad_request(format!(
                "unsupported document type: {} (expected {} or {})",
                filename,
                DocumentType::Pdf.mime(),
                DocumentType::Docx.mime()
            )));
        }

        let bytes = field.bytes().await.map_err(|e| {
            if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
                payload_too_large(format!("file exceeds {} bytes", max_bytes))
            } else {
                bad_request(format!("failed to read file: {}", e))
            }
        })?;

        upload = Some(Upload {
            filename,
            bytes: bytes.to_vec(),
        });
        break;
    }

    let upload = upload.ok_or_else(|| bad_request("missing 'file' field"))?;
    if upload.bytes.len() as u64 > max_bytes {
        return Err(payload_too_large(format!(
            "file is {} bytes, limit is {} bytes",
            upload.bytes.len(),
            max_bytes
        )));
    }

    let decision = state
        .engine
        .process(&upload.bytes, &upload.filename)
        .await?;
    Ok(Json(decision))
}
