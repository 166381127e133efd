//! HTTP front door.
//!
//! A thin translation layer between JSON/multipart requests and the
//! [`Corpus`] / [`RetrievalOrchestrator`]. Every failure is returned as a
//! structured body with a fixed status code per error kind.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/` | Liveness message |
//! | `GET`  | `/health` | Health check (returns version) |
//! | `GET`  | `/stats` | Corpus size, dimension, and embedding model |
//! | `POST` | `/upload` | Index uploaded `.txt` files (multipart) |
//! | `POST` | `/query` | Answer a query with retrieved context |
//!
//! # Error Contract
//!
//! ```json
//! { "error": "query must not be empty", "code": "bad_request" }
//! ```
//!
//! Error codes: `bad_request` (400), `payload_too_large` (413),
//! `embedding_unavailable` (503), `index_error` (500), `corpus_corruption`
//! (500), `generation_failed` (502).

use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        rejection::JsonRejection,
        DefaultBodyLimit, Multipart, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::answer::RetrievalOrchestrator;
use crate::config::Config;
use crate::corpus::Corpus;
use crate::error::{AnswerError, CorpusError};
use crate::seed::is_allowed_file;

/// Message returned by `POST /upload` when no file part is attached.
pub const NO_FILE_PART: &str = "No file part in the request";

/// Message returned by `GET /`.
pub const ROOT_MESSAGE: &str = "Semantic server is up";

/// Message returned by a successful `POST /upload`.
pub const UPLOAD_SUCCESS: &str = "Indexed successfully";

/// Shared application state passed to all route handlers via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    corpus: Arc<Corpus>,
    rag: Arc<RetrievalOrchestrator>,
}

impl AppState {
    /// Build the state around an orchestrator; the corpus handle is the one
    /// the orchestrator retrieves from, so uploads and queries always share
    /// the same instance.
    pub fn new(rag: RetrievalOrchestrator) -> Self {
        Self {
            corpus: rag.corpus().clone(),
            rag: Arc::new(rag),
        }
    }

    pub fn corpus(&self) -> &Arc<Corpus> {
        &self.corpus
    }
}

/// Build the router with all routes and middleware.
pub fn router(state: AppState, max_upload_bytes: usize) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(handle_root))
        .route("/health", get(handle_health))
        .route("/stats", get(handle_stats))
        .route("/upload", post(handle_upload))
        .route("/query", post(handle_query))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind to `[server].bind` and serve until Ctrl-C.
pub async fn run_server(config: &Config, state: AppState) -> anyhow::Result<()> {
    let listener = TcpListener::bind(&config.server.bind).await?;
    tracing::info!(addr = %listener.local_addr()?, "semantic server listening");
    serve(listener, state, config.server.max_upload_bytes, shutdown_signal()).await
}

/// Serve on an already-bound listener until `shutdown` resolves.
pub async fn serve<F>(
    listener: TcpListener,
    state: AppState,
    max_upload_bytes: usize,
    shutdown: F,
) -> anyhow::Result<()>
where
    F: std::future::Future<Output = ()> + Send + 'static,
{
    let app = router(state, max_upload_bytes);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;
    tracing::info!("semantic server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    /// Human-readable error message.
    error: String,
    /// Machine-readable error code (e.g., `"bad_request"`).
    code: &'static str,
}

/// Internal error type that converts into an Axum HTTP response.
#[derive(Debug)]
struct AppError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.message,
            code: self.code,
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request",
        message: message.into(),
    }
}

impl From<CorpusError> for AppError {
    fn from(err: CorpusError) -> Self {
        let (status, code) = match &err {
            CorpusError::Embedding(_) => (StatusCode::SERVICE_UNAVAILABLE, "embedding_unavailable"),
            CorpusError::Index(_) | CorpusError::Store(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "index_error")
            }
            CorpusError::Corruption(_) => (StatusCode::INTERNAL_SERVER_ERROR, "corpus_corruption"),
        };
        tracing::error!(error = %err, code, "corpus operation failed");
        AppError {
            status,
            code,
            message: err.to_string(),
        }
    }
}

impl From<AnswerError> for AppError {
    fn from(err: AnswerError) -> Self {
        match err {
            AnswerError::Retrieval(e) => e.into(),
            AnswerError::Generation(e) => AppError {
                status: StatusCode::BAD_GATEWAY,
                code: "generation_failed",
                message: format!("Error generating answer: {}", e),
            },
        }
    }
}

// ============ GET / ============

#[derive(Serialize)]
struct MessageResponse {
    message: String,
}

async fn handle_root() -> Json<MessageResponse> {
    Json(MessageResponse {
        message: ROOT_MESSAGE.to_string(),
    })
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    /// Always `"ok"` when the server is running.
    status: String,
    /// The crate version from `Cargo.toml`.
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
    rows: usize,
    chunks: usize,
    dims: Option<usize>,
    model: String,
}

async fn handle_stats(State(state): State<AppState>) -> Json<StatsResponse> {
    let stats = state.corpus.stats().await;
    Json(StatsResponse {
        rows: stats.rows,
        chunks: stats.chunks,
        dims: stats.dims,
        model: stats.model,
    })
}

// ============ POST /upload ============

#[derive(Serialize)]
struct UploadResponse {
    message: String,
    /// Names of the files that were indexed.
    indexed: Vec<String>,
    /// Names of the files skipped for having an unsupported type.
    skipped: Vec<String>,
    chunks_added: usize,
}

/// Handler for `POST /upload`.
///
/// Indexes every `.txt` file part in order. Other files are skipped, which
/// still counts as success: an upload holding only a `.pdf` returns 200 and
/// leaves the corpus unchanged, with the file listed under `skipped`.
///
/// Every file is read and decoded before anything is ingested, so a request
/// rejected as malformed never changes the corpus.
async fn handle_upload(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResponse>, AppError> {
    let mut multipart = multipart.map_err(|_| bad_request(NO_FILE_PART))?;

    let mut file_parts = 0usize;
    let mut documents: Vec<(String, String)> = Vec::new();
    let mut skipped = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error("malformed multipart body", e))?
    {
        let Some(file_name) = field.file_name().map(str::to_string) else {
            continue;
        };
        file_parts += 1;

        if !is_allowed_file(&file_name) {
            tracing::warn!(file = %file_name, "skipping upload: invalid file type");
            skipped.push(file_name);
            continue;
        }

        let bytes = field
            .bytes()
            .await
            .map_err(|e| multipart_error(&format!("failed to read {}", file_name), e))?;
        let text = String::from_utf8(bytes.to_vec())
            .map_err(|_| bad_request(format!("{} is not valid UTF-8 text", file_name)))?;
        documents.push((file_name, text));
    }

    if file_parts == 0 {
        return Err(bad_request(NO_FILE_PART));
    }

    let mut indexed = Vec::with_capacity(documents.len());
    let mut chunks_added = 0usize;
    for (file_name, text) in documents {
        let report = state.corpus.ingest(&text).await?;
        chunks_added += report.chunks_added;
        indexed.push(file_name);
    }

    tracing::info!(
        indexed = indexed.len(),
        skipped = skipped.len(),
        chunks_added,
        "upload processed"
    );

    Ok(Json(UploadResponse {
        message: UPLOAD_SUCCESS.to_string(),
        indexed,
        skipped,
        chunks_added,
    }))
}

/// Body-limit failures keep axum's 413; everything else is a bad request.
fn multipart_error(context: &str, err: MultipartError) -> AppError {
    let status = err.status();
    if status == StatusCode::PAYLOAD_TOO_LARGE {
        return AppError {
            status,
            code: "payload_too_large",
            message: format!("{}: {}", context, err.body_text()),
        };
    }
    bad_request(format!("{}: {}", context, err.body_text()))
}

// ============ POST /query ============

#[derive(Deserialize)]
struct QueryRequest {
    query: String,
    /// Optional caller-supplied context appended after the retrieved chunks.
    #[serde(default)]
    context: Option<String>,
}

#[derive(Serialize)]
struct QueryResponse {
    /// The original query, echoed back.
    context: String,
    response: String,
}

async fn handle_query(
    State(state): State<AppState>,
    payload: Result<Json<QueryRequest>, JsonRejection>,
) -> Result<Json<QueryResponse>, AppError> {
    let Json(request) =
        payload.map_err(|e| bad_request(format!("invalid query payload: {}", e.body_text())))?;

    if request.query.trim().is_empty() {
        return Err(bad_request("query must not be empty"));
    }

    let answer = state
        .rag
        .answer(&request.query, request.context.as_deref().unwrap_or(""))
        .await?;

    Ok(Json(QueryResponse {
        context: answer.query,
        response: answer.response,
    }))
}
