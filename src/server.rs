//! HTTP API over [`ClassificationService`].
//!
//! **Classification:**
//! - `POST /api/classify`: multipart field `file`
//! - `POST /api/classify-batch`: multipart fields `files`, ordered results
//!
//! **Documents:**
//! - `GET  /api/documents`: all records, newest first
//! - `GET  /api/stats`: totals, distribution and documents
//! - `GET  /api/v1/documents?skip=0&limit=10`: paginated records
//! - `GET  /api/v1/documents/stats`: totals and distribution
//! - `GET|PATCH|DELETE /api/v1/documents/{id}`: one record
//!
//! **Health:**
//! - `GET  /health`: server status
//!
//! Errors are `{"detail": "..."}` with a matching status code.

use std::future::Future;
use std::sync::Arc;

use axum::extract::{DefaultBodyLimit, Multipart, Path, Query, State};
use axum::http::{HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use tower_http::cors::{Any, CorsLayer};

use crate::client::Health;
use crate::service::{
    BatchItem, ClassificationService, ClassifiedUpload, ServiceError, ServiceResult, Upload,
};
use crate::stats::{DocumentStats, StatsOverview};
use crate::store::{DocumentRecord, MetadataUpdate};

type AppState = Arc<ClassificationService>;

// ── Errors ────────────────────────────────────────────────────────────────

/// An error response rendered as `{"detail": ...}`.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub detail: String,
}

impl ApiError {
    pub fn new(status: StatusCode, detail: impl Into<String>) -> Self {
        Self {
            status,
            detail: detail.into(),
        }
    }

    fn internal(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, detail)
    }
}

impl From<ServiceError> for ApiError {
    fn from(e: ServiceError) -> Self {
        let status = match &e {
            ServiceError::UnsupportedFileType { .. } | ServiceError::ProcessingFailed { .. } => {
                StatusCode::BAD_REQUEST
            }
            ServiceError::FileTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            ServiceError::NotFound { .. } => StatusCode::NOT_FOUND,
            ServiceError::Io { .. } | ServiceError::Classify(_) | ServiceError::Store(_) => {
                tracing::error!("request failed: {e}");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        Self::new(status, e.to_string())
    }
}

impl From<axum::extract::multipart::MultipartError> for ApiError {
    fn from(e: axum::extract::multipart::MultipartError) -> Self {
        Self::new(e.status(), e.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(serde_json::json!({ "detail": self.detail })),
        )
            .into_response()
    }
}

/// Run pipeline work off the async runtime.
async fn blocking<T, F>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> ServiceResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ApiError::internal(format!("task failed: {e}")))?
        .map_err(ApiError::from)
}

// ── Handlers ──────────────────────────────────────────────────────────────

async fn health(State(service): State<AppState>) -> Result<Json<Health>, ApiError> {
    let documents = blocking(move || service.count()).await?;
    Ok(Json(Health {
        status: "ok".into(),
        version: env!("CARGO_PKG_VERSION").into(),
        documents,
    }))
}

/// Collect every multipart file under `field_name`, in order.
async fn read_uploads(multipart: &mut Multipart, field_name: &str) -> Result<Vec<Upload>, ApiError> {
    let mut uploads = Vec::new();
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(field_name) {
            continue;
        }
        let filename = field.file_name().unwrap_or("upload").to_string();
        let data = field.bytes().await?;
        uploads.push(Upload::new(filename, data.to_vec()));
    }
    Ok(uploads)
}

async fn classify_document(
    State(service): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<ClassifiedUpload>, ApiError> {
    let upload = read_uploads(&mut multipart, "file")
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| ApiError::new(StatusCode::UNPROCESSABLE_ENTITY, "Field required: file"))?;
    let classified =
        blocking(move || service.classify_upload(&upload.filename, &upload.data)).await?;
    Ok(Json(classified))
}

async fn classify_batch(
    State(service): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<Vec<BatchItem>>, ApiError> {
    let uploads = read_uploads(&mut multipart, "files").await?;
    if uploads.is_empty() {
        return Err(ApiError::new(
            StatusCode::UNPROCESSABLE_ENTITY,
            "Field required: files",
        ));
    }
    tracing::info!(files = uploads.len(), "batch classification");
    let items = blocking(move || Ok(service.classify_batch(&uploads))).await?;
    Ok(Json(items))
}

async fn list_documents(
    State(service): State<AppState>,
) -> Result<Json<Vec<DocumentRecord>>, ApiError> {
    Ok(Json(blocking(move || service.documents()).await?))
}

async fn stats_overview(State(service): State<AppState>) -> Result<Json<StatsOverview>, ApiError> {
    Ok(Json(blocking(move || service.overview()).await?))
}

fn default_limit() -> usize {
    10
}

#[derive(Debug, Deserialize)]
struct PageParams {
    #[serde(default)]
    skip: usize,
    #[serde(default = "default_limit")]
    limit: usize,
}

async fn documents_page(
    State(service): State<AppState>,
    Query(params): Query<PageParams>,
) -> Result<Json<Vec<DocumentRecord>>, ApiError> {
    Ok(Json(
        blocking(move || service.documents_page(params.skip, params.limit)).await?,
    ))
}

async fn document_stats(State(service): State<AppState>) -> Result<Json<DocumentStats>, ApiError> {
    Ok(Json(blocking(move || service.stats()).await?))
}

async fn get_document(
    State(service): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Json<DocumentRecord>, ApiError> {
    Ok(Json(blocking(move || service.document(id)).await?))
}

async fn update_document(
    State(service): State<AppState>,
    Path(id): Path<u64>,
    Json(update): Json<MetadataUpdate>,
) -> Result<Json<DocumentRecord>, ApiError> {
    Ok(Json(
        blocking(move || service.update_document(id, &update)).await?,
    ))
}

async fn delete_document(
    State(service): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Json<DocumentRecord>, ApiError> {
    Ok(Json(blocking(move || service.remove_document(id)).await?))
}

// ── Router ────────────────────────────────────────────────────────────────

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
        .allow_headers(Any);
    if origins.iter().any(|o| o == "*") {
        return layer.allow_origin(Any);
    }
    let parsed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!(origin = %o, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    layer.allow_origin(parsed)
}

/// Build the application router.
pub fn router(service: Arc<ClassificationService>) -> Router {
    let settings = service.settings();
    let api = settings.api_prefix.trim_end_matches('/').to_string();
    let v1 = settings.api_v1_prefix.trim_end_matches('/').to_string();
    let body_limit = usize::try_from(settings.max_request_size).unwrap_or(usize::MAX);
    let cors = cors_layer(&settings.cors_origins);

    Router::new()
        .route("/health", get(health))
        .route(&format!("{api}/classify"), post(classify_document))
        .route(&format!("{api}/classify-batch"), post(classify_batch))
        .route(&format!("{api}/documents"), get(list_documents))
        .route(&format!("{api}/stats"), get(stats_overview))
        .route(&format!("{v1}/documents"), get(documents_page))
        // Static /stats before wildcard /{id}.
        .route(&format!("{v1}/documents/stats"), get(document_stats))
        .route(
            &format!("{v1}/documents/{{id}}"),
            get(get_document)
                .patch(update_document)
                .delete(delete_document),
        )
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .with_state(service)
}

/// Resolves on SIGINT, or SIGTERM on unix.
pub async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => {},
                    _ = sigterm.recv() => {},
                }
            }
            Err(e) => {
                tracing::warn!("failed to register SIGTERM handler: {e}");
                ctrl_c.await.ok();
            }
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
    }
}

/// Serve the router on `listener` until `shutdown` resolves.
pub async fn serve(
    listener: tokio::net::TcpListener,
    service: Arc<ClassificationService>,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    let app = router(service);
    if let Ok(addr) = listener.local_addr() {
        tracing::info!("doc-classifyd listening on {addr}");
    }
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
}
