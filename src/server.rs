use crate::config::Config;
use crate::engines::{self, EngineInfo};
use crate::error::OcrError;
use crate::extraction::{ExtractionReport, Extractor, Workspace};
use crate::text::AggregatedResult;
use axum::{
    body::Bytes,
    extract::{multipart::MultipartError, DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tower_http::trace::TraceLayer;

/// Room for multipart boundaries and headers on top of the file itself
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub extractor: Arc<Extractor>,
    pub config: Arc<Config>,
}

/// OCR response
#[derive(Serialize)]
pub struct OcrResponse {
    pub ocr_result: AggregatedResult,
    pub rows_detected: usize,
    pub rows_recognized: usize,
    pub processing_time_ms: u64,
    pub warnings: Vec<String>,
}

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Server info response
#[derive(Serialize)]
pub struct InfoResponse {
    pub version: String,
    pub engine: EngineInfo,
    pub max_file_size_bytes: usize,
    pub row_count: u32,
    pub enhancement: String,
}

/// Build the application router
pub fn router(state: AppState) -> Router {
    let max_file_size = state.config.max_file_size;

    Router::new()
        .route("/ocr", post(handle_ocr))
        .route("/health", get(handle_health))
        .route("/info", get(handle_info))
        .layer(DefaultBodyLimit::max(max_file_size.saturating_add(MULTIPART_OVERHEAD)))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Run the HTTP server
pub async fn run(config: Config) -> anyhow::Result<()> {
    let engine = engines::default_engine(&config.extraction.substitutions)?;
    let extractor = Extractor::new(engine, config.extraction.clone())?;
    let addr = format!("{}:{}", config.host, config.port);

    let app = router(AppState {
        extractor: Arc::new(extractor),
        config: Arc::new(config),
    });

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Handle OCR requests
async fn handle_ocr(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<OcrResponse>, OcrError> {
    let start = Instant::now();
    let max = state.config.max_file_size;

    let mut file_data: Option<Bytes> = None;
    let mut content_type: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, max))?
    {
        if field.name() == Some("file") {
            content_type = field.content_type().map(|s| s.to_string());
            file_data = Some(field.bytes().await.map_err(|e| multipart_error(e, max))?);
        }
    }

    let data = file_data.ok_or(OcrError::MissingFile)?;

    if data.len() > max {
        return Err(OcrError::ImageTooLarge {
            size: data.len(),
            max,
        });
    }

    let mime = content_type.unwrap_or_else(|| "application/octet-stream".to_string());
    if !mime.starts_with("image/") {
        tracing::warn!("Received file with content type: {}", mime);
    }

    let report = tokio::task::spawn_blocking(move || extract_upload(&state, &data))
        .await
        .map_err(|e| OcrError::Internal(format!("Extraction task failed: {}", e)))??;

    let processing_time_ms = start.elapsed().as_millis() as u64;

    tracing::info!(
        "Request {} completed in {}ms via {} box detection: {} tokens from {} rows",
        report.request_id,
        processing_time_ms,
        report.strategy.as_str(),
        report.result.len(),
        report.rows_detected
    );

    Ok(Json(OcrResponse {
        ocr_result: report.result,
        rows_detected: report.rows_detected,
        rows_recognized: report.rows_recognized,
        processing_time_ms,
        warnings: report.warnings,
    }))
}

/// Bodies cut off by the body limit are reported as oversized uploads
fn multipart_error(e: MultipartError, max: usize) -> OcrError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        OcrError::ImageTooLarge {
            size: max.saturating_add(MULTIPART_OVERHEAD),
            max,
        }
    } else {
        OcrError::InvalidRequest(format!("Failed to parse multipart: {}", e))
    }
}

/// Decode the upload, extract in a fresh workspace, and optionally persist
fn extract_upload(state: &AppState, data: &[u8]) -> Result<ExtractionReport, OcrError> {
    let image = image::load_from_memory(data)
        .map_err(|e| OcrError::ImageDecode(format!("Failed to load image: {}", e)))?;
    let workspace = Workspace::create(state.config.work_dir.as_deref())?;
    let report = state.extractor.extract(&image, &workspace)?;

    if let Some(output_dir) = &state.config.output_dir {
        let path = output_dir.join(format!("res_{}.json", report.request_id));
        if let Err(e) = report.result.write_json(&path) {
            tracing::warn!("Failed to persist result: {}", e);
        }
    }

    Ok(report)
}

/// Handle health check requests
async fn handle_health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Handle info requests
async fn handle_info(State(state): State<AppState>) -> impl IntoResponse {
    let settings = state.extractor.settings();
    Json(InfoResponse {
        version: env!("CARGO_PKG_VERSION").to_string(),
        engine: EngineInfo::of(state.extractor.engine().as_ref()),
        max_file_size_bytes: state.config.max_file_size,
        row_count: settings.row_count,
        enhancement: settings.enhancement.as_str().to_string(),
    })
}
