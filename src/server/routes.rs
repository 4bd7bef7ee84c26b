//! HTTP route handlers for the econews agent API.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::{StatusCode, header};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::services::ServeDir;
use tracing::{error, info};

use crate::chat::ChatMessage;
use crate::dataset::{ARTICLE_COLUMN, ArticleTable, CSV_MIME, EXPORT_FILE_NAME};
use crate::llm::{AVAILABLE_MODELS, is_known_model};
use crate::scraping::ArticleRecord;

use super::events::{ChannelSink, SessionEvent, sse_response};
use super::state::AppState;

/// Error body returned by every failing endpoint.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Human-readable reason.
    pub error: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

/// Create the API router with all routes.
pub fn create_router(state: Arc<AppState>) -> Router {
    let static_files = ServeDir::new(&state.static_dir);

    Router::new()
        .route("/health", get(health_check))
        .route("/api/models", get(list_models))
        .route("/api/messages", get(list_messages))
        .route("/api/chat", post(chat))
        .route("/api/stop", post(stop))
        .route("/api/harvest", post(harvest))
        .route("/api/harvest/csv", get(download_csv))
        .route("/api/analyze", post(analyze))
        .fallback_service(static_files)
        .with_state(state)
}

/// Health check endpoint.
async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let llm_ready = state.controller.client().is_available().await;
    Json(serde_json::json!({
        "status": "ok",
        "service": "econews-agent",
        "version": env!("CARGO_PKG_VERSION"),
        "llm_ready": llm_ready,
    }))
}

/// Selectable models.
#[derive(Debug, Serialize)]
pub struct ModelsResponse {
    /// Model identifiers, in display order.
    pub models: Vec<&'static str>,
    /// Preselected model.
    pub default: String,
}

async fn list_models(State(state): State<Arc<AppState>>) -> Json<ModelsResponse> {
    Json(ModelsResponse {
        models: AVAILABLE_MODELS.to_vec(),
        default: state.default_model.clone(),
    })
}

async fn list_messages(State(state): State<Arc<AppState>>) -> Json<Vec<ChatMessage>> {
    let messages = state.session.lock().await.messages().to_vec();
    Json(messages)
}

fn resolve_model(state: &AppState, requested: Option<String>) -> Result<String, ApiError> {
    let model = requested
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| state.default_model.clone());
    if is_known_model(&model) || model == state.default_model {
        Ok(model)
    } else {
        Err(api_error(
            StatusCode::BAD_REQUEST,
            format!("Unknown model: {model}"),
        ))
    }
}

/// Chat request.
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    /// Model to answer with; the default when absent.
    pub model: Option<String>,
    /// The user's message.
    pub message: String,
}

/// Append the user's message and stream the reply as SSE.
async fn chat(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ChatRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if request.message.trim().is_empty() {
        return Err(api_error(StatusCode::BAD_REQUEST, "Message is empty"));
    }
    let model = resolve_model(&state, request.model)?;
    let message = request.message;

    let (mut sink, rx) = ChannelSink::channel(state.cancel.clone());
    tokio::spawn(async move {
        let mut session = state.session.lock().await;
        let result = state
            .controller
            .chat(&mut session, &model, message, &mut sink)
            .await;
        drop(session);
        sink.send(match result {
            Ok(report) => SessionEvent::done(&report),
            Err(err) => SessionEvent::Error {
                message: err.to_string(),
            },
        });
    });

    Ok(sse_response(rx))
}

/// Request a stop of the running generation.
async fn stop(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    state.cancel.request();
    info!("Stop requested");
    Json(serde_json::json!({ "stopped": true }))
}

/// Harvest result.
#[derive(Debug, Serialize)]
pub struct HarvestResponse {
    /// Success banner.
    pub message: String,
    /// Number of articles.
    pub count: usize,
    /// Harvested rows, in crawl order.
    pub rows: Vec<ArticleRecord>,
}

/// Scrape the news listing and keep the CSV for download and analysis.
async fn harvest(State(state): State<Arc<AppState>>) -> Result<Json<HarvestResponse>, ApiError> {
    let records = state.harvester.harvest().await.map_err(|e| {
        error!("Harvest failed: {e}");
        let status = if e.is_network() {
            StatusCode::BAD_GATEWAY
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        api_error(status, format!("Harvest failed: {e}"))
    })?;

    let csv = ArticleTable::from_records(&records)
        .to_csv_bytes()
        .map_err(|e| api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    *state.latest_csv.write().await = Some(csv);

    Ok(Json(HarvestResponse {
        message: "News harvested and CSV generated".to_string(),
        count: records.len(),
        rows: records,
    }))
}

/// Download the last harvest.
async fn download_csv(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    let csv = state
        .latest_csv
        .read()
        .await
        .clone()
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, "No harvested CSV yet"))?;

    Ok((
        [
            (header::CONTENT_TYPE, format!("{CSV_MIME}; charset=utf-8")),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{EXPORT_FILE_NAME}\""),
            ),
        ],
        csv,
    ))
}

/// Analysis query parameters.
#[derive(Debug, Deserialize)]
pub struct AnalyzeParams {
    /// Model to answer with; the default when absent.
    pub model: Option<String>,
}

/// Analyze an uploaded CSV, or the last harvest when the body is empty.
async fn analyze(
    State(state): State<Arc<AppState>>,
    Query(params): Query<AnalyzeParams>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let model = resolve_model(&state, params.model)?;

    let csv = if body.is_empty() {
        state
            .latest_csv
            .read()
            .await
            .clone()
            .ok_or_else(|| api_error(StatusCode::NOT_FOUND, "No CSV uploaded or harvested"))?
    } else {
        body.to_vec()
    };

    let table = ArticleTable::from_csv_bytes(&csv)
        .map_err(|e| api_error(StatusCode::BAD_REQUEST, format!("Cannot read CSV: {e}")))?;
    if !table.has_column(ARTICLE_COLUMN) {
        return Err(api_error(
            StatusCode::UNPROCESSABLE_ENTITY,
            format!("CSV has no '{ARTICLE_COLUMN}' column"),
        ));
    }

    let (mut sink, rx) = ChannelSink::channel(state.cancel.clone());
    sink.send(SessionEvent::table(&table));
    tokio::spawn(async move {
        let mut session = state.session.lock().await;
        let result = state
            .batcher
            .analyze(&mut session, &table, &model, &mut sink)
            .await;
        drop(session);
        sink.send(match result {
            Ok(report) => SessionEvent::analysis_done(&report),
            Err(err) => SessionEvent::Error {
                message: err.to_string(),
            },
        });
    });

    Ok(sse_response(rx))
}
