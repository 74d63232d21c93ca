// src/api.rs
//! Consumer HTTP boundary for the pipeline: current items, cache snapshot,
//! cache management, export. The presentation layer lives elsewhere and
//! only consumes these shapes.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tower_http::cors::CorsLayer;

use crate::cache::{CacheInfo, ExportRecord, ImportError};
use crate::item::IntelItem;
use crate::pipeline::{Aggregator, PipelineError};

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<Aggregator>,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/news", get(news))
        .route("/news/cached", get(cached_news))
        .route("/cache/info", get(cache_info))
        .route("/cache/clear", post(clear_cache))
        .route("/cache/import", post(import_cache))
        .route("/export", get(export))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

#[derive(serde::Serialize)]
struct NewsResponse {
    items: Vec<IntelItem>,
    /// Set when the pass produced nothing and no cache exists; the
    /// condition is recoverable and the empty list is intentional.
    #[serde(skip_serializing_if = "Option::is_none")]
    advisory: Option<String>,
}

async fn news(
    State(state): State<AppState>,
    Query(q): Query<HashMap<String, String>>,
) -> Json<NewsResponse> {
    let force = q
        .get("refresh")
        .map(|v| v == "true" || v == "1")
        .unwrap_or(false);

    match state.engine.fetch_news(force).await {
        Ok(items) => Json(NewsResponse {
            items,
            advisory: None,
        }),
        Err(e @ PipelineError::NoSourcesAvailable) => Json(NewsResponse {
            items: Vec::new(),
            advisory: Some(e.to_string()),
        }),
    }
}

async fn cached_news(State(state): State<AppState>) -> Json<Vec<IntelItem>> {
    Json(state.engine.cache().get())
}

async fn cache_info(State(state): State<AppState>) -> Json<CacheInfo> {
    Json(state.engine.cache_info())
}

async fn clear_cache(State(state): State<AppState>) -> &'static str {
    state.engine.cache().clear();
    "cleared"
}

async fn import_cache(
    State(state): State<AppState>,
    Json(payload): Json<serde_json::Value>,
) -> Result<String, (StatusCode, String)> {
    match state.engine.cache().import(payload) {
        Ok(count) => Ok(format!("imported {count} items")),
        Err(e @ ImportError::VersionMismatch { .. }) => {
            Err((StatusCode::CONFLICT, e.to_string()))
        }
        Err(e @ ImportError::Malformed(_)) => Err((StatusCode::BAD_REQUEST, e.to_string())),
    }
}

async fn export(State(state): State<AppState>) -> Json<ExportRecord> {
    Json(state.engine.cache().export())
}
