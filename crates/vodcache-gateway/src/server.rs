//! HTTP server for the gateway endpoints
//!
//! Provides /health, /api/search, /api/detail, and /image/{size}/{filename}.

use crate::error::GatewayError;
use crate::service::{SharedState, DETAIL_PARTITION, SEARCH_PARTITION};
use crate::types::HealthResponse;
use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use chrono::Utc;
use serde::Deserialize;
use tower_http::cors::CorsLayer;
use tracing::info;

#[derive(Debug, Deserialize)]
struct SearchQuery {
    site: String,
    wd: String,
}

#[derive(Debug, Deserialize)]
struct DetailQuery {
    site: String,
    ids: String,
}

/// Create the HTTP router
pub fn create_router(state: SharedState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/search", get(search))
        .route("/api/detail", get(detail))
        .route("/image/{size}/{filename}", get(image))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Start the HTTP server
pub async fn start_server(state: SharedState, port: u16) -> std::io::Result<()> {
    let router = create_router(state);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await
}

/// Health check endpoint
async fn health(State(state): State<SharedState>) -> Json<HealthResponse> {
    let uptime_secs = (Utc::now() - state.started_at).num_seconds() as u64;
    let search_entries = state.store.len(SEARCH_PARTITION).await.unwrap_or(0);
    let detail_entries = state.store.len(DETAIL_PARTITION).await.unwrap_or(0);

    Json(HealthResponse {
        status: "ok".to_string(),
        uptime_secs,
        search_entries,
        detail_entries,
    })
}

/// Search a site by keyword, served through the TTL store
async fn search(
    State(state): State<SharedState>,
    Query(query): Query<SearchQuery>,
) -> Result<Response, GatewayError> {
    let payload = state.search_or_fetch(&query.site, &query.wd).await?;
    Ok(Json(payload).into_response())
}

/// Fetch a detail record by id, served through the TTL store
async fn detail(
    State(state): State<SharedState>,
    Query(query): Query<DetailQuery>,
) -> Result<Response, GatewayError> {
    let payload = state.detail_or_fetch(&query.site, &query.ids).await?;
    Ok(Json(payload).into_response())
}

/// Serve an image through the disk cache
async fn image(
    State(state): State<SharedState>,
    Path((size, filename)): Path<(String, String)>,
) -> Result<Response, GatewayError> {
    let (bytes, from_cache) = state.image_or_fetch(&size, &filename).await?;
    let cache_header = if from_cache { "HIT" } else { "MISS" };

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type_for(&filename))
        .header(header::CACHE_CONTROL, "public, max-age=86400")
        .header("X-Cache", cache_header)
        .body(Body::from(bytes))
        .map_err(|e| GatewayError::Internal(e.to_string()))
}

/// Content type from the filename extension; the CDN serves static images
/// so the extension is authoritative
fn content_type_for(filename: &str) -> &'static str {
    match filename.rsplit('.').next().map(|ext| ext.to_ascii_lowercase()) {
        Some(ext) if ext == "jpg" || ext == "jpeg" => "image/jpeg",
        Some(ext) if ext == "png" => "image/png",
        Some(ext) if ext == "gif" => "image/gif",
        Some(ext) if ext == "webp" => "image/webp",
        _ => "application/octet-stream",
    }
}
