//! HTTP handlers for the service specification collection.

use axum::{
    Json,
    body::Bytes,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use catalog_core::{BASE_PATH, QueryFilter, ServiceSpecification, factory};
use chrono::Utc;
use serde_json::{Map, Value, json};
use std::time::Instant;
use tracing::field::Empty;
use tracing::{Span, debug, info, instrument};

use crate::AppState;
use crate::error::ApiError;

/// Parse a request body into a field map. An empty body and any JSON value other
/// than an object both count as "no fields".
fn parse_body(body: &[u8]) -> Result<Map<String, Value>, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Map::new());
    }
    match serde_json::from_slice::<Value>(body)? {
        Value::Object(map) => Ok(map),
        _ => Ok(Map::new()),
    }
}

// --- List ---

#[instrument(skip(state, params), fields(filters = params.len(), results = Empty))]
pub async fn list_handler(
    State(state): State<AppState>,
    Query(params): Query<Vec<(String, String)>>,
) -> Response {
    let start = Instant::now();
    let result = list(&state, params).await;
    state.observe("list", start, result)
}

async fn list(state: &AppState, params: Vec<(String, String)>) -> Result<Json<Vec<Value>>, ApiError> {
    let filter = QueryFilter::from_params(params);
    let records = state.store.list().await?;
    let results = filter.apply(&records);

    Span::current().record("results", results.len());
    Ok(Json(results))
}

// --- Create ---

#[instrument(skip(state, headers, body), fields(id = Empty, name = Empty))]
pub async fn create_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let start = Instant::now();
    let result = create(&state, &headers, &body).await;
    state.observe("create", start, result)
}

async fn create(
    state: &AppState,
    headers: &HeaderMap,
    body: &[u8],
) -> Result<(StatusCode, Json<ServiceSpecification>), ApiError> {
    let input = parse_body(body)?;
    let spec = factory::build(&input, &state.links.for_request(headers));
    let stored = state.store.insert(spec).await?;

    state.metrics.spec_count.add(1, &[]);

    let span = Span::current();
    span.record("id", stored.id.as_str());
    span.record("name", stored.name.as_str());
    info!("Created service specification");

    Ok((StatusCode::CREATED, Json(stored)))
}

// --- Get by id ---

#[instrument(skip(state))]
pub async fn get_handler(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let start = Instant::now();
    let result = get(&state, &id).await;
    state.observe("get", start, result)
}

async fn get(state: &AppState, id: &str) -> Result<Json<ServiceSpecification>, ApiError> {
    let spec = state.store.find_by_id(id).await?.ok_or(ApiError::NotFound)?;
    Ok(Json(spec))
}

// --- Update ---

#[instrument(skip(state, headers, body))]
pub async fn update_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let start = Instant::now();
    let result = update(&state, &id, &headers, &body).await;
    state.observe("update", start, result)
}

async fn update(
    state: &AppState,
    id: &str,
    headers: &HeaderMap,
    body: &[u8],
) -> Result<Json<ServiceSpecification>, ApiError> {
    let patch = parse_body(body)?;
    let mut spec = state.store.find_by_id(id).await?.ok_or(ApiError::NotFound)?;

    spec.apply_patch(&patch, &state.links.for_request(headers), Utc::now());

    // The record may have been removed since it was read
    if !state.store.replace(id, spec.clone()).await? {
        return Err(ApiError::NotFound);
    }

    debug!(fields = patch.len(), "Updated service specification");
    Ok(Json(spec))
}

// --- Delete ---

#[instrument(skip(state))]
pub async fn delete_handler(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let start = Instant::now();
    let result = delete(&state, &id).await;
    state.observe("delete", start, result)
}

async fn delete(state: &AppState, id: &str) -> Result<StatusCode, ApiError> {
    if !state.store.remove(id).await? {
        return Err(ApiError::NotFound);
    }

    state.metrics.spec_count.add(-1, &[]);
    info!("Deleted service specification");
    Ok(StatusCode::NO_CONTENT)
}

// --- Service info ---

pub async fn health_handler(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let count = state.store.count().await?;
    Ok(Json(json!({
        "status": "healthy",
        "store": state.store.backend(),
        "specifications": count,
    })))
}

pub async fn version_handler() -> impl IntoResponse {
    Json(json!({
        "version": env!("CARGO_PKG_VERSION"),
        "api": BASE_PATH,
    }))
}
