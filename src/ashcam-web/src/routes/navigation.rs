//! Navigation actions that fetch and reshape the timeline

use crate::{ApiError, AppState};
use ashcam_timeline::JumpOutcome;
use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;

#[derive(Debug, Default, Deserialize)]
pub struct LoadMoreRequest {
    #[serde(default)]
    page_size: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct JumpRequest {
    position: i64,
}

#[derive(Debug, Deserialize)]
pub struct DateRangeRequest {
    start: DateTime<Utc>,
    #[serde(default)]
    confirm_clamp: bool,
}

#[derive(Debug, Deserialize)]
pub struct CursorRequest {
    position: usize,
}

#[derive(Debug, Deserialize)]
pub struct FilterRequest {
    interesting_only: bool,
}

/// POST /api/load-more
pub async fn load_more(
    State(state): State<AppState>,
    body: Option<Json<LoadMoreRequest>>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let request = body.map(|Json(b)| b).unwrap_or_default();
    let added = state.navigator.load_more(request.page_size).await?;
    let view = state.navigator.snapshot().await;

    Ok(Json(json!({
        "added": added,
        "loaded": view.loaded,
        "exhausted": view.exhausted,
    })))
}

/// POST /api/refresh
pub async fn refresh(State(state): State<AppState>) -> Result<Json<serde_json::Value>, ApiError> {
    let fresh = state.navigator.refresh().await?;

    Ok(Json(json!({
        "new_images": fresh,
    })))
}

/// POST /api/jump
pub async fn jump(
    State(state): State<AppState>,
    Json(request): Json<JumpRequest>,
) -> Result<Json<JumpOutcome>, ApiError> {
    let outcome = state.navigator.jump_to(request.position).await?;
    Ok(Json(outcome))
}

/// POST /api/date-range
///
/// Answers 409 with the earliest available timestamp when the start has to
/// be clamped and `confirm_clamp` is not set.
pub async fn date_range(
    State(state): State<AppState>,
    Json(request): Json<DateRangeRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let loaded = state
        .navigator
        .load_date_range(request.start, request.confirm_clamp)
        .await?;

    Ok(Json(json!({
        "loaded": loaded,
    })))
}

/// POST /api/cursor
pub async fn set_cursor(
    State(state): State<AppState>,
    Json(request): Json<CursorRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state.navigator.set_cursor(request.position).await?;
    let view = state.navigator.snapshot().await;

    Ok(Json(json!({
        "cursor": view.cursor,
        "current": view.current,
    })))
}

/// POST /api/filter
pub async fn set_filter(
    State(state): State<AppState>,
    Json(request): Json<FilterRequest>,
) -> Json<serde_json::Value> {
    state.navigator.set_interesting_only(request.interesting_only).await;
    let view = state.navigator.snapshot().await;

    Json(json!({
        "interesting_only": view.interesting_only,
        "shown": view.images.len(),
    }))
}
