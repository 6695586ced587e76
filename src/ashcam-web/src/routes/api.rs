//! Read-only viewer endpoints

use crate::{ApiError, AppState};
use ashcam_timeline::{GapReport, TimelineView};
use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;

/// Query parameters for the interesting feed
#[derive(Debug, Deserialize)]
pub struct InterestingQuery {
    #[serde(default)]
    limit: Option<u32>,
}

/// GET /api/timeline
pub async fn get_timeline(State(state): State<AppState>) -> Json<TimelineView> {
    Json(state.navigator.snapshot().await)
}

/// GET /api/gaps
pub async fn get_gaps(State(state): State<AppState>) -> Json<GapReport> {
    Json(state.navigator.gap_report().await)
}

/// GET /api/interesting
///
/// Notable images for this webcam from the server-wide feed, used when the
/// filtered timeline has nothing to show.
pub async fn get_interesting(
    State(state): State<AppState>,
    Query(params): Query<InterestingQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let limit = params.limit.unwrap_or(50).clamp(1, 500);

    let images = state.navigator.interesting_elsewhere(limit).await?;

    Ok(Json(serde_json::json!({
        "images": images,
        "total": images.len(),
        "limit": limit,
    })))
}
