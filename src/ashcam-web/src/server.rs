//! Axum server setup and routing

use crate::routes;
use crate::state::AppState;
use ashcam_timeline::Navigator;
use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::path::PathBuf;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Build the viewer router
///
/// `static_dir`, when given, serves the browser front end from disk.
pub fn router(state: AppState, static_dir: Option<PathBuf>) -> Router {
    let mut app = Router::new()
        // Read-only views
        .route("/api/timeline", get(routes::get_timeline))
        .route("/api/gaps", get(routes::get_gaps))
        .route("/api/interesting", get(routes::get_interesting))
        // Navigation actions
        .route("/api/load-more", post(routes::load_more))
        .route("/api/refresh", post(routes::refresh))
        .route("/api/jump", post(routes::jump))
        .route("/api/date-range", post(routes::date_range))
        .route("/api/cursor", post(routes::set_cursor))
        .route("/api/filter", post(routes::set_filter))
        .with_state(state);

    if let Some(dir) = static_dir {
        app = app.fallback_service(ServeDir::new(dir));
    }

    app.layer(
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any),
    )
    .layer(TraceLayer::new_for_http())
}

/// Start the web server
pub async fn serve(
    navigator: Navigator,
    port: u16,
    static_dir: Option<PathBuf>,
) -> anyhow::Result<()> {
    let app = router(AppState::new(navigator), static_dir);

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    info!("starting ashcam viewer on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ashcam_timeline::{
        FetchError, ImageBatch, ImageRecord, ImageSource, InterestingCode, NavigatorConfig, Order,
        WebcamInfo,
    };
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use serde_json::Value;
    use std::sync::Arc;
    use tower::ServiceExt;

    /// Serves the same fixed timeline for every request
    struct FixedSource {
        images: Vec<ImageRecord>,
    }

    impl FixedSource {
        fn batch(&self) -> ImageBatch {
            ImageBatch {
                images: self.images.clone(),
                webcam: Some(WebcamInfo {
                    webcam_code: "ys-bbsn".to_string(),
                    webcam_name: "Black Sand Basin".to_string(),
                    image_total: self.images.len() as u64,
                    earliest_timestamp: self.images.last().map(|i| i.timestamp),
                    latest_timestamp: self.images.first().map(|i| i.timestamp),
                }),
                image_count: Some(self.images.len() as u64),
            }
        }
    }

    #[async_trait]
    impl ImageSource for FixedSource {
        async fn recent(&self, _days: u32, _limit: u32) -> Result<ImageBatch, FetchError> {
            Ok(self.batch())
        }

        async fn range(
            &self,
            start_ts: i64,
            end_ts: i64,
            _limit: u32,
            _order: Order,
        ) -> Result<ImageBatch, FetchError> {
            let mut batch = self.batch();
            batch
                .images
                .retain(|i| i.timestamp >= start_ts && i.timestamp <= end_ts);
            Ok(batch)
        }

        async fn interesting(&self, _limit: u32) -> Result<ImageBatch, FetchError> {
            let mut batch = self.batch();
            batch.images.retain(|i| i.is_interesting());
            Ok(batch)
        }
    }

    const T: i64 = 1_700_000_000;

    fn image(id: i64, timestamp: i64, notable: bool) -> ImageRecord {
        ImageRecord {
            id,
            timestamp,
            url: format!("https://example.org/{}.jpg", id),
            interesting_code: if notable {
                InterestingCode::Volcanic
            } else {
                InterestingCode::Unset
            },
            is_night: false,
            webcam_code: Some("ys-bbsn".to_string()),
        }
    }

    async fn app() -> Router {
        let source = FixedSource {
            images: vec![
                image(4, T + 2700, false),
                image(2, T + 900, true),
                image(1, T, false),
            ],
        };
        let navigator = Navigator::new(Arc::new(source), NavigatorConfig::default());
        navigator.load_initial().await.unwrap();
        router(AppState::new(navigator), None)
    }

    async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(json) => {
                builder = builder.header("content-type", "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        let response = app
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    #[tokio::test]
    async fn test_timeline() {
        let app = app().await;
        let (status, body) = send(&app, "GET", "/api/timeline", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["images"].as_array().unwrap().len(), 3);
        assert_eq!(body["current"]["imageId"], 4);
        assert_eq!(body["webcam"]["imageTotal"], 3);
    }

    #[tokio::test]
    async fn test_gaps() {
        let app = app().await;
        let (status, body) = send(&app, "GET", "/api/gaps", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["missing"][0]["timestamp"], T + 1800);
        assert_eq!(body["stats"]["coveragePercent"], 75.0);
        assert_eq!(body["stats"]["expectedCount"], 4);
    }

    #[tokio::test]
    async fn test_gaps_without_enough_images() {
        let app = app().await;
        send(&app, "POST", "/api/filter", Some(serde_json::json!({"interesting_only": true}))).await;

        let (status, body) = send(&app, "GET", "/api/gaps", None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["missing"].as_array().unwrap().is_empty());
        assert!(body["stats"].is_null());
    }

    #[tokio::test]
    async fn test_jump() {
        let app = app().await;
        let (status, body) =
            send(&app, "POST", "/api/jump", Some(serde_json::json!({"position": 2}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["fetched"], false);

        let (_, timeline) = send(&app, "GET", "/api/timeline", None).await;
        assert_eq!(timeline["current"]["imageId"], 2);
    }

    #[tokio::test]
    async fn test_jump_out_of_range() {
        let app = app().await;
        let (status, body) =
            send(&app, "POST", "/api/jump", Some(serde_json::json!({"position": 4}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "BadRequest");
    }

    #[tokio::test]
    async fn test_date_range_needs_confirmation() {
        let app = app().await;
        let (status, body) = send(
            &app,
            "POST",
            "/api/date-range",
            Some(serde_json::json!({"start": "2000-01-01T00:00:00Z"})),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"], "Conflict");

        let (status, body) = send(
            &app,
            "POST",
            "/api/date-range",
            Some(serde_json::json!({"start": "2000-01-01T00:00:00Z", "confirm_clamp": true})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["loaded"], 3);
    }

    #[tokio::test]
    async fn test_load_more_without_body() {
        let app = app().await;
        let (status, body) = send(&app, "POST", "/api/load-more", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["added"], 0);
        assert_eq!(body["exhausted"], true);
    }

    #[tokio::test]
    async fn test_cursor_bounds() {
        let app = app().await;
        let (status, body) =
            send(&app, "POST", "/api/cursor", Some(serde_json::json!({"position": 1}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["current"]["imageId"], 2);

        let (status, _) =
            send(&app, "POST", "/api/cursor", Some(serde_json::json!({"position": 3}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_interesting_feed() {
        let app = app().await;
        let (status, body) = send(&app, "GET", "/api/interesting?limit=10", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total"], 1);
        assert_eq!(body["images"][0]["imageId"], 2);
    }
}
