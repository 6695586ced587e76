//! ashcam-client - HTTP access to the ashcam image API
//!
//! Implements [`ImageSource`] for one webcam on top of `reqwest`.

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use ashcam_timeline::{FetchError, ImageBatch, ImageSource, Order};

/// Public USGS ashcam image API
pub const DEFAULT_BASE_URL: &str = "https://volcview.wr.usgs.gov/ashcam-api/imageApi";

/// Client bound to a single webcam code
#[derive(Debug, Clone)]
pub struct AshcamClient {
    http: reqwest::Client,
    base_url: String,
    webcam: String,
}

impl AshcamClient {
    pub fn new(base_url: &str, webcam: &str, timeout: Duration) -> Result<Self, FetchError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("ashcam-viewer/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            webcam: webcam.to_string(),
        })
    }

    pub fn recent_url(&self, days: u32, limit: u32) -> String {
        format!(
            "{}/webcam/{}/{}/{}/{}",
            self.base_url,
            self.webcam,
            days,
            Order::NewestFirst,
            limit
        )
    }

    pub fn range_url(&self, start_ts: i64, end_ts: i64, limit: u32, order: Order) -> String {
        format!(
            "{}/webcam/{}/{}/{}/{}/{}",
            self.base_url, self.webcam, start_ts, end_ts, order, limit
        )
    }

    pub fn interesting_url(&self, limit: u32) -> String {
        format!("{}/interesting/{}", self.base_url, limit)
    }

    async fn fetch(&self, url: String) -> Result<ImageBatch, FetchError> {
        debug!("GET {}", url);

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                url,
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        let batch = decode_batch(&body)?;
        debug!("{} images from {}", batch.images.len(), url);
        Ok(batch)
    }
}

#[async_trait]
impl ImageSource for AshcamClient {
    async fn recent(&self, days: u32, limit: u32) -> Result<ImageBatch, FetchError> {
        self.fetch(self.recent_url(days, limit)).await
    }

    async fn range(
        &self,
        start_ts: i64,
        end_ts: i64,
        limit: u32,
        order: Order,
    ) -> Result<ImageBatch, FetchError> {
        self.fetch(self.range_url(start_ts, end_ts, limit, order)).await
    }

    async fn interesting(&self, limit: u32) -> Result<ImageBatch, FetchError> {
        self.fetch(self.interesting_url(limit)).await
    }
}

/// Decode one API response body
pub fn decode_batch(body: &[u8]) -> Result<ImageBatch, FetchError> {
    serde_json::from_slice(body).map_err(|e| FetchError::Decode(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ashcam_timeline::InterestingCode;

    fn client() -> AshcamClient {
        AshcamClient::new(
            "https://volcview.wr.usgs.gov/ashcam-api/imageApi/",
            "ys-bbsn",
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[test]
    fn test_recent_url() {
        assert_eq!(
            client().recent_url(1, 2),
            "https://volcview.wr.usgs.gov/ashcam-api/imageApi/webcam/ys-bbsn/1/newestFirst/2"
        );
    }

    #[test]
    fn test_range_url() {
        assert_eq!(
            client().range_url(100, 200, 50, Order::OldestFirst),
            "https://volcview.wr.usgs.gov/ashcam-api/imageApi/webcam/ys-bbsn/100/200/oldestFirst/50"
        );
    }

    #[test]
    fn test_interesting_url() {
        assert_eq!(
            client().interesting_url(20),
            "https://volcview.wr.usgs.gov/ashcam-api/imageApi/interesting/20"
        );
    }

    #[test]
    fn test_decode_batch() {
        let body = br#"{
            "webcam": {
                "webcamCode": "ys-bbsn",
                "webcamName": "Black Sand Basin",
                "imageTotal": 3,
                "firstImageTimestamp": 1699990000,
                "lastImageTimestamp": 1700000900
            },
            "images": [
                {
                    "imageId": 2,
                    "imageTimestamp": 1700000900,
                    "imageUrl": "https://example.org/2.jpg",
                    "interestingCode": "V",
                    "isNightImage": "N"
                },
                {
                    "imageId": 1,
                    "imageTimestamp": 1700000000,
                    "imageUrl": "https://example.org/1.jpg",
                    "interestingCode": null,
                    "isNightImage": true
                }
            ],
            "imageCount": 2,
            "responseTimeMs": 12
        }"#;

        let batch = decode_batch(body).unwrap();
        assert_eq!(batch.images.len(), 2);
        assert_eq!(batch.image_count, Some(2));
        assert_eq!(batch.images[0].interesting_code, InterestingCode::Volcanic);
        assert!(!batch.images[0].is_night);
        assert!(batch.images[1].is_night);
        assert_eq!(batch.webcam.unwrap().image_total, 3);
    }

    #[test]
    fn test_decode_without_webcam() {
        let batch = decode_batch(br#"{"images": []}"#).unwrap();
        assert!(batch.images.is_empty());
        assert!(batch.webcam.is_none());
    }

    #[test]
    fn test_decode_error() {
        let err = decode_batch(b"<html>busy</html>").unwrap_err();
        assert!(matches!(err, FetchError::Decode(_)));
        assert!(!err.is_transient());
    }

    #[tokio::test]
    async fn test_unreachable_host_is_transient() {
        let client = AshcamClient::new("http://127.0.0.1:9", "ys-bbsn", Duration::from_secs(2)).unwrap();
        let err = client.recent(1, 1).await.unwrap_err();
        assert!(err.is_transient());
    }
}
