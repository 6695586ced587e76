//! Image source abstraction and retry policy

use std::fmt;
use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::FetchError;
use crate::schema::ImageBatch;

/// Ordering requested from the server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Order {
    NewestFirst,
    OldestFirst,
}

impl Order {
    pub fn as_str(&self) -> &'static str {
        match self {
            Order::NewestFirst => "newestFirst",
            Order::OldestFirst => "oldestFirst",
        }
    }
}

impl fmt::Display for Order {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Remote provider of image batches for one webcam
#[async_trait]
pub trait ImageSource: Send + Sync {
    /// Most recent images from the last `days` days
    async fn recent(&self, days: u32, limit: u32) -> Result<ImageBatch, FetchError>;

    /// Images with `start_ts <= timestamp <= end_ts`
    async fn range(
        &self,
        start_ts: i64,
        end_ts: i64,
        limit: u32,
        order: Order,
    ) -> Result<ImageBatch, FetchError>;

    /// Interesting images across all webcams
    async fn interesting(&self, limit: u32) -> Result<ImageBatch, FetchError>;
}

/// Bounded exponential backoff for transient fetch failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one
    pub attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            base_delay: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `retry` (0-based)
    pub fn delay(&self, retry: u32) -> Duration {
        self.base_delay.saturating_mul(1u32 << retry.min(16))
    }
}

/// Run `op` until it succeeds, fails permanently or runs out of attempts
pub async fn with_retry<T, F, Fut>(policy: &RetryPolicy, mut op: F) -> Result<T, FetchError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, FetchError>>,
{
    let attempts = policy.attempts.max(1);
    let mut attempt = 0;

    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() && attempt + 1 < attempts => {
                let delay = policy.delay(attempt);
                warn!(
                    "fetch failed (attempt {}/{}): {}, retrying in {:?}",
                    attempt + 1,
                    attempts,
                    e,
                    delay
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
