//! Fetch and navigation error types

use thiserror::Error;

/// Failure talking to the remote image API
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Transport(String),

    #[error("{url} returned status {status}")]
    Status { status: u16, url: String },

    #[error("invalid response body: {0}")]
    Decode(String),
}

impl FetchError {
    /// Whether an automatic retry may succeed
    pub fn is_transient(&self) -> bool {
        match self {
            FetchError::Transport(_) => true,
            FetchError::Status { status, .. } => *status >= 500 || *status == 429,
            FetchError::Decode(_) => false,
        }
    }
}

/// Failure of a navigation action; state is left unchanged in every case
#[derive(Error, Debug)]
pub enum NavError {
    #[error("position {position} is outside 1..={total}")]
    OutOfRange { position: i64, total: u64 },

    #[error("requested image {requested} but only {available} are available")]
    NotEnoughImages { requested: u64, available: u64 },

    #[error("no images found {0}")]
    Empty(String),

    #[error("start {requested} precedes the earliest image at {earliest}; confirm to load from the earliest image")]
    ClampNotConfirmed { requested: i64, earliest: i64 },

    #[error("webcam metadata not loaded yet")]
    NoWebcamInfo,

    #[error("result discarded: timeline was replaced while the request was in flight")]
    Stale,

    #[error(transparent)]
    Fetch(#[from] FetchError),
}
