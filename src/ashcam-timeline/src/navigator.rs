//! Navigation and fetch orchestration
//!
//! Turns viewer actions into fetches against an [`ImageSource`] and commits
//! the results to the shared [`TimelineState`]. Fetches run without holding
//! the state lock; a result is only committed if no wholesale replacement
//! happened while it was in flight.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info};

use crate::aggregate::aggregate;
use crate::error::NavError;
use crate::gaps::{estimate_gaps_with, GapPolicy, GapReport};
use crate::schema::{timestamp_to_date, ImageRecord};
use crate::source::{with_retry, ImageSource, Order, RetryPolicy};
use crate::state::{TimelineState, TimelineView};

/// Fetch sizing and refresh policy
#[derive(Debug, Clone)]
pub struct NavigatorConfig {
    /// Window of the initial load in days
    pub initial_days: u32,
    pub initial_limit: u32,
    /// Default page size for loading older images
    pub page_size: u32,
    /// Extra images fetched past a jump target
    pub jump_buffer: u64,
    /// Maximum size of the initial batch after refresh merges
    pub refresh_cap: usize,
    pub retry: RetryPolicy,
    pub gaps: GapPolicy,
}

impl Default for NavigatorConfig {
    fn default() -> Self {
        Self {
            initial_days: 7,
            initial_limit: 500,
            page_size: 100,
            jump_buffer: 50,
            refresh_cap: 1000,
            retry: RetryPolicy::default(),
            gaps: GapPolicy::default(),
        }
    }
}

/// Where a date-range load will actually start
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum DateRangeStart {
    AsRequested { start: i64 },
    /// The requested start precedes the webcam's first image
    Clamped { requested: i64, earliest: i64 },
}

impl DateRangeStart {
    pub fn start_ts(&self) -> i64 {
        match *self {
            DateRangeStart::AsRequested { start } => start,
            DateRangeStart::Clamped { earliest, .. } => earliest,
        }
    }
}

/// Result of a jump request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JumpOutcome {
    pub position: u64,
    /// Whether the timeline had to be reloaded
    pub fetched: bool,
}

/// Shared handle to one webcam's timeline
#[derive(Clone)]
pub struct Navigator {
    source: Arc<dyn ImageSource>,
    state: Arc<RwLock<TimelineState>>,
    config: NavigatorConfig,
}

impl Navigator {
    pub fn new(source: Arc<dyn ImageSource>, config: NavigatorConfig) -> Self {
        Self {
            source,
            state: Arc::new(RwLock::new(TimelineState::new())),
            config,
        }
    }

    /// Load the most recent images, replacing the current timeline
    ///
    /// Transient failures are retried with backoff. An empty result is not
    /// an error.
    pub async fn load_initial(&self) -> Result<usize, NavError> {
        let generation = self.state.read().await.generation();
        let (days, limit) = (self.config.initial_days, self.config.initial_limit);

        let batch = with_retry(&self.config.retry, || self.source.recent(days, limit)).await?;

        let mut state = self.state.write().await;
        state.ensure_current(generation)?;
        let count = batch.images.len();
        state.replace(batch.images, batch.webcam);
        info!("loaded {} recent images", count);
        Ok(count)
    }

    /// Fetch the page of images just older than the oldest one loaded
    ///
    /// Returns the number of images added. Once a page comes back empty
    /// further calls return 0 without fetching.
    pub async fn load_more(&self, page_size: Option<u32>) -> Result<usize, NavError> {
        let (generation, oldest, earliest) = {
            let state = self.state.read().await;
            if state.exhausted() {
                debug!("no older images left");
                return Ok(0);
            }
            let earliest = state.webcam().and_then(|w| w.earliest_timestamp);
            (state.generation(), state.working().oldest().map(|i| i.timestamp), earliest)
        };

        let Some(oldest) = oldest else {
            return self.load_initial().await;
        };

        let limit = page_size.unwrap_or(self.config.page_size).max(1);
        let batch = self
            .source
            .range(earliest.unwrap_or(0), oldest - 1, limit, Order::NewestFirst)
            .await?;

        let mut state = self.state.write().await;
        state.ensure_current(generation)?;
        let added = state.append_page(batch.images);
        if let Some(webcam) = batch.webcam {
            state.set_webcam(webcam);
        }
        debug!("loaded {} older images", added);
        Ok(added)
    }

    /// Pull images newer than the newest one loaded
    ///
    /// Only runs while the cursor is on the newest loaded image, filtered or
    /// not. Returns the number of new images.
    pub async fn refresh(&self) -> Result<usize, NavError> {
        let (generation, newest) = {
            let state = self.state.read().await;
            let working = state.working();
            let at_newest = state.cursor() == 0
                && (!state.interesting_only()
                    || state.display().first().map(|i| i.id) == working.newest().map(|i| i.id));
            if !at_newest {
                debug!("skipping refresh, viewer is not at the newest image");
                return Ok(0);
            }
            (state.generation(), working.newest().map(|i| i.timestamp))
        };

        let Some(newest) = newest else {
            return self.load_initial().await;
        };

        let limit = u32::try_from(self.config.refresh_cap).unwrap_or(u32::MAX);
        let batch = self
            .source
            .range(newest + 1, Utc::now().timestamp(), limit, Order::NewestFirst)
            .await?;

        let mut state = self.state.write().await;
        state.ensure_current(generation)?;
        if let Some(webcam) = batch.webcam {
            state.set_webcam(webcam);
        }
        let fresh = state.merge_refresh(batch.images, self.config.refresh_cap);
        if fresh > 0 {
            info!("{} new image(s)", fresh);
        }
        Ok(fresh)
    }

    /// Move the cursor to the `position`-th newest image (1-based)
    ///
    /// Positions beyond the loaded images reload the timeline from the
    /// beginning with enough images to reach the target. The interest
    /// filter is switched off since positions count every image.
    pub async fn jump_to(&self, position: i64) -> Result<JumpOutcome, NavError> {
        let (generation, total, loaded) = {
            let state = self.state.read().await;
            let webcam = state.webcam().ok_or(NavError::NoWebcamInfo)?;
            (state.generation(), webcam.image_total, state.working().len())
        };

        if position < 1 || position as u64 > total {
            return Err(NavError::OutOfRange { position, total });
        }
        let position = position as u64;

        if position <= loaded as u64 {
            let mut state = self.state.write().await;
            state.set_interesting_only(false);
            state.set_cursor(position as usize - 1);
            return Ok(JumpOutcome {
                position,
                fetched: false,
            });
        }

        let limit = (position + self.config.jump_buffer).min(total);
        let limit = u32::try_from(limit).unwrap_or(u32::MAX);
        info!("fetching {} images to reach position {}", limit, position);
        let batch = self
            .source
            .range(0, Utc::now().timestamp(), limit, Order::NewestFirst)
            .await?;

        let available = aggregate([batch.images.as_slice()]).len() as u64;
        if available < position {
            return Err(NavError::NotEnoughImages {
                requested: position,
                available,
            });
        }

        let mut state = self.state.write().await;
        state.ensure_current(generation)?;
        state.replace(batch.images, batch.webcam);
        state.set_interesting_only(false);
        state.set_cursor(position as usize - 1);
        Ok(JumpOutcome {
            position,
            fetched: true,
        })
    }

    /// Work out whether `start` has to be clamped to the first image
    pub async fn plan_date_range(&self, start: DateTime<Utc>) -> Result<DateRangeStart, NavError> {
        let state = self.state.read().await;
        let webcam = state.webcam().ok_or(NavError::NoWebcamInfo)?;
        let requested = start.timestamp();

        Ok(match webcam.earliest_timestamp {
            Some(earliest) if requested < earliest => DateRangeStart::Clamped { requested, earliest },
            _ => DateRangeStart::AsRequested { start: requested },
        })
    }

    /// Replace the timeline with every image from `start` until now
    ///
    /// A start before the first image is only accepted with `confirm_clamp`.
    pub async fn load_date_range(
        &self,
        start: DateTime<Utc>,
        confirm_clamp: bool,
    ) -> Result<usize, NavError> {
        let plan = self.plan_date_range(start).await?;
        if let DateRangeStart::Clamped { requested, earliest } = plan {
            if !confirm_clamp {
                return Err(NavError::ClampNotConfirmed { requested, earliest });
            }
            info!("start clamped to first image at {}", timestamp_to_date(earliest));
        }

        let (generation, total) = {
            let state = self.state.read().await;
            let total = state.webcam().map(|w| w.image_total).unwrap_or(0);
            (state.generation(), total)
        };

        let limit = u32::try_from(total.max(1)).unwrap_or(u32::MAX);
        let batch = self
            .source
            .range(plan.start_ts(), Utc::now().timestamp(), limit, Order::NewestFirst)
            .await?;

        if batch.images.is_empty() {
            return Err(NavError::Empty(format!(
                "since {}",
                timestamp_to_date(plan.start_ts()).format("%Y-%m-%d %H:%M UTC")
            )));
        }

        let mut state = self.state.write().await;
        state.ensure_current(generation)?;
        let count = batch.images.len();
        state.replace(batch.images, batch.webcam);
        info!("loaded {} images since {}", count, timestamp_to_date(plan.start_ts()));
        Ok(count)
    }

    /// Move the cursor within the displayed images (0-based)
    pub async fn set_cursor(&self, cursor: usize) -> Result<(), NavError> {
        let mut state = self.state.write().await;
        let shown = state.display().len();
        if cursor >= shown {
            return Err(NavError::OutOfRange {
                position: cursor as i64 + 1,
                total: shown as u64,
            });
        }
        state.set_cursor(cursor);
        Ok(())
    }

    pub async fn set_interesting_only(&self, interesting_only: bool) {
        self.state.write().await.set_interesting_only(interesting_only);
    }

    /// Notable images for this webcam from the server-wide interesting feed
    ///
    /// This is a separate data source for when the filtered timeline is
    /// empty; the results are not merged into the timeline.
    pub async fn interesting_elsewhere(&self, limit: u32) -> Result<Vec<ImageRecord>, NavError> {
        let code = {
            let state = self.state.read().await;
            state.webcam().map(|w| w.webcam_code.clone())
        };

        let batch = self.source.interesting(limit).await?;
        let images: Vec<ImageRecord> = batch
            .images
            .into_iter()
            .filter(|image| image.is_interesting())
            .filter(|image| match (&code, &image.webcam_code) {
                (Some(ours), Some(theirs)) if !ours.is_empty() => ours == theirs,
                _ => true,
            })
            .collect();

        Ok(aggregate([images]).into_vec())
    }

    pub async fn snapshot(&self) -> TimelineView {
        self.state.read().await.view()
    }

    /// Missing slots and coverage for the displayed images
    pub async fn gap_report(&self) -> GapReport {
        let display = self.state.read().await.display();
        estimate_gaps_with(&display, &self.config.gaps)
    }

    /// Refresh every `period` until `shutdown` is set
    pub async fn run_refresh_loop(&self, period: Duration, shutdown: Arc<AtomicBool>) {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await;

        info!("auto-refresh every {:?}", period);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match self.refresh().await {
                        Ok(n) => debug!("refresh tick done, {} new", n),
                        Err(e) => error!("refresh failed: {}", e),
                    }
                }
                _ = async {
                    while !shutdown.load(Ordering::SeqCst) {
                        tokio::time::sleep(Duration::from_millis(100)).await;
                    }
                } => {
                    info!("auto-refresh stopped");
                    break;
                }
            }
        }
    }
}
