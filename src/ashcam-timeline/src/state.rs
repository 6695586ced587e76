//! Raw batch state behind the working set
//!
//! The initial batch and any pagination batches are kept as fetched. The
//! working set is rebuilt from them after every change and published as a
//! fresh `Arc`, so readers holding an older set never see it change.

use std::collections::HashSet;
use std::iter;
use std::sync::Arc;

use serde::Serialize;

use crate::aggregate::{aggregate, WorkingSet};
use crate::error::NavError;
use crate::filter::filter_interesting;
use crate::schema::{ImageRecord, WebcamInfo};

#[derive(Debug, Default)]
pub struct TimelineState {
    initial: Vec<ImageRecord>,
    pages: Vec<Vec<ImageRecord>>,
    generation: u64,
    working: Arc<WorkingSet>,
    webcam: Option<WebcamInfo>,
    cursor: usize,
    interesting_only: bool,
    exhausted: bool,
}

/// Point-in-time copy of what the viewer displays
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineView {
    pub webcam: Option<WebcamInfo>,
    pub images: Vec<ImageRecord>,
    pub cursor: usize,
    pub current: Option<ImageRecord>,
    pub loaded: usize,
    pub interesting_only: bool,
    pub exhausted: bool,
    pub generation: u64,
}

impl TimelineState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bumped whenever the batches are replaced wholesale
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn working(&self) -> Arc<WorkingSet> {
        Arc::clone(&self.working)
    }

    pub fn webcam(&self) -> Option<&WebcamInfo> {
        self.webcam.as_ref()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn interesting_only(&self) -> bool {
        self.interesting_only
    }

    /// Set once a pagination fetch comes back empty
    pub fn exhausted(&self) -> bool {
        self.exhausted
    }

    /// Images after the interest filter
    pub fn display(&self) -> Vec<ImageRecord> {
        filter_interesting(&self.working, self.interesting_only).into_owned()
    }

    pub fn view(&self) -> TimelineView {
        let images = self.display();
        let current = images.get(self.cursor).cloned();
        TimelineView {
            webcam: self.webcam.clone(),
            current,
            images,
            cursor: self.cursor,
            loaded: self.working.len(),
            interesting_only: self.interesting_only,
            exhausted: self.exhausted,
            generation: self.generation,
        }
    }

    /// Reject results fetched against an earlier generation
    pub fn ensure_current(&self, generation: u64) -> Result<(), NavError> {
        if generation == self.generation {
            Ok(())
        } else {
            Err(NavError::Stale)
        }
    }

    /// Discard every batch and start over from `images`
    pub fn replace(&mut self, images: Vec<ImageRecord>, webcam: Option<WebcamInfo>) {
        self.initial = images;
        self.pages.clear();
        self.generation += 1;
        self.cursor = 0;
        self.exhausted = false;
        if webcam.is_some() {
            self.webcam = webcam;
        }
        self.rebuild();
    }

    /// Add one page of older images
    ///
    /// Returns the number of images not already in the working set.
    pub fn append_page(&mut self, images: Vec<ImageRecord>) -> usize {
        if images.is_empty() {
            self.exhausted = true;
            return 0;
        }

        let before = self.working.len();
        self.pages.push(images);
        self.rebuild();
        self.working.len() - before
    }

    /// Fold newer images into the initial batch, keeping at most `cap` of it
    ///
    /// Only the initial batch is capped; pagination batches stay as they
    /// are. Once refreshes have pushed images out of the initial batch, the
    /// span between it and the oldest pages has no images and shows up as
    /// missing slots in a gap report until the timeline is replaced.
    ///
    /// Returns the number of images that were not known before.
    pub fn merge_refresh(&mut self, images: Vec<ImageRecord>, cap: usize) -> usize {
        let known: HashSet<i64> = self.working.iter().map(|i| i.id).collect();
        let fresh = images.iter().filter(|image| !known.contains(&image.id)).count();
        if fresh == 0 {
            return 0;
        }

        let mut merged = aggregate([self.initial.as_slice(), images.as_slice()]).into_vec();
        merged.truncate(cap.max(1));
        self.initial = merged;
        self.rebuild();
        fresh
    }

    pub fn set_webcam(&mut self, webcam: WebcamInfo) {
        self.webcam = Some(webcam);
    }

    pub fn set_cursor(&mut self, cursor: usize) {
        self.cursor = cursor;
    }

    pub fn set_interesting_only(&mut self, interesting_only: bool) {
        self.interesting_only = interesting_only;
        self.cursor = 0;
    }

    fn rebuild(&mut self) {
        let batches = iter::once(&self.initial).chain(self.pages.iter());
        self.working = Arc::new(aggregate(batches));
        let shown = if self.interesting_only {
            self.working.iter().filter(|i| i.is_interesting()).count()
        } else {
            self.working.len()
        };
        if self.cursor >= shown {
            self.cursor = shown.saturating_sub(1);
        }
    }
}
