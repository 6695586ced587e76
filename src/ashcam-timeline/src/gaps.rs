//! Missing capture slot estimation
//!
//! Captures are nominally taken every 15 minutes but drift by a few
//! minutes either way. Gaps up to one interval plus the tolerance count as
//! continuous; longer gaps are walked in whole intervals to count the
//! slots that were never captured. This is a heuristic: the server does
//! not publish its capture schedule.

use serde::{Deserialize, Serialize};

use crate::schema::{CoverageStats, ImageRecord, MissingSlot};

/// Nominal capture cadence in seconds
pub const EXPECTED_INTERVAL_SECS: i64 = 900;

/// Allowed jitter around a slot in seconds
pub const TOLERANCE_SECS: i64 = 180;

/// Upper bound on reported slots, about 28 years of 15 minute captures
pub const MAX_MISSING_SLOTS: usize = 1_000_000;

/// Capture cadence used to derive expected slots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GapPolicy {
    pub expected_interval_secs: i64,
    pub tolerance_secs: i64,
}

impl Default for GapPolicy {
    fn default() -> Self {
        Self {
            expected_interval_secs: EXPECTED_INTERVAL_SECS,
            tolerance_secs: TOLERANCE_SECS,
        }
    }
}

impl GapPolicy {
    /// Largest spacing between two captures that is not a gap
    pub fn threshold_secs(&self) -> i64 {
        self.expected_interval_secs.saturating_add(self.tolerance_secs)
    }
}

/// Missing slots, newest first, and coverage for a display set
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GapReport {
    pub missing: Vec<MissingSlot>,
    /// `None` when fewer than two images are available
    pub stats: Option<CoverageStats>,
}

/// Estimate gaps with the default 15 minute cadence
pub fn estimate_gaps(images: &[ImageRecord]) -> GapReport {
    estimate_gaps_with(images, &GapPolicy::default())
}

/// Estimate gaps with an explicit cadence
///
/// Input order does not matter. Images sharing a timestamp occupy a
/// single slot for the walk but each counts as an actual capture. A span
/// too wide for `i64` is a gap, and the walk stops at the edge of the
/// timestamp range or after [`MAX_MISSING_SLOTS`] slots.
pub fn estimate_gaps_with(images: &[ImageRecord], policy: &GapPolicy) -> GapReport {
    if images.len() < 2 {
        return GapReport::default();
    }

    let mut timestamps: Vec<i64> = images.iter().map(|i| i.timestamp).collect();
    timestamps.sort_unstable();

    let mut missing = Vec::new();
    if policy.expected_interval_secs > 0 {
        'walk: for pair in timestamps.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            if matches!(b.checked_sub(a), Some(spacing) if spacing <= policy.threshold_secs()) {
                continue;
            }

            let limit = b.saturating_sub(policy.tolerance_secs);
            let mut next = a.checked_add(policy.expected_interval_secs);
            while let Some(slot) = next.filter(|slot| *slot < limit) {
                if missing.len() == MAX_MISSING_SLOTS {
                    break 'walk;
                }
                missing.push(MissingSlot::at(slot));
                next = slot.checked_add(policy.expected_interval_secs);
            }
        }
    }

    missing.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

    let actual_count = images.len();
    let missing_count = missing.len();
    let expected_count = actual_count + missing_count;
    let coverage = actual_count as f64 / expected_count as f64 * 100.0;

    GapReport {
        missing,
        stats: Some(CoverageStats {
            expected_count,
            actual_count,
            missing_count,
            coverage_percent: (coverage * 10.0).round() / 10.0,
        }),
    }
}
