//! ashcam-timeline - Image timeline core for the ashcam viewer
//!
//! Reconciles overlapping image batches into one ordered working set,
//! estimates missing capture slots and drives navigation fetches.

mod aggregate;
mod error;
mod filter;
mod gaps;
mod navigator;
mod schema;
mod source;
mod state;

pub use aggregate::{aggregate, WorkingSet};
pub use error::{FetchError, NavError};
pub use filter::filter_interesting;
pub use gaps::*;
pub use navigator::*;
pub use schema::*;
pub use source::*;
pub use state::{TimelineState, TimelineView};
