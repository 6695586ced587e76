//! Shared application state

use ashcam_timeline::Navigator;

/// Shared state across all handlers
#[derive(Clone)]
pub struct AppState {
    /// Timeline shared with the auto-refresh task
    pub navigator: Navigator,
}

impl AppState {
    /// Create new application state
    pub fn new(navigator: Navigator) -> Self {
        Self { navigator }
    }
}
