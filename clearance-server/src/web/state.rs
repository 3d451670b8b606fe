//! Application state for the web layer.

use std::sync::Arc;
use std::time::Duration;

use crate::aggregate::CrossingClient;

/// Default deadline for assembling one crossing.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Crossing aggregation client
    pub crossings: Arc<CrossingClient>,

    /// Deadline for each crossing lookup
    pub request_timeout: Duration,
}

impl AppState {
    /// Create a new app state.
    pub fn new(crossings: CrossingClient) -> Self {
        Self {
            crossings: Arc::new(crossings),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}
