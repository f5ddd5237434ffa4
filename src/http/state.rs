use crate::session::RecorderHandle;

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Handle to the single recorder controller
    pub recorder: RecorderHandle,
}

impl AppState {
    pub fn new(recorder: RecorderHandle) -> Self {
        Self { recorder }
    }
}
