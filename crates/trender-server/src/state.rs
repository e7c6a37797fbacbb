//! Application state.
//!
//! Shared state for all request handlers.

use std::path::PathBuf;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::live_reload::NotificationHub;

/// Application state shared across all handlers.
pub(crate) struct AppState {
    /// Rendered output served at `/`.
    pub(crate) output_path: PathBuf,
    /// Directory served under `/img`.
    pub(crate) img_dir: PathBuf,
    /// Reload notifications for event streams.
    pub(crate) hub: Arc<NotificationHub>,
    /// Cancelled on server shutdown to end open event streams.
    pub(crate) shutdown: CancellationToken,
}
