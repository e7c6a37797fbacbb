//! Error types for the HTTP server.

use trender_render::RenderError;

use crate::live_reload::WatchError;

/// Server startup or runtime failure.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Initial render failed.
    #[error("Initial render failed: {0}")]
    Render(#[from] RenderError),

    /// File watcher could not be started.
    #[error(transparent)]
    Watch(#[from] WatchError),

    /// Host and port don't form a socket address.
    #[error("Invalid listen address: {0}")]
    Address(#[from] std::net::AddrParseError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
