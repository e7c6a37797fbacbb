//! Ties a successful render to a reload broadcast.

use std::sync::{Arc, Mutex, PoisonError};

use trender_render::{Render, RenderError, RenderSummary};

use super::hub::{NotificationHub, RELOAD_MESSAGE};
use super::watcher::RenderCallback;

/// Re-renders the page and tells connected browsers to reload.
pub struct ReloadOrchestrator {
    renderer: Arc<dyn Render>,
    hub: Arc<NotificationHub>,
    render_lock: Mutex<()>,
}

impl ReloadOrchestrator {
    #[must_use]
    pub fn new(renderer: Arc<dyn Render>, hub: Arc<NotificationHub>) -> Self {
        Self {
            renderer,
            hub,
            render_lock: Mutex::new(()),
        }
    }

    /// Render once and broadcast `reload` if it succeeded.
    ///
    /// A failed render is returned without broadcasting, so browsers keep
    /// showing the last good output.
    ///
    /// # Errors
    ///
    /// Returns the renderer's error.
    pub fn render_and_notify(&self) -> Result<RenderSummary, RenderError> {
        let _guard = self.render_lock.lock().unwrap_or_else(PoisonError::into_inner);

        let summary = self.renderer.render()?;
        let delivered = self.hub.broadcast(RELOAD_MESSAGE);

        tracing::info!(
            output = %summary.output_path.display(),
            bytes = summary.bytes_written,
            elapsed_ms = summary.elapsed.as_secs_f64() * 1000.0,
            listeners = delivered,
            "Rendered"
        );

        Ok(summary)
    }
}

impl RenderCallback for ReloadOrchestrator {
    fn render(&self) -> Result<(), RenderError> {
        self.render_and_notify().map(|_| ())
    }
}
