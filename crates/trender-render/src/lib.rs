//! Template rendering for trender.
//!
//! Renders a Jinja-style template against a JSON data file and persists the
//! result. Callers see rendering only through the [`Render`] trait: it either
//! produces an output file or fails with a [`RenderError`].
//!
//! # Example
//!
//! ```ignore
//! use std::path::PathBuf;
//! use trender_render::{Render, TemplateRenderer};
//!
//! let renderer = TemplateRenderer::new(
//!     PathBuf::from("mail/template.html"),
//!     PathBuf::from("mail/data.json"),
//!     PathBuf::from("output.html"),
//! );
//! let summary = renderer.render()?;
//! println!("wrote {} bytes to {}", summary.bytes_written, summary.output_path.display());
//! ```

mod error;
mod renderer;

use std::path::PathBuf;
use std::time::Duration;

pub use error::RenderError;
pub use renderer::TemplateRenderer;

/// Outcome of a successful render.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderSummary {
    /// File the output was written to.
    pub output_path: PathBuf,
    /// Size of the rendered output.
    pub bytes_written: usize,
    /// Wall time spent loading, rendering and writing.
    pub elapsed: Duration,
}

/// A full render cycle: load inputs, produce output bytes, persist them.
pub trait Render: Send + Sync {
    /// Run one render cycle.
    fn render(&self) -> Result<RenderSummary, RenderError>;
}
