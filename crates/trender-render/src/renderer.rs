//! Filesystem-backed template renderer.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Instant;

use minijinja::Environment;
use serde_json::{Map, Value};

use crate::{Render, RenderError, RenderSummary};

/// Renders a template file against a JSON data file into an output file.
///
/// Inputs are re-read on every call, so edits are picked up without rebuilding
/// the renderer.
#[derive(Clone, Debug)]
pub struct TemplateRenderer {
    template_path: PathBuf,
    data_path: PathBuf,
    output_path: PathBuf,
}

impl TemplateRenderer {
    /// Create a renderer for the given template, data and output paths.
    #[must_use]
    pub fn new(template_path: PathBuf, data_path: PathBuf, output_path: PathBuf) -> Self {
        Self {
            template_path,
            data_path,
            output_path,
        }
    }

    /// Template file path.
    #[must_use]
    pub fn template_path(&self) -> &Path {
        &self.template_path
    }

    /// Data file path.
    #[must_use]
    pub fn data_path(&self) -> &Path {
        &self.data_path
    }

    /// Output file path.
    #[must_use]
    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    /// Read and parse the data file. The top-level value must be an object.
    fn load_data(&self) -> Result<Map<String, Value>, RenderError> {
        let content = fs::read_to_string(&self.data_path).map_err(|source| RenderError::ReadData {
            path: self.data_path.clone(),
            source,
        })?;

        let value: Value =
            serde_json::from_str(&content).map_err(|source| RenderError::ParseData {
                path: self.data_path.clone(),
                source,
            })?;

        match value {
            Value::Object(map) => Ok(map),
            _ => Err(RenderError::DataNotObject {
                path: self.data_path.clone(),
            }),
        }
    }

    /// Load the template and render it with `data`.
    fn render_to_string(&self, data: &Map<String, Value>) -> Result<String, RenderError> {
        let source =
            fs::read_to_string(&self.template_path).map_err(|source| RenderError::ReadTemplate {
                path: self.template_path.clone(),
                source,
            })?;

        // The name decides auto-escaping: `.html` templates escape their values.
        let name = template_name(&self.template_path);
        let env = Environment::new();
        let template = env
            .template_from_named_str(&name, &source)
            .map_err(|source| RenderError::ParseTemplate {
                path: self.template_path.clone(),
                source,
            })?;

        template.render(data).map_err(|source| RenderError::Execute {
            path: self.template_path.clone(),
            source,
        })
    }
}

impl Render for TemplateRenderer {
    fn render(&self) -> Result<RenderSummary, RenderError> {
        let start = Instant::now();

        let data = self.load_data()?;
        let html = self.render_to_string(&data)?;

        write_atomic(&self.output_path, html.as_bytes()).map_err(|source| {
            RenderError::WriteOutput {
                path: self.output_path.clone(),
                source,
            }
        })?;

        let summary = RenderSummary {
            output_path: self.output_path.clone(),
            bytes_written: html.len(),
            elapsed: start.elapsed(),
        };

        tracing::debug!(
            template = %self.template_path.display(),
            output = %summary.output_path.display(),
            bytes = summary.bytes_written,
            elapsed_ms = summary.elapsed.as_secs_f64() * 1000.0,
            "Template rendered"
        );

        Ok(summary)
    }
}

/// Template name used for error messages and auto-escape detection.
fn template_name(path: &Path) -> String {
    path.file_name()
        .map_or_else(|| "template".to_owned(), |n| n.to_string_lossy().into_owned())
}

/// Write `contents` next to `path` and rename it into place.
///
/// HTTP handlers read the output concurrently; the rename keeps them from
/// observing a half-written file.
fn write_atomic(path: &Path, contents: &[u8]) -> io::Result<()> {
    let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
    tmp_name.push(".tmp");
    let tmp_path = path.with_file_name(tmp_name);

    let result = fs::write(&tmp_path, contents).and_then(|()| fs::rename(&tmp_path, path));
    if result.is_err() {
        let _ = fs::remove_file(&tmp_path);
    }
    result
}
