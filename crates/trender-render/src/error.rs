//! Render error types.

use std::path::PathBuf;

/// Failure of a single render cycle.
///
/// Every variant carries the file involved so the message can be shown to the
/// user as-is.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// Template file could not be read.
    #[error("Failed to read template {}: {source}", path.display())]
    ReadTemplate {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Template has a syntax error.
    #[error("Failed to parse template {}: {source}", path.display())]
    ParseTemplate {
        path: PathBuf,
        source: minijinja::Error,
    },

    /// Data file could not be read.
    #[error("Failed to read data file {}: {source}", path.display())]
    ReadData {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data file is not valid JSON.
    #[error("Failed to parse JSON in {}: {source}", path.display())]
    ParseData {
        path: PathBuf,
        source: serde_json::Error,
    },

    /// Data file is valid JSON but not an object.
    #[error("Data file {} must contain a JSON object at the top level", path.display())]
    DataNotObject { path: PathBuf },

    /// Template failed while rendering.
    #[error("Failed to execute template {}: {source}", path.display())]
    Execute {
        path: PathBuf,
        source: minijinja::Error,
    },

    /// Output could not be written.
    #[error("Failed to write output {}: {source}", path.display())]
    WriteOutput {
        path: PathBuf,
        source: std::io::Error,
    },
}
