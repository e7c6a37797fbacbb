//! CLI error types.

use trender_config::ConfigError;
use trender_render::RenderError;
use trender_server::ServerError;

/// CLI error type.
#[derive(Debug, thiserror::Error)]
pub(crate) enum CliError {
    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Render(#[from] RenderError),

    #[error("{0}")]
    Server(#[from] ServerError),
}
