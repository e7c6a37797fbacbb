//! `trender render` command implementation.

use clap::Args;
use trender_config::RunMode;
use trender_render::{Render, TemplateRenderer};

use super::SourceArgs;
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the render command.
#[derive(Args, Debug)]
pub(crate) struct RenderArgs {
    #[command(flatten)]
    pub source: SourceArgs,
}

impl RenderArgs {
    /// Execute the render command.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration fails or rendering fails.
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();

        let config = self.source.load_config(None, None)?;
        let target = config.output_for(RunMode::Render);
        let paths = &config.paths_resolved;

        output.info("Rendering template...");
        let renderer = TemplateRenderer::new(
            paths.template.clone(),
            paths.data.clone(),
            target.path.clone(),
        );
        let summary = renderer.render()?;

        output.success(&format!(
            "Template rendered: {} ({} bytes)",
            summary.output_path.display(),
            summary.bytes_written
        ));
        output.hint("Open the file in a browser to see the result.");
        output.hint("Tip: run `trender serve` for live reload with a web server.");

        Ok(())
    }
}
