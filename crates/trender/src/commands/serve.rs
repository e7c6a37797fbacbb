//! `trender serve` command implementation.

use std::io;
use std::path::Path;
use std::sync::Arc;

use clap::Args;
use tokio_util::sync::CancellationToken;
use trender_config::{Config, OutputTarget, RunMode};
use trender_render::{Render, TemplateRenderer};
use trender_server::{Server, ServerConfig, ServerError, shutdown_on_ctrl_c};

use super::SourceArgs;
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the serve command.
#[derive(Args, Debug)]
pub(crate) struct ServeArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Host to bind to (overrides config).
    #[arg(long)]
    host: Option<String>,

    /// Port to bind to (overrides config).
    #[arg(short, long)]
    port: Option<u16>,
}

impl ServeArgs {
    /// Execute the serve command.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration fails, the initial render fails or
    /// the server fails to start.
    pub(crate) async fn execute(self) -> Result<(), CliError> {
        let output = Output::new();
        let shutdown = shutdown_on_ctrl_c();

        let config = self.source.load_config(self.host, self.port)?;
        let target = config.output_for(RunMode::Serve);

        print_startup_info(&output, &config, &target);

        let paths = &config.paths_resolved;
        let renderer = TemplateRenderer::new(
            paths.template.clone(),
            paths.data.clone(),
            target.path.clone(),
        );
        let server_config = server_config_from_config(&config, &target);

        let result = serve(&output, server_config, Arc::new(renderer), shutdown).await;

        if target.temporary {
            remove_output(&target.path);
        }

        result?;
        Ok(())
    }
}

/// Start the server, announce its address once bound, and serve until shutdown.
async fn serve(
    output: &Output,
    config: ServerConfig,
    renderer: Arc<dyn Render>,
    shutdown: CancellationToken,
) -> Result<(), ServerError> {
    let server = Server::bind(config, renderer, shutdown).await?;
    output.highlight(&format!("Serving on http://{}", server.local_addr()));
    server.run().await
}

/// Build server configuration from the loaded config and chosen output.
fn server_config_from_config(config: &Config, target: &OutputTarget) -> ServerConfig {
    ServerConfig {
        host: config.server.host.clone(),
        port: config.server.port,
        output_path: target.path.clone(),
        img_dir: config.paths_resolved.img_dir.clone(),
        watch_paths: config.paths_resolved.watch_paths(),
        debounce_ms: config.live_reload.debounce_ms,
        listener_capacity: config.live_reload.listener_capacity,
    }
}

fn print_startup_info(output: &Output, config: &Config, target: &OutputTarget) {
    let paths = &config.paths_resolved;

    output.info(&format!("Template: {}", paths.template.display()));
    output.info(&format!("Data: {}", paths.data.display()));
    if target.temporary {
        output.info(&format!("Output: {} (removed on exit)", target.path.display()));
    } else {
        output.info(&format!("Output: {}", target.path.display()));
    }
    for extra in &paths.watch {
        output.info(&format!("Also watching: {}", extra.display()));
    }
    output.info(&format!(
        "Live reload: {} ms debounce",
        config.live_reload.debounce_ms
    ));
}

/// Remove a scratch output file. A file that is already gone is fine.
fn remove_output(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => tracing::debug!(path = %path.display(), "Removed output file"),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!(path = %path.display(), error = %e, "Failed to remove output file"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;

    #[test]
    fn test_server_config_from_config() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("trender.toml");
        std::fs::write(
            &config_path,
            r#"
[server]
host = "0.0.0.0"
port = 8000
img_dir = "assets"

[render]
template = "mail/template.html"
data = "mail/data.json"

[live_reload]
debounce_ms = 250
listener_capacity = 4
watch = ["mail/partials.html"]
"#,
        )
        .unwrap();
        let config = Config::load(Some(&config_path), None).unwrap();
        let base = config.base_dir.clone();
        let target = OutputTarget {
            path: PathBuf::from("/tmp/out.html"),
            temporary: true,
        };

        let server_config = server_config_from_config(&config, &target);

        assert_eq!(server_config.host, "0.0.0.0");
        assert_eq!(server_config.port, 8000);
        assert_eq!(server_config.output_path, PathBuf::from("/tmp/out.html"));
        assert_eq!(server_config.img_dir, base.join("assets"));
        assert_eq!(
            server_config.watch_paths,
            vec![
                base.join("mail/template.html"),
                base.join("mail/data.json"),
                base.join("mail/partials.html"),
            ]
        );
        assert_eq!(server_config.debounce_ms, 250);
        assert_eq!(server_config.listener_capacity, 4);
    }

    #[test]
    fn test_remove_output() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.html");
        std::fs::write(&path, "x").unwrap();

        remove_output(&path);
        assert!(!path.exists());

        // Second removal is a no-op
        remove_output(&path);
    }

    fn server_config_in(dir: &Path, data: &str) -> (ServerConfig, Arc<dyn Render>) {
        let template = dir.join("template.html");
        let data_path = dir.join("config.json");
        let output = dir.join("output.html");
        std::fs::write(&template, "<body>{{ title }}</body>").unwrap();
        std::fs::write(&data_path, data).unwrap();

        let renderer = TemplateRenderer::new(template.clone(), data_path.clone(), output.clone());
        let config = ServerConfig {
            port: 0,
            output_path: output,
            watch_paths: vec![template, data_path],
            ..ServerConfig::default()
        };
        (config, Arc::new(renderer))
    }

    #[tokio::test]
    async fn test_serve_fails_before_binding_on_bad_render() {
        let dir = tempfile::tempdir().unwrap();
        let (config, renderer) = server_config_in(dir.path(), "[]");

        let err = serve(&Output::new(), config, renderer, CancellationToken::new())
            .await
            .unwrap_err();

        assert!(
            matches!(err, ServerError::Render(_)),
            "Expected ServerError::Render, got {err:?}"
        );
    }

    #[tokio::test]
    async fn test_serve_returns_once_shutdown_is_cancelled() {
        let dir = tempfile::tempdir().unwrap();
        let (config, renderer) = server_config_in(dir.path(), r#"{"title": "Order"}"#);
        let shutdown = CancellationToken::new();
        shutdown.cancel();

        serve(&Output::new(), config, renderer, shutdown)
            .await
            .unwrap();

        assert_eq!(
            std::fs::read_to_string(dir.path().join("output.html")).unwrap(),
            "<body>Order</body>"
        );
    }
}
