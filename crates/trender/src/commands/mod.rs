//! CLI command implementations.

pub(crate) mod render;
pub(crate) mod serve;

use std::io;
use std::path::{Path, PathBuf};

use clap::Args;
use trender_config::{CliSettings, Config};

use crate::error::CliError;

pub(crate) use render::RenderArgs;
pub(crate) use serve::ServeArgs;

/// Input and output selection shared by all commands.
#[derive(Args, Debug)]
pub(crate) struct SourceArgs {
    /// Path to configuration file (default: auto-discover trender.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Template file (overrides config).
    #[arg(short, long)]
    template: Option<PathBuf>,

    /// JSON data file (overrides config).
    #[arg(short, long)]
    data: Option<PathBuf>,

    /// Output file (overrides config).
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Enable verbose output (debug logging).
    #[arg(short, long)]
    pub verbose: bool,
}

impl SourceArgs {
    /// Load configuration with these arguments applied on top.
    ///
    /// Relative CLI paths are taken relative to the current directory, not
    /// to the config file.
    pub(crate) fn load_config(
        &self,
        host: Option<String>,
        port: Option<u16>,
    ) -> Result<Config, CliError> {
        let cli_settings = CliSettings {
            template: absolute(self.template.as_deref())?,
            data: absolute(self.data.as_deref())?,
            output: absolute(self.output.as_deref())?,
            host,
            port,
        };

        Ok(Config::load(self.config.as_deref(), Some(&cli_settings))?)
    }
}

fn absolute(path: Option<&Path>) -> io::Result<Option<PathBuf>> {
    path.map(std::path::absolute).transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_absolute_keeps_absolute_paths() {
        let path = std::env::temp_dir().join("template.html");
        assert_eq!(absolute(Some(&path)).unwrap(), Some(path));
    }

    #[test]
    fn test_absolute_resolves_against_cwd() {
        let resolved = absolute(Some(Path::new("mail/template.html")))
            .unwrap()
            .unwrap();
        assert!(resolved.is_absolute());
        assert!(resolved.ends_with("mail/template.html"));
    }

    #[test]
    fn test_absolute_none() {
        assert_eq!(absolute(None).unwrap(), None);
    }

    #[test]
    fn test_load_config_applies_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("trender.toml");
        std::fs::write(&config_path, "[server]\nport = 7000\n").unwrap();
        let template = dir.path().join("mail.html");

        let args = SourceArgs {
            config: Some(config_path),
            template: Some(template.clone()),
            data: None,
            output: None,
            verbose: false,
        };

        let config = args
            .load_config(Some("0.0.0.0".to_owned()), Some(9000))
            .unwrap();

        assert_eq!(config.paths_resolved.template, template);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 9000);
    }

    #[test]
    fn test_load_config_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let args = SourceArgs {
            config: Some(dir.path().join("missing.toml")),
            template: None,
            data: None,
            output: None,
            verbose: false,
        };

        let err = args.load_config(None, None).unwrap_err();
        assert!(
            matches!(err, CliError::Config(_)),
            "Expected CliError::Config, got {err:?}"
        );
    }
}
