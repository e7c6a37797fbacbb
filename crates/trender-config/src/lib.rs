//! Configuration management for trender.
//!
//! Parses `trender.toml` configuration files with serde and provides
//! auto-discovery of config files in parent directories.
//!
//! CLI settings can be applied during load via [`CliSettings`].
//!
//! ## Environment Variable Expansion
//!
//! String configuration values support environment variable and `~` expansion:
//!
//! - `${VAR}` - expands to the value of VAR, left verbatim if unset
//! - `${VAR:-default}` - expands to VAR if set, otherwise uses default
//!
//! Expanded fields:
//! - `server.host`
//! - `server.img_dir`
//! - `render.template`
//! - `render.data`
//! - `render.output`
//! - `live_reload.watch`

mod expand;

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// CLI settings that override configuration file values.
///
/// All fields are optional. Only non-None values override the loaded config.
/// Paths are expected to be absolute already.
#[derive(Debug, Default)]
pub struct CliSettings {
    /// Override template path.
    pub template: Option<PathBuf>,
    /// Override data path.
    pub data: Option<PathBuf>,
    /// Override output path.
    pub output: Option<PathBuf>,
    /// Override server host.
    pub host: Option<String>,
    /// Override server port.
    pub port: Option<u16>,
}

/// Configuration filename to search for.
const CONFIG_FILENAME: &str = "trender.toml";

/// Default template path, relative to the base directory.
const DEFAULT_TEMPLATE: &str = "example/template.html";

/// Default data path, relative to the base directory.
const DEFAULT_DATA: &str = "example/config.json";

/// Output file name used by a one-shot render.
const DEFAULT_OUTPUT: &str = "output.html";

/// Upper bound for `live_reload.debounce_ms`.
const MAX_DEBOUNCE_MS: u64 = 10_000;

/// How the output file is going to be used.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunMode {
    /// Watch sources and serve the output over HTTP.
    Serve,
    /// Render a single time and exit.
    Render,
}

/// Output file location chosen for a [`RunMode`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutputTarget {
    /// Absolute path of the rendered file.
    pub path: PathBuf,
    /// Whether the file is a scratch file that should be removed on exit.
    pub temporary: bool,
}

/// Application configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Server configuration.
    pub server: ServerConfig,
    /// Render inputs and output (paths are relative strings from TOML).
    render: RenderConfigRaw,
    /// Live reload configuration.
    pub live_reload: LiveReloadConfig,

    /// Resolved paths (set after loading).
    #[serde(skip)]
    pub paths_resolved: PathsConfig,
    /// Directory relative paths are resolved against (set after loading).
    #[serde(skip)]
    pub base_dir: PathBuf,
    /// Path to the config file (set after loading).
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self::default_with_base(Path::new("."))
    }
}

/// Server configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Server host address.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Directory served under `/img` (relative string from TOML).
    img_dir: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_owned(),
            port: 5500,
            img_dir: None,
        }
    }
}

/// Raw render configuration as parsed from TOML (paths as strings).
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct RenderConfigRaw {
    template: Option<String>,
    data: Option<String>,
    output: Option<String>,
}

/// Live reload configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LiveReloadConfig {
    /// Quiet period after the last change before re-rendering.
    pub debounce_ms: u64,
    /// Number of undelivered messages a browser connection may queue
    /// before it is dropped.
    pub listener_capacity: usize,
    /// Extra files that trigger a re-render (relative strings from TOML).
    watch: Vec<String>,
}

impl Default for LiveReloadConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 100,
            listener_capacity: 16,
            watch: Vec::new(),
        }
    }
}

/// Resolved paths, all absolute.
#[derive(Debug, Default)]
pub struct PathsConfig {
    /// Template file.
    pub template: PathBuf,
    /// JSON data file.
    pub data: PathBuf,
    /// Explicit output file, if configured.
    pub output: Option<PathBuf>,
    /// Directory served under `/img`.
    pub img_dir: PathBuf,
    /// Extra files to watch besides the template and data.
    pub watch: Vec<PathBuf>,
}

impl PathsConfig {
    /// All files whose changes trigger a re-render.
    #[must_use]
    pub fn watch_paths(&self) -> Vec<PathBuf> {
        let mut paths = vec![self.template.clone(), self.data.clone()];
        paths.extend(self.watch.iter().cloned());
        paths
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File not found.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error.
    #[error("Configuration error: {0}")]
    Validation(String),
    /// Environment variable error during expansion.
    #[error("Environment variable error in {field}: {message}")]
    EnvVar {
        /// Config field path (e.g., "`render.template`").
        field: String,
        /// Error message.
        message: String,
    },
}

/// Require a string field to be non-empty.
fn require_non_empty(value: &str, field: &str) -> Result<(), ConfigError> {
    if value.is_empty() {
        return Err(ConfigError::Validation(format!("{field} cannot be empty")));
    }
    Ok(())
}

impl Config {
    /// Load configuration from file with optional CLI settings.
    ///
    /// If `config_path` is provided, loads from that file.
    /// Otherwise, searches for `trender.toml` in current directory and parents.
    ///
    /// CLI settings are applied after loading and path resolution, allowing CLI
    /// arguments to take precedence over config file values.
    ///
    /// # Errors
    ///
    /// Returns error if explicit `config_path` doesn't exist, parsing fails,
    /// or the final configuration is invalid.
    pub fn load(
        config_path: Option<&Path>,
        cli_settings: Option<&CliSettings>,
    ) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Self::load_from_file(path)?
        } else if let Some(discovered) = Self::discover_config() {
            Self::load_from_file(&discovered)?
        } else {
            Self::default_with_cwd()
        };

        if let Some(settings) = cli_settings {
            config.apply_cli_settings(settings);
        }

        config.validate()?;

        Ok(config)
    }

    /// Apply CLI settings to the configuration.
    fn apply_cli_settings(&mut self, settings: &CliSettings) {
        if let Some(template) = &settings.template {
            self.paths_resolved.template.clone_from(template);
        }
        if let Some(data) = &settings.data {
            self.paths_resolved.data.clone_from(data);
        }
        if let Some(output) = &settings.output {
            self.paths_resolved.output = Some(output.clone());
        }
        if let Some(host) = &settings.host {
            self.server.host.clone_from(host);
        }
        if let Some(port) = settings.port {
            self.server.port = port;
        }
    }

    /// Pick the output file for the given mode.
    ///
    /// An explicitly configured output always wins. Otherwise serving writes to
    /// a per-process scratch file in the system temp directory, and a one-shot
    /// render writes `output.html` next to the config.
    #[must_use]
    pub fn output_for(&self, mode: RunMode) -> OutputTarget {
        if let Some(path) = &self.paths_resolved.output {
            return OutputTarget {
                path: path.clone(),
                temporary: false,
            };
        }

        match mode {
            RunMode::Serve => OutputTarget {
                path: std::env::temp_dir()
                    .join(format!("trender-output-{}.html", std::process::id())),
                temporary: true,
            },
            RunMode::Render => OutputTarget {
                path: self.base_dir.join(DEFAULT_OUTPUT),
                temporary: false,
            },
        }
    }

    /// Search for config file in current directory and parents.
    fn discover_config() -> Option<PathBuf> {
        let mut current = std::env::current_dir().ok()?;
        loop {
            let candidate = current.join(CONFIG_FILENAME);
            if candidate.exists() {
                return Some(candidate);
            }
            if !current.pop() {
                return None;
            }
        }
    }

    /// Create default config with paths relative to current working directory.
    fn default_with_cwd() -> Self {
        let cwd = std::env::current_dir().unwrap_or_default();
        Self::default_with_base(&cwd)
    }

    /// Create default config with paths relative to given base directory.
    fn default_with_base(base: &Path) -> Self {
        Self {
            server: ServerConfig::default(),
            render: RenderConfigRaw::default(),
            live_reload: LiveReloadConfig::default(),
            paths_resolved: PathsConfig {
                template: base.join(DEFAULT_TEMPLATE),
                data: base.join(DEFAULT_DATA),
                output: None,
                img_dir: base.join("img"),
                watch: Vec::new(),
            },
            base_dir: base.to_path_buf(),
            config_path: None,
        }
    }

    /// Load configuration from a specific file.
    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;

        // Expand environment variables before path resolution
        config.expand_env_vars()?;

        let config_dir = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => std::path::absolute(dir)?,
            _ => std::env::current_dir()?,
        };
        config.resolve_paths(&config_dir);
        config.config_path = Some(path.to_path_buf());

        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// Called automatically at the end of [`Config::load`].
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if any validation fails.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_server()?;
        self.validate_live_reload()?;
        Ok(())
    }

    /// Validate server configuration.
    fn validate_server(&self) -> Result<(), ConfigError> {
        require_non_empty(&self.server.host, "server.host")?;

        if self.server.port == 0 {
            return Err(ConfigError::Validation(
                "server.port cannot be 0".to_owned(),
            ));
        }

        Ok(())
    }

    /// Validate live reload configuration.
    fn validate_live_reload(&self) -> Result<(), ConfigError> {
        let debounce_ms = self.live_reload.debounce_ms;
        if debounce_ms == 0 {
            return Err(ConfigError::Validation(
                "live_reload.debounce_ms must be greater than 0".to_owned(),
            ));
        }
        if debounce_ms > MAX_DEBOUNCE_MS {
            return Err(ConfigError::Validation(format!(
                "live_reload.debounce_ms cannot exceed {MAX_DEBOUNCE_MS}"
            )));
        }

        if self.live_reload.listener_capacity == 0 {
            return Err(ConfigError::Validation(
                "live_reload.listener_capacity must be greater than 0".to_owned(),
            ));
        }

        Ok(())
    }

    /// Expand environment variable references in configuration strings.
    fn expand_env_vars(&mut self) -> Result<(), ConfigError> {
        self.server.host = expand::expand_env(&self.server.host, "server.host")?;

        if let Some(ref dir) = self.server.img_dir {
            self.server.img_dir = Some(expand::expand_env(dir, "server.img_dir")?);
        }

        let render = &mut self.render;
        for (value, field) in [
            (&mut render.template, "render.template"),
            (&mut render.data, "render.data"),
            (&mut render.output, "render.output"),
        ] {
            if let Some(raw) = value.as_deref() {
                *value = Some(expand::expand_env(raw, field)?);
            }
        }

        self.live_reload.watch = self
            .live_reload
            .watch
            .iter()
            .map(|path| expand::expand_env(path, "live_reload.watch"))
            .collect::<Result<_, _>>()?;

        Ok(())
    }

    /// Resolve relative paths to absolute paths based on config directory.
    fn resolve_paths(&mut self, config_dir: &Path) {
        let resolve = |path: Option<&str>, default: &str| config_dir.join(path.unwrap_or(default));

        self.paths_resolved = PathsConfig {
            template: resolve(self.render.template.as_deref(), DEFAULT_TEMPLATE),
            data: resolve(self.render.data.as_deref(), DEFAULT_DATA),
            output: self.render.output.as_deref().map(|p| config_dir.join(p)),
            img_dir: resolve(self.server.img_dir.as_deref(), "img"),
            watch: self
                .live_reload
                .watch
                .iter()
                .map(|p| config_dir.join(p))
                .collect(),
        };
        self.base_dir = config_dir.to_path_buf();
    }
}
