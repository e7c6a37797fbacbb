//! Live reload development server for trender.
//!
//! Serves the rendered page over HTTP and keeps it fresh: the template and
//! data files are watched, every settled burst of changes re-renders the
//! page, and connected browsers are told to reload over server-sent events.
//!
//! # Quick Start
//!
//! ```ignore
//! use std::path::PathBuf;
//! use std::sync::Arc;
//! use trender_render::TemplateRenderer;
//! use trender_server::{ServerConfig, run_server, shutdown_on_ctrl_c};
//!
//! #[tokio::main]
//! async fn main() {
//!     let renderer = TemplateRenderer::new(
//!         PathBuf::from("example/template.html"),
//!         PathBuf::from("example/config.json"),
//!         PathBuf::from("/tmp/output.html"),
//!     );
//!     let config = ServerConfig {
//!         output_path: PathBuf::from("/tmp/output.html"),
//!         watch_paths: vec![
//!             PathBuf::from("example/template.html"),
//!             PathBuf::from("example/config.json"),
//!         ],
//!         ..ServerConfig::default()
//!     };
//!
//!     let shutdown = shutdown_on_ctrl_c();
//!     run_server(config, Arc::new(renderer), shutdown).await.unwrap();
//! }
//! ```
//!
//! # Architecture
//!
//! ```text
//! Browser ──HTTP──► axum server (trender-server)
//!                        │
//!                        ├─► GET /        rendered output + reload script
//!                        ├─► GET /img/*   static images (tower-http)
//!                        └─► GET /events  SSE stream ◄── NotificationHub
//!                                                            ▲
//! notify ──► ChangeWatcher ──► ReloadOrchestrator ──render──┘
//! ```

mod app;
mod error;
mod handlers;
pub mod live_reload;
mod state;

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use trender_render::Render;

pub use error::ServerError;
use live_reload::{
    ChangeWatcher, DEFAULT_DEBOUNCE_MS, DEFAULT_LISTENER_CAPACITY, NotificationHub,
    ReloadOrchestrator, WatchHandle, WatchSet,
};
use state::AppState;

/// Server configuration.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Host address to bind to.
    pub host: String,
    /// Port to listen on.
    pub port: u16,
    /// Rendered output served at `/`.
    pub output_path: PathBuf,
    /// Directory served under `/img`.
    pub img_dir: PathBuf,
    /// Files whose changes trigger a re-render.
    pub watch_paths: Vec<PathBuf>,
    /// Quiet period before a re-render, in milliseconds.
    pub debounce_ms: u64,
    /// Undelivered messages kept per event stream.
    pub listener_capacity: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_owned(),
            port: 5500,
            output_path: PathBuf::from("output.html"),
            img_dir: PathBuf::from("img"),
            watch_paths: Vec::new(),
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            listener_capacity: DEFAULT_LISTENER_CAPACITY,
        }
    }
}

impl ServerConfig {
    /// Socket address to listen on.
    ///
    /// # Errors
    ///
    /// Returns an error if `host` is not an IP address.
    pub fn socket_addr(&self) -> Result<SocketAddr, ServerError> {
        let ip: IpAddr = self.host.parse()?;
        Ok(SocketAddr::new(ip, self.port))
    }
}

/// A started server: initial render done, address bound, watcher running.
pub struct Server {
    listener: TcpListener,
    local_addr: SocketAddr,
    router: Router,
    watcher: WatchHandle,
    shutdown: CancellationToken,
}

impl Server {
    /// Render once, bind the listening socket and start watching.
    ///
    /// Cancelling `shutdown` stops [`Server::run`] and ends open event
    /// streams. A failed initial render is fatal; later failures are logged
    /// and the last good output stays in place.
    ///
    /// # Errors
    ///
    /// Returns an error if the initial render fails, a watched path is
    /// missing or not a file, the address can't be bound, or the watcher
    /// can't start.
    pub async fn bind(
        config: ServerConfig,
        renderer: Arc<dyn Render>,
        shutdown: CancellationToken,
    ) -> Result<Self, ServerError> {
        let addr = config.socket_addr()?;

        let hub = Arc::new(NotificationHub::new(config.listener_capacity));
        let orchestrator = Arc::new(ReloadOrchestrator::new(renderer, Arc::clone(&hub)));

        orchestrator.render_and_notify()?;

        let watch_set = WatchSet::new(config.watch_paths.iter().cloned())?;

        let listener = TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?;

        for path in watch_set.paths() {
            tracing::info!(path = %path.display(), "Watching");
        }
        let watcher = ChangeWatcher::new(watch_set, Duration::from_millis(config.debounce_ms))
            .start(orchestrator)?;

        let state = Arc::new(AppState {
            output_path: config.output_path,
            img_dir: config.img_dir,
            hub,
            shutdown: shutdown.clone(),
        });
        let router = app::create_router(state);

        tracing::info!(address = %local_addr, "Server listening");

        Ok(Self {
            listener,
            local_addr,
            router,
            watcher,
            shutdown,
        })
    }

    /// Address the server is listening on.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Serve until the shutdown token is cancelled, then stop the watcher.
    ///
    /// # Errors
    ///
    /// Returns an error if serving fails.
    pub async fn run(self) -> Result<(), ServerError> {
        let Self {
            listener,
            router,
            watcher,
            shutdown,
            ..
        } = self;

        let served = axum::serve(listener, router)
            .with_graceful_shutdown(shutdown.cancelled_owned())
            .await;

        watcher.stop().await;
        served?;

        Ok(())
    }
}

/// Run the server until `shutdown` is cancelled.
///
/// # Errors
///
/// Returns an error if [`Server::bind`] or [`Server::run`] fails.
pub async fn run_server(
    config: ServerConfig,
    renderer: Arc<dyn Render>,
    shutdown: CancellationToken,
) -> Result<(), ServerError> {
    Server::bind(config, renderer, shutdown).await?.run().await
}

/// Listen for Ctrl-C in a background task and cancel the returned token.
///
/// Call before startup work so an interrupt during the initial render or
/// bind still reaches the caller's cleanup. Must be called from within a
/// tokio runtime.
pub fn shutdown_on_ctrl_c() -> CancellationToken {
    let shutdown = CancellationToken::new();
    let token = shutdown.clone();

    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            return;
        }
        tracing::info!("Shutdown signal received, stopping server...");
        token.cancel();
    });

    shutdown
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::live_reload::WatchError;
    use pretty_assertions::assert_eq;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;
    use trender_render::TemplateRenderer;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 5500);
        assert_eq!(config.debounce_ms, 100);
        assert_eq!(config.listener_capacity, 16);
    }

    #[test]
    fn test_socket_addr() {
        let config = ServerConfig {
            host: "0.0.0.0".to_owned(),
            port: 8080,
            ..ServerConfig::default()
        };
        assert_eq!(config.socket_addr().unwrap().to_string(), "0.0.0.0:8080");

        let v6 = ServerConfig {
            host: "::1".to_owned(),
            port: 8080,
            ..ServerConfig::default()
        };
        assert_eq!(v6.socket_addr().unwrap().to_string(), "[::1]:8080");
    }

    #[test]
    fn test_socket_addr_rejects_hostname() {
        let config = ServerConfig {
            host: "not an address".to_owned(),
            ..ServerConfig::default()
        };
        assert!(matches!(
            config.socket_addr(),
            Err(ServerError::Address(_))
        ));
    }

    #[tokio::test]
    async fn test_failed_initial_render_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let template = dir.path().join("template.html");
        let data = dir.path().join("config.json");
        std::fs::write(&template, "{{ title }}").unwrap();
        std::fs::write(&data, "[]").unwrap();
        let output = dir.path().join("output.html");

        let renderer = TemplateRenderer::new(template.clone(), data.clone(), output.clone());
        let config = ServerConfig {
            port: 0,
            output_path: output,
            watch_paths: vec![template, data],
            ..ServerConfig::default()
        };

        let err = run_server(config, Arc::new(renderer), CancellationToken::new())
            .await
            .unwrap_err();
        assert!(
            matches!(err, ServerError::Render(_)),
            "Expected ServerError::Render, got {err:?}"
        );
    }

    #[tokio::test]
    async fn test_missing_watch_path_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let template = dir.path().join("template.html");
        let data = dir.path().join("config.json");
        std::fs::write(&template, "ok").unwrap();
        std::fs::write(&data, "{}").unwrap();
        let output = dir.path().join("output.html");

        let renderer = TemplateRenderer::new(template.clone(), data, output.clone());
        let config = ServerConfig {
            port: 0,
            output_path: output,
            watch_paths: vec![template, dir.path().join("extra.css")],
            ..ServerConfig::default()
        };

        let err = run_server(config, Arc::new(renderer), CancellationToken::new())
            .await
            .unwrap_err();
        assert!(
            matches!(err, ServerError::Watch(_)),
            "Expected ServerError::Watch, got {err:?}"
        );
    }

    #[tokio::test]
    async fn test_directory_watch_path_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let template = dir.path().join("template.html");
        let data = dir.path().join("config.json");
        let partials = dir.path().join("partials");
        std::fs::write(&template, "ok").unwrap();
        std::fs::write(&data, "{}").unwrap();
        std::fs::create_dir(&partials).unwrap();
        let output = dir.path().join("output.html");

        let renderer = TemplateRenderer::new(template.clone(), data.clone(), output.clone());
        let config = ServerConfig {
            port: 0,
            output_path: output,
            watch_paths: vec![template, data, partials],
            ..ServerConfig::default()
        };

        let err = run_server(config, Arc::new(renderer), CancellationToken::new())
            .await
            .unwrap_err();
        assert!(
            matches!(err, ServerError::Watch(WatchError::Path { .. })),
            "Expected ServerError::Watch, got {err:?}"
        );
    }

    struct Fixture {
        dir: tempfile::TempDir,
        template: PathBuf,
        output: PathBuf,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = tempfile::tempdir().unwrap();
            let template = dir.path().join("template.html");
            let data = dir.path().join("config.json");
            std::fs::write(&template, "<html><body>v1 {{ title }}</body></html>").unwrap();
            std::fs::write(&data, r#"{"title": "Order"}"#).unwrap();
            let output = dir.path().join("output.html");
            Self {
                dir,
                template,
                output,
            }
        }

        fn config(&self) -> ServerConfig {
            ServerConfig {
                port: 0,
                output_path: self.output.clone(),
                img_dir: self.dir.path().join("img"),
                watch_paths: vec![self.template.clone(), self.dir.path().join("config.json")],
                debounce_ms: 20,
                ..ServerConfig::default()
            }
        }

        fn renderer(&self) -> Arc<dyn Render> {
            Arc::new(TemplateRenderer::new(
                self.template.clone(),
                self.dir.path().join("config.json"),
                self.output.clone(),
            ))
        }
    }

    /// Read from `stream` into `buf` until it contains `needle`.
    async fn read_until(stream: &mut TcpStream, buf: &mut Vec<u8>, needle: &str) {
        let mut chunk = [0u8; 1024];
        while !String::from_utf8_lossy(buf).contains(needle) {
            let n = stream.read(&mut chunk).await.unwrap();
            assert!(
                n > 0,
                "connection closed before {needle:?}, got {:?}",
                String::from_utf8_lossy(buf)
            );
            buf.extend_from_slice(&chunk[..n]);
        }
    }

    #[tokio::test]
    async fn test_cancelled_token_stops_server() {
        let fixture = Fixture::new();
        let shutdown = CancellationToken::new();

        let server = Server::bind(fixture.config(), fixture.renderer(), shutdown.clone())
            .await
            .unwrap();
        assert_ne!(server.local_addr().port(), 0);
        assert!(std::fs::read_to_string(&fixture.output).unwrap().contains("v1 Order"));

        shutdown.cancel();
        tokio::time::timeout(Duration::from_secs(5), server.run())
            .await
            .expect("server should stop once shutdown is cancelled")
            .unwrap();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_file_change_reaches_event_stream() {
        let fixture = Fixture::new();
        let shutdown = CancellationToken::new();

        let server = Server::bind(fixture.config(), fixture.renderer(), shutdown.clone())
            .await
            .unwrap();
        let addr = server.local_addr();
        let served = tokio::spawn(server.run());

        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream
            .write_all(b"GET /events HTTP/1.1\r\nHost: localhost\r\n\r\n")
            .await
            .unwrap();

        let mut buf = Vec::new();
        tokio::time::timeout(Duration::from_secs(5), read_until(&mut stream, &mut buf, "\r\n\r\n"))
            .await
            .expect("event stream headers");
        let head = String::from_utf8_lossy(&buf).into_owned();
        assert!(head.starts_with("HTTP/1.1 200"), "{head}");
        assert!(head.contains("text/event-stream"), "{head}");

        std::fs::write(&fixture.template, "<html><body>v2 {{ title }}</body></html>").unwrap();

        tokio::time::timeout(Duration::from_secs(5), read_until(&mut stream, &mut buf, "data: reload\n\n"))
            .await
            .expect("reload frame after the template changed");
        assert!(std::fs::read_to_string(&fixture.output).unwrap().contains("v2 Order"));

        shutdown.cancel();
        tokio::time::timeout(Duration::from_secs(5), served)
            .await
            .expect("server should stop once shutdown is cancelled")
            .unwrap()
            .unwrap();
    }
}
