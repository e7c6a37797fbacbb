//! Source file watching.
//!
//! Watches the parent directories of a fixed set of files and turns bursts of
//! qualifying changes into a single render per quiet period.

use std::collections::BTreeSet;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use notify::event::{ModifyKind, RenameMode};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep_until};

use trender_render::RenderError;

use super::debouncer::Debouncer;

/// Buffered raw events between the notify thread and the watch loop.
const EVENT_CHANNEL_CAPACITY: usize = 100;

/// How long `stop` waits for the watch loop before aborting it.
const STOP_TIMEOUT: Duration = Duration::from_secs(2);

/// Error starting the change watcher.
#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    /// A watched path does not exist or can't be resolved.
    #[error("Cannot watch {}: {source}", path.display())]
    Path { path: PathBuf, source: io::Error },

    /// The platform watcher failed.
    #[error("File watcher error: {0}")]
    Notify(#[from] notify::Error),
}

/// Work to run once the sources have settled.
pub trait RenderCallback: Send + Sync {
    /// Re-render. Errors are logged by the caller.
    fn render(&self) -> Result<(), RenderError>;
}

impl<F> RenderCallback for F
where
    F: Fn() -> Result<(), RenderError> + Send + Sync,
{
    fn render(&self) -> Result<(), RenderError> {
        self()
    }
}

/// How a qualifying event changed a watched file.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ChangeKind {
    /// File was created, or another file was renamed onto it.
    Created,
    /// File contents were written.
    ContentWritten,
}

/// Map a raw event kind to a qualifying change.
///
/// Metadata, access, removal and rename-away never qualify.
pub(crate) fn classify(kind: &EventKind) -> Option<ChangeKind> {
    match kind {
        EventKind::Create(_)
        | EventKind::Modify(ModifyKind::Name(RenameMode::To | RenameMode::Both)) => {
            Some(ChangeKind::Created)
        }
        EventKind::Modify(ModifyKind::Data(_) | ModifyKind::Any) => Some(ChangeKind::ContentWritten),
        _ => None,
    }
}

/// Immutable set of canonical file paths to watch.
#[derive(Clone, Debug, Default)]
pub struct WatchSet {
    paths: BTreeSet<PathBuf>,
}

impl WatchSet {
    /// Canonicalize `paths` into a watch set.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::Path`] for the first path that doesn't exist or
    /// is not a regular file.
    pub fn new<I>(paths: I) -> Result<Self, WatchError>
    where
        I: IntoIterator<Item = PathBuf>,
    {
        let paths = paths
            .into_iter()
            .map(|path| canonical_file(&path).map_err(|source| WatchError::Path { path, source }))
            .collect::<Result<BTreeSet<_>, _>>()?;
        Ok(Self { paths })
    }

    /// Check whether `path` is one of the watched files.
    #[must_use]
    pub fn contains(&self, path: &Path) -> bool {
        self.paths.contains(path)
    }

    /// Watched file paths.
    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.paths.iter().map(PathBuf::as_path)
    }

    /// Directories to register with the platform watcher.
    ///
    /// Parents are watched instead of the files so a file replaced through
    /// rename keeps being observed.
    #[must_use]
    pub fn directories(&self) -> BTreeSet<PathBuf> {
        self.paths
            .iter()
            .filter_map(|p| p.parent())
            .map(Path::to_path_buf)
            .collect()
    }

    /// Classify `event` and return the watched path it touched.
    pub(crate) fn qualifying_change<'a>(&self, event: &'a Event) -> Option<(ChangeKind, &'a Path)> {
        let kind = classify(&event.kind)?;

        // A two-path rename reports [from, to]; only the destination counts
        let candidates = match event.kind {
            EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => event.paths.get(1..)?,
            _ => &event.paths[..],
        };

        candidates
            .iter()
            .find(|p| self.contains(p))
            .map(|p| (kind, p.as_path()))
    }
}

fn canonical_file(path: &Path) -> io::Result<PathBuf> {
    let canonical = path.canonicalize()?;
    if !canonical.metadata()?.is_file() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "not a regular file",
        ));
    }
    Ok(canonical)
}

/// Watches a [`WatchSet`] and runs a callback after each burst of changes.
#[derive(Debug)]
pub struct ChangeWatcher {
    watch_set: WatchSet,
    delay: Duration,
}

impl ChangeWatcher {
    /// Create a watcher with the given debounce delay.
    #[must_use]
    pub fn new(watch_set: WatchSet, delay: Duration) -> Self {
        Self { watch_set, delay }
    }

    /// Start watching. Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns an error if the platform watcher can't be created or a
    /// directory can't be registered.
    pub fn start(self, callback: Arc<dyn RenderCallback>) -> Result<WatchHandle, WatchError> {
        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            // Callback runs on the notify thread
            let _ = tx.blocking_send(res);
        })?;

        for dir in self.watch_set.directories() {
            watcher.watch(&dir, RecursiveMode::NonRecursive)?;
            tracing::debug!(dir = %dir.display(), "Watching directory");
        }

        let task = tokio::spawn(watch_loop(
            rx,
            self.watch_set,
            Debouncer::new(self.delay),
            callback,
        ));

        Ok(WatchHandle { watcher, task })
    }
}

/// Running watcher. Dropping it stops the platform watcher; the loop then
/// ends once its event channel closes.
pub struct WatchHandle {
    watcher: RecommendedWatcher,
    task: JoinHandle<()>,
}

impl WatchHandle {
    /// Stop watching and wait for the watch loop to finish.
    pub async fn stop(self) {
        let Self { watcher, mut task } = self;
        drop(watcher);

        match tokio::time::timeout(STOP_TIMEOUT, &mut task).await {
            Ok(Ok(())) => tracing::debug!("Watch loop stopped"),
            Ok(Err(e)) => tracing::warn!(error = %e, "Watch loop ended abnormally"),
            Err(_) => {
                tracing::warn!("Watch loop did not stop in time, aborting");
                task.abort();
            }
        }
    }
}

/// Consume raw events until the channel closes.
///
/// Qualifying events re-arm the debouncer. When its deadline passes without
/// a newer event the callback runs once, inline, so renders never overlap.
pub(crate) async fn watch_loop(
    mut events: mpsc::Receiver<notify::Result<Event>>,
    watch_set: WatchSet,
    mut debouncer: Debouncer,
    callback: Arc<dyn RenderCallback>,
) {
    let mut last_changed: Option<PathBuf> = None;

    loop {
        let deadline = debouncer.deadline().unwrap_or_else(Instant::now);

        tokio::select! {
            received = events.recv() => match received {
                None => break,
                Some(Err(e)) => tracing::warn!(error = %e, "File watcher error"),
                Some(Ok(event)) => {
                    if let Some((kind, path)) = watch_set.qualifying_change(&event) {
                        tracing::debug!(path = %path.display(), ?kind, "Recorded change");
                        last_changed = Some(path.to_path_buf());
                        debouncer.arm(Instant::now());
                    }
                }
            },
            () = sleep_until(deadline), if debouncer.is_armed() => {
                if debouncer.take_due(Instant::now()) {
                    run_callback(callback.as_ref(), last_changed.take().as_deref());
                }
            }
        }
    }

    tracing::debug!("Watch loop ended");
}

fn run_callback(callback: &dyn RenderCallback, changed: Option<&Path>) {
    let file = changed
        .and_then(Path::file_name)
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    tracing::info!(file = %file, "File changed, re-rendering");

    if let Err(e) = callback.render() {
        tracing::error!(error = %e, "Render failed");
    }
}
