//! File system watcher for configuration files

use super::types::{WatchEvent, WatchEventKind};
use crate::core::{ConfigError, ConfigResult};
use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;

const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(100);
const EVENT_BUFFER: usize = 32;

/// Watches configuration files and reports debounced changes
///
/// Parent directories are watched so editors that replace files on save
/// are still observed. Raw events are coalesced per file until the watcher
/// has been quiet for the debounce window.
pub struct FileWatcher {
    watcher: Mutex<Option<RecommendedWatcher>>,
    watching: AtomicBool,
    debounce: Duration,
}

impl std::fmt::Debug for FileWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileWatcher")
            .field("watching", &self.is_watching())
            .field("debounce", &self.debounce)
            .finish()
    }
}

impl FileWatcher {
    /// Watcher with the default 100ms debounce
    pub fn new() -> Self {
        Self {
            watcher: Mutex::new(None),
            watching: AtomicBool::new(false),
            debounce: DEFAULT_DEBOUNCE,
        }
    }

    /// Set debounce duration
    #[must_use = "builder methods must be chained or built"]
    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    /// Start watching `paths`; must be called inside a Tokio runtime
    ///
    /// The returned receiver yields one event per changed file per debounce
    /// window and closes after [`FileWatcher::stop`].
    pub fn start(&self, paths: &[PathBuf]) -> ConfigResult<mpsc::Receiver<WatchEvent>> {
        if self.is_watching() {
            return Err(ConfigError::watch_error("already watching"));
        }
        if paths.is_empty() {
            return Err(ConfigError::watch_error("no paths to watch"));
        }

        let mut files = HashSet::new();
        let mut dirs = HashSet::new();
        for path in paths {
            let (dir, file) = resolve(path)?;
            dirs.insert(dir);
            files.insert(file);
        }
        let files = Arc::new(files);

        let (raw_tx, raw_rx) = mpsc::unbounded_channel::<(PathBuf, WatchEventKind)>();
        let filter = Arc::clone(&files);
        let mut fs_watcher = notify::recommended_watcher(move |res: Result<Event, notify::Error>| {
            match res {
                Ok(event) => {
                    let Some(kind) = WatchEventKind::from_notify(&event.kind) else {
                        return;
                    };
                    for path in event.paths {
                        if filter.contains(&path) {
                            // Receiver gone means the watcher is shutting down
                            let _ = raw_tx.send((path, kind));
                        }
                    }
                }
                Err(e) => folio_log::error!(error = %e, "File watch error"),
            }
        })?;

        for dir in &dirs {
            fs_watcher
                .watch(dir, RecursiveMode::NonRecursive)
                .map_err(|e| {
                    ConfigError::watch_error(format!("failed to watch {}: {e}", dir.display()))
                })?;
            folio_log::debug!(path = %dir.display(), "Watching directory");
        }

        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        tokio::spawn(debounce_events(raw_rx, tx, self.debounce));

        *self.watcher.lock() = Some(fs_watcher);
        self.watching.store(true, Ordering::Release);
        folio_log::info!(files = files.len(), "Started watching configuration files");
        Ok(rx)
    }

    /// Stop watching; the event receiver closes once pending events drain
    pub fn stop(&self) {
        if self.watcher.lock().take().is_some() {
            self.watching.store(false, Ordering::Release);
            folio_log::info!("Stopped watching configuration files");
        }
    }

    /// Whether a watch is active
    pub fn is_watching(&self) -> bool {
        self.watching.load(Ordering::Acquire)
    }
}

impl Default for FileWatcher {
    fn default() -> Self {
        Self::new()
    }
}

/// Absolute parent directory and file path for a watched file
fn resolve(path: &Path) -> ConfigResult<(PathBuf, PathBuf)> {
    let name = path.file_name().ok_or_else(|| {
        ConfigError::watch_error(format!("{} does not name a file", path.display()))
    })?;
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let dir = parent.canonicalize().map_err(|e| {
        ConfigError::watch_error(format!("cannot watch {}: {e}", parent.display()))
    })?;
    let file = dir.join(name);
    Ok((dir, file))
}

async fn debounce_events(
    mut raw: mpsc::UnboundedReceiver<(PathBuf, WatchEventKind)>,
    out: mpsc::Sender<WatchEvent>,
    window: Duration,
) {
    while let Some((path, kind)) = raw.recv().await {
        let mut pending = BTreeMap::from([(path, kind)]);
        let mut closed = false;
        loop {
            match tokio::time::timeout(window, raw.recv()).await {
                Ok(Some((path, kind))) => {
                    pending.insert(path, kind);
                }
                Ok(None) => {
                    closed = true;
                    break;
                }
                Err(_) => break,
            }
        }

        for (path, kind) in pending {
            folio_log::debug!(path = %path.display(), kind = ?kind, "Configuration file changed");
            if out.send(WatchEvent::new(kind, path)).await.is_err() {
                return;
            }
        }
        if closed {
            break;
        }
    }
}
