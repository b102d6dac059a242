//! File-backed text store.
//!
//! Changes are detected with a `notify` watcher on the file's directory.
//! Editors and tools emit several file system events per save, so events
//! are coalesced: the file is read and reported once a burst has been quiet
//! for the debounce period.

use std::path::{Path, PathBuf};
use std::sync::mpsc as std_mpsc;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use notify::{RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::store::{StoreError, TextChangeReceiver, TextStore, WatchHandle};

/// Default quiet period before a burst of file events is reported.
const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(50);

/// How often the drain thread checks for a finished burst.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Text store backed by a file on disk.
#[derive(Clone, Debug)]
pub struct FileTextStore {
    path: PathBuf,
    debounce: Duration,
}

impl FileTextStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            debounce: DEFAULT_DEBOUNCE,
        }
    }

    /// Set the quiet period used to coalesce file events.
    #[must_use]
    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn watch_dir(&self) -> PathBuf {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }
}

impl TextStore for FileTextStore {
    fn read(&self) -> Result<String, StoreError> {
        std::fs::read_to_string(&self.path).map_err(|source| StoreError::Read {
            path: self.path.clone(),
            source,
        })
    }

    fn write(&self, text: &str) -> Result<(), StoreError> {
        std::fs::write(&self.path, text).map_err(|source| StoreError::Write {
            path: self.path.clone(),
            source,
        })
    }

    fn subscribe(&self) -> Result<(TextChangeReceiver, WatchHandle), StoreError> {
        let (change_tx, change_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = std_mpsc::channel::<()>();

        // Deadline of the current burst, pushed back by every event.
        let deadline: Arc<Mutex<Option<Instant>>> = Arc::new(Mutex::new(None));

        let file_name = self.path.file_name().map(ToOwned::to_owned);
        let debounce = self.debounce;
        let deadline_for_watcher = Arc::clone(&deadline);

        let mut watcher =
            notify::recommended_watcher(move |res: Result<notify::Event, notify::Error>| {
                let Ok(event) = res else {
                    return;
                };
                if !matches!(
                    event.kind,
                    notify::EventKind::Create(_) | notify::EventKind::Modify(_)
                ) {
                    return;
                }
                let ours = event
                    .paths
                    .iter()
                    .any(|path| path.file_name().map(ToOwned::to_owned) == file_name);
                if ours {
                    *deadline_for_watcher
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner) = Some(Instant::now() + debounce);
                }
            })
            .map_err(|source| StoreError::Watch {
                path: self.path.clone(),
                source,
            })?;

        let watch_dir = self.watch_dir();
        watcher
            .watch(&watch_dir, RecursiveMode::NonRecursive)
            .map_err(|source| StoreError::Watch {
                path: watch_dir.clone(),
                source,
            })?;

        let path = self.path.clone();
        std::thread::spawn(move || {
            let _watcher_guard = watcher;

            loop {
                match shutdown_rx.recv_timeout(POLL_INTERVAL) {
                    Ok(()) | Err(std_mpsc::RecvTimeoutError::Disconnected) => break,
                    Err(std_mpsc::RecvTimeoutError::Timeout) => {}
                }

                let ready = {
                    let mut deadline = deadline.lock().unwrap_or_else(PoisonError::into_inner);
                    let now = Instant::now();
                    if deadline.is_some_and(|at| at <= now) {
                        *deadline = None;
                        true
                    } else {
                        false
                    }
                };
                if !ready {
                    continue;
                }

                match std::fs::read_to_string(&path) {
                    Ok(text) => {
                        if change_tx.send(text).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, path = %path.display(), "Failed to read changed file");
                    }
                }
            }
        });

        Ok((TextChangeReceiver::new(change_rx), WatchHandle::new(shutdown_tx)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn test_read_write() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("doc.md");
        std::fs::write(&path, "# A").unwrap();

        let store = FileTextStore::new(&path);
        assert_eq!(store.read().unwrap(), "# A");

        store.write("# B").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "# B");
    }

    #[test]
    fn test_read_missing_file() {
        let dir = TempDir::new().unwrap();
        let store = FileTextStore::new(dir.path().join("missing.md"));

        let err = store.read().unwrap_err();
        assert!(matches!(err, StoreError::Read { .. }));
        assert!(err.to_string().contains("missing.md"));
    }

    #[test]
    fn test_watch_dir_of_bare_file_name() {
        assert_eq!(FileTextStore::new("doc.md").watch_dir(), PathBuf::from("."));
    }

    #[tokio::test]
    async fn test_subscribe_reports_writes() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("doc.md");
        std::fs::write(&path, "one").unwrap();

        let store = FileTextStore::new(&path).with_debounce(Duration::from_millis(20));
        let (mut changes, _handle) = store.subscribe().unwrap();

        store.write("two").unwrap();

        let changed = tokio::time::timeout(Duration::from_secs(5), changes.recv())
            .await
            .unwrap();
        assert_eq!(changed, Some("two".to_owned()));
    }
}
