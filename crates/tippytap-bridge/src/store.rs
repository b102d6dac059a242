//! Text store interface and the in-memory store.
//!
//! A text store holds one document's Markdown. Every write, whoever makes
//! it, is reported to subscribers with the text after the write. The editor
//! side cannot tell its own writes from anyone else's by looking at the
//! notification; that is the reconciliation controller's job.

use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};

use tokio::sync::mpsc;

/// Text store error.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum StoreError {
    #[error("Failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to watch {}: {source}", path.display())]
    Watch {
        path: PathBuf,
        source: notify::Error,
    },
}

/// Receiver of stored-text change notifications.
pub struct TextChangeReceiver {
    rx: mpsc::UnboundedReceiver<String>,
}

impl TextChangeReceiver {
    pub(crate) fn new(rx: mpsc::UnboundedReceiver<String>) -> Self {
        Self { rx }
    }

    /// Wait for the next change.
    ///
    /// Returns `None` when the store stops notifying.
    pub async fn recv(&mut self) -> Option<String> {
        self.rx.recv().await
    }

    /// Take a change if one is queued.
    pub fn try_recv(&mut self) -> Option<String> {
        self.rx.try_recv().ok()
    }
}

/// Handle keeping a subscription alive.
///
/// Dropping the handle stops notifications.
pub struct WatchHandle {
    _guard: Option<Box<dyn Send>>,
}

impl WatchHandle {
    pub(crate) fn new(guard: impl Send + 'static) -> Self {
        Self {
            _guard: Some(Box::new(guard)),
        }
    }

    /// Handle with nothing to release.
    pub(crate) fn no_op() -> Self {
        Self { _guard: None }
    }

    /// Stop notifications now.
    pub fn stop(self) {}
}

/// Storage for one document's text.
pub trait TextStore: Send + Sync {
    /// Current text.
    fn read(&self) -> Result<String, StoreError>;

    /// Replace the text. Subscribers are notified.
    fn write(&self, text: &str) -> Result<(), StoreError>;

    /// Subscribe to changes by any writer.
    fn subscribe(&self) -> Result<(TextChangeReceiver, WatchHandle), StoreError>;
}

/// In-memory text store.
///
/// Notifications are delivered synchronously on write, one per write.
#[derive(Debug, Default)]
pub struct MemoryTextStore {
    state: Mutex<MemoryState>,
}

#[derive(Debug, Default)]
struct MemoryState {
    text: String,
    writes: usize,
    subscribers: Vec<mpsc::UnboundedSender<String>>,
}

impl MemoryTextStore {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            state: Mutex::new(MemoryState {
                text: text.into(),
                ..MemoryState::default()
            }),
        }
    }

    /// Number of writes so far.
    pub fn write_count(&self) -> usize {
        self.lock().writes
    }

    /// Current text, without the `Result` of [`TextStore::read`].
    pub fn text(&self) -> String {
        self.lock().text.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl TextStore for MemoryTextStore {
    fn read(&self) -> Result<String, StoreError> {
        Ok(self.text())
    }

    fn write(&self, text: &str) -> Result<(), StoreError> {
        let mut state = self.lock();
        text.clone_into(&mut state.text);
        state.writes += 1;
        state
            .subscribers
            .retain(|subscriber| subscriber.send(text.to_owned()).is_ok());
        Ok(())
    }

    fn subscribe(&self) -> Result<(TextChangeReceiver, WatchHandle), StoreError> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.lock().subscribers.push(tx);
        Ok((TextChangeReceiver::new(rx), WatchHandle::no_op()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_memory_store_read_write() {
        let store = MemoryTextStore::new("A");
        assert_eq!(store.read().unwrap(), "A");

        store.write("B").unwrap();
        assert_eq!(store.read().unwrap(), "B");
        assert_eq!(store.write_count(), 1);
    }

    #[test]
    fn test_memory_store_notifies_every_write() {
        let store = MemoryTextStore::new("A");
        let (mut changes, _handle) = store.subscribe().unwrap();

        store.write("B").unwrap();
        store.write("B").unwrap();

        assert_eq!(changes.try_recv(), Some("B".to_owned()));
        assert_eq!(changes.try_recv(), Some("B".to_owned()));
        assert_eq!(changes.try_recv(), None);
    }

    #[test]
    fn test_dropped_subscriber_is_forgotten() {
        let store = MemoryTextStore::new("");
        let (changes, _handle) = store.subscribe().unwrap();
        drop(changes);

        store.write("x").unwrap();
        assert!(store.lock().subscribers.is_empty());
    }

    #[test]
    fn test_watch_handle_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<WatchHandle>();
        assert_send::<TextChangeReceiver>();
    }
}
