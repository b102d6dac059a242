//! Host bridge for TippyTap.
//!
//! The host owns the document's text store; the editor owns the structured
//! document. They talk over an ordered message pipe carrying [`Message`]s.
//!
//! - [`TextStore`]: read, write and subscribe to one document's text, with
//!   [`MemoryTextStore`] and the watcher-backed [`FileTextStore`]
//! - [`HostBridge`]: the host-side relay between a store and the pipe
//!
//! # Example
//!
//! ```
//! use tippytap_bridge::{MemoryTextStore, TextStore};
//!
//! let store = MemoryTextStore::new("# Notes");
//! let (mut changes, _watch) = store.subscribe().unwrap();
//!
//! store.write("# Notes\n\nMore.").unwrap();
//! assert_eq!(changes.try_recv().as_deref(), Some("# Notes\n\nMore."));
//! ```

mod bridge;
mod file;
mod message;
mod store;

pub use bridge::HostBridge;
pub use file::FileTextStore;
pub use message::Message;
pub use store::{MemoryTextStore, StoreError, TextChangeReceiver, TextStore, WatchHandle};
