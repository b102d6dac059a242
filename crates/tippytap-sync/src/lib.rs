//! Synchronization between the structured editor and the text store.
//!
//! Two writers touch a document's text: the structured editor, through this
//! crate, and anything else that edits the store. This crate keeps them
//! apart without feedback loops or lost edits.
//!
//! # Architecture
//!
//! - [`diff_words`]: word-level diff, rendered as a document with
//!   [`diff_document`]
//! - [`ReconciliationController`]: classifies store changes as our own echo
//!   or external, and holds external ones until accepted or rejected
//! - [`EditDebouncer`]: coalesces editor updates into one commit
//! - [`DocumentEditor`]: the structured editor interface, with
//!   [`MemoryEditor`]
//! - [`EditorSession`]: one open document, driven by [`run`]
//!
//! # Example
//!
//! ```
//! use std::time::Instant;
//!
//! use tippytap_sync::{ReconciliationController, StoreChange, SyncState};
//!
//! let now = Instant::now();
//! let mut controller = ReconciliationController::default();
//! controller.open("A");
//!
//! assert!(matches!(controller.on_store_change("B", now), StoreChange::Pending { .. }));
//! assert_eq!(controller.state(now), SyncState::ExternalChangePending);
//! assert_eq!(controller.reject(now).as_deref(), Some("A"));
//! ```

mod controller;
mod debounce;
mod diff;
mod editor;
mod session;

pub use controller::{DEFAULT_SUPPRESSION_WINDOW, ReconciliationController, StoreChange, SyncState};
pub use debounce::{DEFAULT_EDIT_DEBOUNCE, EditDebouncer};
pub use diff::{
    ChangeKind, DEFAULT_MAX_LCS_CELLS, DiffSpan, diff_document, diff_markup, diff_words,
    diff_words_with_budget,
};
pub use editor::{DocumentEditor, MemoryEditor};
pub use session::{EditorSession, SessionEvent, SessionSettings, ViewMode, run};
