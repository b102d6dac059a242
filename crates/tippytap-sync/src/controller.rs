//! External-change reconciliation.
//!
//! The text store notifies for every write, including the ones this side
//! makes. The controller tells them apart with a suppression window: a
//! change reported shortly after our own write is taken to be its echo.
//! A genuine external edit landing inside the window is dropped too; the
//! window is short enough that this is accepted.

use std::time::{Duration, Instant};

use crate::diff::{DEFAULT_MAX_LCS_CELLS, DiffSpan, diff_words_with_budget};

/// Default time after our own write during which store changes are ignored.
pub const DEFAULT_SUPPRESSION_WINDOW: Duration = Duration::from_millis(100);

/// Reconciliation state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SyncState {
    /// The store holds what the editor last wrote or accepted.
    Synced,
    /// An external change is waiting to be accepted or rejected.
    ExternalChangePending,
    /// Our own write was just made; its echo is expected.
    ApplyingLocalEdit,
}

/// How a store change was classified.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StoreChange {
    /// Inside the suppression window; taken to be our own echo.
    Suppressed,
    /// Same text as last synced.
    Unchanged,
    /// The store went back to the last synced text, so the pending change
    /// is gone.
    Withdrawn,
    /// External change waiting for a decision.
    Pending { diff: Vec<DiffSpan> },
}

/// Reconciliation controller for one document.
#[derive(Debug)]
pub struct ReconciliationController {
    last_synced: String,
    pending: Option<PendingChange>,
    suppressed_until: Option<Instant>,
    window: Duration,
    max_lcs_cells: usize,
}

#[derive(Debug)]
struct PendingChange {
    text: String,
    diff: Vec<DiffSpan>,
}

impl Default for ReconciliationController {
    fn default() -> Self {
        Self::new(DEFAULT_SUPPRESSION_WINDOW)
    }
}

impl ReconciliationController {
    pub fn new(window: Duration) -> Self {
        Self {
            last_synced: String::new(),
            pending: None,
            suppressed_until: None,
            window,
            max_lcs_cells: DEFAULT_MAX_LCS_CELLS,
        }
    }

    /// Set the LCS budget used for diffs.
    #[must_use]
    pub fn with_max_lcs_cells(mut self, max_lcs_cells: usize) -> Self {
        self.max_lcs_cells = max_lcs_cells;
        self
    }

    /// Start tracking a document whose store holds `text`.
    pub fn open(&mut self, text: impl Into<String>) {
        self.last_synced = text.into();
        self.pending = None;
        self.suppressed_until = None;
    }

    pub fn state(&self, now: Instant) -> SyncState {
        if self.pending.is_some() {
            SyncState::ExternalChangePending
        } else if self.is_suppressed(now) {
            SyncState::ApplyingLocalEdit
        } else {
            SyncState::Synced
        }
    }

    /// Text the store held when both sides last agreed.
    pub fn last_synced(&self) -> &str {
        &self.last_synced
    }

    pub fn pending_text(&self) -> Option<&str> {
        self.pending.as_ref().map(|p| p.text.as_str())
    }

    pub fn pending_diff(&self) -> Option<&[DiffSpan]> {
        self.pending.as_ref().map(|p| p.diff.as_slice())
    }

    /// Record a local edit.
    ///
    /// Returns the text to write to the store, or `None` when nothing should
    /// be written: a change is pending, or the text is already synced.
    pub fn commit_local(&mut self, markdown: &str, now: Instant) -> Option<String> {
        if self.pending.is_some() {
            tracing::debug!("External change pending, local edit not committed");
            return None;
        }
        if markdown == self.last_synced {
            return None;
        }
        markdown.clone_into(&mut self.last_synced);
        self.suppress(now);
        Some(self.last_synced.clone())
    }

    /// Classify a change reported by the store.
    pub fn on_store_change(&mut self, text: &str, now: Instant) -> StoreChange {
        if self.is_suppressed(now) {
            tracing::debug!("Store change inside suppression window");
            return StoreChange::Suppressed;
        }
        if text == self.last_synced {
            return if self.pending.take().is_some() {
                tracing::info!("External change withdrawn");
                StoreChange::Withdrawn
            } else {
                StoreChange::Unchanged
            };
        }

        let diff = diff_words_with_budget(&self.last_synced, text, self.max_lcs_cells);
        tracing::info!(spans = diff.len(), "External change pending");
        self.pending = Some(PendingChange {
            text: text.to_owned(),
            diff: diff.clone(),
        });
        StoreChange::Pending { diff }
    }

    /// Take the pending change as the new synced text.
    ///
    /// Returns the text to write back, or `None` if nothing was pending.
    pub fn accept(&mut self, now: Instant) -> Option<String> {
        let pending = self.pending.take()?;
        self.last_synced = pending.text;
        self.suppress(now);
        Some(self.last_synced.clone())
    }

    /// Drop the pending change.
    ///
    /// Returns the last synced text to write back over it, or `None` if
    /// nothing was pending.
    pub fn reject(&mut self, now: Instant) -> Option<String> {
        self.pending.take()?;
        self.suppress(now);
        Some(self.last_synced.clone())
    }

    fn suppress(&mut self, now: Instant) {
        self.suppressed_until = Some(now + self.window);
    }

    fn is_suppressed(&self, now: Instant) -> bool {
        self.suppressed_until.is_some_and(|until| now < until)
    }
}
