//! Debouncing of local edits.
//!
//! Every editor update produces freshly encoded Markdown. Only the latest
//! one matters, and it is committed once edits have been quiet for the
//! debounce delay.

use std::time::{Duration, Instant};

/// Default quiet period before a local edit is committed.
pub const DEFAULT_EDIT_DEBOUNCE: Duration = Duration::from_millis(300);

/// Holds the latest encoded edit until its deadline passes.
#[derive(Debug)]
pub struct EditDebouncer {
    delay: Duration,
    pending: Option<PendingEdit>,
}

#[derive(Debug)]
struct PendingEdit {
    markdown: String,
    deadline: Instant,
}

impl Default for EditDebouncer {
    fn default() -> Self {
        Self::new(DEFAULT_EDIT_DEBOUNCE)
    }
}

impl EditDebouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
        }
    }

    /// Record an edit, replacing any pending one and restarting the timer.
    pub fn record(&mut self, markdown: String, now: Instant) {
        self.pending = Some(PendingEdit {
            markdown,
            deadline: now + self.delay,
        });
    }

    /// When the pending edit becomes ready.
    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|p| p.deadline)
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Take the pending edit if its deadline has passed.
    pub fn take_ready(&mut self, now: Instant) -> Option<String> {
        if self.pending.as_ref().is_some_and(|p| p.deadline <= now) {
            self.pending.take().map(|p| p.markdown)
        } else {
            None
        }
    }

    /// Take the pending edit regardless of its deadline.
    pub fn flush(&mut self) -> Option<String> {
        self.pending.take().map(|p| p.markdown)
    }

    /// Drop the pending edit.
    pub fn cancel(&mut self) {
        self.pending = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const DELAY: Duration = Duration::from_millis(300);

    #[test]
    fn test_edit_ready_after_deadline() {
        let start = Instant::now();
        let mut debouncer = EditDebouncer::new(DELAY);

        debouncer.record("a".to_owned(), start);
        assert_eq!(debouncer.deadline(), Some(start + DELAY));
        assert_eq!(debouncer.take_ready(start + Duration::from_millis(299)), None);
        assert_eq!(debouncer.take_ready(start + DELAY), Some("a".to_owned()));
        assert_eq!(debouncer.take_ready(start + DELAY), None);
    }

    #[test]
    fn test_new_edit_restarts_timer_and_replaces_text() {
        let start = Instant::now();
        let mut debouncer = EditDebouncer::new(DELAY);

        debouncer.record("a".to_owned(), start);
        debouncer.record("ab".to_owned(), start + Duration::from_millis(200));

        assert_eq!(debouncer.take_ready(start + DELAY), None);
        assert_eq!(
            debouncer.take_ready(start + Duration::from_millis(500)),
            Some("ab".to_owned())
        );
    }

    #[test]
    fn test_flush_and_cancel() {
        let start = Instant::now();
        let mut debouncer = EditDebouncer::new(DELAY);

        debouncer.record("a".to_owned(), start);
        assert_eq!(debouncer.flush(), Some("a".to_owned()));
        assert!(!debouncer.is_pending());

        debouncer.record("b".to_owned(), start);
        debouncer.cancel();
        assert_eq!(debouncer.flush(), None);
    }
}
