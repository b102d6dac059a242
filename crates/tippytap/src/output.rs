//! Colored terminal output utilities.

use console::{Style, Term};
use tippytap_sync::{ChangeKind, DiffSpan};

/// Terminal output formatter.
///
/// Command results go to stdout; status messages go to stderr.
pub(crate) struct Output {
    out: Term,
    term: Term,
    green: Style,
    yellow: Style,
    red: Style,
}

impl Output {
    /// Create a new output formatter.
    #[must_use]
    pub(crate) fn new() -> Self {
        Self {
            out: Term::stdout(),
            term: Term::stderr(),
            green: Style::new().green(),
            yellow: Style::new().yellow(),
            red: Style::new().red(),
        }
    }

    /// Print a command result to stdout.
    pub(crate) fn print(&self, text: &str) -> std::io::Result<()> {
        self.out.write_str(text)
    }

    /// Print a word diff to stdout.
    pub(crate) fn print_diff(&self, spans: &[DiffSpan]) -> std::io::Result<()> {
        self.out
            .write_line(&format_diff(spans, &self.green, &self.red))
    }

    /// Print an info message.
    pub(crate) fn info(&self, msg: &str) {
        let _ = self.term.write_line(msg);
    }

    /// Print a success message (green).
    pub(crate) fn success(&self, msg: &str) {
        let _ = self.term.write_line(&self.green.apply_to(msg).to_string());
    }

    /// Print a warning message (yellow).
    pub(crate) fn warning(&self, msg: &str) {
        let _ = self.term.write_line(&self.yellow.apply_to(msg).to_string());
    }

    /// Print an error message (red).
    pub(crate) fn error(&self, msg: &str) {
        let _ = self.term.write_line(&self.red.apply_to(msg).to_string());
    }
}

/// Word diff in `git diff --word-diff` notation, colored with the given
/// styles when the terminal supports it.
pub(crate) fn format_diff(spans: &[DiffSpan], added: &Style, removed: &Style) -> String {
    spans
        .iter()
        .map(|span| match span.kind {
            ChangeKind::Unchanged => span.text.clone(),
            ChangeKind::Added => added.apply_to(format!("{{+{}+}}", span.text)).to_string(),
            ChangeKind::Removed => removed.apply_to(format!("[-{}-]", span.text)).to_string(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tippytap_sync::diff_words;

    #[test]
    fn test_format_diff_plain() {
        let plain = Style::new();
        let spans = diff_words("the quick fox", "the slow fox");

        assert_eq!(
            format_diff(&spans, &plain, &plain),
            "the [-quick-]{+slow+} fox"
        );
    }
}
