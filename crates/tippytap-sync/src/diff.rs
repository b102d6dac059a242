//! Word-level text diff.
//!
//! Text is split into tokens (runs of word characters, runs of whitespace,
//! and single other characters), then diffed with a longest common
//! subsequence over tokens. The common prefix and suffix are stripped
//! first; if the remaining middle is too large for the LCS table, it is
//! reported as one removal followed by one addition.

use tippytap_model::Node;

/// Default limit on LCS table cells (old tokens × new tokens).
pub const DEFAULT_MAX_LCS_CELLS: usize = 1_000_000;

/// Kind of a diff span.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChangeKind {
    Unchanged,
    Added,
    Removed,
}

/// A run of text with the same change kind.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DiffSpan {
    pub kind: ChangeKind,
    pub text: String,
}

impl DiffSpan {
    pub fn new(kind: ChangeKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }
}

/// Split text into diff tokens.
fn tokenize(text: &str) -> Vec<&str> {
    #[derive(PartialEq)]
    enum Class {
        Word,
        Space,
        Other,
    }

    fn class(c: char) -> Class {
        if c.is_alphanumeric() || c == '_' {
            Class::Word
        } else if c.is_whitespace() {
            Class::Space
        } else {
            Class::Other
        }
    }

    let mut tokens = Vec::new();
    let mut start = 0;
    let mut current: Option<Class> = None;
    for (i, c) in text.char_indices() {
        let next = class(c);
        let continues = match &current {
            Some(prev) => *prev == next && next != Class::Other,
            None => true,
        };
        if !continues {
            tokens.push(&text[start..i]);
            start = i;
        }
        current = Some(next);
    }
    if start < text.len() {
        tokens.push(&text[start..]);
    }
    tokens
}

/// Diff two texts word by word.
pub fn diff_words(old: &str, new: &str) -> Vec<DiffSpan> {
    diff_words_with_budget(old, new, DEFAULT_MAX_LCS_CELLS)
}

/// Diff two texts word by word with a limit on the LCS table size.
pub fn diff_words_with_budget(old: &str, new: &str, max_cells: usize) -> Vec<DiffSpan> {
    let old_tokens = tokenize(old);
    let new_tokens = tokenize(new);

    let prefix = old_tokens
        .iter()
        .zip(&new_tokens)
        .take_while(|(a, b)| a == b)
        .count();
    let suffix = old_tokens[prefix..]
        .iter()
        .rev()
        .zip(new_tokens[prefix..].iter().rev())
        .take_while(|(a, b)| a == b)
        .count();

    let old_mid = &old_tokens[prefix..old_tokens.len() - suffix];
    let new_mid = &new_tokens[prefix..new_tokens.len() - suffix];

    let mut spans = SpanBuilder::default();
    for token in &old_tokens[..prefix] {
        spans.push(ChangeKind::Unchanged, token);
    }

    let cells = (old_mid.len() + 1).saturating_mul(new_mid.len() + 1);
    if cells > max_cells {
        tracing::debug!(cells, max_cells, "Diff too large for LCS, replacing whole middle");
        for token in old_mid {
            spans.push(ChangeKind::Removed, token);
        }
        for token in new_mid {
            spans.push(ChangeKind::Added, token);
        }
    } else {
        lcs_diff(old_mid, new_mid, &mut spans);
    }

    for token in &old_tokens[old_tokens.len() - suffix..] {
        spans.push(ChangeKind::Unchanged, token);
    }
    spans.finish()
}

fn lcs_diff(old: &[&str], new: &[&str], spans: &mut SpanBuilder) {
    let width = new.len() + 1;
    // table[i * width + j]: LCS length of old[i..] and new[j..]
    let mut table = vec![0u32; (old.len() + 1) * width];
    for i in (0..old.len()).rev() {
        for j in (0..new.len()).rev() {
            table[i * width + j] = if old[i] == new[j] {
                table[(i + 1) * width + j + 1] + 1
            } else {
                table[(i + 1) * width + j].max(table[i * width + j + 1])
            };
        }
    }

    let (mut i, mut j) = (0, 0);
    while i < old.len() && j < new.len() {
        if old[i] == new[j] {
            spans.push(ChangeKind::Unchanged, old[i]);
            i += 1;
            j += 1;
        } else if table[(i + 1) * width + j] >= table[i * width + j + 1] {
            spans.push(ChangeKind::Removed, old[i]);
            i += 1;
        } else {
            spans.push(ChangeKind::Added, new[j]);
            j += 1;
        }
    }
    for token in &old[i..] {
        spans.push(ChangeKind::Removed, token);
    }
    for token in &new[j..] {
        spans.push(ChangeKind::Added, token);
    }
}

/// Accumulates tokens into merged spans.
#[derive(Default)]
struct SpanBuilder {
    spans: Vec<DiffSpan>,
}

impl SpanBuilder {
    fn push(&mut self, kind: ChangeKind, token: &str) {
        match self.spans.last_mut() {
            Some(last) if last.kind == kind => last.text.push_str(token),
            _ => self.spans.push(DiffSpan::new(kind, token)),
        }
    }

    fn finish(self) -> Vec<DiffSpan> {
        self.spans
    }
}

/// Markdown with added and removed text wrapped in diff marker spans.
///
/// `&` and `<` in the text are escaped so the markers are the only markup
/// introduced.
pub fn diff_markup(spans: &[DiffSpan]) -> String {
    let mut out = String::new();
    for span in spans {
        let text = escape_diff_text(&span.text);
        match span.kind {
            ChangeKind::Unchanged => out.push_str(&text),
            ChangeKind::Added => {
                out.push_str(r#"<span data-diff-added="true">"#);
                out.push_str(&text);
                out.push_str("</span>");
            }
            ChangeKind::Removed => {
                out.push_str(r#"<span data-diff-removed="true">"#);
                out.push_str(&text);
                out.push_str("</span>");
            }
        }
    }
    out
}

fn escape_diff_text(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;")
}

/// Decode a diff into a document, with diff marks on changed text.
///
/// Uses the same decoder as the editor, so diagrams in the diff are
/// diagram leaves.
pub fn diff_document(spans: &[DiffSpan]) -> Node {
    tippytap_mermaid::decode(&diff_markup(spans))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tippytap_model::Mark;

    fn span(kind: ChangeKind, text: &str) -> DiffSpan {
        DiffSpan::new(kind, text)
    }

    #[test]
    fn test_tokenize() {
        assert_eq!(
            tokenize("Hello,  wide world_1!\n"),
            vec!["Hello", ",", "  ", "wide", " ", "world_1", "!", "\n"]
        );
        assert_eq!(tokenize("**"), vec!["*", "*"]);
        assert!(tokenize("").is_empty());
    }

    #[test]
    fn test_identical_texts() {
        assert_eq!(
            diff_words("same text", "same text"),
            vec![span(ChangeKind::Unchanged, "same text")]
        );
        assert!(diff_words("", "").is_empty());
    }

    #[test]
    fn test_replaced_word() {
        assert_eq!(
            diff_words("the quick fox", "the slow fox"),
            vec![
                span(ChangeKind::Unchanged, "the "),
                span(ChangeKind::Removed, "quick"),
                span(ChangeKind::Added, "slow"),
                span(ChangeKind::Unchanged, " fox"),
            ]
        );
    }

    #[test]
    fn test_insertion_and_deletion() {
        assert_eq!(
            diff_words("a c", "a b c"),
            vec![
                span(ChangeKind::Unchanged, "a "),
                span(ChangeKind::Added, "b "),
                span(ChangeKind::Unchanged, "c"),
            ]
        );
        assert_eq!(
            diff_words("a b c", "a c"),
            vec![
                span(ChangeKind::Unchanged, "a "),
                span(ChangeKind::Removed, "b "),
                span(ChangeKind::Unchanged, "c"),
            ]
        );
    }

    #[test]
    fn test_from_and_to_empty() {
        assert_eq!(diff_words("", "new"), vec![span(ChangeKind::Added, "new")]);
        assert_eq!(diff_words("old", ""), vec![span(ChangeKind::Removed, "old")]);
    }

    #[test]
    fn test_lcs_keeps_common_words_in_the_middle() {
        assert_eq!(
            diff_words("one two three four", "zero two four five"),
            vec![
                span(ChangeKind::Removed, "one"),
                span(ChangeKind::Added, "zero"),
                span(ChangeKind::Unchanged, " two "),
                span(ChangeKind::Removed, "three "),
                span(ChangeKind::Unchanged, "four"),
                span(ChangeKind::Added, " five"),
            ]
        );
    }

    #[test]
    fn test_budget_exceeded_replaces_middle() {
        assert_eq!(
            diff_words_with_budget("keep a b keep", "keep c d keep", 4),
            vec![
                span(ChangeKind::Unchanged, "keep "),
                span(ChangeKind::Removed, "a b"),
                span(ChangeKind::Added, "c d"),
                span(ChangeKind::Unchanged, " keep"),
            ]
        );
    }

    #[test]
    fn test_diff_markup_escapes_text() {
        let spans = vec![
            span(ChangeKind::Unchanged, "a < b & "),
            span(ChangeKind::Added, "<c>"),
            span(ChangeKind::Removed, "d"),
        ];
        assert_eq!(
            diff_markup(&spans),
            concat!(
                "a &lt; b &amp; ",
                r#"<span data-diff-added="true">&lt;c></span>"#,
                r#"<span data-diff-removed="true">d</span>"#,
            )
        );
    }

    #[test]
    fn test_diff_document_marks_changes() {
        let doc = diff_document(&diff_words("Hello world", "Hello there"));
        assert_eq!(
            doc,
            Node::doc(vec![Node::paragraph(vec![
                Node::text("Hello "),
                Node::marked_text("world", vec![Mark::DiffRemoved]),
                Node::marked_text("there", vec![Mark::DiffAdded]),
            ])])
        );
    }

    #[test]
    fn test_diff_document_keeps_diagrams() {
        let old = "# T\n\n```mermaid\nA-->B\n```";
        let new = "# T2\n\n```mermaid\nA-->B\n```";
        let doc = diff_document(&diff_words(old, new));

        assert_eq!(doc.child_count(), 2);
        assert_eq!(doc.children()[1], Node::mermaid("A-->B"));
    }
}
