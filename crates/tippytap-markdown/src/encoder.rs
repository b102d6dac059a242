//! Document tree → Markdown.
//!
//! The encoder writes blocks lazily: closing a block only records it, and
//! the separator (newline or blank line, carrying the current line prefix)
//! is emitted when the next block starts writing. Nested containers extend
//! the line prefix (`> ` for quotes, the marker width for list items).

use std::sync::LazyLock;

use regex::Regex;
use tippytap_model::{Mark, Node, NodeType};

/// Error from encoding a tree that breaks the document invariants.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum EncodeError {
    /// A node appeared where its kind is not allowed.
    #[error("Unexpected {node} node inside {parent}")]
    UnexpectedNode {
        node: &'static str,
        parent: &'static str,
    },

    /// Heading level outside 1-6.
    #[error("Invalid heading level {0}")]
    InvalidHeadingLevel(u8),
}

static LINE_START_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\+ |[\-*>])").expect("invalid line start regex"));
static LINE_START_HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\s*)(#{1,6})(\s|$)").expect("invalid heading regex"));
static LINE_START_ORDERED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\s*\d+)\.\s").expect("invalid ordered marker regex"));

/// Markdown serializer state.
pub struct MarkdownEncoder {
    out: String,
    /// Prefix written at the start of every line of the current block.
    delim: String,
    /// Last closed block whose separator has not been written yet.
    closed: Option<NodeType>,
    at_block_start: bool,
    in_table: bool,
}

impl MarkdownEncoder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            out: String::new(),
            delim: String::new(),
            closed: None,
            at_block_start: false,
            in_table: false,
        }
    }

    /// Encode a document (or a single block) to Markdown.
    pub fn encode(mut self, node: &Node) -> Result<String, EncodeError> {
        match node {
            Node::Doc { content } => self.render_content(node.node_type(), content)?,
            _ => self.render_block(node, NodeType::Doc)?,
        }
        Ok(self.out)
    }

    fn render_content(&mut self, parent: NodeType, content: &[Node]) -> Result<(), EncodeError> {
        for child in content {
            self.render_block(child, parent)?;
        }
        Ok(())
    }

    fn render_block(&mut self, node: &Node, parent: NodeType) -> Result<(), EncodeError> {
        match node {
            Node::Paragraph { .. } => {
                self.render_inline(node)?;
                self.close_block(node);
            }
            Node::Heading { level, .. } => {
                if !(1..=6).contains(level) {
                    return Err(EncodeError::InvalidHeadingLevel(*level));
                }
                self.write(&format!("{} ", "#".repeat(usize::from(*level))));
                self.render_inline(node)?;
                self.close_block(node);
            }
            Node::Blockquote { content } => {
                self.wrap_block("> ", None, node, |s| {
                    s.render_content(NodeType::Blockquote, content)
                })?;
            }
            Node::CodeBlock { language, text } => {
                self.fenced(language.as_deref().unwrap_or(""), text);
                self.close_block(node);
            }
            Node::Mermaid { content } => {
                self.fenced("mermaid", content);
                self.close_block(node);
            }
            Node::HorizontalRule { markup } => {
                self.write(if markup.is_empty() { "---" } else { markup });
                self.close_block(node);
            }
            Node::OrderedList { start, .. } => {
                let count = u32::try_from(node.child_count()).unwrap_or(u32::MAX);
                let last = start.saturating_add(count.saturating_sub(1));
                let width = last.to_string().len();
                let delim = " ".repeat(width + 2);
                self.render_list(node, &delim, |i| {
                    let n = start.saturating_add(u32::try_from(i).unwrap_or(u32::MAX));
                    format!("{n:>width$}. ")
                })?;
            }
            Node::BulletList { .. } => {
                self.render_list(node, "  ", |_| "- ".to_owned())?;
            }
            Node::Table { content } => {
                for (index, row) in content.iter().enumerate() {
                    self.render_table_row(row, index == 0)?;
                }
                self.close_block(node);
            }
            Node::Doc { .. }
            | Node::ListItem { .. }
            | Node::TableRow { .. }
            | Node::TableCell { .. }
            | Node::TableHeader { .. }
            | Node::HardBreak
            | Node::Text { .. }
            | Node::Image { .. } => {
                return Err(EncodeError::UnexpectedNode {
                    node: node.node_type().name(),
                    parent: parent.name(),
                });
            }
        }
        Ok(())
    }

    fn fenced(&mut self, language: &str, text: &str) {
        self.write(&format!("```{language}\n"));
        self.text(text, false);
        self.ensure_new_line();
        self.write("```");
    }

    fn render_list(
        &mut self,
        list: &Node,
        delim: &str,
        first_delim: impl Fn(usize) -> String,
    ) -> Result<(), EncodeError> {
        let kind = list.node_type();
        let tight = matches!(
            list,
            Node::OrderedList { tight: true, .. } | Node::BulletList { tight: true, .. }
        );

        if self.closed == Some(kind) {
            self.flush_close(3);
        }

        for (i, item) in list.children().iter().enumerate() {
            let Node::ListItem { content } = item else {
                return Err(EncodeError::UnexpectedNode {
                    node: item.node_type().name(),
                    parent: kind.name(),
                });
            };
            if i > 0 && tight {
                self.flush_close(1);
            }
            self.wrap_block(delim, Some(&first_delim(i)), list, |s| {
                for (j, child) in content.iter().enumerate() {
                    // A blank line between the blocks of an item makes the
                    // whole list loose.
                    if tight && j > 0 && joins_tightly(&content[j - 1], child) {
                        s.flush_close(1);
                    }
                    s.render_block(child, NodeType::ListItem)?;
                }
                Ok(())
            })?;
        }
        Ok(())
    }

    fn render_table_row(&mut self, row: &Node, header: bool) -> Result<(), EncodeError> {
        let Node::TableRow { content } = row else {
            return Err(EncodeError::UnexpectedNode {
                node: row.node_type().name(),
                parent: NodeType::Table.name(),
            });
        };

        self.write("|");
        for (i, cell) in content.iter().enumerate() {
            if !matches!(cell, Node::TableCell { .. } | Node::TableHeader { .. }) {
                return Err(EncodeError::UnexpectedNode {
                    node: cell.node_type().name(),
                    parent: NodeType::TableRow.name(),
                });
            }
            if i > 0 {
                self.write("|");
            }
            self.write(" ");
            self.in_table = true;
            let result = self.render_inline(cell);
            self.in_table = false;
            result?;
            self.write(" ");
        }
        self.write("|\n");

        if header {
            self.write("|");
            for i in 0..content.len() {
                if i > 0 {
                    self.write("|");
                }
                self.write("---");
            }
            self.write("|\n");
        }
        Ok(())
    }

    /// Render the inline content of a textblock, opening and closing marks
    /// as the mark set changes from node to node.
    fn render_inline(&mut self, parent: &Node) -> Result<(), EncodeError> {
        self.at_block_start = true;
        let mut state = InlineState::default();

        for index in 0..=parent.children().len() {
            self.progress(parent, index, &mut state)?;
        }

        self.at_block_start = false;
        Ok(())
    }

    #[allow(clippy::too_many_lines)]
    fn progress(
        &mut self,
        parent: &Node,
        index: usize,
        state: &mut InlineState,
    ) -> Result<(), EncodeError> {
        let children = parent.children();
        let node = children.get(index);

        let mut marks: Vec<Mark> = match node {
            Some(Node::Text { marks, .. }) => visible_marks(marks),
            Some(Node::HardBreak) => hard_break_marks(children, index),
            Some(Node::Image { .. }) | None => Vec::new(),
            Some(other) => {
                return Err(EncodeError::UnexpectedNode {
                    node: other.node_type().name(),
                    parent: parent.node_type().name(),
                });
            }
        };

        let mut leading = std::mem::take(&mut state.trailing);
        let mut present = node.is_some();
        let mut text = match node {
            Some(Node::Text { text, .. }) => Some(text.as_str()),
            _ => None,
        };

        // Whitespace at the edges of an emphasis mark moves outside it.
        if let Some(t) = text
            && marks
                .iter()
                .any(|m| expels_whitespace(m) && !state.active.contains(m))
        {
            let rest = t.trim_start();
            if rest.len() < t.len() {
                leading.push_str(&t[..t.len() - rest.len()]);
                text = Some(rest);
                if rest.is_empty() {
                    present = false;
                    marks.clone_from(&state.active);
                }
            }
        }
        if present && let Some(t) = text {
            let next_marks = children.get(index + 1).map(|next| visible_marks(next.marks()));
            if marks.iter().any(|m| {
                expels_whitespace(m) && next_marks.as_ref().is_none_or(|next| !next.contains(m))
            }) {
                let rest = t.trim_end();
                if rest.len() < t.len() {
                    state.trailing.push_str(&t[rest.len()..]);
                    text = Some(rest);
                    if rest.is_empty() {
                        present = false;
                        marks.clone_from(&state.active);
                    }
                }
            }
        }

        // Code is always the innermost mark and its content is not escaped.
        let no_escape = marks.last() == Some(&Mark::Code);
        let len = marks.len() - usize::from(no_escape);

        // Reorder mixable marks so their order matches the already open ones.
        for i in 0..len {
            if !is_mixable(&marks[i]) {
                break;
            }
            let Some(j) = state
                .active
                .iter()
                .take_while(|m| is_mixable(m))
                .position(|m| *m == marks[i])
            else {
                continue;
            };
            let j = j.min(len);
            if i > j {
                let mark = marks.remove(i);
                marks.insert(j, mark);
            } else if j > i {
                let mark = marks.remove(i);
                marks.insert(j - 1, mark);
            }
        }

        // Keep the prefix of marks that did not change.
        let mut keep = 0;
        while keep < state.active.len().min(len) && marks[keep] == state.active[keep] {
            keep += 1;
        }

        // Set when the output ends in a `*` closer that a `*` opener would
        // run into.
        let mut after_star_closer = false;
        while keep < state.active.len() {
            state.active.pop();
            if let Some(close) = state.closers.pop() {
                after_star_closer = close.ends_with('*');
                self.text(&close, false);
            }
        }

        if !leading.is_empty() {
            after_star_closer = false;
            self.text(&leading, true);
        }

        if present {
            while state.active.len() < len {
                let add = marks[state.active.len()].clone();
                let (open, close) = match underscore_delimiter(&add) {
                    Some(delim)
                        if after_star_closer && underscore_can_close(children, index, &add) =>
                    {
                        (delim.to_owned(), delim.to_owned())
                    }
                    _ => (mark_string(&add, true), mark_string(&add, false)),
                };
                after_star_closer = false;
                state.active.push(add);
                state.closers.push(close);
                self.text(&open, false);
                self.at_block_start = false;
            }

            match (node, text) {
                (Some(Node::Text { .. }), Some(t)) if no_escape => {
                    self.text(&format!("`{t}`"), false);
                }
                (Some(Node::Text { .. }), Some(t)) => self.text(t, true),
                (Some(Node::HardBreak), _) => {
                    let later_content = children[index + 1..]
                        .iter()
                        .any(|sibling| !matches!(sibling, Node::HardBreak));
                    if later_content {
                        self.write("\\\n");
                    }
                }
                (Some(Node::Image { src, alt, title }), _) => {
                    let alt = escape_text(alt.as_deref().unwrap_or(""), false, self.in_table);
                    let src = src.replace('(', "\\(").replace(')', "\\)");
                    let title = title
                        .as_ref()
                        .map(|t| format!(" \"{}\"", t.replace('"', "\\\"")))
                        .unwrap_or_default();
                    self.write(&format!("![{alt}]({src}{title})"));
                }
                _ => {}
            }
            self.at_block_start = false;
        }

        Ok(())
    }

    fn wrap_block(
        &mut self,
        delim: &str,
        first_delim: Option<&str>,
        node: &Node,
        f: impl FnOnce(&mut Self) -> Result<(), EncodeError>,
    ) -> Result<(), EncodeError> {
        let old = self.delim.clone();
        self.write(first_delim.unwrap_or(delim));
        self.delim.push_str(delim);
        let result = f(self);
        self.delim = old;
        self.close_block(node);
        result
    }

    fn close_block(&mut self, node: &Node) {
        self.closed = Some(node.node_type());
    }

    /// Write the separator owed by the last closed block.
    ///
    /// `size` is the number of line breaks: 1 ends the line, 2 adds a blank
    /// line, 3 adds two (to keep adjacent lists of the same kind apart).
    fn flush_close(&mut self, size: usize) {
        if self.closed.take().is_none() || self.out.is_empty() {
            return;
        }
        if !self.at_blank() {
            self.out.push('\n');
        }
        if size > 1 {
            let delim_min = self.delim.trim_end().to_owned();
            for _ in 1..size {
                self.out.push_str(&delim_min);
                self.out.push('\n');
            }
        }
    }

    fn at_blank(&self) -> bool {
        self.out.is_empty() || self.out.ends_with('\n')
    }

    fn ensure_new_line(&mut self) {
        if !self.at_blank() {
            self.out.push('\n');
        }
    }

    fn write(&mut self, content: &str) {
        self.flush_close(2);
        if !self.delim.is_empty() && self.at_blank() {
            self.out.push_str(&self.delim);
        }
        self.out.push_str(content);
    }

    fn text(&mut self, text: &str, escape: bool) {
        let mut lines = text.split('\n').peekable();
        while let Some(line) = lines.next() {
            self.write("");
            if !escape && line.starts_with('[') && ends_with_unescaped_bang(&self.out) {
                self.out.pop();
                self.out.push_str("\\!");
            }
            if escape {
                let escaped = escape_text(line, self.at_block_start, self.in_table);
                self.out.push_str(&escaped);
            } else {
                self.out.push_str(line);
            }
            if lines.peek().is_some() {
                self.out.push('\n');
            }
        }
    }
}

impl Default for MarkdownEncoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Marks open at the current point of an inline run.
#[derive(Default)]
struct InlineState {
    active: Vec<Mark>,
    /// Closing delimiter for each entry of `active`.
    closers: Vec<String>,
    /// Whitespace expelled from the end of the last marked span.
    trailing: String,
}

/// Marks that produce Markdown syntax. Diff marks only exist in the diff view.
fn visible_marks(marks: &[Mark]) -> Vec<Mark> {
    marks
        .iter()
        .filter(|m| !matches!(m, Mark::DiffAdded | Mark::DiffRemoved))
        .cloned()
        .collect()
}

/// A hard break stays inside the marks its neighbours share, so a break in
/// the middle of bold text does not close and reopen the emphasis.
fn hard_break_marks(children: &[Node], index: usize) -> Vec<Mark> {
    let previous = index
        .checked_sub(1)
        .and_then(|i| children.get(i))
        .map(|node| visible_marks(node.marks()))
        .unwrap_or_default();
    match children.get(index + 1) {
        Some(Node::Text { text, marks }) if text.chars().any(|c| !c.is_whitespace()) => previous
            .into_iter()
            .filter(|m| marks.contains(m))
            .collect(),
        _ => Vec::new(),
    }
}

/// Underscore delimiter for an emphasis mark.
///
/// Reopening emphasis right after a `*` closer with `*` merges both into one
/// delimiter run, which parses differently. An underscore opener after `*`
/// always opens.
fn underscore_delimiter(mark: &Mark) -> Option<&'static str> {
    match mark {
        Mark::Strong => Some("__"),
        Mark::Em => Some("_"),
        _ => None,
    }
}

/// Whether an underscore delimiter for `mark` opened at `index` can close
/// where the mark ends. It cannot close right before a letter or digit.
fn underscore_can_close(children: &[Node], index: usize, mark: &Mark) -> bool {
    let carries = |i: usize| match &children[i] {
        Node::HardBreak => hard_break_marks(children, i).contains(mark),
        node => visible_marks(node.marks()).contains(mark),
    };
    let Some(end) = (index..children.len()).find(|&i| !carries(i)) else {
        return true;
    };
    if let Some(Node::Text { text, .. }) = end.checked_sub(1).map(|i| &children[i])
        && text.ends_with(char::is_whitespace)
    {
        return true;
    }
    match &children[end] {
        Node::Text { text, .. } => text.chars().next().is_none_or(|c| !c.is_alphanumeric()),
        _ => true,
    }
}

/// Whether two consecutive blocks of a list item can go on consecutive lines
/// and still parse as two blocks.
fn joins_tightly(prev: &Node, next: &Node) -> bool {
    match prev {
        Node::Heading { .. }
        | Node::CodeBlock { .. }
        | Node::Mermaid { .. }
        | Node::HorizontalRule { .. } => true,
        // Only blocks that interrupt a paragraph.
        Node::Paragraph { .. } => match next {
            Node::Heading { .. }
            | Node::CodeBlock { .. }
            | Node::Mermaid { .. }
            | Node::Blockquote { .. } => true,
            Node::BulletList { content, .. } => starts_with_content(content),
            Node::OrderedList { start, content, .. } => *start == 1 && starts_with_content(content),
            _ => false,
        },
        _ => false,
    }
}

/// Whether the first item of a list starts with something other than an
/// empty paragraph.
fn starts_with_content(items: &[Node]) -> bool {
    match items.first().and_then(|item| item.children().first()) {
        Some(Node::Paragraph { content }) => !content.is_empty(),
        Some(_) => true,
        None => false,
    }
}

fn is_mixable(mark: &Mark) -> bool {
    matches!(mark, Mark::Strong | Mark::Em | Mark::Strike)
}

fn expels_whitespace(mark: &Mark) -> bool {
    is_mixable(mark)
}

fn mark_string(mark: &Mark, open: bool) -> String {
    match mark {
        Mark::Strong => "**".to_owned(),
        Mark::Em => "*".to_owned(),
        Mark::Strike => "~~".to_owned(),
        Mark::Code => "`".to_owned(),
        Mark::Link { href, title } => {
            if open {
                "[".to_owned()
            } else {
                match title {
                    Some(title) => format!("]({href} \"{title}\")"),
                    None => format!("]({href})"),
                }
            }
        }
        Mark::DiffAdded | Mark::DiffRemoved => String::new(),
    }
}

fn ends_with_unescaped_bang(out: &str) -> bool {
    out.ends_with('!') && !out.ends_with("\\!")
}

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Escape Markdown syntax characters in text.
///
/// `_` between two word characters is left alone. At the start of a line,
/// text that would read as a block marker (list bullet, quote, heading,
/// ordered list number) is escaped too.
pub fn escape_text(text: &str, start_of_line: bool, in_table: bool) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut result = String::with_capacity(text.len());
    for (i, &c) in chars.iter().enumerate() {
        match c {
            '_' if i > 0
                && i + 1 < chars.len()
                && is_word_char(chars[i - 1])
                && is_word_char(chars[i + 1]) =>
            {
                result.push('_');
            }
            '`' | '*' | '\\' | '~' | '[' | ']' | '_' => {
                result.push('\\');
                result.push(c);
            }
            '|' if in_table => result.push_str("\\|"),
            _ => result.push(c),
        }
    }

    if start_of_line {
        result = LINE_START_MARKER.replace(&result, r"\${0}").into_owned();
        result = LINE_START_HEADING
            .replace(&result, r"${1}\${2}${3}")
            .into_owned();
        result = LINE_START_ORDERED.replace(&result, r"${1}\. ").into_owned();
    }
    result
}
