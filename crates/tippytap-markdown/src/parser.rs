//! Lenient HTML → document tree parser.
//!
//! Elements are mapped through the parse rules in [`tippytap_model::schema`].
//! The reader tolerates HTML habits that are not well-formed XML: void
//! elements without a closing slash, unmatched end tags and elements left
//! open at the end of input.
//!
//! Whitespace outside code blocks collapses the way a DOM parser collapses
//! it, and inline content that appears outside a textblock is wrapped in an
//! implicit paragraph.

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use tippytap_model::schema::{self, ParsedElement};
use tippytap_model::{Mark, Node, NodeType};

use crate::entities::{convert_html_entities, decode_entity};

/// Error parsing the intermediate HTML.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum DecodeError {
    /// Malformed markup the reader cannot recover from.
    #[error("HTML parse error")]
    Html(#[from] quick_xml::Error),

    /// Encoding error while decoding names or text.
    #[error("encoding error")]
    Encoding(#[from] quick_xml::encoding::EncodingError),
}

/// Parse HTML into a document tree.
pub fn parse_html(html: &str) -> Result<Node, DecodeError> {
    let html = convert_html_entities(html);
    let mut reader = Reader::from_str(&html);
    let config = reader.config_mut();
    config.trim_text(false);
    config.check_end_names = false;
    config.allow_unmatched_ends = true;

    let mut builder = TreeBuilder::new();
    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                let tag = decode_tag(&reader, e.name().as_ref())?;
                let attrs = decode_attrs(&reader, &e);
                builder.open(&tag, &attrs);
                if schema::is_void_element(&tag) {
                    builder.close(&tag);
                }
            }
            Event::Empty(e) => {
                let tag = decode_tag(&reader, e.name().as_ref())?;
                let attrs = decode_attrs(&reader, &e);
                builder.open(&tag, &attrs);
                builder.close(&tag);
            }
            Event::End(e) => {
                let tag = decode_tag(&reader, e.name().as_ref())?;
                builder.close(&tag);
            }
            Event::Text(e) => {
                let text = reader.decoder().decode(&e)?;
                builder.text(&text);
            }
            Event::GeneralRef(e) => {
                let entity = reader.decoder().decode(&e)?;
                builder.text(&decode_entity(&entity));
            }
            Event::CData(e) => {
                builder.text(&String::from_utf8_lossy(&e));
            }
            Event::Eof => break,
            Event::Comment(_) | Event::Decl(_) | Event::PI(_) | Event::DocType(_) => {}
        }
    }

    Ok(builder.finish())
}

fn decode_tag(reader: &Reader<&[u8]>, name: &[u8]) -> Result<String, DecodeError> {
    Ok(reader.decoder().decode(name)?.to_ascii_lowercase())
}

fn decode_attrs(reader: &Reader<&[u8]>, e: &BytesStart<'_>) -> Vec<(String, String)> {
    e.html_attributes()
        .flatten()
        .map(|attr| {
            let key = reader.decoder().decode(attr.key.as_ref()).map_or_else(
                |_| String::from_utf8_lossy(attr.key.as_ref()).into_owned(),
                std::borrow::Cow::into_owned,
            );
            let value = attr.unescape_value().map_or_else(
                |_| String::from_utf8_lossy(&attr.value).into_owned(),
                std::borrow::Cow::into_owned,
            );
            (key.to_ascii_lowercase(), value)
        })
        .collect()
}

/// What closing an element has to undo.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Effect {
    Block,
    Mark,
    Transparent,
    Ignore,
}

struct OpenElement {
    tag: String,
    effect: Effect,
}

/// A node under construction.
struct Frame {
    node: Node,
    /// Index of the element that opened the frame; `None` for implicit frames.
    element: Option<usize>,
    /// List item: a `<p>` was opened directly inside it.
    has_paragraph: bool,
    /// List: one of its items held an explicit paragraph.
    loose: bool,
}

impl Frame {
    fn new(node: Node, element: Option<usize>) -> Self {
        Self {
            node,
            element,
            has_paragraph: false,
            loose: false,
        }
    }

    fn kind(&self) -> NodeType {
        self.node.node_type()
    }
}

struct TreeBuilder {
    frames: Vec<Frame>,
    elements: Vec<OpenElement>,
    marks: Vec<Mark>,
    ignore_depth: usize,
}

impl TreeBuilder {
    fn new() -> Self {
        Self {
            frames: vec![Frame::new(Node::doc(Vec::new()), None)],
            elements: Vec::new(),
            marks: Vec::new(),
            ignore_depth: 0,
        }
    }

    fn top_kind(&self) -> NodeType {
        self.frames.last().map_or(NodeType::Doc, Frame::kind)
    }

    fn open(&mut self, tag: &str, attrs: &[(String, String)]) {
        let effect = self.open_effect(tag, attrs);
        if effect == Effect::Ignore {
            self.ignore_depth += 1;
        }
        self.elements.push(OpenElement {
            tag: tag.to_owned(),
            effect,
        });
    }

    fn open_effect(&mut self, tag: &str, attrs: &[(String, String)]) -> Effect {
        if self.ignore_depth > 0 {
            return Effect::Ignore;
        }

        if self.top_kind() == NodeType::CodeBlock {
            match tag {
                "code" => {
                    let language = attrs
                        .iter()
                        .find(|(key, _)| key == "class")
                        .and_then(|(_, class)| schema::code_language(class));
                    if let Some(Frame {
                        node: Node::CodeBlock { language: current, .. },
                        ..
                    }) = self.frames.last_mut()
                        && current.is_none()
                    {
                        *current = language;
                    }
                }
                "br" => self.push_code_text("\n"),
                _ => {}
            }
            return Effect::Transparent;
        }

        match schema::parse_element(tag, attrs) {
            ParsedElement::Block(node) => {
                let kind = node.node_type();
                if matches!(self.top_kind(), NodeType::TableCell | NodeType::TableHeader) {
                    // Cells hold inline content only.
                    return Effect::Transparent;
                }
                if kind.is_atom() {
                    self.place_block(kind);
                    self.append(node);
                    return Effect::Ignore;
                }
                self.place_block(kind);
                if kind == NodeType::Paragraph
                    && let Some(frame) = self.frames.last_mut()
                    && frame.kind() == NodeType::ListItem
                {
                    frame.has_paragraph = true;
                }
                let element = self.elements.len();
                self.frames.push(Frame::new(node, Some(element)));
                Effect::Block
            }
            ParsedElement::Inline(node) => {
                self.ensure_inline();
                self.append(node);
                Effect::Transparent
            }
            ParsedElement::Mark(mark) => {
                self.marks.push(mark);
                Effect::Mark
            }
            ParsedElement::Transparent => Effect::Transparent,
            ParsedElement::Ignore => Effect::Ignore,
        }
    }

    fn close(&mut self, tag: &str) {
        let Some(position) = self.elements.iter().rposition(|e| e.tag == tag) else {
            return;
        };
        while self.elements.len() > position {
            let index = self.elements.len() - 1;
            let Some(element) = self.elements.pop() else {
                break;
            };
            match element.effect {
                Effect::Ignore => self.ignore_depth = self.ignore_depth.saturating_sub(1),
                Effect::Mark => {
                    self.marks.pop();
                }
                Effect::Transparent => {}
                Effect::Block => {
                    if let Some(frame) = self.frames.iter().rposition(|f| f.element == Some(index)) {
                        while self.frames.len() > frame {
                            self.close_frame();
                        }
                    }
                }
            }
        }
    }

    fn text(&mut self, text: &str) {
        if self.ignore_depth > 0 {
            return;
        }
        if self.top_kind() == NodeType::CodeBlock {
            self.push_code_text(text);
            return;
        }

        let mut collapsed = collapse_whitespace(text);
        if collapsed.is_empty() {
            return;
        }
        if collapsed == " " && !self.top_kind().is_textblock() {
            return;
        }

        self.ensure_inline();
        let Some(frame) = self.frames.last_mut() else {
            return;
        };
        let Some(content) = frame.node.children_mut() else {
            return;
        };

        if collapsed.starts_with(' ') {
            let drop_leading = match content.last() {
                None | Some(Node::HardBreak) => true,
                Some(Node::Text { text, .. }) => text.ends_with(' '),
                Some(_) => false,
            };
            if drop_leading {
                collapsed.remove(0);
            }
        }
        if collapsed.is_empty() {
            return;
        }

        let marks = Mark::normalize_set(self.marks.clone());
        if let Some(Node::Text {
            text: last,
            marks: last_marks,
        }) = content.last_mut()
            && *last_marks == marks
        {
            last.push_str(&collapsed);
            return;
        }
        content.push(Node::Text {
            text: collapsed,
            marks,
        });
    }

    fn push_code_text(&mut self, text: &str) {
        if let Some(Frame {
            node: Node::CodeBlock { text: code, .. },
            ..
        }) = self.frames.last_mut()
        {
            code.push_str(text);
        }
    }

    /// Close or wrap frames until the top frame can hold a block of `kind`.
    fn place_block(&mut self, kind: NodeType) {
        loop {
            let top = self.top_kind();
            if can_contain(top, kind) {
                return;
            }
            if let Some(wrapper) = implicit_wrapper(top, kind) {
                self.frames.push(Frame::new(wrapper, None));
            } else if self.frames.len() > 1 {
                self.close_frame();
            } else {
                return;
            }
        }
    }

    /// Make sure the top frame is a textblock.
    fn ensure_inline(&mut self) {
        loop {
            let top = self.top_kind();
            if top.is_textblock() {
                return;
            }
            let wrapper = match top {
                NodeType::Doc | NodeType::Blockquote | NodeType::ListItem => {
                    Node::paragraph(Vec::new())
                }
                NodeType::BulletList | NodeType::OrderedList => Node::list_item(Vec::new()),
                NodeType::Table => Node::table_row(Vec::new()),
                NodeType::TableRow => Node::table_cell(Vec::new()),
                _ => {
                    if self.frames.len() > 1 {
                        self.close_frame();
                        continue;
                    }
                    return;
                }
            };
            self.frames.push(Frame::new(wrapper, None));
        }
    }

    fn append(&mut self, node: Node) {
        if let Some(content) = self
            .frames
            .last_mut()
            .and_then(|frame| frame.node.children_mut())
        {
            content.push(node);
        }
    }

    /// Pop the top frame, finish its node and append it to the parent.
    fn close_frame(&mut self) {
        if self.frames.len() <= 1 {
            return;
        }
        let Some(mut frame) = self.frames.pop() else {
            return;
        };

        // An element whose frame closed early no longer owns a block.
        if let Some(element) = frame.element
            && let Some(open) = self.elements.get_mut(element)
        {
            open.effect = Effect::Transparent;
        }

        let implicit = frame.element.is_none();
        match &mut frame.node {
            Node::Paragraph { content }
            | Node::Heading { content, .. }
            | Node::TableCell { content }
            | Node::TableHeader { content } => {
                strip_trailing_whitespace(content);
                if implicit && content.is_empty() {
                    return;
                }
            }
            Node::Blockquote { content } => {
                if content.is_empty() {
                    content.push(Node::paragraph(Vec::new()));
                }
            }
            Node::ListItem { content } => {
                if !matches!(content.first(), Some(Node::Paragraph { .. })) {
                    content.insert(0, Node::paragraph(Vec::new()));
                }
                if frame.has_paragraph
                    && let Some(parent) = self.frames.last_mut()
                {
                    parent.loose = true;
                }
            }
            Node::BulletList { tight, content } | Node::OrderedList { tight, content, .. } => {
                if content.is_empty() {
                    return;
                }
                *tight = *tight || !frame.loose;
            }
            Node::Table { content } | Node::TableRow { content } => {
                if content.is_empty() {
                    return;
                }
            }
            _ => {}
        }

        self.append(frame.node);
    }

    fn finish(mut self) -> Node {
        while self.frames.len() > 1 {
            self.close_frame();
        }
        let mut doc = self
            .frames
            .pop()
            .map_or_else(|| Node::doc(Vec::new()), |frame| frame.node);
        if let Node::Doc { content } = &mut doc
            && content.is_empty()
        {
            content.push(Node::paragraph(Vec::new()));
        }
        doc
    }
}

fn can_contain(parent: NodeType, child: NodeType) -> bool {
    match parent {
        NodeType::Doc | NodeType::Blockquote | NodeType::ListItem => !matches!(
            child,
            NodeType::ListItem | NodeType::TableRow | NodeType::TableCell | NodeType::TableHeader
        ),
        NodeType::BulletList | NodeType::OrderedList => child == NodeType::ListItem,
        NodeType::Table => child == NodeType::TableRow,
        NodeType::TableRow => matches!(child, NodeType::TableCell | NodeType::TableHeader),
        _ => false,
    }
}

fn implicit_wrapper(parent: NodeType, child: NodeType) -> Option<Node> {
    match (parent, child) {
        (NodeType::Doc | NodeType::Blockquote | NodeType::ListItem, NodeType::ListItem) => {
            Some(Node::bullet_list(Vec::new()))
        }
        (
            NodeType::Doc | NodeType::Blockquote | NodeType::ListItem,
            NodeType::TableRow | NodeType::TableCell | NodeType::TableHeader,
        ) => Some(Node::table(Vec::new())),
        (NodeType::BulletList | NodeType::OrderedList, _) => Some(Node::list_item(Vec::new())),
        (NodeType::Table, NodeType::TableCell | NodeType::TableHeader) => {
            Some(Node::table_row(Vec::new()))
        }
        _ => None,
    }
}

fn collapse_whitespace(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut in_space = false;
    for c in text.chars() {
        if matches!(c, ' ' | '\t' | '\n' | '\r' | '\u{000c}') {
            if !in_space {
                result.push(' ');
                in_space = true;
            }
        } else {
            result.push(c);
            in_space = false;
        }
    }
    result
}

fn strip_trailing_whitespace(content: &mut Vec<Node>) {
    if let Some(Node::Text { text, .. }) = content.last_mut() {
        let trimmed = text.trim_end_matches([' ', '\t', '\n', '\r', '\u{000c}']).len();
        text.truncate(trimmed);
        if text.is_empty() {
            content.pop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(html: &str) -> Node {
        parse_html(html).unwrap()
    }

    fn para(text: &str) -> Node {
        Node::paragraph(vec![Node::text(text)])
    }

    #[test]
    fn test_parse_simple_paragraph() {
        assert_eq!(parse("<p>Hello</p>"), Node::doc(vec![para("Hello")]));
    }

    #[test]
    fn test_parse_marks_merge_adjacent_text() {
        assert_eq!(
            parse("<p><strong>a</strong><b>b</b> <em>c</em></p>"),
            Node::doc(vec![Node::paragraph(vec![
                Node::marked_text("ab", vec![Mark::Strong]),
                Node::text(" "),
                Node::marked_text("c", vec![Mark::Em]),
            ])])
        );
    }

    #[test]
    fn test_parse_collapses_whitespace() {
        assert_eq!(
            parse("<p>\n  one \n two  <br />\n three  </p>"),
            Node::doc(vec![Node::paragraph(vec![
                Node::text("one two "),
                Node::HardBreak,
                Node::text("three"),
            ])])
        );
    }

    #[test]
    fn test_parse_code_block_keeps_whitespace() {
        assert_eq!(
            parse(r#"<pre><code class="language-rust">fn a() {
    b &lt; c
}</code></pre>"#),
            Node::doc(vec![Node::code_block(Some("rust"), "fn a() {\n    b < c\n}")])
        );
    }

    #[test]
    fn test_parse_mermaid_container() {
        assert_eq!(
            parse(r#"<div data-mermaid-content="A--&gt;B &amp; &#039;C&#039;" class="mermaid-wrapper"></div>"#),
            Node::doc(vec![Node::mermaid("A-->B & 'C'")])
        );
    }

    #[test]
    fn test_parse_tight_list_from_bare_items() {
        assert_eq!(
            parse("<ul><li>a</li><li>b<ul><li>c</li></ul></li></ul>"),
            Node::doc(vec![Node::bullet_list(vec![
                Node::list_item(vec![para("a")]),
                Node::list_item(vec![
                    para("b"),
                    Node::bullet_list(vec![Node::list_item(vec![para("c")])]),
                ]),
            ])])
        );
    }

    #[test]
    fn test_parse_loose_list_from_paragraph_items() {
        assert_eq!(
            parse("<ol start=\"2\">\n<li>\n<p>a</p>\n</li>\n<li>\n<p>b</p>\n</li>\n</ol>"),
            Node::doc(vec![Node::OrderedList {
                start: 2,
                tight: false,
                content: vec![
                    Node::list_item(vec![para("a")]),
                    Node::list_item(vec![para("b")]),
                ],
            }])
        );
    }

    #[test]
    fn test_parse_table() {
        assert_eq!(
            parse("<table><thead><tr><th>a</th></tr></thead><tbody><tr><td><em>1</em></td></tr></tbody></table>"),
            Node::doc(vec![Node::table(vec![
                Node::table_row(vec![Node::table_header(vec![Node::text("a")])]),
                Node::table_row(vec![Node::table_cell(vec![Node::marked_text(
                    "1",
                    vec![Mark::Em]
                )])]),
            ])])
        );
    }

    #[test]
    fn test_parse_void_elements_without_slash() {
        assert_eq!(
            parse(r#"<p>a<br>b<img src="x.png" alt="X"></p><hr>"#),
            Node::doc(vec![
                Node::paragraph(vec![
                    Node::text("a"),
                    Node::HardBreak,
                    Node::text("b"),
                    Node::image("x.png", Some("X"), None),
                ]),
                Node::horizontal_rule(),
            ])
        );
    }

    #[test]
    fn test_parse_wraps_loose_inline_content() {
        assert_eq!(
            parse("loose <em>text</em><p>para</p>"),
            Node::doc(vec![
                Node::paragraph(vec![
                    Node::text("loose "),
                    Node::marked_text("text", vec![Mark::Em]),
                ]),
                para("para"),
            ])
        );
    }

    #[test]
    fn test_parse_tolerates_unclosed_and_stray_tags() {
        assert_eq!(
            parse("<p>a</span><blockquote>q"),
            Node::doc(vec![para("a"), Node::blockquote(vec![para("q")])])
        );
    }

    #[test]
    fn test_parse_block_inside_paragraph_splits_it() {
        assert_eq!(
            parse(r#"<p>a<div data-mermaid-content="x"></div>b</p>"#),
            Node::doc(vec![para("a"), Node::mermaid("x"), para("b")])
        );
    }

    #[test]
    fn test_parse_diff_spans() {
        assert_eq!(
            parse(r#"<p>a <span data-diff-removed="true">b</span><span data-diff-added="true">c</span></p>"#),
            Node::doc(vec![Node::paragraph(vec![
                Node::text("a "),
                Node::marked_text("b", vec![Mark::DiffRemoved]),
                Node::marked_text("c", vec![Mark::DiffAdded]),
            ])])
        );
    }

    #[test]
    fn test_parse_named_entities_and_ignored_elements() {
        assert_eq!(
            parse("<p>a&nbsp;&amp;&nbsp;b<script>var x = 1;</script></p>"),
            Node::doc(vec![para("a\u{00a0}&\u{00a0}b")])
        );
    }

    #[test]
    fn test_parse_empty_input() {
        assert_eq!(parse(""), Node::empty_doc());
    }

    #[test]
    fn test_parse_render_rules_round_trip() {
        let doc = Node::doc(vec![
            Node::heading(2, vec![Node::text("Title")]),
            Node::paragraph(vec![
                Node::text("see "),
                Node::marked_text(
                    "docs",
                    vec![Mark::Link {
                        href: "https://example.com/?a=1&b=2".to_owned(),
                        title: Some("Docs".to_owned()),
                    }],
                ),
                Node::HardBreak,
                Node::marked_text("x", vec![Mark::Code, Mark::Strike]),
            ]),
            Node::mermaid("graph TD\n  A[\"<b>\"] --> B"),
            Node::OrderedList {
                start: 4,
                tight: true,
                content: vec![Node::list_item(vec![
                    para("item"),
                    Node::code_block(None, "x\n  y"),
                ])],
            },
            Node::blockquote(vec![para("q")]),
            Node::table(vec![Node::table_row(vec![
                Node::table_header(vec![Node::text("h")]),
                Node::table_cell(vec![Node::image("i.png", None, Some("t"))]),
            ])]),
        ]);

        assert_eq!(parse(&tippytap_model::to_html(&doc)), doc);
    }
}
