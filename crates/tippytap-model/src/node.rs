//! Document tree nodes.

use crate::mark::Mark;

/// Kind of a document node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NodeType {
    Doc,
    Paragraph,
    Heading,
    Blockquote,
    CodeBlock,
    Mermaid,
    HorizontalRule,
    HardBreak,
    OrderedList,
    BulletList,
    ListItem,
    Table,
    TableRow,
    TableCell,
    TableHeader,
    Text,
    Image,
}

impl NodeType {
    /// Name of the node type in the document model.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Doc => "doc",
            Self::Paragraph => "paragraph",
            Self::Heading => "heading",
            Self::Blockquote => "blockquote",
            Self::CodeBlock => "codeBlock",
            Self::Mermaid => "mermaid",
            Self::HorizontalRule => "horizontalRule",
            Self::HardBreak => "hardBreak",
            Self::OrderedList => "orderedList",
            Self::BulletList => "bulletList",
            Self::ListItem => "listItem",
            Self::Table => "table",
            Self::TableRow => "tableRow",
            Self::TableCell => "tableCell",
            Self::TableHeader => "tableHeader",
            Self::Text => "text",
            Self::Image => "image",
        }
    }

    /// Parse a node type name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "doc" => Self::Doc,
            "paragraph" => Self::Paragraph,
            "heading" => Self::Heading,
            "blockquote" => Self::Blockquote,
            "codeBlock" => Self::CodeBlock,
            "mermaid" => Self::Mermaid,
            "horizontalRule" => Self::HorizontalRule,
            "hardBreak" => Self::HardBreak,
            "orderedList" => Self::OrderedList,
            "bulletList" => Self::BulletList,
            "listItem" => Self::ListItem,
            "table" => Self::Table,
            "tableRow" => Self::TableRow,
            "tableCell" => Self::TableCell,
            "tableHeader" => Self::TableHeader,
            "text" => Self::Text,
            "image" => Self::Image,
            _ => return None,
        })
    }

    /// Leaf nodes whose payload lives entirely in attributes.
    #[must_use]
    pub fn is_atom(self) -> bool {
        matches!(
            self,
            Self::Mermaid | Self::HorizontalRule | Self::HardBreak | Self::Image
        )
    }

    /// Inline node kinds (allowed inside textblocks).
    #[must_use]
    pub fn is_inline(self) -> bool {
        matches!(self, Self::Text | Self::HardBreak | Self::Image)
    }

    /// Blocks whose children are inline content.
    #[must_use]
    pub fn is_textblock(self) -> bool {
        matches!(
            self,
            Self::Paragraph | Self::Heading | Self::TableCell | Self::TableHeader
        )
    }

    /// Nodes whose children are arbitrary blocks.
    #[must_use]
    pub fn is_block_container(self) -> bool {
        matches!(self, Self::Doc | Self::Blockquote | Self::ListItem)
    }
}

/// A node of the document tree.
///
/// Container variants hold their children in `content`; atoms carry their
/// payload as attributes and have no children.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "type", rename_all = "camelCase"))]
pub enum Node {
    Doc {
        content: Vec<Node>,
    },
    Paragraph {
        content: Vec<Node>,
    },
    Heading {
        level: u8,
        content: Vec<Node>,
    },
    Blockquote {
        content: Vec<Node>,
    },
    CodeBlock {
        language: Option<String>,
        text: String,
    },
    /// Mermaid diagram leaf. The diagram source lives in `content`.
    Mermaid {
        content: String,
    },
    HorizontalRule {
        /// Rule written by the encoder. Decoding always yields `---`, so other
        /// markup only lasts until the first round trip.
        markup: String,
    },
    HardBreak,
    OrderedList {
        start: u32,
        tight: bool,
        content: Vec<Node>,
    },
    BulletList {
        tight: bool,
        content: Vec<Node>,
    },
    ListItem {
        content: Vec<Node>,
    },
    Table {
        content: Vec<Node>,
    },
    TableRow {
        content: Vec<Node>,
    },
    TableCell {
        content: Vec<Node>,
    },
    TableHeader {
        content: Vec<Node>,
    },
    Text {
        text: String,
        marks: Vec<Mark>,
    },
    Image {
        src: String,
        alt: Option<String>,
        title: Option<String>,
    },
}

impl Node {
    #[must_use]
    pub fn doc(content: Vec<Node>) -> Self {
        Self::Doc { content }
    }

    /// The canonical empty document: a single empty paragraph.
    #[must_use]
    pub fn empty_doc() -> Self {
        Self::doc(vec![Self::paragraph(Vec::new())])
    }

    #[must_use]
    pub fn paragraph(content: Vec<Node>) -> Self {
        Self::Paragraph { content }
    }

    /// Heading with the level clamped to `1..=6`.
    #[must_use]
    pub fn heading(level: u8, content: Vec<Node>) -> Self {
        Self::Heading {
            level: level.clamp(1, 6),
            content,
        }
    }

    #[must_use]
    pub fn blockquote(content: Vec<Node>) -> Self {
        Self::Blockquote { content }
    }

    #[must_use]
    pub fn code_block(language: Option<&str>, text: impl Into<String>) -> Self {
        Self::CodeBlock {
            language: language.map(str::to_owned),
            text: text.into(),
        }
    }

    #[must_use]
    pub fn mermaid(content: impl Into<String>) -> Self {
        Self::Mermaid {
            content: content.into(),
        }
    }

    #[must_use]
    pub fn horizontal_rule() -> Self {
        Self::HorizontalRule {
            markup: "---".to_owned(),
        }
    }

    #[must_use]
    pub fn ordered_list(start: u32, content: Vec<Node>) -> Self {
        Self::OrderedList {
            start,
            tight: true,
            content,
        }
    }

    #[must_use]
    pub fn bullet_list(content: Vec<Node>) -> Self {
        Self::BulletList {
            tight: true,
            content,
        }
    }

    #[must_use]
    pub fn list_item(content: Vec<Node>) -> Self {
        Self::ListItem { content }
    }

    #[must_use]
    pub fn table(content: Vec<Node>) -> Self {
        Self::Table { content }
    }

    #[must_use]
    pub fn table_row(content: Vec<Node>) -> Self {
        Self::TableRow { content }
    }

    #[must_use]
    pub fn table_cell(content: Vec<Node>) -> Self {
        Self::TableCell { content }
    }

    #[must_use]
    pub fn table_header(content: Vec<Node>) -> Self {
        Self::TableHeader { content }
    }

    /// Plain text node.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text {
            text: text.into(),
            marks: Vec::new(),
        }
    }

    /// Text node with marks; the marks are normalized into a set.
    #[must_use]
    pub fn marked_text(text: impl Into<String>, marks: Vec<Mark>) -> Self {
        Self::Text {
            text: text.into(),
            marks: Mark::normalize_set(marks),
        }
    }

    #[must_use]
    pub fn image(src: impl Into<String>, alt: Option<&str>, title: Option<&str>) -> Self {
        Self::Image {
            src: src.into(),
            alt: alt.map(str::to_owned),
            title: title.map(str::to_owned),
        }
    }

    #[must_use]
    pub fn node_type(&self) -> NodeType {
        match self {
            Self::Doc { .. } => NodeType::Doc,
            Self::Paragraph { .. } => NodeType::Paragraph,
            Self::Heading { .. } => NodeType::Heading,
            Self::Blockquote { .. } => NodeType::Blockquote,
            Self::CodeBlock { .. } => NodeType::CodeBlock,
            Self::Mermaid { .. } => NodeType::Mermaid,
            Self::HorizontalRule { .. } => NodeType::HorizontalRule,
            Self::HardBreak => NodeType::HardBreak,
            Self::OrderedList { .. } => NodeType::OrderedList,
            Self::BulletList { .. } => NodeType::BulletList,
            Self::ListItem { .. } => NodeType::ListItem,
            Self::Table { .. } => NodeType::Table,
            Self::TableRow { .. } => NodeType::TableRow,
            Self::TableCell { .. } => NodeType::TableCell,
            Self::TableHeader { .. } => NodeType::TableHeader,
            Self::Text { .. } => NodeType::Text,
            Self::Image { .. } => NodeType::Image,
        }
    }

    /// Child nodes (empty for leaves and code blocks).
    #[must_use]
    pub fn children(&self) -> &[Node] {
        match self {
            Self::Doc { content }
            | Self::Paragraph { content }
            | Self::Heading { content, .. }
            | Self::Blockquote { content }
            | Self::OrderedList { content, .. }
            | Self::BulletList { content, .. }
            | Self::ListItem { content }
            | Self::Table { content }
            | Self::TableRow { content }
            | Self::TableCell { content }
            | Self::TableHeader { content } => content,
            Self::CodeBlock { .. }
            | Self::Mermaid { .. }
            | Self::HorizontalRule { .. }
            | Self::HardBreak
            | Self::Text { .. }
            | Self::Image { .. } => &[],
        }
    }

    /// Mutable child list, or `None` for nodes that cannot have children.
    pub fn children_mut(&mut self) -> Option<&mut Vec<Node>> {
        match self {
            Self::Doc { content }
            | Self::Paragraph { content }
            | Self::Heading { content, .. }
            | Self::Blockquote { content }
            | Self::OrderedList { content, .. }
            | Self::BulletList { content, .. }
            | Self::ListItem { content }
            | Self::Table { content }
            | Self::TableRow { content }
            | Self::TableCell { content }
            | Self::TableHeader { content } => Some(content),
            Self::CodeBlock { .. }
            | Self::Mermaid { .. }
            | Self::HorizontalRule { .. }
            | Self::HardBreak
            | Self::Text { .. }
            | Self::Image { .. } => None,
        }
    }

    /// Marks of a text node (empty for everything else).
    #[must_use]
    pub fn marks(&self) -> &[Mark] {
        match self {
            Self::Text { marks, .. } => marks,
            _ => &[],
        }
    }

    /// Number of direct children.
    #[must_use]
    pub fn child_count(&self) -> usize {
        self.children().len()
    }

    /// Node reached by following child indices from this node.
    #[must_use]
    pub fn node_at(&self, path: &[usize]) -> Option<&Node> {
        path.iter()
            .try_fold(self, |node, &index| node.children().get(index))
    }

    pub fn node_at_mut(&mut self, path: &[usize]) -> Option<&mut Node> {
        let mut node = self;
        for &index in path {
            node = node.children_mut()?.get_mut(index)?;
        }
        Some(node)
    }

    /// Concatenated text of all text nodes and code blocks below this node.
    #[must_use]
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        match self {
            Self::Text { text, .. } | Self::CodeBlock { text, .. } => out.push_str(text),
            _ => {
                for child in self.children() {
                    child.collect_text(out);
                }
            }
        }
    }

    /// Visit every node in document order together with its path.
    pub fn descendants(&self, f: &mut impl FnMut(&Node, &[usize])) {
        let mut path = Vec::new();
        self.walk(&mut path, f);
    }

    fn walk(&self, path: &mut Vec<usize>, f: &mut impl FnMut(&Node, &[usize])) {
        for (index, child) in self.children().iter().enumerate() {
            path.push(index);
            f(child, path);
            child.walk(path, f);
            path.pop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample() -> Node {
        Node::doc(vec![
            Node::heading(1, vec![Node::text("Title")]),
            Node::paragraph(vec![
                Node::text("plain "),
                Node::marked_text("bold", vec![Mark::Strong]),
            ]),
            Node::code_block(Some("rust"), "fn main() {}"),
            Node::mermaid("A-->B"),
        ])
    }

    #[test]
    fn test_node_type_names_round_trip() {
        let doc = sample();
        let mut seen = Vec::new();
        doc.descendants(&mut |node, _| seen.push(node.node_type()));
        for kind in seen {
            assert_eq!(NodeType::from_name(kind.name()), Some(kind));
        }
        assert_eq!(NodeType::from_name("codeBlock"), Some(NodeType::CodeBlock));
        assert_eq!(NodeType::from_name("video"), None);
    }

    #[test]
    fn test_heading_level_is_clamped() {
        assert!(matches!(Node::heading(9, vec![]), Node::Heading { level: 6, .. }));
        assert!(matches!(Node::heading(0, vec![]), Node::Heading { level: 1, .. }));
    }

    #[test]
    fn test_atoms_have_no_children() {
        let mut leaf = Node::mermaid("A-->B");
        assert!(leaf.node_type().is_atom());
        assert!(leaf.children().is_empty());
        assert!(leaf.children_mut().is_none());
    }

    #[test]
    fn test_text_content_skips_diagram_source() {
        assert_eq!(sample().text_content(), "Titleplain boldfn main() {}");
    }

    #[test]
    fn test_node_at_follows_path() {
        let doc = sample();
        assert_eq!(doc.node_at(&[1, 1]).map(Node::text_content), Some("bold".to_owned()));
        assert!(doc.node_at(&[3, 0]).is_none());
        assert!(doc.node_at(&[7]).is_none());
    }

    #[test]
    fn test_descendants_reports_paths() {
        let mut paths = Vec::new();
        sample().descendants(&mut |node, path| {
            if node.node_type() == NodeType::Mermaid {
                paths.push(path.to_vec());
            }
        });
        assert_eq!(paths, vec![vec![3]]);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_serde_uses_type_tags() {
        let json = serde_json::to_value(Node::mermaid("A-->B")).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"type": "mermaid", "content": "A-->B"})
        );
    }

    #[test]
    fn test_empty_doc_is_single_empty_paragraph() {
        assert_eq!(Node::empty_doc(), Node::doc(vec![Node::paragraph(vec![])]));
    }
}
