//! Structural edits on the document tree.

use thiserror::Error;

use crate::node::{Node, NodeType};

/// Where to insert a block.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Position {
    /// Between the children of a block container (`doc`, `blockquote`,
    /// `listItem`) at `path`, before the child at `index`.
    Block { path: Vec<usize>, index: usize },
    /// Inside the paragraph or heading at `path`, after `offset` characters
    /// of its inline content. Inline atoms count as one character.
    Text { path: Vec<usize>, offset: usize },
}

impl Position {
    #[must_use]
    pub fn block(path: Vec<usize>, index: usize) -> Self {
        Self::Block { path, index }
    }

    #[must_use]
    pub fn text(path: Vec<usize>, offset: usize) -> Self {
        Self::Text { path, offset }
    }
}

/// Error from a structural edit. The tree is left unchanged.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EditError {
    #[error("No node at path {0:?}")]
    InvalidPath(Vec<usize>),

    #[error("{0} cannot hold block content")]
    NotContainer(&'static str),

    #[error("{0} is not a paragraph or heading")]
    NotTextblock(&'static str),

    #[error("{0} is not a block node")]
    NotBlock(&'static str),

    #[error("Index {index} out of range for {len} children")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Offset {offset} out of range for {len} characters")]
    OffsetOutOfRange { offset: usize, len: usize },

    #[error("A list item must start with a paragraph")]
    ListItemStart,
}

impl Node {
    /// Insert a Mermaid diagram leaf at `position`.
    ///
    /// Returns the path of the new leaf. Editability of the hosting view is
    /// not consulted, so the editor keeps its focus and selection state.
    pub fn insert_mermaid(
        &mut self,
        position: &Position,
        content: &str,
    ) -> Result<Vec<usize>, EditError> {
        self.insert_block(position, Node::mermaid(content))
    }

    /// Insert a block node at `position`.
    ///
    /// A text position splits the textblock and places the block between
    /// the two halves. Empty halves are dropped, except the leading
    /// paragraph of a list item.
    pub fn insert_block(&mut self, position: &Position, block: Node) -> Result<Vec<usize>, EditError> {
        let kind = block.node_type();
        if kind.is_inline() || kind == NodeType::Doc {
            return Err(EditError::NotBlock(kind.name()));
        }

        match position {
            Position::Block { path, index } => {
                let container = self
                    .node_at_mut(path)
                    .ok_or_else(|| EditError::InvalidPath(path.clone()))?;
                let container_kind = container.node_type();
                if !container_kind.is_block_container() {
                    return Err(EditError::NotContainer(container_kind.name()));
                }
                if container_kind == NodeType::ListItem && *index == 0 {
                    return Err(EditError::ListItemStart);
                }
                let children = container
                    .children_mut()
                    .ok_or(EditError::NotContainer(container_kind.name()))?;
                if *index > children.len() {
                    return Err(EditError::IndexOutOfRange {
                        index: *index,
                        len: children.len(),
                    });
                }
                children.insert(*index, block);

                let mut inserted = path.clone();
                inserted.push(*index);
                Ok(inserted)
            }
            Position::Text { path, offset } => {
                let (&child_index, parent_path) = path
                    .split_last()
                    .ok_or_else(|| EditError::InvalidPath(path.clone()))?;
                let parent = self
                    .node_at_mut(parent_path)
                    .ok_or_else(|| EditError::InvalidPath(path.clone()))?;
                let parent_kind = parent.node_type();
                let siblings = parent
                    .children_mut()
                    .ok_or_else(|| EditError::InvalidPath(path.clone()))?;
                let textblock = siblings
                    .get(child_index)
                    .ok_or_else(|| EditError::InvalidPath(path.clone()))?;
                let textblock_kind = textblock.node_type();
                if !matches!(textblock_kind, NodeType::Paragraph | NodeType::Heading) {
                    return Err(EditError::NotTextblock(textblock_kind.name()));
                }
                if !parent_kind.is_block_container() {
                    return Err(EditError::NotContainer(parent_kind.name()));
                }

                let len = inline_len(textblock.children());
                if *offset > len {
                    return Err(EditError::OffsetOutOfRange {
                        offset: *offset,
                        len,
                    });
                }

                let (before, after) = split_inline(textblock.children(), *offset);
                let keep_before =
                    !before.is_empty() || (parent_kind == NodeType::ListItem && child_index == 0);
                let mut replacement = Vec::with_capacity(3);
                if keep_before {
                    replacement.push(with_content(textblock, before));
                }
                let inserted_at = child_index + replacement.len();
                replacement.push(block);
                if !after.is_empty() {
                    replacement.push(with_content(textblock, after));
                }
                siblings.splice(child_index..=child_index, replacement);

                let mut inserted = parent_path.to_vec();
                inserted.push(inserted_at);
                Ok(inserted)
            }
        }
    }
}

fn inline_len(content: &[Node]) -> usize {
    content
        .iter()
        .map(|node| match node {
            Node::Text { text, .. } => text.chars().count(),
            _ => 1,
        })
        .sum()
}

fn split_inline(content: &[Node], offset: usize) -> (Vec<Node>, Vec<Node>) {
    let mut before = Vec::new();
    let mut after = Vec::new();
    let mut pos = 0;

    for node in content {
        match node {
            Node::Text { text, marks } => {
                let len = text.chars().count();
                if pos + len <= offset {
                    before.push(node.clone());
                } else if pos >= offset {
                    after.push(node.clone());
                } else {
                    let split = text
                        .char_indices()
                        .nth(offset - pos)
                        .map_or(text.len(), |(i, _)| i);
                    before.push(Node::Text {
                        text: text[..split].to_owned(),
                        marks: marks.clone(),
                    });
                    after.push(Node::Text {
                        text: text[split..].to_owned(),
                        marks: marks.clone(),
                    });
                }
                pos += len;
            }
            _ => {
                if pos < offset {
                    before.push(node.clone());
                } else {
                    after.push(node.clone());
                }
                pos += 1;
            }
        }
    }

    (before, after)
}

fn with_content(textblock: &Node, content: Vec<Node>) -> Node {
    match textblock {
        Node::Heading { level, .. } => Node::heading(*level, content),
        _ => Node::paragraph(content),
    }
}
