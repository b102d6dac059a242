//! Structured editor interface.

use tippytap_model::Node;

/// The structured editor the session drives.
///
/// Editing itself (cursor, selection, commands) belongs to the editor; the
/// session only reads and replaces the whole document.
pub trait DocumentEditor {
    fn document(&self) -> &Node;

    /// Replace the whole document.
    fn set_document(&mut self, doc: Node);

    fn is_editable(&self) -> bool;

    fn can_undo(&self) -> bool;

    fn can_redo(&self) -> bool;
}

/// In-memory editor keeping whole-document snapshots for undo.
#[derive(Debug)]
pub struct MemoryEditor {
    doc: Node,
    editable: bool,
    undo: Vec<Node>,
    redo: Vec<Node>,
}

impl Default for MemoryEditor {
    fn default() -> Self {
        Self::new(true)
    }
}

impl MemoryEditor {
    pub fn new(editable: bool) -> Self {
        Self {
            doc: Node::empty_doc(),
            editable,
            undo: Vec::new(),
            redo: Vec::new(),
        }
    }

    /// Step back to the previous document. Returns `false` if there is none.
    pub fn undo(&mut self) -> bool {
        let Some(previous) = self.undo.pop() else {
            return false;
        };
        self.redo.push(std::mem::replace(&mut self.doc, previous));
        true
    }

    /// Step forward again after an undo. Returns `false` if there is nothing
    /// to redo.
    pub fn redo(&mut self) -> bool {
        let Some(next) = self.redo.pop() else {
            return false;
        };
        self.undo.push(std::mem::replace(&mut self.doc, next));
        true
    }
}

impl DocumentEditor for MemoryEditor {
    fn document(&self) -> &Node {
        &self.doc
    }

    fn set_document(&mut self, doc: Node) {
        if doc == self.doc {
            return;
        }
        self.undo.push(std::mem::replace(&mut self.doc, doc));
        self.redo.clear();
    }

    fn is_editable(&self) -> bool {
        self.editable
    }

    fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn doc(text: &str) -> Node {
        Node::doc(vec![Node::paragraph(vec![Node::text(text)])])
    }

    #[test]
    fn test_undo_redo() {
        let mut editor = MemoryEditor::default();
        assert!(!editor.can_undo());

        editor.set_document(doc("a"));
        editor.set_document(doc("b"));
        assert!(editor.can_undo());

        assert!(editor.undo());
        assert_eq!(editor.document(), &doc("a"));
        assert!(editor.can_redo());

        assert!(editor.redo());
        assert_eq!(editor.document(), &doc("b"));
        assert!(!editor.redo());
    }

    #[test]
    fn test_new_document_clears_redo() {
        let mut editor = MemoryEditor::default();
        editor.set_document(doc("a"));
        editor.undo();

        editor.set_document(doc("c"));
        assert!(!editor.can_redo());
    }

    #[test]
    fn test_same_document_is_not_a_step() {
        let mut editor = MemoryEditor::default();
        editor.set_document(Node::empty_doc());
        assert!(!editor.can_undo());
    }
}
