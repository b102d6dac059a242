//! Side table of diagram views for one document.
//!
//! View state is display state, not document state, so it lives here keyed
//! by the leaf's position in the tree instead of on the node.

use std::collections::BTreeMap;
use std::fmt;

use tippytap_model::Node;

use crate::renderer::{DiagramRenderer, RenderError, RenderedDiagram};
use crate::view::{DiagramView, RenderTicket};

/// Identity of a diagram leaf: its child-index path from the document root.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LeafId(Vec<usize>);

impl LeafId {
    pub fn new(path: Vec<usize>) -> Self {
        Self(path)
    }

    pub fn path(&self) -> &[usize] {
        &self.0
    }
}

impl fmt::Display for LeafId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(ToString::to_string).collect();
        write!(f, "/{}", parts.join("/"))
    }
}

/// A render started for one leaf.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PendingRender {
    pub leaf: LeafId,
    pub ticket: RenderTicket,
}

/// Diagram views of one document, all with the same editability.
#[derive(Debug, Default)]
pub struct DiagramViews {
    editable: bool,
    views: BTreeMap<LeafId, DiagramView>,
}

impl DiagramViews {
    pub fn new(editable: bool) -> Self {
        Self {
            editable,
            views: BTreeMap::new(),
        }
    }

    /// Bring the table in line with the document's diagram leaves.
    ///
    /// New leaves get a fresh view, leaves whose content changed are told
    /// so, and views of leaves that no longer exist are dropped.
    pub fn sync(&mut self, doc: &Node) {
        let mut seen = BTreeMap::new();
        doc.descendants(&mut |node, path| {
            if let Node::Mermaid { content } = node {
                seen.insert(LeafId::new(path.to_vec()), content.clone());
            }
        });

        self.views.retain(|id, _| seen.contains_key(id));
        for (id, content) in seen {
            match self.views.get_mut(&id) {
                Some(view) => view.set_content(content),
                None => {
                    self.views
                        .insert(id, DiagramView::new(content, self.editable));
                }
            }
        }
    }

    pub fn get(&self, id: &LeafId) -> Option<&DiagramView> {
        self.views.get(id)
    }

    pub fn get_mut(&mut self, id: &LeafId) -> Option<&mut DiagramView> {
        self.views.get_mut(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&LeafId, &DiagramView)> {
        self.views.iter()
    }

    pub fn len(&self) -> usize {
        self.views.len()
    }

    pub fn is_empty(&self) -> bool {
        self.views.is_empty()
    }

    /// Start renders for every view waiting for one.
    pub fn pending_renders(&mut self) -> Vec<PendingRender> {
        self.views
            .iter_mut()
            .filter_map(|(id, view)| {
                view.begin_render().map(|ticket| PendingRender {
                    leaf: id.clone(),
                    ticket,
                })
            })
            .collect()
    }

    /// Apply a render result. Returns `false` if the leaf is gone or the
    /// result is stale.
    pub fn complete(
        &mut self,
        pending: PendingRender,
        result: Result<RenderedDiagram, RenderError>,
    ) -> bool {
        match self.views.get_mut(&pending.leaf) {
            Some(view) => view.complete_render(pending.ticket, result),
            None => false,
        }
    }

    /// Render every waiting view. Returns the number of results applied.
    pub async fn render_pending<R: DiagramRenderer>(&mut self, renderer: &R) -> usize {
        let mut applied = 0;
        for pending in self.pending_renders() {
            let result = renderer.render(pending.ticket.source()).await;
            if let Err(e) = &result {
                tracing::warn!(leaf = %pending.leaf, error = %e, "Failed to render diagram");
            }
            if self.complete(pending, result) {
                applied += 1;
            }
        }
        applied
    }

    /// Save a view's edit buffer into its leaf in `doc`.
    ///
    /// Returns `true` when the document was changed.
    pub fn save_into(&mut self, id: &LeafId, doc: &mut Node) -> bool {
        let Some(content) = self.views.get_mut(id).and_then(DiagramView::save) else {
            return false;
        };
        match doc.node_at_mut(id.path()) {
            Some(Node::Mermaid { content: current }) if *current != content => {
                *current = content;
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::future::Future;

    use super::*;
    use crate::view::DiagramState;
    use pretty_assertions::assert_eq;

    /// Renders `ok:<text>` sources to `<svg>text</svg>` and fails the rest.
    struct FakeRenderer;

    impl DiagramRenderer for FakeRenderer {
        fn render(
            &self,
            source: &str,
        ) -> impl Future<Output = Result<RenderedDiagram, RenderError>> + Send {
            let result = match source.strip_prefix("ok:") {
                Some(text) => Ok(RenderedDiagram::new(format!("<svg>{text}</svg>"))),
                None => Err(RenderError::Diagram(format!("bad diagram: {source}"))),
            };
            async move { result }
        }
    }

    fn doc_with(contents: &[&str]) -> Node {
        Node::doc(contents.iter().map(|c| Node::mermaid(*c)).collect())
    }

    fn states(views: &DiagramViews) -> HashMap<String, DiagramState> {
        views
            .iter()
            .map(|(id, view)| (id.to_string(), view.state().clone()))
            .collect()
    }

    #[test]
    fn test_sync_creates_updates_and_removes_views() {
        let mut views = DiagramViews::new(true);
        views.sync(&doc_with(&["ok:a", "ok:b"]));
        assert_eq!(views.len(), 2);

        views.sync(&doc_with(&["ok:changed"]));
        assert_eq!(views.len(), 1);
        let view = views.get(&LeafId::new(vec![0])).unwrap();
        assert_eq!(view.content(), "ok:changed");
    }

    #[test]
    fn test_sync_finds_nested_leaves() {
        let doc = Node::doc(vec![Node::bullet_list(vec![Node::list_item(vec![
            Node::paragraph(vec![Node::text("item")]),
            Node::mermaid("ok:nested"),
        ])])]);
        let mut views = DiagramViews::new(false);
        views.sync(&doc);

        let id = LeafId::new(vec![0, 0, 1]);
        assert_eq!(id.to_string(), "/0/0/1");
        assert_eq!(
            views.get(&id).unwrap().state(),
            &DiagramState::ShowingSource {
                buffer: "ok:nested".to_owned()
            }
        );
    }

    #[tokio::test]
    async fn test_render_pending_isolates_failures() {
        let mut views = DiagramViews::new(true);
        views.sync(&doc_with(&["ok:a", "broken", "ok:c"]));

        assert_eq!(views.render_pending(&FakeRenderer).await, 3);

        let states = states(&views);
        assert_eq!(
            states["/0"],
            DiagramState::ShowingPreview {
                svg: "<svg>a</svg>".to_owned()
            }
        );
        assert_eq!(
            states["/1"],
            DiagramState::ShowingError {
                message: "bad diagram: broken".to_owned()
            }
        );
        assert_eq!(
            states["/2"],
            DiagramState::ShowingPreview {
                svg: "<svg>c</svg>".to_owned()
            }
        );

        assert_eq!(views.render_pending(&FakeRenderer).await, 0);
    }

    #[test]
    fn test_result_for_removed_leaf_is_dropped() {
        let mut views = DiagramViews::new(true);
        views.sync(&doc_with(&["ok:a"]));
        let pending = views.pending_renders().remove(0);

        views.sync(&Node::empty_doc());
        assert!(!views.complete(pending, Ok(RenderedDiagram::new("<svg/>"))));
    }

    #[test]
    fn test_save_into_updates_document() {
        let mut doc = doc_with(&["ok:a"]);
        let mut views = DiagramViews::new(true);
        views.sync(&doc);
        let id = LeafId::new(vec![0]);

        let view = views.get_mut(&id).unwrap();
        view.view_code();
        view.edit("ok:b");

        assert!(views.save_into(&id, &mut doc));
        assert_eq!(doc, doc_with(&["ok:b"]));

        views.sync(&doc);
        assert_eq!(views.get(&id).unwrap().state(), &DiagramState::Loading);
    }
}
