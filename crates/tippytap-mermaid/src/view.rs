//! Display state of a single diagram leaf.
//!
//! A view is either waiting for a render (`Loading`), showing the rendered
//! diagram or the renderer's error, or showing the diagram source. Read-only
//! views (the diff view) always show the source. Editable views render the
//! current content and let the user edit the source, then save or cancel.
//!
//! Renders are tracked with [`RenderTicket`]s that capture the content they
//! were started for. A result for content that has since changed is
//! discarded, so an older render finishing late never overwrites the state
//! of a newer one.

use crate::renderer::{RenderError, RenderedDiagram};

/// What a diagram leaf currently shows.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DiagramState {
    Loading,
    ShowingPreview { svg: String },
    ShowingError { message: String },
    ShowingSource { buffer: String },
}

/// A started render, tied to the content it renders.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderTicket {
    content: String,
}

impl RenderTicket {
    /// Diagram source to pass to the renderer.
    pub fn source(&self) -> &str {
        &self.content
    }
}

/// Last render result for the current content.
#[derive(Clone, Debug)]
enum Rendered {
    Svg(String),
    Error(String),
}

/// Render and edit state of one diagram leaf.
#[derive(Clone, Debug)]
pub struct DiagramView {
    content: String,
    editable: bool,
    state: DiagramState,
    rendered: Option<Rendered>,
}

impl DiagramView {
    /// Create the view for a leaf.
    ///
    /// Read-only views start on the source. Editable views start loading,
    /// except for empty content, which has nothing to render.
    pub fn new(content: impl Into<String>, editable: bool) -> Self {
        let content = content.into();
        let mut view = Self {
            state: DiagramState::Loading,
            content,
            editable,
            rendered: None,
        };
        view.state = view.initial_state();
        view
    }

    fn initial_state(&self) -> DiagramState {
        if !self.editable || self.content.is_empty() {
            self.source_state()
        } else {
            DiagramState::Loading
        }
    }

    fn source_state(&self) -> DiagramState {
        DiagramState::ShowingSource {
            buffer: self.content.clone(),
        }
    }

    /// The state shown when leaving the source: the cached render result for
    /// the current content, or `Loading` if there is none yet.
    fn settled_state(&self) -> DiagramState {
        match &self.rendered {
            Some(Rendered::Svg(svg)) => DiagramState::ShowingPreview { svg: svg.clone() },
            Some(Rendered::Error(message)) => DiagramState::ShowingError {
                message: message.clone(),
            },
            None if self.content.is_empty() => self.source_state(),
            None => DiagramState::Loading,
        }
    }

    pub fn state(&self) -> &DiagramState {
        &self.state
    }

    /// The committed diagram source.
    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn is_editable(&self) -> bool {
        self.editable
    }

    /// Start a render of the current content, if the view is waiting for one.
    pub fn begin_render(&mut self) -> Option<RenderTicket> {
        if self.state != DiagramState::Loading {
            return None;
        }
        Some(RenderTicket {
            content: self.content.clone(),
        })
    }

    /// Apply a render result.
    ///
    /// Returns `false` when the result is stale: the ticket's content is no
    /// longer the current content. A result that arrives while the source is
    /// shown is cached for when the user leaves the source.
    pub fn complete_render(
        &mut self,
        ticket: RenderTicket,
        result: Result<RenderedDiagram, RenderError>,
    ) -> bool {
        if ticket.content != self.content {
            tracing::debug!("Discarding stale diagram render");
            return false;
        }

        self.rendered = Some(match result {
            Ok(diagram) => Rendered::Svg(diagram.svg),
            Err(e) => {
                tracing::debug!(error = %e, "Diagram render failed");
                Rendered::Error(e.to_string())
            }
        });
        if !matches!(self.state, DiagramState::ShowingSource { .. }) {
            self.state = self.settled_state();
        }
        true
    }

    /// Show the source ("view code"). Read-only views already do.
    pub fn view_code(&mut self) {
        if self.editable && !matches!(self.state, DiagramState::ShowingSource { .. }) {
            self.state = self.source_state();
        }
    }

    /// Switch between the diagram and its source.
    ///
    /// Leaving the source this way drops unsaved edits. Read-only views stay
    /// on the source.
    pub fn toggle(&mut self) {
        if matches!(self.state, DiagramState::ShowingSource { .. }) {
            self.cancel();
        } else {
            self.view_code();
        }
    }

    /// Replace the edit buffer. Ignored unless an editable view shows the
    /// source.
    pub fn edit(&mut self, text: impl Into<String>) {
        if !self.editable {
            return;
        }
        if let DiagramState::ShowingSource { buffer } = &mut self.state {
            *buffer = text.into();
        }
    }

    /// Commit the edit buffer as the new content and render it.
    ///
    /// Returns the new content so the caller can write it into the leaf, or
    /// `None` if there was nothing to save.
    pub fn save(&mut self) -> Option<String> {
        if !self.editable {
            return None;
        }
        let DiagramState::ShowingSource { buffer } = &mut self.state else {
            return None;
        };

        let buffer = std::mem::take(buffer);
        if buffer != self.content {
            self.content = buffer;
            self.rendered = None;
        }
        self.state = if self.content.is_empty() {
            self.source_state()
        } else {
            DiagramState::Loading
        };
        Some(self.content.clone())
    }

    /// Discard the edit buffer and return to the diagram.
    pub fn cancel(&mut self) {
        if self.editable && matches!(self.state, DiagramState::ShowingSource { .. }) {
            self.state = self.settled_state();
        }
    }

    /// The leaf's content changed outside this view.
    ///
    /// Cached results are dropped and the view renders again; read-only views
    /// show the new source.
    pub fn set_content(&mut self, content: impl Into<String>) {
        let content = content.into();
        if content == self.content {
            return;
        }
        self.content = content;
        self.rendered = None;
        self.state = self.initial_state();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn ok(svg: &str) -> Result<RenderedDiagram, RenderError> {
        Ok(RenderedDiagram::new(svg))
    }

    fn source(buffer: &str) -> DiagramState {
        DiagramState::ShowingSource {
            buffer: buffer.to_owned(),
        }
    }

    fn preview(svg: &str) -> DiagramState {
        DiagramState::ShowingPreview {
            svg: svg.to_owned(),
        }
    }

    fn rendered_view(content: &str, svg: &str) -> DiagramView {
        let mut view = DiagramView::new(content, true);
        let ticket = view.begin_render().unwrap();
        assert!(view.complete_render(ticket, ok(svg)));
        view
    }

    #[test]
    fn test_initial_state() {
        assert_eq!(DiagramView::new("A-->B", true).state(), &DiagramState::Loading);
        assert_eq!(DiagramView::new("A-->B", false).state(), &source("A-->B"));
        assert_eq!(DiagramView::new("", true).state(), &source(""));
    }

    #[test]
    fn test_render_success_and_failure() {
        let view = rendered_view("A-->B", "<svg/>");
        assert_eq!(view.state(), &preview("<svg/>"));

        let mut view = DiagramView::new("bogus", true);
        let ticket = view.begin_render().unwrap();
        view.complete_render(ticket, Err(RenderError::Diagram("Parse error".to_owned())));
        assert_eq!(
            view.state(),
            &DiagramState::ShowingError {
                message: "Parse error".to_owned()
            }
        );

        view.view_code();
        assert_eq!(view.state(), &source("bogus"));
    }

    #[test]
    fn test_begin_render_only_while_loading() {
        let mut view = rendered_view("A", "<svg/>");
        assert_eq!(view.begin_render(), None);

        let mut read_only = DiagramView::new("A", false);
        assert_eq!(read_only.begin_render(), None);
    }

    #[test]
    fn test_stale_render_is_discarded() {
        let mut view = DiagramView::new("X", true);
        let first = view.begin_render().unwrap();

        view.set_content("Y");
        let second = view.begin_render().unwrap();
        assert_eq!(second.source(), "Y");

        assert!(view.complete_render(second, ok("<svg>Y</svg>")));
        assert!(!view.complete_render(first, ok("<svg>X</svg>")));
        assert_eq!(view.state(), &preview("<svg>Y</svg>"));
    }

    #[test]
    fn test_stale_failure_does_not_replace_preview() {
        let mut view = DiagramView::new("X", true);
        let first = view.begin_render().unwrap();
        view.set_content("Y");
        let second = view.begin_render().unwrap();

        view.complete_render(second, ok("<svg>Y</svg>"));
        view.complete_render(first, Err(RenderError::Diagram("late".to_owned())));
        assert_eq!(view.state(), &preview("<svg>Y</svg>"));
    }

    #[test]
    fn test_toggle_between_preview_and_source() {
        let mut view = rendered_view("A", "<svg/>");

        view.toggle();
        assert_eq!(view.state(), &source("A"));

        view.edit("A-->B");
        view.toggle();
        assert_eq!(view.state(), &preview("<svg/>"));
        assert_eq!(view.content(), "A");
    }

    #[test]
    fn test_read_only_view_stays_on_source() {
        let mut view = DiagramView::new("A", false);
        view.toggle();
        view.view_code();
        view.edit("changed");
        assert_eq!(view.save(), None);
        assert_eq!(view.state(), &source("A"));

        view.set_content("B");
        assert_eq!(view.state(), &source("B"));
    }

    #[test]
    fn test_save_commits_buffer_and_renders() {
        let mut view = rendered_view("A", "<svg/>");
        view.view_code();
        view.edit("A-->B");

        assert_eq!(view.save(), Some("A-->B".to_owned()));
        assert_eq!(view.content(), "A-->B");
        assert_eq!(view.state(), &DiagramState::Loading);
        assert_eq!(view.begin_render().unwrap().source(), "A-->B");
    }

    #[test]
    fn test_save_unchanged_buffer_renders_again() {
        let mut view = rendered_view("A", "<svg/>");
        view.view_code();
        assert_eq!(view.save(), Some("A".to_owned()));
        assert_eq!(view.state(), &DiagramState::Loading);
    }

    #[test]
    fn test_save_outside_source_does_nothing() {
        let mut view = rendered_view("A", "<svg/>");
        assert_eq!(view.save(), None);
        assert_eq!(view.state(), &preview("<svg/>"));
    }

    #[test]
    fn test_cancel_without_result_returns_to_loading() {
        let mut view = DiagramView::new("A", true);
        view.view_code();
        view.edit("B");
        view.cancel();

        assert_eq!(view.state(), &DiagramState::Loading);
        assert_eq!(view.content(), "A");
    }

    #[test]
    fn test_result_while_showing_source_is_cached() {
        let mut view = DiagramView::new("A", true);
        let ticket = view.begin_render().unwrap();
        view.view_code();

        assert!(view.complete_render(ticket, ok("<svg/>")));
        assert_eq!(view.state(), &source("A"));

        view.cancel();
        assert_eq!(view.state(), &preview("<svg/>"));
    }

    #[test]
    fn test_outside_change_reenters_loading() {
        let mut view = rendered_view("A", "<svg/>");
        view.view_code();
        view.edit("unsaved");

        view.set_content("B");
        assert_eq!(view.state(), &DiagramState::Loading);

        view.set_content("");
        assert_eq!(view.state(), &source(""));
    }

    #[test]
    fn test_same_content_is_not_a_change() {
        let mut view = rendered_view("A", "<svg/>");
        view.set_content("A");
        assert_eq!(view.state(), &preview("<svg/>"));
    }
}
