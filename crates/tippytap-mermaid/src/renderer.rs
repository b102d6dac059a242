//! Diagram renderer interface.

use std::future::Future;

/// Successfully rendered diagram.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderedDiagram {
    pub svg: String,
}

impl RenderedDiagram {
    pub fn new(svg: impl Into<String>) -> Self {
        Self { svg: svg.into() }
    }
}

/// Diagram rendering error.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum RenderError {
    /// The renderer rejected the diagram source.
    #[error("{0}")]
    Diagram(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("I/O error: {0}")]
    Io(String),

    /// The background render task did not complete.
    #[error("Render task failed: {0}")]
    Task(String),
}

/// External diagram renderer: diagram source in, SVG or failure out.
///
/// Calls are single-shot. Several calls may be in flight at once and may
/// complete in any order; callers discard stale results themselves.
pub trait DiagramRenderer {
    fn render(
        &self,
        source: &str,
    ) -> impl Future<Output = Result<RenderedDiagram, RenderError>> + Send;
}
