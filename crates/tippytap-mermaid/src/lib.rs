//! Mermaid diagrams embedded in TippyTap documents.
//!
//! A diagram is a fenced code block with the `mermaid` language in Markdown
//! and an atomic `mermaid` leaf in the document tree, its source held in the
//! leaf's `content` attribute.
//!
//! # Architecture
//!
//! - [`MermaidProcessor`]: fence processor decoding `mermaid` fences to leaves
//! - [`DiagramView`]: per-leaf render/edit state machine with stale result
//!   detection
//! - [`DiagramViews`]: side table of views keyed by [`LeafId`]
//! - [`DiagramRenderer`]: the external renderer interface, with
//!   [`KrokiRenderer`] rendering through a Kroki server
//! - [`render_document_html`]: document HTML with diagrams rendered in place
//!
//! # Example
//!
//! ```
//! use tippytap_mermaid::{DiagramViews, decode};
//!
//! let doc = decode("```mermaid\ngraph TD; A-->B\n```");
//! let mut views = DiagramViews::new(true);
//! views.sync(&doc);
//!
//! let pending = views.pending_renders();
//! assert_eq!(pending.len(), 1);
//! assert_eq!(pending[0].ticket.source(), "graph TD; A-->B");
//! ```

mod html;
mod kroki;
mod processor;
mod renderer;
mod view;
mod views;

pub use html::{render_document_html, render_source_html};
pub use kroki::KrokiRenderer;
pub use processor::{MERMAID_LANGUAGE, MermaidProcessor, decode, decoder};
pub use renderer::{DiagramRenderer, RenderError, RenderedDiagram};
pub use view::{DiagramState, DiagramView, RenderTicket};
pub use views::{DiagramViews, LeafId, PendingRender};
