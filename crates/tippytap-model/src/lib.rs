//! Structured document model for TippyTap.
//!
//! The document is a tree of typed [`Node`]s. Each variant carries its own
//! attributes, so serializers and parsers are exhaustive matches over the
//! node kind rather than lookups in a type registry.
//!
//! # Architecture
//!
//! - [`Node`] / [`Mark`]: the tree and inline formatting annotations
//! - [`schema`]: parse rules mapping HTML elements onto node and mark kinds,
//!   including the Mermaid diagram leaf
//! - [`to_html`]: render rules producing HTML the parse rules accept
//! - [`Position`]: structural edits such as [`Node::insert_mermaid`]
//! - [`outline`]: table of contents built from headings
//!
//! # Example
//!
//! ```
//! use tippytap_model::{Node, Position, to_html};
//!
//! let mut doc = Node::doc(vec![Node::paragraph(vec![Node::text("Hello")])]);
//! doc.insert_mermaid(&Position::block(vec![], 1), "graph TD; A-->B").unwrap();
//!
//! assert!(to_html(&doc).contains("data-mermaid-content"));
//! ```

mod html;
mod mark;
mod node;
mod outline;
pub mod schema;
mod transform;

pub use html::{escape_attr, escape_html, mermaid_container, to_html};
pub use mark::{Mark, MarkType};
pub use node::{Node, NodeType};
pub use outline::{TocEntry, outline, slugify};
pub use transform::{EditError, Position};
