//! Markdown codec for the TippyTap document tree.
//!
//! Decoding renders Markdown (`CommonMark` plus tables and strikethrough)
//! to HTML with pulldown-cmark, then builds the tree with the schema's
//! parse rules. Encoding walks the tree and writes canonical Markdown.
//!
//! Canonical Markdown is a fixed point: decoding it and encoding the result
//! gives back the same text.
//!
//! # Example
//!
//! ```
//! use tippytap_markdown::{decode, encode};
//!
//! let doc = decode("# Title\n\nSome *emphasis*.");
//! assert_eq!(encode(&doc), "# Title\n\nSome *emphasis*.");
//! ```

mod code_block;
mod decoder;
mod encoder;
mod entities;
mod parser;

pub use code_block::{CodeBlockProcessor, ProcessResult, parse_fence_info, strip_fence_newline};
pub use decoder::MarkdownDecoder;
pub use encoder::{EncodeError, MarkdownEncoder, escape_text};
pub use parser::{DecodeError, parse_html};

use tippytap_model::Node;

/// Decode Markdown with no code block processors.
///
/// Fenced blocks, including `mermaid` ones, become code blocks. Use a
/// [`MarkdownDecoder`] with processors to decode special fences into
/// other nodes.
pub fn decode(markdown: &str) -> Node {
    MarkdownDecoder::new().decode(markdown)
}

/// Encode a document to canonical Markdown.
///
/// A tree that breaks the document invariants cannot be encoded exactly;
/// its plain text content is returned instead so no text is lost.
pub fn encode(doc: &Node) -> String {
    match MarkdownEncoder::new().encode(doc) {
        Ok(markdown) => markdown,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to encode document, falling back to plain text");
            doc.text_content()
        }
    }
}
