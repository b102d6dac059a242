//! Fence processor turning `mermaid` code blocks into diagram leaves.

use std::collections::HashMap;

use tippytap_markdown::{CodeBlockProcessor, MarkdownDecoder, ProcessResult, strip_fence_newline};
use tippytap_model::{Node, mermaid_container};

/// Fence language that marks a diagram.
pub const MERMAID_LANGUAGE: &str = "mermaid";

/// Code block processor for Mermaid fences.
///
/// A fence whose first info token is exactly `mermaid` becomes the diagram
/// container element, carrying the fence content (final newline removed)
/// as an escaped attribute. Other fences pass through.
#[derive(Debug, Default, Clone, Copy)]
pub struct MermaidProcessor;

impl CodeBlockProcessor for MermaidProcessor {
    fn process(
        &mut self,
        language: &str,
        _attrs: &HashMap<String, String>,
        source: &str,
        index: usize,
    ) -> ProcessResult {
        if language != MERMAID_LANGUAGE {
            return ProcessResult::PassThrough;
        }

        tracing::debug!(index, "Decoding mermaid fence");
        ProcessResult::Inline(mermaid_container(strip_fence_newline(source)))
    }
}

/// Markdown decoder with the Mermaid processor registered.
#[must_use]
pub fn decoder() -> MarkdownDecoder {
    MarkdownDecoder::new().with_processor(MermaidProcessor)
}

/// Decode Markdown, turning `mermaid` fences into diagram leaves.
pub fn decode(markdown: &str) -> Node {
    decoder().decode(markdown)
}
