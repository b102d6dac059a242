//! Code block processor trait for fenced blocks that decode to something
//! other than a plain code block.
//!
//! Processors are registered with the [`MarkdownDecoder`](crate::MarkdownDecoder)
//! and checked in order when a fenced block is encountered. The first
//! processor returning a non-`PassThrough` result wins.
//!
//! # Example
//!
//! ```
//! use std::collections::HashMap;
//! use tippytap_markdown::{CodeBlockProcessor, ProcessResult};
//!
//! struct MathProcessor;
//!
//! impl CodeBlockProcessor for MathProcessor {
//!     fn process(
//!         &mut self,
//!         language: &str,
//!         _attrs: &HashMap<String, String>,
//!         source: &str,
//!         _index: usize,
//!     ) -> ProcessResult {
//!         if language == "math" {
//!             ProcessResult::Inline(format!("<p>{}</p>", source.trim()))
//!         } else {
//!             ProcessResult::PassThrough
//!         }
//!     }
//! }
//! ```

use std::collections::HashMap;

/// Result of processing a code block.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProcessResult {
    /// Replace the code block with HTML that the tree parser understands.
    Inline(String),

    /// Decode as a regular code block.
    PassThrough,
}

/// Trait for processing special fenced code blocks.
pub trait CodeBlockProcessor {
    /// Process a code block and return the result.
    ///
    /// # Arguments
    ///
    /// * `language` - First whitespace-delimited token of the fence info string
    /// * `attrs` - Attributes parsed from the rest of the info string (key=value pairs)
    /// * `source` - Raw content of the code block, including its final newline
    /// * `index` - Zero-based index of the code block in the document
    fn process(
        &mut self,
        language: &str,
        attrs: &HashMap<String, String>,
        source: &str,
        index: usize,
    ) -> ProcessResult;
}

/// Parse fence info string into language and attributes.
///
/// Format: `language [key=value ...]`
#[must_use]
pub fn parse_fence_info(info: &str) -> (String, HashMap<String, String>) {
    let mut parts = info.split_whitespace();
    let language = parts.next().unwrap_or("").to_owned();

    let mut attrs = HashMap::new();
    for part in parts {
        if let Some((key, value)) = part.split_once('=') {
            let value = value.trim_matches('"').trim_matches('\'');
            attrs.insert(key.to_owned(), value.to_owned());
        }
    }

    (language, attrs)
}

/// Drop the single line terminator a fenced block's content ends with.
#[must_use]
pub fn strip_fence_newline(source: &str) -> &str {
    source.strip_suffix('\n').unwrap_or(source)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_fence_info_language_only() {
        let (lang, attrs) = parse_fence_info("rust");
        assert_eq!(lang, "rust");
        assert!(attrs.is_empty());
    }

    #[test]
    fn test_parse_fence_info_with_attrs() {
        let (lang, attrs) = parse_fence_info("mermaid theme=dark");
        assert_eq!(lang, "mermaid");
        assert_eq!(attrs.get("theme"), Some(&"dark".to_owned()));
    }

    #[test]
    fn test_parse_fence_info_language_is_first_token() {
        let (lang, _) = parse_fence_info("mermaid   extra");
        assert_eq!(lang, "mermaid");
    }

    #[test]
    fn test_parse_fence_info_empty() {
        let (lang, attrs) = parse_fence_info("   ");
        assert_eq!(lang, "");
        assert!(attrs.is_empty());
    }

    #[test]
    fn test_strip_fence_newline() {
        assert_eq!(strip_fence_newline("A-->B\n"), "A-->B");
        assert_eq!(strip_fence_newline("A\n\n"), "A\n");
        assert_eq!(strip_fence_newline(""), "");
    }
}
