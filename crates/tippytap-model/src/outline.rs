//! Table of contents built from document headings.

use std::collections::HashMap;

use crate::node::Node;

/// Table of contents entry.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TocEntry {
    /// Heading level (1-6).
    pub level: u8,
    /// Heading text.
    pub title: String,
    /// Anchor ID for linking.
    pub id: String,
}

/// Collect every heading of `doc` in document order.
///
/// Headings nested in blockquotes and list items are included. IDs are
/// slugs of the heading text, made unique with a numeric suffix.
#[must_use]
pub fn outline(doc: &Node) -> Vec<TocEntry> {
    let mut id_counts: HashMap<String, usize> = HashMap::new();
    let mut toc = Vec::new();

    doc.descendants(&mut |node, _| {
        if let Node::Heading { level, .. } = node {
            let title = node.text_content().trim().to_owned();
            let base_id = slugify(&title);
            let count = id_counts.entry(base_id.clone()).or_default();
            let id = match *count {
                0 => base_id,
                n => format!("{base_id}-{n}"),
            };
            *count += 1;
            toc.push(TocEntry {
                level: *level,
                title,
                id,
            });
        }
    });

    toc
}

/// Convert text to URL-safe slug.
///
/// Converts to lowercase, replaces whitespace/dashes/underscores with single dashes,
/// and removes other non-alphanumeric characters.
#[must_use]
pub fn slugify(text: &str) -> String {
    let mut result = String::new();
    let mut last_was_dash = true;

    for c in text.trim().chars() {
        if c.is_alphanumeric() {
            result.extend(c.to_lowercase());
            last_was_dash = false;
        } else if !last_was_dash && (c.is_whitespace() || c == '-' || c == '_') {
            result.push('-');
            last_was_dash = true;
        }
    }

    if result.ends_with('-') {
        result.pop();
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mark::Mark;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Hello World"), "hello-world");
        assert_eq!(slugify("What's New?"), "whats-new");
        assert_eq!(slugify("  Spaces  "), "spaces");
        assert_eq!(slugify("snake_case"), "snake-case");
        assert_eq!(slugify("Über Größe"), "über-größe");
    }

    #[test]
    fn test_outline_collects_headings_in_order() {
        let doc = Node::doc(vec![
            Node::heading(1, vec![Node::text("Guide")]),
            Node::paragraph(vec![Node::text("intro")]),
            Node::blockquote(vec![Node::heading(
                2,
                vec![
                    Node::text("Set "),
                    Node::marked_text("up", vec![Mark::Em]),
                ],
            )]),
            Node::heading(2, vec![Node::text("Set up")]),
        ]);

        assert_eq!(
            outline(&doc),
            vec![
                TocEntry {
                    level: 1,
                    title: "Guide".to_owned(),
                    id: "guide".to_owned(),
                },
                TocEntry {
                    level: 2,
                    title: "Set up".to_owned(),
                    id: "set-up".to_owned(),
                },
                TocEntry {
                    level: 2,
                    title: "Set up".to_owned(),
                    id: "set-up-1".to_owned(),
                },
            ]
        );
    }

    #[test]
    fn test_outline_empty_document() {
        assert!(outline(&Node::empty_doc()).is_empty());
    }
}
