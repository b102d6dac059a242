//! Parse rules: which node or mark an HTML element produces.

use crate::mark::Mark;
use crate::node::Node;

/// Attribute carrying Mermaid diagram source on the container element.
pub const MERMAID_ATTR: &str = "data-mermaid-content";

/// CSS class of the Mermaid container element.
pub const MERMAID_CLASS: &str = "mermaid-wrapper";

/// Attribute marking a list as tight.
pub const TIGHT_ATTR: &str = "data-tight";

/// Attribute marking text added by an external change.
pub const DIFF_ADDED_ATTR: &str = "data-diff-added";

/// Attribute marking text removed by an external change.
pub const DIFF_REMOVED_ATTR: &str = "data-diff-removed";

/// What an HTML element turns into.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ParsedElement {
    /// Block node with empty content; the element's children fill it.
    /// Atom blocks (diagram, rule) ignore their children.
    Block(Node),
    /// Inline atom (hard break, image).
    Inline(Node),
    /// Mark applied to the inline content inside the element.
    Mark(Mark),
    /// No node of its own; children are parsed in place.
    Transparent,
    /// Element dropped with its whole subtree.
    Ignore,
}

/// Apply the parse rules to an element.
///
/// `attrs` holds the element's attributes with entity references already
/// resolved. Tag names are matched case-insensitively.
#[must_use]
pub fn parse_element(tag: &str, attrs: &[(String, String)]) -> ParsedElement {
    let attr = |name: &str| {
        attrs
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    };
    let tag = tag.to_ascii_lowercase();

    match tag.as_str() {
        "p" => ParsedElement::Block(Node::paragraph(Vec::new())),
        "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
            let level = tag[1..].parse().unwrap_or(1);
            ParsedElement::Block(Node::heading(level, Vec::new()))
        }
        "blockquote" => ParsedElement::Block(Node::blockquote(Vec::new())),
        "pre" => ParsedElement::Block(Node::code_block(None, "")),
        "div" => match attr(MERMAID_ATTR) {
            Some(content) => ParsedElement::Block(Node::mermaid(content)),
            None => ParsedElement::Transparent,
        },
        "hr" => ParsedElement::Block(Node::horizontal_rule()),
        "ul" => ParsedElement::Block(Node::BulletList {
            tight: attr(TIGHT_ATTR).is_some_and(|v| v != "false"),
            content: Vec::new(),
        }),
        "ol" => ParsedElement::Block(Node::OrderedList {
            start: attr("start")
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(1),
            tight: attr(TIGHT_ATTR).is_some_and(|v| v != "false"),
            content: Vec::new(),
        }),
        "li" => ParsedElement::Block(Node::list_item(Vec::new())),
        "table" => ParsedElement::Block(Node::table(Vec::new())),
        "tr" => ParsedElement::Block(Node::table_row(Vec::new())),
        "th" => ParsedElement::Block(Node::table_header(Vec::new())),
        "td" => ParsedElement::Block(Node::table_cell(Vec::new())),
        "br" => ParsedElement::Inline(Node::HardBreak),
        "img" => match attr("src") {
            Some(src) => ParsedElement::Inline(Node::image(
                src,
                attr("alt").filter(|s| !s.is_empty()),
                attr("title").filter(|s| !s.is_empty()),
            )),
            None => ParsedElement::Ignore,
        },
        "strong" | "b" => ParsedElement::Mark(Mark::Strong),
        "em" | "i" => ParsedElement::Mark(Mark::Em),
        "s" | "del" | "strike" => ParsedElement::Mark(Mark::Strike),
        "code" => ParsedElement::Mark(Mark::Code),
        "a" => match attr("href") {
            Some(href) => ParsedElement::Mark(Mark::Link {
                href: href.to_owned(),
                title: attr("title").filter(|s| !s.is_empty()).map(str::to_owned),
            }),
            None => ParsedElement::Transparent,
        },
        "span" if attr(DIFF_ADDED_ATTR).is_some() => ParsedElement::Mark(Mark::DiffAdded),
        "span" if attr(DIFF_REMOVED_ATTR).is_some() => ParsedElement::Mark(Mark::DiffRemoved),
        "script" | "style" | "head" | "title" | "template" => ParsedElement::Ignore,
        _ => ParsedElement::Transparent,
    }
}

/// Language of a code block from the `class` of its `<code>` element.
#[must_use]
pub fn code_language(class: &str) -> Option<String> {
    class
        .split_whitespace()
        .find_map(|c| c.strip_prefix("language-"))
        .filter(|lang| !lang.is_empty())
        .map(str::to_owned)
}

/// Elements that never have a closing tag in HTML.
#[must_use]
pub fn is_void_element(tag: &str) -> bool {
    matches!(
        tag.to_ascii_lowercase().as_str(),
        "area"
            | "base"
            | "br"
            | "col"
            | "embed"
            | "hr"
            | "img"
            | "input"
            | "link"
            | "meta"
            | "source"
            | "track"
            | "wbr"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn attrs(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect()
    }

    #[test]
    fn test_mermaid_container_parses_to_leaf() {
        let parsed = parse_element(
            "div",
            &attrs(&[(MERMAID_ATTR, "A-->B"), ("class", MERMAID_CLASS)]),
        );
        assert_eq!(parsed, ParsedElement::Block(Node::mermaid("A-->B")));
    }

    #[test]
    fn test_plain_div_is_transparent() {
        assert_eq!(parse_element("div", &[]), ParsedElement::Transparent);
    }

    #[test]
    fn test_ordered_list_start() {
        assert_eq!(
            parse_element("OL", &attrs(&[("start", "7")])),
            ParsedElement::Block(Node::OrderedList {
                start: 7,
                tight: false,
                content: vec![],
            })
        );
    }

    #[test]
    fn test_link_and_diff_marks() {
        assert_eq!(
            parse_element("a", &attrs(&[("href", "x"), ("title", "T")])),
            ParsedElement::Mark(Mark::Link {
                href: "x".to_owned(),
                title: Some("T".to_owned()),
            })
        );
        assert_eq!(parse_element("a", &[]), ParsedElement::Transparent);
        assert_eq!(
            parse_element("span", &attrs(&[(DIFF_REMOVED_ATTR, "true")])),
            ParsedElement::Mark(Mark::DiffRemoved)
        );
    }

    #[test]
    fn test_image_drops_empty_alt() {
        assert_eq!(
            parse_element("img", &attrs(&[("src", "a.png"), ("alt", "")])),
            ParsedElement::Inline(Node::image("a.png", None, None))
        );
    }

    #[test]
    fn test_code_language() {
        assert_eq!(code_language("language-rust"), Some("rust".to_owned()));
        assert_eq!(code_language("hl language-js"), Some("js".to_owned()));
        assert_eq!(code_language("language-"), None);
        assert_eq!(code_language(""), None);
    }
}
