//! HTML render rules.
//!
//! The output is the HTML form the parse rules in [`crate::schema`] read
//! back, so rendering a document and parsing the result gives the same tree.

use crate::mark::Mark;
use crate::node::Node;
use crate::schema::{MERMAID_ATTR, MERMAID_CLASS};

/// Render a document (or any subtree) to HTML.
#[must_use]
pub fn to_html(node: &Node) -> String {
    let mut out = String::new();
    render_node(node, &mut out);
    out
}

fn render_node(node: &Node, out: &mut String) {
    match node {
        Node::Doc { content } => render_children(content, out),
        Node::Paragraph { content } => wrap("p", content, out),
        Node::Heading { level, content } => wrap(&format!("h{level}"), content, out),
        Node::Blockquote { content } => wrap("blockquote", content, out),
        Node::CodeBlock { language, text } => {
            out.push_str("<pre><code");
            if let Some(lang) = language {
                out.push_str(" class=\"language-");
                out.push_str(&escape_attr(lang));
                out.push('"');
            }
            out.push('>');
            out.push_str(&escape_html(text));
            out.push_str("</code></pre>");
        }
        Node::Mermaid { content } => out.push_str(&mermaid_container(content)),
        Node::HorizontalRule { .. } => out.push_str("<hr />"),
        Node::HardBreak => out.push_str("<br />"),
        Node::OrderedList {
            start,
            tight,
            content,
        } => {
            out.push_str("<ol");
            if *start != 1 {
                out.push_str(&format!(" start=\"{start}\""));
            }
            if *tight {
                out.push_str(" data-tight=\"true\"");
            }
            out.push('>');
            render_children(content, out);
            out.push_str("</ol>");
        }
        Node::BulletList { tight, content } => {
            out.push_str(if *tight {
                "<ul data-tight=\"true\">"
            } else {
                "<ul>"
            });
            render_children(content, out);
            out.push_str("</ul>");
        }
        Node::ListItem { content } => wrap("li", content, out),
        Node::Table { content } => {
            out.push_str("<table><tbody>");
            render_children(content, out);
            out.push_str("</tbody></table>");
        }
        Node::TableRow { content } => wrap("tr", content, out),
        Node::TableCell { content } => wrap("td", content, out),
        Node::TableHeader { content } => wrap("th", content, out),
        Node::Text { text, marks } => {
            for mark in marks {
                open_mark(mark, out);
            }
            out.push_str(&escape_html(text));
            for mark in marks.iter().rev() {
                close_mark(mark, out);
            }
        }
        Node::Image { src, alt, title } => {
            out.push_str("<img src=\"");
            out.push_str(&escape_attr(src));
            out.push('"');
            if let Some(alt) = alt {
                out.push_str(" alt=\"");
                out.push_str(&escape_attr(alt));
                out.push('"');
            }
            if let Some(title) = title {
                out.push_str(" title=\"");
                out.push_str(&escape_attr(title));
                out.push('"');
            }
            out.push_str(" />");
        }
    }
}

fn wrap(tag: &str, content: &[Node], out: &mut String) {
    out.push('<');
    out.push_str(tag);
    out.push('>');
    render_children(content, out);
    out.push_str("</");
    out.push_str(tag);
    out.push('>');
}

fn render_children(content: &[Node], out: &mut String) {
    for child in content {
        render_node(child, out);
    }
}

fn open_mark(mark: &Mark, out: &mut String) {
    match mark {
        Mark::DiffAdded => out.push_str("<span data-diff-added=\"true\">"),
        Mark::DiffRemoved => out.push_str("<span data-diff-removed=\"true\">"),
        Mark::Link { href, title } => {
            out.push_str("<a href=\"");
            out.push_str(&escape_attr(href));
            out.push('"');
            if let Some(title) = title {
                out.push_str(" title=\"");
                out.push_str(&escape_attr(title));
                out.push('"');
            }
            out.push('>');
        }
        Mark::Strong => out.push_str("<strong>"),
        Mark::Em => out.push_str("<em>"),
        Mark::Strike => out.push_str("<s>"),
        Mark::Code => out.push_str("<code>"),
    }
}

fn close_mark(mark: &Mark, out: &mut String) {
    out.push_str(match mark {
        Mark::DiffAdded | Mark::DiffRemoved => "</span>",
        Mark::Link { .. } => "</a>",
        Mark::Strong => "</strong>",
        Mark::Em => "</em>",
        Mark::Strike => "</s>",
        Mark::Code => "</code>",
    });
}

/// Container element for a Mermaid diagram leaf.
#[must_use]
pub fn mermaid_container(content: &str) -> String {
    format!(
        r#"<div {MERMAID_ATTR}="{}" class="{MERMAID_CLASS}"></div>"#,
        escape_attr(content)
    )
}

/// Escape text content for HTML.
#[must_use]
pub fn escape_html(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '"' => result.push_str("&quot;"),
            _ => result.push(c),
        }
    }
    result
}

/// Escape an HTML attribute value (`& < > " '`).
#[must_use]
pub fn escape_attr(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '"' => result.push_str("&quot;"),
            '\'' => result.push_str("&#039;"),
            _ => result.push(c),
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_escape_attr() {
        assert_eq!(
            escape_attr(r#"A-->B & "C" <'D'>"#),
            "A--&gt;B &amp; &quot;C&quot; &lt;&#039;D&#039;&gt;"
        );
    }

    #[test]
    fn test_escape_html_keeps_apostrophe() {
        assert_eq!(escape_html("it's <b>"), "it's &lt;b&gt;");
    }

    #[test]
    fn test_mermaid_container() {
        assert_eq!(
            to_html(&Node::mermaid("A-->B")),
            r#"<div data-mermaid-content="A--&gt;B" class="mermaid-wrapper"></div>"#
        );
    }

    #[test]
    fn test_marks_nest_in_set_order() {
        let text = Node::marked_text("x", vec![Mark::Code, Mark::link("u"), Mark::Strong]);
        assert_eq!(
            to_html(&text),
            r#"<a href="u"><strong><code>x</code></strong></a>"#
        );
    }

    #[test]
    fn test_blocks() {
        let doc = Node::doc(vec![
            Node::heading(2, vec![Node::text("T")]),
            Node::OrderedList {
                start: 3,
                tight: false,
                content: vec![Node::list_item(vec![Node::paragraph(vec![Node::text("a")])])],
            },
            Node::code_block(Some("rs"), "a < b"),
            Node::image("i.png", Some("alt"), None),
        ]);
        assert_eq!(
            to_html(&doc),
            concat!(
                "<h2>T</h2>",
                r#"<ol start="3"><li><p>a</p></li></ol>"#,
                r#"<pre><code class="language-rs">a &lt; b</code></pre>"#,
                r#"<img src="i.png" alt="alt" />"#,
            )
        );
    }
}
