//! Document HTML with diagrams rendered in place.

use tippytap_model::{Node, escape_html, mermaid_container, to_html};

use crate::renderer::DiagramRenderer;

/// Render a document to HTML, replacing each diagram container with its SVG.
///
/// A diagram that fails to render becomes an error block with the
/// renderer's message; the rest of the document is unaffected.
pub async fn render_document_html<R: DiagramRenderer>(doc: &Node, renderer: &R) -> String {
    let sources = diagram_sources(doc);
    let mut blocks = Vec::with_capacity(sources.len());
    for source in &sources {
        let block = if source.is_empty() {
            diagram_block("")
        } else {
            match renderer.render(source).await {
                Ok(diagram) => diagram_block(&diagram.svg),
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to render diagram");
                    error_block(&e.to_string())
                }
            }
        };
        blocks.push(block);
    }
    replace_containers(&to_html(doc), &sources, blocks)
}

/// Render a document to HTML with diagram sources in `<pre class="mermaid">`
/// blocks, for rendering in the browser.
pub fn render_source_html(doc: &Node) -> String {
    let sources = diagram_sources(doc);
    let blocks = sources
        .iter()
        .map(|source| format!(r#"<pre class="mermaid">{}</pre>"#, escape_html(source)))
        .collect();
    replace_containers(&to_html(doc), &sources, blocks)
}

fn diagram_sources(doc: &Node) -> Vec<String> {
    let mut sources = Vec::new();
    doc.descendants(&mut |node, _| {
        if let Node::Mermaid { content } = node {
            sources.push(content.clone());
        }
    });
    sources
}

fn diagram_block(svg: &str) -> String {
    format!(r#"<div class="mermaid-diagram">{svg}</div>"#)
}

fn error_block(message: &str) -> String {
    format!(
        r#"<div class="mermaid-error"><strong>Mermaid Diagram Error</strong><pre>{}</pre></div>"#,
        escape_html(message)
    )
}

/// Replace diagram containers in document order.
///
/// Text and code are escaped in the HTML, so a container's markup only
/// occurs where a diagram leaf was rendered.
fn replace_containers(html: &str, sources: &[String], blocks: Vec<String>) -> String {
    let mut out = String::with_capacity(html.len());
    let mut rest = html;
    for (source, block) in sources.iter().zip(blocks) {
        let container = mermaid_container(source);
        let Some(start) = rest.find(&container) else {
            continue;
        };
        out.push_str(&rest[..start]);
        out.push_str(&block);
        rest = &rest[start + container.len()..];
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use std::future::Future;

    use super::*;
    use crate::renderer::{RenderError, RenderedDiagram};
    use pretty_assertions::assert_eq;

    struct FailOnBang;

    impl DiagramRenderer for FailOnBang {
        fn render(
            &self,
            source: &str,
        ) -> impl Future<Output = Result<RenderedDiagram, RenderError>> + Send {
            let result = if source.contains('!') {
                Err(RenderError::Diagram("Syntax error <here>".to_owned()))
            } else {
                Ok(RenderedDiagram::new(format!("<svg>{}</svg>", source.len())))
            };
            async move { result }
        }
    }

    #[tokio::test]
    async fn test_failed_diagram_does_not_affect_siblings() {
        let doc = Node::doc(vec![
            Node::mermaid("A-->B"),
            Node::paragraph(vec![Node::text("between")]),
            Node::mermaid("bad!"),
            Node::mermaid("A-->B"),
        ]);

        let html = render_document_html(&doc, &FailOnBang).await;
        assert_eq!(
            html,
            concat!(
                r#"<div class="mermaid-diagram"><svg>5</svg></div>"#,
                "<p>between</p>",
                r#"<div class="mermaid-error"><strong>Mermaid Diagram Error</strong>"#,
                "<pre>Syntax error &lt;here&gt;</pre></div>",
                r#"<div class="mermaid-diagram"><svg>5</svg></div>"#,
            )
        );
    }

    #[test]
    fn test_source_html() {
        let doc = Node::doc(vec![
            Node::paragraph(vec![Node::text("a")]),
            Node::mermaid("A-->B"),
        ]);
        assert_eq!(
            render_source_html(&doc),
            r#"<p>a</p><pre class="mermaid">A--&gt;B</pre>"#
        );
    }

    #[test]
    fn test_container_markup_in_text_is_not_replaced() {
        let doc = Node::doc(vec![Node::paragraph(vec![Node::text(mermaid_container(
            "x",
        ))])]);
        let html = render_source_html(&doc);
        assert!(html.starts_with("<p>&lt;div"));
    }
}
