//! Markdown → HTML → document tree.

use std::collections::HashMap;

use pulldown_cmark::{CodeBlockKind, Event, HeadingLevel, Options, Parser, Tag, TagEnd};
use tippytap_model::{Node, escape_attr, escape_html};

use crate::code_block::{CodeBlockProcessor, ProcessResult, parse_fence_info, strip_fence_newline};
use crate::parser::parse_html;

/// Markdown decoder with pluggable code block processors.
///
/// Markdown is rendered to the HTML form understood by the tree parser,
/// which then builds the document. Fenced blocks are offered to the
/// registered processors first; the first returning a non-`PassThrough`
/// result wins.
pub struct MarkdownDecoder {
    output: String,
    code: Option<CodeBlock>,
    image: Option<PendingImage>,
    in_table_head: bool,
    processors: Vec<Box<dyn CodeBlockProcessor>>,
    code_block_index: usize,
}

struct CodeBlock {
    language: Option<String>,
    attrs: HashMap<String, String>,
    content: String,
}

struct PendingImage {
    src: String,
    title: String,
    alt: String,
}

impl MarkdownDecoder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            output: String::with_capacity(4096),
            code: None,
            image: None,
            in_table_head: false,
            processors: Vec::new(),
            code_block_index: 0,
        }
    }

    /// Add a code block processor.
    #[must_use]
    pub fn with_processor<P: CodeBlockProcessor + 'static>(mut self, processor: P) -> Self {
        self.processors.push(Box::new(processor));
        self
    }

    /// Parser options: tables and strikethrough on top of `CommonMark`.
    #[must_use]
    pub fn parser_options() -> Options {
        Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH
    }

    /// Decode Markdown into a document.
    ///
    /// Empty or whitespace-only input gives the canonical empty document.
    /// If the intermediate HTML cannot be parsed, the raw text is kept as a
    /// single paragraph.
    pub fn decode(&mut self, markdown: &str) -> Node {
        let markdown = markdown.replace("\r\n", "\n");
        if markdown.trim().is_empty() {
            return Node::empty_doc();
        }

        let html = self.render_html(&markdown);
        match parse_html(&html) {
            Ok(doc) => doc,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to parse decoded markdown, keeping raw text");
                Node::doc(vec![Node::paragraph(vec![Node::text(markdown)])])
            }
        }
    }

    /// Render Markdown to the intermediate HTML.
    pub fn render_html(&mut self, markdown: &str) -> String {
        self.output.clear();
        self.code = None;
        self.image = None;
        self.in_table_head = false;
        self.code_block_index = 0;

        for event in Parser::new_ext(markdown, Self::parser_options()) {
            self.process_event(event);
        }

        std::mem::take(&mut self.output)
    }

    fn process_event(&mut self, event: Event<'_>) {
        match event {
            Event::Start(tag) => self.start_tag(tag),
            Event::End(tag) => self.end_tag(tag),
            Event::Text(text) => self.text(&text),
            Event::Code(code) => self.inline_code(&code),
            Event::Html(html) | Event::InlineHtml(html) => self.raw_html(&html),
            Event::SoftBreak => self.soft_break(),
            Event::HardBreak => self.push_inline("<br />"),
            Event::Rule => self.output.push_str("<hr />"),
            Event::TaskListMarker(_)
            | Event::FootnoteReference(_)
            | Event::InlineMath(_)
            | Event::DisplayMath(_) => {
                // Not supported
            }
        }
    }

    fn start_tag(&mut self, tag: Tag<'_>) {
        match tag {
            Tag::Paragraph => self.output.push_str("<p>"),
            Tag::Heading { level, .. } => {
                self.output.push_str(&format!("<h{}>", heading_level_to_num(level)));
            }
            Tag::BlockQuote(_) => self.output.push_str("<blockquote>"),
            Tag::CodeBlock(kind) => {
                let (language, attrs) = match kind {
                    CodeBlockKind::Fenced(ref info) if !info.is_empty() => {
                        let (lang, attrs) = parse_fence_info(info);
                        (if lang.is_empty() { None } else { Some(lang) }, attrs)
                    }
                    _ => (None, HashMap::new()),
                };
                self.code = Some(CodeBlock {
                    language,
                    attrs,
                    content: String::new(),
                });
            }
            Tag::List(start) => match start {
                Some(1) => self.output.push_str("<ol>"),
                Some(n) => self.output.push_str(&format!(r#"<ol start="{n}">"#)),
                None => self.output.push_str("<ul>"),
            },
            Tag::Item => self.output.push_str("<li>"),
            Tag::Table(_) => self.output.push_str("<table>"),
            Tag::TableHead => {
                self.in_table_head = true;
                self.output.push_str("<thead><tr>");
            }
            Tag::TableRow => self.output.push_str("<tr>"),
            Tag::TableCell => {
                self.output
                    .push_str(if self.in_table_head { "<th>" } else { "<td>" });
            }
            Tag::Emphasis => self.push_inline("<em>"),
            Tag::Strong => self.push_inline("<strong>"),
            Tag::Strikethrough => self.push_inline("<s>"),
            Tag::Link {
                dest_url, title, ..
            } => {
                let title_attr = if title.is_empty() {
                    String::new()
                } else {
                    format!(r#" title="{}""#, escape_attr(&title))
                };
                let link_tag = format!(r#"<a href="{}"{title_attr}>"#, escape_attr(&dest_url));
                self.push_inline(&link_tag);
            }
            Tag::Image {
                dest_url, title, ..
            } => {
                self.image = Some(PendingImage {
                    src: dest_url.to_string(),
                    title: title.to_string(),
                    alt: String::new(),
                });
            }
            Tag::FootnoteDefinition(_)
            | Tag::HtmlBlock
            | Tag::MetadataBlock(_)
            | Tag::DefinitionList
            | Tag::DefinitionListTitle
            | Tag::DefinitionListDefinition
            | Tag::Superscript
            | Tag::Subscript => {}
        }
    }

    fn end_tag(&mut self, tag: TagEnd) {
        match tag {
            TagEnd::Paragraph => self.output.push_str("</p>"),
            TagEnd::Heading(level) => {
                self.output
                    .push_str(&format!("</h{}>", heading_level_to_num(level)));
            }
            TagEnd::BlockQuote(_) => self.output.push_str("</blockquote>"),
            TagEnd::CodeBlock => {
                if let Some(block) = self.code.take() {
                    self.code_block(block);
                }
            }
            TagEnd::List(ordered) => {
                self.output
                    .push_str(if ordered { "</ol>" } else { "</ul>" });
            }
            TagEnd::Item => self.output.push_str("</li>"),
            TagEnd::Table => self.output.push_str("</tbody></table>"),
            TagEnd::TableHead => {
                self.output.push_str("</tr></thead><tbody>");
                self.in_table_head = false;
            }
            TagEnd::TableRow => self.output.push_str("</tr>"),
            TagEnd::TableCell => {
                self.output
                    .push_str(if self.in_table_head { "</th>" } else { "</td>" });
            }
            TagEnd::Emphasis => self.push_inline("</em>"),
            TagEnd::Strong => self.push_inline("</strong>"),
            TagEnd::Strikethrough => self.push_inline("</s>"),
            TagEnd::Link => self.push_inline("</a>"),
            TagEnd::Image => {
                if let Some(image) = self.image.take() {
                    self.image_tag(&image);
                }
            }
            TagEnd::FootnoteDefinition
            | TagEnd::HtmlBlock
            | TagEnd::MetadataBlock(_)
            | TagEnd::DefinitionList
            | TagEnd::DefinitionListTitle
            | TagEnd::DefinitionListDefinition
            | TagEnd::Superscript
            | TagEnd::Subscript => {}
        }
    }

    fn code_block(&mut self, block: CodeBlock) {
        let index = self.code_block_index;
        self.code_block_index += 1;

        // Try processors in order, fall back to normal code block rendering
        let processed = block.language.as_ref().is_some_and(|lang| {
            self.processors.iter_mut().any(|processor| {
                match processor.process(lang, &block.attrs, &block.content, index) {
                    ProcessResult::Inline(html) => {
                        self.output.push_str(&html);
                        true
                    }
                    ProcessResult::PassThrough => false,
                }
            })
        });

        if !processed {
            let content = escape_html(strip_fence_newline(&block.content));
            match block.language {
                Some(lang) => self.output.push_str(&format!(
                    r#"<pre><code class="language-{}">{content}</code></pre>"#,
                    escape_attr(&lang)
                )),
                None => self
                    .output
                    .push_str(&format!("<pre><code>{content}</code></pre>")),
            }
        }
    }

    fn image_tag(&mut self, image: &PendingImage) {
        let mut tag = format!(r#"<img src="{}""#, escape_attr(&image.src));
        if !image.alt.is_empty() {
            tag.push_str(&format!(r#" alt="{}""#, escape_attr(&image.alt)));
        }
        if !image.title.is_empty() {
            tag.push_str(&format!(r#" title="{}""#, escape_attr(&image.title)));
        }
        tag.push_str(" />");
        self.output.push_str(&tag);
    }

    /// Push inline markup unless it belongs to an image's alt text.
    fn push_inline(&mut self, content: &str) {
        if self.image.is_none() {
            self.output.push_str(content);
        }
    }

    fn text(&mut self, text: &str) {
        if let Some(code) = &mut self.code {
            code.content.push_str(text);
        } else if let Some(image) = &mut self.image {
            image.alt.push_str(text);
        } else {
            self.output.push_str(&escape_html(text));
        }
    }

    fn inline_code(&mut self, code: &str) {
        if let Some(image) = &mut self.image {
            image.alt.push_str(code);
        } else {
            self.output
                .push_str(&format!("<code>{}</code>", escape_html(code)));
        }
    }

    fn raw_html(&mut self, html: &str) {
        if let Some(code) = &mut self.code {
            code.content.push_str(html);
        } else {
            self.output.push_str(html);
        }
    }

    fn soft_break(&mut self) {
        if let Some(code) = &mut self.code {
            code.content.push('\n');
        } else if let Some(image) = &mut self.image {
            image.alt.push(' ');
        } else {
            self.output.push('\n');
        }
    }
}

impl Default for MarkdownDecoder {
    fn default() -> Self {
        Self::new()
    }
}

fn heading_level_to_num(level: HeadingLevel) -> u8 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}
