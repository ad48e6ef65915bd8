//! HTML writer for the token stream.
//!
//! Output follows markdown-it's layout: one block tag per line, XHTML void
//! tags and no heading ids.

use std::fmt::Write;

use pulldown_cmark::{CodeBlockKind, Event, LinkType, Tag, TagEnd};

use crate::code_block::{render_fence, render_indented};
use crate::engine::{MarkupEngine, RenderEnv, TaskListOptions, Token};
use crate::link::{is_safe_link, normalize_link};
use crate::state::{CodeBlockState, ImageState, TableState, TaskListState, escape_html};

/// Renders one token stream. Created per [`MarkupEngine::render`] call.
pub(crate) struct HtmlWriter<'a> {
    output: String,
    engine: &'a MarkupEngine,
    env: &'a RenderEnv,
    tasklist: Option<TaskListOptions>,
    tasks: TaskListState,
    code: CodeBlockState,
    table: TableState,
    image: ImageState,
    /// Source and title of the outermost open image.
    pending_image: Option<(String, String)>,
}

impl<'a> HtmlWriter<'a> {
    pub(crate) fn new(engine: &'a MarkupEngine, env: &'a RenderEnv, tokens: &[Token]) -> Self {
        let tasklist = engine.extensions().tasklist;
        let tasks = if tasklist.is_some() {
            TaskListState::scan(tokens.iter().map(|token| &token.event))
        } else {
            TaskListState::default()
        };

        Self {
            output: String::with_capacity(4096),
            engine,
            env,
            tasklist,
            tasks,
            code: CodeBlockState::default(),
            table: TableState::default(),
            image: ImageState::default(),
            pending_image: None,
        }
    }

    pub(crate) fn render(mut self, tokens: &[Token]) -> String {
        for (index, token) in tokens.iter().enumerate() {
            self.process_event(index, &token.event);
        }
        self.output
    }

    fn process_event(&mut self, index: usize, event: &Event<'_>) {
        match event {
            Event::Start(tag) => self.start_tag(index, tag),
            Event::End(tag) => self.end_tag(*tag),
            Event::Text(text) => self.text(text),
            Event::Code(code) => self.inline_code(code),
            Event::Html(html) => self.output.push_str(html),
            Event::InlineHtml(html) => {
                if !self.image.is_active() {
                    self.push_inline(html);
                }
            }
            Event::SoftBreak => self.soft_break(),
            Event::HardBreak => self.hard_break(),
            Event::Rule => {
                self.open_block("<hr />\n");
            }
            Event::TaskListMarker(checked) => self.task_list_marker(*checked),
            Event::FootnoteReference(_) | Event::InlineMath(_) | Event::DisplayMath(_) => {
                // Not enabled
            }
        }
    }

    #[allow(clippy::too_many_lines)]
    fn start_tag(&mut self, index: usize, tag: &Tag<'_>) {
        if self.image.is_active() {
            // Alt text is plain text; only nested images are counted.
            if matches!(tag, Tag::Image { .. }) {
                self.image.start();
            }
            return;
        }

        match tag {
            Tag::Paragraph => self.open_block("<p>"),
            Tag::Heading { level, .. } => self.open_block(&format!("<{level}>")),
            Tag::BlockQuote(_) => self.open_block("<blockquote>\n"),
            Tag::CodeBlock(kind) => {
                self.open_block("");
                let info = match kind {
                    CodeBlockKind::Fenced(info) => Some(info.to_string()),
                    CodeBlockKind::Indented => None,
                };
                self.code.start(info);
            }
            Tag::HtmlBlock => self.open_block(""),
            Tag::List(start) => {
                let class = if self.tasks.is_task_list(index) {
                    r#" class="contains-task-list""#
                } else {
                    ""
                };
                match start {
                    Some(1) => self.open_block(&format!("<ol{class}>\n")),
                    Some(n) => self.open_block(&format!("<ol{class} start=\"{n}\">\n")),
                    None => self.open_block(&format!("<ul{class}>\n")),
                }
            }
            Tag::Item => {
                if self.tasks.is_task_item(index) {
                    self.open_block(r#"<li class="task-list-item">"#);
                } else {
                    self.open_block("<li>");
                }
            }
            Tag::DefinitionList => self.open_block("<dl>\n"),
            Tag::DefinitionListTitle => self.open_block("<dt>"),
            Tag::DefinitionListDefinition => self.open_block("<dd>"),
            Tag::Table(alignments) => {
                self.table.start(alignments.clone());
                self.open_block("<table>\n");
            }
            Tag::TableHead => {
                self.table.start_head();
                self.output.push_str("<thead>\n<tr>\n");
            }
            Tag::TableRow => {
                if self.table.start_row() {
                    self.output.push_str("<tbody>\n");
                }
                self.output.push_str("<tr>\n");
            }
            Tag::TableCell => {
                let cell = if self.table.is_in_head() { "th" } else { "td" };
                let align = self.table.current_alignment_style();
                write!(self.output, "<{cell}{align}>").unwrap();
            }
            Tag::Emphasis => self.push_inline("<em>"),
            Tag::Strong => self.push_inline("<strong>"),
            Tag::Strikethrough => self.push_inline("<s>"),
            Tag::Superscript => self.push_inline("<sup>"),
            Tag::Subscript => self.push_inline("<sub>"),
            Tag::Link {
                link_type,
                dest_url,
                title,
                ..
            } => {
                let mut open = String::from("<a");
                if let Some(href) = link_href(*link_type, dest_url) {
                    write!(open, r#" href="{}""#, escape_html(&href)).unwrap();
                }
                if !title.is_empty() {
                    write!(open, r#" title="{}""#, escape_html(title)).unwrap();
                }
                open.push('>');
                self.push_inline(&open);
            }
            Tag::Image {
                dest_url, title, ..
            } => {
                self.image.start();
                let src = link_href(LinkType::Inline, dest_url).unwrap_or_default();
                self.pending_image = Some((src, title.to_string()));
            }
            Tag::FootnoteDefinition(_) | Tag::MetadataBlock(_) => {}
        }
    }

    fn end_tag(&mut self, tag: TagEnd) {
        if self.image.is_active() {
            if tag == TagEnd::Image
                && let Some(alt) = self.image.end()
            {
                self.image_tag(&alt);
            }
            return;
        }

        match tag {
            TagEnd::Paragraph => {
                self.close_label();
                self.output.push_str("</p>\n");
            }
            TagEnd::Heading(level) => writeln!(self.output, "</{level}>").unwrap(),
            TagEnd::BlockQuote(_) => self.close_block("</blockquote>\n"),
            TagEnd::CodeBlock => {
                let (info, source) = self.code.end();
                let html = match info {
                    Some(info) => render_fence(
                        &info,
                        &source,
                        self.engine.highlighter(),
                        self.engine.fence_renderer(),
                        self.env,
                    ),
                    None => render_indented(&source),
                };
                self.output.push_str(&html);
            }
            TagEnd::HtmlBlock => self.ensure_newline(),
            TagEnd::List(ordered) => {
                self.close_block(if ordered { "</ol>\n" } else { "</ul>\n" });
            }
            TagEnd::Item => {
                self.close_label();
                self.output.push_str("</li>\n");
            }
            TagEnd::DefinitionList => self.close_block("</dl>\n"),
            TagEnd::DefinitionListTitle => self.output.push_str("</dt>\n"),
            TagEnd::DefinitionListDefinition => self.close_block("</dd>\n"),
            TagEnd::Table => {
                if self.table.is_in_body() {
                    self.output.push_str("</tbody>\n");
                }
                self.output.push_str("</table>\n");
            }
            TagEnd::TableHead => {
                self.output.push_str("</tr>\n</thead>\n");
                self.table.end_head();
            }
            TagEnd::TableRow => self.output.push_str("</tr>\n"),
            TagEnd::TableCell => {
                let cell = if self.table.is_in_head() { "th" } else { "td" };
                writeln!(self.output, "</{cell}>").unwrap();
                self.table.next_cell();
            }
            TagEnd::Emphasis => self.push_inline("</em>"),
            TagEnd::Strong => self.push_inline("</strong>"),
            TagEnd::Strikethrough => self.push_inline("</s>"),
            TagEnd::Superscript => self.push_inline("</sup>"),
            TagEnd::Subscript => self.push_inline("</sub>"),
            TagEnd::Link => self.push_inline("</a>"),
            TagEnd::Image | TagEnd::FootnoteDefinition | TagEnd::MetadataBlock(_) => {}
        }
    }

    fn text(&mut self, text: &str) {
        if self.code.is_active() {
            self.code.push_str(text);
        } else if self.image.is_active() {
            self.image.push_str(text);
        } else {
            let text = if self.flush_space() {
                text.trim_start()
            } else {
                text
            };
            self.output.push_str(&escape_html(text));
        }
    }

    fn inline_code(&mut self, code: &str) {
        if self.image.is_active() {
            self.image.push_str(code);
        } else {
            self.push_inline(&format!("<code>{}</code>", escape_html(code)));
        }
    }

    fn soft_break(&mut self) {
        if self.image.is_active() {
            self.image.push_str("\n");
        } else {
            self.output.push('\n');
        }
    }

    fn hard_break(&mut self) {
        if self.image.is_active() {
            self.image.push_str("\n");
        } else {
            self.push_inline("<br />\n");
        }
    }

    fn task_list_marker(&mut self, checked: bool) {
        let Some(options) = self.tasklist else {
            self.push_inline(if checked { "[x]" } else { "[ ]" });
            self.tasks.owe_space();
            return;
        };

        let mut input = String::from(r#"<input class="task-list-item-checkbox""#);
        if checked {
            input.push_str(r#" checked="checked""#);
        }
        if !options.enabled {
            input.push_str(r#" disabled="disabled""#);
        }

        if options.label && options.label_after {
            let id = self.tasks.next_id();
            write!(
                input,
                r#" id="task-item-{id}" type="checkbox"><label class="task-list-item-label" for="task-item-{id}">"#
            )
            .unwrap();
            self.output.push_str(&input);
            self.tasks.open_label();
        } else if options.label {
            input.push_str(r#" type="checkbox">"#);
            self.output.push_str("<label>");
            self.output.push_str(&input);
            self.tasks.open_label();
        } else {
            input.push_str(r#" type="checkbox">"#);
            self.output.push_str(&input);
        }
        self.tasks.owe_space();
    }

    fn image_tag(&mut self, alt: &str) {
        let Some((src, title)) = self.pending_image.take() else {
            return;
        };
        let mut tag = format!(
            r#"<img src="{}" alt="{}""#,
            escape_html(&src),
            escape_html(alt)
        );
        if !title.is_empty() {
            write!(tag, r#" title="{}""#, escape_html(&title)).unwrap();
        }
        tag.push_str(" />");
        self.push_inline(&tag);
    }

    /// Push inline markup, writing any space owed after a task checkbox.
    fn push_inline(&mut self, content: &str) {
        self.flush_space();
        self.output.push_str(content);
    }

    fn flush_space(&mut self) -> bool {
        if self.tasks.take_space() {
            self.output.push(' ');
            true
        } else {
            false
        }
    }

    /// Start a block on a fresh line.
    fn open_block(&mut self, tag: &str) {
        self.close_label();
        self.ensure_newline();
        self.output.push_str(tag);
    }

    fn close_block(&mut self, tag: &str) {
        self.ensure_newline();
        self.output.push_str(tag);
    }

    fn close_label(&mut self) {
        self.tasks.take_space();
        if self.tasks.take_label() {
            self.output.push_str("</label>");
        }
    }

    fn ensure_newline(&mut self) {
        if !self.output.is_empty() && !self.output.ends_with('\n') {
            self.output.push('\n');
        }
    }
}

/// Normalized `href` for a link target, or `None` when the target is unsafe.
fn link_href(link_type: LinkType, dest_url: &str) -> Option<String> {
    let url = if link_type == LinkType::Email && !dest_url.starts_with("mailto:") {
        format!("mailto:{dest_url}")
    } else {
        dest_url.to_owned()
    };

    if is_safe_link(&url) {
        Some(normalize_link(&url))
    } else {
        tracing::debug!(url = %url, "Dropping unsafe link target");
        None
    }
}
