//! The configured markup engine.

use std::ops::Range;

use pulldown_cmark::{CowStr, Event, MetadataBlockKind, Options, Parser, Tag, TagEnd};

use crate::code_block::{FenceRenderer, HighlightContainer, Highlighter};
use crate::html::HtmlWriter;
use crate::syntax::{BlockSyntax, apply_roles, base_syntaxes, preprocess};

/// Render-time flags, created per document and passed to parse and render.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RenderEnv {
    /// Fenced code is delegated to an external highlighter.
    pub highlight: bool,
}

/// Options for the task list extension.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub struct TaskListOptions {
    /// Leave checkboxes clickable (omit `disabled`).
    pub enabled: bool,
    /// Wrap the item text in a `<label>`.
    pub label: bool,
    /// Place the label after the checkbox, linked by `for`/`id`.
    pub label_after: bool,
}

/// Optional syntax extensions.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Extensions {
    /// Task list checkboxes, `None` when disabled.
    pub tasklist: Option<TaskListOptions>,
    /// Definition lists.
    pub deflist: bool,
}

/// A parsed token: an owned markup event and the byte range it covers in
/// [`Document::body`].
#[derive(Clone, Debug, PartialEq)]
pub struct Token {
    pub event: Event<'static>,
    pub span: Range<usize>,
}

/// Result of [`MarkupEngine::parse`].
#[derive(Clone, Debug)]
pub struct Document {
    /// Raw YAML front matter, empty when the document has none.
    pub frontmatter: String,
    /// Body text the token spans refer to.
    pub body: String,
    /// Body tokens in document order.
    pub tokens: Vec<Token>,
}

impl Document {
    /// Whether the document opened with a front-matter block.
    pub fn has_frontmatter(&self) -> bool {
        !self.frontmatter.is_empty()
    }

    /// Raw source of the first heading's inline content, if the body starts
    /// with a heading. An empty heading gives an empty string.
    pub fn leading_heading(&self) -> Option<&str> {
        let mut tokens = self.tokens.iter();
        let first = tokens.next()?;
        if !matches!(first.event, Event::Start(Tag::Heading { .. })) {
            return None;
        }

        let mut span: Option<Range<usize>> = None;
        for token in tokens {
            if matches!(token.event, Event::End(TagEnd::Heading(_))) {
                break;
            }
            span = Some(match span {
                Some(s) => s.start.min(token.span.start)..s.end.max(token.span.end),
                None => token.span.clone(),
            });
        }

        match span {
            Some(span) => self.body.get(span).map(str::trim),
            None => Some(""),
        }
    }
}

/// A configured Markdown processor.
///
/// Built once and reused: parsing and rendering take `&self` and keep all
/// per-document state in the returned [`Document`] and a per-call writer.
pub struct MarkupEngine {
    extensions: Extensions,
    block_syntaxes: Vec<Box<dyn BlockSyntax>>,
    highlighter: Option<Box<dyn Highlighter>>,
    fence_renderer: Box<dyn FenceRenderer>,
}

impl MarkupEngine {
    /// Create an engine with the base MyST syntax and no optional extensions.
    #[must_use]
    pub fn new() -> Self {
        Self {
            extensions: Extensions::default(),
            block_syntaxes: base_syntaxes(),
            highlighter: None,
            fence_renderer: Box::new(HighlightContainer::default()),
        }
    }

    /// Enable optional extensions.
    #[must_use]
    pub fn with_extensions(mut self, extensions: Extensions) -> Self {
        self.extensions = extensions;
        self
    }

    /// Set the code highlighting strategy.
    #[must_use]
    pub fn with_highlighter<H: Highlighter + 'static>(mut self, highlighter: H) -> Self {
        self.highlighter = Some(Box::new(highlighter));
        self
    }

    /// Replace the fence wrapping strategy (default: [`HighlightContainer`]).
    #[must_use]
    pub fn with_fence_renderer<F: FenceRenderer + 'static>(mut self, renderer: F) -> Self {
        self.fence_renderer = Box::new(renderer);
        self
    }

    /// Add a block syntax rule, checked after the base rules.
    #[must_use]
    pub fn with_block_syntax<S: BlockSyntax + 'static>(mut self, syntax: S) -> Self {
        self.block_syntaxes.push(Box::new(syntax));
        self
    }

    pub fn extensions(&self) -> &Extensions {
        &self.extensions
    }

    /// Parser options for the body.
    #[must_use]
    pub fn parser_options(&self) -> Options {
        let mut options = Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH;
        if self.extensions.tasklist.is_some() {
            options |= Options::ENABLE_TASKLISTS;
        }
        if self.extensions.deflist {
            options |= Options::ENABLE_DEFINITION_LIST;
        }
        options
    }

    /// Split front matter from `text` and tokenize the body.
    pub fn parse(&self, text: &str, _env: &RenderEnv) -> Document {
        let (frontmatter, body) = split_front_matter(text);
        let body = preprocess(body, &self.block_syntaxes);
        let tokens = self.tokenize(&body);
        Document {
            frontmatter,
            body,
            tokens,
        }
    }

    /// Render tokens to HTML.
    pub fn render(&self, tokens: &[Token], env: &RenderEnv) -> String {
        HtmlWriter::new(self, env, tokens).render(tokens)
    }

    /// Parse and render a standalone string, ignoring any front matter.
    pub fn render_markdown(&self, text: &str, env: &RenderEnv) -> String {
        let document = self.parse(text, env);
        self.render(&document.tokens, env)
    }

    pub(crate) fn highlighter(&self) -> Option<&dyn Highlighter> {
        self.highlighter.as_deref()
    }

    pub(crate) fn fence_renderer(&self) -> &dyn FenceRenderer {
        self.fence_renderer.as_ref()
    }

    fn tokenize(&self, body: &str) -> Vec<Token> {
        let mut tokens: Vec<Token> = Vec::new();
        for (event, span) in Parser::new_ext(body, self.parser_options()).into_offset_iter() {
            // The parser may split a run of text; roles need it whole.
            if let Event::Text(text) = &event
                && let Some(Token {
                    event: Event::Text(previous),
                    span: previous_span,
                }) = tokens.last_mut()
            {
                *previous = CowStr::from(format!("{previous}{text}"));
                previous_span.end = span.end;
                continue;
            }
            tokens.push(Token {
                event: event.into_static(),
                span,
            });
        }
        apply_roles(body, tokens)
    }
}

impl Default for MarkupEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Separate a leading YAML metadata block from the body.
///
/// Detection uses the parser's own metadata block grammar first. That grammar
/// rejects empty blocks and blocks opening with a blank line, so a `---` first
/// line closed by a later `---` or `...` line is also accepted. An unclosed
/// `---` stays in the body as a thematic break.
fn split_front_matter(text: &str) -> (String, &str) {
    let mut events =
        Parser::new_ext(text, Options::ENABLE_YAML_STYLE_METADATA_BLOCKS).into_offset_iter();

    let Some((Event::Start(Tag::MetadataBlock(MetadataBlockKind::YamlStyle)), _)) =
        events.next()
    else {
        return split_delimited(text).unwrap_or((String::new(), text));
    };

    let mut yaml = String::new();
    for (event, span) in events {
        match event {
            Event::Text(content) => yaml.push_str(&content),
            Event::End(TagEnd::MetadataBlock(_)) => {
                let rest = text.get(span.end..).unwrap_or("");
                return (yaml, rest.trim_start_matches(['\r', '\n']));
            }
            _ => {}
        }
    }
    (yaml, "")
}

/// Split a block delimited by a `---` first line and a closing `---` or `...`
/// line, whatever its content.
fn split_delimited(text: &str) -> Option<(String, &str)> {
    let mut lines = text.split_inclusive('\n');
    let opener = lines.next()?;
    if opener.trim_end() != "---" {
        return None;
    }

    let mut offset = opener.len();
    for line in lines {
        let end = offset + line.len();
        if matches!(line.trim_end(), "---" | "...") {
            let yaml = text[opener.len()..offset].to_owned();
            return Some((yaml, text[end..].trim_start_matches(['\r', '\n'])));
        }
        offset = end;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn env() -> RenderEnv {
        RenderEnv::default()
    }

    // ── front matter ──

    #[test]
    fn test_split_front_matter() {
        let (yaml, body) = split_front_matter("---\ntitle: Hello\ntags: [a]\n---\n# Body\n");
        assert_eq!(yaml, "title: Hello\ntags: [a]\n");
        assert_eq!(body, "# Body\n");
    }

    #[test]
    fn test_no_front_matter() {
        let (yaml, body) = split_front_matter("# Title\n\ntext");
        assert_eq!(yaml, "");
        assert_eq!(body, "# Title\n\ntext");
    }

    #[test]
    fn test_thematic_break_start_is_body() {
        let text = "---\n\nStarts";
        let (yaml, body) = split_front_matter(text);
        assert_eq!(yaml, "");
        assert_eq!(body, text);
    }

    #[test]
    fn test_empty_front_matter() {
        let (yaml, body) = split_front_matter("---\n---\nBody");
        assert_eq!(yaml, "");
        assert_eq!(body, "Body");

        let (yaml, body) = split_front_matter("---\n...\n");
        assert_eq!(yaml, "");
        assert_eq!(body, "");
    }

    #[test]
    fn test_front_matter_opening_with_blank_line() {
        let (yaml, body) = split_front_matter("---\n\ntitle: x\n---\nBody");
        assert_eq!(yaml, "\ntitle: x\n");
        assert_eq!(body, "Body");
    }

    #[test]
    fn test_empty_front_matter_not_rendered() {
        let engine = MarkupEngine::new();
        let document = engine.parse("---\n---\nBody", &env());
        assert_eq!(engine.render(&document.tokens, &env()), "<p>Body</p>\n");
    }

    #[test]
    fn test_unclosed_front_matter_is_body() {
        let (yaml, _) = split_front_matter("---\ntitle: x\n\nno closing delimiter");
        assert_eq!(yaml, "");
    }

    #[test]
    fn test_front_matter_only() {
        let engine = MarkupEngine::new();
        let document = engine.parse("---\ntitle: Meta only\n---", &env());
        assert!(document.has_frontmatter());
        assert_eq!(document.frontmatter, "title: Meta only\n");
        assert!(document.tokens.is_empty());
        assert_eq!(engine.render(&document.tokens, &env()), "");
    }

    #[test]
    fn test_later_delimiters_stay_in_body() {
        let engine = MarkupEngine::new();
        let html = engine.render_markdown("Para\n\n---\n\nMore", &env());
        assert_eq!(html, "<p>Para</p>\n<hr />\n<p>More</p>\n");
    }

    #[test]
    fn test_render_markdown_drops_front_matter() {
        let engine = MarkupEngine::new();
        let html = engine.render_markdown("---\nk: v\n---\ntext", &env());
        assert_eq!(html, "<p>text</p>\n");
    }

    // ── tokens ──

    #[test]
    fn test_leading_heading() {
        let engine = MarkupEngine::new();
        let document = engine.parse("# Title *with* `code`\nTrailing text", &env());
        assert_eq!(document.leading_heading(), Some("Title *with* `code`"));
    }

    #[test]
    fn test_leading_heading_setext() {
        let engine = MarkupEngine::new();
        let document = engine.parse("Title\n=====\n\nText", &env());
        assert_eq!(document.leading_heading(), Some("Title"));
    }

    #[test]
    fn test_leading_heading_not_first() {
        let engine = MarkupEngine::new();
        let document = engine.parse("Intro\n\n# Title", &env());
        assert_eq!(document.leading_heading(), None);
    }

    #[test]
    fn test_leading_heading_empty() {
        let engine = MarkupEngine::new();
        let document = engine.parse("#\n\nText", &env());
        assert_eq!(document.leading_heading(), Some(""));
    }

    #[test]
    fn test_leading_heading_after_front_matter() {
        let engine = MarkupEngine::new();
        let document = engine.parse("---\nk: v\n---\n\n## Sub title\n", &env());
        assert_eq!(document.leading_heading(), Some("Sub title"));
    }

    #[test]
    fn test_text_runs_merged() {
        let engine = MarkupEngine::new();
        let document = engine.parse("a_b [c", &env());
        let texts: Vec<&Event<'static>> = document
            .tokens
            .iter()
            .map(|t| &t.event)
            .filter(|e| matches!(e, Event::Text(_)))
            .collect();
        assert_eq!(texts, vec![&Event::Text("a_b [c".into())]);
    }

    #[test]
    fn test_roles() {
        let engine = MarkupEngine::new();
        assert_eq!(
            engine.render_markdown("see {ref}`x`", &env()),
            "<p>see <code class=\"myst role\">{ref}[x]</code></p>\n"
        );
        assert_eq!(
            engine.render_markdown("see \\{ref\\}`x`", &env()),
            "<p>see {ref}<code>x</code></p>\n"
        );
    }

    #[test]
    fn test_parse_is_deterministic() {
        let engine = MarkupEngine::new();
        let text = "---\na: 1\n---\n# T\n\n- x\n- y\n";
        let first = engine.render_markdown(text, &env());
        let second = engine.render_markdown(text, &env());
        assert_eq!(first, second);
    }

    // ── options ──

    #[test]
    fn test_parser_options() {
        let base = MarkupEngine::new().parser_options();
        assert!(base.contains(Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH));
        assert!(!base.contains(Options::ENABLE_TASKLISTS));
        assert!(!base.contains(Options::ENABLE_DEFINITION_LIST));
        assert!(!base.contains(Options::ENABLE_YAML_STYLE_METADATA_BLOCKS));

        let extended = MarkupEngine::new()
            .with_extensions(Extensions {
                tasklist: Some(TaskListOptions::default()),
                deflist: true,
            })
            .parser_options();
        assert!(extended.contains(Options::ENABLE_TASKLISTS | Options::ENABLE_DEFINITION_LIST));
    }
}
