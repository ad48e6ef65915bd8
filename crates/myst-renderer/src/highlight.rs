//! Syntax highlighting with syntect.
//!
//! Produces classed `<span>` markup only. The surrounding `<pre><code>` comes
//! from the engine's fence rendering, so the highlighter never adds its own
//! wrapper elements.

use std::collections::HashMap;
use std::fmt::Write;

use syntect::html::{ClassStyle, line_tokens_to_classed_spans};
use syntect::parsing::{ParseState, ParsingError, ScopeStack, SyntaxReference, SyntaxSet};
use syntect::util::LinesWithEndings;

use crate::code_block::Highlighter;

/// Formatter options for [`SyntectHighlighter`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HighlightOptions {
    /// Prefix each line with `<span class="linenos">N</span>`.
    pub line_numbers: bool,
    /// Number of the first line.
    pub line_number_start: usize,
    /// Prefix added to every token class, empty for none.
    pub class_prefix: String,
}

impl Default for HighlightOptions {
    fn default() -> Self {
        Self {
            line_numbers: false,
            line_number_start: 1,
            class_prefix: String::new(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
enum HighlightError {
    #[error("parse error: {0}")]
    Parse(#[from] ParsingError),
    #[error("markup error: {0}")]
    Markup(#[from] syntect::Error),
}

/// Syntect-backed [`Highlighter`].
///
/// A disabled highlighter always declines, leaving fences to the engine's
/// default rendering.
pub struct SyntectHighlighter {
    syntaxes: Option<SyntaxSet>,
    options: HighlightOptions,
    class_style: ClassStyle,
}

impl SyntectHighlighter {
    /// Create an enabled highlighter with the bundled syntax definitions.
    pub fn new(options: HighlightOptions) -> Self {
        let class_style = if options.class_prefix.is_empty() {
            ClassStyle::Spaced
        } else {
            // syntect takes a 'static prefix; it lives as long as the engine.
            ClassStyle::SpacedPrefixed {
                prefix: Box::leak(options.class_prefix.clone().into_boxed_str()),
            }
        };
        Self {
            syntaxes: Some(SyntaxSet::load_defaults_newlines()),
            options,
            class_style,
        }
    }

    /// Create a highlighter that never highlights.
    pub fn disabled() -> Self {
        Self {
            syntaxes: None,
            options: HighlightOptions::default(),
            class_style: ClassStyle::Spaced,
        }
    }

    /// Create from optional options, disabled when `None`.
    pub fn from_options(options: Option<HighlightOptions>) -> Self {
        options.map_or_else(Self::disabled, Self::new)
    }

    pub fn is_enabled(&self) -> bool {
        self.syntaxes.is_some()
    }

    /// Resolve a syntax by language token, falling back to plain text.
    fn find_syntax<'s>(syntaxes: &'s SyntaxSet, language: &str) -> &'s SyntaxReference {
        if language.is_empty() {
            return syntaxes.find_syntax_plain_text();
        }
        syntaxes
            .find_syntax_by_token(language)
            .unwrap_or_else(|| syntaxes.find_syntax_plain_text())
    }

    fn render(
        &self,
        syntaxes: &SyntaxSet,
        source: &str,
        language: &str,
    ) -> Result<String, HighlightError> {
        let syntax = Self::find_syntax(syntaxes, language);
        let mut state = ParseState::new(syntax);
        let mut stack = ScopeStack::new();
        let mut open_spans: isize = 0;
        let mut output = String::with_capacity(source.len() * 2);

        let width = self.line_number_width(source);
        for (offset, line) in LinesWithEndings::from(source).enumerate() {
            if self.options.line_numbers {
                let number = self.options.line_number_start + offset;
                write!(output, "<span class=\"linenos\">{number:>width$}</span>").unwrap();
            }
            let ops = state.parse_line(line, syntaxes)?;
            let (html, delta) =
                line_tokens_to_classed_spans(line, &ops, self.class_style, &mut stack)?;
            output.push_str(&html);
            open_spans += delta;
        }

        for _ in 0..open_spans.max(0) {
            output.push_str("</span>");
        }
        Ok(output)
    }

    /// Width of the widest line number, for right alignment.
    fn line_number_width(&self, source: &str) -> usize {
        let lines = LinesWithEndings::from(source).count().max(1);
        (self.options.line_number_start + lines - 1)
            .to_string()
            .len()
    }
}

impl Highlighter for SyntectHighlighter {
    fn highlight(
        &self,
        source: &str,
        language: &str,
        _attrs: &HashMap<String, String>,
    ) -> Option<String> {
        let syntaxes = self.syntaxes.as_ref()?;
        match self.render(syntaxes, source, language) {
            Ok(html) => Some(html),
            Err(e) => {
                tracing::warn!(language, error = %e, "Highlighting failed, using plain rendering");
                None
            }
        }
    }
}
