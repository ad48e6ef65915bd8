//! Fenced code block rendering strategies.
//!
//! A fence is rendered in three steps:
//! 1. the [`Highlighter`] may turn the code into highlighted markup
//! 2. the result (or the escaped code) is placed in `<pre><code>`
//! 3. the [`FenceRenderer`] may wrap the finished HTML
//!
//! Both strategies are injected into [`MarkupEngine`](crate::MarkupEngine).
//! Plain closures implement both traits.
//!
//! # Example
//!
//! ```
//! use std::collections::HashMap;
//! use myst_renderer::{MarkupEngine, RenderEnv};
//!
//! let engine = MarkupEngine::new().with_highlighter(
//!     |source: &str, language: &str, _attrs: &HashMap<String, String>| {
//!         (language == "shout").then(|| source.to_uppercase())
//!     },
//! );
//! let html = engine.render_markdown("```shout\nhi\n```", &RenderEnv::default());
//! assert_eq!(html, "<pre><code class=\"language-shout\">HI\n</code></pre>\n");
//! ```

use std::collections::HashMap;

use crate::engine::RenderEnv;
use crate::state::escape_html;

/// Code highlighting strategy.
pub trait Highlighter: Send + Sync {
    /// Highlight `source` written in `language`.
    ///
    /// Returns `None` to let the engine escape the code itself. Markup that
    /// starts with `<pre` is used as the whole fence; anything else is placed
    /// inside `<pre><code>`.
    fn highlight(
        &self,
        source: &str,
        language: &str,
        attrs: &HashMap<String, String>,
    ) -> Option<String>;
}

impl<F> Highlighter for F
where
    F: Fn(&str, &str, &HashMap<String, String>) -> Option<String> + Send + Sync,
{
    fn highlight(
        &self,
        source: &str,
        language: &str,
        attrs: &HashMap<String, String>,
    ) -> Option<String> {
        self(source, language, attrs)
    }
}

/// A fenced code block as seen by a [`FenceRenderer`].
#[derive(Clone, Copy, Debug)]
pub struct FenceBlock<'a> {
    /// Full info string after the opening fence.
    pub info: &'a str,
    /// Language token (first word of the info string).
    pub language: &'a str,
    /// Raw code.
    pub source: &'a str,
}

/// Fence wrapping strategy.
pub trait FenceRenderer: Send + Sync {
    /// Return the final HTML for a fence, given the default `html`.
    fn render(&self, fence: &FenceBlock<'_>, html: String, env: &RenderEnv) -> String;
}

impl<F> FenceRenderer for F
where
    F: Fn(&FenceBlock<'_>, String, &RenderEnv) -> String + Send + Sync,
{
    fn render(&self, fence: &FenceBlock<'_>, html: String, env: &RenderEnv) -> String {
        self(fence, html, env)
    }
}

/// Default fence strategy: wrap in `<div class="highlight">` when the render
/// environment says highlighting is delegated.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HighlightContainer {
    css_class: String,
}

impl HighlightContainer {
    /// Wrap in a `<div>` with the given class instead of `highlight`.
    pub fn new(css_class: impl Into<String>) -> Self {
        Self {
            css_class: css_class.into(),
        }
    }
}

impl Default for HighlightContainer {
    fn default() -> Self {
        Self::new("highlight")
    }
}

impl FenceRenderer for HighlightContainer {
    fn render(&self, _fence: &FenceBlock<'_>, html: String, env: &RenderEnv) -> String {
        if env.highlight {
            format!(
                "<div class=\"{}\">{html}</div>\n",
                escape_html(&self.css_class)
            )
        } else {
            html
        }
    }
}

/// Render a fenced code block.
pub(crate) fn render_fence(
    info: &str,
    source: &str,
    highlighter: Option<&dyn Highlighter>,
    fence_renderer: &dyn FenceRenderer,
    env: &RenderEnv,
) -> String {
    let info = info.trim();
    let (language, attrs) = parse_fence_info(info);

    let highlighted = highlighter
        .and_then(|h| h.highlight(source, &language, &attrs))
        .unwrap_or_else(|| escape_html(source));

    let html = if highlighted.starts_with("<pre") {
        format!("{highlighted}\n")
    } else if language.is_empty() {
        format!("<pre><code>{highlighted}</code></pre>\n")
    } else {
        format!(
            "<pre><code class=\"language-{}\">{highlighted}</code></pre>\n",
            escape_html(&language)
        )
    };

    let fence = FenceBlock {
        info,
        language: &language,
        source,
    };
    fence_renderer.render(&fence, html, env)
}

/// Render an indented code block. Indented code is never highlighted.
pub(crate) fn render_indented(source: &str) -> String {
    format!("<pre><code>{}</code></pre>\n", escape_html(source))
}

/// Parse fence info string into language and attributes.
///
/// Format: `language [key=value ...]`
#[must_use]
pub(crate) fn parse_fence_info(info: &str) -> (String, HashMap<String, String>) {
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

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn plain_env() -> RenderEnv {
        RenderEnv::default()
    }

    fn highlight_env() -> RenderEnv {
        RenderEnv { highlight: true }
    }

    #[test]
    fn test_parse_fence_info_language_only() {
        let (lang, attrs) = parse_fence_info("python");
        assert_eq!(lang, "python");
        assert!(attrs.is_empty());
    }

    #[test]
    fn test_parse_fence_info_with_attrs() {
        let (lang, attrs) = parse_fence_info("python linenos=true title='main.py'");
        assert_eq!(lang, "python");
        assert_eq!(attrs.get("linenos"), Some(&"true".to_owned()));
        assert_eq!(attrs.get("title"), Some(&"main.py".to_owned()));
    }

    #[test]
    fn test_parse_fence_info_empty() {
        let (lang, attrs) = parse_fence_info("   ");
        assert_eq!(lang, "");
        assert!(attrs.is_empty());
    }

    #[test]
    fn test_render_fence_without_highlighter() {
        let html = render_fence(
            "python",
            "print('<hi>')\n",
            None,
            &HighlightContainer::default(),
            &plain_env(),
        );
        assert_eq!(
            html,
            "<pre><code class=\"language-python\">print('&lt;hi&gt;')\n</code></pre>\n"
        );
    }

    #[test]
    fn test_render_fence_without_language() {
        let html = render_fence("", "x = 1\n", None, &HighlightContainer::default(), &plain_env());
        assert_eq!(html, "<pre><code>x = 1\n</code></pre>\n");
    }

    #[test]
    fn test_render_fence_highlighter_declines() {
        let declines = |_: &str, _: &str, _: &HashMap<String, String>| -> Option<String> { None };
        let html = render_fence("rust", "a && b", Some(&declines), &HighlightContainer::default(), &plain_env());
        assert_eq!(html, "<pre><code class=\"language-rust\">a &amp;&amp; b</code></pre>\n");
    }

    #[test]
    fn test_render_fence_highlighter_receives_attrs() {
        let echo = |_: &str, language: &str, attrs: &HashMap<String, String>| {
            Some(format!("{language}:{}", attrs.get("hl").map_or("", String::as_str)))
        };
        let html = render_fence("js hl=2", "x", Some(&echo), &HighlightContainer::default(), &plain_env());
        assert_eq!(html, "<pre><code class=\"language-js\">js:2</code></pre>\n");
    }

    #[test]
    fn test_render_fence_full_pre_from_highlighter() {
        let full = |_: &str, _: &str, _: &HashMap<String, String>| {
            Some("<pre class=\"custom\">x</pre>".to_owned())
        };
        let html = render_fence("c", "x", Some(&full), &HighlightContainer::default(), &plain_env());
        assert_eq!(html, "<pre class=\"custom\">x</pre>\n");
    }

    #[test]
    fn test_highlight_container_wraps_when_enabled() {
        let html = render_fence("python", "x\n", None, &HighlightContainer::default(), &highlight_env());
        assert_eq!(
            html,
            "<div class=\"highlight\"><pre><code class=\"language-python\">x\n</code></pre>\n</div>\n"
        );
    }

    #[test]
    fn test_highlight_container_class() {
        let container = HighlightContainer::new("code");
        let html = render_fence("", "x\n", None, &container, &highlight_env());
        assert_eq!(html, "<div class=\"code\"><pre><code>x\n</code></pre>\n</div>\n");

        let html = render_fence("", "x\n", None, &container, &plain_env());
        assert_eq!(html, "<pre><code>x\n</code></pre>\n");
    }

    #[test]
    fn test_custom_fence_renderer() {
        let figure = |fence: &FenceBlock<'_>, html: String, _: &RenderEnv| {
            format!("<figure data-lang=\"{}\">{html}</figure>\n", fence.language)
        };
        let html = render_fence("sh", "ls\n", None, &figure, &plain_env());
        assert_eq!(
            html,
            "<figure data-lang=\"sh\"><pre><code class=\"language-sh\">ls\n</code></pre>\n</figure>\n"
        );
    }

    #[test]
    fn test_render_indented() {
        assert_eq!(render_indented("a < b\n"), "<pre><code>a &lt; b\n</code></pre>\n");
    }
}
