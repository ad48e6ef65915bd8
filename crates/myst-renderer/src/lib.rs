//! MyST Markdown engine.
//!
//! This crate provides [`MarkupEngine`], a configured Markdown processor that
//! splits a leading YAML front-matter block from the body, tokenizes the body
//! with `pulldown-cmark` and renders the tokens to HTML.
//!
//! # Architecture
//!
//! Parsing and rendering are separate steps so callers can inspect the token
//! stream (for example to derive a title) before producing HTML:
//! - [`MarkupEngine::parse`] returns a [`Document`] holding the raw front
//!   matter and the body tokens
//! - [`MarkupEngine::render`] turns tokens into HTML
//!
//! MyST block syntax (colon fences, block breaks, targets, line comments) is
//! handled by [`BlockSyntax`] rules applied line by line before tokenizing.
//! Inline roles are rewritten on the token stream.
//!
//! Fenced code goes through two injected strategies: a [`Highlighter`] that may
//! return highlighted markup for the code, and a [`FenceRenderer`] that may wrap
//! the finished fence HTML.
//!
//! # Example
//!
//! ```
//! use myst_renderer::{MarkupEngine, RenderEnv};
//!
//! let engine = MarkupEngine::new();
//! let env = RenderEnv::default();
//! let document = engine.parse("---\ntitle: Hello\n---\n# Hello\n\n**Bold** text", &env);
//!
//! assert_eq!(document.frontmatter, "title: Hello\n");
//! assert_eq!(
//!     engine.render(&document.tokens, &env),
//!     "<h1>Hello</h1>\n<p><strong>Bold</strong> text</p>\n"
//! );
//! ```

mod code_block;
mod engine;
mod highlight;
mod html;
mod link;
mod state;
pub mod syntax;

pub use code_block::{FenceBlock, FenceRenderer, HighlightContainer, Highlighter};
pub use engine::{Document, Extensions, MarkupEngine, RenderEnv, TaskListOptions, Token};
pub use highlight::{HighlightOptions, SyntectHighlighter};
pub use link::normalize_link;
pub use state::escape_html;
pub use syntax::{BlockMatch, BlockSyntax};
