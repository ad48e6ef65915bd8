//! MyST block and inline syntax.
//!
//! Block syntax is applied before tokenizing: the body is scanned line by
//! line and every [`BlockSyntax`] rule gets a chance to claim the lines at the
//! current position. A claimed block is replaced by an HTML block, which the
//! Markdown parser then passes through untouched. Lines inside backtick or
//! tilde code fences are never offered to the rules.
//!
//! The base rules are:
//!
//! | Syntax | Output |
//! |--------|--------|
//! | `:::name` … `:::` | `<pre><code class="block-name">…</code></pre>` |
//! | `+++` | `<hr class="myst-block">` |
//! | `(label)=` | `<div class="myst-target"><a href="#label">(label)=</a></div>` |
//! | `% text` | `<!-- text -->` |
//!
//! Inline roles (`` {name}`content` ``) are handled on the token stream; see
//! [`apply_roles`].

use std::sync::LazyLock;

use regex::Regex;

mod colon_fence;
mod fence;
mod myst_block;
mod role;

pub use colon_fence::ColonFence;
pub(crate) use fence::FenceTracker;
pub use myst_block::{BlockBreak, LineComment, Target};
pub(crate) use role::apply_roles;

/// A block claimed by a [`BlockSyntax`] rule.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockMatch {
    /// Replacement HTML, without trailing newline.
    pub html: String,
    /// Number of source lines consumed (at least 1).
    pub consumed: usize,
}

/// A line-based block syntax rule.
pub trait BlockSyntax: Send + Sync {
    /// Try to claim a block starting at `lines[0]`.
    ///
    /// `lines` runs to the end of the document, without line terminators.
    fn parse(&self, lines: &[&str]) -> Option<BlockMatch>;
}

/// The fixed base rule set, in matching order.
pub(crate) fn base_syntaxes() -> Vec<Box<dyn BlockSyntax>> {
    vec![
        Box::new(ColonFence),
        Box::new(BlockBreak),
        Box::new(Target),
        Box::new(LineComment),
    ]
}

/// Replace blocks claimed by `rules` with HTML blocks.
pub(crate) fn preprocess(input: &str, rules: &[Box<dyn BlockSyntax>]) -> String {
    let lines: Vec<&str> = input.lines().collect();
    let mut output = String::with_capacity(input.len());
    let mut fence = FenceTracker::new();
    let mut i = 0;

    while i < lines.len() {
        let line = lines[i];

        let in_code = fence.in_fence();
        if fence.update(line) || in_code {
            output.push_str(line);
            output.push('\n');
            i += 1;
            continue;
        }

        if let Some(block) = rules.iter().find_map(|rule| rule.parse(&lines[i..])) {
            let consumed = block.consumed.max(1);
            let indent = indent_width(line);
            if indent > 0 && in_list_item(&lines[..i], indent) {
                push_nested_block(&mut output, &block.html, indent, lines.get(i + consumed));
            } else {
                output.push_str(&block.html);
                // A blank line ends the HTML block so following text is parsed again.
                output.push_str("\n\n");
            }
            i += consumed;
            continue;
        }

        output.push_str(line);
        output.push('\n');
        i += 1;
    }

    output
}

/// Write an HTML block at `indent` columns so it stays inside its list item.
///
/// Comments and `<pre>` blocks end on their own closing line. Other blocks
/// need a blank line, which is only written when the item continues after
/// them; otherwise the item's end closes the block.
fn push_nested_block(output: &mut String, html: &str, indent: usize, next: Option<&&str>) {
    let padding = " ".repeat(indent);
    for line in html.lines() {
        if !line.is_empty() {
            output.push_str(&padding);
        }
        output.push_str(line);
        output.push('\n');
    }

    let self_closing = html.starts_with("<!--") || html.starts_with("<pre");
    let item_continues = next.is_some_and(|next| {
        !next.trim().is_empty() && indent_width(next) >= indent
    });
    if !self_closing && item_continues {
        output.push('\n');
    }
}

/// Whether the nearest less-indented line before a block at `indent` columns
/// opens a list item.
fn in_list_item(before: &[&str], indent: usize) -> bool {
    before
        .iter()
        .rev()
        .filter(|line| !line.trim().is_empty())
        .find(|line| indent_width(line) < indent)
        .is_some_and(|line| LIST_ITEM.is_match(line))
}

static LIST_ITEM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^ {0,3}(?:[-+*]|[0-9]{1,9}[.)])(?: |$)").unwrap());

fn indent_width(line: &str) -> usize {
    line.len() - line.trim_start_matches(' ').len()
}

/// Split off up to three columns of indentation.
///
/// Returns `None` for lines indented four or more columns (indented code).
pub(crate) fn strip_indent(line: &str) -> Option<(usize, &str)> {
    let indent = indent_width(line);
    if indent > 3 {
        None
    } else {
        Some((indent, &line[indent..]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn run(input: &str) -> String {
        preprocess(input, &base_syntaxes())
    }

    #[test]
    fn test_plain_markdown_unchanged() {
        assert_eq!(run("# Title\n\nText\n"), "# Title\n\nText\n");
    }

    #[test]
    fn test_rules_replace_lines() {
        assert_eq!(
            run("Intro\n+++\nNext\n"),
            "Intro\n<hr class=\"myst-block\">\n\nNext\n"
        );
    }

    #[test]
    fn test_code_fence_shields_rules() {
        let input = "```\n+++\n% not a comment\n:::note\n```\n";
        assert_eq!(run(input), input);
    }

    #[test]
    fn test_rules_apply_after_code_fence_closes() {
        assert_eq!(
            run("~~~\ncode\n~~~\n% done\n"),
            "~~~\ncode\n~~~\n<!-- done -->\n\n"
        );
    }

    #[test]
    fn test_multi_line_rule_consumes_lines() {
        assert_eq!(
            run(":::note\nbody\n:::\nafter\n"),
            "<pre><code class=\"block-note\">body\n</code></pre>\n\nafter\n"
        );
    }

    #[test]
    fn test_indented_top_level_block_not_nested() {
        assert_eq!(run("Intro\n\n  % note\nNext\n"), "Intro\n\n<!-- note -->\n\nNext\n");
    }

    #[test]
    fn test_block_in_list_item_keeps_indent() {
        assert_eq!(
            run("- item\n  % note\n- two\n"),
            "- item\n  <!-- note -->\n- two\n"
        );
        assert_eq!(
            run("1. item\n   +++\n   more\n"),
            "1. item\n   <hr class=\"myst-block\">\n\n   more\n"
        );
        assert_eq!(run("- item\n  +++\n- two\n"), "- item\n  <hr class=\"myst-block\">\n- two\n");
    }

    #[test]
    fn test_in_list_item() {
        assert!(in_list_item(&["- item"], 2));
        assert!(in_list_item(&["* item", "", "  text"], 2));
        assert!(in_list_item(&["10) item"], 4));
        assert!(!in_list_item(&["Para"], 2));
        assert!(!in_list_item(&[], 2));
        assert!(!in_list_item(&["-not a list"], 2));
    }

    #[test]
    fn test_custom_rule() {
        struct Shout;
        impl BlockSyntax for Shout {
            fn parse(&self, lines: &[&str]) -> Option<BlockMatch> {
                let text = lines.first()?.strip_prefix("!! ")?;
                Some(BlockMatch {
                    html: format!("<p class=\"shout\">{}</p>", text.to_uppercase()),
                    consumed: 1,
                })
            }
        }

        let rules: Vec<Box<dyn BlockSyntax>> = vec![Box::new(Shout)];
        assert_eq!(
            preprocess("!! hey\nquiet\n", &rules),
            "<p class=\"shout\">HEY</p>\n\nquiet\n"
        );
    }

    #[test]
    fn test_strip_indent() {
        assert_eq!(strip_indent("   +++"), Some((3, "+++")));
        assert_eq!(strip_indent("+++"), Some((0, "+++")));
        assert_eq!(strip_indent("    +++"), None);
    }
}
