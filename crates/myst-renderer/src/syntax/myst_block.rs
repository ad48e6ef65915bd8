//! Single-line MyST blocks: block breaks, targets and line comments.

use super::{BlockMatch, BlockSyntax, strip_indent};
use crate::state::escape_html;

/// Block break (`+++`, optionally followed by metadata text).
#[derive(Clone, Copy, Debug, Default)]
pub struct BlockBreak;

impl BlockSyntax for BlockBreak {
    fn parse(&self, lines: &[&str]) -> Option<BlockMatch> {
        let (_, line) = strip_indent(lines.first()?)?;
        line.starts_with("+++").then(|| BlockMatch {
            html: "<hr class=\"myst-block\">".to_owned(),
            consumed: 1,
        })
    }
}

/// Reference target (`(label)=`).
#[derive(Clone, Copy, Debug, Default)]
pub struct Target;

impl BlockSyntax for Target {
    fn parse(&self, lines: &[&str]) -> Option<BlockMatch> {
        let (_, line) = strip_indent(lines.first()?)?;
        let label = line
            .trim_end()
            .strip_prefix('(')?
            .strip_suffix(")=")?;
        let valid = !label.is_empty()
            && !label
                .chars()
                .any(|c| c.is_whitespace() || matches!(c, '(' | ')' | '[' | ']'));
        if !valid {
            return None;
        }

        let label = escape_html(label);
        Some(BlockMatch {
            html: format!(
                "<div class=\"myst-target\"><a href=\"#{label}\">({label})=</a></div>"
            ),
            consumed: 1,
        })
    }
}

/// Line comment (`% text`). Consecutive comment lines form one comment.
#[derive(Clone, Copy, Debug, Default)]
pub struct LineComment;

impl BlockSyntax for LineComment {
    fn parse(&self, lines: &[&str]) -> Option<BlockMatch> {
        let first = comment_text(lines.first()?)?;
        let mut parts = vec![first];
        parts.extend(lines[1..].iter().map_while(|&line| comment_text(line)));

        Some(BlockMatch {
            html: format!("<!-- {} -->", escape_html(&parts.join("\n"))),
            consumed: parts.len(),
        })
    }
}

/// Text of a comment line, without the `%` marker.
fn comment_text(line: &str) -> Option<&str> {
    let (_, line) = strip_indent(line)?;
    line.strip_prefix('%').map(str::trim)
}
