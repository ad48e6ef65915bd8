//! Colon fences (`:::name` … `:::`).
//!
//! The content is not parsed as Markdown. It is escaped and emitted as a code
//! block tagged with the fence name, matching how MyST renders unknown
//! directives.

use super::{BlockMatch, BlockSyntax, strip_indent};
use crate::state::escape_html;

/// Colon fence rule.
#[derive(Clone, Copy, Debug, Default)]
pub struct ColonFence;

impl BlockSyntax for ColonFence {
    fn parse(&self, lines: &[&str]) -> Option<BlockMatch> {
        let (indent, opener) = strip_indent(lines.first()?)?;
        let marker_len = opener.chars().take_while(|&c| c == ':').count();
        if marker_len < 3 {
            return None;
        }
        let info = opener[marker_len..].trim();

        let mut content = String::new();
        let mut consumed = 1;
        let mut closed = false;
        for line in &lines[1..] {
            consumed += 1;
            if is_closing(line, marker_len) {
                closed = true;
                break;
            }
            content.push_str(strip_columns(line, indent));
            content.push('\n');
        }
        if !closed {
            tracing::debug!(info, "Colon fence runs to end of document");
        }

        let name = info.split_whitespace().next().unwrap_or("");
        let html = if name.is_empty() {
            format!("<pre><code>{}</code></pre>", escape_html(&content))
        } else {
            format!(
                "<pre><code class=\"block-{}\">{}</code></pre>",
                escape_html(name),
                escape_html(&content)
            )
        };

        Some(BlockMatch { html, consumed })
    }
}

/// Whether `line` closes a fence opened with `min_len` colons.
fn is_closing(line: &str, min_len: usize) -> bool {
    let Some((_, trimmed)) = strip_indent(line) else {
        return false;
    };
    let count = trimmed.chars().take_while(|&c| c == ':').count();
    count >= min_len && trimmed[count..].trim().is_empty()
}

/// Remove up to `columns` leading spaces.
fn strip_columns(line: &str, columns: usize) -> &str {
    let spaces = line.len() - line.trim_start_matches(' ').len();
    &line[spaces.min(columns)..]
}
