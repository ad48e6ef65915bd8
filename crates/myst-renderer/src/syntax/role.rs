//! Inline roles (`` {name}`content` ``).
//!
//! The Markdown parser sees a role as text ending in `{name}` immediately
//! followed by a code span. The pair is rewritten into a single inline HTML
//! token. The `{name}` must appear literally in the source, so escaped braces
//! (`\{ref\}`) never form a role.

use std::sync::LazyLock;

use pulldown_cmark::{CowStr, Event};
use regex::Regex;

use crate::engine::Token;
use crate::state::escape_html;

static ROLE_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{([A-Za-z0-9_\-+:]+)\}$").unwrap());

/// Rewrite role text/code pairs in a token stream parsed from `source`.
pub(crate) fn apply_roles(source: &str, tokens: Vec<Token>) -> Vec<Token> {
    let mut output = Vec::with_capacity(tokens.len());
    let mut iter = tokens.into_iter().peekable();

    while let Some(token) = iter.next() {
        if let Some(next) = iter.peek()
            && let Some((prefix, role)) = split_role(source, &token, next)
        {
            iter.next();
            output.extend(prefix);
            output.push(role);
            continue;
        }
        output.push(token);
    }

    output
}

/// Split a text token ending in `{name}` and the code token after it into the
/// remaining text (if any) and the role token.
fn split_role(source: &str, text: &Token, code: &Token) -> Option<(Option<Token>, Token)> {
    let (Event::Text(text_value), Event::Code(content)) = (&text.event, &code.event) else {
        return None;
    };
    if text.span.end != code.span.start {
        return None;
    }

    let captures = ROLE_NAME.captures(text_value)?;
    let whole = captures.get(0)?;
    let name = captures.get(1)?.as_str();

    let role_start = text.span.end.checked_sub(whole.len())?;
    if source.get(role_start..text.span.end) != Some(whole.as_str())
        || is_escaped(source, role_start)
    {
        return None;
    }
    let prefix = (whole.start() > 0).then(|| Token {
        event: Event::Text(CowStr::from(text_value[..whole.start()].to_owned())),
        span: text.span.start..role_start,
    });
    let role = Token {
        event: Event::InlineHtml(CowStr::from(format!(
            "<code class=\"myst role\">{{{}}}[{}]</code>",
            escape_html(name),
            escape_html(content)
        ))),
        span: role_start..code.span.end,
    };

    Some((prefix, role))
}

/// Whether the character at `index` follows an odd run of backslashes.
fn is_escaped(source: &str, index: usize) -> bool {
    let backslashes = source.as_bytes()[..index]
        .iter()
        .rev()
        .take_while(|&&b| b == b'\\')
        .count();
    backslashes % 2 == 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn token(event: Event<'static>, start: usize, end: usize) -> Token {
        Token {
            event,
            span: start..end,
        }
    }

    #[test]
    fn test_role_with_prefix() {
        // "See {ref}`target`"
        let tokens = vec![
            token(Event::Text("See {ref}".into()), 0, 9),
            token(Event::Code("target".into()), 9, 17),
        ];

        let result = apply_roles("See {ref}`target`", tokens);

        assert_eq!(
            result,
            vec![
                token(Event::Text("See ".into()), 0, 4),
                token(
                    Event::InlineHtml("<code class=\"myst role\">{ref}[target]</code>".into()),
                    4,
                    17
                ),
            ]
        );
    }

    #[test]
    fn test_role_alone() {
        let tokens = vec![
            token(Event::Text("{math}".into()), 0, 6),
            token(Event::Code("a < b".into()), 6, 13),
        ];

        let result = apply_roles("{math}`a < b`", tokens);

        assert_eq!(
            result,
            vec![token(
                Event::InlineHtml("<code class=\"myst role\">{math}[a &lt; b]</code>".into()),
                0,
                13
            )]
        );
    }

    #[test]
    fn test_space_before_code_is_not_role() {
        let tokens = vec![
            token(Event::Text("{ref} ".into()), 0, 6),
            token(Event::Code("x".into()), 6, 9),
        ];
        assert_eq!(apply_roles("{ref} `x`", tokens.clone()), tokens);
    }

    #[test]
    fn test_gap_between_tokens_is_not_role() {
        let tokens = vec![
            token(Event::Text("{ref}".into()), 0, 5),
            token(Event::Code("x".into()), 6, 9),
        ];
        assert_eq!(apply_roles("{ref} `x`", tokens.clone()), tokens);
    }

    #[test]
    fn test_invalid_role_name() {
        let tokens = vec![
            token(Event::Text("{two words}".into()), 0, 11),
            token(Event::Code("x".into()), 11, 14),
        ];
        assert_eq!(apply_roles("{two words}`x`", tokens.clone()), tokens);
    }

    #[test]
    fn test_escaped_braces_are_not_role() {
        // "see \{ref\}`x`" decodes to "see {ref}" before the code span.
        let source = "see \\{ref\\}`x`";
        let tokens = vec![
            token(Event::Text("see {ref}".into()), 0, 11),
            token(Event::Code("x".into()), 11, 14),
        ];
        assert_eq!(apply_roles(source, tokens.clone()), tokens);
    }

    #[test]
    fn test_escaped_opening_brace_is_not_role() {
        let source = "\\{ref}`x`";
        let tokens = vec![
            token(Event::Text("{ref}".into()), 0, 6),
            token(Event::Code("x".into()), 6, 9),
        ];
        assert_eq!(apply_roles(source, tokens.clone()), tokens);
    }

    #[test]
    fn test_escaped_backslash_before_role() {
        // "\\{ref}`x`": the backslash is escaped, the role is not.
        let source = "\\\\{ref}`x`";
        let tokens = vec![
            token(Event::Text("\\{ref}".into()), 0, 7),
            token(Event::Code("x".into()), 7, 10),
        ];

        let result = apply_roles(source, tokens);

        assert_eq!(
            result,
            vec![
                token(Event::Text("\\".into()), 0, 2),
                token(
                    Event::InlineHtml("<code class=\"myst role\">{ref}[x]</code>".into()),
                    2,
                    10
                ),
            ]
        );
    }
}
