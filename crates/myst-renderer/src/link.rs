//! Link target normalization.
//!
//! Link and image targets are percent-encoded the way a browser-safe `href`
//! needs them. A leading `{name}` placeholder (such as `{filename}` or
//! `{attach}`) is decoded back afterwards, so a later link resolver still sees
//! the literal placeholder.

use std::sync::LazyLock;

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use regex::Regex;

/// Characters left as-is when encoding a link target.
///
/// Existing `%XX` escapes are kept, so `%` itself is excluded here and bare
/// percent signs are handled in [`escape_stray_percent`].
const LINK_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b';')
    .remove(b'/')
    .remove(b'?')
    .remove(b':')
    .remove(b'@')
    .remove(b'&')
    .remove(b'=')
    .remove(b'+')
    .remove(b'$')
    .remove(b',')
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')')
    .remove(b'#')
    .remove(b'%');

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^%7B(\w+)%7D").unwrap());

static BAD_PROTOCOL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(vbscript|javascript|file|data):").unwrap());

static GOOD_DATA: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^data:image/(gif|png|jpeg|webp);").unwrap());

/// Normalize a link or image target.
///
/// # Examples
///
/// ```
/// use myst_renderer::normalize_link;
///
/// assert_eq!(normalize_link("{filename}/article.md"), "{filename}/article.md");
/// assert_eq!(normalize_link("my page.md"), "my%20page.md");
/// ```
pub fn normalize_link(url: &str) -> String {
    let escaped = escape_stray_percent(url);
    let encoded = utf8_percent_encode(&escaped, LINK_ENCODE_SET).to_string();
    PLACEHOLDER.replace(&encoded, "{$1}").into_owned()
}

/// Whether a link target is safe to emit.
///
/// Script-capable schemes are rejected; `data:` is allowed only for common
/// raster image types.
pub(crate) fn is_safe_link(url: &str) -> bool {
    let url = url.trim();
    !BAD_PROTOCOL.is_match(url) || GOOD_DATA.is_match(url)
}

/// Encode `%` signs that don't start a valid `%XX` escape.
fn escape_stray_percent(url: &str) -> String {
    let bytes = url.as_bytes();
    let mut out = String::with_capacity(url.len());
    for (i, ch) in url.char_indices() {
        let valid_escape = ch == '%'
            && bytes.get(i + 1).is_some_and(u8::is_ascii_hexdigit)
            && bytes.get(i + 2).is_some_and(u8::is_ascii_hexdigit);
        if ch == '%' && !valid_escape {
            out.push_str("%25");
        } else {
            out.push(ch);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_placeholders_survive() {
        for url in [
            "{filename}/article.md",
            "{attach}/file.pdf",
            "{index}",
            "{author}/author",
            "{category}/category",
            "{tag}/tag",
            "{static}/image.png",
        ] {
            assert_eq!(normalize_link(url), url);
        }
    }

    #[test]
    fn test_placeholder_only_at_start() {
        assert_eq!(normalize_link("docs/{filename}"), "docs/%7Bfilename%7D");
    }

    #[test]
    fn test_placeholder_needs_word_characters() {
        assert_eq!(normalize_link("{not a tag}/x"), "%7Bnot%20a%20tag%7D/x");
    }

    #[test]
    fn test_spaces_and_unicode_encoded() {
        assert_eq!(normalize_link("a b/é.md"), "a%20b/%C3%A9.md");
    }

    #[test]
    fn test_reserved_characters_kept() {
        assert_eq!(
            normalize_link("https://example.com/p?q=1&r=2#frag"),
            "https://example.com/p?q=1&r=2#frag"
        );
    }

    #[test]
    fn test_existing_escapes_kept() {
        assert_eq!(normalize_link("a%20b"), "a%20b");
        assert_eq!(normalize_link("100%"), "100%25");
        assert_eq!(normalize_link("%zz"), "%25zz");
    }

    #[test]
    fn test_is_safe_link() {
        assert!(is_safe_link("https://example.com"));
        assert!(is_safe_link("{filename}/a.md"));
        assert!(is_safe_link("data:image/png;base64,AAAA"));
        assert!(!is_safe_link("javascript:alert(1)"));
        assert!(!is_safe_link(" JavaScript:alert(1)"));
        assert!(!is_safe_link("data:text/html;base64,AAAA"));
    }
}
