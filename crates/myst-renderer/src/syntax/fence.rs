//! Code fence tracking for line-based block syntax.

/// Tracks whether a line scan is inside a backtick or tilde code fence.
///
/// The closing fence must use the same character and be at least as long
/// as the opening fence.
#[derive(Debug, Default)]
pub(crate) struct FenceTracker {
    /// Character used for the current fence.
    fence_char: Option<char>,
    /// Length of the opening fence (minimum length for closing).
    fence_len: usize,
}

impl FenceTracker {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn in_fence(&self) -> bool {
        self.fence_char.is_some()
    }

    /// Update fence state for a line.
    ///
    /// Returns `true` if the line opens or closes a fence.
    pub(crate) fn update(&mut self, line: &str) -> bool {
        let trimmed = line.trim_start();

        if let Some(fence_char) = self.fence_char {
            if is_closing_fence(trimmed, fence_char, self.fence_len) {
                self.fence_char = None;
                self.fence_len = 0;
                return true;
            }
            false
        } else if let Some((ch, len)) = detect_fence(trimmed) {
            self.fence_char = Some(ch);
            self.fence_len = len;
            true
        } else {
            false
        }
    }
}

/// Detect a fence opener, returning its character and length.
fn detect_fence(trimmed: &str) -> Option<(char, usize)> {
    let first = trimmed.chars().next()?;
    if first != '`' && first != '~' {
        return None;
    }

    let count = trimmed.chars().take_while(|&c| c == first).count();
    // Backtick fence info strings may not contain backticks.
    if count < 3 || (first == '`' && trimmed[count..].contains('`')) {
        return None;
    }
    Some((first, count))
}

/// Whether a line closes a fence opened with `expected` repeated `min_len` times.
fn is_closing_fence(trimmed: &str, expected: char, min_len: usize) -> bool {
    let count = trimmed.chars().take_while(|&c| c == expected).count();
    count >= min_len && trimmed[count..].chars().all(char::is_whitespace)
}
