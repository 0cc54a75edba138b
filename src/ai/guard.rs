//! Context Guard
//!
//! Caps the text handed to a single completion call. Length is counted in
//! characters, not bytes, so truncation never splits a code point.

use std::borrow::Cow;

use tracing::warn;

use crate::constants::guard::{DEFAULT_MAX_CHARS, TRUNCATION_MARKER};

/// Character cap applied before every completion call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextGuard {
    max_chars: usize,
}

impl Default for ContextGuard {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CHARS)
    }
}

impl ContextGuard {
    pub fn new(max_chars: usize) -> Self {
        Self { max_chars }
    }

    pub fn max_chars(&self) -> usize {
        self.max_chars
    }

    /// Whether `text` would be cut
    pub fn exceeds(&self, text: &str) -> bool {
        // Byte length is an upper bound on char count
        text.len() > self.max_chars && text.chars().nth(self.max_chars).is_some()
    }

    /// Return `text` unchanged, or its first `max_chars` characters plus the marker.
    ///
    /// Guarded output keeps the same first `max_chars` characters, so a second
    /// pass reproduces it exactly.
    pub fn apply<'a>(&self, text: &'a str) -> Cow<'a, str> {
        let Some((cut, _)) = text.char_indices().nth(self.max_chars) else {
            return Cow::Borrowed(text);
        };

        let kept = &text[..cut];
        let original_len = text.chars().count();
        warn!(
            "Input length ({} chars) exceeds safety limit of {}. Truncating.",
            original_len, self.max_chars
        );

        let mut out = String::with_capacity(cut + TRUNCATION_MARKER.len());
        out.push_str(kept);
        out.push_str(TRUNCATION_MARKER);
        Cow::Owned(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn marker_chars() -> usize {
        TRUNCATION_MARKER.chars().count()
    }

    #[test]
    fn test_below_threshold_unchanged() {
        let guard = ContextGuard::new(10);
        assert_eq!(guard.apply("short"), "short");
        assert!(matches!(guard.apply("short"), Cow::Borrowed(_)));
    }

    #[test]
    fn test_exactly_threshold_unchanged() {
        let guard = ContextGuard::new(5);
        assert_eq!(guard.apply("12345"), "12345");
        assert!(!guard.exceeds("12345"));
    }

    #[test]
    fn test_truncates_with_marker() {
        let guard = ContextGuard::new(4);
        let out = guard.apply("abcdefghij");
        assert_eq!(out, format!("abcd{}", TRUNCATION_MARKER));
        assert!(guard.exceeds("abcdefghij"));
    }

    #[test]
    fn test_counts_characters_not_bytes() {
        let guard = ContextGuard::new(3);
        let out = guard.apply("héllo wörld");
        assert!(out.starts_with("hél"));
        assert_eq!(out.chars().count(), 3 + marker_chars());

        // Multi-byte text under the char limit is not cut even if its byte length is larger
        let guard = ContextGuard::new(4);
        assert_eq!(guard.apply("日本語"), "日本語");
    }

    #[test]
    fn test_default_threshold() {
        assert_eq!(ContextGuard::default().max_chars(), 800_000);
    }

    #[test]
    fn test_reapply_is_noop() {
        let guard = ContextGuard::new(8);
        let once = guard.apply("0123456789abcdef").into_owned();
        let twice = guard.apply(&once).into_owned();
        assert_eq!(once, twice);
    }

    proptest! {
        #[test]
        fn prop_identity_at_or_below_threshold(text in ".{0,64}", extra in 0usize..16) {
            let len = text.chars().count();
            let guard = ContextGuard::new(len + extra);
            let out = guard.apply(&text);
            prop_assert_eq!(out.as_ref(), text.as_str());
        }

        #[test]
        fn prop_exact_length_above_threshold(text in ".{1,200}", max in 0usize..100) {
            let len = text.chars().count();
            prop_assume!(len > max);
            let out = ContextGuard::new(max).apply(&text);
            prop_assert_eq!(out.chars().count(), max + marker_chars());
            prop_assert!(out.ends_with(TRUNCATION_MARKER));
            let prefix: String = text.chars().take(max).collect();
            prop_assert!(out.starts_with(&prefix));
        }

        #[test]
        fn prop_idempotent(text in ".{0,200}", max in 0usize..100) {
            let guard = ContextGuard::new(max);
            let once = guard.apply(&text).into_owned();
            let twice = guard.apply(&once).into_owned();
            prop_assert_eq!(once, twice);
        }
    }
}
