//! Text canonicalization shared by query atoms and entry facts.
//!
//! Both sides of a substring match go through the same function, so the
//! same visual text always compares equal:
//!
//! 1. **Unicode NFC normalization** - "café" (decomposed) → "café" (composed)
//! 2. **Lower-casing** - full Unicode case folding via `str::to_lowercase`
//!
//! Whitespace is left alone; quoted atoms rely on internal spaces surviving.

use unicode_normalization::UnicodeNormalization;
use unicode_normalization::{IsNormalized, is_nfc_quick};

/// Canonical form used for case-insensitive matching.
pub fn canonicalize_for_search(text: &str) -> String {
    if is_nfc_quick(text.chars()) == IsNormalized::Yes {
        return text.to_lowercase();
    }
    text.nfc().collect::<String>().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unicode_nfc_normalization() {
        let composed = "Caf\u{00E9}";
        let decomposed = "Cafe\u{0301}";
        assert_ne!(composed, decomposed);
        assert_eq!(
            canonicalize_for_search(composed),
            canonicalize_for_search(decomposed)
        );
    }

    #[test]
    fn test_lowercases_and_keeps_spaces() {
        assert_eq!(canonicalize_for_search("Diamond  STICK"), "diamond  stick");
    }
}
