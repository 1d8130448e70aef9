//! Label and free-text canonicalization.
//!
//! Every label comparison in the engine goes through [`normalize`], so that
//! "Café", "cafe" and "  CAFÉ " all compare equal.

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Canonicalize a label or a piece of free text.
///
/// Accents are decomposed and their combining marks dropped, non-breaking
/// spaces become regular spaces, everything is lower-cased and every run of
/// characters outside `[a-z0-9]` collapses to a single space. Leading and
/// trailing whitespace is removed. Total: empty input yields an empty string.
pub fn normalize(text: &str) -> String {
    let lowered: String = text
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .map(|c| if c == '\u{00A0}' { ' ' } else { c })
        .collect::<String>()
        .to_lowercase();

    let mut out = String::with_capacity(lowered.len());
    let mut pending_space = false;

    for c in lowered.chars() {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            if pending_space && !out.is_empty() {
                out.push(' ');
            }
            pending_space = false;
            out.push(c);
        } else {
            pending_space = true;
        }
    }

    out
}

/// Whether `needle` (already normalized) occurs as a whole word run inside
/// `haystack` (already normalized).
pub fn contains_word_run(haystack: &str, needle: &str) -> bool {
    if needle.is_empty() || haystack.is_empty() {
        return false;
    }
    let padded = format!(" {} ", haystack);
    padded.contains(&format!(" {} ", needle))
}

/// Byte offset of the first whole word run match, if any.
pub fn find_word_run(haystack: &str, needle: &str) -> Option<usize> {
    if needle.is_empty() || haystack.is_empty() {
        return None;
    }
    let padded = format!(" {} ", haystack);
    padded.find(&format!(" {} ", needle))
}
