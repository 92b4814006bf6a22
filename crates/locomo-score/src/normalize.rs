//! Answer normalization for bag-of-words comparison.

use crate::porter;

/// Dropped after punctuation stripping.
const STOP_WORDS: [&str; 4] = ["a", "an", "the", "and"];

/// Lowercase, turn commas and punctuation into spaces, drop stop words,
/// and rejoin with single spaces.
///
/// Punctuation is anything that is not alphanumeric, `_`, or whitespace,
/// so `"don't"` becomes `"don t"`.
pub fn normalize(text: &str) -> String {
    let cleaned: String = text
        .to_lowercase()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '_' || c.is_whitespace() {
                c
            } else {
                ' '
            }
        })
        .collect();

    cleaned
        .split_whitespace()
        .filter(|w| !STOP_WORDS.contains(w))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Normalize, split into words and Porter-stem each one.
pub fn tokenize_and_stem(text: &str) -> Vec<String> {
    normalize(text).split_whitespace().map(porter::stem).collect()
}
