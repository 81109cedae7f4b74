//! Accent-insensitive text folding used for product search

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Fold text for search: lowercase, decompose (NFD) and drop combining marks.
///
/// `fold("Sublimação")` is `"sublimacao"`. The function is deterministic and
/// idempotent, so `fold(fold(s)) == fold(s)`.
pub fn fold(text: &str) -> String {
    text.to_lowercase()
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect()
}
