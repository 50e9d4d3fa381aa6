//! Text Normalizer
//!
//! Shared by signature matching and ML feature extraction so both observe
//! the same text.
//!
//! Steps: form-style percent decoding (`+` -> space) repeated until the text
//! stops changing or `MAX_DECODE_ROUNDS` is reached, then whitespace
//! collapse, trim and lower-case.

use std::borrow::Cow;

use percent_encoding::percent_decode_str;

use crate::constants::MAX_DECODE_ROUNDS;

/// Normalize a piece of request text. Absent text maps to `""`.
pub fn normalize(text: Option<&str>) -> String {
    let Some(text) = text else {
        return String::new();
    };

    let decoded = decode_rounds(text, MAX_DECODE_ROUNDS);
    decoded.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
}

/// Shorthand for present text
pub fn normalize_str(text: &str) -> String {
    normalize(Some(text))
}

/// Decode repeatedly, stopping early once a round changes nothing.
/// Residual encoding beyond `max_rounds` layers is left in place.
fn decode_rounds(text: &str, max_rounds: usize) -> Cow<'_, str> {
    let mut current = Cow::Borrowed(text);
    for _ in 0..max_rounds {
        let next = unquote_plus(&current);
        if next == current.as_ref() {
            break;
        }
        current = Cow::Owned(next);
    }
    current
}

/// `application/x-www-form-urlencoded` decode of a single component.
/// Invalid escapes are kept verbatim; invalid UTF-8 becomes U+FFFD.
pub(crate) fn unquote_plus(text: &str) -> String {
    let spaced = text.replace('+', " ");
    percent_decode_str(&spaced).decode_utf8_lossy().into_owned()
}
