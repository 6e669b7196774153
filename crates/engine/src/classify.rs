// Classifier - turns committed text into a token payload
// Rules, first match wins: empty, operator, number, prefixed tag, bare tag.

use crate::token::{Operator, TokenData, DEFAULT_TAG_PREFIX};

/// Text classifier parameterised by the tag prefix character.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classifier {
    pub tag_prefix: char,
}

impl Default for Classifier {
    fn default() -> Self {
        Self { tag_prefix: DEFAULT_TAG_PREFIX }
    }
}

impl Classifier {
    pub fn new(tag_prefix: char) -> Self {
        Self { tag_prefix }
    }

    /// Classify `text`. `None` means there is nothing to commit.
    pub fn classify(&self, text: &str) -> Option<TokenData> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }

        if let Some(op) = Operator::from_text(text) {
            return Some(TokenData::operand(op));
        }

        if let Some(value) = parse_number(text) {
            return Some(TokenData::number(value));
        }

        if let Some(rest) = text.strip_prefix(self.tag_prefix) {
            let label = rest.trim();
            if !label.is_empty() {
                return Some(TokenData::tag(label));
            }
        }

        // Anything else is a variable reference
        Some(TokenData::tag(text))
    }

    /// Strip the tag prefix, if present, from already-trimmed text.
    pub fn strip_prefix<'a>(&self, text: &'a str) -> &'a str {
        text.strip_prefix(self.tag_prefix).unwrap_or(text)
    }
}

/// Classify with the default `@` prefix.
pub fn classify(text: &str) -> Option<TokenData> {
    Classifier::default().classify(text)
}

/// Parse text that is entirely a finite decimal number.
///
/// Accepts an optional sign, digits with an optional fraction (`.5` and `5.`
/// included) and an optional exponent. Rejects partial matches like `12a` as
/// well as the `inf`/`NaN` spellings `str::parse` would otherwise take.
pub fn parse_number(text: &str) -> Option<f64> {
    let bytes = text.as_bytes();
    let mut pos = 0;

    if matches!(bytes.first(), Some(b'+') | Some(b'-')) {
        pos += 1;
    }

    let int_start = pos;
    while pos < bytes.len() && bytes[pos].is_ascii_digit() {
        pos += 1;
    }
    let int_digits = pos - int_start;

    let mut frac_digits = 0;
    if pos < bytes.len() && bytes[pos] == b'.' {
        pos += 1;
        let frac_start = pos;
        while pos < bytes.len() && bytes[pos].is_ascii_digit() {
            pos += 1;
        }
        frac_digits = pos - frac_start;
    }

    if int_digits == 0 && frac_digits == 0 {
        return None;
    }

    if pos < bytes.len() && (bytes[pos] == b'e' || bytes[pos] == b'E') {
        pos += 1;
        if pos < bytes.len() && (bytes[pos] == b'+' || bytes[pos] == b'-') {
            pos += 1;
        }
        let exp_start = pos;
        while pos < bytes.len() && bytes[pos].is_ascii_digit() {
            pos += 1;
        }
        if pos == exp_start {
            return None;
        }
    }

    if pos != bytes.len() {
        return None;
    }

    text.parse::<f64>().ok().filter(|n| n.is_finite())
}
