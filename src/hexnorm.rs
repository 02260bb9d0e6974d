//! Heuristic decoding of field values that may arrive hex-encoded.
//!
//! Some carriers hex-encode nested SIP bodies, others send them as text, and nothing in
//! the record says which. A value is taken as hex only when it is an even-length run of
//! hex digits that decodes to UTF-8 that is mostly printable. Short values made of digits
//! (or of `a-f`) can therefore be decoded when they were meant literally; that is a known
//! false-positive source and the threshold is kept as-is.

use tracing::trace;

/// Minimum share of printable characters for a decoded value to be accepted.
pub const PRINTABLE_THRESHOLD: f64 = 0.70;

/// Decode `raw` if it looks like hex text, otherwise return it trimmed. Never fails.
pub fn normalize(raw: &str) -> String {
    let trimmed = raw.trim();
    match decode_hex_text(trimmed) {
        Some(decoded) => {
            trace!(len = trimmed.len(), "accepted hex-encoded field value");
            decoded
        }
        None => trimmed.to_string(),
    }
}

fn decode_hex_text(text: &str) -> Option<String> {
    let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    let digits = compact
        .strip_prefix("0x")
        .or_else(|| compact.strip_prefix("0X"))
        .unwrap_or(&compact);

    if digits.is_empty() || digits.len() % 2 != 0 {
        return None;
    }

    let bytes = hex::decode(digits).ok()?;
    let decoded = String::from_utf8(bytes).ok()?;

    if printable_ratio(&decoded) >= PRINTABLE_THRESHOLD {
        Some(decoded)
    } else {
        None
    }
}

fn printable_ratio(text: &str) -> f64 {
    let mut total = 0usize;
    let mut printable = 0usize;
    for c in text.chars() {
        total += 1;
        if matches!(c, ' '..='~' | '\t' | '\n' | '\r') {
            printable += 1;
        }
    }
    if total == 0 {
        return 0.0;
    }
    printable as f64 / total as f64
}
