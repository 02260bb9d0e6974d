//! Party sections (`calling`, `called`, `answering`) and phone-number derivation.

use std::sync::LazyLock;

use regex::Regex;

use crate::block::{join_text, Line};
use crate::model::Party;

static PLUS_DIGITS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\+(\d{4,15})").unwrap());
static DN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(?:dn|msisdn|mdn)\s*=\s*(\+?\d{4,15})").unwrap());
static SIP_TEL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(?:sip|tel):(\+?\d{4,15})\b").unwrap());
static QUOTED_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#""([^"]+)""#).unwrap());

/// `+<digits>` run inside a URI.
pub fn phone_from_uri(uri: &str) -> Option<String> {
    PLUS_DIGITS_RE.captures(uri).map(|c| format!("+{}", &c[1]))
}

/// `+<digits>` first, then `dn=` / `msisdn=` / `mdn=`, then a bare `sip:` / `tel:` number.
pub fn phone_from_text(text: &str) -> Option<String> {
    phone_from_uri(text)
        .or_else(|| DN_RE.captures(text).map(|c| c[1].to_string()))
        .or_else(|| SIP_TEL_RE.captures(text).map(|c| c[1].to_string()))
}

/// Digits only, for comparing numbers written in different styles.
pub fn normalize_number(number: &str) -> String {
    number.chars().filter(char::is_ascii_digit).collect()
}

/// Extract a party from its section lines. The phone number comes from the first
/// `uri[0]` when it holds a `+` number, otherwise from the fallback patterns over the
/// whole section. The first `sipHeader[n]` with a quoted string names the caller.
pub fn parse_party(section: &[Line<'_>]) -> Option<Party> {
    let uri = section
        .iter()
        .find(|l| l.key_is("uri[0]"))
        .or_else(|| section.iter().find(|l| l.key.is_some() && l.is_named("uri")))
        .and_then(|l| l.value)
        .filter(|v| !v.is_empty())
        .map(str::to_string);

    let phone_number = uri
        .as_deref()
        .and_then(phone_from_uri)
        .or_else(|| phone_from_text(&join_text(section)));

    let headers: Vec<String> = section
        .iter()
        .filter(|l| l.key.is_some() && l.is_named("sipHeader"))
        .filter_map(|l| l.value)
        .map(str::to_string)
        .collect();

    let caller_name = headers
        .iter()
        .find_map(|h| QUOTED_RE.captures(h).map(|c| c[1].trim().to_string()))
        .filter(|n| !n.is_empty());

    let party = Party {
        uri,
        phone_number,
        caller_name,
        headers,
    };
    (!party.is_empty()).then_some(party)
}
