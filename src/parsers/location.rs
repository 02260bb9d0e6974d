//! `location[n]` groups and P-Access-Network-Info cell extraction.

use std::sync::LazyLock;

use regex::Regex;

use crate::block::Line;
use crate::cell::{decode_cell_identifier, CellIdentifier};
use crate::model::LocationRecord;

static UTRAN_CELL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)utran-cell-id-3gpp\s*=\s*([0-9a-f]+)").unwrap());

pub const PANI_SOURCE: &str = "P-Access-Network-Info";

/// Fields that follow a location group in the record layouts seen so far. A group ends
/// at the next `location[n]` or at the first of these, so one group's data never
/// absorbs the next section.
const FOLLOWING_FIELDS: &[&str] = &[
    "associateMedia",
    "deliveryIdentifier",
    "sdp",
    "sigMsg",
    "signalingMsg",
    "correlationID",
    "calling",
    "called",
    "answering",
    "cause",
    "callId",
    "caseId",
    "contentIdentifier",
    "originator",
    "recipient",
    "userInput",
    "smsMessage",
];

pub fn cell_from_text(text: &str) -> Option<CellIdentifier> {
    UTRAN_CELL_RE.captures(text).map(|c| decode_cell_identifier(&c[1]))
}

fn is_location_marker(line: &Line<'_>) -> bool {
    line.label.is_some() && line.index().is_some() && line.is_named("location")
}

pub fn parse_locations(lines: &[Line<'_>]) -> Vec<LocationRecord> {
    let mut out = Vec::new();
    let mut i = 0;
    while i < lines.len() {
        if !is_location_marker(&lines[i]) {
            i += 1;
            continue;
        }
        let start = i + 1;
        let end = lines[start..]
            .iter()
            .position(|l| is_location_marker(l) || FOLLOWING_FIELDS.iter().any(|f| l.is_named(f)))
            .map(|off| start + off)
            .unwrap_or(lines.len());

        if let Some(record) = parse_group(&lines[start..end]) {
            out.push(record);
        }
        i = end;
    }
    out
}

fn parse_group(chunk: &[Line<'_>]) -> Option<LocationRecord> {
    let value_of = |key: &str| {
        chunk
            .iter()
            .find(|l| l.key_is(key))
            .and_then(|l| l.value)
            .filter(|v| !v.is_empty())
    };

    let raw_data = value_of("locationData")?;
    let source_type = value_of("locationType").unwrap_or("unknown");

    Some(LocationRecord {
        source_type: source_type.to_string(),
        raw_data: raw_data.to_string(),
        timestamp: value_of("timestamp").or_else(|| value_of("locationTime")).map(str::to_string),
        cell: cell_from_text(raw_data),
    })
}

/// Location carried in a P-Access-Network-Info header value.
pub fn location_from_pani(value: &str, timestamp: Option<&str>) -> Option<LocationRecord> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    Some(LocationRecord {
        source_type: PANI_SOURCE.to_string(),
        raw_data: value.to_string(),
        timestamp: timestamp.map(str::to_string),
        cell: cell_from_text(value),
    })
}
