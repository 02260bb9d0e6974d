use crate::block::{section, Line};
use crate::model::TypedPayload;

use super::location::parse_locations;
use super::party::parse_party;

pub fn parse(lines: &[Line<'_>]) -> TypedPayload {
    let answering_party = section(lines, "answering", &["location", "sdp", "associateMedia"]).and_then(parse_party);
    TypedPayload::Answer {
        answering_party,
        locations: parse_locations(lines),
    }
}
