use crate::block::{section, Line};
use crate::model::TypedPayload;

use super::location::parse_locations;
use super::party::parse_party;
use super::sdp::{parse_codecs, sdp_block};

const CALLED_END: &[&str] = &["associateMedia", "location", "sdp"];
const SDP_END: &[&str] = &["associateMedia", "deliveryIdentifier"];

/// termAttempt / origAttempt.
pub fn parse(lines: &[Line<'_>]) -> TypedPayload {
    let calling = section(lines, "calling", &["called"]).and_then(parse_party);
    let called = section(lines, "called", CALLED_END).and_then(parse_party);
    let sdp = sdp_block(lines, SDP_END);
    let codecs = sdp.as_deref().map(parse_codecs).unwrap_or_default();

    TypedPayload::Attempt {
        calling,
        called,
        sdp,
        codecs,
        locations: parse_locations(lines),
    }
}
