use crate::block::Line;
use crate::model::TypedPayload;

use super::sdp::{parse_codecs, sdp_block};

/// ccOpen / ccClose.
pub fn parse(lines: &[Line<'_>]) -> TypedPayload {
    let sdp = sdp_block(lines, &["associateMedia", "deliveryIdentifier"]);
    let codecs = sdp.as_deref().map(parse_codecs).unwrap_or_default();
    TypedPayload::ContentChannel { sdp, codecs }
}
