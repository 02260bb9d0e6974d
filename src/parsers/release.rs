use crate::block::Line;
use crate::fields::FieldExtractor;
use crate::model::TypedPayload;

use super::location::parse_locations;

pub fn parse(lines: &[Line<'_>], fx: &FieldExtractor<'_>) -> TypedPayload {
    TypedPayload::Release {
        cause: fx.nested(lines, "cause", "signalingType"),
        locations: parse_locations(lines),
    }
}
