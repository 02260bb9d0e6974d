//! Per-kind payload parsers. Each takes the tokenized block and never fails: a missing
//! sub-section just leaves its field empty.

pub mod answer;
pub mod attempt;
pub mod content;
pub mod location;
pub mod party;
pub mod release;
pub mod sdp;
pub mod signal;
pub mod sms;

use crate::block::Line;
use crate::fields::FieldExtractor;
use crate::model::TypedPayload;
use crate::standards::MessageKind;

/// What a type parser gets to look at for one block.
pub struct BlockContext<'b, 'a> {
    pub lines: &'b [Line<'a>],
    /// The whole block, lower-cased once.
    pub lower: &'b str,
    pub timestamp: Option<&'b str>,
}

pub fn parse_payload(kind: MessageKind, ctx: &BlockContext<'_, '_>, fx: &FieldExtractor<'_>) -> TypedPayload {
    match kind {
        MessageKind::TermAttempt | MessageKind::OrigAttempt => attempt::parse(ctx.lines),
        MessageKind::DirectSignalReporting | MessageKind::SubjectSignal => {
            signal::parse(ctx.lines, ctx.lower, ctx.timestamp, fx)
        }
        MessageKind::CcOpen | MessageKind::CcClose => content::parse(ctx.lines),
        MessageKind::Answer => answer::parse(ctx.lines),
        MessageKind::Release => release::parse(ctx.lines, fx),
        MessageKind::SmsMessage | MessageKind::MmsMessage => sms::parse(ctx.lines, ctx.lower, fx),
    }
}
