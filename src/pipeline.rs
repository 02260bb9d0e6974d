use serde::Serialize;
use tracing::{debug, trace};

use crate::aggregate::{aggregate, CallMap};
use crate::block::{MessageBlock, Segmenter};
use crate::classify::Classifier;
use crate::fields::FieldExtractor;
use crate::model::{ParsedMessage, TypedPayload};
use crate::parsers::{parse_payload, BlockContext};
use crate::standards::{FieldAliases, KindDescriptor, Standards};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParseOutput {
    pub messages: Vec<ParsedMessage>,
    pub calls: CallMap,
}

/// Segment, classify, extract, and aggregate one intercept log.
///
/// Never fails: unrecognized blocks come back with no kind, and messages without a call
/// identifier are filed under the global bucket.
pub fn parse(raw: &str, kinds: &[KindDescriptor], aliases: &FieldAliases) -> ParseOutput {
    let classifier = Classifier::new(kinds);
    let fx = FieldExtractor::new(aliases);

    let messages: Vec<ParsedMessage> = Segmenter::new(kinds)
        .segment(raw)
        .into_iter()
        .map(|block| parse_block(block, &classifier, &fx))
        .collect();
    let calls = aggregate(&messages);

    debug!(messages = messages.len(), calls = calls.len(), "parsed intercept log");
    ParseOutput { messages, calls }
}

/// [`parse`] with both tables taken from one [`Standards`].
pub fn parse_with(raw: &str, standards: &Standards) -> ParseOutput {
    parse(raw, &standards.kinds, &standards.aliases)
}

fn parse_block(block: MessageBlock, classifier: &Classifier<'_>, fx: &FieldExtractor<'_>) -> ParsedMessage {
    let kind = classifier.classify(&block);
    let lower = block.text.to_lowercase();

    let (timestamp, case_id, mut call_id, payload) = {
        let lines = block.lines();
        let timestamp = fx.flat(&lines, "timestamp");
        let case_id = fx.flat(&lines, "caseId");
        let call_id = fx.call_id(&lines);
        let payload = kind.map(|kind| {
            let ctx = BlockContext {
                lines: &lines,
                lower: &lower,
                timestamp: timestamp.as_deref(),
            };
            parse_payload(kind, &ctx, fx)
        });
        (timestamp, case_id, call_id, payload)
    };

    if kind.is_none() {
        trace!(index = block.index, line = block.start_line, "unclassified block");
    }

    if call_id.is_none() {
        if let Some(TypedPayload::SignalReport { sip_messages, .. }) = &payload {
            call_id = sip_messages.iter().find_map(|m| m.call_id()).map(str::to_string);
        }
    }

    ParsedMessage {
        kind,
        timestamp,
        case_id,
        call_id,
        payload,
        block,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::GLOBAL_EVENTS_KEY;
    use crate::standards::MessageKind;

    const LOG: &str = "\
termAttempt
  caseId = CASE-7
  timestamp = 2025-01-15T10:00:00Z
  callId
    main = Abc-1
directSignalReporting
  timestamp = 2025-01-15T10:00:01Z
  sigMsg = SIP/2.0 200 OK
  Call-ID: sip-only@host
  CSeq: 1 INVITE
random noise with no marker
";

    #[test]
    fn test_call_id_falls_back_to_sip_header() {
        let out = parse_with(LOG, &Standards::default());
        assert_eq!(out.messages.len(), 2);
        assert_eq!(out.messages[0].kind, Some(MessageKind::TermAttempt));
        assert_eq!(out.messages[0].call_id.as_deref(), Some("Abc-1"));
        assert_eq!(out.messages[0].case_id.as_deref(), Some("CASE-7"));
        assert_eq!(out.messages[1].kind, Some(MessageKind::DirectSignalReporting));
        assert_eq!(out.messages[1].call_id.as_deref(), Some("sip-only@host"));
        assert_eq!(out.calls.keys().collect::<Vec<_>>(), vec!["abc-1", "sip-only@host"]);
    }

    #[test]
    fn test_unrecognized_text_is_kept() {
        let out = parse_with("nothing to see here\nat all", &Standards::default());
        assert_eq!(out.messages.len(), 1);
        assert_eq!(out.messages[0].kind, None);
        assert!(out.messages[0].payload.is_none());
        assert_eq!(out.messages[0].block.text, "nothing to see here\nat all");
        assert_eq!(out.calls.keys().collect::<Vec<_>>(), vec![GLOBAL_EVENTS_KEY]);
    }

    #[test]
    fn test_empty_input() {
        let out = parse_with("", &Standards::default());
        assert!(out.messages.is_empty());
        assert!(out.calls.is_empty());
    }
}
