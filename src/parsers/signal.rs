//! directSignalReporting / subjectSignal: the embedded SIP message(s).

use tracing::trace;

use crate::block::Line;
use crate::fields::FieldExtractor;
use crate::hexnorm;
use crate::model::TypedPayload;
use crate::sip::SipMessage;

const BIN_MARKER: &str = "[bin]";

/// Raw signaling bodies: each starts at a `sigMsg` / `signalingMsg[n]` line (per the alias
/// table) and runs to a `[bin]` marker, the next signaling line, or the end of the block.
pub fn signaling_bodies(lines: &[Line<'_>], fx: &FieldExtractor<'_>) -> Vec<String> {
    let aliases = fx.aliases().resolve("signalingMsg");
    let is_signal = |l: &Line<'_>| l.key.is_some() && aliases.iter().any(|a| l.is_named(a));

    let mut bodies = Vec::new();
    let mut i = 0;
    while i < lines.len() {
        if !is_signal(&lines[i]) {
            i += 1;
            continue;
        }
        let mut parts: Vec<&str> = Vec::new();
        let first = lines[i].value.unwrap_or("");
        let mut closed = false;
        match first.find(BIN_MARKER) {
            Some(pos) => {
                parts.push(&first[..pos]);
                closed = true;
            }
            None => parts.push(first),
        }
        i += 1;

        while !closed && i < lines.len() && !is_signal(&lines[i]) {
            let text = lines[i].text;
            if let Some(pos) = text.find(BIN_MARKER) {
                parts.push(&text[..pos]);
                closed = true;
            } else {
                parts.push(text);
            }
            i += 1;
        }

        let body = parts.join("\n");
        if !body.trim().is_empty() {
            bodies.push(body);
        }
    }
    bodies
}

pub fn parse(
    lines: &[Line<'_>],
    block_lower: &str,
    timestamp: Option<&str>,
    fx: &FieldExtractor<'_>,
) -> TypedPayload {
    let correlation_id = fx.flat(lines, "correlationID");

    let mut sip_messages = Vec::new();
    let mut sms = Vec::new();
    for body in signaling_bodies(lines, fx) {
        let decoded = hexnorm::normalize(&body);
        let Some(mut msg) = SipMessage::parse(&decoded) else { continue };
        if msg.is_sms_over_sip(block_lower) {
            trace!(method = ?msg.method, "signaling message carries SMS");
            msg.sms_over_sip = true;
            sms.push(msg.to_sms_entry(timestamp.map(str::to_string), block_lower));
        }
        sip_messages.push(msg);
    }

    TypedPayload::SignalReport {
        sip_messages,
        correlation_id,
        sms,
    }
}
