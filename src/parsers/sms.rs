use crate::block::Line;
use crate::fields::FieldExtractor;
use crate::model::{SmsDirection, TypedPayload};

use super::party::phone_from_text;

/// smsMessage / mmsMessage. Direction is `Sent` when the record mentions `originating`.
pub fn parse(lines: &[Line<'_>], block_lower: &str, fx: &FieldExtractor<'_>) -> TypedPayload {
    let address = |logical: &str| {
        fx.flat(lines, logical)
            .map(|v| phone_from_text(&v).unwrap_or(v))
    };
    let direction = if block_lower.contains("originating") {
        SmsDirection::Sent
    } else {
        SmsDirection::Received
    };

    TypedPayload::Sms {
        from: address("originator"),
        to: address("recipient"),
        content: fx.flat(lines, "smsContent"),
        direction,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::tokenize;
    use crate::standards::Standards;

    #[test]
    fn test_sms_fields() {
        let table = Standards::default();
        let fx = FieldExtractor::new(&table.aliases);
        let text = "smsMessage\n\
                    originator = tel:+16313841232\n\
                    recipient = +16313754560\n\
                    smsMessage = See you there at 5pm.";
        let lines = tokenize(text, 1);
        let TypedPayload::Sms { from, to, content, direction } =
            parse(&lines, &text.to_ascii_lowercase(), &fx)
        else {
            panic!("expected sms payload");
        };
        assert_eq!(from.as_deref(), Some("+16313841232"));
        assert_eq!(to.as_deref(), Some("+16313754560"));
        assert_eq!(content.as_deref(), Some("See you there at 5pm."));
        assert_eq!(direction, SmsDirection::Received);
    }

    #[test]
    fn test_user_input_preferred_and_originating_direction() {
        let table = Standards::default();
        let fx = FieldExtractor::new(&table.aliases);
        let text = "smsMessage\n\
                    smsMessage = fallback\n\
                    userInput = primary\n\
                    direction = originating";
        let lines = tokenize(text, 1);
        let TypedPayload::Sms { content, direction, from, .. } =
            parse(&lines, &text.to_ascii_lowercase(), &fx)
        else {
            panic!("expected sms payload");
        };
        assert_eq!(content.as_deref(), Some("primary"));
        assert_eq!(direction, SmsDirection::Sent);
        assert!(from.is_none());
    }
}
